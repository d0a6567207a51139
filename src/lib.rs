use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::info;

pub mod card;
pub mod color;
pub mod error;
pub mod export;
pub mod logging;
pub mod normalize;
pub mod paint;
pub mod renderer;
pub mod settings;
pub mod template;

pub use card::{CardSpec, FontWeight, StyledText, TextAlign, TextBaseline, Theme};
pub use color::{RgbColor, resolve_color};
pub use error::CardError;
pub use export::{ExportFormat, ExportedImage};
pub use normalize::normalize;
pub use paint::{FontBook, PaintedRun, PlacedLine, Surface};
pub use renderer::{
    CardRenderer, CompletedLoad, Frame, FrameRun, LoadOutcome, PendingLoad, RenderEvent,
    RenderState, RunRole, Update, compose,
};
pub use template::{
    DirTemplateSource, EmbeddedTemplates, MemoryTemplates, TemplateImage, TemplateLoader,
    TemplateSource,
};

/// One-shot render request. Unset fields fall back to settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub word: String,
    pub word_type: String,
    pub meaning: String,
    pub theme: Theme,
    pub author: Option<String>,
    pub size: Option<u32>,
    pub font_family: Option<String>,
    pub font_path: Option<String>,
    pub templates_dir: Option<String>,
    pub settings_path: Option<String>,
    pub format: ExportFormat,
}

pub struct RunOutput {
    pub image: ExportedImage,
    pub file_name: String,
}

/// Renders a single card and exports it.
pub async fn run(config: Config) -> Result<RunOutput> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let mut fonts = FontBook::system();
    let mut font_family = config
        .font_family
        .clone()
        .unwrap_or_else(|| settings.font_family.clone());
    if let Some(path) = config.font_path.as_ref().or(settings.font_path.as_ref()) {
        font_family = fonts
            .load_font_file(Path::new(path))
            .with_context(|| "failed to load card font")?;
    }

    let loader = match config.templates_dir.as_ref().or(settings.templates_dir.as_ref()) {
        Some(dir) => TemplateLoader::new(DirTemplateSource::new(dir)),
        None => TemplateLoader::embedded(),
    }
    .with_timeout(settings.load_timeout());

    let size = config.size.unwrap_or(settings.card_size);
    if size == 0 {
        return Err(anyhow!("card size must be greater than zero"));
    }
    let spec = CardSpec {
        size,
        word: config.word,
        word_type: config.word_type,
        meaning: config.meaning,
        theme: config.theme,
        font_family,
        author: config.author,
    };
    info!("rendering {}x{} {} card", size, size, spec.theme);

    let mut renderer = CardRenderer::new(size, loader, fonts);
    if let RenderState::LoadError(err) = renderer.render(spec).await {
        return Err(anyhow!(err.clone()));
    }
    let image = renderer.export(config.format)?;
    Ok(RunOutput {
        image,
        file_name: settings.export_file_name,
    })
}
