use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{ColorU8, Pixmap};
use tracing::debug;

use crate::card::Theme;
use crate::error::CardError;

include!(concat!(env!("OUT_DIR"), "/embedded_templates.rs"));

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Decoded background bitmap for one theme. Immutable once built.
pub struct TemplateImage {
    theme: Theme,
    pixmap: Pixmap,
}

impl TemplateImage {
    pub fn decode(theme: Theme, bytes: &[u8]) -> Result<Self, CardError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| CardError::asset_load(theme, format!("failed to decode: {}", err)))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| CardError::asset_load(theme, "template has no pixels"))?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(decoded.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }
        Ok(Self { theme, pixmap })
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

pub type TemplateFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send>>;

/// Where encoded template bytes come from.
pub trait TemplateSource: Send + Sync {
    fn fetch(&self, theme: Theme) -> TemplateFuture;
}

/// The two templates shipped in `templates/`, compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedTemplates;

impl TemplateSource for EmbeddedTemplates {
    fn fetch(&self, theme: Theme) -> TemplateFuture {
        let bytes = embedded_template(theme.template_name()).map(|data| data.to_vec());
        Box::pin(async move {
            bytes.ok_or_else(|| anyhow!("no embedded template named {}", theme.template_name()))
        })
    }
}

/// Reads `<dir>/meaning-<theme>.png`.
#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    dir: PathBuf,
}

impl DirTemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, theme: Theme) -> PathBuf {
        self.dir.join(format!("{}.png", theme.template_name()))
    }
}

impl TemplateSource for DirTemplateSource {
    fn fetch(&self, theme: Theme) -> TemplateFuture {
        let path = self.path_for(theme);
        Box::pin(async move {
            tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read template: {}", path.display()))
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTemplates {
    map: HashMap<Theme, Arc<Vec<u8>>>,
}

impl MemoryTemplates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, theme: Theme, bytes: Vec<u8>) -> Self {
        self.map.insert(theme, Arc::new(bytes));
        self
    }
}

impl TemplateSource for MemoryTemplates {
    fn fetch(&self, theme: Theme) -> TemplateFuture {
        let bytes = self.map.get(&theme).cloned();
        Box::pin(async move {
            bytes
                .map(|data| data.as_ref().clone())
                .ok_or_else(|| anyhow!("no template registered for {} theme", theme))
        })
    }
}

/// Fetches and decodes templates, bounded by a timeout.
#[derive(Clone)]
pub struct TemplateLoader {
    source: Arc<dyn TemplateSource>,
    timeout: Duration,
}

impl TemplateLoader {
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    pub fn embedded() -> Self {
        Self::new(EmbeddedTemplates)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn load(&self, theme: Theme) -> Result<Arc<TemplateImage>, CardError> {
        debug!("fetching {} template", theme);
        let bytes = match tokio::time::timeout(self.timeout, self.source.fetch(theme)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => return Err(CardError::asset_load(theme, format!("{:#}", err))),
            Err(_) => {
                return Err(CardError::asset_load(
                    theme,
                    format!("timed out after {}ms", self.timeout.as_millis()),
                ));
            }
        };
        let template = TemplateImage::decode(theme, &bytes)?;
        debug!(
            "decoded {} template ({}x{})",
            theme,
            template.width(),
            template.height()
        );
        Ok(Arc::new(template))
    }
}
