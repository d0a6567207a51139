use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::card::{CardSpec, FontWeight, StyledText, TextAlign, TextBaseline, Theme};
use crate::color::{RgbColor, resolve_color};
use crate::error::CardError;
use crate::export::{ExportFormat, ExportedImage, export_surface};
use crate::paint::{
    FontBook, PaintedRun, Surface, draw_background, draw_continuation_text,
    draw_single_style_text,
};
use crate::template::{TemplateImage, TemplateLoader};

const WORD_X_RATIO: f32 = 0.09;
const WORD_SIZE_RATIO: f32 = 0.1;
const MEANING_SIZE_RATIO: f32 = 0.04;
const MEANING_X_RATIO: f32 = 0.1;
const TYPE_DROP_RATIO: f32 = 0.036;
const AUTHOR_X_RATIO: f32 = 0.605;
const AUTHOR_Y_RATIO: f32 = 0.905;
const AUTHOR_SIZE_SCALE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunRole {
    Word,
    Type,
    Meaning,
    Author,
}

/// The styled runs of a card, in paint order.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRuns {
    pub word: StyledText,
    pub word_type: StyledText,
    pub meaning: StyledText,
    pub author: Option<StyledText>,
}

/// Lays out the runs for `spec`. Placeholders and normalization are applied here.
pub fn compose(spec: &CardSpec) -> CardRuns {
    let size = spec.size as f32;
    let color = resolve_color(spec.theme);
    let meaning_size = size * MEANING_SIZE_RATIO;
    let type_y = size / 2.0 + size * TYPE_DROP_RATIO;
    let run = |text: String, x: f32, y: f32, font_size: f32, weight: FontWeight| StyledText {
        text,
        x,
        y,
        font_size,
        font_family: spec.font_family.clone(),
        color,
        align: TextAlign::Left,
        baseline: TextBaseline::Bottom,
        weight,
    };

    CardRuns {
        word: run(
            spec.display_word(),
            size * WORD_X_RATIO,
            size / 2.0,
            size * WORD_SIZE_RATIO,
            FontWeight::Bold,
        ),
        word_type: run(
            spec.display_type(),
            size * WORD_X_RATIO,
            type_y,
            meaning_size,
            FontWeight::ItalicBold,
        ),
        meaning: run(
            spec.display_meaning(),
            size * MEANING_X_RATIO,
            type_y,
            meaning_size,
            FontWeight::Normal,
        ),
        author: spec.display_author().map(|line| {
            run(
                line,
                size * AUTHOR_X_RATIO,
                size * AUTHOR_Y_RATIO,
                meaning_size * AUTHOR_SIZE_SCALE,
                FontWeight::Normal,
            )
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRun {
    pub role: RunRole,
    pub style: StyledText,
    pub painted: PaintedRun,
}

/// What the latest paint pass put on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub generation: u64,
    pub theme: Theme,
    pub color: RgbColor,
    pub runs: Vec<FrameRun>,
}

impl Frame {
    pub fn run(&self, role: RunRole) -> Option<&FrameRun> {
        self.runs.iter().find(|run| run.role == role)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderState {
    Idle,
    LoadingTemplate { theme: Theme },
    Ready { theme: Theme },
    LoadError(CardError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderEvent {
    Painted { generation: u64, theme: Theme },
    LoadFailed { theme: Theme, reason: String },
    StaleLoadDiscarded { theme: Theme },
    Exported { mime: &'static str, bytes: usize },
}

/// Outcome of [`CardRenderer::update`].
pub enum Update {
    /// The surface was repainted synchronously.
    Painted,
    /// Nothing to paint yet: a load is outstanding or the last one failed.
    Waiting,
    /// A template load must be driven to completion and handed to
    /// [`CardRenderer::complete`].
    Load(PendingLoad),
}

pub struct PendingLoad {
    generation: u64,
    theme: Theme,
    loader: TemplateLoader,
}

impl PendingLoad {
    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn resolve(self) -> CompletedLoad {
        let result = self.loader.load(self.theme).await;
        CompletedLoad {
            generation: self.generation,
            theme: self.theme,
            result,
        }
    }
}

pub struct CompletedLoad {
    generation: u64,
    theme: Theme,
    result: Result<Arc<TemplateImage>, CardError>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied,
    Failed(CardError),
    Stale,
}

type EventSink = Box<dyn FnMut(&RenderEvent)>;

/// Owns the surface and keeps it in sync with the latest [`CardSpec`].
///
/// Template loads are tagged with a generation number; only the load issued
/// last may paint. Decoded templates are cached per theme for the renderer's
/// lifetime.
pub struct CardRenderer {
    surface: Surface,
    fonts: FontBook,
    loader: TemplateLoader,
    templates: HashMap<Theme, Arc<TemplateImage>>,
    state: RenderState,
    spec: Option<CardSpec>,
    generation: u64,
    last_frame: Option<Frame>,
    events: Option<EventSink>,
}

impl CardRenderer {
    pub fn new(size: u32, loader: TemplateLoader, fonts: FontBook) -> Self {
        Self {
            surface: Surface::new(size),
            fonts,
            loader,
            templates: HashMap::new(),
            state: RenderState::Idle,
            spec: None,
            generation: 0,
            last_frame: None,
            events: None,
        }
    }

    pub fn on_event(&mut self, sink: impl FnMut(&RenderEvent) + 'static) {
        self.events = Some(Box::new(sink));
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn spec(&self) -> Option<&CardSpec> {
        self.spec.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn is_cached(&self, theme: Theme) -> bool {
        self.templates.contains_key(&theme)
    }

    /// Takes a new spec. A theme or size change (or the first spec) starts a
    /// template load; anything else repaints in place when ready.
    pub fn update(&mut self, spec: CardSpec) -> Update {
        let (theme, size) = (spec.theme, spec.size);
        let previous = self.spec.replace(spec);
        let size_changed = size != self.surface.size();
        let theme_changed = previous.as_ref().is_none_or(|prev| prev.theme != theme);
        if size_changed {
            debug!("resizing surface to {}x{}", size, size);
            self.surface.resize(size);
        }
        if size_changed || theme_changed || self.state == RenderState::Idle {
            return self.begin_load(theme);
        }
        match self.state {
            RenderState::Ready { .. } => {
                self.repaint();
                Update::Painted
            }
            _ => Update::Waiting,
        }
    }

    /// Applies a finished load unless a newer one has been issued since.
    pub fn complete(&mut self, done: CompletedLoad) -> LoadOutcome {
        let CompletedLoad {
            generation,
            theme,
            result,
        } = done;
        if generation != self.generation {
            debug!("{}", CardError::StaleLoadDiscarded { theme });
            self.emit(RenderEvent::StaleLoadDiscarded { theme });
            return LoadOutcome::Stale;
        }
        match result {
            Ok(template) => {
                self.templates.insert(theme, Arc::clone(&template));
                self.state = RenderState::Ready { theme };
                self.paint(&template);
                LoadOutcome::Applied
            }
            Err(err) => {
                warn!("{}", err);
                let reason = match &err {
                    CardError::AssetLoad { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                self.state = RenderState::LoadError(err.clone());
                self.emit(RenderEvent::LoadFailed { theme, reason });
                LoadOutcome::Failed(err)
            }
        }
    }

    /// Updates and, if a load was needed, drives it to completion.
    pub async fn render(&mut self, spec: CardSpec) -> &RenderState {
        if let Update::Load(pending) = self.update(spec) {
            let done = pending.resolve().await;
            self.complete(done);
        }
        &self.state
    }

    pub fn export(&mut self, format: ExportFormat) -> Result<ExportedImage, CardError> {
        let exported = export_surface(&self.surface, format)?;
        info!(
            "exported {}x{} card as {} ({} bytes)",
            self.surface.size(),
            self.surface.size(),
            exported.mime,
            exported.bytes.len()
        );
        self.emit(RenderEvent::Exported {
            mime: exported.mime,
            bytes: exported.bytes.len(),
        });
        Ok(exported)
    }

    fn begin_load(&mut self, theme: Theme) -> Update {
        self.generation += 1;
        if let Some(template) = self.templates.get(&theme).cloned() {
            debug!("using cached {} template", theme);
            self.state = RenderState::Ready { theme };
            self.paint(&template);
            return Update::Painted;
        }
        info!("loading {} template (generation {})", theme, self.generation);
        self.state = RenderState::LoadingTemplate { theme };
        Update::Load(PendingLoad {
            generation: self.generation,
            theme,
            loader: self.loader.clone(),
        })
    }

    fn repaint(&mut self) {
        let RenderState::Ready { theme } = self.state else {
            return;
        };
        if let Some(template) = self.templates.get(&theme).cloned() {
            self.paint(&template);
        }
    }

    fn paint(&mut self, template: &TemplateImage) {
        let Some(runs) = self.spec.as_ref().map(compose) else {
            return;
        };
        if !self.surface.is_allocated() {
            warn!("{}; card left unpainted", CardError::SurfaceUnavailable);
        }
        self.surface.clear();
        draw_background(&mut self.surface, template);

        let surface = &mut self.surface;
        let fonts = &mut self.fonts;
        let word = draw_single_style_text(surface, fonts, &runs.word);
        let word_type = draw_single_style_text(surface, fonts, &runs.word_type);
        let offset = word_type.width.unwrap_or_else(|| {
            warn!("type label was not measured; meaning starts at its margin");
            0.0
        });
        let meaning = draw_continuation_text(surface, fonts, &runs.meaning, offset);

        let mut frame_runs = vec![
            FrameRun {
                role: RunRole::Word,
                style: runs.word,
                painted: word,
            },
            FrameRun {
                role: RunRole::Type,
                style: runs.word_type,
                painted: word_type,
            },
            FrameRun {
                role: RunRole::Meaning,
                style: runs.meaning,
                painted: meaning,
            },
        ];
        if let Some(author) = runs.author {
            let painted = draw_continuation_text(surface, fonts, &author, 0.0);
            frame_runs.push(FrameRun {
                role: RunRole::Author,
                style: author,
                painted,
            });
        }

        let theme = template.theme();
        debug!("painted card (generation {}, {} theme)", self.generation, theme);
        self.last_frame = Some(Frame {
            generation: self.generation,
            theme,
            color: resolve_color(theme),
            runs: frame_runs,
        });
        self.emit(RenderEvent::Painted {
            generation: self.generation,
            theme,
        });
    }

    fn emit(&mut self, event: RenderEvent) {
        if let Some(sink) = self.events.as_mut() {
            sink(&event);
        }
    }
}
