use thiserror::Error;

use crate::card::Theme;

/// Failures the card pipeline reports. None of them are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("failed to load {theme} template: {reason}")]
    AssetLoad { theme: Theme, reason: String },
    #[error("drawing surface is not allocated")]
    SurfaceUnavailable,
    #[error("discarded stale {theme} template load")]
    StaleLoadDiscarded { theme: Theme },
    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl CardError {
    pub(crate) fn asset_load(theme: Theme, reason: impl Into<String>) -> Self {
        CardError::AssetLoad {
            theme,
            reason: reason.into(),
        }
    }
}
