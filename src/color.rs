use serde::Serialize;

use crate::card::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Dark brown, readable on the light template.
pub const LIGHT_TEXT: RgbColor = RgbColor::new(122, 87, 29);
/// Warm orange, readable on the dark template.
pub const DARK_TEXT: RgbColor = RgbColor::new(255, 189, 89);

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub fn resolve_color(theme: Theme) -> RgbColor {
    match theme {
        Theme::Light => LIGHT_TEXT,
        Theme::Dark => DARK_TEXT,
    }
}
