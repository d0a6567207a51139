use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::RgbColor;
use crate::normalize::normalize;

pub const WORD_PLACEHOLDER: &str = "Word";
pub const TYPE_PLACEHOLDER: &str = "type";
pub const MEANING_PLACEHOLDER: &str = "put your meaning here";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Asset name of the background template for this theme.
    pub fn template_name(&self) -> &'static str {
        match self {
            Theme::Light => "meaning-light",
            Theme::Dark => "meaning-dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a card render depends on. Rebuilt from scratch on every input change.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSpec {
    pub size: u32,
    pub word: String,
    pub word_type: String,
    pub meaning: String,
    pub theme: Theme,
    pub font_family: String,
    pub author: Option<String>,
}

impl CardSpec {
    pub fn new(size: u32, theme: Theme, font_family: impl Into<String>) -> Self {
        Self {
            size,
            word: String::new(),
            word_type: String::new(),
            meaning: String::new(),
            theme,
            font_family: font_family.into(),
            author: None,
        }
    }

    pub fn display_word(&self) -> String {
        or_placeholder(&self.word, WORD_PLACEHOLDER)
    }

    /// The grammatical type wrapped in parentheses, e.g. `(น.)`.
    pub fn display_type(&self) -> String {
        format!("({})", or_placeholder(&self.word_type, TYPE_PLACEHOLDER))
    }

    pub fn display_meaning(&self) -> String {
        or_placeholder(&self.meaning, MEANING_PLACEHOLDER)
    }

    /// Attribution line, or `None` when no author is given.
    pub fn display_author(&self) -> Option<String> {
        self.author
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .map(|name| format!("by {}", normalize(name)))
    }
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.is_empty() {
        placeholder.to_string()
    } else {
        normalize(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub(crate) fn svg_anchor(&self) -> &'static str {
        match self {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextBaseline {
    Top,
    Middle,
    #[default]
    Bottom,
    Alphabetic,
}

impl TextBaseline {
    pub(crate) fn svg_baseline(&self) -> &'static str {
        match self {
            TextBaseline::Top => "text-before-edge",
            TextBaseline::Middle => "central",
            TextBaseline::Bottom => "text-after-edge",
            TextBaseline::Alphabetic => "alphabetic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
    ItalicBold,
}

impl FontWeight {
    pub fn is_bold(&self) -> bool {
        matches!(self, FontWeight::Bold | FontWeight::ItalicBold)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, FontWeight::ItalicBold)
    }
}

/// One styled run of text, built per paint call.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub font_family: String,
    pub color: RgbColor,
    pub align: TextAlign,
    pub baseline: TextBaseline,
    pub weight: FontWeight,
}
