use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub card_size: u32,
    pub font_family: String,
    pub font_path: Option<String>,
    pub templates_dir: Option<String>,
    pub load_timeout_ms: u64,
    pub export_file_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            card_size: 500,
            font_family: "Mitr".to_string(),
            font_path: None,
            templates_dir: None,
            load_timeout_ms: 10_000,
            export_file_name: "meaning.png".to_string(),
        }
    }
}

impl Settings {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    card: Option<CardSettings>,
    templates: Option<TemplateSettings>,
    export: Option<ExportSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct CardSettings {
    size: Option<u32>,
    font_family: Option<String>,
    font_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateSettings {
    dir: Option<String>,
    load_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportSettings {
    file_name: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_settings_in(home_dir().as_deref(), extra_path)
}

/// Merges `./settings.toml`, `./settings.local.toml`, the same pair under
/// `home`, then `extra_path`. Later files win.
pub fn load_settings_in(home: Option<&Path>, extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];

    if let Some(home) = home {
        ensure_home_settings_file(home)?;
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(card) = incoming.card {
            if let Some(size) = card.size.filter(|size| *size > 0) {
                self.card_size = size;
            }
            if let Some(family) = card.font_family.filter(|value| !value.trim().is_empty()) {
                self.font_family = family;
            }
            if let Some(path) = card.font_path.filter(|value| !value.trim().is_empty()) {
                self.font_path = Some(path);
            }
        }
        if let Some(templates) = incoming.templates {
            if let Some(dir) = templates.dir.filter(|value| !value.trim().is_empty()) {
                self.templates_dir = Some(dir);
            }
            if let Some(timeout) = templates.load_timeout_ms.filter(|ms| *ms > 0) {
                self.load_timeout_ms = timeout;
            }
        }
        if let Some(export) = incoming.export {
            if let Some(name) = export.file_name.filter(|value| !value.trim().is_empty()) {
                self.export_file_name = name;
            }
        }
    }
}

fn ensure_home_settings_file(home: &Path) -> Result<()> {
    fs::create_dir_all(home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".word-card"))
        }
    })
}
