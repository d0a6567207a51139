use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for word_card::Theme {
    fn from(value: ThemeArg) -> Self {
        match value {
            ThemeArg::Light => word_card::Theme::Light,
            ThemeArg::Dark => word_card::Theme::Dark,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "word-card", version, about = "Render a word-definition card")]
struct Cli {
    /// Headword (placeholder "Word" when empty)
    #[arg(short = 'w', long = "word", default_value = "")]
    word: String,

    /// Grammatical type, shown in parentheses
    #[arg(short = 't', long = "type", default_value = "วลี")]
    word_type: String,

    /// Definition text; use \n in the value for line breaks
    #[arg(short = 'm', long = "meaning", default_value = "")]
    meaning: String,

    /// Background theme
    #[arg(long = "theme", value_enum, default_value = "light")]
    theme: ThemeArg,

    /// Credit line ("by <author>")
    #[arg(short = 'a', long = "author")]
    author: Option<String>,

    /// Card width and height in pixels (default from settings)
    #[arg(short = 's', long = "size")]
    size: Option<u32>,

    /// Font family name
    #[arg(short = 'f', long = "font")]
    font: Option<String>,

    /// Font file to load and use
    #[arg(long = "font-path")]
    font_path: Option<String>,

    /// Directory holding meaning-light.png and meaning-dark.png
    #[arg(long = "templates")]
    templates: Option<String>,

    /// Output file (default from settings)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Export with the octet-stream mime type
    #[arg(long = "octet-stream")]
    octet_stream: bool,

    /// Print a data URL to stdout instead of writing a file
    #[arg(long = "data-url")]
    data_url: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    word_card::logging::init(cli.verbose)?;

    let format = if cli.octet_stream {
        word_card::ExportFormat::OctetStream
    } else {
        word_card::ExportFormat::Png
    };
    let output = word_card::run(word_card::Config {
        word: unescape_newlines(&cli.word),
        word_type: cli.word_type,
        meaning: unescape_newlines(&cli.meaning),
        theme: cli.theme.into(),
        author: cli.author,
        size: cli.size,
        font_family: cli.font,
        font_path: cli.font_path,
        templates_dir: cli.templates,
        settings_path: cli.read_settings,
        format,
    })
    .await?;

    if cli.data_url {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", output.image.to_data_url())?;
        return Ok(());
    }

    let path = cli
        .output
        .unwrap_or_else(|| PathBuf::from(&output.file_name));
    std::fs::write(&path, &output.image.bytes)
        .with_context(|| format!("failed to write card: {}", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn unescape_newlines(value: &str) -> String {
    value.replace("\\n", "\n")
}
