use std::path::{Path, PathBuf};

use anyhow::Context;
use home::home_dir;
use ratatui::{style::Color, widgets::BorderType};
use serde::{
    de::{DeserializeOwned, Visitor},
    Deserialize,
};
use tokio::io::AsyncReadExt;

use crate::karaoke::{gap::DEFAULT_GAP_THRESHOLD_SECONDS, sync::DEFAULT_DRIFT_TOLERANCE_SECONDS};

#[derive(Debug, Clone, Default)]
pub struct KaraokeConfig {
    pub general: GeneralConfiguration,
    pub timing: TimingConfiguration,
    pub theme: ThemeConfiguration,
}

impl KaraokeConfig {
    /// `~/.config/karaoke`, where the config file and its includes live.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let home = home_dir().context("Could not determine the home directory")?;
        Ok(home.join(".config").join("karaoke"))
    }

    /// Reads `path`, or `config.toml` in the config directory when no path is given.
    /// Only the implicit default location may be missing.
    pub async fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (Self::config_dir()?.join("config.toml"), false),
        };
        if !explicit && !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let mut file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open config {}", path.display()))?;
        let mut str = String::new();
        file.read_to_string(&mut str).await?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::read_from_str(&str, &base_dir)
            .await
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub async fn read_from_str(str: &str, base_dir: &Path) -> anyhow::Result<Self> {
        let unresolved = toml::from_str::<KaraokeConfigUnresolved>(str)?;
        let general = resolve_section(unresolved.general, base_dir).await?;
        let timing = resolve_section(unresolved.timing, base_dir).await?;
        let theme = resolve_section(unresolved.theme, base_dir).await?;
        Ok(Self {
            general,
            timing,
            theme,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralConfiguration {
    pub songs_dir: PathBuf,
    pub tick_interval_ms: u64,
    pub seek_step_seconds: f64,
    pub volume_step_percent: u8,
    pub initial_vocal_volume_percent: u8,
    pub romanize_lyrics: bool,
    pub display: DisplayConfig,
}

impl Default for GeneralConfiguration {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from("public/songs"),
            tick_interval_ms: 100,
            seek_step_seconds: 5.0,
            volume_step_percent: 10,
            initial_vocal_volume_percent: 0,
            romanize_lyrics: false,
            display: DisplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub header_format: String,
    pub subtitle_format: String,
    pub show_timeline: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            header_format: "{{title}}".to_owned(),
            subtitle_format: "by {{artist}}".to_owned(),
            show_timeline: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfiguration {
    pub drift_tolerance_seconds: f64,
    pub last_line_seconds: f64,
    pub gap_threshold_seconds: f64,
}

impl Default for TimingConfiguration {
    fn default() -> Self {
        Self {
            drift_tolerance_seconds: DEFAULT_DRIFT_TOLERANCE_SECONDS,
            last_line_seconds: crate::karaoke::DEFAULT_LAST_LINE_SECONDS,
            gap_threshold_seconds: DEFAULT_GAP_THRESHOLD_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ThemeConfiguration {
    pub lyrics: ThemeLyrics,
    pub timeline: ThemeTimeline,
    pub borders: ThemeBorders,
    pub progress_bar: ThemeProgress,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeLyrics {
    pub highlighted_text_color: ThemeColor,
    pub pending_text_color: ThemeColor,
    pub preview_text_color: ThemeColor,
    pub placeholder_text_color: ThemeColor,
}

impl Default for ThemeLyrics {
    fn default() -> Self {
        Self {
            highlighted_text_color: ThemeColor(Color::Rgb(0xfb, 0xbf, 0x24)),
            pending_text_color: ThemeColor(Color::Rgb(0x9c, 0xa3, 0xaf)),
            preview_text_color: ThemeColor(Color::Rgb(0x9c, 0xa3, 0xaf)),
            placeholder_text_color: ThemeColor(Color::Rgb(0x6b, 0x72, 0x80)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeTimeline {
    pub active_line_color: ThemeColor,
    pub active_text_color: ThemeColor,
    pub time_color: ThemeColor,
}

impl Default for ThemeTimeline {
    fn default() -> Self {
        Self {
            active_line_color: ThemeColor(Color::Rgb(0xca, 0x8a, 0x04)),
            active_text_color: ThemeColor(Color::Black),
            time_color: ThemeColor(Color::Gray),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeBorders {
    pub border_color: ThemeColor,
    pub border_text_color: ThemeColor,
    pub border_style: BorderStyle,
}

impl Default for ThemeBorders {
    fn default() -> Self {
        Self {
            border_color: ThemeColor(Color::DarkGray),
            border_text_color: ThemeColor(Color::White),
            border_style: BorderStyle(BorderType::Rounded),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeProgress {
    pub color: ThemeColor,
    pub volume_color: ThemeColor,
    pub is_percentage: bool,
}

impl Default for ThemeProgress {
    fn default() -> Self {
        Self {
            color: ThemeColor(Color::Rgb(0xea, 0xb3, 0x08)),
            volume_color: ThemeColor(Color::Rgb(0xea, 0xb3, 0x08)),
            is_percentage: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[repr(transparent)]
pub struct ThemeColor(pub Color);

impl<'de> Deserialize<'de> for ThemeColor {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        de.deserialize_str(ColorVisitor)
    }
}

struct ColorVisitor;

impl<'v> Visitor<'v> for ColorVisitor {
    type Value = ThemeColor;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a string representing a color")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if let Some(stripped) = v.strip_prefix('#') {
            let color_rgb = u32::from_str_radix(stripped, 16).map_err(|e| {
                serde::de::Error::custom(format!("Invalid hex string for color {e}"))
            })?;
            let r = (color_rgb & 0xFF0000) >> 16;
            let g = (color_rgb & 0x00FF00) >> 8;
            let b = color_rgb & 0x0000FF;
            Ok(ThemeColor(Color::Rgb(r as u8, g as u8, b as u8)))
        } else {
            v.parse::<Color>()
                .map_err(|e| serde::de::Error::custom(format!("Invalid named color format {e}")))
                .map(ThemeColor)
        }
    }
}

#[derive(Debug, Clone)]
#[repr(transparent)]
pub struct BorderStyle(pub BorderType);

impl<'de> Deserialize<'de> for BorderStyle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(BorderVisitor).map(BorderStyle)
    }
}

struct BorderVisitor;

impl<'v> Visitor<'v> for BorderVisitor {
    type Value = BorderType;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a string representing a border style")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<BorderType>()
            .map_err(|e| serde::de::Error::custom(format!("Invalid border style: {e}")))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct KaraokeConfigUnresolved {
    #[serde(default)]
    general: Option<MaybeLink<GeneralConfiguration>>,
    #[serde(default)]
    timing: Option<MaybeLink<TimingConfiguration>>,
    #[serde(default)]
    theme: Option<MaybeLink<ThemeConfiguration>>,
}

/// A config section written inline or pulled from another file with
/// `{ include = "theme.toml" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeLink<V> {
    Link { include: PathBuf },
    Explicit(V),
}

impl<V: DeserializeOwned> MaybeLink<V> {
    async fn resolve(self, base_dir: &Path) -> anyhow::Result<V> {
        match self {
            MaybeLink::Explicit(value) => Ok(value),
            MaybeLink::Link { include } => {
                let path = base_dir.join(include);
                let mut file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("Failed to open included config {}", path.display()))?;
                let mut str = String::new();
                file.read_to_string(&mut str).await?;
                toml::from_str(&str).map_err(anyhow::Error::from)
            }
        }
    }
}

async fn resolve_section<V: DeserializeOwned + Default>(
    section: Option<MaybeLink<V>>,
    base_dir: &Path,
) -> anyhow::Result<V> {
    match section {
        Some(link) => link.resolve(base_dir).await,
        None => Ok(V::default()),
    }
}
