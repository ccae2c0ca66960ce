//! Configuration management for the manul frame.
//!
//! Loads and validates configuration from a JSON file. Every field has a
//! default, so a partial file (or `{}`) is a valid configuration.

use crate::image_proc::{ContrastStrategy, PaletteOptions, PipelineError, SidebarOptions};
use crate::render::{DashboardOptions, FrameOptions, TextStyle};
use crate::sources::MapOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Vertical room reserved for the caption when no photo height cap is set
const CAPTION_RESERVE: u32 = 150;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

impl From<PipelineError> for ConfigError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Configuration(msg) | PipelineError::Input(msg) => ConfigError::Validation(msg),
        }
    }
}

/// Panel geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    /// Black rule between the map and the sidebar
    pub divider_width: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            divider_width: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SidebarConfig {
    pub width: u32,
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self { width: 240 }
    }
}

/// Photo processing parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImageProcessingConfig {
    /// `adaptive` or `linear_boost`
    pub contrast: String,
    pub clahe_clip_limit: f32,
    pub clahe_tile_grid_size: u32,
    /// Factor for `linear_boost`
    pub contrast_boost: f32,
    pub palette_colors: u32,
    pub dithering: bool,
    /// Height cap for the fitted photo; display height minus 150 when unset
    pub max_photo_height: Option<u32>,
}

impl Default for ImageProcessingConfig {
    fn default() -> Self {
        Self {
            contrast: "adaptive".to_string(),
            clahe_clip_limit: 2.0,
            clahe_tile_grid_size: 8,
            contrast_boost: 1.5,
            palette_colors: 4,
            dithering: true,
            max_photo_height: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub font_size: u32,
    pub line_spacing: u32,
    pub padding: u32,
}

impl Default for TextConfig {
    fn default() -> Self {
        let style = TextStyle::default();
        Self {
            font_size: style.font_size,
            line_spacing: style.line_spacing,
            padding: style.padding,
        }
    }
}

/// Static map settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub api_key: String,
    pub width: u32,
    pub height: u32,
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub refresh_interval_hours: u64,
    pub random_city: bool,
    pub cities_file: Option<PathBuf>,
    pub threshold: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            width: 558,
            height: 480,
            center_lat: 47.9077,
            center_lon: 106.8832,
            zoom: 11,
            refresh_interval_hours: 24,
            random_city: false,
            cities_file: None,
            threshold: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhotosConfig {
    /// JSON catalog of `{name, location, description, image}` records
    pub catalog: PathBuf,
    pub max_attempts: usize,
}

impl Default for PhotosConfig {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("photos.json"),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeatherConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA zone name passed to Open-Meteo
    pub timezone: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            latitude: 41.0082,
            longitude: 28.9784,
            timezone: "Europe/Istanbul".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub font_size: u32,
    pub line_spacing: u32,
    pub section_spacing: u32,
    pub column_gap: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let options = DashboardOptions::default();
        Self {
            font_size: options.font_size,
            line_spacing: options.line_spacing,
            section_spacing: options.section_spacing,
            column_gap: options.column_gap,
        }
    }
}

/// Dashboard reminders
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemindersConfig {
    /// JSON list of `{summary, due?, completed?}`; no reminders when unset
    pub file: Option<PathBuf>,
    pub max_items: usize,
    pub show_completed: bool,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            file: None,
            max_items: 8,
            show_completed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
        }
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.png")
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub sidebar: SidebarConfig,
    #[serde(default)]
    pub image_processing: ImageProcessingConfig,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub photos: PhotosConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where test mode writes the finished frame
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            sidebar: SidebarConfig::default(),
            image_processing: ImageProcessingConfig::default(),
            text: TextConfig::default(),
            map: MapConfig::default(),
            photos: PhotosConfig::default(),
            weather: WeatherConfig::default(),
            dashboard: DashboardConfig::default(),
            reminders: RemindersConfig::default(),
            cache: CacheConfig::default(),
            output_path: default_output_path(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sidebar_options()?;
        self.frame_options()?;

        if self.map.width == 0 || self.map.height == 0 {
            return Err(ConfigError::Validation(
                "map width and height must be greater than 0".to_string(),
            ));
        }

        if self.map.refresh_interval_hours == 0 {
            return Err(ConfigError::Validation(
                "map.refresh_interval_hours must be at least 1".to_string(),
            ));
        }

        if self.photos.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "photos.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Photo height budget
    pub fn max_photo_height(&self) -> u32 {
        self.image_processing
            .max_photo_height
            .unwrap_or_else(|| self.display.height.saturating_sub(CAPTION_RESERVE))
    }

    /// Immutable options for the sidebar pipeline
    pub fn sidebar_options(&self) -> Result<SidebarOptions, ConfigError> {
        let processing = &self.image_processing;
        let contrast = ContrastStrategy::from_name(
            &processing.contrast,
            processing.clahe_clip_limit,
            processing.clahe_tile_grid_size,
            processing.contrast_boost,
        )?;

        let options = SidebarOptions {
            contrast,
            palette: PaletteOptions {
                colors: processing.palette_colors,
                dithering: processing.dithering,
            },
            sidebar_width: self.sidebar.width,
            max_photo_height: Some(self.max_photo_height()),
            text: TextStyle {
                font_size: self.text.font_size,
                line_spacing: self.text.line_spacing,
                padding: self.text.padding,
            },
        };
        options.validate()?;
        Ok(options)
    }

    /// Options for the final frame composite
    pub fn frame_options(&self) -> Result<FrameOptions, ConfigError> {
        let options = FrameOptions {
            width: self.display.width,
            height: self.display.height,
            divider_width: self.display.divider_width,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn dashboard_options(&self) -> DashboardOptions {
        DashboardOptions {
            width: self.display.width,
            height: self.display.height,
            font_size: self.dashboard.font_size,
            line_spacing: self.dashboard.line_spacing,
            section_spacing: self.dashboard.section_spacing,
            column_gap: self.dashboard.column_gap,
        }
    }

    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            api_key: self.map.api_key.clone(),
            width: self.map.width,
            height: self.map.height,
            center_lat: self.map.center_lat,
            center_lon: self.map.center_lon,
            zoom: self.map.zoom,
            refresh_interval: Duration::from_secs(self.map.refresh_interval_hours * 3600),
            random_city: self.map.random_city,
            threshold: self.map.threshold,
            cache_dir: self.cache.dir.clone(),
        }
    }

    pub fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.weather.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.output_path, PathBuf::from("output.png"));
        assert_eq!(config.display.width, 800);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_json(r#"{"image_processing": {"palette_colors": 8}}"#).unwrap();
        assert_eq!(config.image_processing.palette_colors, 8);
        assert!(config.image_processing.dithering);
        assert_eq!(config.image_processing.contrast, "adaptive");
    }

    #[test]
    fn test_sidebar_options_from_config() {
        let config = Config::from_json(
            r#"{
                "sidebar": {"width": 200},
                "image_processing": {"contrast": "linear_boost", "contrast_boost": 2.0, "dithering": false},
                "text": {"font_size": 16}
            }"#,
        )
        .unwrap();
        let options = config.sidebar_options().unwrap();
        assert_eq!(options.sidebar_width, 200);
        assert_eq!(options.contrast, ContrastStrategy::LinearBoost { factor: 2.0 });
        assert!(!options.palette.dithering);
        assert_eq!(options.text.font_size, 16);
        assert_eq!(options.text.padding, 5);
    }

    #[test]
    fn test_default_photo_height_follows_display() {
        let config = Config::default();
        assert_eq!(config.max_photo_height(), 330);

        let capped = Config::from_json(r#"{"image_processing": {"max_photo_height": 200}}"#).unwrap();
        assert_eq!(capped.sidebar_options().unwrap().max_photo_height, Some(200));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            r#"{"image_processing": {"palette_colors": 1}}"#,
            r#"{"image_processing": {"contrast": "sharpen"}}"#,
            r#"{"sidebar": {"width": 0}}"#,
            r#"{"display": {"width": 0}}"#,
            r#"{"map": {"refresh_interval_hours": 0}}"#,
            r#"{"photos": {"max_attempts": 0}}"#,
        ];
        for case in cases {
            let err = Config::from_json(case).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{}: {}", case, err);
        }
    }

    #[test]
    fn test_reminders_section() {
        let config = Config::default();
        assert_eq!(config.reminders.file, None);
        assert_eq!(config.reminders.max_items, 8);
        assert_eq!(config.dashboard_options().column_gap, 32);

        let config = Config::from_json(r#"{"reminders": {"file": "todo.json", "show_completed": true}}"#).unwrap();
        assert_eq!(config.reminders.file, Some(PathBuf::from("todo.json")));
        assert!(config.reminders.show_completed);
        assert_eq!(config.reminders.max_items, 8);
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(Config::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_map_options_conversion() {
        let config = Config::from_json(r#"{"map": {"refresh_interval_hours": 2}, "cache": {"dir": "/tmp/maps"}}"#).unwrap();
        let options = config.map_options();
        assert_eq!(options.refresh_interval, Duration::from_secs(7200));
        assert_eq!(options.cache_dir, PathBuf::from("/tmp/maps"));
        assert_eq!(options.threshold, 200);
    }
}
