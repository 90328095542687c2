//! Configuration file support.
//!
//! Settings live in a JSON file. Every field is optional and falls back to
//! the defaults below, so a partial file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::eraser::DEFAULT_ERASER_RADIUS;
use crate::error::ConfigError;
use crate::render::{Color4, LineStyle, PathStyle, Renderer};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "mask-label.json";

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pixels kept free around the canvas on each axis.
    pub viewport_padding: f32,
    /// Eraser reach in display pixels.
    pub eraser_radius: f64,
    pub fill_color: [u8; 3],
    pub fill_alpha: f32,
    pub stroke_color: [u8; 3],
    pub stroke_width: f32,
    pub export_file_name: String,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewport_padding: 100.0,
            eraser_radius: DEFAULT_ERASER_RADIUS,
            fill_color: [0, 0, 255],
            fill_alpha: 0.3,
            stroke_color: [0, 0, 0],
            stroke_width: 1.0,
            export_file_name: "drawings.zip".to_string(),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data)
    }

    /// Load `explicit` if given, else the default file if present, else defaults.
    ///
    /// Returns the config plus any error hit on the way, to be reported once
    /// logging is up.
    pub fn load_or_default(explicit: Option<&Path>) -> (Self, Option<(PathBuf, ConfigError)>) {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return (Self::default(), None);
                }
                fallback
            }
        };
        match Self::load(&path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some((path, e))),
        }
    }

    pub fn renderer(&self) -> Renderer {
        let outline = LineStyle {
            color: Color4::from_rgb(self.stroke_color, 1.0),
            width: self.stroke_width,
        };
        Renderer::new(
            PathStyle {
                outline,
                fill: Color4::from_rgb(self.fill_color, self.fill_alpha),
            },
            outline,
        )
    }
}

/// Command line: `[--config <path>] [archive.zip]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub archive: Option<PathBuf>,
}

impl CliArgs {
    pub const USAGE: &'static str = "Usage: mask-label [--config <path>] [archive.zip]";

    pub fn parse<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter().map(Into::into);
        while let Some(arg) = args.next() {
            if arg == "--config" || arg == "-c" {
                let path = args
                    .next()
                    .ok_or_else(|| format!("{} requires a path", arg))?;
                parsed.config = Some(PathBuf::from(path));
            } else if arg.starts_with('-') {
                return Err(format!("Unknown option: {}", arg));
            } else if parsed.archive.is_some() {
                return Err(format!("Unexpected argument: {}", arg));
            } else {
                parsed.archive = Some(PathBuf::from(arg));
            }
        }
        Ok(parsed)
    }
}
