//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the document store records.
    pub data_dir: PathBuf,

    /// Drawing canvas settings.
    pub canvas: CanvasConfig,

    /// Default pen settings.
    pub pen: PenDefaults,

    /// Timeline strip settings.
    pub timeline: TimelineConfig,

    /// Lasso gesture settings.
    pub lasso: LassoConfig,

    /// Opacity levels used when rendering.
    pub display: DisplayConfig,

    /// Overlay import settings.
    pub overlay: OverlayConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Drawing canvas dimensions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Background color used for preview rasters (hex).
    pub background: String,
}

/// Pen defaults for new strokes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PenDefaults {
    /// Line width in pixels.
    pub size: f64,
    /// Stroke color (hex).
    pub color: String,
}

/// Timeline strip settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Strip width in pixels.
    pub width: u32,
    /// Number of horizontal grid divisions.
    pub grid_divisions: u32,
    /// Whether timeline lasso selects inactive strokes too.
    pub lasso_includes_inactive: bool,
}

/// Lasso gesture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LassoConfig {
    /// Drags smaller than this on both axes are taps.
    pub min_drag_px: f64,
}

/// Rendering opacity levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Alpha for inactive strokes when revealed on the canvas.
    pub inactive_alpha: f32,
    /// Alpha for inactive strokes on the timeline.
    pub timeline_inactive_alpha: f32,
    /// Alpha for staged overlay strokes.
    pub overlay_alpha: f32,
}

/// Overlay import settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Per-point `tAbs` increment given to imported strokes (ms).
    pub import_point_step_ms: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "chronosketch=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs_default_data(),
            canvas: CanvasConfig::default(),
            pen: PenDefaults::default(),
            timeline: TimelineConfig::default(),
            lasso: LassoConfig::default(),
            display: DisplayConfig::default(),
            overlay: OverlayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 800,
            background: "#ffffff".to_string(),
        }
    }
}

impl Default for PenDefaults {
    fn default() -> Self {
        Self {
            size: 2.0,
            color: "#000000".to_string(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            width: 200,
            grid_divisions: 5,
            lasso_includes_inactive: true,
        }
    }
}

impl Default for LassoConfig {
    fn default() -> Self {
        Self { min_drag_px: 6.0 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            inactive_alpha: 0.15,
            timeline_inactive_alpha: 0.10,
            overlay_alpha: 0.4,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            import_point_step_ms: 1.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("chronosketch").join("config.json")
}

/// Default document store directory.
fn dirs_default_data() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("chronosketch").join("documents")
}
