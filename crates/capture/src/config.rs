use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sphere::{DEFAULT_COLLINEARITY_TOLERANCE, DEFAULT_SAMPLE_INTERVAL, DEFAULT_STEADY_TOLERANCE};

/// Whether the session triggers captures on its own.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    #[serde(rename = "manual")]
    Manual,
    #[default]
    #[serde(rename = "full_auto")]
    FullAuto,
}

/// Requested picture size class, forwarded to the image source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureQuality {
    VeryLow,
    #[default]
    Low,
    High,
}

/// What happens to a cell whose capture produced no photo.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The cell stays in the capture set; only a manual request retakes it.
    #[default]
    KeepAttempted,
    /// The cell leaves the capture set and may be auto-captured again.
    AllowRetry,
}

/// Settings as seen by one frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSnapshot {
    pub mode: CaptureMode,
    pub quality: PictureQuality,
}

/// Read-only settings source, polled once per frame.
pub trait ConfigProvider {
    fn snapshot(&self) -> ConfigSnapshot;
}

impl ConfigProvider for ConfigSnapshot {
    fn snapshot(&self) -> ConfigSnapshot {
        *self
    }
}

/// Settings shared with a UI thread that may change them at any time.
///
/// Each `snapshot` is a single locked copy, so a frame never sees a
/// half-updated configuration.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<ConfigSnapshot>>,
}

impl SharedConfig {
    pub fn new(initial: ConfigSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn set_mode(&self, mode: CaptureMode) {
        self.inner.write().mode = mode;
    }

    pub fn set_quality(&self, quality: PictureQuality) {
        self.inner.write().quality = quality;
    }
}

impl ConfigProvider for SharedConfig {
    fn snapshot(&self) -> ConfigSnapshot {
        *self.inner.read()
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io { path, source } => {
                write!(f, "failed to read settings {}: {source}", path.display())
            }
            SettingsError::Parse(e) => write!(f, "failed to parse settings: {e}"),
            SettingsError::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

/// Upper bound on either tessellation axis accepted from a settings file.
pub const MAX_BANDS: u32 = 256;

/// Session-build settings. Every field has a default, so `{}` is valid JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub lat_bands: u32,
    pub lon_bands: u32,
    pub collinearity_tolerance: f64,
    pub steady_tolerance: f64,
    /// Frames between refreshes of the steadiness reference sample.
    pub steady_sample_interval: u32,
    pub failure_policy: FailurePolicy,
    /// Largest texture side after downscaling; 0 keeps captures as delivered.
    pub max_texture_dim: u32,
    /// Oldest session events are dropped beyond this many.
    pub event_capacity: usize,
    /// Initial values for the runtime settings.
    pub initial: ConfigSnapshot,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            lat_bands: 10,
            lon_bands: 7,
            collinearity_tolerance: DEFAULT_COLLINEARITY_TOLERANCE,
            steady_tolerance: DEFAULT_STEADY_TOLERANCE,
            steady_sample_interval: DEFAULT_SAMPLE_INTERVAL,
            failure_policy: FailurePolicy::default(),
            max_texture_dim: 512,
            event_capacity: 4096,
            initial: ConfigSnapshot::default(),
        }
    }
}

impl CaptureSettings {
    pub fn from_json_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(s).map_err(SettingsError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let bands = 2..=MAX_BANDS;
        if !bands.contains(&self.lat_bands) || !bands.contains(&self.lon_bands) {
            return Err(SettingsError::Invalid(format!(
                "lat_bands and lon_bands must be in 2..={MAX_BANDS} (got {} x {})",
                self.lat_bands, self.lon_bands
            )));
        }
        if self.steady_sample_interval == 0 {
            return Err(SettingsError::Invalid(
                "steady_sample_interval must be at least 1 frame".to_string(),
            ));
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.collinearity_tolerance) {
            return Err(SettingsError::Invalid(
                "collinearity_tolerance must be positive".to_string(),
            ));
        }
        if !positive(self.steady_tolerance) {
            return Err(SettingsError::Invalid(
                "steady_tolerance must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
