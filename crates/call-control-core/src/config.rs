//! Call control configuration
//!
//! Settings consumed by the filter pipeline and the audio route state
//! machine. Configuration can be built in code with the `with_*` methods,
//! loaded from YAML, and overridden from the environment.
//!
//! ```yaml
//! filter:
//!   timeout_ms: 5000
//! audio_route:
//!   has_earpiece: true
//! ```
//!
//! # Filter deadline
//!
//! The incoming call filter reads its deadline exactly once, when a
//! pipeline is constructed, through [`FilterTimeoutSource`]. A
//! [`FilterTimeoutSetting`] can be shared with whatever owns the external
//! setting so new pipelines pick up changes while running pipelines keep
//! the deadline they started with.
//!
//! ```rust
//! use rvoip_call_control_core::config::{CallControlConfig, FilterTimeoutSource};
//! use std::time::Duration;
//!
//! let config = CallControlConfig::new().with_filter_timeout_ms(250);
//! assert_eq!(config.filter_timeout(), Duration::from_millis(250));
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CallControlError, CallControlResult};

/// Environment variable overriding [`FilterConfig::timeout_ms`]
pub const ENV_FILTER_TIMEOUT_MS: &str = "CALL_CONTROL_FILTER_TIMEOUT_MS";

/// Environment variable overriding [`AudioRouteConfig::has_earpiece`]
pub const ENV_HAS_EARPIECE: &str = "CALL_CONTROL_HAS_EARPIECE";

/// Default filter deadline
pub const DEFAULT_FILTER_TIMEOUT_MS: u64 = 5000;

/// Incoming call filter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// How long the pipeline waits for every filter before delivering the
    /// fail-open default. Zero is allowed.
    pub timeout_ms: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_FILTER_TIMEOUT_MS,
        }
    }
}

/// Audio route settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioRouteConfig {
    /// Whether the device has an earpiece. Tablets and desk units without
    /// one fall back to the speaker instead.
    pub has_earpiece: bool,
}

impl Default for AudioRouteConfig {
    fn default() -> Self {
        Self { has_earpiece: true }
    }
}

/// Top-level configuration for the call control core
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallControlConfig {
    /// Incoming call filter settings
    pub filter: FilterConfig,
    /// Audio route settings
    pub audio_route: AudioRouteConfig,
}

impl CallControlConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter deadline in milliseconds
    pub fn with_filter_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.filter.timeout_ms = timeout_ms;
        self
    }

    /// Set whether the device has an earpiece
    pub fn with_earpiece(mut self, has_earpiece: bool) -> Self {
        self.audio_route.has_earpiece = has_earpiece;
        self
    }

    /// Parse a YAML document. Missing sections fall back to defaults.
    pub fn from_yaml_str(yaml: &str) -> CallControlResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> CallControlResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CallControlError::ConfigFile {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Loaded call control configuration from {}", path.display());
        Self::from_yaml_str(&contents)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(self) -> CallControlResult<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> CallControlResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_FILTER_TIMEOUT_MS) {
            self.filter.timeout_ms = raw.trim().parse().map_err(|_| {
                CallControlError::config(format!("{} must be a whole number of milliseconds, got '{}'", ENV_FILTER_TIMEOUT_MS, raw))
            })?;
        }

        if let Some(raw) = lookup(ENV_HAS_EARPIECE) {
            self.audio_route.has_earpiece = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(CallControlError::config(format!(
                        "{} must be a boolean, got '{}'",
                        ENV_HAS_EARPIECE, raw
                    )))
                }
            };
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate configuration settings
    pub fn validate(&self) -> CallControlResult<()> {
        if self.filter.timeout_ms > 3_600_000 {
            return Err(CallControlError::config(format!(
                "filter.timeout_ms {} exceeds one hour",
                self.filter.timeout_ms
            )));
        }
        Ok(())
    }
}

/// Source of the filter deadline, read once per pipeline
pub trait FilterTimeoutSource: Send + Sync {
    /// The deadline to arm for a pipeline being constructed now
    fn filter_timeout(&self) -> Duration;
}

impl FilterTimeoutSource for Duration {
    fn filter_timeout(&self) -> Duration {
        *self
    }
}

impl FilterTimeoutSource for FilterConfig {
    fn filter_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl FilterTimeoutSource for CallControlConfig {
    fn filter_timeout(&self) -> Duration {
        self.filter.filter_timeout()
    }
}

/// Live, shareable filter deadline
///
/// Clones share the same value. Updating it affects pipelines constructed
/// afterwards only.
#[derive(Debug, Clone)]
pub struct FilterTimeoutSetting {
    millis: Arc<AtomicU64>,
}

impl FilterTimeoutSetting {
    /// Create a setting holding `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(duration_to_millis(timeout))),
        }
    }

    /// Replace the current deadline
    pub fn set(&self, timeout: Duration) {
        self.millis.store(duration_to_millis(timeout), Ordering::Release);
    }
}

impl Default for FilterTimeoutSetting {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_FILTER_TIMEOUT_MS))
    }
}

impl From<&FilterConfig> for FilterTimeoutSetting {
    fn from(config: &FilterConfig) -> Self {
        Self::new(config.filter_timeout())
    }
}

impl FilterTimeoutSource for FilterTimeoutSetting {
    fn filter_timeout(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::Acquire))
    }
}

fn duration_to_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
