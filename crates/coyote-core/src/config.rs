use crate::error::ConfigError;
use crate::types::{clamp, AMP_MAX};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Hard protocol ceiling for pulse frequency. `limits.freq_max` may lower it,
/// never raise it.
pub const PROTOCOL_FREQ_MAX: u32 = 200;

pub const OWNER_MAX_ENV: &str = "OWNER_MAX_POWER";
pub const BINDING_TIMEOUT_ENV: &str = "COYOTE_BINDING_TIMEOUT_SECS";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Where the device-facing session listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_bind_host")]
    pub host: String,
    #[serde(default = "default_device_port")]
    pub port: u16,
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_device_port() -> u16 {
    4567
}

fn default_heartbeat() -> u64 {
    60
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_device_port(),
            heartbeat_secs: default_heartbeat(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_api_port() -> u16 {
    8000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_bind_host(),
            port: default_api_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// PulseDefaults / PulseLimits
// ---------------------------------------------------------------------------

/// Values used when a request leaves a magnitude out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseDefaults {
    #[serde(default = "default_amp")]
    pub amp: u32,
    #[serde(default = "default_freq")]
    pub freq: u32,
    #[serde(default = "default_copies")]
    pub copies: u32,
}

fn default_amp() -> u32 {
    20
}

fn default_freq() -> u32 {
    20
}

fn default_copies() -> u32 {
    5
}

impl Default for PulseDefaults {
    fn default() -> Self {
        Self {
            amp: default_amp(),
            freq: default_freq(),
            copies: default_copies(),
        }
    }
}

/// Protocol-safety bounds applied to every pulse program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseLimits {
    #[serde(default = "default_freq_max")]
    pub freq_max: u32,
    #[serde(default = "default_copies_min")]
    pub copies_min: u32,
    #[serde(default = "default_copies_max")]
    pub copies_max: u32,
}

fn default_freq_max() -> u32 {
    PROTOCOL_FREQ_MAX
}

fn default_copies_min() -> u32 {
    1
}

fn default_copies_max() -> u32 {
    100
}

impl Default for PulseLimits {
    fn default() -> Self {
        Self {
            freq_max: default_freq_max(),
            copies_min: default_copies_min(),
            copies_max: default_copies_max(),
        }
    }
}

impl PulseLimits {
    pub fn clamp_amp(&self, amp: u32) -> u32 {
        clamp(amp, 0, AMP_MAX)
    }

    pub fn clamp_freq(&self, freq: u32) -> u32 {
        clamp(freq, 0, self.freq_max.min(PROTOCOL_FREQ_MAX))
    }

    pub fn clamp_copies(&self, copies: u32) -> u32 {
        clamp(copies, self.copies_min, self.copies_max.max(self.copies_min))
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: PulseDefaults,
    #[serde(default)]
    pub limits: PulseLimits,
    /// Owner amplitude ceiling in percent, applied to every fired pulse.
    #[serde(default = "default_owner_max")]
    pub owner_max_power: u32,
    /// How long a queued job may wait for the device to bind. `None` waits
    /// forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_timeout_secs: Option<u64>,
}

fn default_owner_max() -> u32 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            api: ApiConfig::default(),
            defaults: PulseDefaults::default(),
            limits: PulseLimits::default(),
            owner_max_power: default_owner_max(),
            binding_timeout_secs: None,
        }
    }
}

impl Config {
    /// Load from `path` (or start from defaults), apply environment
    /// overrides and reject Error-level problems.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => Self::from_yaml(&std::fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        cfg.apply_overrides(|key| std::env::var(key).ok())?;
        cfg.ensure_valid()?;
        Ok(cfg)
    }

    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply environment-style overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(OWNER_MAX_ENV) {
            self.owner_max_power = parse_override(OWNER_MAX_ENV, &raw)?;
        }
        if let Some(raw) = lookup(BINDING_TIMEOUT_ENV) {
            self.binding_timeout_secs = Some(parse_override(BINDING_TIMEOUT_ENV, &raw)?);
        }
        Ok(())
    }

    pub fn binding_timeout(&self) -> Option<Duration> {
        self.binding_timeout_secs.map(Duration::from_secs)
    }

    /// Owner ceiling as applied by the sequencer.
    pub fn owner_ceiling(&self) -> u32 {
        self.owner_max_power.min(AMP_MAX)
    }

    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };
        let limits = &self.limits;

        if self.owner_max_power > AMP_MAX {
            error(format!(
                "owner_max_power={} exceeds the protocol ceiling of {AMP_MAX}",
                self.owner_max_power
            ));
        }
        if limits.freq_max > PROTOCOL_FREQ_MAX {
            error(format!(
                "limits.freq_max={} exceeds the protocol ceiling of {PROTOCOL_FREQ_MAX}",
                limits.freq_max
            ));
        }
        if limits.copies_min == 0 {
            error("limits.copies_min must be at least 1".to_string());
        }
        if limits.copies_min > limits.copies_max {
            error(format!(
                "limits.copies_min={} is greater than limits.copies_max={}",
                limits.copies_min, limits.copies_max
            ));
        }
        if self.defaults.amp > AMP_MAX {
            error(format!("defaults.amp={} is outside 0..{AMP_MAX}", self.defaults.amp));
        }
        if self.defaults.freq > limits.freq_max {
            error(format!(
                "defaults.freq={} is outside 0..{}",
                self.defaults.freq, limits.freq_max
            ));
        }
        if self.defaults.copies < limits.copies_min || self.defaults.copies > limits.copies_max {
            error(format!(
                "defaults.copies={} is outside {}..{}",
                self.defaults.copies, limits.copies_min, limits.copies_max
            ));
        }

        if self.device.heartbeat_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "device.heartbeat_secs=0 disables the session heartbeat".to_string(),
            });
        }
        if self.owner_max_power == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "owner_max_power=0: every pulse is fired at zero amplitude".to_string(),
            });
        }
        if self.binding_timeout_secs == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "binding_timeout_secs=0: jobs queued before binding fail at once"
                    .to_string(),
            });
        }

        warnings
    }
}

fn parse_override<T: std::str::FromStr>(var: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::BadOverride {
        var: var.to_string(),
        value: raw.to_string(),
        expected: "non-negative integer",
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
