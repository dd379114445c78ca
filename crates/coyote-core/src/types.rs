use crate::config::Config;
use crate::error::ShockError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Duration of one output frame on the device.
pub const FRAME_MS: u64 = 100;

/// Protocol ceiling for amplitude, in percent.
pub const AMP_MAX: u32 = 100;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// One of the two independent output lines on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::A => "A",
            Channel::B => "B",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = ShockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Channel::A),
            "B" => Ok(Channel::B),
            _ => Err(ShockError::Validation(
                "channel must be 'A' or 'B'".to_string(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ShockRequest
// ---------------------------------------------------------------------------

/// A shock request as it arrives at the boundary. Absent magnitudes take the
/// configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShockRequest {
    pub channel: String,
    #[serde(default)]
    pub amp: Option<i64>,
    #[serde(default)]
    pub freq: Option<i64>,
    #[serde(default)]
    pub copies: Option<i64>,
}

/// A request that passed boundary validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidShock {
    pub channel: Channel,
    pub amp: u32,
    pub freq: u32,
    pub copies: u32,
}

impl ShockRequest {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ..Default::default()
        }
    }

    pub fn amp(mut self, amp: i64) -> Self {
        self.amp = Some(amp);
        self
    }

    pub fn freq(mut self, freq: i64) -> Self {
        self.freq = Some(freq);
        self
    }

    pub fn copies(mut self, copies: i64) -> Self {
        self.copies = Some(copies);
        self
    }

    /// Reject malformed or out-of-range values. Nothing is clamped here.
    pub fn validate(&self, config: &Config) -> Result<ValidShock, ShockError> {
        let channel: Channel = self.channel.parse()?;
        let limits = &config.limits;
        let amp = in_range(
            "amp",
            self.amp.unwrap_or(config.defaults.amp as i64),
            0,
            AMP_MAX,
        )?;
        let freq = in_range(
            "freq",
            self.freq.unwrap_or(config.defaults.freq as i64),
            0,
            limits.freq_max,
        )?;
        let copies = in_range(
            "copies",
            self.copies.unwrap_or(config.defaults.copies as i64),
            limits.copies_min,
            limits.copies_max,
        )?;
        Ok(ValidShock {
            channel,
            amp,
            freq,
            copies,
        })
    }
}

fn in_range(field: &str, value: i64, lo: u32, hi: u32) -> Result<u32, ShockError> {
    if value < lo as i64 || value > hi as i64 {
        return Err(ShockError::Validation(format!(
            "{field} must be {lo}..{hi} (got {value})"
        )));
    }
    Ok(value as u32)
}

// ---------------------------------------------------------------------------
// ShockReceipt
// ---------------------------------------------------------------------------

/// Success payload for a fired job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShockReceipt {
    pub ok: bool,
    pub mode: String,
    pub channel: Channel,
    pub amp_requested: u32,
    pub amp_effective: u32,
    pub owner_max: u32,
    pub freq: u32,
    pub copies: u32,
    pub approx_duration_ms: u64,
}

impl ShockReceipt {
    pub(crate) fn pulse(
        channel: Channel,
        amp_requested: u32,
        amp_effective: u32,
        owner_max: u32,
        freq: u32,
        copies: u32,
    ) -> Self {
        Self {
            ok: true,
            mode: "pulse".to_string(),
            channel,
            amp_requested,
            amp_effective,
            owner_max,
            freq,
            copies,
            approx_duration_ms: copies as u64 * FRAME_MS,
        }
    }
}

/// Bound `value` into the closed range `[lo, hi]`.
pub fn clamp(value: u32, lo: u32, hi: u32) -> u32 {
    value.max(lo).min(hi)
}
