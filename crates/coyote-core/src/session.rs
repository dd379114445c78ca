//! Boundary to the device transport.
//!
//! The transport (pairing handshake, wire encoding) lives outside this crate.
//! It hands the pipeline a [`DeviceLink`]: the session handle used to drive
//! output, a one-shot binding future, and a stream of telemetry records.

use crate::error::SessionError;
use crate::frame::PulseFrame;
use crate::types::Channel;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Output operations offered by a live device session.
pub trait DeviceSession: Send + Sync {
    /// Drop any output still queued on `channel`.
    fn reset_pending_output(&self, channel: Channel) -> BoxFuture<'_, Result<(), SessionError>>;

    /// Queue `frames` for playback on `channel`.
    fn submit_output_program(
        &self,
        channel: Channel,
        frames: Vec<PulseFrame>,
    ) -> BoxFuture<'_, Result<(), SessionError>>;
}

/// Details reported when the device confirms its control binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindInfo {
    pub target_id: String,
    pub bound_at: DateTime<Utc>,
}

impl BindInfo {
    pub fn now(target_id: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            bound_at: Utc::now(),
        }
    }
}

/// An asynchronous status record from the device. Opaque to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub received_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl TelemetryRecord {
    pub fn new(payload: serde_json::Value) -> Self {
        Self {
            received_at: Utc::now(),
            payload,
        }
    }
}

/// Everything the pipeline needs from an established transport.
pub struct DeviceLink {
    pub session: Box<dyn DeviceSession>,
    pub binding: BoxFuture<'static, Result<BindInfo, SessionError>>,
    pub telemetry: BoxStream<'static, TelemetryRecord>,
}
