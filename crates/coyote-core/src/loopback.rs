//! In-process stand-in for a paired device.
//!
//! [`LoopbackDevice`] implements [`DeviceSession`] without any transport: it
//! journals every call, enforces a program capacity, reports a telemetry
//! record per accepted program and can be scripted to fail. `coyote serve`
//! runs on it until a real transport is plugged in through [`DeviceLink`];
//! the test suites use it to observe exactly what reached the device.

use crate::error::SessionError;
use crate::frame::PulseFrame;
use crate::session::{BindInfo, DeviceLink, DeviceSession, TelemetryRecord};
use crate::types::Channel;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::info;

/// Largest program the loopback device accepts, in frames.
pub const DEFAULT_PROGRAM_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Reset(Channel),
    Submit(Channel, Vec<PulseFrame>),
}

// ---------------------------------------------------------------------------
// Journal / FaultScript
// ---------------------------------------------------------------------------

/// Shared record of the calls a loopback device accepted.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<DeviceCall>>>,
    overlaps: Arc<AtomicUsize>,
}

impl Journal {
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls
            .lock()
            .ok()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Number of calls that started while another one was still running.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn record(&self, call: DeviceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

/// Queue of faults the device returns instead of performing its next calls.
#[derive(Debug, Clone, Default)]
pub struct FaultScript {
    queue: Arc<Mutex<VecDeque<SessionError>>>,
}

impl FaultScript {
    pub fn fail_next(&self, err: SessionError) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(err);
        }
    }

    fn take(&self) -> Option<SessionError> {
        self.queue.lock().ok().and_then(|mut q| q.pop_front())
    }
}

// ---------------------------------------------------------------------------
// LoopbackDevice
// ---------------------------------------------------------------------------

pub struct LoopbackDevice {
    journal: Journal,
    faults: FaultScript,
    in_flight: AtomicBool,
    latency: Duration,
    capacity: usize,
    telemetry: Option<mpsc::UnboundedSender<TelemetryRecord>>,
}

impl Default for LoopbackDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackDevice {
    pub fn new() -> Self {
        Self {
            journal: Journal::default(),
            faults: FaultScript::default(),
            in_flight: AtomicBool::new(false),
            latency: Duration::ZERO,
            capacity: DEFAULT_PROGRAM_CAPACITY,
            telemetry: None,
        }
    }

    /// Make every call take `latency` before it completes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_capacity(mut self, frames: usize) -> Self {
        self.capacity = frames;
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn faults(&self) -> FaultScript {
        self.faults.clone()
    }

    async fn perform(&self, call: DeviceCall) -> Result<(), SessionError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.journal.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = self.accept(call);
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    fn accept(&self, call: DeviceCall) -> Result<(), SessionError> {
        if let Some(err) = self.faults.take() {
            return Err(err);
        }
        if let DeviceCall::Submit(channel, frames) = &call {
            if frames.len() > self.capacity {
                return Err(SessionError::PulseTooLong(format!(
                    "{} frames exceeds the device limit of {}",
                    frames.len(),
                    self.capacity
                )));
            }
            let peak = frames.first().map(PulseFrame::peak).unwrap_or(0);
            info!(%channel, frames = frames.len(), peak, "loopback device playing program");
            if let Some(tx) = &self.telemetry {
                let _ = tx.send(TelemetryRecord::new(serde_json::json!({
                    "event": "program",
                    "channel": channel,
                    "frames": frames.len(),
                    "peak": peak,
                })));
            }
        }
        self.journal.record(call);
        Ok(())
    }
}

impl DeviceSession for LoopbackDevice {
    fn reset_pending_output(&self, channel: Channel) -> BoxFuture<'_, Result<(), SessionError>> {
        self.perform(DeviceCall::Reset(channel)).boxed()
    }

    fn submit_output_program(
        &self,
        channel: Channel,
        frames: Vec<PulseFrame>,
    ) -> BoxFuture<'_, Result<(), SessionError>> {
        self.perform(DeviceCall::Submit(channel, frames)).boxed()
    }
}

// ---------------------------------------------------------------------------
// Link + controller
// ---------------------------------------------------------------------------

/// Drives the "device side" of a loopback link: binding and telemetry.
pub struct LoopbackController {
    target_id: String,
    bind_tx: Option<oneshot::Sender<BindInfo>>,
    telemetry_tx: mpsc::UnboundedSender<TelemetryRecord>,
    journal: Journal,
    faults: FaultScript,
}

impl LoopbackController {
    /// Confirm the binding. Returns `false` if it was already confirmed or
    /// nobody is listening any more.
    pub fn bind(&mut self) -> bool {
        match self.bind_tx.take() {
            Some(tx) => tx.send(BindInfo::now(self.target_id.clone())).is_ok(),
            None => false,
        }
    }

    pub fn push_telemetry(&self, payload: serde_json::Value) -> bool {
        self.telemetry_tx.send(TelemetryRecord::new(payload)).is_ok()
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn faults(&self) -> FaultScript {
        self.faults.clone()
    }
}

/// Wrap `device` into a [`DeviceLink`] that binds when the returned
/// controller says so.
pub fn loopback_link(
    mut device: LoopbackDevice,
    target_id: impl Into<String>,
) -> (DeviceLink, LoopbackController) {
    let (bind_tx, bind_rx) = oneshot::channel();
    let (telemetry_tx, telemetry_rx) = mpsc::unbounded_channel();
    device.telemetry = Some(telemetry_tx.clone());

    let controller = LoopbackController {
        target_id: target_id.into(),
        bind_tx: Some(bind_tx),
        telemetry_tx,
        journal: device.journal(),
        faults: device.faults(),
    };

    let binding = async move { bind_rx.await.map_err(|_| SessionError::Closed) }.boxed();
    let telemetry = UnboundedReceiverStream::new(telemetry_rx).boxed();

    let link = DeviceLink {
        session: Box::new(device),
        binding,
        telemetry,
    };
    (link, controller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame;
    use crate::config::PulseLimits;

    #[tokio::test]
    async fn journals_accepted_calls_in_order() {
        let device = LoopbackDevice::new();
        let journal = device.journal();
        device.reset_pending_output(Channel::A).await.unwrap();
        device
            .submit_output_program(Channel::A, frame::build(10, 20, 2, &PulseLimits::default()))
            .await
            .unwrap();
        let calls = journal.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], DeviceCall::Reset(Channel::A));
        assert!(matches!(&calls[1], DeviceCall::Submit(Channel::A, f) if f.len() == 2));
        assert_eq!(journal.overlaps(), 0);
    }

    #[tokio::test]
    async fn oversized_program_is_rejected() {
        let device = LoopbackDevice::new().with_capacity(3);
        let frames = frame::build(10, 20, 4, &PulseLimits::default());
        let err = device
            .submit_output_program(Channel::B, frames)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::PulseTooLong(_)));
        assert!(device.journal().calls().is_empty());
    }

    #[tokio::test]
    async fn scripted_faults_are_returned_once() {
        let device = LoopbackDevice::new();
        device.faults().fail_next(SessionError::NotConnected);
        assert_eq!(
            device.reset_pending_output(Channel::A).await,
            Err(SessionError::NotConnected)
        );
        assert!(device.reset_pending_output(Channel::A).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_calls_are_counted_as_overlaps() {
        let device = LoopbackDevice::new().with_latency(Duration::from_millis(20));
        let journal = device.journal();
        let (a, b) = tokio::join!(
            device.reset_pending_output(Channel::A),
            device.reset_pending_output(Channel::B)
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(journal.overlaps(), 1);
    }

    #[tokio::test]
    async fn link_binds_on_command_and_streams_telemetry() {
        let (mut link, mut controller) = loopback_link(LoopbackDevice::new(), "loop-1");
        assert!(controller.bind());
        assert!(!controller.bind());
        let info = link.binding.await.unwrap();
        assert_eq!(info.target_id, "loop-1");

        link.session
            .submit_output_program(Channel::A, frame::build(30, 20, 2, &PulseLimits::default()))
            .await
            .unwrap();
        assert!(controller.push_telemetry(serde_json::json!({"strength": [5, 0]})));

        let first = link.telemetry.next().await.unwrap();
        assert_eq!(first.payload["event"], "program");
        assert_eq!(first.payload["peak"], 30);
        let second = link.telemetry.next().await.unwrap();
        assert_eq!(second.payload["strength"][0], 5);
    }

    #[tokio::test]
    async fn dropped_controller_fails_binding() {
        let (link, controller) = loopback_link(LoopbackDevice::new(), "loop-2");
        drop(controller);
        assert_eq!(link.binding.await, Err(SessionError::Closed));
    }
}
