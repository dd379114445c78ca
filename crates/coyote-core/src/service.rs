use crate::binding::{binding_latch, BindingLatch, BindingSignal};
use crate::config::Config;
use crate::error::{SessionError, ShockError};
use crate::gateway::ActuationGateway;
use crate::sequencer::{Sequencer, SequencerPolicy};
use crate::session::{BindInfo, DeviceLink, TelemetryRecord};
use crate::types::{ShockReceipt, ShockRequest};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const TELEMETRY_BUFFER: usize = 256;

/// The running pipeline for one device session: session task, sequencer
/// and the request boundary in front of them.
pub struct ShockService {
    config: Arc<Config>,
    sequencer: Sequencer,
    binding: BindingSignal,
    telemetry_tx: broadcast::Sender<TelemetryRecord>,
    tasks: Mutex<Option<ServiceTasks>>,
}

struct ServiceTasks {
    consumer: JoinHandle<()>,
    session: JoinHandle<()>,
}

impl ShockService {
    /// Take ownership of `link` and start both background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: Config, link: DeviceLink) -> Self {
        let DeviceLink {
            session,
            binding,
            telemetry,
        } = link;
        let (latch, signal) = binding_latch();
        let (telemetry_tx, _) = broadcast::channel(TELEMETRY_BUFFER);

        let gateway = ActuationGateway::new(session, config.limits);
        let policy = SequencerPolicy {
            owner_ceiling: config.owner_ceiling(),
            binding_timeout: config.binding_timeout(),
        };
        let (sequencer, consumer) = Sequencer::spawn(gateway, signal.clone(), policy);
        let session = tokio::spawn(run_session(binding, latch, telemetry, telemetry_tx.clone()));

        info!(
            device = %format!("{}:{}", config.device.host, config.device.port),
            owner_max = config.owner_ceiling(),
            "shock service started"
        );

        Self {
            config: Arc::new(config),
            sequencer,
            binding: signal,
            telemetry_tx,
            tasks: Mutex::new(Some(ServiceTasks { consumer, session })),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }

    pub fn binding_info(&self) -> Option<BindInfo> {
        self.binding.info()
    }

    pub fn binding(&self) -> BindingSignal {
        self.binding.clone()
    }

    pub fn pending_jobs(&self) -> usize {
        self.sequencer.pending()
    }

    pub fn subscribe_telemetry(&self) -> broadcast::Receiver<TelemetryRecord> {
        self.telemetry_tx.subscribe()
    }

    /// Validate, fail fast if the device is not bound, then queue the shock
    /// and wait for its outcome.
    pub async fn submit_shock(&self, request: ShockRequest) -> Result<ShockReceipt, ShockError> {
        let shock = request.validate(&self.config)?;
        if !self.binding.is_bound() {
            return Err(ShockError::NotReady);
        }
        self.sequencer
            .submit(shock.channel, shock.amp, shock.freq, shock.copies)
            .await
    }

    /// Stop the consumer and the session task and wait for both to finish.
    /// The device session is released once this returns. Idempotent.
    pub async fn shutdown(&self) {
        let tasks = self.tasks.lock().ok().and_then(|mut t| t.take());
        let Some(ServiceTasks { consumer, session }) = tasks else {
            return;
        };
        consumer.abort();
        session.abort();
        for (name, handle) in [("sequencer", consumer), ("session", session)] {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!(task = name, error = %e, "task ended abnormally");
                }
            }
        }
        info!("shock service stopped");
    }
}

/// Await the binding, raise the latch, then forward telemetry until the
/// stream ends.
async fn run_session(
    binding: BoxFuture<'static, Result<BindInfo, SessionError>>,
    latch: BindingLatch,
    mut telemetry: BoxStream<'static, TelemetryRecord>,
    telemetry_tx: broadcast::Sender<TelemetryRecord>,
) {
    info!("waiting for the device to bind");
    match binding.await {
        Ok(bound) => {
            info!(target_id = %bound.target_id, "device bound");
            latch.set(bound);
        }
        Err(e) => {
            error!(error = %e, "device session ended before binding");
            return;
        }
    }
    while let Some(record) = telemetry.next().await {
        debug!(payload = %record.payload, "device telemetry");
        // No subscribers is fine.
        let _ = telemetry_tx.send(record);
    }
    info!("device telemetry stream ended");
}
