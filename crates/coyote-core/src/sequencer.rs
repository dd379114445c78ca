//! Single-consumer command sequencer.
//!
//! Every shock becomes a [`ShockJob`] on an unbounded FIFO. One background
//! task drains it: wait for the device binding, cap the amplitude at the
//! owner ceiling, fire through the [`ActuationGateway`], resolve the job's
//! slot, move on. The consumer is the only caller of the gateway, so at most
//! one device command is ever outstanding and jobs run in submission order.

use crate::binding::BindingSignal;
use crate::error::ShockError;
use crate::gateway::ActuationGateway;
use crate::slot::{result_slot, ResultSlot, ShockOutcome, ShockTicket};
use crate::types::{Channel, ShockReceipt, AMP_MAX};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JobState {
    Queued,
    WaitingForBinding,
    Executing,
    Resolved,
}

/// One queued actuation request.
#[derive(Debug)]
pub struct ShockJob {
    pub id: Uuid,
    pub channel: Channel,
    pub amp_requested: u32,
    pub freq: u32,
    pub copies: u32,
    state: JobState,
    slot: ResultSlot,
    pending: Option<PendingGuard>,
}

/// Counts a job as pending until it is resolved or dropped, so jobs lost to
/// a stopped consumer are released too.
#[derive(Debug)]
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ShockJob {
    pub fn new(channel: Channel, amp_requested: u32, freq: u32, copies: u32) -> (Self, ShockTicket) {
        let (slot, ticket) = result_slot();
        let job = Self {
            id: Uuid::new_v4(),
            channel,
            amp_requested,
            freq,
            copies,
            state: JobState::Queued,
            slot,
            pending: None,
        };
        (job, ticket)
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move forward to `next`. Backward moves are ignored.
    pub fn advance(&mut self, next: JobState) -> bool {
        if next <= self.state {
            return false;
        }
        debug!(job_id = %self.id, from = ?self.state, to = ?next, "job state");
        self.state = next;
        true
    }

    /// Resolve the job's slot once; later calls keep the first outcome.
    pub fn resolve(&mut self, outcome: ShockOutcome) -> bool {
        self.advance(JobState::Resolved);
        // Released before the requester wakes.
        self.pending.take();
        if self.slot.is_abandoned() {
            debug!(job_id = %self.id, "result will not be observed");
        }
        self.slot.resolve(outcome)
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerPolicy {
    /// Owner amplitude ceiling, percent.
    pub owner_ceiling: u32,
    /// Upper bound on the binding wait. `None` waits forever.
    pub binding_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

/// Submission handle for the consumer task. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Sequencer {
    tx: mpsc::UnboundedSender<ShockJob>,
    pending: Arc<AtomicUsize>,
}

impl Sequencer {
    /// Start the consumer. The returned handle is the only way to stop it.
    pub fn spawn(
        gateway: ActuationGateway,
        binding: BindingSignal,
        mut policy: SequencerPolicy,
    ) -> (Self, JoinHandle<()>) {
        policy.owner_ceiling = policy.owner_ceiling.min(AMP_MAX);
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let consumer = Consumer {
            rx,
            gateway,
            binding,
            policy,
        };
        let handle = tokio::spawn(consumer.run());
        (Self { tx, pending }, handle)
    }

    /// Append a job to the tail of the queue. Never blocks; if the consumer
    /// is gone the ticket resolves to [`ShockError::SequencerStopped`].
    pub fn submit(&self, channel: Channel, amplitude: u32, frequency: u32, copies: u32) -> ShockTicket {
        let (mut job, ticket) = ShockJob::new(channel, amplitude, frequency, copies);
        job.pending = Some(PendingGuard::acquire(&self.pending));
        debug!(job_id = %job.id, %channel, amplitude, frequency, copies, "job queued");
        // A rejected job is dropped here, which releases its slot and guard.
        let _ = self.tx.send(job);
        ticket
    }

    /// Jobs queued or in progress. Jobs dropped by a stopped consumer are
    /// not counted.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

struct Consumer {
    rx: mpsc::UnboundedReceiver<ShockJob>,
    gateway: ActuationGateway,
    binding: BindingSignal,
    policy: SequencerPolicy,
}

impl Consumer {
    async fn run(mut self) {
        info!(owner_ceiling = self.policy.owner_ceiling, "shock sequencer started");
        while let Some(mut job) = self.rx.recv().await {
            let outcome = self.process(&mut job).await;
            match &outcome {
                Ok(r) => info!(
                    job_id = %job.id,
                    channel = %r.channel,
                    amp_requested = r.amp_requested,
                    amp_effective = r.amp_effective,
                    freq = r.freq,
                    copies = r.copies,
                    "shock fired"
                ),
                Err(e) => warn!(job_id = %job.id, error = %e, "shock failed"),
            }
            job.resolve(outcome);
        }
        info!("shock sequencer stopped");
    }

    async fn process(&mut self, job: &mut ShockJob) -> ShockOutcome {
        job.advance(JobState::WaitingForBinding);
        self.await_binding().await?;

        job.advance(JobState::Executing);
        let limits = *self.gateway.limits();
        let amp_effective = job.amp_requested.min(self.policy.owner_ceiling);
        let freq = limits.clamp_freq(job.freq);
        let copies = limits.clamp_copies(job.copies);

        self.gateway
            .fire(job.channel, amp_effective, freq, copies)
            .await?;

        Ok(ShockReceipt::pulse(
            job.channel,
            job.amp_requested,
            amp_effective,
            self.policy.owner_ceiling,
            freq,
            copies,
        ))
    }

    async fn await_binding(&mut self) -> Result<(), ShockError> {
        if self.binding.is_bound() {
            return Ok(());
        }
        debug!("waiting for device binding");
        let wait = self.binding.wait();
        let bound = match self.policy.binding_timeout {
            None => wait.await,
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| ShockError::BindingTimeout(limit.as_secs()))?,
        };
        bound
            .map(|_| ())
            .map_err(|e| ShockError::Transport(format!("device session ended before binding: {e}")))
    }
}
