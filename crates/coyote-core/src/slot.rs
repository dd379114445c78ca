//! Single-assignment result slot shared between a job and its requester.

use crate::error::ShockError;
use crate::types::ShockReceipt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

pub type ShockOutcome = Result<ShockReceipt, ShockError>;

/// Create a connected slot/ticket pair.
pub fn result_slot() -> (ResultSlot, ShockTicket) {
    let (tx, rx) = oneshot::channel();
    (ResultSlot { tx: Some(tx) }, ShockTicket { rx })
}

/// Write side. Only the first [`ResultSlot::resolve`] takes effect.
#[derive(Debug)]
pub struct ResultSlot {
    tx: Option<oneshot::Sender<ShockOutcome>>,
}

impl ResultSlot {
    /// True once an outcome was assigned.
    pub fn is_resolved(&self) -> bool {
        self.tx.is_none()
    }

    /// True if the requester dropped its ticket. Resolving still assigns the
    /// outcome; nobody observes it.
    pub fn is_abandoned(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.is_closed())
    }

    /// Assign the outcome. Returns `false` if the slot was already resolved;
    /// the earlier outcome is kept.
    pub fn resolve(&mut self, outcome: ShockOutcome) -> bool {
        match self.tx.take() {
            // A requester that went away simply never observes the result.
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Read side held by the requester. Resolves to the job's outcome.
#[derive(Debug)]
pub struct ShockTicket {
    rx: oneshot::Receiver<ShockOutcome>,
}

impl Future for ShockTicket {
    type Output = ShockOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(ShockError::SequencerStopped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;

    fn receipt(amp: u32) -> ShockReceipt {
        ShockReceipt::pulse(Channel::A, amp, amp, 50, 20, 1)
    }

    #[tokio::test]
    async fn first_resolution_wins() {
        let (mut slot, ticket) = result_slot();
        assert!(!slot.is_resolved());
        assert!(slot.resolve(Ok(receipt(10))));
        assert!(slot.is_resolved());
        assert!(!slot.resolve(Err(ShockError::Transport("late".into()))));
        assert_eq!(ticket.await, Ok(receipt(10)));
    }

    #[tokio::test]
    async fn dropped_slot_reports_stopped_sequencer() {
        let (slot, ticket) = result_slot();
        drop(slot);
        assert_eq!(ticket.await, Err(ShockError::SequencerStopped));
    }

    #[test]
    fn abandoned_ticket_is_not_a_resolution() {
        let (mut slot, ticket) = result_slot();
        drop(ticket);
        assert!(slot.is_abandoned());
        assert!(!slot.is_resolved());
        assert!(slot.resolve(Ok(receipt(5))));
        assert!(slot.is_resolved());
        assert!(!slot.is_abandoned());
        assert!(!slot.resolve(Ok(receipt(6))));
    }
}
