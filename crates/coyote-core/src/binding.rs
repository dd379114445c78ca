//! One-shot binding latch.
//!
//! [`BindingLatch`] is held only by the session task and is consumed by
//! [`BindingLatch::set`], so the readiness flag can be raised once and never
//! cleared. Everyone else gets a [`BindingSignal`], which can only read or
//! await it.

use crate::error::SessionError;
use crate::session::BindInfo;
use tokio::sync::watch;

/// Create a latch and its first read handle.
pub fn binding_latch() -> (BindingLatch, BindingSignal) {
    let (tx, rx) = watch::channel(None);
    (BindingLatch { tx }, BindingSignal { rx })
}

#[derive(Debug)]
pub struct BindingLatch {
    tx: watch::Sender<Option<BindInfo>>,
}

impl BindingLatch {
    pub fn set(self, info: BindInfo) {
        // send_replace stores the value even with no receivers alive.
        self.tx.send_replace(Some(info));
    }

    pub fn signal(&self) -> BindingSignal {
        BindingSignal {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindingSignal {
    rx: watch::Receiver<Option<BindInfo>>,
}

impl BindingSignal {
    pub fn is_bound(&self) -> bool {
        self.rx.borrow().is_some()
    }

    pub fn info(&self) -> Option<BindInfo> {
        self.rx.borrow().clone()
    }

    /// Wait until the device is bound.
    ///
    /// Fails only if the latch was dropped without ever being set, i.e. the
    /// session ended before binding.
    pub async fn wait(&mut self) -> Result<BindInfo, SessionError> {
        let bound = self
            .rx
            .wait_for(|v| v.is_some())
            .await
            .map_err(|_| SessionError::Closed)?;
        (*bound).clone().ok_or(SessionError::Closed)
    }
}
