use crate::config::PulseLimits;
use crate::error::GatewayError;
use crate::frame;
use crate::session::DeviceSession;
use crate::types::Channel;
use tracing::debug;

/// Sole owner of the device session. Every output command goes through here.
pub struct ActuationGateway {
    session: Box<dyn DeviceSession>,
    limits: PulseLimits,
}

impl ActuationGateway {
    pub fn new(session: Box<dyn DeviceSession>, limits: PulseLimits) -> Self {
        Self { session, limits }
    }

    pub fn limits(&self) -> &PulseLimits {
        &self.limits
    }

    /// Clear whatever output is still pending on `channel`.
    pub async fn reset_output(&self, channel: Channel) -> Result<(), GatewayError> {
        self.session.reset_pending_output(channel).await?;
        Ok(())
    }

    /// Reset the channel, then submit a freshly built pulse program, so each
    /// burst starts immediately instead of queueing behind earlier output.
    pub async fn fire(
        &self,
        channel: Channel,
        amplitude: u32,
        frequency: u32,
        copies: u32,
    ) -> Result<(), GatewayError> {
        let frames = frame::build(amplitude, frequency, copies, &self.limits);
        self.reset_output(channel).await?;
        debug!(%channel, frames = frames.len(), "submitting pulse program");
        self.session.submit_output_program(channel, frames).await?;
        Ok(())
    }
}
