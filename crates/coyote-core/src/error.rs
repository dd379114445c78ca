use thiserror::Error;

/// Faults raised while loading or validating [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("invalid value for {var}: '{value}' is not a {expected}")]
    BadOverride {
        var: String,
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Faults reported by a device session (the transport collaborator).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid pulse operation: {0}")]
    InvalidPulse(String),

    #[error("pulse data too long: {0}")]
    PulseTooLong(String),

    #[error("device session is not connected")]
    NotConnected,

    #[error("device session closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

/// Faults surfaced by the actuation gateway, already classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{0}")]
    InvalidProgram(String),

    #[error("{0}")]
    ProgramTooLong(String),

    #[error("{0}")]
    Transport(String),
}

impl From<SessionError> for GatewayError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidPulse(_) => GatewayError::InvalidProgram(err.to_string()),
            SessionError::PulseTooLong(_) => GatewayError::ProgramTooLong(err.to_string()),
            other => GatewayError::Transport(other.to_string()),
        }
    }
}

/// Outcome taxonomy for a shock submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShockError {
    #[error("{0}")]
    Validation(String),

    #[error("Device/app not bound yet (pair the device first)")]
    NotReady,

    #[error("Invalid pulse: {0}")]
    InvalidPulse(String),

    #[error("Invalid pulse: {0}")]
    PulseTooLong(String),

    #[error("Shock failed: {0}")]
    Transport(String),

    #[error("device did not bind within {0}s")]
    BindingTimeout(u64),

    #[error("shock sequencer is not running")]
    SequencerStopped,
}

impl ShockError {
    /// True when the failure is attributable to what the caller asked for.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            ShockError::Validation(_) | ShockError::InvalidPulse(_) | ShockError::PulseTooLong(_)
        )
    }
}

impl From<GatewayError> for ShockError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidProgram(m) => ShockError::InvalidPulse(m),
            GatewayError::ProgramTooLong(m) => ShockError::PulseTooLong(m),
            GatewayError::Transport(m) => ShockError::Transport(m),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShockError>;
