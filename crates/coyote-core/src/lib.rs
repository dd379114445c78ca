//! `coyote-core`: the serialized, ceiling-enforcing pulse pipeline.
//!
//! ```text
//! ShockRequest ── validate ──▶ Sequencer (FIFO, one consumer)
//!                                  │ waits on BindingSignal
//!                                  │ caps amp at owner ceiling
//!                                  ▼
//!                            ActuationGateway ── frame::build ──▶ DeviceSession
//! ```
//!
//! The device transport is supplied from outside as a [`session::DeviceLink`];
//! [`loopback`] provides an in-process one.

pub mod binding;
pub mod config;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod loopback;
pub mod sequencer;
pub mod service;
pub mod session;
pub mod slot;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, GatewayError, Result, SessionError, ShockError};
pub use service::ShockService;
pub use types::{Channel, ShockReceipt, ShockRequest};
