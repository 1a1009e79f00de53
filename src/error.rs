//! Typed error surface for cloud and channel operations.
//!
//! Authentication and registration failures are recoverable and come back
//! as values the caller can branch on; transport faults wrap their source
//! errors so the periodic publisher can log an attempt's failure and let
//! the schedule re-arm instead of tearing the process down.

use thiserror::Error;

/// Errors produced by cloud session operations and the telemetry publisher.
#[derive(Debug, Error)]
pub enum Error {
    /// Login failed, or a login-gated operation ran without a session.
    #[error("authentication failed: {reason}")]
    Auth { reason: String },

    /// A sensor-scoped operation ran with no sensor registered.
    #[error("no sensor registered for this session")]
    SensorNotRegistered,

    /// The platform answered an API call with a non-success status.
    #[error("{operation} rejected by the platform ({status})")]
    Api {
        operation: &'static str,
        status: reqwest::StatusCode,
    },

    /// Transport-level failure on the HTTP API.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-level failure on the messaging channel.
    #[error("channel transport failed: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    /// The peer sent something that is not a valid frame, or hung up
    /// before answering.
    #[error("protocol violation: {reason}")]
    Protocol { reason: String },

    /// The bounded wait for an inbound channel message elapsed.
    #[error("timed out waiting for a channel message")]
    Timeout,
}

impl Error {
    pub(crate) fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
