//! Error taxonomy for the connection and session layers

use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced to callers of the connection manager and session layer
///
/// Cloneable so the single outcome of an in-flight dial or negotiation can
/// be fanned out to every caller waiting on it.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// No transport factory exists yet; `connect` has never succeeded
    #[error("not connected; call connect() first")]
    NotConnected,

    /// The underlying dialer failed; the caller must reconnect explicitly
    #[error("dial failed: {0}")]
    DialFailure(Arc<anyhow::Error>),

    /// Session negotiation failed with something other than "unimplemented"
    #[error("session negotiation failed: {0}")]
    SessionNegotiation(Arc<anyhow::Error>),
}

impl ClientError {
    pub(crate) fn dial(err: anyhow::Error) -> Self {
        Self::DialFailure(Arc::new(err))
    }

    pub(crate) fn negotiation(err: anyhow::Error) -> Self {
        Self::SessionNegotiation(Arc::new(err))
    }
}

/// Errors returned by the remote control service collaborator
///
/// The session layer treats the first two variants specially: an
/// unimplemented session method marks the remote as session-free, and a
/// closed connection during a heartbeat triggers a session reset.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The remote does not implement the requested method
    #[error("method not implemented by remote")]
    Unimplemented,

    /// The underlying connection is closed
    #[error("connection closed")]
    ConnectionClosed,

    /// Any other failure
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
