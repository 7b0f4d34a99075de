//! Control-plane message shapes for session negotiation and keepalive
//!
//! Only the request/response shapes exchanged with the remote control
//! service live here. How they are carried on the wire is the transport's
//! concern.

use prost::Message;

/// Request to start a session, or resume a previous one
#[derive(Clone, PartialEq, Message)]
pub struct StartSessionRequest {
    /// Session id to resume; empty starts a fresh session
    #[prost(string, tag = "1")]
    pub resume: String,
}

/// Successful session negotiation outcome
#[derive(Clone, PartialEq, Message)]
pub struct StartSessionResponse {
    /// Server-assigned session id
    #[prost(string, tag = "1")]
    pub id: String,

    /// Window within which at least one heartbeat must arrive
    #[prost(message, optional, tag = "2")]
    pub heartbeat_window: Option<prost_types::Duration>,
}

/// Keepalive for an established session
#[derive(Clone, PartialEq, Message)]
pub struct SendHeartbeatRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}
