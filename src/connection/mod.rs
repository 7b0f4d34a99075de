//! Connection management for the single live transport
//!
//! This module handles:
//! - Serialized connect/disconnect with shared pending-operation handles
//! - Transport selection between WebRTC and direct dialing
//! - Handing the negotiated transport factory to typed service clients

mod manager;

pub use manager::{ConnectionConfig, ConnectionManager, WebRtcOptions};
