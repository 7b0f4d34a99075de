//! Session support tracking

use std::collections::HashMap;

/// Per-call metadata attached to outgoing requests
pub type CallMetadata = HashMap<String, String>;

/// Metadata key carrying the negotiated session id on every call
pub const SESSION_METADATA_KEY: &str = "session-id";

/// Whether the remote supports sessions, as far as this connection knows
///
/// A reset returns this to `Unknown`; `Unsupported` is sticky until then.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupportState {
    /// No negotiation has completed since the last reset
    #[default]
    Unknown,
    /// The remote negotiated a session and expects heartbeats
    Supported,
    /// The remote reported the session method as unimplemented
    Unsupported,
}

/// Metadata for the recorded support state
///
/// Empty unless the remote supports sessions and an id is held.
pub(crate) fn metadata_for(support: SupportState, session_id: &str) -> CallMetadata {
    let mut metadata = CallMetadata::new();
    if support == SupportState::Supported && !session_id.is_empty() {
        metadata.insert(SESSION_METADATA_KEY.into(), session_id.into());
    }
    metadata
}
