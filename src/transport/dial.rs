//! Dialer collaborator seams for the direct and WebRTC transports

use crate::transport::traits::TransportFactory;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Auth material presented when dialing
///
/// The payload is redacted from debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Credential type understood by the remote (for example "api-key")
    pub kind: String,
    pub payload: String,
}

impl Credentials {
    pub fn new(kind: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: payload.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("kind", &self.kind)
            .field("payload", &"<redacted>")
            .finish()
    }
}

/// A STUN/TURN server entry
#[derive(Debug, Clone, Default)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Peer connection configuration handed to the WebRTC dialer
#[derive(Debug, Clone, Default)]
pub struct RtcConfig {
    pub ice_servers: Vec<IceServer>,
}

/// Options passed to the dialer collaborators
#[derive(Debug, Clone, Default)]
pub struct DialOptions {
    pub auth_entity: Option<String>,
    pub credentials: Option<Credentials>,
    /// Disable trickle ICE during WebRTC negotiation
    pub disable_trickle_ice: bool,
    /// Auth presented to the signaling endpoint, when it differs
    pub signaling_auth_entity: Option<String>,
    pub signaling_credentials: Option<Credentials>,
    pub rtc_config: Option<RtcConfig>,
}

/// Dials the remote service host directly
#[async_trait]
pub trait DirectDialer: Send + Sync {
    async fn dial(&self, host: &str, options: DialOptions) -> Result<Arc<dyn TransportFactory>>;
}

/// A remote media track announced by the peer connection
#[derive(Debug, Clone)]
pub struct TrackEvent {
    /// Track kind as reported by the peer (audio, video)
    pub kind: String,
    /// Identifier of the stream the track belongs to
    pub stream_id: String,
}

/// Callback invoked for every incoming remote track
pub type TrackCallback = Box<dyn Fn(TrackEvent) + Send + Sync>;

/// Live peer connection produced by the WebRTC dialer
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Register the callback invoked for incoming remote tracks
    fn on_track(&self, callback: TrackCallback);

    /// Close the peer connection and release its resources
    async fn close(&self);
}

/// Result of a successful WebRTC dial
pub struct WebRtcConnection {
    pub peer: Arc<dyn PeerConnection>,
    pub factory: Arc<dyn TransportFactory>,
}

/// Dials via WebRTC signaling, yielding a peer connection and a factory
#[async_trait]
pub trait WebRtcDialer: Send + Sync {
    async fn dial(
        &self,
        signaling_address: &str,
        host: &str,
        options: DialOptions,
    ) -> Result<WebRtcConnection>;
}

/// External collaborator that attaches remote media tracks to a surface
pub trait TrackHandler: Send + Sync {
    fn on_track(&self, kind: &str, stream_id: &str);
}
