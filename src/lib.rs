//! Client-side connection management for a remote rover-control service
//!
//! Establishes exactly one live transport at a time, over either a direct
//! RPC dial or a WebRTC peer connection, and hands it out to any number of
//! typed service clients. On top of the connection, a server-side session
//! is negotiated lazily, kept alive by background heartbeats, and resumed
//! across reconnects without caller involvement.
//!
//! The transports themselves are external capabilities: embedders inject a
//! [`DirectDialer`], optionally a [`WebRtcDialer`], and the
//! [`ControlService`] the session layer negotiates against.

pub mod connection;
pub mod error;
pub mod proto;
pub mod session;
pub mod transport;

pub use connection::{ConnectionConfig, ConnectionManager, WebRtcOptions};
pub use error::{ClientError, RpcError};
pub use session::{
    CallMetadata, ControlService, SessionCoordinator, SessionTransportFactory, SupportState,
    SESSION_METADATA_KEY,
};
pub use transport::{
    CallOptions, Credentials, DialOptions, DirectDialer, IceServer, PeerConnection, RtcConfig,
    TrackCallback, TrackEvent, TrackHandler, TransportFactory, TransportStream, WebRtcConnection,
    WebRtcDialer,
};
