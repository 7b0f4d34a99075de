//! Transport seams: per-call factories and dialer collaborators

pub mod dial;
pub mod traits;

pub use dial::{
    Credentials, DialOptions, DirectDialer, IceServer, PeerConnection, RtcConfig, TrackCallback,
    TrackEvent, TrackHandler, WebRtcConnection, WebRtcDialer,
};
pub use traits::{CallOptions, TransportFactory, TransportStream};
