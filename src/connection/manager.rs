//! Connection manager owning the single live transport to a remote
//!
//! This module handles:
//! - Serialized connect/disconnect with a shared pending-operation handle
//! - Transport selection between WebRTC and direct dialing
//! - Handing the negotiated transport factory to typed service clients

use crate::error::ClientError;
use crate::session::{ControlService, SessionCoordinator, SessionTransportFactory};
use crate::transport::{
    Credentials, DialOptions, DirectDialer, PeerConnection, RtcConfig, TrackHandler,
    TransportFactory, WebRtcDialer,
};
use anyhow::anyhow;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// WebRTC transport configuration
#[derive(Debug, Clone, Default)]
pub struct WebRtcOptions {
    /// Prefer the WebRTC transport over the direct one
    pub enabled: bool,
    /// Signaling endpoint; the service host is used when unset
    pub signaling_address: Option<String>,
    /// Peer connection configuration handed to the dialer
    pub rtc_config: Option<RtcConfig>,
}

/// Configuration for the connection manager
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Remote service host
    pub host: String,
    /// WebRTC transport settings
    pub webrtc: WebRtcOptions,
    /// Leave calls undecorated even when the remote supports sessions
    pub disable_sessions: bool,
    /// Bound on a single dial attempt
    pub dial_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:8080".into(),
            webrtc: WebRtcOptions::default(),
            disable_sessions: false,
            dial_timeout: Duration::from_secs(10),
        }
    }
}

type PendingConnect = Shared<BoxFuture<'static, Result<(), ClientError>>>;

/// Owns the single physical connection to a remote host
///
/// Cloning yields another handle to the same connection. Concurrent
/// `connect` calls share one dial attempt, and `disconnect` always waits
/// out an in-flight connect before tearing anything down.
#[derive(Clone)]
pub struct ConnectionManager {
    config: ConnectionConfig,
    direct: Arc<dyn DirectDialer>,
    webrtc: Option<Arc<dyn WebRtcDialer>>,
    tracks: Option<Arc<dyn TrackHandler>>,
    session: SessionCoordinator,
    state: Arc<ManagerState>,
}

#[derive(Default)]
struct ManagerState {
    conn: Mutex<Connection>,
    pending: Mutex<Option<PendingConnect>>,
}

#[derive(Default)]
struct Connection {
    factory: Option<Arc<dyn TransportFactory>>,
    peer: Option<Arc<dyn PeerConnection>>,
    saved_entity: Option<String>,
    saved_credentials: Option<Credentials>,
}

impl ConnectionManager {
    /// Create a manager that dials `config.host` through the given collaborators
    pub fn new(
        config: ConnectionConfig,
        direct: Arc<dyn DirectDialer>,
        control: Arc<dyn ControlService>,
    ) -> Self {
        Self {
            config,
            direct,
            webrtc: None,
            tracks: None,
            session: SessionCoordinator::new(control),
            state: Arc::new(ManagerState::default()),
        }
    }

    /// Attach the WebRTC dialer used when `webrtc.enabled` is set
    pub fn with_webrtc_dialer(mut self, dialer: Arc<dyn WebRtcDialer>) -> Self {
        self.webrtc = Some(dialer);
        self
    }

    /// Attach the collaborator notified of incoming remote media tracks
    pub fn with_track_handler(mut self, handler: Arc<dyn TrackHandler>) -> Self {
        self.tracks = Some(handler);
        self
    }

    /// Connect to the configured host
    ///
    /// Callers arriving while a dial is in flight wait for that dial and
    /// observe its outcome; a second dial is never started. Credentials
    /// given here are saved and reused by later calls that omit them.
    /// A failed attempt is not retried; call `connect` again.
    pub async fn connect(
        &self,
        auth_entity: Option<String>,
        credentials: Option<Credentials>,
    ) -> Result<(), ClientError> {
        let pending = {
            let mut pending = self.state.pending.lock().await;
            if let Some(pending) = &*pending {
                pending.clone()
            } else {
                let attempt = spawn_connect(self.clone(), auth_entity, credentials);
                *pending = Some(attempt.clone());
                attempt
            }
        };
        pending.await
    }

    /// Close the live transport, waiting out any in-flight connect first
    ///
    /// Safe to call when already disconnected.
    pub async fn disconnect(&self) {
        let pending = self.state.pending.lock().await.clone();
        if let Some(pending) = pending {
            // never tear down a connection that is mid-establishment
            let _ = pending.await;
        }
        let mut conn = self.state.conn.lock().await;
        if let Some(peer) = conn.peer.take() {
            peer.close().await;
        }
        conn.factory = None;
        drop(conn);
        self.session.reset().await;
        debug!("disconnected from {}", self.config.host);
    }

    /// The transport factory for the current connection, decorated with
    /// session metadata unless sessions are disabled
    pub async fn transport_factory(&self) -> Result<Arc<dyn TransportFactory>, ClientError> {
        let factory = {
            let conn = self.state.conn.lock().await;
            conn.factory.clone().ok_or(ClientError::NotConnected)?
        };
        if self.config.disable_sessions {
            return Ok(factory);
        }
        Ok(Arc::new(SessionTransportFactory::new(
            factory,
            self.session.clone(),
        )))
    }

    /// Build a typed service client over the current transport factory
    pub async fn service_client<C>(
        &self,
        ctor: impl FnOnce(Arc<dyn TransportFactory>) -> C,
    ) -> Result<C, ClientError> {
        Ok(ctor(self.transport_factory().await?))
    }

    /// The configured service host, guarded on connection readiness
    pub async fn host(&self) -> Result<String, ClientError> {
        let conn = self.state.conn.lock().await;
        if conn.factory.is_none() {
            return Err(ClientError::NotConnected);
        }
        Ok(self.config.host.clone())
    }

    /// True while a transport factory is held
    pub async fn is_connected(&self) -> bool {
        self.state.conn.lock().await.factory.is_some()
    }

    /// The session coordinator backing this connection
    pub fn session(&self) -> &SessionCoordinator {
        &self.session
    }
}

/// Run one dial attempt on its own task so caller cancellation cannot
/// abort it, and clear the pending slot once it settles
fn spawn_connect(
    manager: ConnectionManager,
    auth_entity: Option<String>,
    credentials: Option<Credentials>,
) -> PendingConnect {
    let task = tokio::spawn(async move {
        let result = establish(&manager, auth_entity, credentials).await;
        *manager.state.pending.lock().await = None;
        if let Err(err) = &result {
            warn!("connect to {} failed: {}", manager.config.host, err);
        }
        result
    });
    async move {
        match task.await {
            Ok(result) => result,
            Err(err) => Err(ClientError::dial(anyhow!("connect task failed: {err}"))),
        }
    }
    .boxed()
    .shared()
}

async fn establish(
    manager: &ConnectionManager,
    auth_entity: Option<String>,
    credentials: Option<Credentials>,
) -> Result<(), ClientError> {
    // a new dial invalidates the previous transport and session state
    let (auth_entity, credentials) = {
        let mut conn = manager.state.conn.lock().await;
        if let Some(peer) = conn.peer.take() {
            peer.close().await;
        }
        conn.factory = None;
        if auth_entity.is_some() {
            conn.saved_entity = auth_entity;
        }
        if credentials.is_some() {
            conn.saved_credentials = credentials;
        }
        (conn.saved_entity.clone(), conn.saved_credentials.clone())
    };
    manager.session.reset().await;

    let options = DialOptions {
        auth_entity,
        credentials,
        ..DialOptions::default()
    };

    if manager.config.webrtc.enabled {
        dial_webrtc(manager, options).await
    } else {
        dial_direct(manager, options).await
    }
}

async fn dial_direct(manager: &ConnectionManager, options: DialOptions) -> Result<(), ClientError> {
    let host = &manager.config.host;
    debug!("dialing {} directly", host);
    let factory = timeout(manager.config.dial_timeout, manager.direct.dial(host, options))
        .await
        .map_err(|_| ClientError::dial(anyhow!("dial to {host} timed out")))?
        .map_err(ClientError::dial)?;

    manager.state.conn.lock().await.factory = Some(factory);
    info!("connected to {} via direct transport", host);
    Ok(())
}

async fn dial_webrtc(
    manager: &ConnectionManager,
    mut options: DialOptions,
) -> Result<(), ClientError> {
    let dialer = manager.webrtc.as_ref().ok_or_else(|| {
        ClientError::dial(anyhow!("webrtc transport enabled but no webrtc dialer attached"))
    })?;
    let host = &manager.config.host;
    let signaling = manager
        .config
        .webrtc
        .signaling_address
        .as_deref()
        .unwrap_or(host);

    options.disable_trickle_ice = true;
    options.signaling_auth_entity = options.auth_entity.clone();
    options.signaling_credentials = options.credentials.clone();
    options.rtc_config = manager.config.webrtc.rtc_config.clone();

    debug!("dialing {} via signaling at {}", host, signaling);
    let connection = timeout(
        manager.config.dial_timeout,
        dialer.dial(signaling, host, options),
    )
    .await
    .map_err(|_| ClientError::dial(anyhow!("dial to {signaling} timed out")))?
    .map_err(ClientError::dial)?;

    if let Some(tracks) = &manager.tracks {
        let tracks = tracks.clone();
        connection.peer.on_track(Box::new(move |event| {
            tracks.on_track(&event.kind, &event.stream_id);
        }));
    }

    let mut conn = manager.state.conn.lock().await;
    conn.peer = Some(connection.peer);
    conn.factory = Some(connection.factory);
    drop(conn);
    info!("connected to {} via webrtc transport", host);
    Ok(())
}
