//! Session negotiation and keepalive
//!
//! This module handles:
//! - Lazy session negotiation the first time call metadata is requested
//! - Resuming the previous session id across reconnects
//! - Sticky detection of remotes without session support
//! - Background heartbeats with self-healing on connection loss

use crate::error::{ClientError, RpcError};
use crate::proto::{SendHeartbeatRequest, StartSessionRequest, StartSessionResponse};
use crate::session::schedule::{Repeater, RepeatingWork, SteadyRepeater};
use crate::session::support::{metadata_for, CallMetadata, SupportState};
use anyhow::anyhow;
use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Server windows are divided by this to get the heartbeat cadence, so
/// several beats land inside every expiry window
const HEARTBEAT_FRACTION: u32 = 5;

type PendingNegotiation = Shared<BoxFuture<'static, Result<CallMetadata, ClientError>>>;

/// Remote control service capability the session layer negotiates against
#[async_trait]
pub trait ControlService: Send + Sync {
    /// Start a new session, or resume the one named in the request
    async fn start_session(
        &self,
        request: StartSessionRequest,
    ) -> Result<StartSessionResponse, RpcError>;

    /// Keep the session named in the request alive
    async fn send_heartbeat(&self, request: SendHeartbeatRequest) -> Result<(), RpcError>;
}

/// Negotiates and keeps alive a server-side session
///
/// Cloning yields another handle to the same session state.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    service: Arc<dyn ControlService>,
    repeater: Arc<dyn Repeater>,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    support: SupportState,
    /// Retained across resets so the next negotiation can resume
    session_id: String,
    heartbeat_interval: Option<Duration>,
    pending: Option<PendingNegotiation>,
}

impl SessionCoordinator {
    /// Create a coordinator over the given control service
    pub fn new(service: Arc<dyn ControlService>) -> Self {
        Self::with_repeater(service, Arc::new(SteadyRepeater))
    }

    /// Create a coordinator with a specific repeating-work schedule
    pub fn with_repeater(service: Arc<dyn ControlService>, repeater: Arc<dyn Repeater>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                service,
                repeater,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// Metadata to attach to the next outgoing call
    ///
    /// The first call after a reset negotiates (or resumes) a session.
    /// Later calls return the recorded outcome without touching the
    /// network, and concurrent callers share a single negotiation.
    pub async fn metadata(&self) -> Result<CallMetadata, ClientError> {
        let pending = {
            let mut state = self.inner.state.lock().await;
            if let Some(pending) = &state.pending {
                pending.clone()
            } else {
                match state.support {
                    SupportState::Supported | SupportState::Unsupported => {
                        return Ok(metadata_for(state.support, &state.session_id));
                    }
                    SupportState::Unknown => {
                        let pending =
                            spawn_negotiation(self.inner.clone(), state.session_id.clone());
                        state.pending = Some(pending.clone());
                        pending
                    }
                }
            }
        };
        pending.await
    }

    /// Forget the recorded support state so the next metadata request
    /// renegotiates; the session id is retained for resumption
    ///
    /// A reset during an in-flight negotiation is a no-op so the active
    /// attempt records its outcome undisturbed.
    pub async fn reset(&self) {
        self.inner.reset().await;
    }
}

impl SessionInner {
    async fn reset(&self) {
        let mut state = self.state.lock().await;
        if state.pending.is_some() {
            return;
        }
        state.support = SupportState::Unknown;
        state.heartbeat_interval = None;
    }
}

/// Run one negotiation on its own task so caller cancellation cannot abort
/// it, and clear the pending slot once it settles
fn spawn_negotiation(inner: Arc<SessionInner>, resume: String) -> PendingNegotiation {
    let task = tokio::spawn(async move {
        let result = negotiate(&inner, resume).await;
        inner.state.lock().await.pending = None;
        result
    });
    async move {
        match task.await {
            Ok(result) => result,
            Err(err) => Err(ClientError::negotiation(anyhow!(
                "negotiation task failed: {err}"
            ))),
        }
    }
    .boxed()
    .shared()
}

async fn negotiate(inner: &Arc<SessionInner>, resume: String) -> Result<CallMetadata, ClientError> {
    match inner.service.start_session(StartSessionRequest { resume }).await {
        Err(RpcError::Unimplemented) => {
            info!("remote does not support sessions; continuing without them");
            let mut state = inner.state.lock().await;
            state.support = SupportState::Unsupported;
            Ok(CallMetadata::new())
        }
        Err(err) => Err(ClientError::negotiation(err.into())),
        Ok(response) => {
            let window = response.heartbeat_window.ok_or_else(|| {
                ClientError::negotiation(anyhow!("session response is missing a heartbeat window"))
            })?;
            let interval = heartbeat_interval(&window).ok_or_else(|| {
                ClientError::negotiation(anyhow!(
                    "session response heartbeat window is not positive"
                ))
            })?;

            let mut state = inner.state.lock().await;
            state.support = SupportState::Supported;
            state.session_id = response.id.clone();
            state.heartbeat_interval = Some(interval);
            drop(state);

            debug!(
                "session {} established, heartbeat every {}ms",
                response.id,
                interval.as_millis()
            );
            spawn_heartbeat_loop(inner.clone(), response.id.clone(), interval);
            Ok(metadata_for(SupportState::Supported, &response.id))
        }
    }
}

/// One fifth of the server window
fn heartbeat_interval(window: &prost_types::Duration) -> Option<Duration> {
    if window.seconds < 0 || window.nanos < 0 {
        return None;
    }
    let window = Duration::new(window.seconds as u64, window.nanos as u32);
    let interval = window / HEARTBEAT_FRACTION;
    (!interval.is_zero()).then_some(interval)
}

fn spawn_heartbeat_loop(inner: Arc<SessionInner>, session_id: String, interval: Duration) {
    let repeater = inner.repeater.clone();
    let work: RepeatingWork = Box::new(move || {
        let inner = inner.clone();
        let session_id = session_id.clone();
        async move { heartbeat_once(inner, session_id).await }.boxed()
    });
    tokio::spawn(async move {
        repeater.run(interval, work).await;
    });
}

/// One beat; returns `false` to stop the loop
///
/// Rechecks that this loop's session is still the current one, so a loop
/// left over from a superseded session dies instead of double-beating.
async fn heartbeat_once(inner: Arc<SessionInner>, session_id: String) -> bool {
    {
        let state = inner.state.lock().await;
        if state.support != SupportState::Supported || state.session_id != session_id {
            return false;
        }
    }
    match inner
        .service
        .send_heartbeat(SendHeartbeatRequest { id: session_id })
        .await
    {
        Ok(()) => true,
        Err(RpcError::ConnectionClosed) => {
            warn!("connection closed during heartbeat; session will renegotiate on next use");
            inner.reset().await;
            false
        }
        Err(err) => {
            debug!("heartbeat failed, treating as transient: {}", err);
            true
        }
    }
}
