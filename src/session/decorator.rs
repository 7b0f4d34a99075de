//! Session-decorating transport factory

use crate::session::coordinator::SessionCoordinator;
use crate::transport::{CallOptions, TransportFactory, TransportStream};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a transport factory so every call carries session metadata
///
/// Metadata is fetched per call; the first call through a fresh connection
/// is the one that negotiates the session.
pub struct SessionTransportFactory {
    inner: Arc<dyn TransportFactory>,
    session: SessionCoordinator,
}

impl SessionTransportFactory {
    pub fn new(inner: Arc<dyn TransportFactory>, session: SessionCoordinator) -> Self {
        Self { inner, session }
    }
}

#[async_trait]
impl TransportFactory for SessionTransportFactory {
    async fn transport(&self, mut options: CallOptions) -> Result<Box<dyn TransportStream>> {
        let metadata = self.session.metadata().await?;
        options.metadata.extend(metadata);
        self.inner.transport(options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;
    use crate::proto::{SendHeartbeatRequest, StartSessionRequest, StartSessionResponse};
    use crate::session::coordinator::ControlService;
    use crate::session::support::SESSION_METADATA_KEY;
    use std::io;
    use std::pin::Pin;
    use std::sync::Mutex as StdMutex;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    struct NullTransport;

    impl AsyncRead for NullTransport {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for NullTransport {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[async_trait]
    impl TransportStream for NullTransport {
        async fn shutdown(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct RecordingFactory {
        seen: StdMutex<Vec<CallOptions>>,
    }

    #[async_trait]
    impl TransportFactory for RecordingFactory {
        async fn transport(&self, options: CallOptions) -> Result<Box<dyn TransportStream>> {
            self.seen.lock().expect("lock").push(options);
            Ok(Box::new(NullTransport))
        }
    }

    struct SessionControl;

    #[async_trait]
    impl ControlService for SessionControl {
        async fn start_session(
            &self,
            _request: StartSessionRequest,
        ) -> Result<StartSessionResponse, RpcError> {
            Ok(StartSessionResponse {
                id: "abc".to_string(),
                heartbeat_window: Some(prost_types::Duration {
                    seconds: 5,
                    nanos: 0,
                }),
            })
        }

        async fn send_heartbeat(&self, _request: SendHeartbeatRequest) -> Result<(), RpcError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn calls_carry_session_metadata() {
        let inner = Arc::new(RecordingFactory {
            seen: StdMutex::new(Vec::new()),
        });
        let session = SessionCoordinator::new(Arc::new(SessionControl));
        let factory = SessionTransportFactory::new(inner.clone(), session);

        factory.transport(CallOptions::new()).await.expect("transport");

        let seen = inner.seen.lock().expect("lock");
        assert_eq!(
            seen[0].metadata.get(SESSION_METADATA_KEY).map(String::as_str),
            Some("abc")
        );
    }

    #[tokio::test]
    async fn caller_metadata_is_preserved() {
        let inner = Arc::new(RecordingFactory {
            seen: StdMutex::new(Vec::new()),
        });
        let session = SessionCoordinator::new(Arc::new(SessionControl));
        let factory = SessionTransportFactory::new(inner.clone(), session);

        let mut options = CallOptions::new();
        options.metadata.insert("trace-id".into(), "t-1".into());
        factory.transport(options).await.expect("transport");

        let seen = inner.seen.lock().expect("lock");
        assert_eq!(seen[0].metadata.get("trace-id").map(String::as_str), Some("t-1"));
        assert_eq!(
            seen[0].metadata.get(SESSION_METADATA_KEY).map(String::as_str),
            Some("abc")
        );
    }
}
