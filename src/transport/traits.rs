//! Transport trait abstraction shared by service clients and dialers

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::io::{AsyncRead, AsyncWrite};

/// A transport stream that can read and write bytes
#[async_trait]
pub trait TransportStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Close the transport gracefully
    async fn shutdown(&mut self) -> Result<()>;
}

/// Per-call options attached to every transport the factory opens
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// String-keyed metadata sent alongside the call
    pub metadata: HashMap<String, String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Produces a concrete transport for each outgoing call
///
/// A successful dial yields one of these; typed service clients hold it for
/// the lifetime of the connection and open per-call transports through it.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Open a transport for a single call
    async fn transport(&self, options: CallOptions) -> Result<Box<dyn TransportStream>>;
}
