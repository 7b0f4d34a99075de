//! Session negotiation and keepalive on top of the live connection
//!
//! This module handles:
//! - Lazy session negotiation with resume across reconnects
//! - Sticky detection of remotes without session support
//! - Background heartbeats with self-healing on connection loss
//! - Decorating per-call transports with session metadata

mod coordinator;
mod decorator;
pub mod schedule;
mod support;

pub use coordinator::{ControlService, SessionCoordinator};
pub use decorator::SessionTransportFactory;
pub use schedule::{DelayRepeater, Repeater, RepeatingWork, SteadyRepeater};
pub use support::{CallMetadata, SupportState, SESSION_METADATA_KEY};
