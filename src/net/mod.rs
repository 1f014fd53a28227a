//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Address reservation
//!     → listener.rs (bind, accept, connection limits)
//!     → connection.rs (ID, accounting, disconnect signal)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Connections are counted but never drained on stop
//! - Plain TCP only; TLS belongs in front of the host

pub mod connection;
pub mod listener;

pub use connection::{disconnect_pair, ConnectionTracker, DisconnectToken, DisconnectTrigger};
pub use listener::{Listener, ListenerError};
