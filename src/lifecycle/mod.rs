//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (http/server.rs):
//!     Build handler chain → Bind listener → Spawn accept loop
//!
//! Stop (shutdown.rs):
//!     ServerHandle::stop → Shutdown::trigger → accept loop exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls ServerHandle::stop
//! ```
//!
//! # Design Decisions
//! - Stop halts accepting only; in-flight requests are neither awaited nor
//!   cancelled

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{wait_for_signal, StopSignal};
