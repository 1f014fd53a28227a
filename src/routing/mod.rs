//! Address routing subsystem.
//!
//! # Data Flow
//! ```text
//! Reservation string ("http://+:8655/")
//!     → reservation.rs (parse, validate, bind address)
//!     → matcher.rs (compile once)
//!
//! Per request:
//!     absolute URL (scheme + Host + path)
//!     → matcher.rs (host filter, strip authority + base path)
//!     → logical path ("/Scripts/app.js")
//! ```
//!
//! # Design Decisions
//! - Compiled at startup, immutable at runtime
//! - No regex in the hot path
//! - A URL that fails to resolve on its own listener is a defect, never a
//!   routing miss

pub mod matcher;
pub mod reservation;

pub use matcher::{AddressMatcher, RoutingError};
pub use reservation::{AddressReservation, HostPattern, ReservationError};
