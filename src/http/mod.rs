//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (one request, then close)
//!     → server.rs (hyper http1, disconnect token, spawn per connection)
//!     → dispatch.rs (request ID, host check, logical path, error boundary)
//!     → handler chain, in order:
//!         static handlers (registration order)
//!         well_known.rs (fixed paths)
//!         realtime handoff
//!     → fallback pipeline
//!     → response.rs (canned bodies for 304/400/404/500)
//! ```

pub mod dispatch;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;
pub mod well_known;

pub use dispatch::{DispatchError, Dispatcher};
pub use handler::{Dispatch, RequestHandler};
pub use request::{RequestContext, X_REQUEST_ID};
pub use server::{ServerHandle, SetupError, StartError, WebAppServer};
pub use well_known::WellKnownResources;
