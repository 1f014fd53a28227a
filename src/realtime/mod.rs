//! Realtime (persistent connection) routing boundary.
//!
//! # Data Flow
//! ```text
//! logical path
//!     → ConnectionRouter::try_resolve (owned by the realtime layer)
//!     → handoff.rs (CORS pre-seeding, host hook, initialize)
//!     → ConnectionHandler::process(HostContext)
//!     → streaming response until the handler ends or the client leaves
//! ```
//!
//! # Design Decisions
//! - The host only asks "is there a handler for this path" and hands off
//! - Handler state lives in the router that owns the handler instances
//! - The disconnect token is the only cancellation the host offers

pub mod handoff;
pub mod hub_router;

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, Response};
use axum::BoxError;
use futures_util::future::BoxFuture;

use crate::net::connection::DisconnectToken;
use crate::resolver::DependencyResolver;

pub use handoff::RealtimeHandler;
pub use hub_router::HubRouter;

/// Item key set on debug builds.
pub const ITEM_DEBUG_MODE: &str = "host.debug_mode";
/// Item key holding the request correlation ID.
pub const ITEM_REQUEST_ID: &str = "host.request_id";

/// Maps logical paths to persistent-connection handlers.
pub trait ConnectionRouter: Send + Sync {
    fn try_resolve(&self, logical_path: &str) -> Option<Arc<dyn ConnectionHandler>>;

    /// The router's own resolver, consulted after the host's.
    fn default_resolver(&self) -> Arc<dyn DependencyResolver>;
}

/// A persistent or streaming endpoint.
pub trait ConnectionHandler: Send + Sync {
    /// Called before every `process` with the host's composed resolver.
    fn initialize(&self, resolver: Arc<dyn DependencyResolver>);

    fn process(&self, ctx: HostContext) -> BoxFuture<'static, Result<Response<Body>, BoxError>>;
}

/// The request/response adapter handed to a connection handler.
pub struct HostContext {
    pub request: Request<Body>,
    pub logical_path: String,
    /// Headers the host wants on the response; the handler's own headers win.
    pub response_headers: HeaderMap,
    /// Free-form per-request values set by the host and its hook.
    pub items: HashMap<String, String>,
    pub disconnect: DisconnectToken,
}

impl HostContext {
    pub fn item(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }
}

/// Hook run on every realtime request before handoff.
pub type RealtimeHook = Arc<dyn Fn(&mut HostContext) + Send + Sync>;
