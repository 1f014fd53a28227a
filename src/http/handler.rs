//! The handler chain contract.
//!
//! Handlers are tried in a fixed order. Each one either produces the
//! response or hands the untouched request context back for the next
//! candidate.

use axum::body::Body;
use axum::http::Response;
use futures_util::future::BoxFuture;

use crate::http::dispatch::DispatchError;
use crate::http::request::RequestContext;

/// Outcome of offering a request to one handler.
pub enum Dispatch {
    /// The handler claimed the request and produced this response.
    Handled(Response<Body>),
    /// Not ours; the context is returned for the next handler.
    NotHandled(RequestContext),
}

/// A link in the dispatch chain.
pub trait RequestHandler: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    fn handle(&self, ctx: RequestContext) -> BoxFuture<'_, Result<Dispatch, DispatchError>>;
}
