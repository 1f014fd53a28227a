//! Per-request dispatch and error boundary.
//!
//! # Responsibilities
//! - Reconstruct the absolute URL and reject host names the reservation
//!   does not cover (the port was settled by the accepting socket)
//! - Resolve the logical path once
//! - Offer the request to each handler in precedence order
//! - Forward whatever is left to the fallback pipeline
//! - Turn every error and panic into a complete response
//!
//! # Design Decisions
//! - The chain is immutable after start and shared by all connections
//! - One span per request carries the request ID into every event below it

use std::any::Any;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::BoxError;
use futures_util::FutureExt;
use thiserror::Error;
use tracing::Instrument;

use crate::http::handler::{Dispatch, RequestHandler};
use crate::http::request::{self, RequestContext};
use crate::http::response;
use crate::net::connection::DisconnectToken;
use crate::observability::metrics;
use crate::pipeline::FallbackBridge;
use crate::routing::{AddressMatcher, RoutingError};

const INVALID_HOSTNAME: &str = "Invalid Hostname";

/// Everything that can go wrong while producing a response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("pipeline failed: {0}")]
    Pipeline(#[source] BoxError),

    #[error("realtime handler failed: {0}")]
    Realtime(#[source] BoxError),
}

/// The immutable request path shared by every connection of one server.
pub struct Dispatcher {
    matcher: AddressMatcher,
    scheme: &'static str,
    local_addr: SocketAddr,
    handlers: Vec<Box<dyn RequestHandler>>,
    fallback: FallbackBridge,
}

impl Dispatcher {
    pub fn new(
        matcher: AddressMatcher,
        local_addr: SocketAddr,
        handlers: Vec<Box<dyn RequestHandler>>,
        fallback: FallbackBridge,
    ) -> Self {
        Self {
            matcher,
            scheme: "http",
            local_addr,
            handlers,
            fallback,
        }
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Produce the response for one request. Never fails.
    pub async fn dispatch(&self, req: Request<Body>, peer: SocketAddr, disconnect: DisconnectToken) -> Response<Body> {
        let start = Instant::now();
        let request_id = request::request_id(&req);
        let method = req.method().clone();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %req.uri().path(),
            peer = %peer,
        );

        async move {
            let routed = AssertUnwindSafe(self.route(req, request_id, disconnect))
                .catch_unwind()
                .await;

            let (handler, response) = match routed {
                Ok((handler, Ok(response))) => (handler, response),
                Ok((handler, Err(err))) => (handler, error_response(handler, err)),
                Err(panic) => {
                    tracing::error!(panic = %panic_message(&*panic), "Request handler panicked");
                    ("panic", response::server_error())
                }
            };

            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), handler, start);
            tracing::debug!(
                handler,
                status = status.as_u16(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Request completed"
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn route(
        &self,
        req: Request<Body>,
        request_id: String,
        disconnect: DisconnectToken,
    ) -> (&'static str, Result<Response<Body>, DispatchError>) {
        let url = match request::absolute_url(&req, self.scheme, self.local_addr) {
            Ok(url) => url,
            Err(_) => return ("host", Err(DispatchError::BadRequest(INVALID_HOSTNAME.into()))),
        };
        if !self.matcher.accepts_host(&url) {
            return ("host", Err(DispatchError::BadRequest(INVALID_HOSTNAME.into())));
        }

        let logical_path = match self.matcher.resolve_path(&url) {
            Ok(path) => path,
            Err(e) => return ("routing", Err(e.into())),
        };

        let mut ctx = RequestContext {
            request: req,
            url,
            logical_path,
            request_id,
            disconnect,
        };

        for handler in &self.handlers {
            match handler.handle(ctx).await {
                Ok(Dispatch::Handled(response)) => return (handler.name(), Ok(response)),
                Ok(Dispatch::NotHandled(returned)) => ctx = returned,
                Err(e) => return (handler.name(), Err(e)),
            }
        }

        ("pipeline", self.fallback.forward(ctx).await)
    }
}

fn error_response(handler: &'static str, err: DispatchError) -> Response<Body> {
    match err {
        DispatchError::BadRequest(reason) => {
            tracing::warn!(reason = %reason, "Rejected request");
            response::bad_request(&reason)
        }
        DispatchError::Routing(e) => {
            tracing::error!(error = %e, "Routing invariant violated");
            response::server_error()
        }
        other => {
            tracing::error!(handler, error = %other, "Request failed");
            response::server_error()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
