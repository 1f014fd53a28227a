//! Static handler serving embedded resources under a path prefix.
//!
//! # Responsibilities
//! - Claim GET requests under the registered prefix
//! - Map the path suffix onto a dotted resource key (case-insensitive)
//! - Answer conditional GETs from the ETag cache
//! - Set content type, ETag and a long `Expires` horizon
//!
//! # Design Decisions
//! - The index is built once; the handler is immutable apart from its cache
//! - Claiming the prefix is enough to own the request, even on a miss (404)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode};
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::embedded::cache::{compute_etag, EtagCache};
use crate::embedded::mime::content_type_for;
use crate::embedded::resources::{ResourceSource, StaticFileSpec};
use crate::http::dispatch::DispatchError;
use crate::http::handler::{Dispatch, RequestHandler};
use crate::http::request::RequestContext;
use crate::http::response;
use crate::routing::matcher::starts_with_ignore_case;

/// Serves one static registration.
pub struct EmbeddedFileHandler {
    path_prefix: String,
    resource_prefix: String,
    source: Arc<dyn ResourceSource>,
    /// Lower-cased resource key → canonical resource key.
    index: HashMap<String, String>,
    etags: EtagCache,
    expires_after: Duration,
}

impl EmbeddedFileHandler {
    /// Build the handler and its case-insensitive index.
    pub fn new(spec: &StaticFileSpec, expires_after: Duration) -> Self {
        let mut path_prefix = spec.path_prefix.clone();
        if !path_prefix.ends_with('/') {
            path_prefix.push('/');
        }

        let resource_prefix = spec.namespace.prefix();
        let lowered_prefix = resource_prefix.to_lowercase();
        let index: HashMap<String, String> = spec
            .source
            .resource_names()
            .into_iter()
            .filter(|name| name.to_lowercase().starts_with(&lowered_prefix))
            .map(|name| (name.to_lowercase(), name))
            .collect();

        tracing::debug!(
            path_prefix = %path_prefix,
            namespace = %spec.namespace,
            resources = index.len(),
            "Static handler indexed"
        );

        Self {
            path_prefix,
            resource_prefix,
            source: spec.source.clone(),
            index,
            etags: EtagCache::new(),
            expires_after,
        }
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn resource_count(&self) -> usize {
        self.index.len()
    }

    pub fn etags(&self) -> &EtagCache {
        &self.etags
    }

    /// Produce a response if this handler claims `path`, otherwise `None`.
    pub fn respond(&self, method: &Method, path: &str, headers: &HeaderMap) -> Option<Response<Body>> {
        if method != Method::GET || !starts_with_ignore_case(path, &self.path_prefix) {
            return None;
        }

        let suffix = &path[self.path_prefix.len()..];
        let wanted = format!("{}{}", self.resource_prefix, suffix.replace('/', ".")).to_lowercase();
        let Some(resource) = self.index.get(&wanted) else {
            tracing::debug!(path = %path, "Embedded resource not found");
            return Some(response::not_found(path));
        };

        let (etag, content) = match self.etags.get(resource) {
            Some(etag) => (etag, None),
            None => match self.source.read(resource) {
                Some(bytes) => (self.etags.get_or_insert(resource, compute_etag(&bytes)), Some(bytes)),
                None => {
                    tracing::warn!(resource = %resource, "Indexed resource could not be read");
                    return Some(response::not_found(path));
                }
            },
        };

        let if_none_match = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok());
        if if_none_match == Some(&*etag) {
            return Some(response::not_modified());
        }

        let content = match content.or_else(|| self.source.read(resource)) {
            Some(bytes) => bytes,
            None => return Some(response::not_found(path)),
        };

        Some(self.ok(resource, &etag, content))
    }

    fn ok(&self, resource: &str, etag: &str, content: Bytes) -> Response<Body> {
        let length = content.len();
        let mut res = Response::new(Body::from(content));
        *res.status_mut() = StatusCode::OK;

        let headers = res.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type_for(resource)),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(header::ETAG, value);
        }
        let expires = httpdate::fmt_http_date(SystemTime::now() + self.expires_after);
        if let Ok(value) = HeaderValue::from_str(&expires) {
            headers.insert(header::EXPIRES, value);
        }
        res
    }
}

impl RequestHandler for EmbeddedFileHandler {
    fn name(&self) -> &'static str {
        "static"
    }

    fn handle(&self, ctx: RequestContext) -> BoxFuture<'_, Result<Dispatch, DispatchError>> {
        let outcome = match self.respond(ctx.request.method(), &ctx.logical_path, ctx.request.headers()) {
            Some(res) => Dispatch::Handled(res),
            None => Dispatch::NotHandled(ctx),
        };
        future::ready(Ok(outcome)).boxed()
    }
}
