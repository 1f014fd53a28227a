//! Fixed, host-level resources served at exact paths.

use std::collections::HashMap;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Response, StatusCode};
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::http::dispatch::DispatchError;
use crate::http::handler::{Dispatch, RequestHandler};
use crate::http::request::RequestContext;

/// Path of the cross-domain client access policy.
pub const CLIENT_ACCESS_POLICY_PATH: &str = "/clientaccesspolicy.xml";

static CLIENT_ACCESS_POLICY: &[u8] = include_bytes!("../../assets/clientaccesspolicy.xml");

#[derive(Clone)]
struct FixedResource {
    content_type: &'static str,
    content: Bytes,
}

/// Exact-path resources, matched case-insensitively, GET only.
#[derive(Clone)]
pub struct WellKnownResources {
    resources: HashMap<String, FixedResource>,
}

impl WellKnownResources {
    /// No fixed paths at all.
    pub fn empty() -> Self {
        Self {
            resources: HashMap::new(),
        }
    }

    /// Register (or replace) the resource served at `path`.
    pub fn insert(&mut self, path: &str, content_type: &'static str, content: impl Into<Bytes>) {
        self.resources.insert(
            path.to_ascii_lowercase(),
            FixedResource {
                content_type,
                content: content.into(),
            },
        );
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains_key(&path.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn respond(&self, method: &Method, path: &str) -> Option<Response<Body>> {
        if method != Method::GET {
            return None;
        }
        let resource = self.resources.get(&path.to_ascii_lowercase())?;

        let mut res = Response::new(Body::from(resource.content.clone()));
        *res.status_mut() = StatusCode::OK;
        let headers = res.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(resource.content_type));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(resource.content.len()));
        Some(res)
    }
}

impl Default for WellKnownResources {
    /// The client access policy at [`CLIENT_ACCESS_POLICY_PATH`].
    fn default() -> Self {
        let mut resources = Self::empty();
        resources.insert(
            CLIENT_ACCESS_POLICY_PATH,
            "application/xml",
            Bytes::from_static(CLIENT_ACCESS_POLICY),
        );
        resources
    }
}

impl RequestHandler for WellKnownResources {
    fn name(&self) -> &'static str {
        "well_known"
    }

    fn handle(&self, ctx: RequestContext) -> BoxFuture<'_, Result<Dispatch, DispatchError>> {
        let outcome = match self.respond(ctx.method(), &ctx.logical_path) {
            Some(res) => Dispatch::Handled(res),
            None => Dispatch::NotHandled(ctx),
        };
        future::ready(Ok(outcome)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_policy_served_in_full() {
        let wk = WellKnownResources::default();
        let res = wk.respond(&Method::GET, "/ClientAccessPolicy.XML").unwrap();
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/xml");
        assert_eq!(res.headers()[header::CONTENT_LENGTH], CLIENT_ACCESS_POLICY.len().to_string().as_str());

        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], CLIENT_ACCESS_POLICY);
    }

    #[test]
    fn test_only_get_and_exact_paths() {
        let wk = WellKnownResources::default();
        assert!(wk.respond(&Method::POST, CLIENT_ACCESS_POLICY_PATH).is_none());
        assert!(wk.respond(&Method::GET, "/clientaccesspolicy.xml/extra").is_none());
        assert!(wk.respond(&Method::GET, "/crossdomain.xml").is_none());
    }

    #[test]
    fn test_extra_paths() {
        let mut wk = WellKnownResources::empty();
        assert!(wk.is_empty());
        wk.insert("/robots.txt", "text/plain", "User-agent: *\n");
        assert!(wk.contains("/ROBOTS.txt"));
        assert!(wk.respond(&Method::GET, CLIENT_ACCESS_POLICY_PATH).is_none());
    }
}
