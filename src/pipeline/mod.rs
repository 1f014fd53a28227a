//! Fallback pipeline bridge.
//!
//! # Data Flow
//! ```text
//! RequestContext (nothing else claimed it)
//!     → FallbackBridge (absolute URI, x-request-id, disconnect extension)
//!     → Pipeline::process
//!     → Some(response) relayed as-is / None → 500
//! ```
//!
//! # Design Decisions
//! - The pipeline sees the request exactly as received, body still streaming
//! - An `axum::Router` is the stock pipeline; anything else can implement
//!   [`Pipeline`] directly

use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response, Uri};
use axum::{BoxError, Router};
use futures_util::future::{BoxFuture, FutureExt};
use tower::ServiceExt;

use crate::http::dispatch::DispatchError;
use crate::http::request::{RequestContext, X_REQUEST_ID};
use crate::http::response;
use crate::net::connection::DisconnectToken;

/// An external request pipeline that gets every request the host does not claim.
pub trait Pipeline: Send + Sync {
    /// `Ok(None)` means the pipeline produced nothing; the host answers 500.
    fn process(
        &self,
        request: Request<Body>,
        disconnect: DisconnectToken,
    ) -> BoxFuture<'static, Result<Option<Response<Body>>, BoxError>>;
}

/// Runs requests through an `axum::Router`.
#[derive(Clone, Default)]
pub struct RouterPipeline {
    router: Router,
}

impl RouterPipeline {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl Pipeline for RouterPipeline {
    fn process(
        &self,
        request: Request<Body>,
        _disconnect: DisconnectToken,
    ) -> BoxFuture<'static, Result<Option<Response<Body>>, BoxError>> {
        let router = self.router.clone();
        async move {
            let response = router.oneshot(request).await?;
            Ok::<_, BoxError>(Some(response))
        }
        .boxed()
    }
}

/// Adapts a closure into a [`Pipeline`].
pub struct PipelineFn<F> {
    f: F,
}

pub fn pipeline_fn<F, Fut>(f: F) -> PipelineFn<F>
where
    F: Fn(Request<Body>, DisconnectToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response<Body>>, BoxError>> + Send + 'static,
{
    PipelineFn { f }
}

impl<F, Fut> Pipeline for PipelineFn<F>
where
    F: Fn(Request<Body>, DisconnectToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<Response<Body>>, BoxError>> + Send + 'static,
{
    fn process(
        &self,
        request: Request<Body>,
        disconnect: DisconnectToken,
    ) -> BoxFuture<'static, Result<Option<Response<Body>>, BoxError>> {
        (self.f)(request, disconnect).boxed()
    }
}

/// Last link of the chain: hands the request to the pipeline.
#[derive(Clone)]
pub struct FallbackBridge {
    pipeline: Arc<dyn Pipeline>,
}

impl FallbackBridge {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self { pipeline }
    }

    pub async fn forward(&self, ctx: RequestContext) -> Result<Response<Body>, DispatchError> {
        let RequestContext {
            mut request,
            url,
            request_id,
            disconnect,
            ..
        } = ctx;

        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|e| DispatchError::Pipeline(Box::new(e)))?;
        *request.uri_mut() = uri;

        if !request.headers().contains_key(X_REQUEST_ID) {
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                request.headers_mut().insert(X_REQUEST_ID, value);
            }
        }
        request.extensions_mut().insert(disconnect.clone());

        match self.pipeline.process(request, disconnect).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => {
                tracing::error!(url = %url, "Pipeline produced no response");
                Ok(response::server_error())
            }
            Err(e) => Err(DispatchError::Pipeline(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Extension;
    use axum::http::{Method, StatusCode};
    use axum::routing::post;
    use url::Url;

    fn context(method: Method, path: &str) -> RequestContext {
        RequestContext {
            request: Request::builder()
                .method(method)
                .uri(path)
                .header("x-custom", "kept")
                .body(Body::from("payload"))
                .unwrap(),
            url: Url::parse(&format!("http://myhost:8655{}", path)).unwrap(),
            logical_path: path.to_string(),
            request_id: "req-42".into(),
            disconnect: DisconnectToken::never(),
        }
    }

    #[tokio::test]
    async fn test_request_is_forwarded_verbatim() {
        let bridge = FallbackBridge::new(Arc::new(pipeline_fn(|req: Request<Body>, _| async move {
            assert_eq!(req.method(), Method::POST);
            assert_eq!(req.uri().to_string(), "http://myhost:8655/api/widgets?x=1");
            assert_eq!(req.headers()["x-custom"], "kept");
            assert_eq!(req.headers()[X_REQUEST_ID], "req-42");
            assert!(req.extensions().get::<DisconnectToken>().is_some());
            let body = axum::body::to_bytes(req.into_body(), usize::MAX).await?;
            assert_eq!(&body[..], b"payload");
            Ok::<_, BoxError>(Some(
                Response::builder()
                    .status(StatusCode::CREATED)
                    .header("set-cookie", "a=1")
                    .header("set-cookie", "b=2")
                    .body(Body::empty())?,
            ))
        })));

        let res = bridge.forward(context(Method::POST, "/api/widgets?x=1")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers().get_all("set-cookie").iter().count(), 2);
    }

    #[tokio::test]
    async fn test_no_response_becomes_500() {
        let bridge = FallbackBridge::new(Arc::new(pipeline_fn(|_, _| async { Ok::<_, BoxError>(None) })));
        let res = bridge.forward(context(Method::GET, "/nothing")).await.unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_pipeline_error_propagates() {
        let bridge = FallbackBridge::new(Arc::new(pipeline_fn(|_, _| async {
            Err::<Option<Response<Body>>, BoxError>("boom".into())
        })));
        let err = bridge.forward(context(Method::GET, "/x")).await.err().unwrap();
        assert!(matches!(err, DispatchError::Pipeline(_)));
    }

    #[tokio::test]
    async fn test_router_pipeline_routes_on_path() {
        let router = Router::new().route(
            "/api/widgets",
            post(|Extension(token): Extension<DisconnectToken>| async move {
                if token.is_disconnected() { "gone" } else { "created" }
            }),
        );
        let bridge = FallbackBridge::new(Arc::new(RouterPipeline::new(router)));

        let res = bridge.forward(context(Method::POST, "/api/widgets")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"created");

        let res = bridge.forward(context(Method::GET, "/elsewhere")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
