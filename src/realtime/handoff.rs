//! Handoff from the dispatch chain to a realtime connection handler.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::header::{ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
use axum::http::{HeaderMap, HeaderValue};
use futures_util::future::{BoxFuture, FutureExt};

use crate::http::dispatch::DispatchError;
use crate::http::handler::{Dispatch, RequestHandler};
use crate::http::request::RequestContext;
use crate::realtime::{ConnectionRouter, HostContext, RealtimeHook, ITEM_DEBUG_MODE, ITEM_REQUEST_ID};
use crate::resolver::DependencyResolver;

/// Dispatch-chain link that claims paths known to the connection router.
pub struct RealtimeHandler {
    router: Arc<dyn ConnectionRouter>,
    resolver: Arc<dyn DependencyResolver>,
    hook: Option<RealtimeHook>,
}

impl RealtimeHandler {
    pub fn new(
        router: Arc<dyn ConnectionRouter>,
        resolver: Arc<dyn DependencyResolver>,
        hook: Option<RealtimeHook>,
    ) -> Self {
        Self { router, resolver, hook }
    }

    async fn hand_off(&self, ctx: RequestContext) -> Result<Dispatch, DispatchError> {
        let Some(connection) = self.router.try_resolve(&ctx.logical_path) else {
            return Ok(Dispatch::NotHandled(ctx));
        };

        let mut host = HostContext {
            response_headers: cors_headers(&ctx),
            items: HashMap::new(),
            logical_path: ctx.logical_path,
            disconnect: ctx.disconnect,
            request: ctx.request,
        };
        host.items.insert(ITEM_REQUEST_ID.to_string(), ctx.request_id);
        if cfg!(debug_assertions) {
            host.items.insert(ITEM_DEBUG_MODE.to_string(), "true".to_string());
        }

        if let Some(hook) = &self.hook {
            hook(&mut host);
        }

        tracing::debug!(path = %host.logical_path, "Handing off to realtime connection");
        connection.initialize(self.resolver.clone());

        let seeded = host.response_headers.clone();
        let mut response = connection.process(host).await.map_err(DispatchError::Realtime)?;

        let headers = response.headers_mut();
        for name in seeded.keys() {
            if !headers.contains_key(name) {
                for value in seeded.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        Ok(Dispatch::Handled(response))
    }
}

/// Echo the request `Origin` and allow credentials; nothing without `Origin`.
fn cors_headers(ctx: &RequestContext) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Some(origin) = ctx.request.headers().get(ORIGIN).filter(|v| !v.is_empty()) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        headers.insert(ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
    }
    headers
}

impl RequestHandler for RealtimeHandler {
    fn name(&self) -> &'static str {
        "realtime"
    }

    fn handle(&self, ctx: RequestContext) -> BoxFuture<'_, Result<Dispatch, DispatchError>> {
        self.hand_off(ctx).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::DisconnectToken;
    use crate::realtime::{ConnectionHandler, HubRouter};
    use crate::resolver::ServiceRegistry;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use axum::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    #[derive(Default)]
    struct Echo {
        initialized: AtomicUsize,
    }

    impl ConnectionHandler for Echo {
        fn initialize(&self, _resolver: Arc<dyn DependencyResolver>) {
            self.initialized.fetch_add(1, Ordering::SeqCst);
        }

        fn process(&self, ctx: HostContext) -> BoxFuture<'static, Result<Response<Body>, BoxError>> {
            let debug = ctx.item(ITEM_DEBUG_MODE).is_some();
            async move {
                let mut res = Response::new(Body::from("pushed"));
                res.headers_mut().insert("x-debug", HeaderValue::from_static(if debug { "1" } else { "0" }));
                Ok(res)
            }
            .boxed()
        }
    }

    struct Failing;

    impl ConnectionHandler for Failing {
        fn initialize(&self, _resolver: Arc<dyn DependencyResolver>) {}

        fn process(&self, _ctx: HostContext) -> BoxFuture<'static, Result<Response<Body>, BoxError>> {
            async { Err::<Response<Body>, BoxError>("hub exploded".into()) }.boxed()
        }
    }

    fn context(path: &str, origin: Option<&str>) -> RequestContext {
        let mut builder = Request::builder().uri(path);
        if let Some(origin) = origin {
            builder = builder.header(ORIGIN, origin);
        }
        RequestContext {
            request: builder.body(Body::empty()).unwrap(),
            url: Url::parse(&format!("http://localhost{}", path)).unwrap(),
            logical_path: path.to_string(),
            request_id: "req-1".into(),
            disconnect: DisconnectToken::never(),
        }
    }

    fn handler(echo: Arc<Echo>) -> RealtimeHandler {
        let router = HubRouter::new()
            .map("/hubs/echo", echo)
            .map("/hubs/broken", Arc::new(Failing));
        RealtimeHandler::new(Arc::new(router), Arc::new(ServiceRegistry::new()), None)
    }

    #[tokio::test]
    async fn test_origin_is_echoed() {
        let echo = Arc::new(Echo::default());
        let h = handler(echo.clone());
        let Dispatch::Handled(res) = h.handle(context("/hubs/echo", Some("http://app.test"))).await.unwrap() else {
            panic!("realtime path should be handled");
        };
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "http://app.test");
        assert_eq!(res.headers()[ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(echo.initialized.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_origin_no_cors() {
        let h = handler(Arc::new(Echo::default()));
        let Dispatch::Handled(res) = h.handle(context("/hubs/echo", None)).await.unwrap() else {
            panic!("realtime path should be handled");
        };
        assert!(!res.headers().contains_key(ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(!res.headers().contains_key(ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_unknown_path_is_passed_on() {
        let h = handler(Arc::new(Echo::default()));
        match h.handle(context("/api/widgets", None)).await.unwrap() {
            Dispatch::NotHandled(ctx) => assert_eq!(ctx.logical_path, "/api/widgets"),
            Dispatch::Handled(_) => panic!("should not be handled"),
        }
    }

    #[tokio::test]
    async fn test_handler_failure_surfaces() {
        let h = handler(Arc::new(Echo::default()));
        let err = h.handle(context("/hubs/broken", None)).await.err().unwrap();
        assert!(matches!(err, DispatchError::Realtime(_)));
    }

    #[tokio::test]
    async fn test_hook_sees_context() {
        let router = HubRouter::new().map("/hubs/echo", Arc::new(Echo::default()));
        let hook: RealtimeHook = Arc::new(|host: &mut HostContext| {
            host.response_headers.insert("x-hooked", HeaderValue::from_static("yes"));
        });
        let h = RealtimeHandler::new(Arc::new(router), Arc::new(ServiceRegistry::new()), Some(hook));
        let Dispatch::Handled(res) = h.handle(context("/hubs/echo", None)).await.unwrap() else {
            panic!("realtime path should be handled");
        };
        assert_eq!(res.headers()["x-hooked"], "yes");
    }
}
