//! Path-mapped connection router.

use std::sync::Arc;

use crate::realtime::{ConnectionHandler, ConnectionRouter};
use crate::resolver::{DependencyResolver, ServiceRegistry};

/// Routes a logical path to the handler mapped at it or at a parent path.
///
/// Matching is case-insensitive; `/hubs/counter` also claims
/// `/hubs/counter/negotiate` but not `/hubs/counterx`.
pub struct HubRouter {
    routes: Vec<(String, Arc<dyn ConnectionHandler>)>,
    defaults: Arc<ServiceRegistry>,
}

impl HubRouter {
    pub fn new() -> Self {
        Self::with_defaults(ServiceRegistry::new())
    }

    /// Use `defaults` as the router's own resolver.
    pub fn with_defaults(defaults: ServiceRegistry) -> Self {
        Self {
            routes: Vec::new(),
            defaults: Arc::new(defaults),
        }
    }

    /// Map `path` to `handler`. Later mappings of the same path win.
    pub fn map(mut self, path: &str, handler: Arc<dyn ConnectionHandler>) -> Self {
        let path = normalize(path);
        self.routes.retain(|(existing, _)| existing != &path);
        self.routes.push((path, handler));
        // longest path first so nested mappings are preferred
        self.routes.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for HubRouter {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    let mut path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    path.make_ascii_lowercase();
    path
}

fn claims(mapped: &str, requested: &str) -> bool {
    if requested.len() < mapped.len() || !requested.is_char_boundary(mapped.len()) {
        return false;
    }
    let (head, rest) = requested.split_at(mapped.len());
    head.eq_ignore_ascii_case(mapped) && (rest.is_empty() || rest.starts_with('/'))
}

impl ConnectionRouter for HubRouter {
    fn try_resolve(&self, logical_path: &str) -> Option<Arc<dyn ConnectionHandler>> {
        self.routes
            .iter()
            .find(|(mapped, _)| claims(mapped, logical_path))
            .map(|(_, handler)| Arc::clone(handler))
    }

    fn default_resolver(&self) -> Arc<dyn DependencyResolver> {
        self.defaults.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::HostContext;
    use axum::body::Body;
    use axum::http::Response;
    use axum::BoxError;
    use futures_util::future::{BoxFuture, FutureExt};

    struct Named(&'static str);

    impl ConnectionHandler for Named {
        fn initialize(&self, _resolver: Arc<dyn DependencyResolver>) {}

        fn process(&self, _ctx: HostContext) -> BoxFuture<'static, Result<Response<Body>, BoxError>> {
            let name = self.0;
            async move { Ok(Response::new(Body::from(name))) }.boxed()
        }
    }

    fn router() -> HubRouter {
        HubRouter::new()
            .map("/hubs/counter", Arc::new(Named("counter")))
            .map("/hubs/counter/admin/", Arc::new(Named("admin")))
    }

    #[test]
    fn test_exact_and_subpath() {
        let r = router();
        assert!(r.try_resolve("/hubs/counter").is_some());
        assert!(r.try_resolve("/HUBS/Counter/negotiate").is_some());
        assert!(r.try_resolve("/hubs/counterx").is_none());
        assert!(r.try_resolve("/hubs").is_none());
        assert!(r.try_resolve("/").is_none());
    }

    #[test]
    fn test_nested_mapping_preferred() {
        let r = router();
        let admin = r.try_resolve("/hubs/counter/admin/poll").unwrap();
        let plain = r.try_resolve("/hubs/counter/poll").unwrap();
        assert!(!Arc::ptr_eq(&admin, &plain));
    }

    #[test]
    fn test_remap_replaces() {
        let r = HubRouter::new()
            .map("/a", Arc::new(Named("one")))
            .map("/A/", Arc::new(Named("two")));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_default_resolver_uses_registry() {
        let mut defaults = ServiceRegistry::new();
        defaults.insert(42u32);
        let r = HubRouter::with_defaults(defaults);
        assert_eq!(*r.default_resolver().get::<u32>().unwrap(), 42);
    }
}
