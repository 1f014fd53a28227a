//! Dependency resolution handed to realtime connection handlers.
//!
//! # Design
//!
//! Resolution is a capability keyed by [`TypeId`]. The host may supply its
//! own resolver (typically backed by the application's container); the
//! realtime router always has a default one. [`CompositeResolver`] puts the
//! two in a fixed primary/secondary order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// A shared, type-erased service instance.
pub type Service = Arc<dyn Any + Send + Sync>;

/// Looks up services by type.
pub trait DependencyResolver: Send + Sync {
    /// A single service of the given type, if one is registered.
    fn get_service(&self, type_id: TypeId) -> Option<Service>;

    /// Every service registered for the given type, possibly none.
    fn get_services(&self, type_id: TypeId) -> Vec<Service>;
}

impl dyn DependencyResolver {
    /// Typed convenience over [`DependencyResolver::get_service`].
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get_service(TypeId::of::<T>())
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Typed convenience over [`DependencyResolver::get_services`].
    pub fn get_all<T: Any + Send + Sync>(&self) -> Vec<Arc<T>> {
        self.get_services(TypeId::of::<T>())
            .into_iter()
            .filter_map(|service| service.downcast::<T>().ok())
            .collect()
    }
}

/// A type map of services.
///
/// ```
/// use std::sync::Arc;
/// use webapp_host::resolver::{DependencyResolver, ServiceRegistry};
///
/// struct Greeting(&'static str);
///
/// let mut registry = ServiceRegistry::new();
/// registry.insert(Greeting("hello"));
///
/// let resolver: Arc<dyn DependencyResolver> = Arc::new(registry);
/// assert_eq!(resolver.get::<Greeting>().unwrap().0, "hello");
/// ```
#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<TypeId, Vec<Service>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` as the only instance of `T`, replacing any others.
    pub fn insert<T: Any + Send + Sync>(&mut self, service: T) {
        self.services.insert(TypeId::of::<T>(), vec![Arc::new(service)]);
    }

    /// Register an additional instance of `T`.
    pub fn add<T: Any + Send + Sync>(&mut self, service: T) {
        self.services
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Arc::new(service));
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl DependencyResolver for ServiceRegistry {
    fn get_service(&self, type_id: TypeId) -> Option<Service> {
        self.services.get(&type_id).and_then(|all| all.last().cloned())
    }

    fn get_services(&self, type_id: TypeId) -> Vec<Service> {
        self.services.get(&type_id).cloned().unwrap_or_default()
    }
}

/// Primary resolver first, secondary when the primary has nothing.
pub struct CompositeResolver {
    primary: Option<Arc<dyn DependencyResolver>>,
    secondary: Arc<dyn DependencyResolver>,
}

impl CompositeResolver {
    pub fn new(primary: Option<Arc<dyn DependencyResolver>>, secondary: Arc<dyn DependencyResolver>) -> Self {
        Self { primary, secondary }
    }
}

impl DependencyResolver for CompositeResolver {
    fn get_service(&self, type_id: TypeId) -> Option<Service> {
        self.primary
            .as_ref()
            .and_then(|primary| primary.get_service(type_id))
            .or_else(|| self.secondary.get_service(type_id))
    }

    fn get_services(&self, type_id: TypeId) -> Vec<Service> {
        let services = self
            .primary
            .as_ref()
            .map(|primary| primary.get_services(type_id))
            .unwrap_or_default();
        if services.is_empty() {
            self.secondary.get_services(type_id)
        } else {
            services
        }
    }
}
