//! The sample host: embedded assets, a counter push endpoint and a small
//! web API, assembled on top of [`WebAppServer`].
//!
//! # Layout
//! ```text
//! /Scripts/*            SampleApp.Scripts.*   (embedded)
//! /Content/*            SampleApp.Content.*   (embedded)
//! /clientaccesspolicy.xml                     (well-known)
//! /hubs/counter         CounterHub            (realtime, server-sent events)
//! /, /home/index, /api/widgets[/{id}]         (axum pipeline)
//! ```

pub mod api;
pub mod counter_hub;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::config::HostConfig;
use crate::embedded::EmbeddedResources;
use crate::http::server::{SetupError, WebAppServer};
use crate::pipeline::RouterPipeline;
use crate::realtime::HubRouter;
use crate::resolver::ServiceRegistry;

pub use api::{Widget, WidgetStore};
pub use counter_hub::{CounterHub, HubSettings};

/// Root namespace of the sample's embedded resources.
pub const ROOT_NAMESPACE: &str = "SampleApp";

/// Path the counter hub is mapped at.
pub const COUNTER_HUB_PATH: &str = "/hubs/counter";

/// The sample's compiled-in assets.
pub fn assets() -> EmbeddedResources {
    EmbeddedResources::new()
        .with("SampleApp.Scripts.app.js", include_bytes!("../../assets/scripts/app.js"))
        .with("SampleApp.Scripts.counter.js", include_bytes!("../../assets/scripts/counter.js"))
        .with("SampleApp.Content.site.css", include_bytes!("../../assets/content/site.css"))
}

/// Router owning the counter hub and the counter it increments.
pub fn hub_router(settings: HubSettings) -> HubRouter {
    let counter = Arc::new(AtomicU64::new(u64::from(fastrand::u32(..))));
    let mut defaults = ServiceRegistry::new();
    defaults.insert(settings);
    HubRouter::with_defaults(defaults).map(COUNTER_HUB_PATH, Arc::new(CounterHub::new(counter)))
}

/// Assemble the sample host from `config`.
///
/// Without `[[static_files]]` entries the `Scripts` and `Content` folders are
/// registered under [`ROOT_NAMESPACE`].
pub fn build_server(config: &HostConfig) -> Result<WebAppServer, SetupError> {
    let resources = Arc::new(assets());
    let mut server = WebAppServer::from_config(config, resources.clone())?;

    if config.static_files.is_empty() {
        server.add_static_folder("Scripts", ROOT_NAMESPACE, resources.clone())?;
        server.add_static_folder("Content", ROOT_NAMESPACE, resources)?;
    }

    server
        .set_connection_router(Arc::new(hub_router(HubSettings::default())))
        .set_pipeline(Arc::new(RouterPipeline::new(api::router(WidgetStore::default()))));
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedded::ResourceSource;
    use crate::realtime::ConnectionRouter;

    #[test]
    fn test_assets_are_namespaced() {
        let names = assets().resource_names();
        assert!(names.iter().all(|n| n.starts_with("SampleApp.")));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_hub_mapped() {
        let router = hub_router(HubSettings::default());
        assert!(router.try_resolve("/hubs/counter").is_some());
        assert!(router.try_resolve("/hubs/other").is_none());
    }

    #[test]
    fn test_default_folders_registered() {
        let mut server = build_server(&HostConfig::default()).unwrap();
        assert_eq!(server.static_files_mut().len(), 2);
    }
}
