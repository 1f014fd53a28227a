//! The web application host.
//!
//! # Responsibilities
//! - Collect registrations: static folders, well-known paths, the realtime
//!   router and resolver, the fallback pipeline
//! - Freeze them into a handler chain on start
//! - Bind the reservation and run the accept loop
//! - Serve each connection on its own task, one request per connection
//!
//! # Design Decisions
//! - Registrations made after `start` are not seen by the running server
//! - The accept loop re-arms immediately; a slow request never delays the
//!   next accept
//! - Stop ends the accept loop only; in-flight requests keep running
//!   untracked and are never drained
//! - Only `ServerHandle::stop` ends the accept loop; dropping the handle
//!   detaches the server, which keeps serving until the runtime shuts down
//! - Accept errors other than per-connection failures pause the loop

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::HostConfig;
use crate::embedded::{EmbeddedFileHandler, RegistrationError, ResourceSource, StaticFileSpecCollection};
use crate::http::dispatch::Dispatcher;
use crate::http::handler::RequestHandler;
use crate::http::well_known::WellKnownResources;
use crate::lifecycle::Shutdown;
use crate::net::connection::{disconnect_pair, ConnectionTracker};
use crate::net::listener::{Listener, ListenerError};
use crate::pipeline::{FallbackBridge, Pipeline, RouterPipeline};
use crate::realtime::{ConnectionRouter, HostContext, RealtimeHandler, RealtimeHook};
use crate::resolver::{CompositeResolver, DependencyResolver};
use crate::routing::{AddressMatcher, AddressReservation, ReservationError};

const DEFAULT_EXPIRES_AFTER: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Invalid host setup, reported before anything is bound.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Failure to bring the server up.
#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("failed to read bound address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// A self-hosted web application server bound to one address reservation.
pub struct WebAppServer {
    reservation: AddressReservation,
    max_connections: usize,
    expires_after: Duration,
    static_files: StaticFileSpecCollection,
    well_known: WellKnownResources,
    connection_router: Option<Arc<dyn ConnectionRouter>>,
    dependency_resolver: Option<Arc<dyn DependencyResolver>>,
    realtime_hook: Option<RealtimeHook>,
    pipeline: Arc<dyn Pipeline>,
}

impl WebAppServer {
    /// A server for `reservation` with no registrations and an empty pipeline.
    pub fn new(reservation: &str) -> Result<Self, ReservationError> {
        Ok(Self {
            reservation: reservation.parse()?,
            max_connections: 10_000,
            expires_after: DEFAULT_EXPIRES_AFTER,
            static_files: StaticFileSpecCollection::default(),
            well_known: WellKnownResources::default(),
            connection_router: None,
            dependency_resolver: None,
            realtime_hook: None,
            pipeline: Arc::new(RouterPipeline::default()),
        })
    }

    /// Build a server from validated configuration, serving its
    /// `[[static_files]]` entries out of `resources`.
    pub fn from_config(config: &HostConfig, resources: Arc<dyn ResourceSource>) -> Result<Self, SetupError> {
        let mut server = Self::new(&config.listener.reservation)?;
        server.max_connections = config.listener.max_connections;
        server.expires_after = config.static_cache.expires_after();
        for entry in &config.static_files {
            server.add_static_files(&entry.path_prefix, &entry.namespace, resources.clone())?;
        }
        Ok(server)
    }

    pub fn reservation(&self) -> &AddressReservation {
        &self.reservation
    }

    pub fn set_max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// `Expires` horizon for embedded resources.
    pub fn set_static_expiry(&mut self, expires_after: Duration) -> &mut Self {
        self.expires_after = expires_after;
        self
    }

    pub fn static_files_mut(&mut self) -> &mut StaticFileSpecCollection {
        &mut self.static_files
    }

    /// Serve resources under `namespace` at `path_prefix`.
    pub fn add_static_files(
        &mut self,
        path_prefix: &str,
        namespace: &str,
        source: Arc<dyn ResourceSource>,
    ) -> Result<&mut Self, RegistrationError> {
        self.static_files.add(path_prefix, namespace, source)?;
        Ok(self)
    }

    /// Serve `{root_namespace}.{folder}` at `/{folder}`.
    pub fn add_static_folder(
        &mut self,
        folder: &str,
        root_namespace: &str,
        source: Arc<dyn ResourceSource>,
    ) -> Result<&mut Self, RegistrationError> {
        self.static_files.add_folder(folder, root_namespace, source)?;
        Ok(self)
    }

    pub fn well_known_mut(&mut self) -> &mut WellKnownResources {
        &mut self.well_known
    }

    pub fn set_connection_router(&mut self, router: Arc<dyn ConnectionRouter>) -> &mut Self {
        self.connection_router = Some(router);
        self
    }

    /// Resolver consulted before the connection router's own.
    pub fn set_dependency_resolver(&mut self, resolver: Arc<dyn DependencyResolver>) -> &mut Self {
        self.dependency_resolver = Some(resolver);
        self
    }

    /// Hook run on every realtime request before it is handed off.
    pub fn on_realtime_request<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&mut HostContext) + Send + Sync + 'static,
    {
        self.realtime_hook = Some(Arc::new(hook));
        self
    }

    /// Pipeline that receives every request nothing else claims.
    pub fn set_pipeline(&mut self, pipeline: Arc<dyn Pipeline>) -> &mut Self {
        self.pipeline = pipeline;
        self
    }

    fn build_handlers(&self) -> Vec<Box<dyn RequestHandler>> {
        let mut handlers: Vec<Box<dyn RequestHandler>> = self
            .static_files
            .iter()
            .map(|spec| Box::new(EmbeddedFileHandler::new(spec, self.expires_after)) as Box<dyn RequestHandler>)
            .collect();

        if !self.well_known.is_empty() {
            handlers.push(Box::new(self.well_known.clone()));
        }

        if let Some(router) = &self.connection_router {
            let resolver = CompositeResolver::new(self.dependency_resolver.clone(), router.default_resolver());
            handlers.push(Box::new(RealtimeHandler::new(
                router.clone(),
                Arc::new(resolver),
                self.realtime_hook.clone(),
            )));
        }
        handlers
    }

    /// Bind the reservation and start accepting.
    pub async fn start(&self) -> Result<ServerHandle, StartError> {
        let listener = Listener::bind(&self.reservation, self.max_connections).await?;
        let local_addr = listener.local_addr().map_err(StartError::LocalAddr)?;

        let matcher = AddressMatcher::compile(&self.reservation);
        let dispatcher = Arc::new(Dispatcher::new(
            matcher,
            local_addr,
            self.build_handlers(),
            FallbackBridge::new(self.pipeline.clone()),
        ));

        tracing::info!(
            reservation = %self.reservation,
            address = %local_addr,
            handlers = ?dispatcher.handler_names(),
            "Web application host started"
        );

        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let task = tokio::spawn(accept_loop(listener, dispatcher, shutdown.clone(), tracker.clone()));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            tracker,
            task,
        })
    }
}

/// A running server.
///
/// Dropping the handle does not stop the server; call [`ServerHandle::stop`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address actually bound (resolves ephemeral port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting new connections. In-flight requests are left running.
    pub fn stop(&self) {
        tracing::info!(address = %self.local_addr, "Stopping web application host");
        self.shutdown.trigger();
    }

    /// Wait until the accept loop has exited.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Accept loop terminated abnormally");
        }
    }
}

async fn accept_loop(
    listener: Listener,
    dispatcher: Arc<Dispatcher>,
    shutdown: Shutdown,
    tracker: ConnectionTracker,
) {
    // The loop's own sender keeps the channel open after the handle is dropped,
    // so `recv` only completes on a real stop.
    let mut stop = shutdown.subscribe();
    loop {
        let accepted = tokio::select! {
            _ = stop.recv() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer, permit)) => {
                let guard = tracker.track();
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    tracing::trace!(connection_id = %guard.id(), peer_addr = %peer, "Serving connection");
                    serve_connection(stream, peer, dispatcher).await;
                    drop(guard);
                    drop(permit);
                });
            }
            Err(e) => match e.retry_after() {
                None => tracing::debug!(error = %e, "Connection failed during accept"),
                Some(delay) => {
                    tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "Accept failed");
                    tokio::select! {
                        _ = stop.recv() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            },
        }
    }
    tracing::info!(address = ?listener.local_addr().ok(), "Accept loop stopped");
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let (trigger, token) = disconnect_pair();

    let service = service_fn(move |req: Request<Incoming>| {
        let dispatcher = dispatcher.clone();
        let token = token.clone();
        async move { Ok::<_, Infallible>(dispatcher.dispatch(req.map(Body::new), peer, token).await) }
    });

    if let Err(e) = http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        tracing::debug!(peer_addr = %peer, error = %e, "Connection ended with error");
    }

    trigger.fire();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedded::EmbeddedResources;

    fn assets() -> Arc<dyn ResourceSource> {
        Arc::new(EmbeddedResources::new().with("App.Scripts.app.js", b"run()"))
    }

    #[test]
    fn test_invalid_reservation_rejected() {
        assert!(WebAppServer::new("https://+:443/").is_err());
        assert!(WebAppServer::new("not a url").is_err());
    }

    #[test]
    fn test_folder_names_validated() {
        let mut server = WebAppServer::new("http://+:8655/").unwrap();
        assert!(server.add_static_folder("Scripts", "App", assets()).is_ok());
        assert!(server.add_static_folder("1Scripts", "App", assets()).is_err());
        assert!(server.add_static_folder("Scr-ipts", "App", assets()).is_err());
        assert_eq!(server.static_files_mut().len(), 1);
    }

    #[test]
    fn test_from_config_registers_static_files() {
        let config: HostConfig = toml::from_str(
            r#"
            [listener]
            reservation = "http://localhost:0/"
            max_connections = 4

            [[static_files]]
            path_prefix = "/Scripts"
            namespace = "App.Scripts"
            "#,
        )
        .unwrap();
        let mut server = WebAppServer::from_config(&config, assets()).unwrap();
        assert_eq!(server.max_connections, 4);
        assert_eq!(server.static_files_mut().len(), 1);
        // static handler, then well-known
        assert_eq!(server.build_handlers().len(), 2);
    }

    #[tokio::test]
    async fn test_start_binds_ephemeral_port_and_stops() {
        let server = WebAppServer::new("http://127.0.0.1:0/").unwrap();
        let handle = server.start().await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        assert_eq!(handle.active_connections(), 0);

        handle.stop();
        tokio::time::timeout(Duration::from_secs(2), handle.stopped())
            .await
            .expect("accept loop should exit");
    }

    #[tokio::test]
    async fn test_dropped_handle_keeps_accepting() {
        let server = WebAppServer::new("http://127.0.0.1:0/").unwrap();
        let addr = server.start().await.unwrap().local_addr();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(TcpStream::connect(addr).await.is_ok());
    }
}
