//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response, StatusCode};
use axum::BoxError;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use webapp_host::embedded::EmbeddedResources;
use webapp_host::net::DisconnectToken;
use webapp_host::pipeline::Pipeline;
use webapp_host::sample::{self, HubSettings};
use webapp_host::{ServerHandle, WebAppServer};

pub const APP_JS: &[u8] = b"function app() { return 'app'; }";
pub const LIB_JS: &[u8] = b"function lib() { return 'lib'; }";
pub const SITE_CSS: &[u8] = b"body { margin: 0; }";

/// Fixture resources for two namespaces.
pub fn resources() -> Arc<EmbeddedResources> {
    Arc::new(
        EmbeddedResources::new()
            .with("SampleApp.Scripts.app.js", APP_JS)
            .with("SampleApp.Scripts.lib.util.js", LIB_JS)
            .with("SampleApp.Content.site.css", SITE_CSS)
            .with("SampleApp.Vendor.app.js", b"vendor"),
    )
}

/// A request as the pipeline saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub had_disconnect_token: bool,
}

/// Pipeline that records requests and answers by path:
/// `/none` → no response, `/error` → error, `/panic` → panic, anything
/// else → 200 echoing the body with two `set-cookie` headers.
#[derive(Clone, Default)]
pub struct RecordingPipeline {
    pub seen: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingPipeline {
    pub fn requests(&self) -> Vec<Recorded> {
        self.seen.lock().unwrap().clone()
    }
}

impl Pipeline for RecordingPipeline {
    fn process(
        &self,
        request: Request<Body>,
        _disconnect: DisconnectToken,
    ) -> BoxFuture<'static, Result<Option<Response<Body>>, BoxError>> {
        let seen = self.seen.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await?;
            seen.lock().unwrap().push(Recorded {
                method: parts.method.clone(),
                uri: parts.uri.to_string(),
                headers: parts.headers.clone(),
                body: body.to_vec(),
                had_disconnect_token: parts.extensions.get::<DisconnectToken>().is_some(),
            });

            match parts.uri.path() {
                "/none" => Ok(None),
                "/error" => Err("pipeline failure".into()),
                "/panic" => panic!("pipeline panic"),
                _ => Ok(Some(
                    Response::builder()
                        .status(StatusCode::ACCEPTED)
                        .header("set-cookie", "a=1")
                        .header("set-cookie", "b=2")
                        .header("content-type", "application/octet-stream")
                        .body(Body::from(body))?,
                )),
            }
        }
        .boxed()
    }
}

/// A host on an ephemeral loopback port with static folders, the counter hub
/// and a recording pipeline.
pub fn test_server() -> (WebAppServer, RecordingPipeline) {
    let pipeline = RecordingPipeline::default();
    let mut server = WebAppServer::new("http://127.0.0.1:0/").unwrap();
    server
        .add_static_folder("Scripts", "SampleApp", resources())
        .unwrap()
        .add_static_folder("Content", "SampleApp", resources())
        .unwrap();
    server
        .set_connection_router(Arc::new(sample::hub_router(HubSettings {
            tick: std::time::Duration::from_millis(20),
        })))
        .set_pipeline(Arc::new(pipeline.clone()));
    (server, pipeline)
}

/// Start `server` and return its handle and base URL.
pub async fn start(server: &WebAppServer) -> (ServerHandle, String) {
    let handle = server.start().await.unwrap();
    let base = format!("http://{}", handle.local_addr());
    (handle, base)
}

/// An HTTP client that never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Write a raw HTTP request and read the whole response.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
