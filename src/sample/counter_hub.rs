//! A push endpoint that streams an ever-increasing counter as
//! server-sent events.
//!
//! ```text
//! event: setCounter
//! data: 1804289384
//!
//! ```

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::BoxError;
use futures_util::future::{BoxFuture, FutureExt};
use futures_util::stream::{self, StreamExt};

use crate::realtime::{ConnectionHandler, HostContext, ITEM_REQUEST_ID};
use crate::resolver::DependencyResolver;

const FIRST_TICK: Duration = Duration::from_millis(100);

/// Tuning the hub picks up from the dependency resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubSettings {
    pub tick: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
        }
    }
}

/// Streams `setCounter` events until the client goes away.
pub struct CounterHub {
    counter: Arc<AtomicU64>,
    tick_ms: AtomicU64,
}

impl CounterHub {
    /// A hub incrementing the shared `counter`.
    pub fn new(counter: Arc<AtomicU64>) -> Self {
        Self {
            counter,
            tick_ms: AtomicU64::new(HubSettings::default().tick.as_millis() as u64),
        }
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.load(Ordering::Relaxed))
    }
}

fn event(value: u64) -> Bytes {
    Bytes::from(format!("event: setCounter\ndata: {}\n\n", value))
}

impl ConnectionHandler for CounterHub {
    fn initialize(&self, resolver: Arc<dyn DependencyResolver>) {
        let settings = resolver.get::<HubSettings>().map(|s| *s).unwrap_or_default();
        self.tick_ms
            .store(settings.tick.as_millis().max(1) as u64, Ordering::Relaxed);
    }

    fn process(&self, ctx: HostContext) -> BoxFuture<'static, Result<Response<Body>, BoxError>> {
        let counter = self.counter.clone();
        let tick = self.tick();
        let disconnect = ctx.disconnect.clone();
        let request_id = ctx.item(ITEM_REQUEST_ID).unwrap_or_default().to_string();

        async move {
            tracing::debug!(request_id = %request_id, tick_ms = tick.as_millis() as u64, "Counter stream opened");

            let start = tokio::time::Instant::now() + FIRST_TICK;
            let ticks = stream::unfold(tokio::time::interval_at(start, tick), |mut interval| async move {
                interval.tick().await;
                Some(((), interval))
            });
            let events = ticks
                .map(move |_| Ok::<_, Infallible>(event(counter.fetch_add(1, Ordering::SeqCst) + 1)))
                .take_until(async move { disconnect.disconnected().await });

            let response = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"))
                .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
                .body(Body::from_stream(events))?;
            Ok::<_, BoxError>(response)
        }
        .boxed()
    }
}
