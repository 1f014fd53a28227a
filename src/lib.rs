//! Self-hosted web application host.
//!
//! One listening address serves embedded static resources, fixed well-known
//! files, realtime push connections and a general request pipeline, tried in
//! that order.

pub mod config;
pub mod embedded;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pipeline;
pub mod realtime;
pub mod resolver;
pub mod routing;
pub mod sample;

pub use config::HostConfig;
pub use http::{ServerHandle, WebAppServer};
pub use lifecycle::Shutdown;
