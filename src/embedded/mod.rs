//! Embedded static resource subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before start):
//!     (prefix, namespace, source) → resources.rs (validate)
//!
//! Start:
//!     StaticFileSpec → handler.rs (build case-insensitive index)
//!
//! Per request:
//!     logical path → handler.rs (prefix claim, index lookup)
//!     → cache.rs (ETag, computed once per resource)
//!     → 200 / 304 / 404
//! ```

pub mod cache;
pub mod handler;
pub mod mime;
pub mod resources;

use thiserror::Error;

pub use cache::{compute_etag, EtagCache};
pub use handler::EmbeddedFileHandler;
pub use resources::{
    EmbeddedResources, ResourceNamespace, ResourceSource, StaticFileSpec, StaticFileSpecCollection,
};

/// Invalid static registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("invalid resource namespace '{0}'")]
    InvalidNamespace(String),

    #[error("incorrect format for folder name '{0}': alpha-numerics only, starting with a letter")]
    InvalidFolderName(String),

    #[error("path prefix '{0}' must start with '/'")]
    InvalidPrefix(String),
}
