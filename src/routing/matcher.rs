//! Address pattern matching.
//!
//! # Responsibilities
//! - Decide whether a request host is acceptable for the reservation
//! - Strip scheme, authority and base path from a request URL
//! - Produce the logical path handed to the dispatch chain
//!
//! # Design Decisions
//! - Compiled once from the reservation; immutable afterwards
//! - The port is settled by the socket a request arrived on; the port in
//!   the `Host` header is never compared (proxies and port mappings rewrite it)
//! - Host and base-path comparison is ASCII case-insensitive
//! - No regex: wildcard hosts compile to an "any authority" element
//! - A URL that cannot be resolved is an invariant violation, not a miss

use std::borrow::Cow;

use thiserror::Error;
use url::Url;

use crate::routing::reservation::{AddressReservation, HostPattern};

/// Raised when a URL accepted on a listener cannot be mapped back onto its
/// own reservation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("unable to resolve path for '{url}' against reservation '{reservation}'")]
    Unresolvable { url: String, reservation: String },
}

/// A compiled reservation used to resolve logical paths.
#[derive(Debug, Clone)]
pub struct AddressMatcher {
    reservation: String,
    scheme: String,
    host: HostPattern,
    base_path: String,
}

impl AddressMatcher {
    /// Compile a matcher from a parsed reservation.
    pub fn compile(reservation: &AddressReservation) -> Self {
        Self {
            reservation: reservation.as_str().to_string(),
            scheme: reservation.scheme().to_string(),
            host: reservation.host().clone(),
            base_path: reservation.base_path().to_string(),
        }
    }

    /// Returns true if the URL's host is acceptable for this reservation.
    pub fn accepts_host(&self, url: &Url) -> bool {
        match &self.host {
            HostPattern::StrongWildcard | HostPattern::WeakWildcard => true,
            HostPattern::Exact(expected) => url
                .host_str()
                .map(|h| unbracket(h).eq_ignore_ascii_case(unbracket(expected)))
                .unwrap_or(false),
        }
    }

    /// Resolve the logical path of `url`, always beginning with `/`.
    pub fn resolve_path(&self, url: &Url) -> Result<String, RoutingError> {
        let unresolvable = || RoutingError::Unresolvable {
            url: url.to_string(),
            reservation: self.reservation.clone(),
        };

        if !url.scheme().eq_ignore_ascii_case(&self.scheme) || !self.accepts_host(url) {
            return Err(unresolvable());
        }

        let path = decode(url.path());
        let remainder = if starts_with_ignore_case(&path, &self.base_path) {
            &path[self.base_path.len()..]
        } else if path.len() + 1 == self.base_path.len()
            && starts_with_ignore_case(&self.base_path, &path)
        {
            // base path requested without its trailing slash
            ""
        } else {
            return Err(unresolvable());
        };

        if remainder.starts_with('/') {
            Ok(remainder.to_string())
        } else {
            Ok(format!("/{}", remainder))
        }
    }
}

fn decode(path: &str) -> Cow<'_, str> {
    urlencoding::decode(path).unwrap_or(Cow::Borrowed(path))
}

fn unbracket(host: &str) -> &str {
    host.trim_start_matches('[').trim_end_matches(']')
}

pub(crate) fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}
