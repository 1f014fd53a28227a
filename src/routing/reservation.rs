//! Address reservation parsing.
//!
//! # Responsibilities
//! - Parse `scheme://host:port/path` reservation strings
//! - Recognise strong (`+`) and weak (`*`) wildcard hosts
//! - Derive the socket address to bind
//!
//! # Design Decisions
//! - Wildcards are swapped for `localhost` before handing the string to
//!   `url::Url`, so scheme, port and path get the usual URL validation
//! - Only `http` is accepted; TLS termination is left to a fronting proxy
//! - Wildcards bind the IPv4 unspecified address only; serving IPv6 clients
//!   takes a literal IPv6 reservation such as `http://[::1]:8655/`

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

/// Errors raised while parsing an address reservation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("reservation '{0}' is missing a scheme")]
    MissingScheme(String),

    #[error("reservation '{0}' is missing a host")]
    MissingHost(String),

    #[error("unsupported scheme '{scheme}' in reservation '{reservation}'")]
    UnsupportedScheme { reservation: String, scheme: String },

    #[error("invalid reservation '{reservation}': {reason}")]
    Invalid { reservation: String, reason: String },
}

/// Host component of a reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    /// A literal hostname or IP address; must match the request host exactly.
    Exact(String),
    /// `+`: binds all interfaces and accepts any `Host`.
    StrongWildcard,
    /// `*`: binds all interfaces and accepts any `Host`, ranked below every
    /// other reservation when several share a port.
    WeakWildcard,
}

impl HostPattern {
    fn is_wildcard(&self) -> bool {
        !matches!(self, HostPattern::Exact(_))
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPattern::Exact(host) => f.write_str(host),
            HostPattern::StrongWildcard => f.write_str("+"),
            HostPattern::WeakWildcard => f.write_str("*"),
        }
    }
}

/// A parsed listen-address reservation such as `http://+:8655/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressReservation {
    raw: String,
    scheme: String,
    host: HostPattern,
    port: u16,
    base_path: String,
}

impl AddressReservation {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &HostPattern {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base path, always starting and ending with `/`.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Host to bind the listening socket to. Wildcards are IPv4-only.
    pub fn bind_host(&self) -> &str {
        match &self.host {
            HostPattern::Exact(host) => host.trim_start_matches('[').trim_end_matches(']'),
            HostPattern::StrongWildcard | HostPattern::WeakWildcard => "0.0.0.0",
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for AddressReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for AddressReservation {
    type Err = ReservationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let (scheme, rest) = raw
            .split_once("://")
            .ok_or_else(|| ReservationError::MissingScheme(raw.to_string()))?;

        let scheme = scheme.to_ascii_lowercase();
        if scheme != "http" {
            return Err(ReservationError::UnsupportedScheme {
                reservation: raw.to_string(),
                scheme,
            });
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, "/"),
        };

        let host_token = split_host(authority);
        if host_token.is_empty() {
            return Err(ReservationError::MissingHost(raw.to_string()));
        }

        let host = match host_token {
            "+" => HostPattern::StrongWildcard,
            "*" => HostPattern::WeakWildcard,
            other => HostPattern::Exact(other.to_ascii_lowercase()),
        };

        let port_part = &authority[host_token.len()..];
        let normalized = format!(
            "{}://{}{}{}",
            scheme,
            if host.is_wildcard() { "localhost" } else { host_token },
            port_part,
            path
        );
        let url = Url::parse(&normalized).map_err(|e| ReservationError::Invalid {
            reservation: raw.to_string(),
            reason: e.to_string(),
        })?;

        // `Url` normalises the default port away, so fall back to the scheme default.
        let port = url.port_or_known_default().ok_or_else(|| ReservationError::Invalid {
            reservation: raw.to_string(),
            reason: "no port".to_string(),
        })?;

        let mut base_path = url.path().to_string();
        if !base_path.ends_with('/') {
            base_path.push('/');
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            host,
            port,
            base_path,
        })
    }
}

/// Returns the host portion of an authority, keeping IPv6 brackets.
fn split_host(authority: &str) -> &str {
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rfind(':') {
        Some(idx) => &authority[..idx],
        None => authority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_wildcard() {
        let r: AddressReservation = "http://+:8655/".parse().unwrap();
        assert_eq!(r.host(), &HostPattern::StrongWildcard);
        assert_eq!(r.port(), 8655);
        assert_eq!(r.base_path(), "/");
        assert_eq!(r.bind_host(), "0.0.0.0");
    }

    #[test]
    fn test_weak_wildcard_with_path() {
        let r: AddressReservation = "http://*:9000/app".parse().unwrap();
        assert_eq!(r.host(), &HostPattern::WeakWildcard);
        assert_eq!(r.base_path(), "/app/");
        assert_eq!(r.bind_host(), "0.0.0.0");
    }

    #[test]
    fn test_exact_host_default_port() {
        let r: AddressReservation = "HTTP://LocalHost/".parse().unwrap();
        assert_eq!(r.scheme(), "http");
        assert_eq!(r.host(), &HostPattern::Exact("localhost".into()));
        assert_eq!(r.port(), 80);
        assert_eq!(r.bind_host(), "localhost");
    }

    #[test]
    fn test_ipv6_host() {
        let r: AddressReservation = "http://[::1]:8080/".parse().unwrap();
        assert_eq!(r.host(), &HostPattern::Exact("[::1]".into()));
        assert_eq!(r.bind_host(), "::1");
        assert_eq!(r.port(), 8080);
    }

    #[test]
    fn test_rejects_https() {
        let err = "https://+:443/".parse::<AddressReservation>().unwrap_err();
        assert!(matches!(err, ReservationError::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_rejects_missing_scheme_and_host() {
        assert!(matches!(
            "+:8080/".parse::<AddressReservation>(),
            Err(ReservationError::MissingScheme(_))
        ));
        assert!(matches!(
            "http://:8080/".parse::<AddressReservation>(),
            Err(ReservationError::MissingHost(_))
        ));
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(matches!(
            "http://+:notaport/".parse::<AddressReservation>(),
            Err(ReservationError::Invalid { .. })
        ));
    }
}
