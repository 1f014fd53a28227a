//! TCP listener bound from an address reservation, with backpressure.
//!
//! # Responsibilities
//! - Bind the socket described by the reservation
//! - Accept incoming TCP connections
//! - Enforce `max_connections` via a semaphore
//!
//! # Design Decisions
//! - Bind errors are returned to the caller, never retried
//! - Accept errors that concern a single connection are retried at once;
//!   anything else (descriptor exhaustion in particular) backs off
//! - The permit is acquired before accepting, so the kernel backlog absorbs
//!   bursts above the limit

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::routing::AddressReservation;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to accept connection.
    #[error("failed to accept: {0}")]
    Accept(#[source] std::io::Error),
}

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

impl ListenerError {
    /// How long to wait before accepting again, or `None` to retry at once.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ListenerError::Accept(e) if is_connection_error(e) => None,
            _ => Some(ACCEPT_ERROR_BACKOFF),
        }
    }
}

fn is_connection_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    )
}

/// A bounded TCP listener that limits concurrent connections.
pub struct Listener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
}

impl Listener {
    /// Bind the socket for `reservation`.
    pub async fn bind(reservation: &AddressReservation, max_connections: usize) -> Result<Self, ListenerError> {
        let host = reservation.bind_host();
        let port = reservation.port();

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ListenerError::Bind {
                address: format!("{}:{}", host, port),
                source,
            })?;

        let local_addr = listener.local_addr().map_err(|source| ListenerError::Bind {
            address: format!("{}:{}", host, port),
            source,
        })?;

        tracing::info!(
            reservation = %reservation,
            address = %local_addr,
            max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        // The semaphore is owned here and never closed.
        let permit = match self.connection_limit.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("connection semaphore is never closed"),
        };

        let (stream, addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
