//! Connection identity, accounting and disconnect signalling.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Count open connections
//! - Signal handlers when their client connection goes away
//!
//! # Design Decisions
//! - Open connections are counted, never drained: stopping the host abandons
//!   in-flight work
//! - The disconnect signal is a `watch` channel owned by the connection
//!   task; it fires when that task ends, however it ends

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Counts open connections for one listener.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new open connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        let now = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_connections(now);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id: ConnectionId::new(),
        }
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Guard that tracks a connection's lifetime.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let now = self.active_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        metrics::set_active_connections(now);
        tracing::trace!(connection_id = %self.id, "Connection closed");
    }
}

/// Create a linked trigger/token pair for one connection.
pub fn disconnect_pair() -> (DisconnectTrigger, DisconnectToken) {
    let (tx, rx) = watch::channel(false);
    (DisconnectTrigger { tx }, DisconnectToken { rx, _open: None })
}

/// Held by the connection task; fires its token when dropped.
#[derive(Debug)]
pub struct DisconnectTrigger {
    tx: watch::Sender<bool>,
}

impl DisconnectTrigger {
    pub fn fire(&self) {
        let _ = self.tx.send(true);
    }
}

impl Drop for DisconnectTrigger {
    fn drop(&mut self) {
        self.fire();
    }
}

/// Cooperative cancellation signal tied to a client connection.
#[derive(Debug, Clone)]
pub struct DisconnectToken {
    rx: watch::Receiver<bool>,
    /// Keeps the channel open for tokens with no connection behind them.
    _open: Option<Arc<watch::Sender<bool>>>,
}

impl DisconnectToken {
    /// A token that never fires, for requests without a live connection.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _open: Some(Arc::new(tx)),
        }
    }

    pub fn is_disconnected(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the client has gone away.
    pub async fn disconnected(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|gone| *gone).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn connection_id_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn connection_tracker_counts() {
        let tracker = ConnectionTracker::new();
        assert_eq!(tracker.active_count(), 0);

        let guard1 = tracker.track();
        assert_eq!(tracker.active_count(), 1);

        let guard2 = tracker.track();
        assert_eq!(tracker.active_count(), 2);

        drop(guard1);
        assert_eq!(tracker.active_count(), 1);

        drop(guard2);
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn disconnect_fires_when_trigger_dropped() {
        let (trigger, token) = disconnect_pair();
        assert!(!token.is_disconnected());

        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.disconnected().await })
        };
        drop(trigger);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("token should fire")
            .unwrap();
        assert!(token.is_disconnected());
    }

    #[tokio::test]
    async fn never_token_stays_connected() {
        let token = DisconnectToken::never();
        let fired = tokio::time::timeout(Duration::from_millis(50), token.disconnected()).await;
        assert!(fired.is_err());
        assert!(!token.is_disconnected());
    }
}
