//! Connection lifecycle tracking
//!
//! Every accepted connection is registered with the [`ConnectionTracker`], which
//! keeps an active-request counter per connection in a side table. Shutdown is
//! two-phase: idle connections are closed right away, busy ones are closed as
//! soon as their last in-flight request finishes. Closing means cancelling the
//! connection's close signal; the connection task then lets hyper finish the
//! current response before the socket goes away.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::logger;

/// Per-connection bookkeeping
#[derive(Debug)]
struct ConnectionRecord {
    active_requests: usize,
    close: CancellationToken,
}

/// Tracks open connections and drives the graceful drain
#[derive(Debug)]
pub struct ConnectionTracker {
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, ConnectionRecord>>,
    shutting_down: AtomicBool,
    /// Cancelled once the listener must stop accepting
    accept_stop: CancellationToken,
    /// Woken whenever a connection deregisters
    deregistered: Notify,
    /// Hard deadline for the drain, `None` disables the watchdog
    watchdog: Option<Duration>,
}

impl ConnectionTracker {
    pub fn new(watchdog: Option<Duration>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            connections: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
            accept_stop: CancellationToken::new(),
            deregistered: Notify::new(),
            watchdog,
        }
    }

    /// Register a freshly accepted connection with zero active requests
    ///
    /// A connection registered after shutdown started is idle by definition
    /// and receives an already cancelled close signal.
    pub fn register(self: &Arc<Self>) -> ConnectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let close = CancellationToken::new();

        {
            let mut connections = self.connections.lock();
            if self.shutting_down.load(Ordering::SeqCst) {
                close.cancel();
            }
            connections.insert(
                id,
                ConnectionRecord {
                    active_requests: 0,
                    close: close.clone(),
                },
            );
        }

        ConnectionHandle {
            id,
            close,
            tracker: Arc::clone(self),
        }
    }

    /// Count a request as started; the returned guard ends it when dropped
    pub fn request_started(self: &Arc<Self>, id: u64) -> RequestGuard {
        if let Some(record) = self.connections.lock().get_mut(&id) {
            record.active_requests += 1;
        }
        RequestGuard {
            id,
            tracker: Arc::clone(self),
        }
    }

    /// Count a request as finished
    ///
    /// During shutdown the connection is closed once its counter reaches zero.
    pub fn request_finished(&self, id: u64) {
        let mut connections = self.connections.lock();
        let Some(record) = connections.get_mut(&id) else {
            return;
        };
        record.active_requests = record.active_requests.saturating_sub(1);
        if record.active_requests == 0 && self.shutting_down.load(Ordering::SeqCst) {
            record.close.cancel();
        }
    }

    /// Forget a closed connection
    pub fn deregister(&self, id: u64) {
        let removed = self.connections.lock().remove(&id);
        if removed.is_some() {
            self.deregistered.notify_waiters();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Active request count of a connection, `None` once it is deregistered
    pub fn active_requests(&self, id: u64) -> Option<usize> {
        self.connections
            .lock()
            .get(&id)
            .map(|record| record.active_requests)
    }

    /// Token cancelled when the listener must stop accepting
    pub fn accept_stopped(&self) -> CancellationToken {
        self.accept_stop.clone()
    }

    /// Drain all connections and stop accepting new ones
    ///
    /// Only the first call does anything; later calls return immediately.
    pub async fn shutdown(self: &Arc<Self>) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let (total, idle) = {
            let connections = self.connections.lock();
            let mut idle = 0;
            for record in connections.values() {
                if record.active_requests == 0 {
                    record.close.cancel();
                    idle += 1;
                }
            }
            (connections.len(), idle)
        };
        logger::log_shutdown_started(total);
        logger::log_idle_connections_closed(idle);

        self.accept_stop.cancel();
        logger::log_listener_closed();

        let watchdog = self.watchdog.map(|timeout| {
            let tracker = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                logger::log_shutdown_timeout(timeout, tracker.connection_count());
                std::process::exit(1);
            })
        });

        self.wait_drained().await;

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        logger::log_shutdown_complete();
    }

    /// Resolve once no connection is registered
    pub async fn wait_drained(&self) {
        loop {
            // Created before the check so a deregistration in between is not missed
            let notified = self.deregistered.notified();
            if self.connections.lock().is_empty() {
                return;
            }
            notified.await;
        }
    }
}

/// Registration of one connection; deregisters on drop
#[derive(Debug)]
pub struct ConnectionHandle {
    id: u64,
    close: CancellationToken,
    tracker: Arc<ConnectionTracker>,
}

impl ConnectionHandle {
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Signal cancelled when the connection must close
    pub fn close_signal(&self) -> CancellationToken {
        self.close.clone()
    }

    pub fn request_started(&self) -> RequestGuard {
        self.tracker.request_started(self.id)
    }

    pub fn tracker(&self) -> &Arc<ConnectionTracker> {
        &self.tracker
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.tracker.deregister(self.id);
    }
}

/// One in-flight request; finishing is tied to drop so cancelled requests count too
#[derive(Debug)]
pub struct RequestGuard {
    id: u64,
    tracker: Arc<ConnectionTracker>,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.tracker.request_finished(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> Arc<ConnectionTracker> {
        Arc::new(ConnectionTracker::new(None))
    }

    #[test]
    fn test_request_counting() {
        let tracker = tracker();
        let conn = tracker.register();
        assert_eq!(tracker.active_requests(conn.id()), Some(0));

        let first = conn.request_started();
        let second = conn.request_started();
        assert_eq!(tracker.active_requests(conn.id()), Some(2));

        drop(first);
        assert_eq!(tracker.active_requests(conn.id()), Some(1));
        drop(second);
        assert_eq!(tracker.active_requests(conn.id()), Some(0));
        assert!(!conn.close_signal().is_cancelled());
    }

    #[test]
    fn test_handle_drop_deregisters() {
        let tracker = tracker();
        let a = tracker.register();
        let b = tracker.register();
        assert_ne!(a.id(), b.id());
        assert_eq!(tracker.connection_count(), 2);

        let id = a.id();
        drop(a);
        assert_eq!(tracker.active_requests(id), None);
        assert_eq!(tracker.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_connections() {
        let tracker = tracker();
        let accept = tracker.accept_stopped();
        tracker.shutdown().await;
        assert!(tracker.is_shutting_down());
        assert!(accept.is_cancelled());
    }

    #[tokio::test]
    async fn test_idle_closed_busy_kept_until_done() {
        let tracker = tracker();
        let idle = tracker.register();
        let busy = tracker.register();
        let request = busy.request_started();

        let shutdown = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.shutdown().await }
        });

        idle.close_signal().cancelled().await;
        assert!(!busy.close_signal().is_cancelled());

        // Closing the idle connection removes it from the table
        drop(idle);
        tokio::task::yield_now().await;
        assert!(!shutdown.is_finished());
        assert!(!busy.close_signal().is_cancelled());

        drop(request);
        assert!(busy.close_signal().is_cancelled());

        drop(busy);
        tokio::time::timeout(Duration::from_secs(5), shutdown)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tracker.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_second_shutdown_returns_immediately() {
        let tracker = tracker();
        let conn = tracker.register();
        let _request = conn.request_started();

        let first = tokio::spawn({
            let tracker = Arc::clone(&tracker);
            async move { tracker.shutdown().await }
        });
        while !tracker.is_shutting_down() {
            tokio::task::yield_now().await;
        }

        // The drain is still pending on the busy connection
        tokio::time::timeout(Duration::from_secs(1), tracker.shutdown())
            .await
            .unwrap();
        assert!(!first.is_finished());
        first.abort();
    }

    #[tokio::test]
    async fn test_register_after_shutdown_is_closed() {
        let tracker = tracker();
        tracker.shutdown().await;
        let late = tracker.register();
        assert!(late.close_signal().is_cancelled());
    }
}
