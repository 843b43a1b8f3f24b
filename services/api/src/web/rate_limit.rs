//! services/api/src/web/rate_limit.rs
//!
//! Per-client request limiting with a fixed window.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Most clients tracked at once.
const MAX_TRACKED_CLIENTS: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

struct Clients {
    windows: HashMap<String, Window>,
    last_pruned: Instant,
}

/// Allows each client `max_requests` requests per `window`.
/// A limit of zero disables limiting.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    max_clients: usize,
    clients: Mutex<Clients>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_max_clients(max_requests, window, MAX_TRACKED_CLIENTS)
    }

    fn with_max_clients(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            max_requests,
            window,
            max_clients: max_clients.max(1),
            clients: Mutex::new(Clients {
                windows: HashMap::new(),
                last_pruned: Instant::now(),
            }),
        }
    }

    /// Records one request from `client`. Returns false if it is over the limit.
    pub async fn try_acquire(&self, client: &str) -> bool {
        if self.max_requests == 0 {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.clients.lock().await;

        if !clients.windows.contains_key(client) && clients.windows.len() >= self.max_clients {
            self.make_room(&mut clients, now);
        }

        let window = clients.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        // Reset window if expired
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count < self.max_requests {
            window.count += 1;
            true
        } else {
            false
        }
    }

    /// Frees one slot for a new client. Expired windows are swept at most once
    /// per window; otherwise the oldest window is evicted.
    fn make_room(&self, clients: &mut Clients, now: Instant) {
        if now.duration_since(clients.last_pruned) >= self.window {
            let window = self.window;
            clients
                .windows
                .retain(|_, w| now.duration_since(w.started) < window);
            clients.last_pruned = now;
        }

        if clients.windows.len() >= self.max_clients {
            let oldest = clients
                .windows
                .iter()
                .min_by_key(|(_, w)| w.started)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                clients.windows.remove(&key);
            }
        }
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limits_each_client_separately() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(limiter.try_acquire("10.0.0.1").await);
        }
        assert!(!limiter.try_acquire("10.0.0.1").await);
        assert!(limiter.try_acquire("10.0.0.2").await);
    }

    #[tokio::test]
    async fn window_expiry_restores_capacity() {
        let limiter = RateLimiter::new(1, Duration::from_millis(50));

        assert!(limiter.try_acquire("client").await);
        assert!(!limiter.try_acquire("client").await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.try_acquire("client").await);
    }

    #[tokio::test]
    async fn zero_limit_disables_limiting() {
        let limiter = RateLimiter::new(0, Duration::from_secs(60));
        for _ in 0..100 {
            assert!(limiter.try_acquire("client").await);
        }
    }

    #[tokio::test]
    async fn tracked_clients_never_exceed_the_cap() {
        let limiter = RateLimiter::with_max_clients(5, Duration::from_secs(60), 3);

        for i in 0..10 {
            assert!(limiter.try_acquire(&format!("10.0.0.{}", i)).await);
            assert!(limiter.tracked_clients().await <= 3);
        }

        // The newest clients keep their windows; the oldest were evicted.
        assert!(limiter.try_acquire("10.0.0.9").await);
        assert_eq!(limiter.tracked_clients().await, 3);
    }

    #[tokio::test]
    async fn expired_windows_are_swept_when_the_table_is_full() {
        let limiter = RateLimiter::with_max_clients(1, Duration::from_millis(50), 2);

        assert!(limiter.try_acquire("a").await);
        assert!(limiter.try_acquire("b").await);
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(limiter.try_acquire("c").await);
        assert_eq!(limiter.tracked_clients().await, 1);
    }
}
