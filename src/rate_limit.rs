// Per-client sliding-window rate limiting for the predict endpoint.
//
// Each client identity owns a queue of recent request timestamps. A request is
// admitted when fewer than `max_requests` timestamps remain after pruning the
// ones that fell out of the window. Rejected requests are not recorded, so a
// client hammering the endpoint still regains access once its oldest admitted
// request expires.
//
// One Mutex guards the whole map. It is held only for prune-check-append, which
// keeps two concurrent requests from the same client from both observing
// room under the limit.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The window is full. `retry_after` is how long until the oldest
    /// recorded request leaves the window.
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// A sliding-window rate limiter keyed by client identity.
///
/// Thread-safe via interior mutability so it can be shared across handlers
/// with `Arc<RateLimiter>`.
pub struct RateLimiter {
    /// Timestamps of admitted requests within the window, per identity.
    clients: Mutex<HashMap<String, VecDeque<Instant>>>,
    /// Maximum number of requests allowed per window.
    max_requests: u32,
    /// Duration of the sliding window.
    window: Duration,
    /// Maximum number of identities kept in memory.
    max_clients: usize,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// - `max_requests`: how many requests one client may make per window
    /// - `window`: the sliding window duration
    /// - `max_clients`: cap on tracked identities before eviction kicks in
    pub fn new(max_requests: u32, window: Duration, max_clients: usize) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            max_requests,
            window,
            max_clients: max_clients.max(1),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Admit or reject a request from `identity` made at `now`.
    pub fn admit(&self, identity: &str, now: Instant) -> bool {
        self.check(identity, now).is_admitted()
    }

    /// Like `admit`, but reports how long a rejected client should wait.
    pub fn check(&self, identity: &str, now: Instant) -> Admission {
        let mut clients = self.lock();

        if !clients.contains_key(identity) && clients.len() >= self.max_clients {
            self.make_room(&mut clients, now);
        }

        let requests = clients.entry(identity.to_string()).or_default();
        prune(requests, now, self.window);

        if requests.len() >= self.max_requests as usize {
            let retry_after = requests
                .front()
                .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return Admission::Rejected { retry_after };
        }

        requests.push_back(now);
        Admission::Admitted
    }

    /// Drop identities whose every timestamp has left the window.
    /// Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut clients = self.lock();
        let before = clients.len();
        let window = self.window;
        clients.retain(|_, requests| {
            prune(requests, now, window);
            !requests.is_empty()
        });
        before - clients.len()
    }

    /// Number of identities currently held in memory.
    pub fn tracked_clients(&self) -> usize {
        self.lock().len()
    }

    /// Free a slot for a new identity: first drop fully expired identities,
    /// then, if the map is still full, the least recently active one.
    fn make_room(&self, clients: &mut HashMap<String, VecDeque<Instant>>, now: Instant) {
        let window = self.window;
        clients.retain(|_, requests| {
            prune(requests, now, window);
            !requests.is_empty()
        });

        if clients.len() < self.max_clients {
            return;
        }

        let stalest = clients
            .iter()
            .min_by_key(|(_, requests)| requests.back().copied())
            .map(|(identity, _)| identity.clone());

        if let Some(identity) = stalest {
            debug!(identity = %identity, "Rate limiter full, evicting least recent client");
            clients.remove(&identity);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<Instant>>> {
        // The map holds plain timestamps, so a panic mid-update can't leave
        // it in a state worth refusing to read.
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Evict timestamps at or before `now - window`.
fn prune(requests: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = requests.front() {
        if now.saturating_duration_since(oldest) >= window {
            requests.pop_front();
        } else {
            break;
        }
    }
}
