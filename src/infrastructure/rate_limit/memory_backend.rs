//! In-process fixed-window counter store.

use super::service::{RateLimitBackend, RateLimitResult};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Map size above which expired windows are dropped on insert.
const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy)]
struct Window {
    index: u64,
    count: u64,
}

/// Counter store held in process memory.
///
/// Windows are fixed intervals counted from the moment the backend was
/// created. Rollover is detected lazily when a key is touched, so there is no
/// background sweep; once the map grows past a threshold, windows older than
/// the previous one are dropped during an insert, at most once per window.
///
/// Each key is guarded by its map shard lock, so overlapping increments on the
/// same key never lose updates.
pub struct MemoryBackend {
    epoch: Instant,
    windows: DashMap<String, Window>,
    /// Window index of the last sweep, `u64::MAX` before the first one.
    last_pruned: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        debug!("Using in-memory rate limit backend");
        Self {
            epoch: Instant::now(),
            windows: DashMap::new(),
            last_pruned: AtomicU64::new(u64::MAX),
        }
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    fn window_index(&self, now: Instant, window: Duration) -> u64 {
        let window_ms = window.as_millis().max(1);
        (now.duration_since(self.epoch).as_millis() / window_ms) as u64
    }

    fn prune(&self, current_index: u64) {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| w.index.saturating_add(1) >= current_index);
        debug!(
            removed = before.saturating_sub(self.windows.len()),
            "Pruned expired rate limit windows"
        );
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitBackend for MemoryBackend {
    async fn increment(&self, key: &str, window: Duration) -> RateLimitResult<u64> {
        let index = self.window_index(Instant::now(), window);

        let count = {
            let mut entry = self
                .windows
                .entry(key.to_owned())
                .or_insert(Window { index, count: 0 });
            if entry.index != index {
                entry.index = index;
                entry.count = 0;
            }
            entry.count += 1;
            entry.count
        };

        if self.windows.len() > PRUNE_THRESHOLD
            && self.last_pruned.swap(index, Ordering::Relaxed) != index
        {
            self.prune(index);
        }

        Ok(count)
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
