//! Generation-counted debouncing for interactive dispatches.
//!
//! Rapid edits must coalesce into a single external call, and a response
//! from a superseded request must never be applied. Both are driven by one
//! mechanism: a monotonically increasing generation counter per key. Each
//! request takes the next generation, optionally waits out the quiescence
//! window, and is only allowed to proceed (or to apply its result) while its
//! generation is still the key's current one.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;

/// What caused a dispatch.
///
/// Interactive edits are debounced; programmatic triggers (loading a saved
/// value, a refresh button) go out immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Interactive,
    Programmatic,
}

/// Ticket for one debounced request; compared against the key's current
/// generation before the result is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Per-key debouncer with last-write-wins semantics.
pub struct Debouncer<K> {
    delay: Duration,
    generations: Mutex<HashMap<K, u64>>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new request for `key` and wait out the quiescence window.
    ///
    /// Returns `None` if a newer request for the same key arrived while
    /// waiting; that request owns the dispatch. Programmatic triggers skip
    /// the wait but still take a generation, so they participate in
    /// supersede checks like any other request.
    pub async fn begin(&self, key: K, trigger: Trigger) -> Option<Generation> {
        let generation = {
            let mut generations = self.generations.lock().await;
            let slot = generations.entry(key.clone()).or_insert(0);
            *slot += 1;
            *slot
        };

        if trigger == Trigger::Interactive && !self.delay.is_zero() {
            sleep(self.delay).await;
            if !self.is_current_inner(&key, generation).await {
                return None;
            }
        }

        Some(Generation(generation))
    }

    /// Whether `generation` is still the newest request for `key`.
    ///
    /// A dispatch whose generation has been superseded must discard its
    /// result, even if that result arrives after the newer one.
    pub async fn is_current(&self, key: &K, generation: Generation) -> bool {
        self.is_current_inner(key, generation.0).await
    }

    /// Forget all generations (session reset); in-flight requests from
    /// before the reset can no longer be applied.
    pub async fn reset(&self) {
        let mut generations = self.generations.lock().await;
        // Bump instead of clearing so pre-reset tickets stay stale
        for slot in generations.values_mut() {
            *slot += 1;
        }
    }

    async fn is_current_inner(&self, key: &K, generation: u64) -> bool {
        let generations = self.generations.lock().await;
        generations.get(key).copied() == Some(generation)
    }
}
