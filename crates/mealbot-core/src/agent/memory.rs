//! Per-identity conversation memory.
//!
//! Each chat identity gets a FIFO window of its last `k` exchanges.
//! Windows live in a bounded [`moka`] cache that evicts by capacity and by
//! idle time. Nothing is persisted: a restart forgets every conversation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use mealbot_types::ChatIdentity;
use moka::future::Cache;
use tokio::sync::Mutex;

/// One human message and the agent's reply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// What the user sent, trimmed.
    pub human: String,
    /// The reply the user was given, including apology and fallback text.
    pub agent: String,
}

/// Ordered window of the most recent exchanges, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    window: usize,
    exchanges: VecDeque<Exchange>,
}

impl ConversationMemory {
    /// Empty memory holding up to `window` exchanges; zero is treated as one.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            exchanges: VecDeque::with_capacity(window),
        }
    }

    /// Append an exchange, evicting the oldest once the window is full.
    pub fn push(&mut self, human: impl Into<String>, agent: impl Into<String>) {
        if self.exchanges.len() == self.window {
            self.exchanges.pop_front();
        }
        self.exchanges.push_back(Exchange {
            human: human.into(),
            agent: agent.into(),
        });
    }

    /// Exchanges oldest first.
    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

/// Shared handle to one identity's memory.
///
/// Holding the lock for a whole loop run is what keeps two runs for the
/// same identity from interleaving their reads and writes.
pub type MemoryHandle = Arc<Mutex<ConversationMemory>>;

/// Bounded map from chat identity to its memory window.
///
/// Clones share the same underlying cache.
#[derive(Clone)]
pub struct MemoryCache {
    cache: Cache<ChatIdentity, MemoryHandle>,
    window: usize,
}

impl MemoryCache {
    /// Cache of at most `capacity` identities, each with a `window`-exchange
    /// memory. An identity untouched for `idle_ttl` is forgotten.
    pub fn new(window: usize, capacity: u64, idle_ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(idle_ttl)
            .build();
        Self { cache, window }
    }

    /// Memory for `identity`, created empty on first use.
    pub async fn handle(&self, identity: &ChatIdentity) -> MemoryHandle {
        let window = self.window;
        self.cache
            .get_with(identity.clone(), async move {
                Arc::new(Mutex::new(ConversationMemory::new(window)))
            })
            .await
    }

    /// Put `handle` back as the memory for `identity` unless it is already
    /// the cached entry.
    ///
    /// A run holds its handle across model calls; if the cache evicted the
    /// entry in the meantime, the exchange recorded on that handle would
    /// otherwise be dropped with it.
    pub async fn keep(&self, identity: &ChatIdentity, handle: &MemoryHandle) {
        match self.cache.get(identity).await {
            Some(current) if Arc::ptr_eq(&current, handle) => {}
            _ => self.cache.insert(identity.clone(), handle.clone()).await,
        }
    }

    /// Copy of the current window for `identity`, if it has one.
    pub async fn snapshot(&self, identity: &ChatIdentity) -> Option<Vec<Exchange>> {
        let handle = self.cache.get(identity).await?;
        let memory = handle.lock().await;
        Some(memory.exchanges().cloned().collect())
    }

    /// Number of exchanges each identity's window holds.
    pub fn window(&self) -> usize {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_ten_most_recent() {
        let mut memory = ConversationMemory::new(10);
        for i in 0..25 {
            memory.push(format!("q{i}"), format!("a{i}"));
        }
        assert_eq!(memory.len(), 10);
        let humans: Vec<&str> = memory.exchanges().map(|e| e.human.as_str()).collect();
        let expected: Vec<String> = (15..25).map(|i| format!("q{i}")).collect();
        assert_eq!(humans, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn window_below_capacity_keeps_all_in_order() {
        let mut memory = ConversationMemory::new(10);
        memory.push("a", "1");
        memory.push("b", "2");
        let humans: Vec<&str> = memory.exchanges().map(|e| e.human.as_str()).collect();
        assert_eq!(humans, ["a", "b"]);
    }

    #[test]
    fn zero_window_is_clamped() {
        let mut memory = ConversationMemory::new(0);
        memory.push("a", "1");
        memory.push("b", "2");
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn cache_returns_same_handle_per_identity() {
        let cache = MemoryCache::new(10, 100, Duration::from_secs(60));
        let id = ChatIdentity::new("U1");

        cache.handle(&id).await.lock().await.push("hi", "hello");
        let again = cache.handle(&id).await;
        assert_eq!(again.lock().await.len(), 1);

        let other = cache.handle(&ChatIdentity::new("U2")).await;
        assert!(other.lock().await.is_empty());
    }

    #[tokio::test]
    async fn snapshot_of_unknown_identity_is_none() {
        let cache = MemoryCache::new(10, 100, Duration::from_secs(60));
        assert!(cache.snapshot(&ChatIdentity::new("nobody")).await.is_none());
    }

    #[tokio::test]
    async fn keep_restores_evicted_handle() {
        let cache = MemoryCache::new(10, 100, Duration::from_secs(60));
        let id = ChatIdentity::new("U1");

        let handle = cache.handle(&id).await;
        let mut memory = handle.lock().await;
        cache.cache.invalidate(&id).await;
        memory.push("hi", "hello");
        cache.keep(&id, &handle).await;
        drop(memory);

        assert_eq!(cache.snapshot(&id).await.map(|w| w.len()), Some(1));
        assert!(Arc::ptr_eq(&cache.handle(&id).await, &handle));
    }

    #[tokio::test]
    async fn keep_leaves_live_entry_alone() {
        let cache = MemoryCache::new(10, 100, Duration::from_secs(60));
        let id = ChatIdentity::new("U1");
        let handle = cache.handle(&id).await;
        cache.keep(&id, &handle).await;
        assert!(Arc::ptr_eq(&cache.handle(&id).await, &handle));
    }
}
