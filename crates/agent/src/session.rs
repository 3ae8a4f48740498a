use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::llm::PromptContext;

#[derive(Clone, Debug, PartialEq)]
struct CachedData {
    resource: String,
    payload: Value,
    fetched_at: Instant,
    ttl: Duration,
}

/// Last fetched dataset and last composed answer of one conversation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversationCache {
    data: Option<CachedData>,
    last_answer: Option<String>,
}

impl ConversationCache {
    pub fn get(&self) -> PromptContext {
        PromptContext {
            cached_data: self.data.as_ref().map(|data| {
                let payload = serde_json::to_string(&data.payload).unwrap_or_default();
                format!("data {}:{payload}", data.resource)
            }),
            last_answer: self.last_answer.clone(),
        }
    }

    /// Replaces the data slot. Storing the same resource and payload again keeps
    /// the original fetch time.
    pub fn set_data(&mut self, resource: &str, payload: Value, ttl: Duration) {
        if let Some(existing) = &mut self.data {
            if existing.resource == resource && existing.payload == payload {
                existing.ttl = ttl;
                return;
            }
        }
        self.data = Some(CachedData {
            resource: resource.to_string(),
            payload,
            fetched_at: Instant::now(),
            ttl,
        });
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.last_answer = Some(answer.into());
    }

    pub fn clear(&mut self) {
        self.data = None;
        self.last_answer = None;
    }

    pub fn cached_resource(&self) -> Option<&str> {
        self.data.as_ref().map(|data| data.resource.as_str())
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        self.data.as_ref().map(|data| data.fetched_at)
    }

    /// Drops cached data older than its resource's lifetime. Returns whether
    /// anything was dropped.
    pub fn evict_expired(&mut self, now: Instant) -> bool {
        let expired = self
            .data
            .as_ref()
            .is_some_and(|data| now.saturating_duration_since(data.fetched_at) > data.ttl);
        if expired {
            self.data = None;
        }
        expired
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.last_answer.is_none()
    }
}

/// Per-conversation caches. Holding a session's lock serializes the turns of
/// that conversation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn session(&self, conversation_key: &str) -> Arc<Mutex<ConversationCache>>;

    async fn active_sessions(&self) -> usize;
}

/// Conversations untouched for this long are dropped from the store.
pub const DEFAULT_IDLE_LIMIT: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct SessionEntry {
    cache: Arc<Mutex<ConversationCache>>,
    last_used: Instant,
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_limit: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self { sessions: Mutex::new(HashMap::new()), idle_limit: DEFAULT_IDLE_LIMIT }
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_limit(mut self, idle_limit: Duration) -> Self {
        self.idle_limit = idle_limit;
        self
    }

    /// Removes conversations idle past the limit. A session whose handle is
    /// still held by a running turn is kept. Returns how many were removed.
    pub async fn prune_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().await;
        Self::prune_locked(&mut sessions, now, self.idle_limit)
    }

    fn prune_locked(
        sessions: &mut HashMap<String, SessionEntry>,
        now: Instant,
        idle_limit: Duration,
    ) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            Arc::strong_count(&entry.cache) > 1
                || now.saturating_duration_since(entry.last_used) <= idle_limit
        });
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(
                event_name = "agent.session.pruned",
                correlation_id = "session-store",
                removed,
                remaining = sessions.len(),
                "idle conversations dropped"
            );
        }
        removed
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn session(&self, conversation_key: &str) -> Arc<Mutex<ConversationCache>> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        Self::prune_locked(&mut sessions, now, self.idle_limit);

        let entry = sessions.entry(conversation_key.to_string()).or_insert_with(|| SessionEntry {
            cache: Arc::default(),
            last_used: now,
        });
        entry.last_used = now;
        entry.cache.clone()
    }

    async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use super::{ConversationCache, InMemorySessionStore, SessionStore};

    #[test]
    fn cached_data_is_tagged_with_resource() {
        let mut cache = ConversationCache::default();
        cache.set_data("sales_invoices", json!([{ "number": "SI-1" }]), Duration::from_secs(300));
        cache.set_answer("Ada 1 faktur.");

        let context = cache.get();
        assert_eq!(
            context.cached_data.as_deref(),
            Some("data sales_invoices:[{\"number\":\"SI-1\"}]")
        );
        assert_eq!(context.last_answer.as_deref(), Some("Ada 1 faktur."));
    }

    #[test]
    fn set_data_twice_with_same_arguments_is_idempotent() {
        let mut cache = ConversationCache::default();
        cache.set_data("contacts", json!([{ "name": "Andi" }]), Duration::from_secs(600));
        let first = cache.clone();

        std::thread::sleep(Duration::from_millis(5));
        cache.set_data("contacts", json!([{ "name": "Andi" }]), Duration::from_secs(600));

        assert_eq!(cache, first);
        assert_eq!(cache.fetched_at(), first.fetched_at());
    }

    #[test]
    fn new_data_overwrites_the_single_slot() {
        let mut cache = ConversationCache::default();
        cache.set_data("contacts", json!([]), Duration::from_secs(600));
        cache.set_data("products", json!([{ "name": "Pulpen" }]), Duration::from_secs(600));
        assert_eq!(cache.cached_resource(), Some("products"));
    }

    #[test]
    fn expired_data_is_evicted_but_answer_is_kept() {
        let mut cache = ConversationCache::default();
        cache.set_data("dashboards/daily_sales", json!({}), Duration::from_secs(120));
        cache.set_answer("Penjualan hari ini Rp 0");

        assert!(!cache.evict_expired(Instant::now()));
        assert!(cache.evict_expired(Instant::now() + Duration::from_secs(121)));
        assert!(cache.get().cached_data.is_none());
        assert!(cache.get().last_answer.is_some());
    }

    #[test]
    fn clear_empties_both_slots() {
        let mut cache = ConversationCache::default();
        cache.set_data("contacts", json!([]), Duration::from_secs(600));
        cache.set_answer("ok");
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn store_returns_the_same_session_per_key() {
        let store = InMemorySessionStore::new();
        let first = store.session("chat-1").await;
        let again = store.session("chat-1").await;
        let other = store.session("chat-2").await;

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(store.active_sessions().await, 2);

        first.lock().await.set_answer("halo");
        assert!(!again.lock().await.is_empty());
        assert!(other.lock().await.is_empty());
    }

    #[tokio::test]
    async fn idle_sessions_are_pruned_unless_in_use() {
        let store = InMemorySessionStore::new().with_idle_limit(Duration::from_secs(60));
        store.session("chat-idle").await.lock().await.set_answer("halo");
        let held = store.session("chat-busy").await;
        assert_eq!(store.active_sessions().await, 2);

        assert_eq!(store.prune_idle(Instant::now()).await, 0);
        assert_eq!(store.prune_idle(Instant::now() + Duration::from_secs(61)).await, 1);
        assert_eq!(store.active_sessions().await, 1);

        drop(held);
        assert_eq!(store.prune_idle(Instant::now() + Duration::from_secs(61)).await, 1);
        assert_eq!(store.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn pruned_conversation_starts_with_an_empty_cache() {
        let store = InMemorySessionStore::new().with_idle_limit(Duration::ZERO);
        store.session("chat-1").await.lock().await.set_answer("halo");
        std::thread::sleep(Duration::from_millis(5));

        let fresh = store.session("chat-1").await;
        assert!(fresh.lock().await.is_empty());
        assert_eq!(store.active_sessions().await, 1);
    }
}
