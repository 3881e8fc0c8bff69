//! Per-session conversation registry
//!
//! Each session id owns one [`ChatHistory`] behind its own mutex, so turns
//! within a session run one at a time while different sessions proceed
//! concurrently. The registry is bounded: idle sessions expire and, at
//! capacity, the least recently used session is dropped to make room.

use crate::chat::ChatHistory;
use crate::config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Session used by requests that carry no session id
pub const DEFAULT_SESSION: &str = "default";

pub type SharedHistory = Arc<Mutex<ChatHistory>>;

/// Bounds on the number and lifetime of sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: crate::config::default_max_sessions(),
            idle_ttl: Duration::from_secs(crate::config::default_session_idle_secs()),
        }
    }
}

impl SessionLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_sessions: config.server.max_sessions.max(1),
            idle_ttl: Duration::from_secs(config.server.session_idle_secs),
        }
    }
}

struct SessionEntry {
    history: SharedHistory,
    last_used: Instant,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    limits: SessionLimits,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::default(),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// History for `id`, created empty on first use
    pub async fn get_or_create(&self, id: &str) -> SharedHistory {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get_mut(id) {
            entry.last_used = now;
            return entry.history.clone();
        }

        self.evict(&mut sessions, now);

        debug!(session = id, "Creating chat session");
        let history: SharedHistory = Arc::new(Mutex::new(ChatHistory::new()));
        sessions.insert(
            id.to_string(),
            SessionEntry {
                history: history.clone(),
                last_used: now,
            },
        );
        history
    }

    /// Close a conversation: the shared default session is cleared and kept,
    /// any other session is dropped
    pub async fn end(&self, id: &str) {
        if id != DEFAULT_SESSION {
            self.remove(id).await;
            return;
        }

        let history = self
            .sessions
            .read()
            .await
            .get(id)
            .map(|entry| entry.history.clone());
        if let Some(history) = history {
            history.lock().await.clear();
        }
    }

    pub async fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            debug!(session = id, "Removed chat session");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop expired sessions, then the least recently used until one slot is free.
    /// A turn still holding an evicted history finishes on its own copy.
    fn evict(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let ttl = self.limits.idle_ttl;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_used) < ttl);
        let expired = before - sessions.len();

        let mut dropped = 0;
        while sessions.len() >= self.limits.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    dropped += 1;
                }
                None => break,
            }
        }

        if expired > 0 || dropped > 0 {
            debug!(expired, dropped, "Evicted chat sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatMessage;

    fn limits(max_sessions: usize, idle_ttl: Duration) -> SessionLimits {
        SessionLimits {
            max_sessions,
            idle_ttl,
        }
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new();

        let alice = registry.get_or_create("alice").await;
        alice.lock().await.push(ChatMessage::user("hello"));

        let bob = registry.get_or_create("bob").await;
        assert!(bob.lock().await.is_empty());
        assert_eq!(registry.get_or_create("alice").await.lock().await.len(), 1);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_end_clears_default_and_drops_named_sessions() {
        let registry = SessionRegistry::new();
        let shared = registry.get_or_create(DEFAULT_SESSION).await;
        shared.lock().await.push(ChatMessage::user("hello"));
        registry.get_or_create("alice").await;

        registry.end(DEFAULT_SESSION).await;
        assert!(shared.lock().await.is_empty());
        assert_eq!(registry.len().await, 2);

        registry.end("alice").await;
        registry.end("unknown").await;
        assert_eq!(registry.len().await, 1);

        assert!(registry.remove(DEFAULT_SESSION).await);
        assert!(!registry.remove(DEFAULT_SESSION).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_capacity_drops_least_recently_used() {
        let registry = SessionRegistry::with_limits(limits(2, Duration::from_secs(600)));

        let alice = registry.get_or_create("alice").await;
        alice.lock().await.push(ChatMessage::user("keep me"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.get_or_create("bob").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        // Touching alice makes bob the oldest
        registry.get_or_create("alice").await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        registry.get_or_create("carol").await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.get_or_create("alice").await.lock().await.len(), 1);
        assert!(!registry.remove("bob").await);
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let registry = SessionRegistry::with_limits(limits(100, Duration::from_millis(20)));
        registry.get_or_create("alice").await;
        registry.get_or_create("bob").await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        registry.get_or_create("carol").await;

        assert_eq!(registry.len().await, 1);
        assert!(registry.remove("carol").await);
    }

    #[tokio::test]
    async fn test_many_unique_sessions_stay_bounded() {
        let registry = SessionRegistry::with_limits(limits(16, Duration::from_secs(600)));
        for i in 0..500 {
            registry.get_or_create(&format!("client-{}", i)).await;
        }
        assert_eq!(registry.len().await, 16);
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_one_history() {
        let registry = SessionRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.get_or_create("shared").await })
            })
            .collect();

        let mut histories = Vec::new();
        for handle in handles {
            histories.push(handle.await.unwrap());
        }
        assert!(histories.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len().await, 1);
    }
}
