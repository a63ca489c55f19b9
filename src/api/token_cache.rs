//! Per-user access token cache.
//!
//! Access tokens are exchanged from a session token and live for a bounded
//! time. The cache is an ordinary value owned by whoever needs it (the
//! analysis client) rather than process-wide state.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long an exchanged token is assumed valid (issued tokens last an hour).
pub const TOKEN_TTL: Duration = Duration::from_secs(55 * 60);

/// A token is not handed out once it has less than this left.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Entries not used for this long are dropped by `cleanup`.
pub const IDLE_LIMIT: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
    last_used: Instant,
}

/// Cache of access tokens keyed by user id.
#[derive(Debug, Clone)]
pub struct TokenCache {
    entries: HashMap<String, CachedToken>,
    ttl: Duration,
    refresh_margin: Duration,
    idle_limit: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::with_limits(TOKEN_TTL, REFRESH_MARGIN, IDLE_LIMIT)
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(ttl: Duration, refresh_margin: Duration, idle_limit: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            refresh_margin,
            idle_limit,
        }
    }

    /// A still-usable token for the user, if cached.
    pub fn get(&mut self, user_id: &str) -> Option<String> {
        self.get_at(user_id, Instant::now())
    }

    fn get_at(&mut self, user_id: &str, now: Instant) -> Option<String> {
        let entry = self.entries.get_mut(user_id)?;

        let usable = now
            .checked_add(self.refresh_margin)
            .is_some_and(|deadline| deadline < entry.expires_at);
        if !usable {
            debug!("Cached token for {} is too close to expiry", user_id);
            return None;
        }

        entry.last_used = now;
        Some(entry.token.clone())
    }

    /// Store a freshly issued token for the user.
    pub fn set(&mut self, user_id: &str, token: impl Into<String>) {
        self.set_at(user_id, token.into(), Instant::now());
    }

    fn set_at(&mut self, user_id: &str, token: String, now: Instant) {
        self.entries.insert(
            user_id.to_string(),
            CachedToken {
                token,
                expires_at: now + self.ttl,
                last_used: now,
            },
        );
    }

    /// Forget the user's token. Returns whether one was cached.
    pub fn invalidate(&mut self, user_id: &str) -> bool {
        debug!("Invalidating token for {}", user_id);
        self.entries.remove(user_id).is_some()
    }

    /// Drop entries that have not been used recently. Returns how many.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn cleanup_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        let idle_limit = self.idle_limit;
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.last_used) <= idle_limit);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_get_fresh_token() {
        let mut cache = TokenCache::new();
        cache.set("alice", "tok-1");

        assert_eq!(cache.get("alice"), Some("tok-1".to_string()));
        assert_eq!(cache.get("bob"), None);
    }

    #[test]
    fn test_token_withheld_near_expiry() {
        let mut cache = TokenCache::new();
        let start = Instant::now();
        cache.set_at("alice", "tok".to_string(), start);

        assert!(cache.get_at("alice", start + 49 * MINUTE).is_some());
        assert!(cache.get_at("alice", start + 50 * MINUTE).is_none());
        assert!(cache.get_at("alice", start + 60 * MINUTE).is_none());
    }

    #[test]
    fn test_invalidate() {
        let mut cache = TokenCache::new();
        cache.set("alice", "a");
        cache.set("bob", "b");

        assert!(cache.invalidate("alice"));
        assert!(!cache.invalidate("alice"));
        assert_eq!(cache.get("alice"), None);
        assert_eq!(cache.len(), 1);

        assert!(cache.invalidate("bob"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_drops_idle_entries() {
        let mut cache = TokenCache::new();
        let start = Instant::now();
        cache.set_at("idle", "a".to_string(), start);
        cache.set_at("busy", "b".to_string(), start);

        cache.get_at("busy", start + 30 * MINUTE);

        assert_eq!(cache.cleanup_at(start + 121 * MINUTE), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.entries.contains_key("busy"));
    }
}
