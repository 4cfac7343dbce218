//! Verification token storage

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{
    error::TokenError,
    models::token::{TokenStats, VerificationToken},
};

/// Authoritative mapping from token string to `(identifier, expires_at)`.
///
/// `take_if_valid` must behave as if serialized per token: of any number of
/// concurrent callers redeeming the same token, at most one gets the
/// identifier and the others get `NotFound`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert a new token, failing with `Duplicate` if it is already held
    async fn put(&self, token: VerificationToken) -> Result<(), TokenError>;

    /// Remove the token and return its identifier if it has not expired.
    /// Expired entries are removed as well.
    async fn take_if_valid(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError>;

    /// Remove every entry with `expires_at <= now`, returning how many went
    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<TokenStats, TokenError>;
}

#[derive(Default)]
struct Inner {
    tokens: HashMap<String, VerificationToken>,
    issued: u64,
}

/// In-memory token store guarded by a single lock over the whole map
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Inner>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, TokenError> {
        self.inner
            .lock()
            .map_err(|_| TokenError::Backend("token map lock poisoned".to_string()))
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, token: VerificationToken) -> Result<(), TokenError> {
        let mut inner = self.lock()?;
        if inner.tokens.contains_key(&token.token) {
            return Err(TokenError::Duplicate);
        }
        inner.tokens.insert(token.token.clone(), token);
        inner.issued += 1;
        Ok(())
    }

    async fn take_if_valid(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let mut inner = self.lock()?;
        let entry = inner.tokens.remove(token).ok_or(TokenError::NotFound)?;
        if entry.is_expired(now) {
            return Err(TokenError::Expired);
        }
        Ok(entry.identifier)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize, TokenError> {
        let mut inner = self.lock()?;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, entry| !entry.is_expired(now));
        Ok(before - inner.tokens.len())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<TokenStats, TokenError> {
        let inner = self.lock()?;
        let expired = inner.tokens.values().filter(|t| t.is_expired(now)).count();
        Ok(TokenStats {
            total: inner.tokens.len(),
            expired,
            active: inner.tokens.len() - expired,
            issued: inner.issued,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(value: &str, identifier: &str, expires_at: DateTime<Utc>) -> VerificationToken {
        VerificationToken {
            token: value.to_string(),
            identifier: identifier.to_string(),
            expires_at,
            created_at: expires_at - Duration::hours(24),
        }
    }

    #[tokio::test]
    async fn test_put_rejects_duplicate() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store.put(token("abc", "a@example.com", now + Duration::hours(1))).await.unwrap();

        let result = store.put(token("abc", "b@example.com", now + Duration::hours(1))).await;
        assert_eq!(result, Err(TokenError::Duplicate));

        // The original entry is untouched
        assert_eq!(store.take_if_valid("abc", now).await.unwrap(), "a@example.com");
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store.put(token("abc", "a@example.com", now + Duration::hours(1))).await.unwrap();

        assert_eq!(store.take_if_valid("abc", now).await.unwrap(), "a@example.com");
        assert_eq!(store.take_if_valid("abc", now).await, Err(TokenError::NotFound));
    }

    #[tokio::test]
    async fn test_take_expired_removes_entry() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store.put(token("abc", "a@example.com", now)).await.unwrap();

        // expires_at == now counts as expired
        assert_eq!(store.take_if_valid("abc", now).await, Err(TokenError::Expired));
        assert_eq!(store.take_if_valid("abc", now).await, Err(TokenError::NotFound));
        assert_eq!(store.stats(now).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store.put(token("old-1", "a@example.com", now - Duration::minutes(5))).await.unwrap();
        store.put(token("old-2", "b@example.com", now)).await.unwrap();
        store.put(token("fresh", "c@example.com", now + Duration::hours(2))).await.unwrap();

        assert_eq!(store.sweep_expired(now).await.unwrap(), 2);
        assert_eq!(store.sweep_expired(now).await.unwrap(), 0);
        assert_eq!(store.take_if_valid("fresh", now).await.unwrap(), "c@example.com");
    }

    #[tokio::test]
    async fn test_stats_is_read_only() {
        let store = MemoryTokenStore::new();
        let now = Utc::now();
        store.put(token("old", "a@example.com", now - Duration::hours(1))).await.unwrap();
        store.put(token("fresh", "b@example.com", now + Duration::hours(1))).await.unwrap();

        let stats = store.stats(now).await.unwrap();
        assert_eq!(
            stats,
            TokenStats {
                total: 2,
                expired: 1,
                active: 1,
                issued: 2
            }
        );
        assert_eq!(store.stats(now).await.unwrap(), stats);
    }
}
