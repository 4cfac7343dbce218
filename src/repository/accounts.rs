//! Verified account directory

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;

use crate::error::{AppError, AppResult};

/// Record of which email addresses have completed verification.
/// Addresses are compared case-insensitively.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn mark_verified(&self, email: &str) -> AppResult<()>;

    async fn is_verified(&self, email: &str) -> AppResult<bool>;
}

#[derive(Default)]
pub struct MemoryAccountDirectory {
    verified: RwLock<HashSet<String>>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AccountDirectory for MemoryAccountDirectory {
    async fn mark_verified(&self, email: &str) -> AppResult<()> {
        self.verified
            .write()
            .map_err(|_| AppError::Internal("Account directory lock poisoned".to_string()))?
            .insert(normalize(email));
        Ok(())
    }

    async fn is_verified(&self, email: &str) -> AppResult<bool> {
        let verified = self
            .verified
            .read()
            .map_err(|_| AppError::Internal("Account directory lock poisoned".to_string()))?;
        Ok(verified.contains(&normalize(email)))
    }
}
