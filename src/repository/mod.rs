//! Repository layer for token and account state

pub mod accounts;
pub mod tokens;

use std::sync::Arc;

pub use accounts::{AccountDirectory, MemoryAccountDirectory};
pub use tokens::{MemoryTokenStore, TokenStore};

/// Main repository struct holding the storage backends
#[derive(Clone)]
pub struct Repository {
    pub tokens: Arc<dyn TokenStore>,
    pub accounts: Arc<dyn AccountDirectory>,
}

impl Repository {
    /// Create a repository with the given backends
    pub fn new(tokens: Arc<dyn TokenStore>, accounts: Arc<dyn AccountDirectory>) -> Self {
        Self { tokens, accounts }
    }

    /// Repository backed entirely by in-memory stores
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(MemoryAccountDirectory::new()),
        )
    }
}
