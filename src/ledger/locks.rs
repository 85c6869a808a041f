use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one async mutex per (portfolio, ticker) key.
///
/// Mutations against the same holding serialize for the duration of their
/// atomic unit; mutations on different holdings proceed independently.
/// Read-only paths never touch the registry.
#[derive(Default)]
pub struct LockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn key(portfolio_id: &str, ticker: &str) -> String {
        format!("{}:{}", portfolio_id, ticker)
    }

    pub async fn acquire(&self, portfolio_id: &str, ticker: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(Self::key(portfolio_id, ticker))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Acquires two keys in sorted order so corrections that move a
    /// transaction across tickers cannot deadlock against each other.
    pub async fn acquire_pair(
        &self,
        a: (&str, &str),
        b: (&str, &str),
    ) -> Vec<OwnedMutexGuard<()>> {
        let key_a = Self::key(a.0, a.1);
        let key_b = Self::key(b.0, b.1);

        if key_a == key_b {
            vec![self.acquire(a.0, a.1).await]
        } else if key_a < key_b {
            vec![self.acquire(a.0, a.1).await, self.acquire(b.0, b.1).await]
        } else {
            vec![self.acquire(b.0, b.1).await, self.acquire(a.0, a.1).await]
        }
    }
}
