//! Per-table async locks.
//!
//! Every write that reads a table's state and then moves it (commit,
//! finalize, transition) runs under that table's lock. Different tables
//! never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct TableLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `table_id`. Released on drop.
    ///
    /// Entries nobody holds or waits on are dropped here, so ids that are
    /// never seen again don't pile up.
    pub async fn acquire(&self, table_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(table_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_table_is_exclusive() {
        let locks = TableLocks::new();
        let guard = locks.acquire("t1").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("t1").await;
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_entries_are_evicted() {
        let locks = TableLocks::new();
        drop(locks.acquire("t1").await);
        drop(locks.acquire("no-such-table").await);

        let held = locks.acquire("t2").await;
        assert_eq!(locks.tracked().await, 1);

        // A held lock survives other acquisitions.
        let _other = locks.acquire("t3").await;
        assert_eq!(locks.tracked().await, 2);
        drop(held);
    }

    #[tokio::test]
    async fn test_different_tables_do_not_block() {
        let locks = TableLocks::new();
        let _a = locks.acquire("t1").await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("t2"))
            .await
            .unwrap();
    }
}
