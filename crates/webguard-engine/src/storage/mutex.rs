//! Advisory mutexes over a shared store.
//!
//! The lock is a sentinel key (`MUTEX_VALUE`) in the same store it protects.
//! Acquisition polls `set_if_absent` with bounded exponential backoff. There
//! is no timeout and no fairness: a holder that dies without unlocking blocks
//! every other writer until someone calls `force_unlock`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use webguard_core::error::Result;
use webguard_core::protocol::keys::MUTEX_VALUE;

use super::{DurableStore, VolatileStore};

/// Exponential backoff, doubling from `initial` up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        Self {
            current: initial,
            max: max.max(initial),
        }
    }

    /// Delay to wait before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let d = self.current;
        self.current = (self.current * 2).min(self.max);
        d
    }
}

/// Lock over a durable store, one per top origin (`mutex:<origin>`).
#[derive(Clone)]
pub struct DurableMutex {
    store: Arc<dyn DurableStore>,
    key: String,
    poll: Duration,
    max_backoff: Duration,
}

impl DurableMutex {
    pub fn new(store: Arc<dyn DurableStore>, key: String, poll: Duration, max_backoff: Duration) -> Self {
        Self {
            store,
            key,
            poll,
            max_backoff,
        }
    }

    pub async fn lock(&self) -> Result<()> {
        let mut backoff = Backoff::new(self.poll, self.max_backoff);
        while !self.store.set_if_absent(&self.key, MUTEX_VALUE).await? {
            tokio::time::sleep(backoff.next_delay()).await;
        }
        Ok(())
    }

    pub async fn unlock(&self) -> Result<()> {
        self.store.remove_item(&self.key).await
    }

    /// Release regardless of holder. Best-effort recovery from a crashed holder.
    pub async fn force_unlock(&self) -> Result<()> {
        tracing::debug!(key = %self.key, "force unlock");
        self.unlock().await
    }

    /// Run `f` inside the critical section. The lock is released whether `f`
    /// succeeds or fails.
    pub async fn with_lock<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.lock().await?;
        let res = f().await;
        let released = self.unlock().await;

        match (res, released) {
            (Ok(v), Ok(())) => Ok(v),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), released) => {
                if let Err(unlock_err) = released {
                    tracing::warn!(key = %self.key, error = %unlock_err, "unlock after failed critical section");
                }
                Err(e)
            }
        }
    }
}

/// Lock over the volatile store. Blocks the calling thread while waiting.
#[derive(Clone)]
pub struct VolatileMutex {
    store: Arc<dyn VolatileStore>,
    key: String,
    poll: Duration,
    max_backoff: Duration,
}

impl VolatileMutex {
    pub fn new(store: Arc<dyn VolatileStore>, key: &str, poll: Duration, max_backoff: Duration) -> Self {
        Self {
            store,
            key: key.to_string(),
            poll,
            max_backoff,
        }
    }

    /// Acquire; the returned guard unlocks on drop.
    pub fn lock(&self) -> Result<VolatileGuard<'_>> {
        let mut backoff = Backoff::new(self.poll, self.max_backoff);
        while !self.store.set_if_absent(&self.key, MUTEX_VALUE)? {
            std::thread::sleep(backoff.next_delay());
        }
        Ok(VolatileGuard { mutex: self })
    }

    pub fn force_unlock(&self) -> Result<()> {
        tracing::debug!(key = %self.key, "force unlock");
        self.store.remove_item(&self.key)
    }
}

/// Held volatile lock.
pub struct VolatileGuard<'a> {
    mutex: &'a VolatileMutex,
}

impl Drop for VolatileGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.mutex.store.remove_item(&self.mutex.key) {
            tracing::warn!(key = %self.mutex.key, error = %e, "volatile unlock failed");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;
    use webguard_core::GuardError;

    use super::*;
    use crate::storage::MemoryStore;

    fn durable(store: &Arc<MemoryStore>) -> DurableMutex {
        DurableMutex::new(
            store.clone(),
            "mutex:a.com".into(),
            Duration::from_millis(20),
            Duration::from_millis(320),
        )
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let mut b = Backoff::new(Duration::from_millis(20), Duration::from_millis(70));
        let seq: Vec<u64> = (0..5).map(|_| b.next_delay().as_millis() as u64).collect();
        assert_eq!(seq, vec![20, 40, 70, 70, 70]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_holder_at_a_time() {
        let store = Arc::new(MemoryStore::new());
        let mutex = durable(&store);
        let holders = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let mutex = mutex.clone();
            let store = store.clone();
            let holders = holders.clone();
            let max_seen = max_seen.clone();
            async move {
                mutex
                    .with_lock(|| async move {
                        let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);

                        let n: u32 = DurableStore::get_item(store.as_ref(), "counter")
                            .await?
                            .map(|s| s.parse().unwrap())
                            .unwrap_or(0);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        DurableStore::set_item(store.as_ref(), "counter", &(n + 1).to_string()).await?;

                        holders.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }
        });

        for r in join_all(tasks).await {
            r.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(
            DurableStore::get_item(store.as_ref(), "counter").await.unwrap().as_deref(),
            Some("8")
        );
        assert!(DurableStore::get_item(store.as_ref(), "mutex:a.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_section_still_releases() {
        let store = Arc::new(MemoryStore::new());
        let mutex = durable(&store);

        let res: Result<()> = mutex
            .with_lock(|| async move { Err(GuardError::Storage("disk gone".into())) })
            .await;
        assert_eq!(res.unwrap_err().kind().as_str(), "STORAGE_FAILURE");
        assert!(DurableStore::get_item(store.as_ref(), "mutex:a.com").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_acquires_after_force_unlock() {
        let store = Arc::new(MemoryStore::new());
        // stale sentinel left by a crashed holder
        DurableStore::set_item(store.as_ref(), "mutex:a.com", "1").await.unwrap();
        let mutex = durable(&store);

        let waiter = {
            let mutex = mutex.clone();
            tokio::spawn(async move { mutex.lock().await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiter.is_finished());

        mutex.force_unlock().await.unwrap();
        waiter.await.unwrap().unwrap();
        assert_eq!(
            DurableStore::get_item(store.as_ref(), "mutex:a.com").await.unwrap().as_deref(),
            Some("1")
        );
    }

    #[test]
    fn volatile_guard_serializes_threads() {
        let store = Arc::new(MemoryStore::new());
        let mutex = VolatileMutex::new(
            store.clone(),
            "MyWebGuard_Mutex",
            Duration::from_millis(1),
            Duration::from_millis(4),
        );

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let mutex = mutex.clone();
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        let _guard = mutex.lock().unwrap();
                        let n: u32 = VolatileStore::get_item(store.as_ref(), "n")
                            .unwrap()
                            .map(|s| s.parse().unwrap())
                            .unwrap_or(0);
                        VolatileStore::set_item(store.as_ref(), "n", &(n + 1).to_string()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(VolatileStore::get_item(store.as_ref(), "n").unwrap().as_deref(), Some("100"));
        assert!(VolatileStore::get_item(store.as_ref(), "MyWebGuard_Mutex").unwrap().is_none());
    }
}
