// spec.md §4.5: "All fetches share a cooperative-task worker pool;
// duplicate concurrent requests for the same (origin, key_id) or
// (room, event_id) coalesce onto one outstanding task via a futures
// map." `dashmap` gives the sharded concurrent map, `tokio::sync::OnceCell`
// gives the single-init-wins-the-race slot each entry needs - exactly
// the shape spec.md §5 describes ("requires a cooperative mutex only
// because it spans suspension points").

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub struct FetchCoalesce<K, V> {
    inflight: DashMap<K, Arc<OnceCell<V>>>,
}

impl<K, V> Default for FetchCoalesce<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        FetchCoalesce {
            inflight: DashMap::new(),
        }
    }
}

impl<K, V> FetchCoalesce<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `fetch` for `key` unless another in-flight call for the same
    /// key is already running, in which case this call awaits that one's
    /// result instead. Either way, exactly one `fetch` future runs per
    /// key at a time.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self
            .inflight
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        let result = cell.get_or_init(fetch).await.clone();
        self.inflight.remove(&key);
        result
    }

    pub fn in_flight_count(&self) -> usize {
        self.inflight.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_fetches_for_same_key_coalesce() {
        let coalesce: Arc<FetchCoalesce<&'static str, u32>> = Arc::new(FetchCoalesce::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coalesce = coalesce.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coalesce
                    .get_or_fetch("server.example:ed25519:1", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        42u32
                    })
                    .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
