//! In-flight request deduplication
//!
//! Under a concurrent cache-miss storm, the first caller for a key
//! becomes the leader and runs the computation; every other caller
//! subscribes to the leader's broadcast and awaits the shared result.
//! The registration is removed once the computation settles, success or
//! failure.

use dashmap::DashMap;
use serde_json::Value;
use shared::error::CoreError;
use std::future::Future;
use tokio::sync::broadcast;

type FlightResult = Result<Value, CoreError>;

enum FlightRole {
    Leader(broadcast::Sender<FlightResult>),
    Follower(broadcast::Receiver<FlightResult>),
}

/// Registry of in-flight computations keyed by cache key
#[derive(Debug, Default)]
pub struct InflightRegistry {
    flights: DashMap<String, broadcast::Sender<FlightResult>>,
}

/// Removes the flight entry when the leader settles or is dropped
/// mid-computation, so a cancelled leader can never wedge the key.
struct FlightGuard<'a> {
    registry: &'a InflightRegistry,
    key: String,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.flights.remove(&self.key);
    }
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self {
            flights: DashMap::new(),
        }
    }

    fn join(&self, key: &str) -> FlightRole {
        // Followers subscribe under the shard lock, so the leader's send
        // (which happens after the entry is removed) cannot be missed.
        match self.flights.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(e) => FlightRole::Follower(e.get().subscribe()),
            dashmap::mapref::entry::Entry::Vacant(v) => {
                let (tx, _rx) = broadcast::channel(1);
                v.insert(tx.clone());
                FlightRole::Leader(tx)
            }
        }
    }

    /// Run `compute` once per key across concurrent callers
    pub async fn run<F, Fut>(&self, key: &str, compute: F) -> FlightResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FlightResult>,
    {
        match self.join(key) {
            FlightRole::Leader(tx) => {
                let guard = FlightGuard {
                    registry: self,
                    key: key.to_string(),
                };
                let result = compute().await;
                // Deregister before notifying: late arrivals recompute
                // instead of subscribing to a settled flight.
                drop(guard);
                let _ = tx.send(result.clone());
                result
            }
            FlightRole::Follower(mut rx) => match rx.recv().await {
                Ok(result) => result,
                // Leader dropped without settling (task cancelled)
                Err(_) => Err(CoreError::repository(
                    "deduplicated computation aborted before settling",
                )),
            },
        }
    }

    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_compute_once() {
        let registry = Arc::new(InflightRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .run("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(json!(42))
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), json!(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_deregistered() {
        let registry = Arc::new(InflightRegistry::new());

        let r1 = registry.clone();
        let h1 = tokio::spawn(async move {
            r1.run("k", || async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(CoreError::repository("backend down"))
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        let r2 = registry.clone();
        let h2 = tokio::spawn(async move {
            r2.run("k", || async { Ok(json!("should not run")) }).await
        });

        assert!(h1.await.unwrap().is_err());
        assert!(h2.await.unwrap().is_err());
        // Registration removed on failure too
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_sequential_calls_recompute() {
        let registry = InflightRegistry::new();
        let first = registry.run("k", || async { Ok(json!(1)) }).await.unwrap();
        let second = registry.run("k", || async { Ok(json!(2)) }).await.unwrap();
        assert_eq!(first, json!(1));
        assert_eq!(second, json!(2));
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let registry = Arc::new(InflightRegistry::new());
        let a = registry.run("a", || async { Ok(json!("a")) });
        let b = registry.run("b", || async { Ok(json!("b")) });
        let (a, b) = tokio::join!(a, b);
        assert_eq!(a.unwrap(), json!("a"));
        assert_eq!(b.unwrap(), json!("b"));
    }
}
