//! Request coalescing.
//!
//! [`Flight`] makes sure a load for a given key runs at most once at a time.
//! The first caller's future is stored as a [`Shared`] future; callers that
//! arrive while it is pending await the same future and receive a clone of
//! its output. Once it resolves the record is dropped, so the next call runs
//! the load again.

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;

/// Deduplicates concurrent calls per key.
pub struct Flight<T> {
    calls: Mutex<HashMap<String, Shared<BoxFuture<'static, T>>>>,
}

impl<T> Default for Flight<T> {
    fn default() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> Flight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the call already in flight for it.
    ///
    /// `work` is dropped unpolled when another call is in flight.
    pub async fn run<F>(&self, key: &str, work: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
    {
        let call = {
            let mut calls = self.calls.lock();
            match calls.get(key) {
                Some(call) => call.clone(),
                None => {
                    let call = work.boxed().shared();
                    calls.insert(key.to_owned(), call.clone());
                    call
                }
            }
        };

        let output = call.clone().await;

        let mut calls = self.calls.lock();
        if calls.get(key).is_some_and(|current| current.ptr_eq(&call)) {
            calls.remove(key);
        }
        output
    }

    /// Number of keys with a call in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T> std::fmt::Debug for Flight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flight")
            .field("in_flight", &self.calls.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_run_once() {
        let flight = Arc::new(Flight::<Result<String, String>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run("key", async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok("bar".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok("bar".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_error_shared_by_waiters() {
        let flight = Arc::new(Flight::<Result<u32, String>>::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let work = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<u32, String>("boom".to_string())
        };

        let (a, b) = tokio::join!(
            flight.run("key", work(calls.clone())),
            flight.run("key", work(calls.clone()))
        );

        assert_eq!(a, Err("boom".to_string()));
        assert_eq!(b, Err("boom".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sequential_calls_run_again() {
        let flight = Flight::<usize>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let calls = calls.clone();
            let n = flight
                .run("key", async move { calls.fetch_add(1, Ordering::SeqCst) + 1 })
                .await;
            assert_eq!(n, expected);
        }
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let flight = Flight::<usize>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (c1, c2) = (calls.clone(), calls.clone());
        let (a, b) = tokio::join!(
            flight.run("a", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                c1.fetch_add(1, Ordering::SeqCst);
                1
            }),
            flight.run("b", async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                c2.fetch_add(1, Ordering::SeqCst);
                2
            })
        );

        assert_eq!((a, b), (1, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
