//! Bounded-concurrency batch execution.
//!
//! Inputs are split into consecutive chunks. All operations in a chunk run
//! concurrently and the next chunk starts only once the whole chunk has
//! settled, so at most `batch_size` operations are in flight at any time.
//! A failing operation is recorded on its own item and never aborts the batch.

use cloudglue_mcp_common::error::Result;
use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use tracing::{debug, warn};

/// Chunk size for YouTube ingestion (add, then wait).
pub const YOUTUBE_BATCH_SIZE: usize = 5;

/// Chunk size for multi-URL transcription and extraction.
pub const URL_BATCH_SIZE: usize = 10;

/// Outcome of one input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem<T, R> {
    pub input: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T, R> BatchItem<T, R> {
    pub fn success(input: T, result: R) -> Self {
        Self {
            input,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(input: T, error: impl Into<String>) -> Self {
        Self {
            input,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Apply `op` to every item, `batch_size` at a time, preserving input order.
///
/// A `batch_size` of 0 is treated as 1.
pub async fn run_batched<T, R, F, Fut>(items: Vec<T>, batch_size: usize, op: F) -> Vec<BatchItem<T, R>>
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let batch_size = batch_size.max(1);
    let mut outcomes = Vec::with_capacity(items.len());

    for (index, chunk) in items.chunks(batch_size).enumerate() {
        debug!(chunk = index, size = chunk.len(), "Running batch chunk");

        let settled = join_all(chunk.iter().cloned().map(|item| {
            let pending = op(item.clone());
            async move {
                match pending.await {
                    Ok(result) => BatchItem::success(item, result),
                    Err(e) => {
                        warn!(error = %e, "Batch item failed");
                        BatchItem::failure(item, e.to_string())
                    }
                }
            }
        }))
        .await;

        outcomes.extend(settled);
    }

    outcomes
}

/// Count successes and failures.
pub fn tally<T, R>(items: &[BatchItem<T, R>]) -> (usize, usize) {
    let ok = items.iter().filter(|i| i.is_success()).count();
    (ok, items.len() - ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudglue_mcp_common::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_batch_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let inputs: Vec<u32> = (0..12).collect();

        let outcomes = run_batched(inputs.clone(), 5, |n| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                // Later items finish first inside a chunk.
                tokio::time::sleep(Duration::from_millis(100 - n as u64)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(n * 10)
            }
        })
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 5);
        assert_eq!(outcomes.len(), 12);
        let order: Vec<u32> = outcomes.iter().map(|o| o.input).collect();
        assert_eq!(order, inputs);
        assert!(outcomes.iter().all(|o| o.result == Some(o.input * 10)));
    }

    #[tokio::test]
    async fn failures_are_isolated() {
        let outcomes = run_batched(vec![1, 2, 3, 4, 5], 5, |n| async move {
            if n == 3 {
                Err(Error::api("https://x/collections/c/videos", 400, "no transcript"))
            } else {
                Ok(format!("file-{}", n))
            }
        })
        .await;

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes[2].result.is_none());
        assert!(outcomes[2].error.as_deref().unwrap().contains("no transcript"));
        for i in [0, 1, 3, 4] {
            assert_eq!(outcomes[i].result, Some(format!("file-{}", i + 1)));
            assert!(outcomes[i].error.is_none());
        }
        assert_eq!(tally(&outcomes), (4, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_run_sequentially() {
        let started = Arc::new(std::sync::Mutex::new(Vec::new()));
        let start = tokio::time::Instant::now();

        run_batched((0..7).collect::<Vec<u32>>(), 5, |n| {
            let started = started.clone();
            async move {
                started.lock().unwrap().push((n, start.elapsed()));
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok(())
            }
        })
        .await;

        let started = started.lock().unwrap();
        for (n, at) in started.iter() {
            if *n < 5 {
                assert_eq!(*at, Duration::ZERO, "item {} should start with the first chunk", n);
            } else {
                assert!(*at >= Duration::from_secs(1), "item {} started before chunk 1 settled", n);
            }
        }
    }

    #[tokio::test]
    async fn zero_batch_size_still_processes_everything() {
        let outcomes = run_batched(vec!["a", "b"], 0, |s| async move { Ok(s.len()) }).await;
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn serialises_without_empty_fields() {
        let ok: BatchItem<&str, u32> = BatchItem::success("u", 1);
        let failed: BatchItem<&str, u32> = BatchItem::failure("v", "boom");
        assert_eq!(serde_json::to_value(&ok).unwrap(), serde_json::json!({"input": "u", "result": 1}));
        assert_eq!(serde_json::to_value(&failed).unwrap(), serde_json::json!({"input": "v", "error": "boom"}));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            /// Output is 1:1 with input, in order, for any batch size.
            #[test]
            fn order_and_count_preserved(inputs in proptest::collection::vec(0u32..1000, 0..40), size in 1usize..12) {
                let outcomes = tokio_block_on(run_batched(inputs.clone(), size, |n| async move { Ok(n + 1) }));
                let seen: Vec<u32> = outcomes.iter().map(|o| o.input).collect();
                prop_assert_eq!(seen, inputs);
                prop_assert!(outcomes.iter().all(|o| o.result == Some(o.input + 1)));
            }
        }

        fn tokio_block_on<F: Future>(f: F) -> F::Output {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap()
                .block_on(f)
        }
    }
}
