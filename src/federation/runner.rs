// SPDX-License-Identifier: Apache-2.0

//! Federation Runner
//!
//! The concurrency harness: one worker per backend, spawned in the given
//! order, each writing its result into a shared map under its own
//! backend name (disjoint keys, so concurrent writes never collide).
//!
//! A failing worker records its error into a single shared slot owned by
//! this invocation. The slot write is a plain overwrite: when two workers
//! fail close together the later write is the one surfaced and the
//! earlier failure is only visible in the logs. The caller awaits workers
//! sequentially in spawn order, checks the slot before each await, and
//! returns the recorded failure immediately without waiting for the
//! remaining workers; in-flight workers are never cancelled and run to
//! completion in the background.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::error::{EngineError, EngineResult};

type ErrorSlot = Mutex<Option<(String, EngineError)>>;

/// Runs `unit_of_work` once per backend name, concurrently.
///
/// Returns the per-backend results, or the first *observed* failure
/// wrapped as `Federation` (not necessarily the first chronologically;
/// at most one error is surfaced even if several workers fail). Zero
/// backends yield an empty map.
pub async fn run_all<T, F, Fut>(
    backends: &[String],
    unit_of_work: F,
) -> EngineResult<HashMap<String, T>>
where
    T: Send + 'static,
    F: Fn(String) -> Fut,
    Fut: Future<Output = EngineResult<T>> + Send + 'static,
{
    let results: Arc<Mutex<HashMap<String, T>>> = Arc::new(Mutex::new(HashMap::new()));
    let last_error: Arc<ErrorSlot> = Arc::new(Mutex::new(None));

    let mut handles = Vec::with_capacity(backends.len());
    for name in backends {
        let work = unit_of_work(name.clone());
        let results = Arc::clone(&results);
        let last_error = Arc::clone(&last_error);
        let worker_name = name.clone();

        let handle = tokio::spawn(async move {
            match work.await {
                Ok(value) => {
                    results.lock().insert(worker_name, value);
                }
                Err(e) => {
                    tracing::error!(backend = %worker_name, error = %e, "federated worker failed");
                    // Plain overwrite: last writer wins under concurrent failure
                    *last_error.lock() = Some((worker_name, e));
                }
            }
        });
        handles.push((name.clone(), handle));
    }

    for (name, handle) in handles {
        if let Some((backend, source)) = last_error.lock().take() {
            return Err(EngineError::federation(backend, source));
        }
        handle.await.map_err(|e| {
            EngineError::internal(format!("worker for backend '{name}' panicked: {e}"))
        })?;
    }

    // A failure can land after the last pre-await check but before its
    // worker's completion was observed.
    if let Some((backend, source)) = last_error.lock().take() {
        return Err(EngineError::federation(backend, source));
    }

    match Arc::try_unwrap(results) {
        Ok(mutex) => Ok(mutex.into_inner()),
        Err(_) => Err(EngineError::internal(
            "result map still shared after all workers completed",
        )),
    }
}
