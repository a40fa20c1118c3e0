// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The interface the queue drains into, plus the reference drain loop that
//! composes `wait`/`pop_batch`/retry/cancellation into something a real
//! persister's owning task would run. Storage internals are out of scope;
//! only the contract and its retry semantics live here.

use crate::queue::{BoundedPriorityQueue, EventItem};
use agentreplay_core::RetryPolicy;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("persist error: {0}")]
pub struct PersistError(pub String);

/// The only thing the queue's consumer side requires of a storage
/// backend: accept a batch, or fail the whole batch.
#[async_trait::async_trait]
pub trait Persister<T>: Send + Sync {
    async fn persist_batch(&self, items: &[EventItem<T>]) -> Result<(), PersistError>;
}

#[derive(Debug, Clone, Copy)]
pub struct DrainConfig {
    pub batch_max: usize,
    pub retry_max: u32,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            batch_max: 100,
            retry_max: 3,
        }
    }
}

/// Drains `queue` into `persister` until the queue closes and drains dry,
/// or `token` is cancelled. A batch that fails `retry_max` times is handed
/// to `on_dead_letter` and is not re-enqueued, preserving ordering for
/// everything behind it.
pub async fn drain_loop<T, P, F>(
    queue: Arc<BoundedPriorityQueue<T>>,
    persister: Arc<P>,
    config: DrainConfig,
    token: CancellationToken,
    mut on_dead_letter: F,
) where
    T: Send + 'static,
    P: Persister<T>,
    F: FnMut(Vec<EventItem<T>>, PersistError),
{
    let retry = RetryPolicy::exponential(config.retry_max);

    loop {
        let batch = queue.pop_batch(config.batch_max);

        if batch.is_empty() {
            if queue.is_closed() {
                return;
            }
            if !queue.wait(&token).await {
                // Closed or cancelled. If closed, loop once more to drain
                // anything pushed just before close(); if cancelled, stop.
                if token.is_cancelled() {
                    return;
                }
                continue;
            }
            continue;
        }

        if let Err(err) = persist_with_retry(&*persister, &batch, &retry, config.retry_max).await
        {
            on_dead_letter(batch, err);
        }
    }
}

async fn persist_with_retry<T, P: Persister<T>>(
    persister: &P,
    batch: &[EventItem<T>],
    retry: &RetryPolicy,
    retry_max: u32,
) -> Result<(), PersistError> {
    let mut attempt = 0;
    loop {
        match persister.persist_batch(batch).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                if attempt >= retry_max {
                    return Err(err);
                }
                tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// In-memory persister for tests and the reference drain loop. Not part
/// of the public contract of a real storage backend.
#[cfg(any(test, feature = "test-util"))]
pub struct VecPersister<T> {
    items: parking_lot::Mutex<Vec<EventItem<T>>>,
    fail_next: std::sync::atomic::AtomicU32,
}

#[cfg(any(test, feature = "test-util"))]
impl<T> VecPersister<T> {
    pub fn new() -> Self {
        Self {
            items: parking_lot::Mutex::new(Vec::new()),
            fail_next: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Makes the next `n` `persist_batch` calls fail, to exercise retry.
    pub fn fail_next(&self, n: u32) {
        self.fail_next.store(n, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn persisted_count(&self) -> usize {
        self.items.lock().len()
    }
}

#[cfg(any(test, feature = "test-util"))]
impl<T> Default for VecPersister<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-util"))]
#[async_trait::async_trait]
impl<T: Clone + Send + Sync> Persister<T> for VecPersister<T> {
    async fn persist_batch(&self, items: &[EventItem<T>]) -> Result<(), PersistError> {
        use std::sync::atomic::Ordering;
        let remaining = self.fail_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_next.fetch_sub(1, Ordering::SeqCst);
            return Err(PersistError("simulated failure".to_string()));
        }
        self.items.lock().extend_from_slice(items);
        Ok(())
    }
}
