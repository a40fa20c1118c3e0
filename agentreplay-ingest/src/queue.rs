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

//! The ingestion buffer between the streaming event producer and whatever
//! drains it into storage. Never blocks a producer: `push` always returns
//! immediately, evicting or dropping under the fill-percent policy below
//! rather than growing past `max_size`.

use crate::heap::{HeapIndexed, PriorityHeap};
use crate::priority::Priority;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// How many LOW-priority drops accumulate before `admit` logs another
/// burst warning. Keeps sustained shedding visible without emitting a
/// log line per dropped event.
const LOW_DROP_LOG_INTERVAL: u64 = 100;

/// Cost bookkeeping attached to an event once its pricing has been
/// resolved by the caller. Participates in no queue invariant; carried
/// purely so a consumer doesn't need a second lookup at persist time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCost {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone)]
pub struct EventItem<T> {
    pub data: T,
    pub priority: Priority,
    pub flow_id: String,
    pub event_type: String,
    pub timestamp: Instant,
    pub cost: Option<EventCost>,
    heap_index: usize,
}

impl<T> EventItem<T> {
    pub fn new(
        data: T,
        priority: Priority,
        flow_id: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            data,
            priority,
            flow_id: flow_id.into(),
            event_type: event_type.into(),
            timestamp: Instant::now(),
            cost: None,
            heap_index: 0,
        }
    }

    pub fn with_cost(mut self, cost: EventCost) -> Self {
        self.cost = Some(cost);
        self
    }
}

impl<T> HeapIndexed for EventItem<T> {
    fn priority(&self) -> Priority {
        self.priority
    }
    fn timestamp(&self) -> Instant {
        self.timestamp
    }
    fn heap_index(&self) -> usize {
        self.heap_index
    }
    fn set_heap_index(&mut self, index: usize) {
        self.heap_index = index;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct QueueStats {
    pub size: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub drops_total: u64,
    pub drops_low: u64,
    pub drops_high: u64,
    pub drops_critical: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub max_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_size: 10_000 }
    }
}

fn tier_index(priority: Priority) -> usize {
    match priority {
        Priority::Low => 0,
        Priority::Medium => 1,
        Priority::High => 2,
    }
}

struct QueueInner<T> {
    heap: PriorityHeap<EventItem<T>>,
    counts: [usize; 3],
    closed: bool,
}

impl<T> QueueInner<T> {
    fn note_inserted(&mut self, priority: Priority) {
        self.counts[tier_index(priority)] += 1;
    }
    fn note_removed(&mut self, priority: Priority) {
        self.counts[tier_index(priority)] -= 1;
    }
}

/// Concurrent bounded priority queue. `push`/`pop`/`pop_batch`/observers
/// are synchronous and hold the internal mutex only for their critical
/// section; `wait` suspends on a `Notify` and never touches the mutex
/// while suspended.
pub struct BoundedPriorityQueue<T> {
    inner: Mutex<QueueInner<T>>,
    max_size: usize,
    notify: Notify,
    drops_total: AtomicU64,
    drops_low: AtomicU64,
    drops_high: AtomicU64,
    drops_critical: AtomicU64,
}

impl<T> BoundedPriorityQueue<T> {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: PriorityHeap::new(),
                counts: [0; 3],
                closed: false,
            }),
            max_size: config.max_size.max(1),
            notify: Notify::new(),
            drops_total: AtomicU64::new(0),
            drops_low: AtomicU64::new(0),
            drops_high: AtomicU64::new(0),
            drops_critical: AtomicU64::new(0),
        }
    }

    /// Enqueue `item`, applying the backpressure policy if the queue is
    /// already at `max_size`. Returns `true` when the caller's item did
    /// not land in the queue (it was dropped, not necessarily evicted).
    pub fn push(&self, item: EventItem<T>) -> bool {
        let mut inner = self.inner.lock();

        if inner.closed {
            drop(inner);
            self.drops_total.fetch_add(1, Ordering::Relaxed);
            return true;
        }

        let dropped = self.admit(&mut inner, item);
        drop(inner);

        if !dropped {
            self.notify.notify_one();
        }
        dropped
    }

    /// Runs the fill-percent backpressure policy and inserts `item` unless
    /// it is itself the one dropped. Returns whether `item` was dropped.
    fn admit(&self, inner: &mut QueueInner<T>, item: EventItem<T>) -> bool {
        let len = inner.heap.len();

        if len < self.max_size {
            inner.note_inserted(item.priority);
            inner.heap.push(item);
            return false;
        }

        let fill_percent = (100 * len) / self.max_size;

        if fill_percent >= 95 && item.priority == Priority::Low {
            self.drops_total.fetch_add(1, Ordering::Relaxed);
            self.note_low_drop();
            return true;
        }

        match self.evict_low(inner) {
            Some(_) => {
                self.note_low_drop();
                self.drops_total.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                // No LOW resident at any stage: last-resort eviction of the
                // current top (highest priority, oldest) to admit the push.
                if let Some(evicted) = inner.heap.pop() {
                    inner.note_removed(evicted.priority);
                    self.drops_total.fetch_add(1, Ordering::Relaxed);
                    if evicted.priority == Priority::High {
                        self.drops_high.fetch_add(1, Ordering::Relaxed);
                        self.drops_critical.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            flow_id = %evicted.flow_id,
                            event_type = %evicted.event_type,
                            max_size = self.max_size,
                            "last-resort eviction discarded a HIGH-priority event; queue saturated with no LOW residents left to evict"
                        );
                    }
                }
            }
        }

        inner.note_inserted(item.priority);
        inner.heap.push(item);
        false
    }

    /// Increments `drops_low` and logs once per `LOW_DROP_LOG_INTERVAL`
    /// drops, mirroring the donor's habit of warning on a sustained
    /// shedding burst rather than once per dropped item (log spam).
    fn note_low_drop(&self) {
        let total = self.drops_low.fetch_add(1, Ordering::Relaxed) + 1;
        if total % LOW_DROP_LOG_INTERVAL == 0 {
            warn!(
                drops_low = total,
                max_size = self.max_size,
                "queue has shed {} LOW-priority events under sustained backpressure",
                LOW_DROP_LOG_INTERVAL
            );
        }
    }

    fn evict_low(&self, inner: &mut QueueInner<T>) -> Option<EventItem<T>> {
        let idx = inner.heap.find_eviction_candidate(Priority::Low)?;
        let removed = inner.heap.remove(idx)?;
        inner.note_removed(removed.priority);
        Some(removed)
    }

    /// Remove and return the highest-priority, oldest item.
    pub fn pop(&self) -> Option<EventItem<T>> {
        let mut inner = self.inner.lock();
        let item = inner.heap.pop()?;
        inner.note_removed(item.priority);
        Some(item)
    }

    /// Remove up to `n` items in extraction order.
    pub fn pop_batch(&self, n: usize) -> Vec<EventItem<T>> {
        let mut inner = self.inner.lock();
        let mut out = Vec::with_capacity(n.min(inner.heap.len()));
        for _ in 0..n {
            match inner.heap.pop() {
                Some(item) => {
                    inner.note_removed(item.priority);
                    out.push(item);
                }
                None => break,
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fill_percent(&self) -> f64 {
        100.0 * (self.len() as f64) / (self.max_size as f64)
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock();
        QueueStats {
            size: inner.heap.len(),
            high: inner.counts[tier_index(Priority::High)],
            medium: inner.counts[tier_index(Priority::Medium)],
            low: inner.counts[tier_index(Priority::Low)],
            drops_total: self.drops_total.load(Ordering::Relaxed),
            drops_low: self.drops_low.load(Ordering::Relaxed),
            drops_high: self.drops_high.load(Ordering::Relaxed),
            drops_critical: self.drops_critical.load(Ordering::Relaxed),
        }
    }

    /// Suspend until a push is signaled, the queue closes, or `token`
    /// fires. Returns `false` on close/cancellation, `true` on signal.
    /// A `true` result only means "check `pop`", not "an item is certain
    /// to still be there" — another consumer may have raced it away.
    pub async fn wait(&self, token: &CancellationToken) -> bool {
        let notified = self.notify.notified();

        if self.inner.lock().closed {
            return false;
        }

        tokio::select! {
            _ = notified => {}
            _ = token.cancelled() => return false,
        }

        !self.inner.lock().closed
    }

    /// Idempotent. Future pushes report `dropped=true`; pops continue to
    /// drain whatever remains, and any waiter is woken with `false`.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.closed {
            return;
        }
        inner.closed = true;
        drop(inner);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}
