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

//! Array-backed binary heap keyed by `(priority DESC, timestamp ASC)`.
//!
//! Not safe for concurrent use on its own; the bounded queue that wraps it
//! provides mutual exclusion. Every entry tracks its own array position so
//! the queue's eviction path can remove an arbitrary entry in O(log n)
//! rather than rebuilding the heap.

use crate::priority::Priority;
use std::cmp::Ordering;
use std::time::Instant;

/// Anything the heap can order and track the position of.
pub trait HeapIndexed {
    fn priority(&self) -> Priority;
    fn timestamp(&self) -> Instant;
    fn heap_index(&self) -> usize;
    fn set_heap_index(&mut self, index: usize);
}

/// True when `a` should sit closer to the root than `b` (pops first).
fn outranks<T: HeapIndexed>(a: &T, b: &T) -> bool {
    match a.priority().cmp(&b.priority()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.timestamp() < b.timestamp(),
    }
}

pub struct PriorityHeap<T> {
    entries: Vec<T>,
}

impl<T: HeapIndexed> PriorityHeap<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peek(&self) -> Option<&T> {
        self.entries.first()
    }

    pub fn push(&mut self, mut item: T) {
        let idx = self.entries.len();
        item.set_heap_index(idx);
        self.entries.push(item);
        self.sift_up(idx);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.remove(0)
    }

    /// Remove the entry currently at array position `index`, re-heapifying
    /// around the hole. `index` is the entry's own `heap_index()`, not a
    /// priority rank.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.entries.len() {
            return None;
        }

        let last = self.entries.len() - 1;
        self.entries.swap(index, last);
        let removed = self.entries.pop()?;

        if index < self.entries.len() {
            self.entries[index].set_heap_index(index);
            let parent_has_priority =
                index == 0 || !outranks(&self.entries[index], &self.entries[(index - 1) / 2]);
            if parent_has_priority {
                self.sift_down(index);
            } else {
                self.sift_up(index);
            }
        }

        Some(removed)
    }

    /// Locate the entry with the lowest priority among those at or below
    /// `tier`, breaking ties by oldest timestamp. Used by the queue's
    /// eviction policy; does not remove anything.
    pub fn find_eviction_candidate(&self, tier: Priority) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.priority() > tier {
                continue;
            }
            best = match best {
                None => Some(i),
                Some(b) if is_weaker_candidate(entry, &self.entries[b]) => Some(i),
                Some(b) => Some(b),
            };
        }
        best
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if outranks(&self.entries[idx], &self.entries[parent]) {
                self.entries.swap(idx, parent);
                self.entries[idx].set_heap_index(idx);
                self.entries[parent].set_heap_index(parent);
                idx = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut winner = idx;
            if left < len && outranks(&self.entries[left], &self.entries[winner]) {
                winner = left;
            }
            if right < len && outranks(&self.entries[right], &self.entries[winner]) {
                winner = right;
            }
            if winner == idx {
                break;
            }
            self.entries.swap(idx, winner);
            self.entries[idx].set_heap_index(idx);
            self.entries[winner].set_heap_index(winner);
            idx = winner;
        }
    }
}

impl<T: HeapIndexed> Default for PriorityHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// True when `candidate` is a weaker eviction target than `current_best`:
/// lower priority wins, ties broken by older timestamp.
fn is_weaker_candidate<T: HeapIndexed>(candidate: &T, current_best: &T) -> bool {
    match candidate.priority().cmp(&current_best.priority()) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => candidate.timestamp() < current_best.timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: u32,
        priority: Priority,
        timestamp: Instant,
        index: usize,
    }

    impl HeapIndexed for Entry {
        fn priority(&self) -> Priority {
            self.priority
        }
        fn timestamp(&self) -> Instant {
            self.timestamp
        }
        fn heap_index(&self) -> usize {
            self.index
        }
        fn set_heap_index(&mut self, index: usize) {
            self.index = index;
        }
    }

    fn entry(id: u32, priority: Priority) -> Entry {
        Entry {
            id,
            priority,
            timestamp: Instant::now(),
            index: 0,
        }
    }

    #[test]
    fn pops_in_priority_then_fifo_order() {
        let mut heap = PriorityHeap::new();
        heap.push(entry(1, Priority::Low));
        heap.push(entry(2, Priority::High));
        heap.push(entry(3, Priority::Medium));
        heap.push(entry(4, Priority::High));

        assert_eq!(heap.pop().unwrap().id, 2);
        assert_eq!(heap.pop().unwrap().id, 4);
        assert_eq!(heap.pop().unwrap().id, 3);
        assert_eq!(heap.pop().unwrap().id, 1);
        assert!(heap.pop().is_none());
    }

    #[test]
    fn remove_at_arbitrary_index_preserves_heap_order() {
        let mut heap = PriorityHeap::new();
        for id in 0..20 {
            let priority = match id % 3 {
                0 => Priority::High,
                1 => Priority::Medium,
                _ => Priority::Low,
            };
            heap.push(entry(id, priority));
        }

        // Remove a mid-priority entry by its current heap index.
        let victim_index = heap
            .find_eviction_candidate(Priority::Medium)
            .expect("a medium or lower entry exists");
        let removed = heap.remove(victim_index).unwrap();
        assert!(removed.priority <= Priority::Medium);

        let mut last_priority: Option<Priority> = None;
        let mut drained = 0;
        while let Some(e) = heap.pop() {
            if let Some(prev) = last_priority {
                assert!(prev >= e.priority);
            }
            last_priority = Some(e.priority);
            drained += 1;
        }
        assert_eq!(drained, 19);
    }

    #[test]
    fn find_eviction_candidate_prefers_lowest_priority_then_oldest() {
        let mut heap = PriorityHeap::new();
        let old = entry(1, Priority::Low);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let young = entry(2, Priority::Low);

        heap.push(young.clone());
        heap.push(old.clone());
        heap.push(entry(3, Priority::High));

        let idx = heap.find_eviction_candidate(Priority::Low).unwrap();
        assert_eq!(heap.remove(idx).unwrap().id, old.id);
    }

    #[test]
    fn empty_heap_reports_no_eviction_candidate() {
        let heap: PriorityHeap<Entry> = PriorityHeap::new();
        assert_eq!(heap.find_eviction_candidate(Priority::High), None);
    }
}
