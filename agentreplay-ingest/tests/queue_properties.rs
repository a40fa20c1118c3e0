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

//! Cross-cutting property tests for `BoundedPriorityQueue`, exercised
//! through pushes of varying priority against a range of capacities.

use agentreplay_ingest::{BoundedPriorityQueue, EventItem, Priority, QueueConfig};
use proptest::prelude::*;

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::High),
        Just(Priority::Medium),
        Just(Priority::Low),
    ]
}

proptest! {
    #[test]
    fn len_never_exceeds_max_size(
        max_size in 1usize..32,
        priorities in prop::collection::vec(priority_strategy(), 0..200),
    ) {
        let queue = BoundedPriorityQueue::new(QueueConfig { max_size });
        for (i, priority) in priorities.into_iter().enumerate() {
            queue.push(EventItem::new(i as u32, priority, "flow", "event_type"));
            prop_assert!(queue.len() <= max_size);
        }
    }

    #[test]
    fn drop_counters_are_internally_consistent(
        max_size in 1usize..16,
        priorities in prop::collection::vec(priority_strategy(), 0..200),
    ) {
        let queue = BoundedPriorityQueue::new(QueueConfig { max_size });
        for (i, priority) in priorities.into_iter().enumerate() {
            queue.push(EventItem::new(i as u32, priority, "flow", "event_type"));
        }

        let stats = queue.stats();
        prop_assert!(stats.drops_total >= stats.drops_low + stats.drops_high);
        prop_assert!(stats.drops_critical <= stats.drops_high);
    }

    #[test]
    fn push_pop_conservation_holds(
        max_size in 1usize..32,
        priorities in prop::collection::vec(priority_strategy(), 0..200),
    ) {
        let queue = BoundedPriorityQueue::new(QueueConfig { max_size });
        let mut pushed = 0u64;
        let mut dropped = 0u64;

        for (i, priority) in priorities.into_iter().enumerate() {
            pushed += 1;
            if queue.push(EventItem::new(i as u32, priority, "flow", "event_type")) {
                dropped += 1;
            }
        }

        let mut popped = 0u64;
        while queue.pop().is_some() {
            popped += 1;
        }

        prop_assert_eq!(pushed - dropped, popped);
    }

    #[test]
    fn pop_order_is_non_decreasing_in_timestamp_within_a_priority_class(
        count in 1usize..100,
    ) {
        let queue = BoundedPriorityQueue::new(QueueConfig { max_size: count + 1 });
        for i in 0..count {
            queue.push(EventItem::new(i as u32, Priority::Medium, "flow", "event_type"));
            std::thread::sleep(std::time::Duration::from_micros(50));
        }

        let mut last = None;
        while let Some(item) = queue.pop() {
            if let Some(prev) = last {
                prop_assert!(prev <= item.timestamp);
            }
            last = Some(item.timestamp);
        }
    }

    #[test]
    fn saturated_high_only_queue_keeps_the_most_recent_n(
        max_size in 1usize..20,
        extra_pushes in 0usize..20,
    ) {
        let total = max_size + extra_pushes;
        let queue = BoundedPriorityQueue::new(QueueConfig { max_size });
        for i in 0..total {
            queue.push(EventItem::new(i as u32, Priority::High, "flow", "event_type"));
        }

        let mut retained = Vec::new();
        while let Some(item) = queue.pop() {
            retained.push(item.data);
        }
        retained.sort_unstable();

        let expected: Vec<u32> = ((total - max_size) as u32..total as u32).collect();
        prop_assert_eq!(retained, expected);
    }
}

#[test]
fn backpressure_scenario_from_the_concrete_example_set() {
    let queue = BoundedPriorityQueue::new(QueueConfig { max_size: 10 });
    for i in 0..10u32 {
        queue.push(EventItem::new(i, Priority::Low, "flow", "event_type"));
    }
    for i in 0..5u32 {
        queue.push(EventItem::new(i, Priority::High, "flow", "event_type"));
    }

    let stats = queue.stats();
    assert_eq!(stats.size, 10);
    assert_eq!(stats.high, 5);
    assert_eq!(stats.low, 5);
    assert_eq!(stats.drops_low, 5);
    assert_eq!(stats.drops_total, 5);
    assert_eq!(stats.drops_high, 0);
}

#[test]
fn last_resort_scenario_from_the_concrete_example_set() {
    let queue = BoundedPriorityQueue::new(QueueConfig { max_size: 3 });
    for i in 0..4u32 {
        queue.push(EventItem::new(i, Priority::High, "flow", "event_type"));
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    let stats = queue.stats();
    assert_eq!(stats.size, 3);
    assert_eq!(stats.drops_high, 1);
    assert_eq!(stats.drops_critical, 1);
}
