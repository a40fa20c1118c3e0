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

//! Agentreplay Ingest
//!
//! The bounded priority event queue that sits between the streaming event
//! producer and the persistence consumer: a priority heap (`heap`), the
//! concurrent queue built on top of it (`queue`), and the persister
//! contract plus reference drain loop that drives it (`persister`).

pub mod heap;
pub mod persister;
pub mod priority;
pub mod queue;

pub use persister::{drain_loop, DrainConfig, PersistError, Persister};
pub use priority::Priority;
pub use queue::{BoundedPriorityQueue, EventCost, EventItem, QueueConfig, QueueStats};

#[cfg(any(test, feature = "test-util"))]
pub use persister::VecPersister;
