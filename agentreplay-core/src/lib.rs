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

//! Agentreplay Core
//!
//! Shared error type, the retry/backoff primitive used by the persister
//! contract, and the pricing resolver consulted before an event carrying
//! cost information is handed to the ingestion queue.

pub mod error;
pub mod pricing;
pub mod resilience;

pub use error::{AgentreplayError, Result};
pub use pricing::{
    normalize_provider, strip_model_version, LoadOutcome, PricingCacheConfig, PricingEntry,
    PricingError, PricingResolver, PricingTable, CACHE_FILE_NAME, LITELLM_PRICING_URL,
};
pub use resilience::RetryPolicy;
