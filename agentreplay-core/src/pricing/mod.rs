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

//! Pricing resolver: a cached, version-tolerant lookup of per-model cost
//! data sourced from an external LiteLLM-shaped catalog.
//!
//! Split into two concerns: [`parser`] (stateless parse + normalize) and
//! [`cache`] (disk cache, network fetch, graceful degradation, lookup).

mod cache;
mod normalize;
mod parser;
mod types;

pub use cache::{LoadOutcome, PricingCacheConfig, PricingResolver};
pub use normalize::{normalize_provider, strip_model_version};
pub use parser::parse_catalog;
pub use types::{PricingEntry, PricingTable};

use thiserror::Error;

/// Default URL for the LiteLLM pricing catalog, matching the upstream
/// project this data format is modeled on.
pub const LITELLM_PRICING_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

/// The cache file name under `cache_dir`.
pub const CACHE_FILE_NAME: &str = "litellm_pricing.json";

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("no pricing data available: fetch failed and no usable cache exists")]
    NoDataAvailable,
}
