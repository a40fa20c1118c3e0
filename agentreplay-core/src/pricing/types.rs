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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single normalized pricing entry, keyed by `(provider, model)`.
///
/// Immutable once constructed; a reload replaces the whole table rather
/// than mutating an entry in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingEntry {
    /// Normalized, lowercase provider (e.g. "anthropic", "bedrock").
    pub provider: String,
    /// Canonical model name as it appeared in the catalog.
    pub model: String,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub cache_creation_per_1k: Option<f64>,
    pub cache_read_per_1k: Option<f64>,
    pub max_input_tokens: Option<u32>,
    pub max_output_tokens: Option<u32>,
    pub supports_prompt_caching: bool,
    pub supports_vision: bool,
    pub supports_function_calling: bool,
}

/// The full resolved pricing catalog, keyed by `(normalized provider, model)`.
pub type PricingTable = HashMap<(String, String), PricingEntry>;
