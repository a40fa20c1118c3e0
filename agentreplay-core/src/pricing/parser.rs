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

//! Parses a LiteLLM-shaped pricing catalog document into a [`PricingTable`],
//! filtering to chat-capable entries and normalizing provider names.

use super::normalize::normalize_provider;
use super::types::{PricingEntry, PricingTable};
use super::PricingError;
use serde::Deserialize;
use std::collections::HashMap;

/// Chat-like modes that are admitted. Anything else (including an
/// unrecognized mode string) is dropped, per the catalog's documented
/// `mode` taxonomy.
const CHAT_LIKE_MODES: &[&str] = &["chat", "completion", "responses"];

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    litellm_provider: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    input_cost_per_token: Option<f64>,
    #[serde(default)]
    output_cost_per_token: Option<f64>,
    #[serde(default)]
    cache_creation_input_token_cost: Option<f64>,
    #[serde(default)]
    cache_read_input_token_cost: Option<f64>,
    #[serde(default)]
    max_input_tokens: Option<u32>,
    #[serde(default)]
    max_output_tokens: Option<u32>,
    #[serde(default)]
    supports_prompt_caching: bool,
    #[serde(default)]
    supports_vision: bool,
    #[serde(default)]
    supports_function_calling: bool,
}

fn is_chat_like(mode: Option<&str>) -> bool {
    match mode {
        None => true,
        Some(m) => CHAT_LIKE_MODES.contains(&m),
    }
}

/// Parse raw catalog bytes into a filtered, normalized pricing table.
pub fn parse_catalog(bytes: &[u8]) -> Result<PricingTable, PricingError> {
    let raw: HashMap<String, RawEntry> =
        serde_json::from_slice(bytes).map_err(|e| PricingError::Parse(e.to_string()))?;

    let mut table = PricingTable::new();

    for (model, entry) in raw {
        if !is_chat_like(entry.mode.as_deref()) {
            continue;
        }

        let (Some(input_cost), Some(output_cost)) =
            (entry.input_cost_per_token, entry.output_cost_per_token)
        else {
            continue;
        };

        let provider = normalize_provider(entry.litellm_provider.as_deref().unwrap_or(""));

        let pricing = PricingEntry {
            provider: provider.clone(),
            model: model.clone(),
            input_cost_per_1k: input_cost * 1000.0,
            output_cost_per_1k: output_cost * 1000.0,
            cache_creation_per_1k: entry.cache_creation_input_token_cost.map(|c| c * 1000.0),
            cache_read_per_1k: entry.cache_read_input_token_cost.map(|c| c * 1000.0),
            max_input_tokens: entry.max_input_tokens,
            max_output_tokens: entry.max_output_tokens,
            supports_prompt_caching: entry.supports_prompt_caching,
            supports_vision: entry.supports_vision,
            supports_function_calling: entry.supports_function_calling,
        };

        table.insert((provider, model), pricing);
    }

    Ok(table)
}
