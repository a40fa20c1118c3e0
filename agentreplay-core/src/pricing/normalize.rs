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

//! Provider normalization and model version stripping.

/// Normalize a `litellm_provider` value to one of the canonical names, or
/// pass the lowercased input through unchanged if it isn't recognized.
pub fn normalize_provider(source: &str) -> String {
    match source.to_ascii_lowercase().as_str() {
        "anthropic" => "anthropic".to_string(),
        "openai" => "openai".to_string(),
        "bedrock" | "bedrock_converse" => "bedrock".to_string(),
        "vertex_ai" | "google" | "gemini" => "google".to_string(),
        "azure" | "azure_openai" => "azure".to_string(),
        other => other.to_string(),
    }
}

/// Strip a trailing version suffix from a model name, per the rule
/// observed in the upstream catalog: a trailing 8-digit date
/// (`-YYYYMMDD`) or a trailing purely-numeric counter segment
/// (`-<digits>`), removed only if at least two dash-separated tokens
/// remain afterwards. Returns the original name unchanged if no such
/// suffix is present, so the function is idempotent.
pub fn strip_model_version(model: &str) -> &str {
    let Some((head, tail)) = model.rsplit_once('-') else {
        return model;
    };

    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return model;
    }

    if head.split('-').count() < 2 {
        return model;
    }

    head
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_providers_case_insensitively() {
        assert_eq!(normalize_provider("Anthropic"), "anthropic");
        assert_eq!(normalize_provider("OPENAI"), "openai");
        assert_eq!(normalize_provider("bedrock_converse"), "bedrock");
        assert_eq!(normalize_provider("vertex_ai"), "google");
        assert_eq!(normalize_provider("Gemini"), "google");
        assert_eq!(normalize_provider("Azure_OpenAI"), "azure");
    }

    #[test]
    fn passes_through_unknown_providers_lowercased() {
        assert_eq!(normalize_provider("DeepSeek"), "deepseek");
    }

    #[test]
    fn normalize_provider_is_idempotent() {
        for input in ["Anthropic", "vertex_ai", "Mistral", "AZURE"] {
            let once = normalize_provider(input);
            let twice = normalize_provider(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn strips_trailing_date_suffix() {
        assert_eq!(
            strip_model_version("claude-3-5-sonnet-20241022"),
            "claude-3-5-sonnet"
        );
    }

    #[test]
    fn strips_trailing_numeric_counter() {
        assert_eq!(strip_model_version("gpt-4-32"), "gpt-4");
    }

    #[test]
    fn does_not_strip_alphanumeric_suffix() {
        // "32k" is not purely digits, so gpt-4-32k must be preserved verbatim.
        assert_eq!(strip_model_version("gpt-4-32k"), "gpt-4-32k");
    }

    #[test]
    fn refuses_to_strip_down_to_a_single_token() {
        // "sonnet" alone would leave zero dash-separated tokens, so the
        // two-token minimum blocks the strip.
        assert_eq!(strip_model_version("sonnet-20241022"), "sonnet-20241022");
    }

    #[test]
    fn strip_model_version_is_idempotent_without_suffix() {
        let stripped = strip_model_version("claude-3-5-sonnet");
        assert_eq!(strip_model_version(stripped), stripped);
    }
}
