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

//! Disk cache + network loader for the pricing catalog, and the
//! version-tolerant `(provider, model)` lookup on top of it.

use super::normalize::{normalize_provider, strip_model_version};
use super::parser::parse_catalog;
use super::types::{PricingEntry, PricingTable};
use super::{PricingError, CACHE_FILE_NAME, LITELLM_PRICING_URL};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// How the pricing table was most recently populated. Exposed so callers
/// can decide whether to surface a "using stale pricing data" indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Loaded from an on-disk cache that was within its TTL.
    Fresh,
    /// Fetched from the network and written to cache.
    Fetched,
    /// Network fetch failed; fell back to an expired (but parseable) cache.
    Stale,
}

#[derive(Debug, Clone)]
pub struct PricingCacheConfig {
    pub cache_dir: PathBuf,
    pub catalog_url: String,
    pub ttl: Duration,
    pub fetch_timeout: Duration,
}

impl Default for PricingCacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("."),
            catalog_url: LITELLM_PRICING_URL.to_string(),
            ttl: Duration::from_secs(24 * 60 * 60),
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Thread-safe pricing resolver. Read access (`get_price`, `count`) never
/// blocks on a concurrent `load`: the table lives behind an `Arc` swapped
/// under a short-lived write lock, so in-flight readers hold their own
/// `Arc` clone of a complete (old or new) table, never a partial one.
pub struct PricingResolver {
    table: RwLock<Arc<PricingTable>>,
    config: PricingCacheConfig,
}

impl PricingResolver {
    pub fn new(config: PricingCacheConfig) -> Self {
        Self {
            table: RwLock::new(Arc::new(PricingTable::new())),
            config,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.config.cache_dir.join(CACHE_FILE_NAME)
    }

    /// Load (or reload) the pricing table: fresh cache, else network
    /// fetch, else stale-cache fallback. See module docs for the exact
    /// procedure.
    pub async fn load(&self) -> Result<LoadOutcome, PricingError> {
        let path = self.cache_path();

        if self.cache_is_fresh(&path).await {
            if let Some(table) = self.try_parse_file(&path).await {
                self.install(table);
                return Ok(LoadOutcome::Fresh);
            }
            tracing::debug!(
                path = %path.display(),
                "pricing cache within TTL but unparseable, treating as miss"
            );
        }

        match self.fetch_catalog().await {
            Ok(bytes) => {
                let table = parse_catalog(&bytes)?;
                self.write_cache(&path, &bytes).await?;
                tracing::info!(entries = table.len(), "loaded pricing catalog from network");
                self.install(table);
                Ok(LoadOutcome::Fetched)
            }
            Err(fetch_err) => {
                if let Some(table) = self.try_parse_file(&path).await {
                    tracing::warn!(
                        error = %fetch_err,
                        "pricing fetch failed, falling back to stale cache"
                    );
                    self.install(table);
                    Ok(LoadOutcome::Stale)
                } else {
                    Err(PricingError::NoDataAvailable)
                }
            }
        }
    }

    /// Normalize the provider, try an exact match, then retry once with
    /// the model's trailing version suffix stripped.
    pub fn get_price(&self, provider: &str, model: &str) -> Option<PricingEntry> {
        let table = self.table.read().clone();
        let provider = normalize_provider(provider);

        if let Some(entry) = table.get(&(provider.clone(), model.to_string())) {
            return Some(entry.clone());
        }

        let stripped = strip_model_version(model);
        if stripped != model {
            if let Some(entry) = table.get(&(provider, stripped.to_string())) {
                return Some(entry.clone());
            }
        }

        None
    }

    /// Number of loaded entries (post-filter).
    pub fn count(&self) -> usize {
        self.table.read().len()
    }

    fn install(&self, table: PricingTable) {
        *self.table.write() = Arc::new(table);
    }

    async fn cache_is_fresh(&self, path: &Path) -> bool {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age <= self.config.ttl,
            Err(_) => true, // mtime in the future; treat as fresh rather than erroring
        }
    }

    async fn try_parse_file(&self, path: &Path) -> Option<PricingTable> {
        let bytes = tokio::fs::read(path).await.ok()?;
        parse_catalog(&bytes).ok()
    }

    async fn fetch_catalog(&self) -> Result<Vec<u8>, PricingError> {
        let client = reqwest::Client::builder()
            .timeout(self.config.fetch_timeout)
            .build()
            .map_err(|e| PricingError::Network(e.to_string()))?;

        let response = client
            .get(&self.config.catalog_url)
            .send()
            .await
            .map_err(|e| PricingError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PricingError::Network(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| PricingError::Network(e.to_string()))
    }

    async fn write_cache(&self, path: &Path, bytes: &[u8]) -> Result<(), PricingError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PricingError::Io(e.to_string()))?;
        }

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| PricingError::Io(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            tokio::fs::set_permissions(&tmp_path, perms)
                .await
                .map_err(|e| PricingError::Io(e.to_string()))?;
        }

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| PricingError::Io(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;
    use tempfile::tempdir;

    const CHAT_CATALOG: &str = r#"{
        "claude-3-5-sonnet-20241022": {
            "litellm_provider": "anthropic",
            "mode": "chat",
            "input_cost_per_token": 0.000003,
            "output_cost_per_token": 0.000015,
            "cache_creation_input_token_cost": 0.00000375,
            "supports_prompt_caching": true
        }
    }"#;

    fn config(dir: &Path) -> PricingCacheConfig {
        PricingCacheConfig {
            cache_dir: dir.to_path_buf(),
            catalog_url: "http://127.0.0.1:9/unreachable".to_string(),
            ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn loads_from_fresh_cache_without_network() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        tokio::fs::write(&path, CHAT_CATALOG).await.unwrap();

        let resolver = PricingResolver::new(config(dir.path()));
        let outcome = resolver.load().await.unwrap();

        assert_eq!(outcome, LoadOutcome::Fresh);
        assert_eq!(resolver.count(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_stale_cache_when_fetch_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        tokio::fs::write(&path, CHAT_CATALOG).await.unwrap();

        // Back-date the file well past the TTL.
        let stale_time = SystemTime::now() - Duration::from_secs(48 * 3600);
        let stale_time = filetime_from_system_time(stale_time);
        filetime_set(&path, stale_time);

        let mut cfg = config(dir.path());
        cfg.ttl = Duration::from_secs(3600);
        let resolver = PricingResolver::new(cfg);

        let outcome = resolver.load().await.unwrap();
        assert_eq!(outcome, LoadOutcome::Stale);
        assert_eq!(resolver.count(), 1);
    }

    #[tokio::test]
    async fn no_data_available_when_fetch_fails_and_no_cache_exists() {
        let dir = tempdir().unwrap();
        let resolver = PricingResolver::new(config(dir.path()));

        let err = resolver.load().await.unwrap_err();
        assert!(matches!(err, PricingError::NoDataAvailable));
    }

    #[tokio::test]
    async fn lookup_strips_version_suffix_on_miss() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        tokio::fs::write(&path, CHAT_CATALOG).await.unwrap();

        let resolver = PricingResolver::new(config(dir.path()));
        resolver.load().await.unwrap();

        let exact = resolver.get_price("anthropic", "claude-3-5-sonnet-20241022");
        assert!(exact.is_some());

        let versionless = resolver.get_price("anthropic", "claude-3-5-sonnet");
        assert!(versionless.is_some());
        assert_eq!(versionless.unwrap().model, "claude-3-5-sonnet-20241022");

        assert!(resolver.get_price("anthropic", "claude-unknown").is_none());
    }

    // Minimal mtime backdating without pulling in the `filetime` crate:
    // round-trip through a Unix timestamp and `std::fs::File::set_modified`.
    fn filetime_from_system_time(t: SystemTime) -> SystemTime {
        t.duration_since(UNIX_EPOCH)
            .map(|d| UNIX_EPOCH + d)
            .unwrap_or(UNIX_EPOCH)
    }

    fn filetime_set(path: &Path, t: SystemTime) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(t).unwrap();
    }
}
