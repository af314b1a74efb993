use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::closure::ClosureSettings;
use crate::error::DocsError;
use crate::http::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "gwas-docs.json";
pub const DEFAULT_OLS_BASE_URL: &str = "https://www.ebi.ac.uk/ols4/api";
pub const DEFAULT_ONTOLOGY: &str = "efo";
pub const DEFAULT_ENSEMBL_BASE_URL: &str = "https://rest.ensembl.org";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ols_base_url: Option<String>,
    #[serde(default)]
    pub ontology: Option<String>,
    #[serde(default)]
    pub ensembl_base_url: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub max_batch: Option<usize>,
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default)]
    pub lookup_chunk: Option<usize>,
    #[serde(default)]
    pub retry: Option<RetryEntry>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetryEntry {
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub ols_base_url: String,
    pub ontology: String,
    pub ensembl_base_url: String,
    pub closure: ClosureSettings,
    pub lookup_chunk: usize,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        ConfigLoader::resolve_config(Config::default())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must be readable; the default file is optional.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DocsError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ResolvedConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DocsError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| DocsError::ConfigParse(err.to_string()))?;

        Ok(Self::resolve_config(config))
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let defaults = ClosureSettings::default();
        let retry_defaults = RetryPolicy::default();
        let retry = config.retry.unwrap_or_default();

        ResolvedConfig {
            ols_base_url: config
                .ols_base_url
                .unwrap_or_else(|| DEFAULT_OLS_BASE_URL.to_string()),
            ontology: config
                .ontology
                .unwrap_or_else(|| DEFAULT_ONTOLOGY.to_string()),
            ensembl_base_url: config
                .ensembl_base_url
                .unwrap_or_else(|| DEFAULT_ENSEMBL_BASE_URL.to_string()),
            closure: ClosureSettings {
                page_size: config.page_size.unwrap_or(defaults.page_size).max(1),
                max_pages: config.max_pages.unwrap_or(defaults.max_pages).max(1),
                max_batch: config.max_batch.unwrap_or(defaults.max_batch).max(1),
            },
            lookup_chunk: config.lookup_chunk.unwrap_or(1000).max(1),
            retry: RetryPolicy {
                max_retries: retry.max_retries.unwrap_or(retry_defaults.max_retries),
                delay_ms: retry.delay_ms.unwrap_or(retry_defaults.delay_ms),
            },
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(30)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default());
        assert_eq!(resolved.ols_base_url, DEFAULT_OLS_BASE_URL);
        assert_eq!(resolved.ontology, "efo");
        assert_eq!(resolved.closure.page_size, 1000);
        assert_eq!(resolved.closure.max_batch, 999);
        assert_eq!(resolved.closure.max_pages, 200);
        assert_eq!(resolved.lookup_chunk, 1000);
        assert_eq!(resolved.retry, RetryPolicy::default());
        assert_eq!(resolved.timeout, Duration::from_secs(30));
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let config = Config {
            page_size: Some(0),
            max_batch: Some(0),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config);
        assert_eq!(resolved.closure.page_size, 1);
        assert_eq!(resolved.closure.max_batch, 1);
    }
}
