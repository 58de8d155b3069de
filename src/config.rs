// ⚙️ Configuration - Endpoints, batch window and acquisition policies
// Loaded from an optional JSON file; every field has a default.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::model::PageRequest;

pub const DEFAULT_CATALOG_ENDPOINT: &str = "https://pokeapi.co/api/v2/pokemon";
pub const DEFAULT_ARTWORK_BASE: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork";

// ============================================================================
// POLICIES
// ============================================================================

/// How per-entry resolutions are combined into a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// One failed entry fails the whole batch
    #[default]
    FailFast,

    /// Keep every entry that resolved, report the rest
    BestEffort,
}

/// What happens when a refresh is requested while another is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// The new request is dropped
    #[default]
    Ignore,

    /// The new request wins; the older result is discarded when it lands
    Supersede,
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub catalog_endpoint: String,
    pub limit: u32,
    pub offset: u32,
    pub artwork_base: String,

    /// None = wait forever
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let page = PageRequest::default();
        ApiConfig {
            catalog_endpoint: DEFAULT_CATALOG_ENDPOINT.to_string(),
            limit: page.limit,
            offset: page.offset,
            artwork_base: DEFAULT_ARTWORK_BASE.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn page(&self) -> PageRequest {
        PageRequest {
            limit: self.limit,
            offset: self.offset,
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    pub aggregation: Aggregation,
    pub overlap: OverlapPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokedexConfig {
    pub api: ApiConfig,
    pub acquisition: AcquisitionConfig,
}

impl PokedexConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PokedexConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.limit == 0 {
            anyhow::bail!("api.limit must be at least 1");
        }
        reqwest::Url::parse(&self.api.catalog_endpoint).with_context(|| {
            format!("Invalid catalog endpoint: {}", self.api.catalog_endpoint)
        })?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
