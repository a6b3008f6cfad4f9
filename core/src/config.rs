use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub word_ids: usize,
    pub postings: usize,
    pub results: usize,
    pub max_tf: usize,
    pub authority: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { word_ids: 1000, postings: 500, results: 100, max_tf: 300, authority: 10_000 }
    }
}

/// Ranking and cache parameters for the query engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title_weight: f64,
    pub body_weight: f64,
    /// Share of the final score taken by term/phrase relevance; the rest is authority.
    pub alpha: f64,
    pub damping: f64,
    pub authority_iterations: usize,
    pub authority_tolerance: f64,
    pub max_results: usize,
    /// Number of terms kept in a document's forward summary.
    pub summary_size: usize,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title_weight: 10.0,
            body_weight: 1.0,
            alpha: 0.7,
            damping: 0.85,
            authority_iterations: 10,
            authority_tolerance: 1e-5,
            max_results: 50,
            summary_size: 10,
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::Config(format!("alpha must be within [0, 1], got {}", self.alpha)));
        }
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(Error::Config(format!("damping must be within [0, 1], got {}", self.damping)));
        }
        if self.max_results == 0 {
            return Err(Error::Config("max_results must be positive".into()));
        }
        Ok(())
    }
}
