use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::FormatPreference;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub red: Option<RedConfig>,
    pub lastfm: Option<LastFmConfig>,
    pub musicbrainz: Option<MusicBrainzConfig>,
    pub cache: Option<CacheConfig>,
    pub run: Option<RunConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RedConfig {
    pub api_key: Option<String>,
    pub user_id: Option<u64>,
    pub seconds_between_calls: Option<u64>,
    pub api_retries: Option<u32>,
    pub snatches: Option<SnatchesConfig>,
    pub search: Option<SearchFieldsConfig>,
    pub format_preferences: Option<Vec<FormatPreference>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SnatchesConfig {
    pub snatch_dir: Option<String>,
    pub max_size_gb: Option<f64>,
    pub min_allowed_ratio: Option<f64>,
    pub skip_prior_snatches: Option<bool>,
    pub use_fl_tokens: Option<bool>,
}

/// Which resolved fields are added to catalog searches.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SearchFieldsConfig {
    pub use_release_type: Option<bool>,
    pub use_first_release_year: Option<bool>,
    pub use_record_label: Option<bool>,
    pub use_catalog_number: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    pub seconds_between_calls: Option<u64>,
    pub api_retries: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MusicBrainzConfig {
    pub seconds_between_calls: Option<u64>,
    pub api_retries: Option<u32>,
    /// Contact address sent in the user agent, as MusicBrainz asks.
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: Option<String>,
    pub enable_api_cache: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub rec_types: Option<Vec<String>>,
    pub allow_library_items: Option<bool>,
    pub max_concurrency: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
