mod file_config;

pub use file_config::{
    CacheConfig, FileConfig, LastFmConfig, MusicBrainzConfig, RedConfig, RunConfig,
    SearchFieldsConfig, SnatchesConfig,
};

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::models::{FormatPreference, Media, RecKind, ALLOWED_LOG_VALUES};

const BYTES_IN_GB: f64 = 1_000_000_000.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be specified in the config file")]
    Missing(&'static str),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// CLI arguments that can be used for config resolution.
/// Values given on the command line override the TOML file.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub cache_dir: Option<PathBuf>,
    pub snatch_dir: Option<PathBuf>,
    pub no_snatch: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub red: RedSettings,
    pub lastfm: LastFmSettings,
    pub musicbrainz: MusicBrainzSettings,
    pub snatch: SnatchConfig,
    pub search: SearchConfig,
    /// Ranked, most preferred first.
    pub format_preferences: Vec<FormatPreference>,
    pub cache: CacheSettings,
    pub run: RunSettings,
}

/// Rate limit and retry budget of one upstream service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub min_interval: Duration,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct RedSettings {
    pub api_key: String,
    pub user_id: u64,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone)]
pub struct LastFmSettings {
    pub api_key: String,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone)]
pub struct MusicBrainzSettings {
    pub user_agent: String,
    pub service: ServiceSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnatchConfig {
    pub snatch_dir: PathBuf,
    pub max_size_bytes: u64,
    /// Values <= 0 disable the ratio check.
    pub min_allowed_ratio: f64,
    pub skip_prior_snatches: bool,
    pub use_tokens: bool,
}

impl Default for SnatchConfig {
    fn default() -> Self {
        Self {
            snatch_dir: PathBuf::from("snatches"),
            max_size_bytes: (5.0 * BYTES_IN_GB) as u64,
            min_allowed_ratio: -1.0,
            skip_prior_snatches: true,
            use_tokens: false,
        }
    }
}

/// Resolved fields to add to catalog searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    pub use_release_type: bool,
    pub use_first_release_year: bool,
    pub use_record_label: bool,
    pub use_catalog_number: bool,
}

impl SearchConfig {
    pub fn any_enabled(&self) -> bool {
        self.use_release_type
            || self.use_first_release_year
            || self.use_record_label
            || self.use_catalog_number
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_release_type: false,
            use_first_release_year: true,
            use_record_label: false,
            use_catalog_number: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub enable_api_cache: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub rec_types: Vec<RecKind>,
    pub allow_library_items: bool,
    pub max_concurrency: usize,
    pub no_snatch: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            rec_types: vec![RecKind::Album, RecKind::Track],
            allow_library_items: false,
            max_concurrency: 4,
            no_snatch: false,
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

fn resolve_service(
    fields: (&'static str, &'static str),
    seconds: Option<u64>,
    retries: Option<u32>,
    default_seconds: u64,
    seconds_range: (u64, u64),
) -> Result<ServiceSettings, ConfigError> {
    let (seconds_field, retries_field) = fields;
    let seconds = seconds.unwrap_or(default_seconds);
    let retries = retries.unwrap_or(3);
    check_range(
        seconds_field,
        seconds as f64,
        seconds_range.0 as f64,
        seconds_range.1 as f64,
    )?;
    check_range(retries_field, retries as f64, 1.0, 10.0)?;
    Ok(ServiceSettings {
        min_interval: Duration::from_secs(seconds),
        max_attempts: retries,
    })
}

fn validate_preferences(preferences: &[FormatPreference]) -> Result<(), ConfigError> {
    if preferences.is_empty() {
        return Err(ConfigError::Missing("red.format_preferences"));
    }
    let mut seen = HashSet::new();
    for (rank, pref) in preferences.iter().enumerate() {
        if !seen.insert(*pref) {
            return Err(ConfigError::Invalid {
                field: "red.format_preferences",
                reason: format!("entry {} ({}) is a duplicate", rank + 1, pref),
            });
        }
        if let Some(extras) = &pref.cd_only_extras {
            if pref.media != Media::Cd {
                return Err(ConfigError::Invalid {
                    field: "red.format_preferences",
                    reason: format!(
                        "entry {} ({}) has cd_only_extras but media is not CD",
                        rank + 1,
                        pref
                    ),
                });
            }
            if let Some(log) = extras.log {
                if !ALLOWED_LOG_VALUES.contains(&log) {
                    return Err(ConfigError::Invalid {
                        field: "red.format_preferences",
                        reason: format!(
                            "entry {} has log = {}, expected one of {:?}",
                            rank + 1,
                            log,
                            ALLOWED_LOG_VALUES
                        ),
                    });
                }
            }
        }
    }
    Ok(())
}

fn parse_rec_types(raw: Option<Vec<String>>) -> Result<Vec<RecKind>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(RunSettings::default().rec_types);
    };
    if raw.is_empty() || raw.len() > 2 {
        return Err(ConfigError::Invalid {
            field: "run.rec_types",
            reason: "expected one or two of 'album', 'track'".to_string(),
        });
    }
    let mut kinds = Vec::with_capacity(raw.len());
    for value in raw {
        let kind = RecKind::from_str(&value).ok_or_else(|| ConfigError::Invalid {
            field: "run.rec_types",
            reason: format!("unknown recommendation type '{}'", value),
        })?;
        if kinds.contains(&kind) {
            return Err(ConfigError::Invalid {
                field: "run.rec_types",
                reason: format!("'{}' listed twice", value),
            });
        }
        kinds.push(kind);
    }
    Ok(kinds)
}

/// Cache directory from the CLI, the file, or the default, in that order.
///
/// Cache maintenance only needs this, so it does not require a complete config.
pub fn resolve_cache_dir(cli: &CliConfig, cache: Option<&CacheConfig>) -> PathBuf {
    cli.cache_dir
        .clone()
        .or_else(|| cache.and_then(|c| c.dir.as_ref()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("cache"))
}

fn require_non_empty(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(field))
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// CLI values override TOML values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self, ConfigError> {
        let file = file_config.unwrap_or_default();

        let red_file = file.red.unwrap_or_default();
        let red = RedSettings {
            api_key: require_non_empty("red.api_key", red_file.api_key)?,
            user_id: red_file
                .user_id
                .filter(|id| *id > 0)
                .ok_or(ConfigError::Missing("red.user_id"))?,
            service: resolve_service(
                ("red.seconds_between_calls", "red.api_retries"),
                red_file.seconds_between_calls,
                red_file.api_retries,
                5,
                (2, 10),
            )?,
        };

        let lastfm_file = file.lastfm.unwrap_or_default();
        let lastfm = LastFmSettings {
            api_key: require_non_empty("lastfm.api_key", lastfm_file.api_key)?,
            service: resolve_service(
                ("lastfm.seconds_between_calls", "lastfm.api_retries"),
                lastfm_file.seconds_between_calls,
                lastfm_file.api_retries,
                2,
                (1, 6),
            )?,
        };

        let mb_file = file.musicbrainz.unwrap_or_default();
        let user_agent = match mb_file.contact.filter(|c| !c.trim().is_empty()) {
            Some(contact) => format!(
                "recsnatch/{} ( {} )",
                env!("CARGO_PKG_VERSION"),
                contact.trim()
            ),
            None => format!("recsnatch/{}", env!("CARGO_PKG_VERSION")),
        };
        let musicbrainz = MusicBrainzSettings {
            user_agent,
            service: resolve_service(
                ("musicbrainz.seconds_between_calls", "musicbrainz.api_retries"),
                mb_file.seconds_between_calls,
                mb_file.api_retries,
                2,
                (1, 6),
            )?,
        };

        // Snatch settings
        let snatches = red_file.snatches.unwrap_or_default();
        let snatch_dir = cli
            .snatch_dir
            .clone()
            .or_else(|| snatches.snatch_dir.map(PathBuf::from));
        let snatch_dir = match snatch_dir {
            Some(dir) => dir,
            None if cli.no_snatch => SnatchConfig::default().snatch_dir,
            None => return Err(ConfigError::Missing("red.snatches.snatch_dir")),
        };
        if !cli.no_snatch && !snatch_dir.is_dir() {
            return Err(ConfigError::Invalid {
                field: "red.snatches.snatch_dir",
                reason: format!("{:?} is not an existing directory", snatch_dir),
            });
        }
        let max_size_gb = snatches
            .max_size_gb
            .ok_or(ConfigError::Missing("red.snatches.max_size_gb"))?;
        check_range("red.snatches.max_size_gb", max_size_gb, 0.02, 100.0)?;
        let snatch = SnatchConfig {
            snatch_dir,
            max_size_bytes: (max_size_gb * BYTES_IN_GB) as u64,
            min_allowed_ratio: snatches.min_allowed_ratio.unwrap_or(-1.0),
            skip_prior_snatches: snatches.skip_prior_snatches.unwrap_or(true),
            use_tokens: snatches.use_fl_tokens.unwrap_or(false),
        };

        let search_file = red_file.search.unwrap_or_default();
        let defaults = SearchConfig::default();
        let search = SearchConfig {
            use_release_type: search_file
                .use_release_type
                .unwrap_or(defaults.use_release_type),
            use_first_release_year: search_file
                .use_first_release_year
                .unwrap_or(defaults.use_first_release_year),
            use_record_label: search_file
                .use_record_label
                .unwrap_or(defaults.use_record_label),
            use_catalog_number: search_file
                .use_catalog_number
                .unwrap_or(defaults.use_catalog_number),
        };

        let format_preferences = red_file.format_preferences.unwrap_or_default();
        validate_preferences(&format_preferences)?;

        let cache = CacheSettings {
            dir: resolve_cache_dir(cli, file.cache.as_ref()),
            enable_api_cache: file
                .cache
                .as_ref()
                .and_then(|c| c.enable_api_cache)
                .unwrap_or(true),
        };

        let run_file = file.run.unwrap_or_default();
        let max_concurrency = run_file.max_concurrency.unwrap_or(4);
        check_range("run.max_concurrency", max_concurrency as f64, 1.0, 32.0)?;
        let run = RunSettings {
            rec_types: parse_rec_types(run_file.rec_types)?,
            allow_library_items: run_file.allow_library_items.unwrap_or(false),
            max_concurrency,
            no_snatch: cli.no_snatch,
        };

        Ok(AppConfig {
            red,
            lastfm,
            musicbrainz,
            snatch,
            search,
            format_preferences,
            cache,
            run,
        })
    }
}
