use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use recsnatch::app::{self, ServiceClients};
use recsnatch::cache::{CacheClass, DiskCache};
use recsnatch::config::{resolve_cache_dir, AppConfig, CliConfig, FileConfig};
use recsnatch::{OrchestratorConfig, RunOrchestrator};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[clap(version, about)]
struct CliArgs {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve, match and snatch a batch of recommendations.
    Run {
        /// Path to the TOML config file.
        #[clap(long, value_parser = parse_path)]
        config: PathBuf,

        /// JSON file of recommendations produced by the scraper.
        #[clap(long, value_parser = parse_path)]
        recs: PathBuf,

        /// Do everything except downloading torrent files.
        #[clap(long)]
        no_snatch: bool,

        /// Write the run summary as JSON to this file.
        #[clap(long, value_parser = parse_path)]
        summary_out: Option<PathBuf>,

        /// Overrides `cache.dir` from the config file.
        #[clap(long, value_parser = parse_path)]
        cache_dir: Option<PathBuf>,

        /// Overrides `red.snatches.snatch_dir` from the config file.
        #[clap(long, value_parser = parse_path)]
        snatch_dir: Option<PathBuf>,
    },

    /// Inspect or maintain one of the disk caches.
    Cache {
        /// Path to the TOML config file, used for `cache.dir`.
        #[clap(long, value_parser = parse_path)]
        config: Option<PathBuf>,

        /// Overrides `cache.dir` from the config file.
        #[clap(long, value_parser = parse_path)]
        cache_dir: Option<PathBuf>,

        #[clap(value_enum)]
        class: CacheClassArg,

        #[clap(subcommand)]
        action: CacheAction,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CacheClassArg {
    Api,
    Scraper,
}

impl From<CacheClassArg> for CacheClass {
    fn from(arg: CacheClassArg) -> Self {
        match arg {
            CacheClassArg::Api => CacheClass::Api,
            CacheClassArg::Scraper => CacheClass::Scraper,
        }
    }
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Show entry count, sizes and age range.
    Info,
    /// Delete every entry.
    Empty,
    /// Verify every entry and drop corrupted ones.
    Check,
    /// List all keys, oldest first.
    ListKeys,
    /// Print the value stored under a key.
    ReadValue { key: String },
}

fn load_file_config(path: Option<&PathBuf>) -> Result<Option<FileConfig>> {
    path.map(|p| FileConfig::load(p)).transpose()
}

async fn run_command(
    config_path: PathBuf,
    recs: PathBuf,
    summary_out: Option<PathBuf>,
    cli: CliConfig,
) -> Result<()> {
    let file_config = load_file_config(Some(&config_path))?;
    let config = AppConfig::resolve(&cli, file_config)
        .with_context(|| format!("Invalid config file {:?}", config_path))?;
    if config.run.no_snatch {
        info!("Dry run: no torrent files will be downloaded");
    }

    let recommendations = app::load_recommendations(&recs)?;
    info!("Loaded {} recommendation(s) from {:?}", recommendations.len(), recs);

    let clients = ServiceClients::build(&config)?;
    let shutdown = CancellationToken::new();
    let orchestrator = RunOrchestrator::new(
        clients.lastfm.clone(),
        clients.musicbrainz.clone(),
        clients.red.clone(),
        OrchestratorConfig::from(&config),
    )
    .with_cancellation(shutdown.clone());

    let interrupts = futures::stream::unfold((), |_| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
    });
    tokio::spawn(async move {
        if app::watch_interrupts(interrupts, shutdown).await {
            std::process::exit(130);
        }
    });

    let summary = orchestrator.run(recommendations).await?;

    app::log_summary_table(&summary);
    clients.log_stats();
    if let Some(path) = summary_out {
        app::write_summary(&path, &summary)?;
        info!("Run summary written to {:?}", path);
    }
    Ok(())
}

fn cache_command(
    config_path: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    class: CacheClass,
    action: CacheAction,
) -> Result<()> {
    let file_config = load_file_config(config_path.as_ref())?;
    let cli = CliConfig {
        cache_dir,
        ..CliConfig::default()
    };
    let dir = resolve_cache_dir(&cli, file_config.as_ref().and_then(|f| f.cache.as_ref()));
    let cache = DiskCache::open(&dir, class)
        .with_context(|| format!("Failed to open {} cache in {:?}", class, dir))?;

    match action {
        CacheAction::Info => println!("{}", cache.info()?),
        CacheAction::Empty => {
            let removed = cache.clear()?;
            info!("Removed {} entr(ies) from the {} cache", removed, class);
        }
        CacheAction::Check => {
            let report = cache.check()?;
            for warning in &report.integrity_warnings {
                warn!("integrity check: {}", warning);
            }
            for key in &report.dropped_keys {
                warn!("dropped corrupted entry {}", key);
            }
            if let Some(moved) = &report.quarantined {
                warn!("damaged cache file moved to {:?}", moved);
            }
            info!(
                "Checked {} entr(ies), dropped {}",
                report.entries_checked,
                report.dropped_keys.len()
            );
        }
        CacheAction::ListKeys => {
            for key in cache.list_keys()? {
                println!("{}", key);
            }
        }
        CacheAction::ReadValue { key } => match cache.read_value(&key)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => bail!("No entry for key {}", key),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to install the tracing subscriber")?;

    match cli_args.command {
        Command::Run {
            config,
            recs,
            no_snatch,
            summary_out,
            cache_dir,
            snatch_dir,
        } => {
            let cli = CliConfig {
                cache_dir,
                snatch_dir,
                no_snatch,
            };
            run_command(config, recs, summary_out, cli).await
        }
        Command::Cache {
            config,
            cache_dir,
            class,
            action,
        } => cache_command(config, cache_dir, class.into(), action),
    }
}
