use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tokio_util::sync::CancellationToken;
use tubematch::artist_store::{ArtistStore, SqliteArtistStore};
use tubematch::config::{AppConfig, CliConfig, FileConfig};
use tubematch::ingest;
use tubematch::media_search::{MediaSearch, YtDlpSearch};
use tubematch::resolver::{ChannelResolver, Resolution, ResolverSettings};
use tubematch::review::ReviewCsv;
use tubematch::runner::{BatchRunner, UnitOutcome};
use tubematch::track_finder::{TrackFinder, TrackFinderSettings};
use tubematch::verifier::{ChannelVerifier, Verdict};

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
#[command(version)]
struct CliArgs {
    /// Path to the SQLite artists database file.
    #[clap(long, value_parser = parse_path)]
    pub db: Option<PathBuf>,

    /// Path to a TOML config file. Values there override CLI flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upsert (artist, song) pairs from a JSON file.
    Import {
        /// JSON array of {"artist": ..., "song": ...} objects.
        #[clap(value_parser = parse_path)]
        file: PathBuf,
    },
    /// Resolve a channel for every artist that has none yet.
    Resolve {
        /// Worker-pool width.
        #[clap(long)]
        workers: Option<usize>,
    },
    /// Verify resolved channels against each artist's representative song.
    Verify {
        /// Worker-pool width.
        #[clap(long)]
        workers: Option<usize>,
    },
    /// Look up a single track.
    Find {
        song: String,
        artist: String,
        album: Option<String>,
    },
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
        .unwrap();

    info!(
        "tubematch {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_path: cli_args.db.clone(),
        workers: match &cli_args.command {
            Command::Resolve { workers } | Command::Verify { workers } => *workers,
            _ => None,
        },
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening artist database at {:?}...", config.db_path);
    let store: Arc<dyn ArtistStore> = Arc::new(SqliteArtistStore::new(&config.db_path)?);
    let search: Arc<dyn MediaSearch> = Arc::new(YtDlpSearch::new(
        config.search_tool.clone(),
        config.search_timeout_secs,
    ));

    // An interrupt stops new dispatch; in-flight searches finish on their
    // own timeouts.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing in-flight work...");
            signal_cancel.cancel();
        }
    });

    match cli_args.command {
        Command::Import { file } => {
            let imports = ingest::load_imports(&file)?;
            ingest::upsert_all(store.as_ref(), &imports)?;
        }
        Command::Resolve { .. } => {
            let pending = store.pending_resolution()?;
            let resolver = Arc::new(ChannelResolver::new(
                Arc::clone(&store),
                Arc::clone(&search),
                ResolverSettings {
                    search_limit: config.search_limit,
                    host: config.host.clone(),
                },
            ));
            let runner = BatchRunner::new(config.workers, cancel.clone());
            runner
                .run("channel resolution", pending, move |artist| {
                    let resolver = Arc::clone(&resolver);
                    async move {
                        match resolver.resolve(&artist).await? {
                            Resolution::Resolved(_) | Resolution::CacheHit(_) => {
                                Ok(UnitOutcome::Hit)
                            }
                            Resolution::NoMatch | Resolution::SearchUnavailable => {
                                Ok(UnitOutcome::Miss)
                            }
                        }
                    }
                })
                .await;
        }
        Command::Verify { .. } => {
            let pending = store.pending_verification()?;
            let review_log = ReviewCsv::create(&config.review_csv)?;
            info!("Exporting verification misses to {:?}", config.review_csv);
            let verifier = Arc::new(ChannelVerifier::new(
                Arc::clone(&store),
                Arc::clone(&search),
                Some(review_log),
            ));
            let runner = BatchRunner::new(config.workers, cancel.clone());
            runner
                .run("channel verification", pending, move |record| {
                    let verifier = Arc::clone(&verifier);
                    async move {
                        match verifier.verify(&record).await? {
                            Verdict::Confirmed { .. } => Ok(UnitOutcome::Hit),
                            Verdict::Rejected | Verdict::Unavailable => Ok(UnitOutcome::Miss),
                        }
                    }
                })
                .await;
        }
        Command::Find { song, artist, album } => {
            let finder = TrackFinder::new(
                Arc::clone(&store),
                Arc::clone(&search),
                TrackFinderSettings {
                    search_limit: config.search_limit,
                    ..Default::default()
                },
            );
            match finder.find_track(&song, &artist, album.as_deref()).await? {
                Some(found) => {
                    println!("url = {}", found.upload_url);
                    println!("channel = {}", found.channel_url.as_deref().unwrap_or("-"));
                }
                None => println!("no match for {} - {}", artist, song),
            }
        }
    }

    Ok(())
}
