mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::runner::DEFAULT_WORKERS;

/// CLI arguments that participate in config resolution.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite artists database (created on first run).
    pub db_path: PathBuf,
    /// Search tool binary name or path.
    pub search_tool: String,
    /// Hard deadline for a single search-tool invocation.
    pub search_timeout_secs: u64,
    /// Over-fetch size for global channel searches.
    pub search_limit: usize,
    /// Worker-pool width for batch runs.
    pub workers: usize,
    /// Host prefixed onto relative channel URLs.
    pub host: String,
    /// Where verification misses are exported for review.
    pub review_csv: PathBuf,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db or in the config file")
            })?;

        if db_path.is_dir() {
            bail!("db_path is a directory, expected a file: {:?}", db_path);
        }

        let workers = file.workers.or(cli.workers).unwrap_or(DEFAULT_WORKERS);
        if workers == 0 {
            bail!("workers must be at least 1");
        }

        Ok(Self {
            db_path,
            search_tool: file.search_tool.unwrap_or_else(|| "yt-dlp".to_string()),
            search_timeout_secs: file.search_timeout_secs.unwrap_or(12),
            search_limit: file.search_limit.unwrap_or(20),
            workers,
            host: file
                .host
                .unwrap_or_else(|| "https://www.youtube.com".to_string()),
            review_csv: file
                .review_csv
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("missing_channel_matches.csv")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_cli_only_defaults() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/tmp/artists.db")),
            workers: None,
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/artists.db"));
        assert_eq!(config.search_tool, "yt-dlp");
        assert_eq!(config.search_timeout_secs, 12);
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.host, "https://www.youtube.com");
    }

    #[test]
    fn test_toml_overrides_cli() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/cli/artists.db")),
            workers: Some(4),
        };
        let file = FileConfig {
            db_path: Some("/toml/artists.db".to_string()),
            workers: Some(12),
            search_tool: Some("yt-dlp-nightly".to_string()),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        assert_eq!(config.db_path, PathBuf::from("/toml/artists.db"));
        assert_eq!(config.workers, 12);
        assert_eq!(config.search_tool, "yt-dlp-nightly");
    }

    #[test]
    fn test_missing_db_path_is_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("db_path must be specified"));
    }

    #[test]
    fn test_db_path_must_not_be_directory() {
        let dir = TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: Some(dir.path().to_path_buf()),
            workers: None,
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_workers_is_error() {
        let cli = CliConfig {
            db_path: Some(PathBuf::from("/tmp/artists.db")),
            workers: Some(0),
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }

    #[test]
    fn test_file_config_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tubematch.toml");
        std::fs::write(
            &path,
            "db_path = \"/data/artists.db\"\nworkers = 6\nsearch_timeout_secs = 10\n",
        )
        .unwrap();

        let file = FileConfig::load(&path).unwrap();
        assert_eq!(file.db_path.as_deref(), Some("/data/artists.db"));
        assert_eq!(file.workers, Some(6));
        assert_eq!(file.search_timeout_secs, Some(10));
    }
}
