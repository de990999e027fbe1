//! Runtime settings: command flags, then `BITFACTS_*` environment variables,
//! then defaults.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use bitfacts_ingest_sql::SqliteSource;
use bitfacts_store::scan::{DEFAULT_MAX_SCAN_KEYS, DEFAULT_SCAN_BATCH};
use bitfacts_store::writer::DEFAULT_BATCH_SIZE;
use bitfacts_store::{open_store, Keyspace, KvStore, ScanOptions};
use clap::Args;

pub const DEFAULT_PREFIX: &str = "er";
pub const DEFAULT_STORE: &str = "./bitfacts-store.sqlite";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Flags shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Key prefix [env: BITFACTS_PREFIX] [default: er]
    #[arg(long, global = true)]
    pub prefix: Option<String>,

    /// Store location: a SQLite file path or `:memory:` [env: BITFACTS_STORE]
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Relational source database (SQLite file) [env: BITFACTS_SOURCE]
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// trace|debug|info|warn|error [env: BITFACTS_LOG] [default: info]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Queued write operations per batch [env: BITFACTS_BATCH_SIZE]
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Ceiling on keys examined per scan [env: BITFACTS_MAX_SCAN_KEYS]
    #[arg(long, global = true)]
    pub max_scan_keys: Option<usize>,

    /// Print JSON instead of a summary
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub prefix: String,
    pub store: String,
    pub source: Option<PathBuf>,
    pub log_level: tracing::Level,
    pub batch_size: usize,
    pub max_scan_keys: usize,
    pub json: bool,
}

fn parsed<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| anyhow!("invalid {name} `{raw}`: {e}"))
}

impl Settings {
    pub fn resolve(args: &GlobalArgs) -> Result<Self> {
        Self::resolve_with(args, |name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary environment lookup.
    pub fn resolve_with(args: &GlobalArgs, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let log_raw = args
            .log_level
            .clone()
            .or_else(|| env("BITFACTS_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let batch_size = match (args.batch_size, env("BITFACTS_BATCH_SIZE")) {
            (Some(n), _) => n,
            (None, Some(raw)) => parsed("BITFACTS_BATCH_SIZE", &raw)?,
            (None, None) => DEFAULT_BATCH_SIZE,
        };
        let max_scan_keys = match (args.max_scan_keys, env("BITFACTS_MAX_SCAN_KEYS")) {
            (Some(n), _) => n,
            (None, Some(raw)) => parsed("BITFACTS_MAX_SCAN_KEYS", &raw)?,
            (None, None) => DEFAULT_MAX_SCAN_KEYS,
        };
        if batch_size == 0 || max_scan_keys == 0 {
            bail!("batch size and scan ceiling must be positive");
        }

        Ok(Self {
            prefix: args
                .prefix
                .clone()
                .or_else(|| env("BITFACTS_PREFIX"))
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            store: args
                .store
                .clone()
                .or_else(|| env("BITFACTS_STORE"))
                .unwrap_or_else(|| DEFAULT_STORE.to_string()),
            source: args
                .source
                .clone()
                .or_else(|| env("BITFACTS_SOURCE").map(PathBuf::from)),
            log_level: parsed("log level", &log_raw)?,
            batch_size,
            max_scan_keys,
            json: args.json,
        })
    }

    pub fn keyspace(&self) -> Result<Keyspace> {
        Ok(Keyspace::new(&self.prefix)?)
    }

    pub fn open_store(&self) -> Result<Box<dyn KvStore>> {
        open_store(&self.store).with_context(|| format!("opening store {}", self.store))
    }

    pub fn open_source(&self) -> Result<SqliteSource> {
        let Some(path) = &self.source else {
            bail!("no relational source: pass --source or set BITFACTS_SOURCE");
        };
        SqliteSource::open(path)
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            batch_size: DEFAULT_SCAN_BATCH,
            max_keys: self.max_scan_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_without_flags_or_env() {
        let s = Settings::resolve_with(&GlobalArgs::default(), env_of(&[])).unwrap();
        assert_eq!(s.prefix, "er");
        assert_eq!(s.store, "./bitfacts-store.sqlite");
        assert_eq!(s.source, None);
        assert_eq!(s.log_level, tracing::Level::INFO);
        assert_eq!(s.batch_size, 2000);
        assert_eq!(s.scan_options().max_keys, 200_000);
        assert_eq!(s.scan_options().batch_size, 400);
    }

    #[test]
    fn flags_beat_env_beats_defaults() {
        let env = env_of(&[
            ("BITFACTS_PREFIX", "envp"),
            ("BITFACTS_STORE", ":memory:"),
            ("BITFACTS_BATCH_SIZE", "50"),
            ("BITFACTS_LOG", "debug"),
            ("BITFACTS_SOURCE", "/tmp/nw.sqlite"),
        ]);
        let args = GlobalArgs {
            prefix: Some("flagp".into()),
            ..Default::default()
        };
        let s = Settings::resolve_with(&args, env).unwrap();
        assert_eq!(s.prefix, "flagp");
        assert_eq!(s.store, ":memory:");
        assert_eq!(s.batch_size, 50);
        assert_eq!(s.log_level, tracing::Level::DEBUG);
        assert_eq!(s.source, Some(PathBuf::from("/tmp/nw.sqlite")));
    }

    #[test]
    fn bad_values_are_rejected() {
        let bad_batch = env_of(&[("BITFACTS_BATCH_SIZE", "lots")]);
        assert!(Settings::resolve_with(&GlobalArgs::default(), bad_batch).is_err());

        let zero = GlobalArgs {
            max_scan_keys: Some(0),
            ..Default::default()
        };
        assert!(Settings::resolve_with(&zero, env_of(&[])).is_err());

        let level = GlobalArgs {
            log_level: Some("chatty".into()),
            ..Default::default()
        };
        assert!(Settings::resolve_with(&level, env_of(&[])).is_err());
    }

    #[test]
    fn blank_env_is_ignored_and_prefix_is_validated() {
        let s = Settings::resolve_with(&GlobalArgs::default(), env_of(&[("BITFACTS_PREFIX", "  ")]))
            .unwrap();
        assert_eq!(s.prefix, "er");

        let args = GlobalArgs {
            prefix: Some("::".into()),
            ..Default::default()
        };
        let s = Settings::resolve_with(&args, env_of(&[])).unwrap();
        assert!(s.keyspace().is_err());
        assert!(s.open_source().is_err());
    }
}
