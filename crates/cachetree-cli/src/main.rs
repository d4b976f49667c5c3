//! cachetree - command shell over an in-memory result cache

mod handler;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use cachetree::{CacheConfig, CacheTree};
use clap::Parser;
use tracing::{info, warn};

use crate::handler::{load_file, CommandHandler, Reply};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Key fields, outermost first
    #[arg(short, long, value_delimiter = ',', required_unless_present = "config")]
    fields: Vec<String>,

    /// Maximum number of cached records (unbounded if omitted)
    #[arg(short, long)]
    capacity: Option<usize>,

    /// JSON config file ({"fields": [...], "capacity": N}); overrides --fields/--capacity
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file with a record or an array of records to load at startup
    #[arg(short, long)]
    load: Vec<PathBuf>,

    /// Command to run instead of reading stdin (repeatable)
    #[arg(short, long)]
    exec: Vec<String>,
}

impl Args {
    fn cache_config(&self) -> Result<CacheConfig> {
        if let Some(path) = &self.config {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            return Ok(CacheConfig::from_json_str(&text)?);
        }

        let config = CacheConfig::new(self.fields.iter().cloned());
        Ok(match self.capacity {
            Some(n) => config.with_capacity(n),
            None => config,
        })
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries replies
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = args.cache_config()?;
    let cache = CacheTree::from_config(&config)?;
    info!("Cache fields: {}", config.fields.join(", "));
    match config.capacity {
        Some(n) => info!("Cache capacity: {} records", n),
        None => info!("Cache capacity: unbounded"),
    }

    for path in &args.load {
        let count = load_file(&cache, path)
            .with_context(|| format!("loading records from {}", path.display()))?;
        info!("Loaded {} records from {}", count, path.display());
    }

    let handler = CommandHandler::new(cache);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.exec.is_empty() {
        for line in &args.exec {
            if let Some(reply) = handler.handle(line) {
                writeln!(out, "{}", reply)?;
            }
        }
        return Ok(());
    }

    for line in io::stdin().lock().lines() {
        let line = line?;
        if let Some(reply) = handler.handle(&line) {
            if let Reply::Error(msg) = &reply {
                warn!("Command failed: {}", msg);
            }
            writeln!(out, "{}", reply)?;
            out.flush()?;
        }
    }

    info!("Input closed, {} records cached", handler.cache().get_size());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_args_fields_and_capacity() {
        let args = Args::parse_from(["cachetree", "--fields", "sex,age", "--capacity", "10"]);
        let config = args.cache_config().unwrap();

        assert_eq!(config, CacheConfig::new(["sex", "age"]).with_capacity(10));
    }

    #[test]
    fn test_args_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"fields": ["year", "location"], "capacity": 3}}"#).unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let args = Args::parse_from(["cachetree", "--config", &path]);
        let config = args.cache_config().unwrap();

        assert_eq!(config.fields, vec!["year", "location"]);
        assert_eq!(config.capacity, Some(3));
    }

    #[test]
    fn test_args_require_fields() {
        assert!(Args::try_parse_from(["cachetree"]).is_err());
    }
}
