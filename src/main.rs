//! LFU Cache - line-oriented command driver
//!
//! Reads commands from stdin and runs them against a single cache instance:
//!
//! ```text
//! SET <key> <value>
//! SETEX <key> <seconds> <value>
//! GET <key>
//! DEL <key>
//! LEN
//! STATS
//! QUIT
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lfu_cache::{CacheConfig, LfuCache};

/// Parsed driver command.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Set { key: String, value: String },
    Setex { key: String, ttl: Duration, value: String },
    Get { key: String },
    Del { key: String },
    Len,
    Stats,
    Quit,
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default().to_ascii_uppercase();
    let rest = parts.next().unwrap_or_default().trim();

    let key_and_rest = |rest: &str| -> std::result::Result<(String, String), String> {
        let mut split = rest.splitn(2, char::is_whitespace);
        let key = split.next().filter(|k| !k.is_empty()).ok_or("missing key")?;
        Ok((key.to_string(), split.next().unwrap_or_default().trim().to_string()))
    };

    match verb.as_str() {
        "SET" => {
            let (key, value) = key_and_rest(rest)?;
            Ok(Command::Set { key, value })
        }
        "SETEX" => {
            let (key, rest) = key_and_rest(rest)?;
            let (seconds, value) = key_and_rest(&rest).map_err(|_| "missing seconds")?;
            let seconds: u64 = seconds
                .parse()
                .map_err(|_| format!("invalid seconds: {seconds}"))?;
            Ok(Command::Setex {
                key,
                ttl: Duration::from_secs(seconds),
                value,
            })
        }
        "GET" => Ok(Command::Get {
            key: key_and_rest(rest)?.0,
        }),
        "DEL" => Ok(Command::Del {
            key: key_and_rest(rest)?.0,
        }),
        "LEN" => Ok(Command::Len),
        "STATS" => Ok(Command::Stats),
        "QUIT" | "EXIT" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other}")),
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only command replies
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lfu_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = CacheConfig::from_env();
    info!(
        "Configuration loaded: capacity_limit={}, base_duration={}s, decay_tiers={}",
        config.capacity_limit,
        config.base_duration.as_secs(),
        config.effective_decay_tier_count()
    );

    let cache = LfuCache::new(config).context("failed to create cache")?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => run(&cache, command)?,
            Err(message) => format!("ERR {message}"),
        };
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }

    info!("Command driver finished");
    Ok(())
}

fn run(cache: &LfuCache, command: Command) -> Result<String> {
    let reply = match command {
        Command::Set { key, value } => {
            cache.set(key, value)?;
            "OK".to_string()
        }
        Command::Setex { key, ttl, value } => {
            cache.setex(key, value, ttl)?;
            "OK".to_string()
        }
        Command::Get { key } => cache
            .get::<String>(key)?
            .unwrap_or_else(|| "(nil)".to_string()),
        Command::Del { key } => u8::from(cache.delete(key)?).to_string(),
        Command::Len => cache.len()?.to_string(),
        Command::Stats => serde_json::to_string(&cache.stats()?)?,
        Command::Quit => String::new(),
    };
    Ok(reply)
}
