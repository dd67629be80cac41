//! Emits random bid events as NDJSON on stdout, one line per event.
//!
//! Pipe the output into `bidpipe` to drive the pipeline locally:
//!
//! ```text
//! bid-generator | bidpipe
//! ```
//!
//! Tuning is done through the environment:
//! - `BIDGEN_COUNT`: number of events (default 100)
//! - `BIDGEN_CAMPAIGNS`: campaigns `campaign-1..=campaign-K` (default 10)
//! - `BIDGEN_MAX_DELAY_MS`: upper bound of the random pause between events (default 10000)
//! - `BIDGEN_SEED`: fixed RNG seed for reproducible runs

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bidpipe_core::BidEvent;

const PLATFORMS: [&str; 4] = ["google", "meta", "tiktok", "twitter"];

#[derive(Debug)]
struct GeneratorConfig {
    count: u64,
    campaigns: u32,
    max_delay: Duration,
    seed: Option<u64>,
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

impl GeneratorConfig {
    fn from_env() -> Result<Self> {
        let campaigns: u32 = env_or("BIDGEN_CAMPAIGNS", 10)?;
        if campaigns == 0 {
            bail!("BIDGEN_CAMPAIGNS must be at least 1");
        }
        let seed = match std::env::var("BIDGEN_SEED") {
            Ok(raw) => Some(raw.trim().parse().context("invalid BIDGEN_SEED")?),
            Err(_) => None,
        };

        Ok(Self {
            count: env_or("BIDGEN_COUNT", 100)?,
            campaigns,
            max_delay: Duration::from_millis(env_or("BIDGEN_MAX_DELAY_MS", 10_000)?),
            seed,
        })
    }
}

fn random_bid(rng: &mut StdRng, campaigns: u32) -> BidEvent {
    let platform = PLATFORMS[rng.gen_range(0..PLATFORMS.len())];
    BidEvent {
        campaign_id: format!("campaign-{}", rng.gen_range(1..=campaigns)),
        platform: platform.to_string(),
        current_cpc: rng.gen::<f64>() * 10.0,
        current_cvr: rng.gen::<f64>(),
        observed_at: Utc::now(),
    }
}

#[tokio::main]
async fn main() {
    // stdout carries the events, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = GeneratorConfig::from_env()?;
    info!(?config, "Generating bid events");

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut stdout = std::io::stdout().lock();
    for sent in 1..=config.count {
        let event = random_bid(&mut rng, config.campaigns);
        let line = serde_json::to_string(&event).context("Failed to encode bid event")?;
        writeln!(stdout, "{}", line).context("Failed to write to stdout")?;
        stdout.flush().context("Failed to flush stdout")?;

        if sent < config.count && !config.max_delay.is_zero() {
            let pause = rng.gen_range(Duration::ZERO..=config.max_delay);
            tokio::time::sleep(pause).await;
        }
    }

    info!(count = config.count, "Done");
    Ok(())
}
