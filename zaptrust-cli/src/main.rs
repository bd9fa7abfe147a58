//! zaptrust - command-line front end for the trust verification engine
//!
//! Verifies and ingests zap receipt files against an in-memory store, issues
//! and decodes session tokens, and evaluates payout splits and ranking scores.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use zaptrust_engine::{
    config::IngestionConfig,
    ingestion::ZapIngestionPipeline,
    models::{RankingInput, SignedEvent, TrustSignals, ZapTarget},
    payout::PayoutSplitter,
    ranking::RankingEngine,
    session::SessionTokenCodec,
    store::MemoryZapStore,
    EngineConfig, TrustNode,
};

/// zaptrust - zap receipt verification and settlement
#[derive(Parser, Debug)]
#[command(name = "zaptrust")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON); ZAPTRUST__* env vars override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a zap receipt's id, signature and structure without storing it
    Verify {
        /// Path to the signed event JSON
        event: PathBuf,
    },

    /// Ingest a zap receipt into a fresh in-memory store
    Ingest {
        /// Path to the signed event JSON
        event: PathBuf,

        /// Targets to register first, as KIND:UUID (review, game or comment)
        #[arg(short, long = "target", value_parser = parse_target)]
        targets: Vec<ZapTarget>,

        /// Age of registered content in days
        #[arg(long, default_value = "0")]
        age_days: i64,

        /// Mark registered targets as backed by a verified transaction
        #[arg(long)]
        verified: bool,

        /// Mark registered targets as identity attested
        #[arg(long)]
        attested: bool,
    },

    /// Issue a session token
    IssueToken {
        /// Subject the token is issued for
        subject: String,

        /// Lifetime in seconds; defaults to session.default_ttl_seconds
        #[arg(long)]
        ttl: Option<i64>,
    },

    /// Verify a session token and print its claims
    DecodeToken {
        token: String,
    },

    /// Split a purchase total between developer and platform
    Split {
        /// Total in millisatoshis
        #[arg(allow_hyphen_values = true)]
        total: i64,
    },

    /// Compute a ranking score
    Score {
        /// Verified value total in millisatoshis
        #[arg(long)]
        value: u64,

        #[arg(long, default_value = "0")]
        age_days: i64,

        #[arg(long)]
        verified: bool,

        #[arg(long)]
        attested: bool,

        #[arg(long)]
        flagged: bool,
    },
}

fn parse_target(raw: &str) -> Result<ZapTarget, String> {
    let (kind, id) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected KIND:UUID, got '{}'", raw))?;
    let id = Uuid::parse_str(id).map_err(|e| format!("invalid target id '{}': {}", id, e))?;

    match kind.to_ascii_lowercase().as_str() {
        "review" => Ok(ZapTarget::Review(id)),
        "game" => Ok(ZapTarget::Game(id)),
        "comment" => Ok(ZapTarget::Comment(id)),
        other => Err(format!("unknown target kind '{}'", other)),
    }
}

fn read_event(path: &Path) -> Result<SignedEvent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse event JSON in {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let path = path.map(|p| p.to_string_lossy().into_owned());
    EngineConfig::load(path.as_deref()).context("Failed to load configuration")
}

/// Only the ingestion section; verification never needs the session secret
fn load_ingestion_config(path: Option<&Path>) -> Result<IngestionConfig> {
    let path = path.map(|p| p.to_string_lossy().into_owned());
    let config =
        EngineConfig::load_unvalidated(path.as_deref()).context("Failed to load configuration")?;
    config
        .ingestion
        .validate()
        .context("Invalid ingestion configuration")?;
    Ok(config.ingestion)
}

/// Creation time of content that is `age_days` old at `now`
fn content_created_at(now: DateTime<Utc>, age_days: i64) -> Result<DateTime<Utc>> {
    TimeDelta::try_days(age_days)
        .and_then(|age| now.checked_sub_signed(age))
        .with_context(|| format!("--age-days {} is out of range", age_days))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("zaptrust_engine={0},zaptrust={0}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Verify { event } => {
            let ingestion = load_ingestion_config(cli.config.as_deref())?;
            let event = read_event(&event)?;
            let pipeline =
                ZapIngestionPipeline::new(&ingestion, std::sync::Arc::new(MemoryZapStore::new()));
            let details = pipeline.verify(&event)?;

            print_json(&serde_json::json!({
                "event_id": event.id,
                "recipient_pubkey": details.recipient_pubkey,
                "sender_pubkey": details.sender_pubkey,
                "amount": details.amount,
                "bolt11": details.bolt11,
            }))?;
        }
        Commands::Ingest {
            event,
            targets,
            age_days,
            verified,
            attested,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let event = read_event(&event)?;
            let node = TrustNode::new(config, std::sync::Arc::new(MemoryZapStore::new())).await?;

            let created_at = content_created_at(Utc::now(), age_days.max(0))?;
            let signals = TrustSignals {
                verified_transaction: verified,
                identity_attested: attested,
                flagged_suspicious: false,
            };
            for target in targets {
                node.register_target(target, None, created_at, signals).await?;
            }

            let outcome = node.ingest_zap(&event).await?;
            info!(event_id = %outcome.receipt.source_event_id, "Ingestion complete");
            print_json(&outcome)?;
        }
        Commands::IssueToken { subject, ttl } => {
            let config = load_config(cli.config.as_deref())?;
            let ttl = ttl.unwrap_or(config.session.default_ttl_seconds);
            let token = SessionTokenCodec::new().create(&subject, config.session.secret()?, ttl)?;
            println!("{}", token);
        }
        Commands::DecodeToken { token } => {
            let config = load_config(cli.config.as_deref())?;
            let claims = SessionTokenCodec::new().decode(&token, config.session.secret()?)?;
            print_json(&claims)?;
        }
        Commands::Split { total } => {
            print_json(&PayoutSplitter::new().split(total))?;
        }
        Commands::Score {
            value,
            age_days,
            verified,
            attested,
            flagged,
        } => {
            let now = Utc::now();
            let score = RankingEngine::new().score(&RankingInput {
                value_total: value,
                verified_transaction: verified,
                identity_attested: attested,
                flagged_suspicious: flagged,
                content_created_at: content_created_at(now, age_days)?,
                reference_time: Some(now),
            });
            println!("{:.6}", score.value());
        }
    }

    Ok(())
}
