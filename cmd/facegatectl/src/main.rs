//! facegatectl - Operator CLI for the facegate identity registry.
//!
//! Drives enrollment, verification, and audit inspection against a redb
//! database. Embeddings are read from JSON files (a flat array of floats);
//! producing them from camera frames is the job of an external capture
//! pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use facegate_registry::{Config, RedbStore, Registry};

/// Operator CLI for the facegate identity registry.
#[derive(Parser, Debug)]
#[command(name = "facegatectl")]
#[command(about = "Enroll and verify face embeddings against a registry database")]
struct Args {
    /// Path to the registry database
    #[arg(long, default_value = "facegate.redb")]
    db: PathBuf,

    /// Embedding dimension the registry accepts
    #[arg(long, default_value_t = 128)]
    dim: usize,

    /// Match threshold (Euclidean distance)
    #[arg(long, default_value_t = 0.7)]
    threshold: f32,

    /// Disable centroid refinement on verification
    #[arg(long)]
    no_refine: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enroll an embedding under a name
    Enroll {
        /// Given name
        #[arg(long)]
        given: String,

        /// Family name
        #[arg(long)]
        family: String,

        /// JSON file holding the embedding vector
        #[arg(long)]
        embedding: PathBuf,

        /// Thumbnail reference to attach on first enrollment
        #[arg(long)]
        thumbnail: Option<String>,
    },

    /// Verify an embedding against every enrolled identity
    Verify {
        /// JSON file holding the probe vector
        #[arg(long)]
        embedding: PathBuf,
    },

    /// Print the audit trail, newest first
    History {
        /// Only the n most recent events
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Print the number of enrolled identities
    Count,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let store = RedbStore::open(&args.db)
        .with_context(|| format!("open registry database {}", args.db.display()))?;
    let registry = Registry::new(
        Config {
            dim: args.dim,
            threshold: args.threshold,
            refine_on_verify: !args.no_refine,
            ..Config::default()
        },
        Arc::new(store),
    );

    match args.command {
        Command::Enroll {
            given,
            family,
            embedding,
            thumbnail,
        } => {
            let vector = load_embedding(&embedding)?;
            let enrollment = registry.enroll(&given, &family, &vector)?;
            if enrollment.created {
                println!("enrolled {given} {family} as {}", enrollment.identity_id);
                if let Some(thumb) = thumbnail {
                    registry.set_thumbnail(&enrollment.identity_id, &thumb)?;
                }
            } else {
                println!(
                    "{given} {family} already enrolled as {}; embedding folded in",
                    enrollment.identity_id
                );
            }
        }

        Command::Verify { embedding } => {
            let vector = load_embedding(&embedding)?;
            let verification = registry.verify(&vector)?;
            match (&verification.identity_id, verification.distance) {
                (Some(id), Some(distance)) => {
                    let name = verification.given_name.as_deref().unwrap_or(id);
                    println!("match: {name} ({id}), distance {distance:.4}");
                }
                (None, Some(distance)) => {
                    println!("unknown face (nearest distance {distance:.4})");
                }
                _ => println!("unknown face (no identities enrolled)"),
            }
        }

        Command::History { limit } => {
            let events = match limit {
                Some(n) => registry.recent(n)?,
                None => registry.history()?,
            };
            if events.is_empty() {
                println!("no events logged yet");
            }
            for event in events {
                let kind = event.kind.to_string();
                let id = event.identity_id.as_deref().unwrap_or("-");
                println!(
                    "#{:<6} {}  {kind:<14} {id:<10} {}",
                    event.event_id,
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.detail
                );
            }
        }

        Command::Count => {
            println!("{} identities enrolled", registry.identity_count()?);
        }
    }

    Ok(())
}

/// Read an embedding vector from a JSON file (a flat array of floats).
fn load_embedding(path: &Path) -> Result<Vec<f32>> {
    let data = std::fs::read(path)
        .with_context(|| format!("read embedding file {}", path.display()))?;
    let vector: Vec<f32> = serde_json::from_slice(&data)
        .with_context(|| format!("parse embedding file {}", path.display()))?;
    Ok(vector)
}
