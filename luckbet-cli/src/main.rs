use crate::run::{run_logged, Target};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

mod run;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Create an uploader account and publish a fresh lucky bet contract 🎲
    #[clap(long, conflicts_with = "cid", required_unless_present = "cid")]
    setup: bool,
    /// Bet against an already published contract
    #[clap(long, value_name = "CONTRACT_ID")]
    cid: Option<String>,
    /// TOML run config. Local test network defaults are used when omitted
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Run against an in-memory mocked chain instead of a node
    #[clap(long)]
    mock: bool,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("CLI Error: {0}")]
    CLI(String),
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let target = if args.mock {
        Target::Mocked
    } else {
        Target::Node
    };
    run_logged(args.setup, args.cid, args.config, target).await
}
