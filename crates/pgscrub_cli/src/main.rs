//! pgscrub: rewrite sensitive columns of a plain-text PostgreSQL dump.
//!
//! Reads the dump from a file or stdin and writes the sanitized dump to stdout
//! or a file. Logs go to stderr (`RUST_LOG`, default `info`).

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use pgscrub_core::{generator_for, load_policies, sanitize_dump, PersistenceMemo, Strategy};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Policy document (JSON) describing which columns to rewrite
    #[arg(short, long)]
    config: PathBuf,

    /// Overrides the strategy named in the policy document
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Write the sanitized dump here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Dump to read; stdin when absent or "-"
    input: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyArg {
    Random,
    KeyedHash,
}

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::Random => Strategy::Random,
            StrategyArg::KeyedHash => Strategy::KeyedHash,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let policies = load_policies(&args.config).context("Failed to load policies")?;
    let strategy = args.strategy.map(Strategy::from).unwrap_or(policies.strategy);
    let generator = generator_for(strategy).context("Failed to set up value generator")?;
    let mut memo = PersistenceMemo::new();

    let reader: Box<dyn Read> = match args.input.as_deref() {
        Some(p) if p.as_os_str() != "-" => {
            info!("Reading dump from {}", p.display());
            Box::new(File::open(p).with_context(|| format!("Failed to open {}", p.display()))?)
        }
        _ => Box::new(io::stdin().lock()),
    };
    let writer: Box<dyn Write> = match &args.output {
        Some(p) => Box::new(File::create(p).with_context(|| format!("Failed to create {}", p.display()))?),
        None => Box::new(io::stdout().lock()),
    };

    let stats = sanitize_dump(&policies, &*generator, &mut memo, BufReader::new(reader), writer)
        .context("Sanitization aborted")?;

    info!(
        "{} lines, {} COPY blocks, {} rows ({} rewritten, {} ignored), {} fields replaced, {} persisted values",
        stats.lines,
        stats.blocks,
        stats.rows_seen,
        stats.rows_rewritten,
        stats.rows_ignored,
        stats.fields_replaced,
        memo.len()
    );
    Ok(())
}
