use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::config::Config;
use crate::model::market::MarketState;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayArgs {
    /// Config file; falls back to `Config::load()` resolution when absent.
    pub config: Option<PathBuf>,
    pub input: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Replay(ReplayArgs),
    Help,
}

pub fn parse_args(args: &[String]) -> Result<Command> {
    let mut config = None;
    let mut input = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let v = iter
                    .next()
                    .ok_or_else(|| anyhow!("`--config` requires a path"))?;
                config = Some(PathBuf::from(v));
            }
            "--input" | "-i" => {
                let v = iter
                    .next()
                    .ok_or_else(|| anyhow!("`--input` requires a path"))?;
                input = Some(PathBuf::from(v));
            }
            "help" | "--help" | "-h" => return Ok(Command::Help),
            other => bail!("unknown argument `{}`", other),
        }
    }
    let input = input.ok_or_else(|| anyhow!("`--input <json>` is required"))?;
    Ok(Command::Replay(ReplayArgs { config, input }))
}

pub fn load_config(args: &ReplayArgs) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Read a JSON array of market states.
pub fn load_market_states(path: &Path) -> Result<Vec<MarketState>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let states: Vec<MarketState> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid market states in {}", path.display()))?;
    Ok(states)
}

/// Run the pipeline over `states`, writing one JSON line per record.
pub fn replay<W: Write>(config: Config, states: &[MarketState], out: &mut W) -> Result<usize> {
    let mut pipeline = Pipeline::new(config)?;
    tracing::info!(
        dates = states.len(),
        assets = pipeline.universe().len(),
        "Starting regime replay"
    );
    for state in states {
        let record = pipeline
            .step(state)
            .with_context(|| format!("pipeline failed on {}", state.date))?;
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(states.len())
}

pub fn print_usage() {
    println!("usage: regime-replay --input <states.json> [--config <config.toml>]");
    println!();
    println!("Reads a JSON array of market states and prints one JSON record per date.");
    println!("Without --config, $MACRO_REGIME_CONFIG or config/default.toml is used.");
}
