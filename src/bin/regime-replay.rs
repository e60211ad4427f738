use anyhow::Result;

use macro_regime_alloc::replay::{self, Command};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args = match replay::parse_args(&args)? {
        Command::Help => {
            replay::print_usage();
            return Ok(());
        }
        Command::Replay(args) => args,
    };

    let config = match replay::load_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            std::process::exit(1);
        }
    };

    // Logs go to stderr so stdout stays one JSON record per line.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(config.logging.level.as_str())
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }

    let states = replay::load_market_states(&args.input)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let n = replay::replay(config, &states, &mut out)?;
    tracing::info!(records = n, "Replay finished");
    Ok(())
}
