use anyhow::Result;
use clap::Parser;
use env_logger::Env;

use csvmap::cli::{self, Args, CliConfig};

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let outcome = CliConfig::from_args(args)
        .and_then(|config| cli::run(&config).map(|stats| (config, stats)));

    match outcome {
        Ok((config, stats)) => {
            if config.want_stats() && !config.is_quiet() {
                cli::output_statistics(&stats);
            }
            log::debug!("{}", stats.summary());
            Ok(())
        }
        Err(error) => {
            cli::handle_error(&error);
            std::process::exit(1);
        }
    }
}
