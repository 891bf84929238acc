//! CLI for guchaos — give us chaos: refill /dev/random from random.org.

mod commands;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use commands::fetch::FetchArgs;
use commands::run::RunArgs;
use commands::status::StatusArgs;

#[derive(Parser)]
#[command(name = "guchaos")]
#[command(about = "guchaos — feed the kernel entropy pool with random.org integers until it is full")]
#[command(version = guchaos_core::VERSION)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Log more: -v for info, -vv for debug (RUST_LOG overrides)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Options for the default `run` behaviour when no subcommand is given
    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, transform and inject until the pool is full (default). Needs root.
    Run(RunArgs),

    /// Show available entropy against the pool size
    Status(StatusArgs),

    /// Fetch and transform one batch, print it, and leave the device alone
    Fetch(FetchArgs),
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Some(Commands::Run(args)) => commands::run::run(&args),
        Some(Commands::Status(args)) => commands::status::run(&args),
        Some(Commands::Fetch(args)) => commands::fetch::run(&args),
        None => commands::run::run(&cli.run),
    };
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_invocation_runs_with_defaults() {
        let cli = Cli::try_parse_from(["guchaos"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.device, guchaos_core::RANDOM_DEVICE_PATH);
        assert_eq!(cli.run.max_cycles, None);
    }

    #[test]
    fn test_run_subcommand_accepts_bounds() {
        let cli = Cli::try_parse_from([
            "guchaos",
            "run",
            "--max-cycles",
            "5",
            "--timeout-sec",
            "0",
            "--legacy-zero-terminator",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.max_cycles, Some(5));
                assert_eq!(args.source.timeout_sec, 0);
                assert!(args.key.legacy_zero_terminator);
            }
            _ => panic!("expected run subcommand"),
        }
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["guchaos", "status", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
