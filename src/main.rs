// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, set up logging, load the config
//   and hand everything to the command dispatcher.
// - Errors are printed with their full context chain and exit code 1.

use clap::Parser;
use std::process::ExitCode;
use xce_cli::{cli::Cli, commands, config::ConfigManager};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cm = ConfigManager::from_env()?;
    // Load up front so a broken config file fails before any network call.
    cm.get_config()?;
    commands::execute(cli, &mut cm)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
