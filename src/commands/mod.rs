// Command handlers, one per CLI verb. Each handler loads the config,
// talks to the APIserver at most once, then saves the config or prints.

pub mod apiserver;
pub mod bhosts;
pub mod bjobs;
pub mod config;
pub mod xsub;

use crate::api::ApiClient;
use crate::cli::{ApiserverCommand, Cli, Commands, ConfigCommand};
use crate::config::{Config, ConfigManager};
use anyhow::Result;
use std::path::Path;

/// Dispatch a parsed command line.
pub fn execute(cli: Cli, cm: &mut ConfigManager) -> Result<()> {
    match cli.command {
        Commands::Apiserver(ApiserverCommand::Logon(args)) => apiserver::logon(cm, args),
        Commands::Apiserver(ApiserverCommand::Logout(args)) => apiserver::logout(cm, args),
        Commands::Apiserver(ApiserverCommand::List) => apiserver::list(cm),
        Commands::Config(ConfigCommand::Set(args)) => config::set(cm, args),
        Commands::Bhosts(args) => bhosts::run(cm, args),
        Commands::Bjobs(args) => bjobs::run(cm, args),
        Commands::Xsub(args) => xsub::run(cm, args),
    }
}

/// Build a client for `url`, trusting the configured CA file if any.
pub(crate) fn client_for(cfg: &Config, url: &str) -> Result<ApiClient> {
    let ca_cert = (!cfg.ca_cert.is_empty()).then(|| Path::new(&cfg.ca_cert));
    Ok(ApiClient::new(url, ca_cert)?)
}
