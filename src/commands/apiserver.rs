// APIserver session commands: logon, logout and the list of servers the
// user is logged on to.

use super::client_for;
use crate::api::ApiClient;
use crate::cert;
use crate::cli::{LogonArgs, LogoutArgs};
use crate::config::{is_valid_url, Config, ConfigManager};
use crate::ui::{self, Table};
use anyhow::{bail, Context, Result};

/// `apiserver logon`: authenticate, capture the server certificate and
/// store the session in the config.
pub fn logon(cm: &mut ConfigManager, args: LogonArgs) -> Result<()> {
    if !is_valid_url(&args.url) {
        bail!("invalid APIserver URL: {}", args.url);
    }
    let password = match args.password {
        Some(p) => p,
        None => ui::prompt_password("Password")?,
    };

    let config_dir = cm.dir().to_path_buf();
    let cfg = cm.get_config()?;

    // The certificate stays staged until the server accepts the
    // credentials; a failed logon leaves any earlier server.crt in place.
    let captured = ui::with_spinner("Fetching server certificate...", || {
        cert::capture(&args.url, &config_dir)
    })
    .context("failed to capture server certificate")?;
    let client = match &captured {
        Some(staged) => ApiClient::new(&args.url, Some(staged.staged_path()))?,
        None => client_for(cfg, &args.url)?,
    };

    let data = ui::with_spinner("Logging on...", || client.logon(&args.username, &password))
        .context("logon failed")?;
    if data.token.is_empty() {
        bail!("logon failed: server returned no token");
    }

    if let Some(staged) = captured {
        let path = staged.commit()?;
        cfg.ca_cert = path.display().to_string();
        println!("Certificate saved to {}", path.display());
    }
    cfg.record_logon(&args.url, &args.username, &data);
    log::info!("logged on to {} as {}", args.url, args.username);
    cm.save()?;

    ui::success(&format!("Logged on to {} as {}", args.url, args.username));
    Ok(())
}

/// `apiserver logout`: drop the local token and, if there was one,
/// invalidate it on the server. The config is only saved when the server
/// call succeeds.
pub fn logout(cm: &mut ConfigManager, args: LogoutArgs) -> Result<()> {
    let cfg = cm.get_config()?;
    let token = cfg.clear_token(&args.url)?;

    if token.is_empty() {
        ui::notice(&format!("{} was not logged on", args.url));
    } else {
        let client = client_for(cfg, &args.url)?;
        ui::with_spinner("Logging out...", || client.logout(&token)).context("logout failed")?;
    }
    cm.save()?;

    ui::success(&format!("Logged out of {}", args.url));
    Ok(())
}

/// `apiserver list`
pub fn list(cm: &mut ConfigManager) -> Result<()> {
    let cfg = cm.get_config()?;
    servers_table(cfg).print();
    Ok(())
}

/// Logged-on servers, with `*` in front of the default one.
pub fn servers_table(cfg: &Config) -> Table {
    let mut table = Table::new(&["Default", "Name", "Version", "URL"]);
    for server in cfg.servers.iter().filter(|s| s.is_logged_on()) {
        let marker = if server.url == cfg.default_api_server { "*" } else { " " };
        table.add_row(vec![
            marker.to_string(),
            server.name.clone(),
            server.version.clone(),
            server.url.clone(),
        ]);
    }
    table
}
