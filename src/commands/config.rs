// `config set`: change client settings stored in the config file.

use crate::cli::SetArgs;
use crate::config::{parse_yes_no, Config, ConfigManager};
use crate::ui;
use anyhow::{bail, Context, Result};

/// `config set`
pub fn set(cm: &mut ConfigManager, args: SetArgs) -> Result<()> {
    let cfg = cm.get_config()?;
    apply(cfg, &args)?;
    cm.save()?;
    ui::success("Config updated");
    Ok(())
}

/// Validate and apply every flag that was given. Nothing is changed if
/// any flag is invalid.
pub fn apply(cfg: &mut Config, args: &SetArgs) -> Result<()> {
    if args.default_api_server.is_none() && args.default_query_all.is_none() && args.ca_cert.is_none() {
        bail!("nothing to set, pass --defaultapiserver, --defaultqueryall or --cacert");
    }

    let mut updated = cfg.clone();
    if let Some(url) = &args.default_api_server {
        updated.set_default_server(url)?;
    }
    if let Some(answer) = &args.default_query_all {
        updated.default_query_all = parse_yes_no(answer).context("invalid --defaultqueryall")?;
    }
    if let Some(path) = &args.ca_cert {
        if !path.is_file() {
            bail!("certificate file does not exist: {}", path.display());
        }
        updated.ca_cert = path.display().to_string();
    }

    *cfg = updated;
    Ok(())
}
