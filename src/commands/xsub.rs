// `xsub`: submit a job to the default APIserver.

use super::client_for;
use crate::api::JobSubmitRequest;
use crate::cli::XsubArgs;
use crate::config::ConfigManager;
use crate::ui;
use anyhow::{bail, Context, Result};

/// `xsub`
pub fn run(cm: &mut ConfigManager, args: XsubArgs) -> Result<()> {
    let req = submit_request(&args)?;

    let cfg = cm.get_config()?;
    let server = cfg.default_server()?;
    let client = client_for(cfg, &server.url)?;
    let submitted = ui::with_spinner("Submitting job...", || client.submit_job(&server.token, &req))
        .context("job submission failed")?;

    ui::success(&format!("Job <{}> submitted", submitted.job_id));
    if !submitted.message.is_empty() {
        println!("{}", submitted.message);
    }
    Ok(())
}

/// `-c` wins over the trailing words; one of them must be present.
pub fn submit_request(args: &XsubArgs) -> Result<JobSubmitRequest> {
    let command = match &args.command {
        Some(c) if !c.trim().is_empty() => c.clone(),
        _ if !args.args.is_empty() => args.args.join(" "),
        _ => bail!("no command given, pass it after the options or with -c"),
    };
    Ok(JobSubmitRequest {
        queue: args.queue.clone().unwrap_or_default(),
        resreq: args.resreq.clone().unwrap_or_default(),
        command,
    })
}
