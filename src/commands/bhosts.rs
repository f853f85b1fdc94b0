// `bhosts`: query cluster hosts and print them as a table.

use super::client_for;
use crate::api::{Host, QueryParams};
use crate::cli::BhostsArgs;
use crate::config::ConfigManager;
use crate::ui::{self, Table};
use anyhow::{bail, Context, Result};

const HOST_TYPES: [&str; 2] = ["X86_64", "ARM"];

/// `bhosts`
pub fn run(cm: &mut ConfigManager, args: BhostsArgs) -> Result<()> {
    let info_type = if args.full { "full" } else { args.info_type.as_str() };
    let params = host_query(info_type, args.host_type.as_deref())?;
    let full = params.get("type").map(String::as_str) == Some("full");

    let cfg = cm.get_config()?;
    let server = cfg.default_server()?;
    let client = client_for(cfg, &server.url)?;
    let hosts = ui::with_spinner("Querying hosts...", || client.get_hosts(&server.token, &params))
        .context("host query failed")?;

    if hosts.items.is_empty() {
        println!("No hosts found");
        return Ok(());
    }
    hosts_table(&hosts.items, full).print();
    Ok(())
}

/// Query parameters for `GET /hosts`. Both values are case-insensitive.
pub fn host_query(info_type: &str, host_type: Option<&str>) -> Result<QueryParams> {
    let info_type = info_type.to_lowercase();
    if info_type != "basic" && info_type != "full" {
        bail!("invalid info type {:?}, expected basic or full", info_type);
    }

    let mut params = QueryParams::new();
    params.insert("type".to_string(), info_type);

    if let Some(host_type) = host_type.filter(|t| !t.is_empty()) {
        let host_type = host_type.to_uppercase();
        if !HOST_TYPES.contains(&host_type.as_str()) {
            bail!("invalid host type {:?}, expected X86_64 or ARM", host_type);
        }
        params.insert("filter".to_string(), format!("hostType:eq:{}", host_type));
    }
    Ok(params)
}

/// Memory figures arrive in KB.
fn mb(kb: i64) -> String {
    (kb / 1024).to_string()
}

fn join_floats(values: &[f64]) -> String {
    values.iter().map(|v| format!("{:.2}", v)).collect::<Vec<_>>().join(", ")
}

pub fn hosts_table(hosts: &[Host], full: bool) -> Table {
    if !full {
        let mut table = Table::new(&[
            "HOST_NAME", "TYPE", "MODEL", "CPU_FACTOR", "MAX_CPUS", "MAX_MEM(MB)", "MAX_SWAP(MB)", "CORES",
            "IS_SERVER",
        ]);
        for h in hosts {
            table.add_row(vec![
                h.host_name.clone(),
                h.host_type.clone(),
                h.host_model.clone(),
                format!("{:.2}", h.cpu_factor),
                h.max_cpus.to_string(),
                mb(h.max_mem),
                mb(h.max_swap),
                h.cores.to_string(),
                h.is_server.to_string(),
            ]);
        }
        return table;
    }

    let mut table = Table::new(&[
        "HOST_NAME", "TYPE", "MODEL", "CPU_FACTOR", "MAX_CPUS", "MAX_MEM(MB)", "MAX_SWAP(MB)", "MAX_TMP(MB)",
        "N_DISKS", "N_RES", "RESOURCES", "N_DRES", "D_RESOURCES", "WINDOWS", "NUM_INDX", "BUSY_THRESHOLD",
        "IS_SERVER", "CORES", "HOST_ADDR", "PPROCS", "CORES_PER_PROC", "THREADS_PER_CORE",
    ]);
    for h in hosts {
        table.add_row(vec![
            h.host_name.clone(),
            h.host_type.clone(),
            h.host_model.clone(),
            format!("{:.2}", h.cpu_factor),
            h.max_cpus.to_string(),
            mb(h.max_mem),
            mb(h.max_swap),
            mb(h.max_tmp),
            h.n_disks.to_string(),
            h.n_res.to_string(),
            h.resources.join(" "),
            h.n_d_res.to_string(),
            h.d_resources.join(" "),
            h.windows.clone(),
            h.num_indx.to_string(),
            join_floats(&h.busy_threshold),
            h.is_server.to_string(),
            h.cores.to_string(),
            h.host_addr.clone(),
            h.pprocs.to_string(),
            h.cores_per_proc.to_string(),
            h.threads_per_core.to_string(),
        ]);
    }
    table
}
