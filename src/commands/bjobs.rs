// `bjobs`: query jobs, filtered by user and queue, and print a table.

use super::client_for;
use crate::api::{Job, QueryParams};
use crate::cli::BjobsArgs;
use crate::config::{Config, ConfigManager};
use crate::ui::{self, Table};
use anyhow::{Context, Result};

/// `-u` value that disables the user filter.
const ALL_USERS: &str = "all";

/// `bjobs`
pub fn run(cm: &mut ConfigManager, args: BjobsArgs) -> Result<()> {
    let cfg = cm.get_config()?;
    let server = cfg.default_server()?;
    let user = effective_user(cfg, args.user.as_deref());
    let params = job_query(user.as_deref(), args.queue.as_deref(), args.fields.as_deref());

    let client = client_for(cfg, &server.url)?;
    let jobs = ui::with_spinner("Querying jobs...", || client.get_jobs(&server.token, &params))
        .context("job query failed")?;

    if jobs.items.is_empty() {
        println!("No jobs found");
        return Ok(());
    }
    jobs_table(&jobs.items).print();
    Ok(())
}

/// The user to filter on: `-u` if given (`all` meaning nobody), otherwise
/// the logged-on account unless `defaultqueryall` is set.
pub fn effective_user(cfg: &Config, user: Option<&str>) -> Option<String> {
    match user {
        Some(ALL_USERS) => None,
        Some(u) if !u.is_empty() => Some(u.to_string()),
        _ if !cfg.default_query_all && !cfg.account.is_empty() => Some(cfg.account.clone()),
        _ => None,
    }
}

/// Build `filter=[user:eq:U,queue:eq:Q]` and `fields=...` parameters.
pub fn job_query(user: Option<&str>, queue: Option<&str>, fields: Option<&str>) -> QueryParams {
    let mut filters = Vec::new();
    if let Some(user) = user.filter(|u| !u.is_empty()) {
        filters.push(format!("user:eq:{}", user));
    }
    if let Some(queue) = queue.filter(|q| !q.is_empty()) {
        filters.push(format!("queue:eq:{}", queue));
    }

    let mut params = QueryParams::new();
    if !filters.is_empty() {
        params.insert("filter".to_string(), format!("[{}]", filters.join(",")));
    }
    if let Some(fields) = fields.filter(|f| !f.is_empty()) {
        params.insert("fields".to_string(), fields.to_string());
    }
    params
}

pub fn jobs_table(jobs: &[Job]) -> Table {
    let mut table = Table::new(&["JOBID", "USER", "STATUS", "QUEUE", "COMMAND"]);
    for job in jobs {
        table.add_row(vec![
            job.job_id.to_string(),
            job.user.clone(),
            job.status.clone(),
            job.queue.clone(),
            job.command.clone(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_and_queue_filter() {
        let params = job_query(Some("alice"), Some("q1"), None);
        assert_eq!(params.get("filter").unwrap(), "[user:eq:alice,queue:eq:q1]");
        assert!(!params.contains_key("fields"));
    }

    #[test]
    fn test_queue_only_and_fields() {
        let params = job_query(None, Some("q1"), Some("jobid,status"));
        assert_eq!(params.get("filter").unwrap(), "[queue:eq:q1]");
        assert_eq!(params.get("fields").unwrap(), "jobid,status");
    }

    #[test]
    fn test_no_filters() {
        assert!(job_query(None, None, None).is_empty());
    }

    #[test]
    fn test_effective_user() {
        let mut cfg = Config {
            account: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(effective_user(&cfg, None).as_deref(), Some("alice"));
        assert_eq!(effective_user(&cfg, Some("bob")).as_deref(), Some("bob"));
        assert_eq!(effective_user(&cfg, Some("all")), None);

        cfg.default_query_all = true;
        assert_eq!(effective_user(&cfg, None), None);
        assert_eq!(effective_user(&cfg, Some("bob")).as_deref(), Some("bob"));
    }
}
