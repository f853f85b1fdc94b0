//! End-to-end command tests: a temp config file plus a stub APIserver.
//!
//! Most tests use plain `http://` URLs, so logon skips the certificate
//! capture step. The `https` tests run the stub over TLS.

mod common;

use clap::Parser;
use common::StubServer;
use tempfile::TempDir;
use xce_cli::cert;
use xce_cli::cli::Cli;
use xce_cli::commands;
use xce_cli::config::{Config, ConfigManager};

const LOGON_OK: &str =
    r#"{"code":200,"msg":"ok","data":{"token":"tok-1","path":"/home/alice","jobid_range":"1-99999","cluster_index":"0"}}"#;

fn run(cm: &mut ConfigManager, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["xce"];
    argv.extend_from_slice(args);
    commands::execute(Cli::parse_from(argv), cm)
}

/// Fresh view of what is on disk.
fn reload(dir: &TempDir) -> Config {
    ConfigManager::with_path(dir.path().join("config.json"))
        .get_config()
        .unwrap()
        .clone()
}

fn logged_on(dir: &TempDir, server: &StubServer) -> ConfigManager {
    let mut cm = ConfigManager::with_path(dir.path().join("config.json"));
    run(
        &mut cm,
        &["apiserver", "logon", "-n", "alice", "-p", "secret", "--url", &server.url()],
    )
    .unwrap();
    cm
}

#[test]
fn test_logon_persists_session_and_default() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![(200, LOGON_OK.to_string())]);
    logged_on(&dir, &server);

    let cfg = reload(&dir);
    assert_eq!(cfg.account, "alice");
    assert_eq!(cfg.default_api_server, server.url());
    assert_eq!(cfg.servers.len(), 1);
    let record = &cfg.servers[0];
    assert_eq!(record.name, "apiserver1");
    assert_eq!(record.token, "tok-1");
    assert_eq!(record.path, "/home/alice");
    assert_eq!(record.jobid_range, "1-99999");
    assert!(cfg.ca_cert.is_empty());
}

#[test]
fn test_second_server_keeps_default() {
    let dir = TempDir::new().unwrap();
    let first = StubServer::start(vec![(200, LOGON_OK.to_string())]);
    let second = StubServer::start(vec![(200, LOGON_OK.to_string())]);
    logged_on(&dir, &first);
    logged_on(&dir, &second);

    let cfg = reload(&dir);
    assert_eq!(cfg.servers.len(), 2);
    assert_eq!(cfg.servers[1].name, "apiserver2");
    assert_eq!(cfg.default_api_server, first.url());
}

#[test]
fn test_failed_logon_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![(200, r#"{"code":401,"msg":"bad credentials"}"#.to_string())]);
    let mut cm = ConfigManager::with_path(dir.path().join("config.json"));

    let err = run(
        &mut cm,
        &["apiserver", "logon", "-n", "alice", "-p", "wrong", "--url", &server.url()],
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("bad credentials"));
    assert!(reload(&dir).servers.is_empty());
}

#[test]
fn test_https_logon_saves_server_certificate() {
    let dir = TempDir::new().unwrap();
    let (server, served) = StubServer::start_tls(vec![(200, LOGON_OK.to_string())]);
    logged_on(&dir, &server);

    let cfg = reload(&dir);
    let cert_file = dir.path().join("server.crt");
    assert_eq!(cfg.ca_cert, cert_file.display().to_string());
    assert_eq!(cfg.servers[0].token, "tok-1");
    assert_eq!(std::fs::read_to_string(&cert_file).unwrap(), cert::to_pem(&served));
    assert_eq!(server.requests()[0].target, "/xce/v1/auth/logon");
}

#[test]
fn test_failed_https_logon_keeps_previous_certificate() {
    let dir = TempDir::new().unwrap();
    let cert_file = dir.path().join("server.crt");
    std::fs::write(&cert_file, "previous").unwrap();
    let (server, _) = StubServer::start_tls(vec![(200, r#"{"code":401,"msg":"bad credentials"}"#.to_string())]);
    let mut cm = ConfigManager::with_path(dir.path().join("config.json"));

    let err = run(
        &mut cm,
        &["apiserver", "logon", "-n", "alice", "-p", "wrong", "--url", &server.url()],
    )
    .unwrap_err();
    assert!(format!("{:#}", err).contains("bad credentials"));

    assert_eq!(std::fs::read_to_string(&cert_file).unwrap(), "previous");
    assert!(!dir.path().join("server.crt.tmp").exists());
    assert!(reload(&dir).ca_cert.is_empty());
}

#[test]
fn test_logout_clears_token() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![(200, LOGON_OK.to_string()), (200, r#"{"code":200}"#.to_string())]);
    let mut cm = logged_on(&dir, &server);

    run(&mut cm, &["apiserver", "logout", "--url", &server.url()]).unwrap();

    let cfg = reload(&dir);
    assert!(cfg.servers[0].token.is_empty());
    let reqs = server.requests();
    assert_eq!(reqs[1].target, "/xce/v1/auth/logout");
    assert_eq!(reqs[1].headers.get("authorization").unwrap(), "Bearer tok-1");
}

#[test]
fn test_failed_remote_logout_keeps_token() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![(200, LOGON_OK.to_string()), (503, "maintenance".to_string())]);
    let mut cm = logged_on(&dir, &server);

    assert!(run(&mut cm, &["apiserver", "logout", "--url", &server.url()]).is_err());
    assert_eq!(reload(&dir).servers[0].token, "tok-1");
}

#[test]
fn test_logout_unknown_server() {
    let dir = TempDir::new().unwrap();
    let mut cm = ConfigManager::with_path(dir.path().join("config.json"));

    let err = run(&mut cm, &["apiserver", "logout", "--url", "http://127.0.0.1:9"]).unwrap_err();
    assert!(err.to_string().contains("unknown APIserver"));
}

#[test]
fn test_bjobs_uses_account_filter_by_default() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![
        (200, LOGON_OK.to_string()),
        (200, r#"{"code":200,"count":0,"data":[]}"#.to_string()),
        (200, r#"{"code":200,"count":0,"data":[]}"#.to_string()),
    ]);
    let mut cm = logged_on(&dir, &server);

    run(&mut cm, &["bjobs", "-q", "q1"]).unwrap();
    run(&mut cm, &["bjobs", "-u", "all", "jobid,status"]).unwrap();

    let reqs = server.requests();
    assert!(reqs[1].target.contains("filter=%5Buser%3Aeq%3Aalice%2Cqueue%3Aeq%3Aq1%5D"), "{}", reqs[1].target);
    assert!(!reqs[2].target.contains("filter="), "{}", reqs[2].target);
    assert!(reqs[2].target.contains("fields=jobid%2Cstatus"), "{}", reqs[2].target);
}

#[test]
fn test_bhosts_sends_type_and_filter() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![
        (200, LOGON_OK.to_string()),
        (
            200,
            r#"{"code":200,"count":1,"data":[{"hostName":"node01","hostType":"ARM","maxMem":1048576}]}"#.to_string(),
        ),
    ]);
    let mut cm = logged_on(&dir, &server);

    run(&mut cm, &["bhosts", "--full", "--host-type", "arm"]).unwrap();

    let target = &server.requests()[1].target;
    assert!(target.contains("type=full"), "{target}");
    assert!(target.contains("filter=hostType%3Aeq%3AARM"), "{target}");
}

#[test]
fn test_listings_without_count_still_print() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![
        (200, LOGON_OK.to_string()),
        (200, r#"{"code":200,"data":[{"hostName":"node01"}]}"#.to_string()),
        (200, r#"{"code":200,"data":[{"jobid":5,"user":"alice","status":"RUN"}]}"#.to_string()),
    ]);
    let mut cm = logged_on(&dir, &server);

    run(&mut cm, &["bhosts"]).unwrap();
    run(&mut cm, &["bjobs", "-u", "all"]).unwrap();

    assert_eq!(server.requests().len(), 3);
}

#[test]
fn test_xsub_submits_trailing_command() {
    let dir = TempDir::new().unwrap();
    let server = StubServer::start(vec![
        (200, LOGON_OK.to_string()),
        (200, r#"{"code":201,"data":{"jobid":77,"message":"queued"}}"#.to_string()),
    ]);
    let mut cm = logged_on(&dir, &server);

    run(&mut cm, &["xsub", "-q", "q1", "-R", "select(!mg)", "sleep", "10"]).unwrap();

    let body = server.requests()[1].json();
    assert_eq!(body["queue"], "q1");
    assert_eq!(body["resreq"], "select(!mg)");
    assert_eq!(body["command"], "sleep 10");
}

#[test]
fn test_queries_require_logon() {
    let dir = TempDir::new().unwrap();
    let mut cm = ConfigManager::with_path(dir.path().join("config.json"));

    let err = run(&mut cm, &["bjobs"]).unwrap_err();
    assert!(err.to_string().contains("no default APIserver"), "{err}");
    assert!(run(&mut cm, &["xsub", "hostname"]).is_err());
}

#[test]
fn test_config_set_switches_default() {
    let dir = TempDir::new().unwrap();
    let first = StubServer::start(vec![(200, LOGON_OK.to_string())]);
    let second = StubServer::start(vec![(200, LOGON_OK.to_string())]);
    logged_on(&dir, &first);
    let mut cm = logged_on(&dir, &second);

    run(
        &mut cm,
        &["config", "set", "--defaultapiserver", &second.url(), "--defaultqueryall", "Y"],
    )
    .unwrap();

    let cfg = reload(&dir);
    assert_eq!(cfg.default_api_server, second.url());
    assert!(cfg.default_query_all);
}
