// Library root
// -----------
// This crate exposes the pieces of the `xce` command-line client. The
// binary (`main.rs`) parses arguments and hands them to `commands`.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the APIserver REST endpoints and the
//   typed `{code, msg, data, count}` envelope.
// - `config`: the `~/.cli/config.json` store (servers, tokens, defaults).
// - `cert`: captures the server certificate at logon.
// - `commands`: one handler per CLI verb.
// - `ui`: spinner, password prompt, status lines and text tables.
pub mod api;
pub mod cert;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod ui;
