// Command-line definitions. Parsing only; behavior lives in `commands`.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "xce", version)]
#[command(about = "Command-line client for the XCE APIserver")]
pub struct Cli {
    /// Log more (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log on to, log out of and list APIservers
    #[command(subcommand)]
    Apiserver(ApiserverCommand),
    /// Manage the local config file
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Query hosts on the default APIserver
    Bhosts(BhostsArgs),
    /// Query jobs on the default APIserver
    Bjobs(BjobsArgs),
    /// Submit a job to the default APIserver
    Xsub(XsubArgs),
}

#[derive(Subcommand, Debug)]
pub enum ApiserverCommand {
    /// Log on to an APIserver
    Logon(LogonArgs),
    /// Log out of an APIserver and drop its token
    #[command(after_help = "Examples:\n  xce apiserver logout --url https://tt1.test.com:8443")]
    Logout(LogoutArgs),
    /// List logged-on APIservers; `*` marks the default
    List,
}

#[derive(Args, Debug)]
pub struct LogonArgs {
    /// Account name
    #[arg(short = 'n', long)]
    pub username: String,

    /// Password; prompted for when omitted
    #[arg(short, long)]
    pub password: Option<String>,

    /// APIserver address, e.g. https://tt1.test.com:8443
    #[arg(long)]
    pub url: String,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// APIserver address
    #[arg(long)]
    pub url: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set individual config values
    #[command(after_help = "Examples:\n  \
        xce config set --defaultapiserver http://tt1.test.com:8080\n  \
        xce config set --defaultqueryall y\n  \
        xce config set --cacert /usr/cacert.pem")]
    Set(SetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// URL of a known APIserver to use by default
    #[arg(long = "defaultapiserver")]
    pub default_api_server: Option<String>,

    /// Query every user's jobs by default (y/n)
    #[arg(long = "defaultqueryall")]
    pub default_query_all: Option<String>,

    /// CA certificate used to verify the APIserver
    #[arg(long = "cacert")]
    pub ca_cert: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(after_help = "Examples:\n  \
    xce bhosts\n  \
    xce bhosts --type full\n  \
    xce bhosts --host-type X86_64")]
pub struct BhostsArgs {
    /// Level of detail (basic/full)
    #[arg(long = "type", default_value = "basic")]
    pub info_type: String,

    /// Same as --type full
    #[arg(long)]
    pub full: bool,

    /// Only hosts of this type (X86_64/ARM)
    #[arg(long = "host-type")]
    pub host_type: Option<String>,
}

#[derive(Args, Debug)]
#[command(after_help = "Examples:\n  \
    xce bjobs\n  \
    xce bjobs -u user1\n  \
    xce bjobs -q queue1 -u user1\n  \
    xce bjobs -u all jobid,status,queue,command")]
pub struct BjobsArgs {
    /// Only jobs of this user (`all` for every user)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Only jobs in this queue
    #[arg(short, long)]
    pub queue: Option<String>,

    /// Comma-separated field list passed through to the server
    pub fields: Option<String>,
}

#[derive(Args, Debug)]
#[command(after_help = "Examples:\n  xce xsub -q q1 -R \"select(!mg)\" sleep 10")]
pub struct XsubArgs {
    /// Target queue
    #[arg(short, long)]
    pub queue: Option<String>,

    /// Resource requirement string
    #[arg(short = 'R', long = "resreq")]
    pub resreq: Option<String>,

    /// Command line to run; overrides the trailing words
    #[arg(short, long)]
    pub command: Option<String>,

    /// Command to run, taken verbatim
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
