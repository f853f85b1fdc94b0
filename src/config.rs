// Local configuration: one JSON document holding the known APIservers,
// their session tokens, the default server and a few preference flags.

use crate::api::{null_as_default, LogonData};
use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "XCE_CLI_CONFIG";

const CONFIG_DIR_NAME: &str = ".cli";
const CONFIG_FILE_NAME: &str = "config.json";

/// One APIserver the user has logged on to. `url` is the key.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct ServerRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    /// Empty when logged out.
    #[serde(deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub jobid_range: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub cluster_index: String,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "null_as_default")]
    pub version: String,
}

impl ServerRecord {
    pub fn is_logged_on(&self) -> bool {
        !self.token.is_empty()
    }

    fn apply_logon(&mut self, data: &LogonData) {
        self.token = data.token.clone();
        self.path = data.path.clone();
        // Older servers do not report metadata; keep what we already have.
        if !data.jobid_range.is_empty() {
            self.jobid_range = data.jobid_range.clone();
        }
        if !data.cluster_index.is_empty() {
            self.cluster_index = data.cluster_index.clone();
        }
        if !data.version.is_empty() {
            self.version = data.version.clone();
        }
    }
}

/// The whole config file. Unknown fields are ignored on load so files
/// written by other client revisions still parse.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "null_as_default")]
    pub account: String,
    #[serde(rename = "defaultAPIserver", deserialize_with = "null_as_default")]
    pub default_api_server: String,
    #[serde(rename = "defaultqueryall", deserialize_with = "null_as_default")]
    pub default_query_all: bool,
    #[serde(rename = "cacert", deserialize_with = "null_as_default")]
    pub ca_cert: String,
    #[serde(deserialize_with = "null_as_default")]
    pub servers: Vec<ServerRecord>,
}

impl Config {
    pub fn find_server(&self, url: &str) -> Option<&ServerRecord> {
        self.servers.iter().find(|s| s.url == url)
    }

    pub fn find_server_mut(&mut self, url: &str) -> Option<&mut ServerRecord> {
        self.servers.iter_mut().find(|s| s.url == url)
    }

    /// The default server, provided one is set, exists and is logged on.
    pub fn default_server(&self) -> Result<&ServerRecord> {
        if self.default_api_server.is_empty() {
            bail!("no default APIserver set, log on first or run `config set --defaultapiserver`");
        }
        let server = self
            .find_server(&self.default_api_server)
            .with_context(|| format!("default APIserver {} is not a known server", self.default_api_server))?;
        if !server.is_logged_on() {
            bail!("not logged on to {}, run `apiserver logon` first", server.url);
        }
        Ok(server)
    }

    /// Store a successful logon: refresh the existing record for `url` or
    /// append a new `apiserver<N>` record. The first server ever added
    /// becomes the default.
    pub fn record_logon(&mut self, url: &str, username: &str, data: &LogonData) {
        match self.find_server_mut(url) {
            Some(server) => server.apply_logon(data),
            None => {
                let mut server = ServerRecord {
                    name: format!("apiserver{}", self.servers.len() + 1),
                    url: url.to_string(),
                    ..Default::default()
                };
                server.apply_logon(data);
                self.servers.push(server);
            }
        }

        if self.servers.len() == 1 {
            self.default_api_server = url.to_string();
        }
        self.account = username.to_string();
    }

    /// Clear the session token for `url`, returning the previous token
    /// (empty if it was already logged out).
    pub fn clear_token(&mut self, url: &str) -> Result<String> {
        let server = self
            .find_server_mut(url)
            .with_context(|| format!("unknown APIserver: {}", url))?;
        Ok(std::mem::take(&mut server.token))
    }

    pub fn set_default_server(&mut self, url: &str) -> Result<()> {
        if !is_valid_url(url) {
            bail!("invalid APIserver URL: {}", url);
        }
        if self.find_server(url).is_none() {
            bail!("unknown APIserver: {}", url);
        }
        self.default_api_server = url.to_string();
        Ok(())
    }
}

/// `http(s)://host[:port][/path]`, where host may be a bracketed IPv6 literal.
pub fn is_valid_url(url: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://([a-zA-Z0-9.-]+|\[[0-9a-fA-F:.]+\])(:[0-9]+)?(/.*)?$")
            .expect("static regex is valid")
    })
    .is_match(url)
}

/// Parse a `y`/`n` answer (either case).
pub fn parse_yes_no(value: &str) -> Result<bool> {
    match value {
        "y" | "Y" => Ok(true),
        "n" | "N" => Ok(false),
        other => bail!("expected y or n, got {:?}", other),
    }
}

/// Loads the config lazily and writes it back on demand.
pub struct ConfigManager {
    path: PathBuf,
    config: Option<Config>,
}

impl ConfigManager {
    /// Use `$XCE_CLI_CONFIG` if set, otherwise `~/.cli/config.json`.
    pub fn from_env() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => dirs::home_dir()
                .context("cannot determine home directory")?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        };
        Ok(Self::with_path(path))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        ConfigManager {
            path: path.into(),
            config: None,
        }
    }

    /// Directory holding the config file (and the captured server cert).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Return the cached config, loading it on first use. A missing file
    /// is replaced by an empty default config which is written right away.
    pub fn get_config(&mut self) -> Result<&mut Config> {
        if self.config.is_none() {
            let loaded = self.load()?;
            self.config = Some(loaded);
        }
        Ok(self.config.get_or_insert_with(Config::default))
    }

    fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            log::info!("creating default config at {}", self.path.display());
            let config = Config::default();
            self.write(&config).context("failed to create default config")?;
            return Ok(config);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read config file {}", self.path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", self.path.display()))?;
        Ok(config)
    }

    /// Persist `config` and make it the cached copy.
    pub fn save_config(&mut self, config: Config) -> Result<()> {
        self.write(&config)
            .with_context(|| format!("failed to save config file {}", self.path.display()))?;
        self.config = Some(config);
        Ok(())
    }

    /// Persist the cached config, if one has been loaded.
    pub fn save(&mut self) -> Result<()> {
        if let Some(config) = &self.config {
            self.write(config)
                .with_context(|| format!("failed to save config file {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Write to a sibling temp file and rename it into place so readers
    /// never see a half-written file.
    fn write(&self, config: &Config) -> Result<()> {
        let dir = self.dir();
        create_private_dir(dir)?;

        let content = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        write_private_file(&tmp, content.as_bytes())?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("saved config to {}", self.path.display());
        Ok(())
    }
}

pub(crate) fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)
    }
}

pub(crate) fn write_private_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(content)
    }
    #[cfg(not(unix))]
    {
        std::fs::write(path, content)
    }
}
