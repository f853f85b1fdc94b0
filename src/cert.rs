// Server certificate capture. At logon the client records the certificate
// the APIserver presents so it can later be installed as a trusted root.

use crate::config::{create_private_dir, write_private_file};
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Url;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

const CERT_FILE_NAME: &str = "server.crt";
const PEM_LINE_WIDTH: usize = 64;

/// Where the captured certificate lives, next to the config file.
pub fn cert_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CERT_FILE_NAME)
}

/// Split a URL into the TLS server name and a `host:port` dial address,
/// filling in 443/80 when no port is given.
pub fn host_and_port(url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("URL has no host: {}", url))?
        .to_string();
    let port = parsed
        .port_or_known_default()
        .with_context(|| format!("URL has no port and an unknown scheme: {}", url))?;
    let addr = format!("{}:{}", host, port);
    Ok((host, addr))
}

/// Handshake with the server (no verification) and return the DER bytes
/// of the leaf certificate it presents. IPv6 hosts keep their brackets in
/// the dial address but not in the TLS server name.
pub fn fetch_server_certificate(url: &str) -> Result<Vec<u8>> {
    let (host, addr) = host_and_port(url)?;
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .context("failed to set up TLS")?;

    let tcp = TcpStream::connect(&addr).with_context(|| format!("failed to connect to {}", addr))?;
    let stream = connector
        .connect(host.trim_matches(|c: char| c == '[' || c == ']'), tcp)
        .map_err(|e| anyhow!("TLS handshake with {} failed: {}", addr, e))?;

    let cert = stream
        .peer_certificate()
        .context("failed to read peer certificate")?
        .with_context(|| format!("{} presented no certificate", addr))?;
    let der = cert.to_der().context("failed to encode peer certificate")?;
    log::info!("captured {} byte certificate from {}", der.len(), addr);
    Ok(der)
}

/// PEM-encode a DER certificate.
pub fn to_pem(der: &[u8]) -> String {
    let body = STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    // base64 output is ASCII, so byte chunks are valid str slices.
    for line in body.as_bytes().chunks(PEM_LINE_WIDTH) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

/// A certificate fetched at logon. It sits in a temp file next to the
/// final location until [`CapturedCert::commit`] moves it into place;
/// dropping it uncommitted removes the temp file, so a rejected logon never
/// replaces a certificate saved earlier.
#[derive(Debug)]
pub struct CapturedCert {
    staged: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl CapturedCert {
    /// The temp file, usable as a CA file before the commit.
    pub fn staged_path(&self) -> &Path {
        &self.staged
    }

    /// Replace `server.crt` with the staged certificate.
    pub fn commit(mut self) -> Result<PathBuf> {
        std::fs::rename(&self.staged, &self.target)
            .with_context(|| format!("failed to write {}", self.target.display()))?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for CapturedCert {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.staged);
        }
    }
}

/// Fetch the certificate of an `https://` server and stage it in
/// `config_dir`. Plain `http://` servers have nothing to capture.
pub fn capture(url: &str, config_dir: &Path) -> Result<Option<CapturedCert>> {
    let scheme = Url::parse(url)
        .with_context(|| format!("invalid URL: {}", url))?
        .scheme()
        .to_string();
    match scheme.as_str() {
        "http" => return Ok(None),
        "https" => {}
        other => bail!("unsupported URL scheme: {}", other),
    }

    let der = fetch_server_certificate(url)?;
    let target = cert_path(config_dir);
    let staged = target.with_extension("crt.tmp");
    create_private_dir(config_dir)?;
    write_private_file(&staged, to_pem(&der).as_bytes())
        .with_context(|| format!("failed to write {}", staged.display()))?;
    Ok(Some(CapturedCert {
        staged,
        target,
        committed: false,
    }))
}
