// API client module: a small blocking HTTP client that talks to the XCE
// APIserver. Every call is a single request/response exchange that returns
// the `data` part of the `{code, msg, data, count}` envelope.

use crate::error::{ApiError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Certificate, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Path prefix shared by every APIserver endpoint.
pub const API_PREFIX: &str = "/xce/v1";

/// Query-string parameters, kept ordered so requests are reproducible.
pub type QueryParams = BTreeMap<String, String>;

/// Blocking API client bound to one APIserver base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

/// Uniform response envelope. `data` falls back to its default when the
/// server sends `null` or leaves it out (error responses usually do).
#[derive(Deserialize, Debug)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ApiResponse<T> {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: T,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: i64,
}

/// Go servers encode nil slices and empty pointers as `null`; treat that
/// the same as a missing key.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Login request payload.
#[derive(Serialize, Debug)]
pub struct LogonRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Session data returned by a successful logon. The metadata fields only
/// exist on newer servers.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct LogonData {
    #[serde(deserialize_with = "null_as_default")]
    pub token: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ip: String,
    #[serde(deserialize_with = "null_as_default")]
    pub jobid_range: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cluster_index: String,
    #[serde(deserialize_with = "null_as_default")]
    pub version: String,
}

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct JobSubmitRequest {
    pub queue: String,
    pub resreq: String,
    pub command: String,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct JobSubmitData {
    #[serde(rename = "jobid", deserialize_with = "null_as_default")]
    pub job_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub message: String,
}

/// Host record as reported by `GET /xce/v1/hosts`. Memory sizes are in KB.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Host {
    #[serde(deserialize_with = "null_as_default")]
    pub host_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub host_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub host_model: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cpu_factor: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_cpus: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_mem: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_swap: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_tmp: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub n_disks: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub n_res: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub resources: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub n_d_res: i64,
    #[serde(rename = "DResources", deserialize_with = "null_as_default")]
    pub d_resources: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub windows: String,
    #[serde(deserialize_with = "null_as_default")]
    pub num_indx: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub busy_threshold: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_server: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub cores: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub host_addr: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pprocs: i64,
    #[serde(rename = "cores_per_proc", deserialize_with = "null_as_default")]
    pub cores_per_proc: i64,
    #[serde(rename = "threads_per_core", deserialize_with = "null_as_default")]
    pub threads_per_core: i64,
}

/// Job record as reported by `GET /xce/v1/jobs`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct Job {
    #[serde(rename = "jobid", deserialize_with = "null_as_default")]
    pub job_id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub user: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(rename = "jobname", deserialize_with = "null_as_default")]
    pub job_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub queue: String,
    #[serde(rename = "projectname", deserialize_with = "null_as_default")]
    pub project_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub command: String,
    #[serde(deserialize_with = "null_as_default")]
    pub resreq: String,
    #[serde(rename = "submittime", deserialize_with = "null_as_default")]
    pub submit_time: String,
    #[serde(rename = "jobdescription", deserialize_with = "null_as_default")]
    pub job_description: String,
}

/// Items from a list endpoint together with the server-reported count.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub count: i64,
}

/// Strips any endpoint path (`/xce/v1/...`) and trailing slashes so that
/// users may paste either the server root or a full endpoint URL.
pub fn normalize_base_url(url: &str) -> String {
    let root = match url.find(API_PREFIX) {
        Some(idx) => &url[..idx],
        None => url,
    };
    root.trim_end_matches('/').to_string()
}

impl ApiClient {
    /// Create a client for `base_url`. Certificate verification is turned
    /// off; `ca_cert`, when readable, is still installed as an extra root.
    pub fn new(base_url: &str, ca_cert: Option<&Path>) -> Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(true);

        if let Some(path) = ca_cert {
            match std::fs::read(path) {
                Ok(pem) => {
                    let cert = Certificate::from_pem(&pem)
                        .map_err(|e| ApiError::InvalidCertificate(format!("{}: {}", path.display(), e)))?;
                    builder = builder.add_root_certificate(cert);
                }
                Err(e) => {
                    log::warn!("ignoring CA certificate {}: {}", path.display(), e);
                }
            }
        }

        Ok(ApiClient {
            client: builder.build()?,
            base_url: normalize_base_url(base_url),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    fn with_bearer(req: RequestBuilder, token: &str) -> RequestBuilder {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                req.header(AUTHORIZATION, value)
            }
            // A token with control characters can never authenticate; send
            // the request without it and let the server reject it.
            Err(_) => {
                log::warn!("session token contains invalid header characters");
                req
            }
        }
    }

    /// Log on with username/password. Succeeds only on HTTP 200 with
    /// envelope code 200.
    pub fn logon(&self, username: &str, password: &str) -> Result<LogonData> {
        let url = self.endpoint("/auth/logon");
        log::debug!("POST {} as {}", url, username);
        let res = self
            .client
            .post(&url)
            .json(&LogonRequest { username, password })
            .send()?;
        let envelope: ApiResponse<LogonData> = read_envelope(res, 200)?;
        Ok(envelope.data)
    }

    /// Invalidate `token` on the server. Only the HTTP status is checked.
    pub fn logout(&self, token: &str) -> Result<()> {
        let url = self.endpoint("/auth/logout");
        log::debug!("POST {}", url);
        let res = Self::with_bearer(self.client.post(&url), token).send()?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().unwrap_or_default();
            return Err(status_error(status, body));
        }
        Ok(())
    }

    /// Submit a job. The server answers HTTP 200 with envelope code 201.
    pub fn submit_job(&self, token: &str, req: &JobSubmitRequest) -> Result<JobSubmitData> {
        let url = self.endpoint("/jobs");
        log::debug!("POST {} queue={:?} resreq={:?}", url, req.queue, req.resreq);
        let res = Self::with_bearer(self.client.post(&url), token)
            .json(req)
            .send()?;
        let envelope: ApiResponse<JobSubmitData> = read_envelope(res, 201)?;
        Ok(envelope.data)
    }

    /// Query hosts; every entry in `params` is forwarded.
    pub fn get_hosts(&self, token: &str, params: &QueryParams) -> Result<Listing<Host>> {
        let url = self.endpoint("/hosts");
        log::debug!("GET {} {:?}", url, params);
        let res = Self::with_bearer(self.client.get(&url), token)
            .query(params)
            .send()?;
        let envelope: ApiResponse<Vec<Host>> = read_envelope(res, 200)?;
        Ok(Listing {
            items: envelope.data,
            count: envelope.count,
        })
    }

    /// Query jobs; only `filter` and `fields` are forwarded.
    pub fn get_jobs(&self, token: &str, params: &QueryParams) -> Result<Listing<Job>> {
        let url = self.endpoint("/jobs");
        let forwarded: QueryParams = params
            .iter()
            .filter(|(k, _)| k.as_str() == "filter" || k.as_str() == "fields")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        log::debug!("GET {} {:?}", url, forwarded);
        let res = Self::with_bearer(self.client.get(&url), token)
            .query(&forwarded)
            .send()?;
        let envelope: ApiResponse<Vec<Job>> = read_envelope(res, 200)?;
        Ok(Listing {
            items: envelope.data,
            count: envelope.count,
        })
    }
}

/// Check the HTTP status, decode the envelope and check its `code`.
fn read_envelope<T>(res: Response, expected_code: i64) -> Result<ApiResponse<T>>
where
    T: DeserializeOwned + Default,
{
    let status = res.status();
    let body = res.text()?;
    if status != StatusCode::OK {
        return Err(status_error(status, body));
    }
    let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
    if envelope.code != expected_code {
        return Err(ApiError::Application {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    Ok(envelope)
}

/// Prefer the envelope's `msg` over the raw body when the server sent one.
fn status_error(status: StatusCode, body: String) -> ApiError {
    let msg = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("msg").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.is_empty());
    ApiError::Status {
        status,
        body: msg.unwrap_or(body),
    }
}
