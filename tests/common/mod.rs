//! Blocking HTTP stub used by the integration tests.
//!
//! The server answers each incoming request with the next canned
//! `(status, body)` pair and records what the client sent. It speaks
//! plain HTTP or, with `start_tls`, HTTPS.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the raw query string.
    pub target: String,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub struct StubServer {
    scheme: &'static str,
    addr: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Serve `responses` in order over plain HTTP, one connection each,
    /// then stop.
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        Self::spawn("http", responses, |tcp| Some(tcp))
    }

    /// Like [`StubServer::start`] but over TLS with a fresh self-signed
    /// certificate. Also returns the DER bytes the server presents.
    pub fn start_tls(responses: Vec<(u16, String)>) -> (Self, Vec<u8>) {
        let generated = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let der = generated.cert.der().to_vec();
        let identity = native_tls::Identity::from_pkcs8(
            generated.cert.pem().as_bytes(),
            generated.key_pair.serialize_pem().as_bytes(),
        )
        .unwrap();
        let acceptor = native_tls::TlsAcceptor::new(identity).unwrap();

        let server = Self::spawn("https", responses, move |tcp| acceptor.accept(tcp).ok());
        (server, der)
    }

    fn spawn<S, F>(scheme: &'static str, responses: Vec<(u16, String)>, wrap: F) -> Self
    where
        S: Read + Write,
        F: Fn(TcpStream) -> Option<S> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            let mut responses = responses.into_iter().peekable();
            while responses.peek().is_some() {
                let (tcp, _) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                // Connections that never send a request (a bare TLS
                // handshake) do not use up a response.
                let Some(mut stream) = wrap(tcp) else { continue };
                let Some(req) = read_request(&mut stream) else { continue };
                // Record before answering so the client never observes a
                // response whose request is not yet visible to the test.
                recorded.lock().unwrap().push(req);
                if let Some((status, body)) = responses.next() {
                    write_response(&mut stream, status, &body);
                }
            }
        });

        StubServer {
            scheme,
            addr,
            requests,
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn read_request<S: Read>(stream: &mut S) -> Option<RecordedRequest> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let len = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut raw_body = vec![0; len];
    reader.read_exact(&mut raw_body).ok()?;

    Some(RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&raw_body).into_owned(),
    })
}

fn write_response<S: Write>(stream: &mut S, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
