//! Minimal HTTP/1.1 tracker stand-in for integration tests.
//!
//! Serves one request per connection on a background thread and records
//! every request it sees.

#![allow(dead_code)]

use jira_graph::domain::Issue;
use serde_json::json;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Debug, Clone)]
pub struct Request {
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl Request {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub struct Response {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn bytes(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.to_vec(),
        }
    }
}

type Handler = Box<dyn Fn(&Request) -> Response + Send + 'static>;

pub struct TestServer {
    listener: Option<TcpListener>,
    pub base_url: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl TestServer {
    /// Bind to a free local port. Nothing is served until [`TestServer::serve`].
    pub fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        Self {
            listener: Some(listener),
            base_url,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn serve<H>(mut self, handler: H) -> Self
    where
        H: Fn(&Request) -> Response + Send + 'static,
    {
        let listener = self.listener.take().unwrap();
        let requests = Arc::clone(&self.requests);
        let handler: Handler = Box::new(handler);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                handle(stream, &handler, &requests);
            }
        });
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// JQL of every search, first pages only.
    pub fn searches(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter(|r| r.path == "/rest/api/2/search" && r.param("startAt") == Some("0"))
            .filter_map(|r| r.param("jql").map(str::to_string))
            .collect()
    }
}

fn handle(stream: TcpStream, handler: &Handler, requests: &Mutex<Vec<Request>>) {
    let Ok(reader) = stream.try_clone() else { return };
    let mut reader = BufReader::new(reader);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let target = request_line.split_whitespace().nth(1).unwrap_or("/").to_string();

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target, Vec::new()),
    };
    let request = Request {
        path,
        query,
        headers,
    };
    requests.lock().unwrap().push(request.clone());

    let response = handler(&request);
    let mut stream = stream;
    let head = format!(
        "HTTP/1.1 {} Test\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
    let _ = stream.flush();
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    Err(_) => out.push(b'%'),
                }
            }
            other => out.push(other),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Search endpoint over a fixed issue set.
///
/// `id in (...)` queries are answered from `issues`; any other JQL must be
/// registered in `named`. Pages hold at most `page_size` issues.
pub fn jira(
    issues: Vec<Issue>,
    named: Vec<(&str, Vec<&str>)>,
    page_size: usize,
) -> impl Fn(&Request) -> Response + Send + 'static {
    let issues: HashMap<String, Issue> = issues
        .into_iter()
        .map(|issue| (issue.id.clone(), issue))
        .collect();
    let named: HashMap<String, Vec<String>> = named
        .into_iter()
        .map(|(jql, ids)| (jql.to_string(), ids.into_iter().map(str::to_string).collect()))
        .collect();

    move |request: &Request| {
        if request.path.starts_with("/icons/") {
            return Response::bytes("image/png; charset=binary", b"PNG");
        }
        if request.path != "/rest/api/2/search" {
            return Response::text(404, "");
        }

        let jql = request.param("jql").unwrap_or("").trim().to_string();
        let ids: Vec<String> = match jql
            .strip_prefix("id in (")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(list) => list.split(',').map(|id| id.trim().to_string()).collect(),
            None => match named.get(&jql) {
                Some(ids) => ids.clone(),
                None => {
                    return Response::json(
                        400,
                        &json!({"errorMessages": [format!("Error in the JQL Query: {}", jql)]}),
                    )
                }
            },
        };

        let matches: Vec<&Issue> = ids.iter().filter_map(|id| issues.get(id)).collect();
        let start_at: usize = request
            .param("startAt")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let page: Vec<&Issue> = matches.iter().skip(start_at).take(page_size).copied().collect();

        Response::json(
            200,
            &json!({
                "startAt": start_at,
                "maxResults": page_size,
                "total": matches.len(),
                "issues": page,
            }),
        )
    }
}
