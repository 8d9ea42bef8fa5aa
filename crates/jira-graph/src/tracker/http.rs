//! Jira REST v2 client over blocking HTTP.

use super::{Icon, IssueTracker};
use crate::domain::SearchPage;
use crate::errors::TrackerError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// Fields requested for every searched issue.
pub const SEARCH_FIELDS: &str = "issuelinks,issuetype,summary,status,fixVersions,project";

/// Blocking client for a Jira instance.
///
/// One global timeout covers every request, icons included. Non-success
/// statuses are turned into [`TrackerError::Http`] with the response body so
/// the tracker's own error message reaches the user.
pub struct JiraClient {
    agent: Agent,
    base_url: String,
    authorization: Option<String>,
    timeout: Duration,
}

impl JiraClient {
    /// `credentials` enables HTTP Basic authorization when present.
    pub fn new(base_url: &str, credentials: Option<(&str, &str)>, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            authorization: credentials.map(|(username, password)| basic_authorization(username, password)),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self) -> String {
        format!("{}/rest/api/2/search", self.base_url)
    }

    fn classify(&self, operation: &str, error: ureq::Error) -> TrackerError {
        match error {
            ureq::Error::Timeout(_) => self.timed_out(operation),
            ureq::Error::Io(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                self.timed_out(operation)
            }
            ureq::Error::StatusCode(status) => TrackerError::Http {
                operation: operation.to_string(),
                status,
                body: "-".to_string(),
            },
            other => TrackerError::Transport {
                operation: operation.to_string(),
                reason: other.to_string(),
            },
        }
    }

    fn timed_out(&self, operation: &str) -> TrackerError {
        TrackerError::Timeout {
            operation: operation.to_string(),
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// `Basic base64(username:password)`.
pub fn basic_authorization(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", username, password))
    )
}

impl IssueTracker for JiraClient {
    fn search_page(&self, jql: &str, start_at: u64) -> Result<SearchPage, TrackerError> {
        let operation = format!("search '{}'", jql);
        let mut request = self
            .agent
            .get(self.search_url())
            .query("jql", jql)
            .query("startAt", start_at.to_string())
            .query("fields", SEARCH_FIELDS)
            .header("Accept", "application/json");
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization.as_str());
        }

        let mut response = request
            .call()
            .map_err(|e| self.classify(&operation, e))?;
        let status = response.status();
        let body = response.body_mut().read_to_string();

        if !status.is_success() {
            let body = body.unwrap_or_default();
            let body = body.trim();
            return Err(TrackerError::Http {
                operation,
                status: status.as_u16(),
                body: if body.is_empty() { "-".to_string() } else { body.to_string() },
            });
        }

        let body = body.map_err(|e| self.classify(&operation, e))?;
        debug!(jql, start_at, bytes = body.len(), "search response received");
        serde_json::from_str(&body).map_err(|e| TrackerError::MalformedResponse {
            operation,
            reason: e.to_string(),
        })
    }

    fn fetch_icon(&self, url: &str) -> Result<Icon, TrackerError> {
        let operation = format!("icon fetch {}", url);
        let mut request = self.agent.get(url);
        if let Some(authorization) = &self.authorization {
            request = request.header("Authorization", authorization.as_str());
        }

        let mut response = request
            .call()
            .map_err(|e| self.classify(&operation, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Http {
                operation,
                status: status.as_u16(),
                body: "-".to_string(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| self.classify(&operation, e))?;

        Ok(Icon {
            bytes,
            content_type,
        })
    }
}
