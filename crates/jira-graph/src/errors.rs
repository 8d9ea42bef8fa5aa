//! Error types and actionable error formatting.
//!
//! Library code returns the typed errors below. The binary wraps them in
//! `anyhow` with operation context and maps them to exit codes; tracker
//! failures that users can fix themselves (credentials, timeouts) are
//! decorated into an [`ActionableError`] with causes and remedies.

use std::fmt;
use thiserror::Error;

/// Failures talking to the issue tracker.
///
/// Fatal for searches. Icon downloads swallow them and render without icon.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Network or protocol failure before a response was received.
    #[error("{operation} failed: {reason}")]
    Transport { operation: String, reason: String },

    /// The configured request timeout elapsed.
    #[error("{operation} timed out after {timeout_ms} ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// The tracker answered with a non-success status.
    #[error("{operation} failed: HTTP {status}: {body}")]
    Http {
        operation: String,
        status: u16,
        body: String,
    },

    /// Body or pagination metadata cannot be trusted.
    #[error("{operation} returned a malformed response: {reason}")]
    MalformedResponse { operation: String, reason: String },
}

impl TrackerError {
    /// HTTP 401/403: credentials missing or insufficient.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, TrackerError::Http { status: 401 | 403, .. })
    }

    /// Status code for HTTP failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrackerError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Lookup failures in the issue store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Issue not found: {id}")]
    NotFound { id: String },
}

/// Invalid options or defaults file content.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required option --{option}")]
    MissingOption { option: String },

    #[error("Unsupported default for {key}")]
    UnsupportedDefault { key: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid defaults file: {reason}")]
    Syntax { reason: String },

    #[error("Failed to read defaults file {path}: {reason}")]
    DefaultsFile { path: String, reason: String },
}

/// An error with diagnostic context and remediation steps.
///
/// # Example
///
/// ```
/// use jira_graph::errors::ActionableError;
///
/// let error = ActionableError::new("search failed: HTTP 401")
///     .with_cause("The password or API token is wrong")
///     .with_remedy("Pass --username and --password");
///
/// assert!(error.to_string().contains("To fix:"));
/// ```
#[derive(Debug, Clone)]
pub struct ActionableError {
    error: String,
    causes: Vec<String>,
    remediation: Vec<String>,
}

impl ActionableError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            causes: Vec::new(),
            remediation: Vec::new(),
        }
    }

    /// Add a possible cause (diagnostic hint).
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    /// Add a remediation step.
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remediation.push(remedy.into());
        self
    }

    /// Formatted message. The leading `Error:` is added by the caller.
    pub fn to_error_message(&self) -> String {
        let mut msg = self.error.clone();

        if !self.causes.is_empty() {
            msg.push_str("\n\nPossible causes:\n");
            for cause in &self.causes {
                msg.push_str(&format!("  • {}\n", cause));
            }
        }

        if !self.remediation.is_empty() {
            msg.push_str(if self.causes.is_empty() { "\n\n" } else { "\n" });
            msg.push_str("To fix:\n");
            for remedy in &self.remediation {
                msg.push_str(&format!("  • {}\n", remedy));
            }
        }

        msg
    }
}

impl fmt::Display for ActionableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error_message())
    }
}

impl std::error::Error for ActionableError {}

/// Decorate a tracker failure with remediation when the user can act on it.
///
/// `message` is the full text to show, usually the error with its context.
/// Returns `None` for failures that carry no useful advice beyond the message.
pub fn remediation_for(error: &TrackerError, message: impl Into<String>) -> Option<ActionableError> {
    match error {
        TrackerError::Http { status: 401, .. } => Some(
            ActionableError::new(message)
                .with_cause("No credentials were sent, or the password/API token is wrong")
                .with_remedy("Pass --username and --password, or set them in the defaults file")
                .with_remedy("Store secrets as base64:<value> in the defaults file to avoid plain text"),
        ),
        TrackerError::Http { status: 403, .. } => Some(
            ActionableError::new(message)
                .with_cause("The account cannot browse one of the queried projects")
                .with_cause("Too many failed logins triggered a CAPTCHA on the tracker")
                .with_remedy("Log in once through the browser to clear the CAPTCHA"),
        ),
        TrackerError::Timeout { .. } => Some(
            ActionableError::new(message)
                .with_cause("The tracker is slow to answer this JQL query")
                .with_remedy("Raise --timeout (milliseconds)")
                .with_remedy("Narrow the --jql filter"),
        ),
        _ => None,
    }
}
