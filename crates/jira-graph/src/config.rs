//! Report settings.
//!
//! Settings are merged from three layers, first match wins:
//!
//! 1. command-line options
//! 2. the defaults file (`~/.jira-graph.toml`, `$JIRA_GRAPH_DEFAULTS` or `--defaults`)
//! 3. built-in defaults
//!
//! The defaults file holds a `[defaults]` table keyed by long option names:
//!
//! ```toml
//! [defaults]
//! base-url = "https://issues.example.com"
//! username = "alice"
//! password = "base64:czNjcmV0"
//! exclude-status = ["Closed", "Resolved"]
//! timeout = 30000
//! ```
//!
//! Values are coerced by the declared kind of their option. Text values may be
//! stored as `base64:<payload>` to keep secrets out of plain sight.

use crate::cli::Cli;
use crate::errors::ConfigError;
use crate::icons::DEFAULT_ICON_WORKERS;
use crate::resolver::DEFAULT_BATCH_SIZE;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// File name of the defaults file in the home directory.
pub const DEFAULTS_FILE_NAME: &str = ".jira-graph.toml";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TITLE: &str = "Report";
/// Output target meaning standard output (case-insensitive).
pub const STDOUT: &str = "stdout";

const BASE64_PREFIX: &str = "base64:";

/// Declared type of an option, selecting how defaults are coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Text,
    Number,
    List,
}

/// Options that may appear in the defaults file.
const OPTIONS: &[(&str, OptionKind)] = &[
    ("base-url", OptionKind::Text),
    ("username", OptionKind::Text),
    ("password", OptionKind::Text),
    ("jql", OptionKind::Text),
    ("exclude-status", OptionKind::List),
    ("timeout", OptionKind::Number),
    ("output", OptionKind::Text),
    ("title", OptionKind::Text),
    ("format", OptionKind::Text),
    ("icon-workers", OptionKind::Number),
    ("batch-size", OptionKind::Number),
];

pub fn option_kind(key: &str) -> Option<OptionKind> {
    OPTIONS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, kind)| *kind)
}

/// A coerced default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    Text(String),
    Number(u64),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct DefaultsFile {
    #[serde(default)]
    defaults: toml::Table,
}

/// Parsed defaults file.
#[derive(Debug, Clone, Default)]
pub struct Defaults {
    values: HashMap<String, DefaultValue>,
}

impl Defaults {
    /// Load defaults from `path`, which must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file_error = |reason: String| ConfigError::DefaultsFile {
            path: path.display().to_string(),
            reason,
        };
        let content = fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
        let defaults = Self::parse(&content).map_err(|e| match e {
            ConfigError::Syntax { reason } => file_error(reason),
            other => other,
        })?;

        debug!(path = %path.display(), keys = defaults.values.len(), "loaded defaults");
        Ok(defaults)
    }

    /// Load defaults from `path`. A missing file yields empty defaults.
    pub fn load_if_present(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no defaults file");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: DefaultsFile = toml::from_str(content).map_err(|e| ConfigError::Syntax {
            reason: e.to_string(),
        })?;

        let mut values = HashMap::new();
        for (key, value) in &file.defaults {
            let kind = option_kind(key).ok_or_else(|| ConfigError::UnsupportedDefault {
                key: key.clone(),
            })?;
            values.insert(key.clone(), coerce(key, kind, value)?);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&DefaultValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(DefaultValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn number(&self, key: &str) -> Option<u64> {
        match self.values.get(key) {
            Some(DefaultValue::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key) {
            Some(DefaultValue::List(values)) => Some(values),
            _ => None,
        }
    }
}

/// Coerce a raw TOML value according to the option kind.
///
/// Fails with [`ConfigError::UnsupportedDefault`] when the value's type does
/// not fit the kind at all, and [`ConfigError::InvalidValue`] when it has the
/// right shape but cannot be parsed.
pub fn coerce(key: &str, kind: OptionKind, value: &toml::Value) -> Result<DefaultValue, ConfigError> {
    use toml::Value;

    let unsupported = || ConfigError::UnsupportedDefault {
        key: key.to_string(),
    };
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_string(),
        reason,
    };

    match (kind, value) {
        (OptionKind::Text, Value::String(raw)) => decode_text(key, raw).map(DefaultValue::Text),
        (OptionKind::Number, Value::Integer(n)) => u64::try_from(*n)
            .map(DefaultValue::Number)
            .map_err(|_| invalid(format!("{} is negative", n))),
        (OptionKind::Number, Value::String(raw)) => {
            let text = decode_text(key, raw)?;
            text.trim()
                .parse::<u64>()
                .map(DefaultValue::Number)
                .map_err(|e| invalid(format!("'{}' is not a number: {}", text, e)))
        }
        (OptionKind::List, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(raw) => decode_text(key, raw),
                _ => Err(unsupported()),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(DefaultValue::List),
        (OptionKind::List, Value::String(raw)) => {
            decode_text(key, raw).map(|text| DefaultValue::List(split_list(&text)))
        }
        _ => Err(unsupported()),
    }
}

fn decode_text(key: &str, raw: &str) -> Result<String, ConfigError> {
    let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) else {
        return Ok(raw.to_string());
    };
    let invalid = |reason: String| ConfigError::InvalidValue {
        key: key.to_string(),
        reason,
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| invalid(format!("invalid base64: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| invalid(format!("base64 payload is not UTF-8: {}", e)))
}

/// Split a comma-separated list, dropping blank entries.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Defaults file in the home directory.
pub fn home_defaults_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULTS_FILE_NAME))
}

/// Load the defaults named by `--defaults`/`$JIRA_GRAPH_DEFAULTS`, else the
/// home directory file if there is one.
pub fn load_defaults(cli: &Cli) -> Result<Defaults, ConfigError> {
    match (&cli.defaults, home_defaults_path()) {
        (Some(path), _) => Defaults::load(path),
        (None, Some(path)) => Defaults::load_if_present(&path),
        (None, None) => Ok(Defaults::default()),
    }
}

/// Rendering format of the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
    Dot,
    Mermaid,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Json => "json",
            OutputFormat::Dot => "dot",
            OutputFormat::Mermaid => "mermaid",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "json" => Ok(OutputFormat::Json),
            "dot" => Ok(OutputFormat::Dot),
            "mermaid" => Ok(OutputFormat::Mermaid),
            _ => Err(ConfigError::InvalidValue {
                key: "format".to_string(),
                reason: format!("unsupported format '{}', use html, json, dot or mermaid", s),
            }),
        }
    }
}

/// Fully merged settings for one report run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSettings {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub jql: String,
    pub exclude_status: Vec<String>,
    pub timeout: Duration,
    pub output: String,
    pub title: String,
    pub format: OutputFormat,
    pub icon_workers: usize,
    pub batch_size: usize,
    pub fetch_icons: bool,
}

impl ReportSettings {
    /// Merge command line, defaults file and built-in defaults.
    ///
    /// The username falls back to `$USER`.
    pub fn resolve(cli: &Cli, defaults: &Defaults) -> Result<Self, ConfigError> {
        let text = |flag: &Option<String>, key: &str| {
            flag.clone()
                .or_else(|| defaults.text(key).map(str::to_string))
        };
        let required = |flag: &Option<String>, key: &str| {
            text(flag, key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingOption {
                    option: key.to_string(),
                })
        };
        let count = |flag: Option<usize>, key: &str, fallback: usize| {
            let value = flag
                .or_else(|| defaults.number(key).map(|n| usize::try_from(n).unwrap_or(usize::MAX)))
                .unwrap_or(fallback);
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            Ok(value)
        };

        let base_url = required(&cli.base_url, "base-url")?;
        let jql = required(&cli.jql, "jql")?;

        let exclude_status = if cli.exclude_status.is_empty() {
            defaults
                .list("exclude-status")
                .map(<[String]>::to_vec)
                .unwrap_or_default()
        } else {
            cli.exclude_status.clone()
        };

        let timeout_ms = cli
            .timeout
            .or_else(|| defaults.number("timeout"))
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout".to_string(),
                reason: "must be at least 1 ms".to_string(),
            });
        }

        let format = match text(&cli.format, "format") {
            Some(format) => format.parse()?,
            None => OutputFormat::default(),
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: text(&cli.username, "username").or_else(|| std::env::var("USER").ok()),
            password: text(&cli.password, "password"),
            jql,
            exclude_status,
            timeout: Duration::from_millis(timeout_ms),
            output: text(&cli.output, "output").unwrap_or_else(|| STDOUT.to_string()),
            title: text(&cli.title, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            format,
            icon_workers: count(cli.icon_workers, "icon-workers", DEFAULT_ICON_WORKERS)?,
            batch_size: count(cli.batch_size, "batch-size", DEFAULT_BATCH_SIZE)?,
            fetch_icons: !cli.no_icons,
        })
    }

    /// Basic-auth credentials; only sent when both username and password are known.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.password.as_deref()?))
    }

    pub fn writes_to_stdout(&self) -> bool {
        self.output.eq_ignore_ascii_case(STDOUT)
    }
}
