//! Command-line interface definitions using clap.
//!
//! Every report option is optional here: values missing on the command line
//! are filled from the defaults file, then from built-in defaults (see
//! [`crate::config`]).

use clap::Parser;
use std::path::PathBuf;

/// Render the link graph of issues matching a JQL filter
///
/// Issues matched by --jql are drawn together with every issue reachable from
/// them through issue links, even when those do not match the filter. Linked
/// issues whose status is excluded are left out along with their edges.
///
/// Exit Codes:
///   0  - Report written
///   1  - Generic error occurred
///   2  - Invalid arguments, options or defaults file
///   4  - Tracker returned a malformed response
///   5  - Permission denied by the tracker (HTTP 401/403)
///  10  - Tracker unreachable, timed out or failed; output not writable
#[derive(Parser, Debug, Default)]
#[command(name = "jira-graph", version)]
pub struct Cli {
    /// Tracker base URL, e.g. https://issues.example.com
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Username for HTTP Basic authentication [default: $USER]
    #[arg(long)]
    pub username: Option<String>,

    /// Password or API token
    #[arg(long, env = "JIRA_GRAPH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// JQL filter selecting the seed issues
    #[arg(long)]
    pub jql: Option<String>,

    /// Status to leave out of the graph (repeatable, comma-separated)
    #[arg(long = "exclude-status", value_name = "STATUS", value_delimiter = ',')]
    pub exclude_status: Vec<String>,

    /// Request timeout in milliseconds [default: 60000]
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Output file, or "stdout" [default: stdout]
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<String>,

    /// Page title [default: Report]
    #[arg(long)]
    pub title: Option<String>,

    /// Output format: html, json, dot or mermaid [default: html]
    #[arg(long)]
    pub format: Option<String>,

    /// Concurrent icon downloads [default: 8]
    #[arg(long, value_name = "N")]
    pub icon_workers: Option<usize>,

    /// Maximum ids per linked-issue query [default: 100]
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Do not download project icons
    #[arg(long)]
    pub no_icons: bool,

    /// Defaults file [default: ~/.jira-graph.toml]
    #[arg(long, env = "JIRA_GRAPH_DEFAULTS", value_name = "PATH")]
    pub defaults: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log every page and closure pass
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exclude_status_accepts_lists_and_repeats() {
        let cli = Cli::try_parse_from([
            "jira-graph",
            "--exclude-status",
            "Closed,Resolved",
            "--exclude-status",
            "Won't Fix",
        ])
        .unwrap();

        assert_eq!(cli.exclude_status, vec!["Closed", "Resolved", "Won't Fix"]);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["jira-graph", "-q", "-v"]).is_err());
    }
}
