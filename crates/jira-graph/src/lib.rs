//! Jira Issue Link Graph Library
//!
//! Resolves the issues matched by a JQL filter together with every issue
//! reachable through issue links, then renders the result as an interactive
//! graph. The binary is a thin wrapper; everything here is usable against
//! any [`tracker::IssueTracker`], including the in-memory one used in tests.

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod graph;
pub mod icons;
pub mod output;
pub mod report;
pub mod resolver;
pub mod store;
pub mod tracker;
pub mod visualization;

// Re-export commonly used types
pub use config::{Defaults, OutputFormat, ReportSettings};
pub use domain::{ExclusionPolicy, Issue, SearchPage};
pub use errors::{ConfigError, StoreError, TrackerError};
pub use graph::{build_graph, GraphElements};
pub use icons::{IconMap, IconResolver};
pub use output::ExitCode;
pub use report::{Report, ReportGenerator};
pub use resolver::{Closure, ClosureResolver};
pub use store::IssueStore;
pub use tracker::{InMemoryTracker, IssueTracker, JiraClient};
