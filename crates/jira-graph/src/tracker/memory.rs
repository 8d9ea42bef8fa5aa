//! In-memory tracker for testing.
//!
//! Holds a fixed universe of issues and icons and records every call, so
//! tests can assert on request counts (one query per closure pass, one fetch
//! per distinct icon) without a network.

use super::{Icon, IssueTracker};
use crate::domain::{Issue, SearchPage};
use crate::errors::TrackerError;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

const DEFAULT_PAGE_SIZE: u64 = 50;

/// A request received by [`InMemoryTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    Search { jql: String, start_at: u64 },
    Icon { url: String },
}

/// Tracker backed by maps.
///
/// Understands `id = X` and `id in (X, Y, ...)`; any other expression must be
/// registered with [`InMemoryTracker::with_query`]. Unknown ids are silently
/// absent from results, unknown queries fail with HTTP 400.
///
/// # Examples
///
/// ```
/// use jira_graph::domain::{ExclusionPolicy, Issue};
/// use jira_graph::tracker::{InMemoryTracker, IssueTracker};
///
/// let tracker = InMemoryTracker::new()
///     .with_issue(Issue::new("1", "A-1", "First", "Open"))
///     .with_query("project = A", ["1"]);
///
/// let issues = tracker.search("project = A", &ExclusionPolicy::default()).unwrap();
/// assert_eq!(issues[0].key, "A-1");
/// ```
#[derive(Debug)]
pub struct InMemoryTracker {
    issues: HashMap<String, Issue>,
    queries: HashMap<String, Vec<String>>,
    icons: HashMap<String, Icon>,
    page_size: u64,
    calls: Mutex<Vec<TrackerCall>>,
}

impl Default for InMemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self {
            issues: HashMap::new(),
            queries: HashMap::new(),
            icons: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_issue(mut self, issue: Issue) -> Self {
        self.issues.insert(issue.id.clone(), issue);
        self
    }

    pub fn with_issues<I: IntoIterator<Item = Issue>>(self, issues: I) -> Self {
        issues.into_iter().fold(self, Self::with_issue)
    }

    /// Register a named query returning the given ids, in order.
    pub fn with_query<I, S>(mut self, jql: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queries
            .insert(jql.to_string(), ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_icon(mut self, url: &str, icon: Icon) -> Self {
        self.icons.insert(url.to_string(), icon);
        self
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.lock_calls().clone()
    }

    /// First-page searches only, i.e. one entry per logical query.
    pub fn queries_run(&self) -> Vec<String> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                TrackerCall::Search { jql, start_at: 0 } => Some(jql.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn icon_fetches(&self) -> Vec<String> {
        self.lock_calls()
            .iter()
            .filter_map(|call| match call {
                TrackerCall::Icon { url } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<TrackerCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn matching_ids(&self, jql: &str) -> Option<Vec<String>> {
        let expression = jql.trim();
        if let Some(list) = expression
            .strip_prefix("id in (")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Some(
                list.split(',')
                    .map(|id| id.trim().to_string())
                    .filter(|id| !id.is_empty())
                    .collect(),
            );
        }
        if let Some(id) = expression.strip_prefix("id = ") {
            return Some(vec![id.trim().to_string()]);
        }
        self.queries.get(expression).cloned()
    }
}

impl IssueTracker for InMemoryTracker {
    fn search_page(&self, jql: &str, start_at: u64) -> Result<SearchPage, TrackerError> {
        self.lock_calls().push(TrackerCall::Search {
            jql: jql.to_string(),
            start_at,
        });

        let ids = self.matching_ids(jql).ok_or_else(|| TrackerError::Http {
            operation: format!("search '{}'", jql),
            status: 400,
            body: format!("unknown query: {}", jql),
        })?;
        let matches: Vec<&Issue> = ids.iter().filter_map(|id| self.issues.get(id)).collect();

        let start = usize::try_from(start_at).unwrap_or(usize::MAX);
        let page_size = usize::try_from(self.page_size).unwrap_or(usize::MAX);
        let page = matches
            .iter()
            .skip(start)
            .take(page_size)
            .map(|issue| (*issue).clone())
            .collect();

        Ok(SearchPage {
            start_at,
            max_results: self.page_size,
            total: matches.len() as u64,
            issues: Some(page),
        })
    }

    fn fetch_icon(&self, url: &str) -> Result<Icon, TrackerError> {
        self.lock_calls().push(TrackerCall::Icon {
            url: url.to_string(),
        });

        self.icons.get(url).cloned().ok_or_else(|| TrackerError::Http {
            operation: format!("icon fetch {}", url),
            status: 404,
            body: "-".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExclusionPolicy;

    fn universe(count: usize) -> InMemoryTracker {
        InMemoryTracker::new().with_issues(
            (1..=count).map(|n| Issue::new(n.to_string(), format!("A-{}", n), "s", "Open")),
        )
    }

    #[test]
    fn test_id_in_expression() {
        let tracker = universe(5);
        let issues = tracker
            .search("id in (2,4,9)", &ExclusionPolicy::default())
            .unwrap();

        let ids: Vec<_> = issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4"]);
    }

    #[test]
    fn test_single_id_expression() {
        let tracker = universe(3);
        let issues = tracker.search("id = 3", &ExclusionPolicy::default()).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].key, "A-3");
    }

    #[test]
    fn test_unknown_query_is_http_error() {
        let err = universe(1)
            .search("assignee = bob", &ExclusionPolicy::default())
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_pages_and_records_calls() {
        let tracker = universe(5)
            .with_query("all", ["1", "2", "3", "4", "5"])
            .with_page_size(2);

        let issues = tracker.search("all", &ExclusionPolicy::default()).unwrap();

        assert_eq!(issues.len(), 5);
        assert_eq!(tracker.calls().len(), 3);
        assert_eq!(tracker.queries_run(), vec!["all".to_string()]);
    }

    #[test]
    fn test_missing_icon_is_not_found() {
        let tracker = InMemoryTracker::new();
        let err = tracker.fetch_icon("https://icons/none.png").unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(tracker.icon_fetches(), vec!["https://icons/none.png".to_string()]);
    }
}
