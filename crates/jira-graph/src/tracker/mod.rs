//! Issue tracker abstraction.
//!
//! The `IssueTracker` trait is the seam between graph resolution and the
//! tracker's transport. Implementors only answer single-page searches and
//! icon downloads; pagination, consistency checks and status exclusion are
//! shared provided methods so every backend behaves the same way.

use crate::domain::{ExclusionPolicy, Issue, SearchPage};
use crate::errors::TrackerError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

pub mod http;
pub mod memory;

pub use http::JiraClient;
pub use memory::InMemoryTracker;

/// Content type assumed when the icon response does not declare one.
const FALLBACK_ICON_TYPE: &str = "application/octet-stream";

/// Raw image returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl Icon {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Inline `data:` URI. Content-type parameters such as `charset` are dropped.
    pub fn to_data_uri(&self) -> String {
        let mime = self
            .content_type
            .split(';')
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(FALLBACK_ICON_TYPE);
        format!("data:{};base64,{}", mime, STANDARD.encode(&self.bytes))
    }
}

/// Query expression selecting a set of issues by id.
///
/// ```
/// assert_eq!(jira_graph::tracker::id_set_expression(&["10", "12"]), "id in (10,12)");
/// ```
pub fn id_set_expression<S: AsRef<str>>(ids: &[S]) -> String {
    let joined = ids.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
    format!("id in ({})", joined)
}

/// Source of issues and icons.
///
/// Implementations must be `Sync`: icons are fetched from several threads.
pub trait IssueTracker: Sync {
    /// Fetch the page of `jql` results starting at offset `start_at`.
    fn search_page(&self, jql: &str, start_at: u64) -> Result<SearchPage, TrackerError>;

    /// Download the image at `url`.
    fn fetch_icon(&self, url: &str) -> Result<Icon, TrackerError>;

    /// Run `jql` across every page and drop issues the policy excludes.
    ///
    /// Pages are requested sequentially. Inconsistent pagination metadata is
    /// reported as [`TrackerError::MalformedResponse`] since continuing could
    /// loop forever or silently skip issues.
    fn search(&self, jql: &str, policy: &ExclusionPolicy) -> Result<Vec<Issue>, TrackerError> {
        let mut issues = Vec::new();
        let mut start_at = 0;
        let mut reported_total = None;

        loop {
            let page = self.search_page(jql, start_at)?;
            check_page(jql, start_at, reported_total, &page)?;
            reported_total = Some(page.total);

            let has_more = page.has_more();
            let next_start_at = page.next_start_at();
            let batch = page.issues.unwrap_or_default();
            debug!(
                jql,
                start_at,
                total = page.total,
                returned = batch.len(),
                "fetched search page"
            );

            for issue in batch {
                if policy.admits(&issue) {
                    issues.push(issue);
                } else {
                    debug!(
                        id = %issue.id,
                        status = issue.status_name().unwrap_or("-"),
                        "dropping excluded issue"
                    );
                }
            }

            if !has_more {
                break;
            }
            start_at = next_start_at;
        }

        Ok(issues)
    }

    /// Fetch a set of issues by id in a single query.
    fn search_by_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
        policy: &ExclusionPolicy,
    ) -> Result<Vec<Issue>, TrackerError>
    where
        Self: Sized,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.search(&id_set_expression(ids), policy)
    }
}

fn check_page(
    jql: &str,
    requested: u64,
    reported_total: Option<u64>,
    page: &SearchPage,
) -> Result<(), TrackerError> {
    let malformed = |reason: String| TrackerError::MalformedResponse {
        operation: format!("search '{}'", jql),
        reason,
    };

    if page.start_at != requested {
        return Err(malformed(format!(
            "requested startAt {} but page starts at {}",
            requested, page.start_at
        )));
    }
    if let Some(previous) = reported_total {
        if page.total < previous {
            return Err(malformed(format!(
                "reported total decreased from {} to {}",
                previous, page.total
            )));
        }
    }
    if page.max_results == 0 && page.total > page.start_at {
        return Err(malformed(format!(
            "page size is 0 with {} of {} results remaining",
            page.total - page.start_at,
            page.total
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned pages in order, ignoring the query.
    struct ScriptedTracker {
        pages: Mutex<Vec<SearchPage>>,
    }

    impl ScriptedTracker {
        fn new(mut pages: Vec<SearchPage>) -> Self {
            pages.reverse();
            Self {
                pages: Mutex::new(pages),
            }
        }
    }

    impl IssueTracker for ScriptedTracker {
        fn search_page(&self, _jql: &str, _start_at: u64) -> Result<SearchPage, TrackerError> {
            Ok(self.pages.lock().unwrap().pop().expect("no more scripted pages"))
        }

        fn fetch_icon(&self, url: &str) -> Result<Icon, TrackerError> {
            Err(TrackerError::Transport {
                operation: url.to_string(),
                reason: "not scripted".to_string(),
            })
        }
    }

    fn page(start_at: u64, max_results: u64, total: u64, ids: &[&str]) -> SearchPage {
        SearchPage {
            start_at,
            max_results,
            total,
            issues: Some(
                ids.iter()
                    .map(|id| Issue::new(*id, format!("P-{}", id), "s", "Open"))
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_search_follows_pagination() {
        let tracker = ScriptedTracker::new(vec![
            page(0, 2, 5, &["1", "2"]),
            page(2, 2, 5, &["3", "4"]),
            page(4, 2, 5, &["5"]),
        ]);

        let issues = tracker.search("project = P", &ExclusionPolicy::default()).unwrap();

        let ids: Vec<_> = issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_search_rejects_decreasing_total() {
        let tracker = ScriptedTracker::new(vec![page(0, 2, 5, &["1", "2"]), page(2, 2, 3, &["3"])]);

        let err = tracker
            .search("project = P", &ExclusionPolicy::default())
            .unwrap_err();

        assert!(matches!(err, TrackerError::MalformedResponse { .. }));
        assert!(err.to_string().contains("decreased"));
    }

    #[test]
    fn test_search_rejects_zero_page_size_with_remaining_results() {
        let tracker = ScriptedTracker::new(vec![page(0, 0, 3, &[])]);

        let err = tracker
            .search("project = P", &ExclusionPolicy::default())
            .unwrap_err();

        assert!(matches!(err, TrackerError::MalformedResponse { .. }));
    }

    #[test]
    fn test_search_rejects_unexpected_offset() {
        let tracker = ScriptedTracker::new(vec![page(0, 2, 4, &["1", "2"]), page(0, 2, 4, &["1", "2"])]);

        let err = tracker
            .search("project = P", &ExclusionPolicy::default())
            .unwrap_err();

        assert!(err.to_string().contains("startAt"));
    }

    #[test]
    fn test_search_applies_exclusion_policy() {
        let mut first = page(0, 10, 2, &["1"]);
        first
            .issues
            .as_mut()
            .unwrap()
            .push(Issue::new("2", "P-2", "done", "Closed"));
        let tracker = ScriptedTracker::new(vec![first]);

        let issues = tracker
            .search("project = P", &ExclusionPolicy::new(["closed"]))
            .unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "1");
    }

    #[test]
    fn test_empty_result_page() {
        let tracker = ScriptedTracker::new(vec![SearchPage {
            start_at: 0,
            max_results: 50,
            total: 0,
            issues: None,
        }]);

        let issues = tracker.search("project = P", &ExclusionPolicy::default()).unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_icon_data_uri_strips_parameters() {
        let icon = Icon::new("image/png; charset=binary", vec![1u8, 2, 3]);
        assert_eq!(icon.to_data_uri(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_icon_data_uri_without_content_type() {
        let icon = Icon::new("", b"x".to_vec());
        assert_eq!(icon.to_data_uri(), "data:application/octet-stream;base64,eA==");
    }
}
