//! In-memory issue store for a single run.
//!
//! The store is the single source of truth for "already fetched". It only
//! grows: inserting an id that is already present is a no-op, and nothing is
//! ever removed. Iteration follows insertion order.

use crate::domain::Issue;
use crate::errors::StoreError;
use std::collections::HashMap;

/// Insertion-ordered map from issue id to issue.
///
/// # Examples
///
/// ```
/// use jira_graph::domain::Issue;
/// use jira_graph::store::IssueStore;
///
/// let mut store = IssueStore::new();
/// assert!(store.put(Issue::new("1", "A-1", "First", "Open")));
/// assert!(!store.put(Issue::new("1", "A-1", "Changed", "Open")));
///
/// assert_eq!(store.get("1").unwrap().summary(), "First");
/// ```
#[derive(Debug, Clone, Default)]
pub struct IssueStore {
    issues: Vec<Issue>,
    index: HashMap<String, usize>,
}

impl IssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an issue unless its id is already stored.
    ///
    /// Returns `true` when the issue was inserted. The first record for an id
    /// wins; later ones are dropped since content is immutable per run.
    pub fn put(&mut self, issue: Issue) -> bool {
        if self.index.contains_key(&issue.id) {
            return false;
        }
        self.index.insert(issue.id.clone(), self.issues.len());
        self.issues.push(issue);
        true
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Result<&Issue, StoreError> {
        self.index
            .get(id)
            .map(|&pos| &self.issues[pos])
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// All issues in insertion order.
    pub fn all(&self) -> &[Issue] {
        &self.issues
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.issues.iter().map(|issue| issue.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl FromIterator<Issue> for IssueStore {
    fn from_iter<I: IntoIterator<Item = Issue>>(iter: I) -> Self {
        let mut store = IssueStore::new();
        for issue in iter {
            store.put(issue);
        }
        store
    }
}

impl Extend<Issue> for IssueStore {
    fn extend<I: IntoIterator<Item = Issue>>(&mut self, iter: I) {
        for issue in iter {
            self.put(issue);
        }
    }
}
