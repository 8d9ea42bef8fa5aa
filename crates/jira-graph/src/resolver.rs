//! Transitive link closure.
//!
//! Starting from the issues matched by the seed query, every issue referenced
//! by a link is fetched as well, even when it would not match the seed query
//! itself, so the rendered graph has no dangling edges.
//!
//! Resolution is a frontier loop over an owned store:
//!
//! 1. collect link targets that are neither stored nor known to be unresolvable
//! 2. stop when that frontier is empty
//! 3. fetch the whole frontier with `id in (...)` queries
//! 4. insert what came back; frontier ids still missing become unresolvable
//!
//! Each pass moves every frontier id into the store or into the unresolved
//! set, and neither set shrinks, so the loop terminates after at most as many
//! passes as there are distinct ids in the tracker.

use crate::domain::ExclusionPolicy;
use crate::errors::TrackerError;
use crate::store::IssueStore;
use crate::tracker::IssueTracker;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Default number of ids per `id in (...)` query.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Summary of a finished closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    /// Link targets that were requested but never returned: excluded by
    /// status, invisible to the account, or deleted.
    pub unresolved: BTreeSet<String>,
    /// Number of fetch passes performed.
    pub passes: usize,
    /// Issues added to the store by the closure (seed issues not counted).
    pub fetched: usize,
}

/// Resolves link targets against a tracker.
pub struct ClosureResolver<'a, T: IssueTracker> {
    tracker: &'a T,
    policy: &'a ExclusionPolicy,
    batch_size: usize,
}

impl<'a, T: IssueTracker> ClosureResolver<'a, T> {
    pub fn new(tracker: &'a T, policy: &'a ExclusionPolicy) -> Self {
        Self {
            tracker,
            policy,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Split large frontiers into several queries of at most `batch_size` ids.
    ///
    /// All queries of a pass complete before the next discovery scan.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run the seed query into a fresh store.
    pub fn seed(&self, jql: &str) -> Result<IssueStore, TrackerError> {
        let store: IssueStore = self.tracker.search(jql, self.policy)?.into_iter().collect();
        info!(issues = store.len(), "seed query matched");
        Ok(store)
    }

    /// Grow `store` until every link target is stored or known unresolvable.
    ///
    /// Any tracker failure aborts the closure; the store may then hold a
    /// partial result and must not be rendered.
    pub fn resolve(&self, store: &mut IssueStore) -> Result<Closure, TrackerError> {
        let mut closure = Closure::default();

        loop {
            let frontier = missing_targets(store, &closure.unresolved);
            if frontier.is_empty() {
                break;
            }
            closure.passes += 1;
            debug!(
                pass = closure.passes,
                missing = frontier.len(),
                "fetching missing link targets"
            );

            let ids: Vec<&str> = frontier.iter().map(String::as_str).collect();
            let mut inserted = 0;
            for batch in ids.chunks(self.batch_size) {
                for issue in self.tracker.search_by_ids(batch, self.policy)? {
                    if store.put(issue) {
                        inserted += 1;
                    }
                }
            }
            closure.fetched += inserted;

            let missing: Vec<String> = frontier
                .into_iter()
                .filter(|id| !store.contains(id))
                .collect();
            if !missing.is_empty() {
                debug!(pass = closure.passes, ids = ?missing, "link targets not returned");
            }
            closure.unresolved.extend(missing);

            info!(
                pass = closure.passes,
                inserted,
                stored = store.len(),
                "closure pass complete"
            );
        }

        if !closure.unresolved.is_empty() {
            warn!(
                count = closure.unresolved.len(),
                "some linked issues are excluded or not visible and will not be drawn"
            );
        }
        Ok(closure)
    }
}

/// Link targets of stored issues that are neither stored nor in `skip`.
pub fn missing_targets(store: &IssueStore, skip: &BTreeSet<String>) -> BTreeSet<String> {
    store
        .all()
        .iter()
        .flat_map(|issue| issue.link_targets())
        .filter(|id| !store.contains(id) && !skip.contains(*id))
        .map(str::to_string)
        .collect()
}


// Include property-based tests
#[cfg(test)]
#[path = "resolver_proptests.rs"]
mod proptests;
