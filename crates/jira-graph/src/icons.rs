//! Icon resolution.
//!
//! Nodes show their project's avatar. Many issues share a project, so icon
//! references are deduplicated first and each distinct URL is downloaded once,
//! on a dedicated rayon pool of `workers` threads. A failed download only costs that
//! icon: it is logged and rendered as "no icon".

use crate::domain::Issue;
use crate::tracker::IssueTracker;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Default number of concurrent icon downloads.
pub const DEFAULT_ICON_WORKERS: usize = 8;

/// Icon reference (avatar URL, or `""` for none) to inline `data:` URI.
pub type IconMap = HashMap<String, String>;

/// Distinct non-empty icon references of `issues`.
pub fn unique_references(issues: &[Issue]) -> BTreeSet<&str> {
    issues
        .iter()
        .map(Issue::icon_reference)
        .filter(|reference| !reference.is_empty())
        .collect()
}

/// Look up the icon for an issue; unknown references render without icon.
pub fn icon_for<'m>(icons: &'m IconMap, issue: &Issue) -> &'m str {
    icons
        .get(issue.icon_reference())
        .map(String::as_str)
        .unwrap_or("")
}

pub struct IconResolver {
    workers: usize,
}

impl Default for IconResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_WORKERS)
    }
}

impl IconResolver {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Fetch every distinct icon of `issues` exactly once.
    ///
    /// The returned map always contains the empty reference mapped to an empty
    /// icon, plus one entry per distinct reference (empty on failure).
    pub fn resolve<T: IssueTracker>(&self, tracker: &T, issues: &[Issue]) -> IconMap {
        let references: Vec<&str> = unique_references(issues).into_iter().collect();
        let mut icons = IconMap::with_capacity(references.len() + 1);
        icons.insert(String::new(), String::new());
        if references.is_empty() {
            return icons;
        }

        let workers = self.workers.min(references.len());
        debug!(icons = references.len(), workers, "fetching icons");

        let fetch_all = || -> Vec<(String, String)> {
            references
                .par_iter()
                .map(|reference| (reference.to_string(), fetch_one(tracker, reference)))
                .collect()
        };
        let fetched = match ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(fetch_all),
            Err(e) => {
                warn!(error = %e, "icon worker pool unavailable, using the global pool");
                fetch_all()
            }
        };

        icons.extend(fetched);
        icons
    }
}

fn fetch_one<T: IssueTracker>(tracker: &T, reference: &str) -> String {
    match tracker.fetch_icon(reference) {
        Ok(icon) => icon.to_data_uri(),
        Err(e) => {
            warn!(icon = reference, error = %e, "icon unavailable, rendering node without it");
            String::new()
        }
    }
}
