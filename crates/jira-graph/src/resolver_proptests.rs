//! Property-based tests for link closure invariants
//!
//! Random issue universes with random links, statuses and dangling
//! references are resolved against the in-memory tracker.

use super::*;
use crate::domain::Issue;
use crate::graph::build_graph;
use crate::icons::IconMap;
use crate::tracker::InMemoryTracker;
use proptest::prelude::*;

const EXCLUDED: &str = "Closed";

#[derive(Debug, Clone)]
struct Universe {
    size: usize,
    links: Vec<Vec<usize>>,
    closed: Vec<bool>,
    seeds: Vec<usize>,
}

impl Universe {
    fn issue(&self, n: usize) -> Issue {
        let status = if self.closed[n - 1] { EXCLUDED } else { "Open" };
        self.links[n - 1].iter().fold(
            Issue::new(n.to_string(), format!("P-{}", n), format!("Issue {}", n), status),
            |issue, target| issue.with_outward_link(target.to_string()),
        )
    }

    fn tracker(&self) -> InMemoryTracker {
        let seeds: Vec<String> = self.seeds.iter().map(|n| n.to_string()).collect();
        InMemoryTracker::new()
            .with_issues((1..=self.size).map(|n| self.issue(n)))
            .with_query("seed", seeds)
            .with_page_size(3)
    }
}

// Ids above `size` exist only as link targets
fn universe_strategy() -> impl Strategy<Value = Universe> {
    (1usize..12).prop_flat_map(|size| {
        let id = 1..=size + 3;
        (
            prop::collection::vec(prop::collection::vec(id, 0..4), size),
            prop::collection::vec(prop::bool::weighted(0.25), size),
            prop::collection::vec(1..=size, 1..4),
        )
            .prop_map(move |(links, closed, seeds)| Universe {
                size,
                links,
                closed,
                seeds,
            })
    })
}

fn resolve(universe: &Universe) -> (InMemoryTracker, IssueStore, Closure) {
    let tracker = universe.tracker();
    let policy = ExclusionPolicy::new([EXCLUDED]);
    let resolver = ClosureResolver::new(&tracker, &policy).with_batch_size(2);

    let mut store = resolver.seed("seed").unwrap();
    let closure = resolver.resolve(&mut store).unwrap();
    (tracker, store, closure)
}

// Property 1: every link target is stored or known unresolvable
proptest! {
    #[test]
    fn prop_closure_is_complete(universe in universe_strategy()) {
        let (_, store, closure) = resolve(&universe);

        prop_assert!(missing_targets(&store, &closure.unresolved).is_empty());
        for id in &closure.unresolved {
            prop_assert!(!store.contains(id));
        }
    }
}

// Property 2: excluded issues never enter the store
proptest! {
    #[test]
    fn prop_excluded_issues_are_absent(universe in universe_strategy()) {
        let (_, store, _) = resolve(&universe);

        for issue in store.all() {
            prop_assert_ne!(issue.status_name(), Some(EXCLUDED));
        }
    }
}

// Property 3: passes are bounded by the number of distinct ids
proptest! {
    #[test]
    fn prop_passes_bounded(universe in universe_strategy()) {
        let (_, _, closure) = resolve(&universe);

        prop_assert!(closure.passes <= universe.size + 3);
    }
}

// Property 4: no id is requested by more than one pass
proptest! {
    #[test]
    fn prop_ids_requested_at_most_once(universe in universe_strategy()) {
        let (tracker, _, _) = resolve(&universe);

        let mut requested = BTreeSet::new();
        for query in tracker.queries_run().iter().filter(|q| q.starts_with("id in (")) {
            let list = query.trim_start_matches("id in (").trim_end_matches(')');
            for id in list.split(',') {
                prop_assert!(requested.insert(id.to_string()), "{} requested twice", id);
            }
        }
    }
}

// Property 5: the rendered graph has no dangling edges
proptest! {
    #[test]
    fn prop_graph_has_no_dangling_edges(universe in universe_strategy()) {
        let (_, store, _) = resolve(&universe);

        let elements = build_graph(&store, &IconMap::new(), "https://tracker");

        prop_assert!(elements.dangling_edges().is_empty());
        prop_assert_eq!(elements.nodes.len(), store.len());
    }
}

// Property 6: resolving a closed store is a no-op
proptest! {
    #[test]
    fn prop_resolve_is_idempotent(universe in universe_strategy()) {
        let (tracker, mut store, closure) = resolve(&universe);
        let policy = ExclusionPolicy::new([EXCLUDED]);
        let before = store.len();
        let queries = tracker.queries_run().len();

        let again = ClosureResolver::new(&tracker, &policy)
            .resolve(&mut store)
            .unwrap();

        // A fresh resolver asks once more for targets that were unresolved
        prop_assert_eq!(store.len(), before);
        prop_assert!(again.passes <= 1);
        prop_assert!(again.unresolved.is_subset(&closure.unresolved));
        prop_assert_eq!(again.fetched, 0);
        prop_assert!(tracker.queries_run().len() >= queries);
    }
}

// Reference closure: admitted issues reachable from admitted seeds
fn expected_ids(universe: &Universe) -> BTreeSet<String> {
    let admitted = |n: usize| n <= universe.size && !universe.closed[n - 1];
    let mut reached = BTreeSet::new();
    let mut queue: Vec<usize> = universe.seeds.iter().copied().filter(|&n| admitted(n)).collect();
    while let Some(n) = queue.pop() {
        if !reached.insert(n) {
            continue;
        }
        queue.extend(universe.links[n - 1].iter().copied().filter(|&m| admitted(m)));
    }
    reached.into_iter().map(|n| n.to_string()).collect()
}

// Property 7: excluded issues are transparent; nothing beyond them is reached
proptest! {
    #[test]
    fn prop_store_matches_reference_closure(universe in universe_strategy()) {
        let (_, store, _) = resolve(&universe);

        let stored: BTreeSet<String> = store.ids().map(str::to_string).collect();
        prop_assert_eq!(stored, expected_ids(&universe));
    }
}

// Property 8: inserting an id twice keeps the first record
proptest! {
    #[test]
    fn prop_store_insert_is_idempotent(ids in prop::collection::vec(1usize..6, 1..20)) {
        let mut store = IssueStore::new();
        let mut first_summary = std::collections::HashMap::new();

        for (position, n) in ids.iter().enumerate() {
            let summary = format!("seen at {}", position);
            let inserted = store.put(Issue::new(n.to_string(), "K", summary.clone(), "Open"));
            prop_assert_eq!(inserted, !first_summary.contains_key(n));
            first_summary.entry(*n).or_insert(summary);
        }

        prop_assert_eq!(store.len(), first_summary.len());
        for (n, summary) in &first_summary {
            prop_assert_eq!(store.get(&n.to_string()).unwrap().summary(), summary.as_str());
        }
    }
}
