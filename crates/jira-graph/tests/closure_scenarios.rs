//! Resolution scenarios over the in-memory tracker
//!
//! Drives seed search, closure, icons and graph building the way a report run
//! does, without any network.

use jira_graph::domain::{ExclusionPolicy, Issue};
use jira_graph::tracker::{Icon, InMemoryTracker};
use jira_graph::{build_graph, ClosureResolver, IconMap, IconResolver, IssueStore};

const AVATAR: &str = "https://tracker/secure/projectavatar?pid=1";

fn issue(id: &str, status: &str) -> Issue {
    Issue::new(id, format!("P-{}", id), format!("Issue {}", id), status)
        .with_project("P", [("32x32", AVATAR)])
}

fn edges(store: &IssueStore) -> Vec<(String, String)> {
    build_graph(store, &IconMap::new(), "https://tracker")
        .edges
        .into_iter()
        .map(|edge| (edge.data.source, edge.data.target))
        .collect()
}

#[test]
fn test_chain_resolves_in_two_passes() {
    let tracker = InMemoryTracker::new()
        .with_issues(vec![
            issue("A", "Open").with_outward_link("C"),
            issue("B", "Open"),
            issue("C", "Open").with_outward_link("D"),
            issue("D", "Open"),
        ])
        .with_query("sprint = 7", ["A", "B"]);
    let policy = ExclusionPolicy::default();
    let resolver = ClosureResolver::new(&tracker, &policy);

    let mut store = resolver.seed("sprint = 7").unwrap();
    let closure = resolver.resolve(&mut store).unwrap();

    let mut ids: Vec<&str> = store.ids().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
    assert_eq!(closure.passes, 2);
    assert!(closure.unresolved.is_empty());
    assert_eq!(
        edges(&store),
        vec![
            ("A".to_string(), "C".to_string()),
            ("C".to_string(), "D".to_string())
        ]
    );
}

#[test]
fn test_inward_link_points_at_owner() {
    let tracker = InMemoryTracker::new()
        .with_issues(vec![issue("A", "Open").with_inward_link("B"), issue("B", "Open")])
        .with_query("q", ["A"]);
    let policy = ExclusionPolicy::default();
    let resolver = ClosureResolver::new(&tracker, &policy);

    let mut store = resolver.seed("q").unwrap();
    resolver.resolve(&mut store).unwrap();

    assert_eq!(edges(&store), vec![("B".to_string(), "A".to_string())]);
}

#[test]
fn test_excluded_link_target_is_dropped() {
    let tracker = InMemoryTracker::new()
        .with_issues(vec![
            issue("A", "Open").with_outward_link("X"),
            issue("X", "Closed").with_outward_link("Y"),
            issue("Y", "Open"),
        ])
        .with_query("q", ["A"]);
    let policy = ExclusionPolicy::new(["closed"]);
    let resolver = ClosureResolver::new(&tracker, &policy);

    let mut store = resolver.seed("q").unwrap();
    let closure = resolver.resolve(&mut store).unwrap();

    assert!(!store.contains("X"));
    // Y is only reachable through X
    assert!(!store.contains("Y"));
    assert!(closure.unresolved.contains("X"));
    assert!(edges(&store).is_empty());
}

#[test]
fn test_excluded_seed_issue_is_dropped() {
    let tracker = InMemoryTracker::new()
        .with_issues(vec![issue("A", "Open"), issue("B", "Resolved")])
        .with_query("q", ["A", "B"]);
    let policy = ExclusionPolicy::new(["Resolved"]);

    let store = ClosureResolver::new(&tracker, &policy).seed("q").unwrap();

    assert_eq!(store.ids().collect::<Vec<_>>(), vec!["A"]);
}

#[test]
fn test_shared_icon_has_one_entry() {
    let tracker = InMemoryTracker::new()
        .with_issues(vec![issue("A", "Open").with_outward_link("B"), issue("B", "Open")])
        .with_query("q", ["A"])
        .with_icon(AVATAR, Icon::new("image/png", b"png".to_vec()));
    let policy = ExclusionPolicy::default();
    let resolver = ClosureResolver::new(&tracker, &policy);
    let mut store = resolver.seed("q").unwrap();
    resolver.resolve(&mut store).unwrap();

    let icons = IconResolver::new(4).resolve(&tracker, store.all());
    let elements = build_graph(&store, &icons, "https://tracker");

    assert_eq!(tracker.icon_fetches(), vec![AVATAR.to_string()]);
    assert_eq!(icons.keys().filter(|key| !key.is_empty()).count(), 1);
    assert_eq!(elements.nodes[0].data.icon, icons[AVATAR]);
    assert_eq!(elements.nodes[1].data.icon, icons[AVATAR]);
}

#[test]
fn test_paged_seed_and_cycles() {
    let tracker = InMemoryTracker::new()
        .with_issues(vec![
            issue("1", "Open").with_outward_link("2"),
            issue("2", "Open").with_outward_link("3"),
            issue("3", "Open").with_outward_link("1"),
        ])
        .with_query("q", ["1", "2"])
        .with_page_size(1);
    let policy = ExclusionPolicy::default();
    let resolver = ClosureResolver::new(&tracker, &policy);

    let mut store = resolver.seed("q").unwrap();
    let closure = resolver.resolve(&mut store).unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(closure.passes, 1);
    assert_eq!(edges(&store).len(), 3);
    assert_eq!(tracker.queries_run(), vec!["q".to_string(), "id in (3)".to_string()]);
}
