use quizbank_core::{ChildRecord, ChildSource, NodeId, TreeCache, TreeError};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
struct StubError(String);

impl Display for StubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StubError {}

/// Scripted child source that counts fetches per node and can be told to
/// fail the next fetch.
struct StubSource {
    children: HashMap<NodeId, Vec<ChildRecord>>,
    fetch_counts: HashMap<NodeId, usize>,
    fail_next: bool,
}

impl StubSource {
    fn new() -> Self {
        let mut children = HashMap::new();
        children.insert(
            NodeId::Root,
            vec![
                ChildRecord {
                    id: NodeId::Area(1),
                    label: "Math".to_string(),
                },
                ChildRecord {
                    id: NodeId::Area(2),
                    label: "Physics".to_string(),
                },
            ],
        );
        children.insert(
            NodeId::Area(1),
            vec![
                ChildRecord {
                    id: NodeId::Area(3),
                    label: "Algebra".to_string(),
                },
                ChildRecord {
                    id: NodeId::Topic(10),
                    label: "Sets".to_string(),
                },
            ],
        );
        children.insert(
            NodeId::Area(3),
            vec![ChildRecord {
                id: NodeId::Topic(11),
                label: "Groups".to_string(),
            }],
        );
        Self {
            children,
            fetch_counts: HashMap::new(),
            fail_next: false,
        }
    }

    fn fetches(&self, node: NodeId) -> usize {
        self.fetch_counts.get(&node).copied().unwrap_or(0)
    }
}

impl ChildSource for StubSource {
    type Error = StubError;

    fn fetch_children(&mut self, node: NodeId) -> Result<Vec<ChildRecord>, StubError> {
        if self.fail_next {
            self.fail_next = false;
            return Err(StubError("backend unavailable".to_string()));
        }
        *self.fetch_counts.entry(node).or_insert(0) += 1;
        Ok(self.children.get(&node).cloned().unwrap_or_default())
    }
}

#[test]
fn children_are_fetched_once_and_memoized() {
    let mut cache = TreeCache::new(StubSource::new());

    let first = cache.get_children(NodeId::Root).unwrap().unwrap();
    let second = cache.get_children(NodeId::Root).unwrap().unwrap();

    assert_eq!(first, vec![NodeId::Area(1), NodeId::Area(2)]);
    assert_eq!(first, second);
    assert_eq!(cache.source_ref().fetches(NodeId::Root), 1);
}

#[test]
fn resolved_empty_differs_from_unresolved() {
    let mut cache = TreeCache::new(StubSource::new());
    cache.get_children(NodeId::Root).unwrap();

    assert!(!cache.is_resolved(NodeId::Area(2)));
    assert!(cache.get_children(NodeId::Area(2)).unwrap().is_none());
    assert!(cache.is_resolved(NodeId::Area(2)));
    assert!(!cache.has_children(NodeId::Area(2)));
}

#[test]
fn unknown_node_is_rejected_without_fetching() {
    let mut cache = TreeCache::new(StubSource::new());

    let err = cache.get_children(NodeId::Area(77)).unwrap_err();
    assert!(matches!(err, TreeError::UnknownNode(NodeId::Area(77))));
    assert_eq!(cache.source_ref().fetches(NodeId::Area(77)), 0);
}

#[test]
fn failed_fetch_is_not_cached_and_retries() {
    let mut source = StubSource::new();
    source.fail_next = true;
    let mut cache = TreeCache::new(source);

    let err = cache.get_children(NodeId::Root).unwrap_err();
    assert!(matches!(err, TreeError::Source(_)));
    assert!(!cache.is_resolved(NodeId::Root));

    let retried = cache.get_children(NodeId::Root).unwrap().unwrap();
    assert_eq!(retried.len(), 2);
}

#[test]
fn get_child_searches_only_direct_children_by_default() {
    let mut cache = TreeCache::new(StubSource::new());

    let direct = cache
        .get_child(NodeId::Root, |_, label| label == "Math", false)
        .unwrap();
    assert_eq!(direct, Some(NodeId::Area(1)));

    let missed = cache
        .get_child(NodeId::Root, |_, label| label == "Groups", false)
        .unwrap();
    assert_eq!(missed, None);
}

#[test]
fn get_child_recursive_descends_and_fetches_lazily() {
    let mut cache = TreeCache::new(StubSource::new());

    let found = cache
        .get_child(NodeId::Root, |_, label| label == "Groups", true)
        .unwrap();
    assert_eq!(found, Some(NodeId::Topic(11)));

    // Depth-first: the match sits under Math, so Physics is never fetched.
    assert!(cache.is_resolved(NodeId::Area(1)));
    assert!(cache.is_resolved(NodeId::Area(3)));
    assert!(!cache.is_resolved(NodeId::Area(2)));
}

#[test]
fn find_child_and_has_child_never_fetch() {
    let mut cache = TreeCache::new(StubSource::new());

    assert_eq!(cache.find_child(NodeId::Root, |_, label| label == "Math"), None);
    assert!(!cache.has_child(NodeId::Root, |_, _| true));
    assert_eq!(cache.source_ref().fetches(NodeId::Root), 0);

    cache.get_children(NodeId::Root).unwrap();
    assert_eq!(
        cache.find_child(NodeId::Root, |_, label| label == "Math"),
        Some(NodeId::Area(1))
    );
    assert!(cache.has_child(NodeId::Root, |id, _| id == NodeId::Area(2)));
    assert_eq!(cache.source_ref().fetches(NodeId::Root), 1);
}

#[test]
fn get_path_joins_labels_excluding_the_root() {
    let mut cache = TreeCache::new(StubSource::new());
    cache.get_children(NodeId::Root).unwrap();
    cache.get_children(NodeId::Area(1)).unwrap();
    cache.get_children(NodeId::Area(3)).unwrap();

    assert_eq!(cache.get_path(NodeId::Root, " / "), "");
    assert_eq!(cache.get_path(NodeId::Area(1), " / "), "Math");
    assert_eq!(
        cache.get_path(NodeId::Topic(11), " / "),
        "Math / Algebra / Groups"
    );
}

#[test]
fn parent_links_follow_the_fetch_that_produced_the_child() {
    let mut cache = TreeCache::new(StubSource::new());
    cache.get_children(NodeId::Root).unwrap();
    cache.get_children(NodeId::Area(1)).unwrap();

    assert_eq!(cache.parent(NodeId::Root), None);
    assert_eq!(cache.parent(NodeId::Area(1)), Some(NodeId::Root));
    assert_eq!(cache.parent(NodeId::Topic(10)), Some(NodeId::Area(1)));
    assert!(cache.is_root(NodeId::Root));
    assert!(!cache.is_root(NodeId::Area(1)));
}

#[test]
fn labels_and_counts_reflect_the_cached_arena() {
    let mut cache = TreeCache::new(StubSource::new());
    cache.get_children(NodeId::Root).unwrap();

    assert_eq!(cache.label(NodeId::Area(1)), Some("Math"));
    assert_eq!(cache.label(NodeId::Root), Some(""));
    assert_eq!(cache.label(NodeId::Area(77)), None);
    assert_eq!(cache.child_count(NodeId::Root), 2);
    assert_eq!(cache.child_count(NodeId::Area(1)), 0);
    assert!(cache.contains(NodeId::Area(2)));
    assert!(!cache.contains(NodeId::Topic(99)));
}
