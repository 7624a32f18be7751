use quizbank_core::db::open_db_in_memory;
use quizbank_core::{
    ChildRecord, ChildSource, HierarchyService, HierarchySource, NodeId,
    SqliteHierarchyRepository, TreeSelect, TreeSelectError,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

#[derive(Debug)]
struct StubError;

impl Display for StubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "stub failure")
    }
}

impl std::error::Error for StubError {}

struct StubSource {
    children: HashMap<NodeId, Vec<ChildRecord>>,
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
            vec![ChildRecord {
                id: NodeId::Topic(10),
                label: "Sets".to_string(),
            }],
        );
        Self { children }
    }

    fn empty() -> Self {
        Self {
            children: HashMap::new(),
        }
    }
}

impl ChildSource for StubSource {
    type Error = StubError;

    fn fetch_children(&mut self, node: NodeId) -> Result<Vec<ChildRecord>, StubError> {
        Ok(self.children.get(&node).cloned().unwrap_or_default())
    }
}

#[test]
fn starts_loading_and_becomes_ready_after_init() {
    let mut select = TreeSelect::new(StubSource::new());
    assert!(select.is_loading());
    assert_eq!(select.selection(), None);
    assert!(select.is_widget_disabled());

    select.init(None).unwrap();
    assert!(!select.is_loading());
    assert_eq!(select.selection(), Some(NodeId::Root));
    assert!(!select.is_widget_disabled());
}

#[test]
fn init_keeps_the_externally_supplied_value() {
    let mut select = TreeSelect::new(StubSource::new());
    select.init(Some(NodeId::Area(2))).unwrap();
    assert_eq!(select.selection(), Some(NodeId::Area(2)));
    assert_eq!(select.widget_value(), Some(NodeId::Area(2)));
}

#[test]
fn widget_sentinel_maps_to_the_root_and_back() {
    let mut select = TreeSelect::new(StubSource::new());
    select.init(None).unwrap();

    assert_eq!(select.widget_value(), None);
    assert_eq!(
        TreeSelect::<StubSource>::from_widget(None),
        NodeId::Root
    );
    assert_eq!(
        TreeSelect::<StubSource>::from_widget(Some(NodeId::Area(1))),
        NodeId::Area(1)
    );

    select.set_value(Some(NodeId::Area(1))).unwrap();
    assert_eq!(select.widget_value(), Some(NodeId::Area(1)));
    select.set_value(None).unwrap();
    assert_eq!(select.selection(), Some(NodeId::Root));
    assert_eq!(select.widget_value(), None);
}

#[test]
fn set_value_while_loading_initializes_first() {
    let mut select = TreeSelect::new(StubSource::new());
    select.set_value(Some(NodeId::Area(1))).unwrap();
    assert!(!select.is_loading());
    assert_eq!(select.selection(), Some(NodeId::Area(1)));
}

#[test]
fn select_before_init_is_not_ready() {
    let mut select = TreeSelect::new(StubSource::new());
    let err = select.select(NodeId::Area(1)).unwrap_err();
    assert!(matches!(err, TreeSelectError::NotReady));
}

#[test]
fn select_fires_the_change_callback() {
    let seen: Rc<RefCell<Vec<NodeId>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);

    let mut select = TreeSelect::new(StubSource::new());
    select.set_on_change(Box::new(move |node| sink.borrow_mut().push(node)));
    select.init(None).unwrap();

    select.select(NodeId::Area(1)).unwrap();
    select.select(NodeId::Area(2)).unwrap();
    assert_eq!(*seen.borrow(), vec![NodeId::Area(1), NodeId::Area(2)]);
}

#[test]
fn disabled_nodes_cannot_be_selected() {
    let mut select = TreeSelect::new(StubSource::new());
    select.set_node_disabled(Box::new(|node, _| node == NodeId::Area(1)));
    select.init(None).unwrap();

    let err = select.select(NodeId::Area(1)).unwrap_err();
    assert!(matches!(err, TreeSelectError::NodeDisabled(NodeId::Area(1))));
    assert_eq!(select.selection(), Some(NodeId::Root));

    select.select(NodeId::Area(2)).unwrap();
    assert_eq!(select.selection(), Some(NodeId::Area(2)));
}

#[test]
fn unselectable_branches_stay_navigation_only() {
    let mut select = TreeSelect::new(StubSource::new());
    select.set_branch_selectable(Box::new(|_, _| false));
    select.init(None).unwrap();

    // Math has fetched children once options() ran; selecting it then fails.
    let options = select.options(NodeId::Area(1)).unwrap();
    assert_eq!(options, vec![NodeId::Topic(10)]);
    let err = select.select(NodeId::Area(1)).unwrap_err();
    assert!(matches!(
        err,
        TreeSelectError::BranchNotSelectable(NodeId::Area(1))
    ));

    // Leaves are unaffected by the branch policy.
    select.select(NodeId::Topic(10)).unwrap();
    assert_eq!(select.selection(), Some(NodeId::Topic(10)));
}

#[test]
fn selecting_an_unknown_node_is_a_tree_error() {
    let mut select = TreeSelect::new(StubSource::new());
    select.init(None).unwrap();
    let err = select.select(NodeId::Topic(999)).unwrap_err();
    assert!(matches!(err, TreeSelectError::Tree(_)));
}

#[test]
fn widget_is_disabled_when_the_root_has_no_children() {
    let mut select = TreeSelect::new(StubSource::empty());
    select.init(None).unwrap();
    assert!(!select.is_loading());
    assert!(select.is_widget_disabled());
}

#[test]
fn drives_a_selection_over_the_real_hierarchy() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteHierarchyRepository::try_new(&conn).unwrap();
    let service = HierarchyService::new(repo);

    let math = service.create_top_level_area("Math").unwrap();
    let algebra = service.create_child_area(math, "Algebra").unwrap();
    let sets = service.create_topic(math, "Sets").unwrap();

    let mut select = TreeSelect::new(HierarchySource::new(&service));
    select.init(None).unwrap();

    let roots = select.options(NodeId::Root).unwrap();
    assert_eq!(roots, vec![NodeId::Area(math)]);

    let children = select.options(NodeId::Area(math)).unwrap();
    assert_eq!(children, vec![NodeId::Area(algebra), NodeId::Topic(sets)]);

    select.select(NodeId::Topic(sets)).unwrap();
    assert_eq!(select.selection(), Some(NodeId::Topic(sets)));
    assert_eq!(
        select.cache().get_path(NodeId::Topic(sets), " / "),
        "Math / Sets"
    );
}
