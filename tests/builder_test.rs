//! Tests for TreeBuilder

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rstest::rstest;

use kbtree::domain::{
    build_tree, CategoryForest, CategoryRecord, Procedure, ProcedureLink, StructuralWarning,
    TreeBuilder,
};

fn ids_in(forest: &CategoryForest) -> Vec<String> {
    forest.iter().map(|(_, n)| n.record.id.clone()).collect()
}

fn child_ids_of<'a>(forest: &'a CategoryForest, id: &str) -> Vec<&'a str> {
    let node = forest.find(id).expect("node exists");
    node.children
        .iter()
        .filter_map(|&c| forest.get_node(c))
        .map(|n| n.record.id.as_str())
        .collect()
}

#[test]
fn given_parent_with_two_children_when_building_then_children_ordered_by_importance() {
    // Arrange
    let records = vec![
        CategoryRecord::new("A", "a").with_importance(1),
        CategoryRecord::new("B", "b").with_parent("A").with_importance(5),
        CategoryRecord::new("C", "c").with_parent("A").with_importance(2),
    ];

    // Act
    let forest = build_tree(&records);

    // Assert
    assert_eq!(forest.root_ids(), vec!["A"]);
    assert_eq!(child_ids_of(&forest, "A"), vec!["B", "C"]);
    assert!(forest.warnings().is_empty());
}

#[test]
fn given_equal_importance_when_building_then_title_breaks_tie() {
    let records = vec![
        CategoryRecord::new("r", "root"),
        CategoryRecord::new("z", "Billing").with_parent("r").with_importance(3),
        CategoryRecord::new("y", "Accounts").with_parent("r").with_importance(3),
        CategoryRecord::new("x", "Urgent").with_parent("r").with_importance(9),
    ];

    let forest = build_tree(&records);

    assert_eq!(child_ids_of(&forest, "r"), vec!["x", "y", "z"]);
}

#[test]
fn given_roots_when_building_then_roots_are_ordered_like_siblings() {
    let records = vec![
        CategoryRecord::new("low", "Low"),
        CategoryRecord::new("high", "High").with_importance(10),
        CategoryRecord::new("mid", "Mid").with_importance(5),
    ];

    let forest = build_tree(&records);

    assert_eq!(forest.root_ids(), vec!["high", "mid", "low"]);
}

#[test]
fn given_self_parented_record_when_building_then_single_root_with_warning() {
    let records = vec![CategoryRecord::new("X", "x").with_parent("X")];

    let forest = build_tree(&records);

    assert_eq!(forest.root_ids(), vec!["X"]);
    assert!(child_ids_of(&forest, "X").is_empty());
    assert_eq!(
        forest.warnings(),
        &[StructuralWarning::SelfParent {
            category: "X".into()
        }]
    );
}

#[test]
fn given_dangling_parent_when_building_then_record_is_root() {
    let records = vec![
        CategoryRecord::new("A", "a"),
        CategoryRecord::new("orphan", "orphan").with_parent("gone"),
    ];

    let forest = build_tree(&records);

    let mut roots = forest.root_ids();
    roots.sort();
    assert_eq!(roots, vec!["A", "orphan"]);
    assert!(matches!(
        &forest.warnings()[0],
        StructuralWarning::DanglingParent { category, parent } if category == "orphan" && parent == "gone"
    ));
}

#[rstest]
#[case::two_cycle(&[("A", "B"), ("B", "A")])]
#[case::three_cycle(&[("A", "B"), ("B", "C"), ("C", "A")])]
#[case::cycle_with_tail(&[("A", "B"), ("B", "A"), ("T", "A")])]
#[case::two_cycles(&[("A", "B"), ("B", "A"), ("C", "D"), ("D", "C")])]
fn given_cycle_when_building_then_terminates_and_covers_every_record(
    #[case] edges: &[(&str, &str)],
) {
    // Arrange
    let records: Vec<CategoryRecord> = edges
        .iter()
        .map(|(id, parent)| CategoryRecord::new(*id, id.to_lowercase()).with_parent(*parent))
        .collect();

    // Act
    let forest = build_tree(&records);

    // Assert: every id exactly once
    let mut seen: HashMap<String, usize> = HashMap::new();
    for id in ids_in(&forest) {
        *seen.entry(id).or_default() += 1;
    }
    assert_eq!(seen.len(), records.len());
    assert!(seen.values().all(|&n| n == 1));
    assert!(!forest.roots().is_empty());
    assert!(forest
        .warnings()
        .iter()
        .any(|w| matches!(w, StructuralWarning::Cycle { .. })));
}

#[test]
fn given_two_cycle_when_building_then_first_record_becomes_root() {
    let records = vec![
        CategoryRecord::new("A", "a").with_parent("B"),
        CategoryRecord::new("B", "b").with_parent("A"),
    ];

    let forest = build_tree(&records);

    assert_eq!(forest.root_ids(), vec!["A"]);
    assert_eq!(child_ids_of(&forest, "A"), vec!["B"]);
}

#[test]
fn given_duplicate_ids_when_building_then_first_record_wins() {
    let records = vec![
        CategoryRecord::new("A", "first"),
        CategoryRecord::new("A", "second"),
    ];

    let forest = build_tree(&records);

    assert_eq!(forest.len(), 1);
    assert_eq!(forest.find("A").map(|n| n.record.title.as_str()), Some("first"));
    assert_eq!(
        forest.warnings(),
        &[StructuralWarning::DuplicateId {
            category: "A".into()
        }]
    );
}

#[test]
fn given_mixed_inconsistencies_when_building_then_every_record_appears_once() {
    let records = vec![
        CategoryRecord::new("root", "root"),
        CategoryRecord::new("a", "a").with_parent("root"),
        CategoryRecord::new("b", "b").with_parent("c"),
        CategoryRecord::new("c", "c").with_parent("b"),
        CategoryRecord::new("d", "d").with_parent("d"),
        CategoryRecord::new("e", "e").with_parent("missing"),
        CategoryRecord::new("f", "f").with_parent("b"),
    ];

    let forest = build_tree(&records);

    let mut ids = ids_in(&forest);
    ids.sort();
    assert_eq!(ids, vec!["a", "b", "c", "d", "e", "f", "root"]);
    assert_eq!(forest.len(), 7);
}

#[test]
fn given_procedure_links_when_building_then_active_procedures_attached_once() {
    let records = vec![
        CategoryRecord::new("A", "a"),
        CategoryRecord::new("B", "b").with_parent("A"),
    ];
    let reset = Procedure::new("P1", "Reset password");
    let links = vec![
        ProcedureLink::hydrated(reset.clone(), "B"),
        ProcedureLink::hydrated(reset, "B"),
        ProcedureLink::hydrated(Procedure::new("P2", "Archived").inactive(), "B"),
        ProcedureLink::new("P3", "B"),
        ProcedureLink::hydrated(Procedure::new("P4", "Escalate"), "A"),
    ];

    let forest = TreeBuilder::new()
        .with_procedure_links(&links)
        .build(&records);

    let b = forest.find("B").expect("B exists");
    let titles: Vec<_> = b.procedures.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(titles, vec!["P1"]);
    let a = forest.find("A").expect("A exists");
    assert_eq!(a.procedures.len(), 1);
}

#[test]
fn given_forest_when_serializing_nodes_then_children_nested() {
    let records = vec![
        CategoryRecord::new("A", "a"),
        CategoryRecord::new("B", "b").with_parent("A"),
    ];

    let nodes = build_tree(&records).to_nodes();
    let json = serde_json::to_value(&nodes).unwrap();

    assert_eq!(json[0]["id"], "A");
    assert_eq!(json[0]["children"][0]["id"], "B");
}

#[test]
fn given_empty_snapshot_when_building_then_empty_forest() {
    let forest = build_tree(&[]);

    assert!(forest.is_empty());
    assert!(forest.warnings().is_empty());
}

/// Linear parent chain `c0 <- c1 <- ... <- c{n-1}`, listed leaf first.
fn deep_chain(n: usize) -> Vec<CategoryRecord> {
    (0..n)
        .rev()
        .map(|i| {
            let record = CategoryRecord::new(format!("c{i}"), format!("level {i}"));
            if i == 0 {
                record
            } else {
                record.with_parent(format!("c{}", i - 1))
            }
        })
        .collect()
}

#[test]
fn given_ten_thousand_level_chain_when_building_then_finishes_quickly() {
    // Arrange
    let records = deep_chain(10_000);

    // Act
    let started = Instant::now();
    let forest = build_tree(&records);
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(forest.len(), 10_000);
    assert_eq!(forest.root_ids(), vec!["c0"]);
    assert!(forest.warnings().is_empty());
    assert!(
        elapsed < Duration::from_secs(2),
        "building a 10k chain took {elapsed:?}"
    );
}

#[test]
fn given_ring_of_ten_thousand_when_building_then_first_record_demoted_once() {
    let n = 10_000;
    let records: Vec<CategoryRecord> = (0..n)
        .map(|i| CategoryRecord::new(format!("r{i}"), "ring").with_parent(format!("r{}", (i + 1) % n)))
        .collect();

    let started = Instant::now();
    let forest = build_tree(&records);

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(forest.root_ids(), vec!["r0"]);
    assert_eq!(forest.depth(), n);
    match forest.warnings() {
        [StructuralWarning::Cycle { category, chain }] => {
            assert_eq!(category, "r0");
            assert_eq!(chain.len(), n - 1);
            assert_eq!(chain.first().map(String::as_str), Some("r1"));
        }
        other => panic!("expected one cycle warning, got {other:?}"),
    }
}

#[test]
fn given_deep_chain_when_materializing_nodes_then_no_stack_overflow() {
    // Arrange
    let n = 20_000;
    let forest = build_tree(&deep_chain(n));

    // Act
    let nodes = forest.to_nodes();

    // Assert: walk the nested view without recursion
    assert_eq!(forest.depth(), n);
    let mut levels = 0;
    let mut current = nodes.first();
    while let Some(node) = current {
        levels += 1;
        assert!(node.children.len() <= 1);
        current = node.children.first();
    }
    assert_eq!(levels, n);
    assert_eq!(forest.leaf_ids(), vec![format!("c{}", n - 1)]);
}
