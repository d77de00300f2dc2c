//! Tests for HierarchyService

use std::sync::Arc;

use kbtree::application::services::HierarchyService;
use kbtree::domain::{CategoryRecord, Procedure, ProcedureLink, StructuralWarning, Viewer};
use kbtree::infrastructure::store::{CatalogDocument, InMemoryStore};
use kbtree::util::testing;

/// Support catalog: two top-level areas, one restricted to a district.
fn catalog() -> CatalogDocument {
    CatalogDocument::new(
        vec![
            CategoryRecord::new("A", "Accounts").with_importance(1),
            CategoryRecord::new("B", "Billing").with_parent("A").with_importance(5),
            CategoryRecord::new("C", "Cards").with_parent("A").with_importance(2),
            CategoryRecord::new("N", "North desk").with_districts(["north"]),
            CategoryRecord::new("N1", "Field visits").with_parent("N"),
            CategoryRecord::new("old", "Legacy").with_active(false),
        ],
        vec![
            Procedure::new("P1", "Reset password"),
            Procedure::new("P2", "Refund"),
            Procedure::new("P3", "Site visit"),
            Procedure::new("P4", "Fax form").inactive(),
        ],
        vec![
            ProcedureLink::new("P1", "B"),
            ProcedureLink::new("P1", "C"),
            ProcedureLink::new("P2", "C"),
            ProcedureLink::new("P3", "N1"),
            ProcedureLink::new("P4", "A"),
        ],
    )
}

fn service(document: CatalogDocument) -> HierarchyService {
    testing::init_test_setup();
    HierarchyService::new(Arc::new(InMemoryStore::new(document)))
}

#[test]
fn given_catalog_when_building_tree_as_member_then_restricted_branches_hidden() {
    // Arrange
    let service = service(catalog());

    // Act
    let forest = service.tree(&Viewer::default()).unwrap();

    // Assert
    assert_eq!(forest.root_ids(), vec!["A"]);
    let a = forest.find("A").unwrap();
    let children: Vec<_> = a
        .children
        .iter()
        .filter_map(|&c| forest.get_node(c))
        .map(|n| n.record.id.as_str())
        .collect();
    assert_eq!(children, vec!["B", "C"]);
    assert!(forest.find("N1").is_none());
}

#[test]
fn given_district_member_when_building_tree_then_district_branch_visible() {
    let service = service(catalog());

    let forest = service.tree(&Viewer::member(["north"])).unwrap();

    assert!(forest.find("N").is_some());
    assert!(forest.find("N1").is_some());
    assert!(forest.find("old").is_none());
}

#[test]
fn given_admin_when_building_tree_then_all_categories_and_procedures() {
    let service = service(catalog());

    let forest = service.tree(&Viewer::Admin).unwrap();

    assert_eq!(forest.len(), 6);
    let c = forest.find("C").unwrap();
    let procedures: Vec<_> = c.procedures.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(procedures, vec!["P2", "P1"]);
    // Inactive procedure never attached
    assert!(forest.find("A").unwrap().procedures.is_empty());
}

#[test]
fn given_procedure_linked_in_two_children_when_resolving_branch_then_listed_once() {
    let service = service(catalog());

    let resolved = service
        .procedures_in_branch("A", &Viewer::default())
        .unwrap();

    let ids: Vec<_> = resolved.value.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["P2", "P1"]);
    assert!(resolved.warnings.is_empty());
}

#[test]
fn given_hidden_root_when_resolving_branch_then_empty() {
    let service = service(catalog());

    let resolved = service
        .procedures_in_branch("N", &Viewer::member(["south"]))
        .unwrap();

    assert!(resolved.value.is_empty());
}

#[test]
fn given_unknown_root_when_resolving_branch_then_empty() {
    let service = service(catalog());

    let resolved = service.procedures_in_branch("nope", &Viewer::Admin).unwrap();

    assert!(resolved.value.is_empty());
    assert!(resolved.warnings.is_empty());
}

#[test]
fn given_nested_category_when_resolving_path_then_breadcrumb() {
    let service = service(catalog());

    let path = service.category_path("N1", &Viewer::member(["north"])).unwrap();

    let titles: Vec<_> = path.value.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["North desk", "Field visits"]);
}

#[test]
fn given_inconsistent_catalog_when_checking_then_all_problems_reported() {
    let service = service(CatalogDocument::new(
        vec![
            CategoryRecord::new("A", "a").with_parent("B"),
            CategoryRecord::new("B", "b").with_parent("A"),
            CategoryRecord::new("X", "x").with_parent("X"),
            CategoryRecord::new("D", "d").with_parent("gone"),
            CategoryRecord::new("D", "dup"),
        ],
        Vec::new(),
        Vec::new(),
    ));

    let warnings = service.check().unwrap();

    assert_eq!(warnings.len(), 4);
    assert!(warnings.contains(&StructuralWarning::SelfParent {
        category: "X".into()
    }));
    assert!(warnings.contains(&StructuralWarning::DuplicateId {
        category: "D".into()
    }));
}

#[test]
fn given_consistent_catalog_when_checking_then_no_warnings() {
    let service = service(catalog());

    assert!(service.check().unwrap().is_empty());
}
