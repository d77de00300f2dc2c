//! Branch and path resolution over a category snapshot.
//!
//! Every traversal here carries a visited set, so a parent cycle in the
//! snapshot can never cause non-termination.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{instrument, warn};

use crate::domain::entities::{CategoryId, CategoryRecord, Procedure, ProcedureId, ProcedureLink, Viewer};
use crate::domain::error::StructuralWarning;

/// A best-effort result together with the inconsistencies met on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub warnings: Vec<StructuralWarning>,
}

impl<T> Resolved<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

/// Ids of `root_id` and all of its descendants, in depth-first order.
///
/// Children are derived by scanning `parent_id` of every record; only the
/// first record per id counts. Returns an empty list if `root_id` is not in
/// the snapshot.
#[instrument(level = "debug", skip(records))]
pub fn descendant_ids(records: &[CategoryRecord], root_id: &str) -> Vec<CategoryId> {
    if !records.iter().any(|r| r.id == root_id) {
        return Vec::new();
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(records.len());
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            continue;
        }
        if let Some(parent) = record.parent_id.as_deref() {
            if parent != record.id {
                children.entry(parent).or_default().push(record.id.as_str());
            }
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut result = Vec::new();
    let mut stack = vec![root_id];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        result.push(current.to_string());
        if let Some(kids) = children.get(current) {
            for &child in kids.iter().rev() {
                if !visited.contains(child) {
                    stack.push(child);
                }
            }
        }
    }
    result
}

/// Active procedures among `links`, each listed once, sorted by title then id.
///
/// Links whose procedure was not hydrated are skipped.
pub fn collect_procedures(links: &[ProcedureLink]) -> Vec<Procedure> {
    let mut unique: BTreeMap<&ProcedureId, &Procedure> = BTreeMap::new();
    for link in links {
        if let Some(procedure) = link.active_procedure() {
            unique.entry(&procedure.id).or_insert(procedure);
        }
    }
    let mut procedures: Vec<Procedure> = unique.into_values().cloned().collect();
    procedures.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
    procedures
}

/// Ancestor chain of `category_id`, root first, ending with the category itself.
///
/// Stops at a missing parent, a parent that does not exist in the snapshot,
/// or a parent already on the path. Empty if the category does not exist.
#[instrument(level = "debug", skip(records))]
pub fn category_path(records: &[CategoryRecord], category_id: &str) -> Resolved<Vec<CategoryRecord>> {
    let mut index: HashMap<&str, &CategoryRecord> = HashMap::with_capacity(records.len());
    for record in records {
        index.entry(record.id.as_str()).or_insert(record);
    }

    let mut resolved = Resolved::new(Vec::new());
    let Some(start) = index.get(category_id).copied() else {
        return resolved;
    };

    let mut path: Vec<&CategoryRecord> = vec![start];
    let mut visited: HashSet<&str> = HashSet::from([start.id.as_str()]);
    let mut current = start;

    while let Some(parent_id) = current.parent_id.as_deref() {
        if !visited.insert(parent_id) {
            let warning = if parent_id == current.id {
                StructuralWarning::SelfParent {
                    category: current.id.clone(),
                }
            } else {
                StructuralWarning::Cycle {
                    category: current.id.clone(),
                    chain: path.iter().rev().map(|r| r.id.clone()).collect(),
                }
            };
            warn!("{}", warning);
            resolved.warnings.push(warning);
            break;
        }
        match index.get(parent_id) {
            Some(&parent) => {
                path.push(parent);
                current = parent;
            }
            None => {
                let warning = StructuralWarning::DanglingParent {
                    category: current.id.clone(),
                    parent: parent_id.to_string(),
                };
                warn!("{}", warning);
                resolved.warnings.push(warning);
                break;
            }
        }
    }

    resolved.value = path.into_iter().rev().cloned().collect();
    resolved
}

/// Records the viewer may see.
///
/// A record is visible if the viewer can see it and every ancestor on its
/// resolved path, so hiding a category hides its whole branch. Admins see
/// the snapshot unchanged.
#[instrument(level = "debug", skip(records))]
pub fn filter_visible(records: &[CategoryRecord], viewer: &Viewer) -> Vec<CategoryRecord> {
    if viewer.is_admin() {
        return records.to_vec();
    }

    let index: HashMap<&str, &CategoryRecord> = records
        .iter()
        .rev()
        .map(|r| (r.id.as_str(), r))
        .collect();
    let mut memo: HashMap<&str, bool> = HashMap::with_capacity(records.len());

    records
        .iter()
        .filter(|&record| is_visible(record, viewer, &index, &mut memo))
        .cloned()
        .collect()
}

fn is_visible<'a>(
    record: &'a CategoryRecord,
    viewer: &Viewer,
    index: &HashMap<&'a str, &'a CategoryRecord>,
    memo: &mut HashMap<&'a str, bool>,
) -> bool {
    // Walk up until a decided ancestor, a hidden record or the root
    let mut chain: Vec<&str> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut current = Some(record);
    let mut verdict = true;

    while let Some(node) = current {
        if let Some(&known) = memo.get(node.id.as_str()) {
            verdict = known;
            break;
        }
        if !visited.insert(node.id.as_str()) {
            break;
        }
        if !viewer.can_see(node) {
            verdict = false;
            chain.push(node.id.as_str());
            break;
        }
        chain.push(node.id.as_str());
        current = node
            .parent_id
            .as_deref()
            .and_then(|p| index.get(p).copied());
    }

    for id in chain {
        memo.insert(id, verdict);
    }
    memo.get(record.id.as_str()).copied().unwrap_or(verdict)
}
