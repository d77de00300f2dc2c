//! Tree builder: flat category records into a sorted forest.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::domain::arena::CategoryForest;
use crate::domain::entities::{CategoryId, CategoryRecord, Procedure, ProcedureLink};
use crate::domain::error::StructuralWarning;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Settled,
}

/// Constructs a category forest from a snapshot of records.
///
/// The builder never fails: dangling parents, self-parenting, cycles and
/// duplicate ids are repaired (the offending node becomes a root or is
/// dropped) and reported as [`StructuralWarning`]s on the resulting forest.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    procedures: HashMap<CategoryId, Vec<Procedure>>,
    warnings: Vec<StructuralWarning>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach directly linked active procedures to the built nodes.
    ///
    /// Links without a hydrated procedure are ignored. A procedure linked
    /// twice to the same category is listed once.
    pub fn with_procedure_links(mut self, links: &[ProcedureLink]) -> Self {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        for link in links {
            let Some(procedure) = link.active_procedure() else {
                continue;
            };
            if !seen.insert((link.category_id.as_str(), procedure.id.as_str())) {
                continue;
            }
            self.procedures
                .entry(link.category_id.clone())
                .or_default()
                .push(procedure.clone());
        }
        for list in self.procedures.values_mut() {
            list.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        }
        self
    }

    /// Build the forest.
    #[instrument(level = "debug", skip_all, fields(records = records.len()))]
    pub fn build(mut self, records: &[CategoryRecord]) -> CategoryForest {
        self.warnings.clear();

        // Index: first record per id wins
        let mut index: HashMap<&str, &CategoryRecord> = HashMap::with_capacity(records.len());
        let mut order: Vec<&CategoryRecord> = Vec::with_capacity(records.len());
        for record in records {
            if index.contains_key(record.id.as_str()) {
                self.report(StructuralWarning::DuplicateId {
                    category: record.id.clone(),
                });
                continue;
            }
            index.insert(record.id.as_str(), record);
            order.push(record);
        }

        let parents = self.resolve_parents(&order, &index);

        let mut forest = CategoryForest::new();
        let mut slots = HashMap::with_capacity(order.len());
        for &record in &order {
            let procedures = self.procedures.remove(&record.id).unwrap_or_default();
            let idx = forest.insert_node(record.clone(), procedures);
            slots.insert(record.id.as_str(), idx);
        }
        for &record in &order {
            let parent_slot = parents
                .get(record.id.as_str())
                .copied()
                .flatten()
                .and_then(|p| slots.get(p).copied());
            if let Some(&idx) = slots.get(record.id.as_str()) {
                forest.attach(idx, parent_slot);
            }
        }
        forest.sort();

        debug!(
            "built forest: {} nodes, {} roots, {} warnings",
            forest.len(),
            forest.roots().len(),
            self.warnings.len()
        );
        forest.set_warnings(std::mem::take(&mut self.warnings));
        forest
    }

    /// Effective parent per record after the consistency guard ran.
    ///
    /// Each cycle is broken by demoting its member that comes first in input
    /// order to root. Runs in time linear in the number of records.
    fn resolve_parents<'a>(
        &mut self,
        order: &[&'a CategoryRecord],
        index: &HashMap<&'a str, &'a CategoryRecord>,
    ) -> HashMap<&'a str, Option<&'a str>> {
        let mut parents: HashMap<&'a str, Option<&'a str>> = HashMap::with_capacity(order.len());

        for &record in order {
            let parent = match record.parent_id.as_deref() {
                None => None,
                Some(_) if record.is_self_parented() => {
                    self.report(StructuralWarning::SelfParent {
                        category: record.id.clone(),
                    });
                    None
                }
                Some(parent) => match index.get_key_value(parent) {
                    Some((&key, _)) => Some(key),
                    None => {
                        self.report(StructuralWarning::DanglingParent {
                            category: record.id.clone(),
                            parent: parent.to_string(),
                        });
                        None
                    }
                },
            };
            parents.insert(record.id.as_str(), parent);
        }

        // Three-state walk: every record is visited once across all walks
        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();
        let mut state: HashMap<&'a str, Visit> = HashMap::with_capacity(order.len());

        for &record in order {
            let id = record.id.as_str();
            if state.contains_key(id) {
                continue;
            }

            let mut path: Vec<&'a str> = Vec::new();
            let mut current = Some(id);
            while let Some(node) = current {
                match state.get(node).copied() {
                    Some(Visit::Settled) => break,
                    Some(Visit::InProgress) => {
                        let start = path.iter().position(|&n| n == node).unwrap_or(0);
                        self.break_cycle(&path[start..], &position, &mut parents);
                        break;
                    }
                    None => {
                        state.insert(node, Visit::InProgress);
                        path.push(node);
                        current = parents.get(node).copied().flatten();
                    }
                }
            }
            for node in path {
                state.insert(node, Visit::Settled);
            }
        }

        parents
    }

    /// Demote the cycle member that comes first in input order.
    ///
    /// `cycle` lists the members in parent order: each one's parent is the
    /// next, and the last one's parent is the first.
    fn break_cycle<'a>(
        &mut self,
        cycle: &[&'a str],
        position: &HashMap<&str, usize>,
        parents: &mut HashMap<&'a str, Option<&'a str>>,
    ) {
        let Some((at, &demoted)) = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| position.get(**id).copied().unwrap_or(usize::MAX))
        else {
            return;
        };
        let chain = cycle[at + 1..]
            .iter()
            .chain(&cycle[..at])
            .map(|s| s.to_string())
            .collect();
        self.report(StructuralWarning::Cycle {
            category: demoted.to_string(),
            chain,
        });
        parents.insert(demoted, None);
    }

    fn report(&mut self, warning: StructuralWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Build a forest from records alone.
pub fn build_tree(records: &[CategoryRecord]) -> CategoryForest {
    TreeBuilder::new().build(records)
}
