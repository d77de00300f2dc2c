use std::collections::HashMap;

use generational_arena::{Arena, Index};
use serde::Serialize;
use termtree::Tree;
use tracing::instrument;

use crate::domain::entities::{CategoryId, CategoryRecord, Procedure};
use crate::domain::error::StructuralWarning;

/// Tree node in the arena-based category forest.
#[derive(Debug)]
pub struct ArenaNode {
    /// Source record this node mirrors
    pub record: CategoryRecord,
    /// Index of parent node in the arena, None for root nodes
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in display order
    pub children: Vec<Index>,
    /// Active procedures linked directly to this category
    pub procedures: Vec<Procedure>,
}

/// Owned, nested view of one category and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub record: CategoryRecord,
    pub children: Vec<CategoryNode>,
    pub procedures: Vec<Procedure>,
}

// Dropped iteratively so a deep hierarchy cannot exhaust the stack
impl Drop for CategoryNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

impl CategoryNode {
    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn child_ids(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.id()).collect()
    }
}

/// Arena-backed forest of categories.
///
/// Produced by [`TreeBuilder`](crate::domain::TreeBuilder), never mutated
/// after construction. Roots and children are kept in display order.
#[derive(Debug, Default)]
pub struct CategoryForest {
    arena: Arena<ArenaNode>,
    roots: Vec<Index>,
    by_id: HashMap<CategoryId, Index>,
    warnings: Vec<StructuralWarning>,
}

impl CategoryForest {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self, record, procedures), fields(id = %record.id))]
    pub(crate) fn insert_node(&mut self, record: CategoryRecord, procedures: Vec<Procedure>) -> Index {
        let id = record.id.clone();
        let idx = self.arena.insert(ArenaNode {
            record,
            parent: None,
            children: Vec::new(),
            procedures,
        });
        self.by_id.insert(id, idx);
        idx
    }

    /// Link `child` under `parent`, or make it a root when `parent` is None.
    pub(crate) fn attach(&mut self, child: Index, parent: Option<Index>) {
        match parent {
            Some(parent_idx) => {
                if let Some(node) = self.arena.get_mut(child) {
                    node.parent = Some(parent_idx);
                }
                if let Some(parent) = self.arena.get_mut(parent_idx) {
                    parent.children.push(child);
                }
            }
            None => self.roots.push(child),
        }
    }

    /// Sort roots and every children list by importance desc, title asc, id asc.
    pub(crate) fn sort(&mut self) {
        let arena = &self.arena;
        let order = |a: &Index, b: &Index| match (arena.get(*a), arena.get(*b)) {
            (Some(a), Some(b)) => sibling_order(&a.record, &b.record),
            _ => std::cmp::Ordering::Equal,
        };

        let mut roots = std::mem::take(&mut self.roots);
        roots.sort_by(order);

        let mut sorted: Vec<(Index, Vec<Index>)> = Vec::with_capacity(self.arena.len());
        for (idx, node) in self.arena.iter() {
            let mut children = node.children.clone();
            children.sort_by(order);
            sorted.push((idx, children));
        }
        for (idx, children) in sorted {
            if let Some(node) = self.arena.get_mut(idx) {
                node.children = children;
            }
        }
        self.roots = roots;
    }

    pub(crate) fn set_warnings(&mut self, warnings: Vec<StructuralWarning>) {
        self.warnings = warnings;
    }

    pub fn get_node(&self, idx: Index) -> Option<&ArenaNode> {
        self.arena.get(idx)
    }

    pub fn find(&self, id: &str) -> Option<&ArenaNode> {
        self.by_id.get(id).and_then(|idx| self.arena.get(*idx))
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    pub fn root_ids(&self) -> Vec<&str> {
        self.roots
            .iter()
            .filter_map(|idx| self.arena.get(*idx))
            .map(|n| n.record.id.as_str())
            .collect()
    }

    /// Structural warnings collected while building.
    pub fn warnings(&self) -> &[StructuralWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Preorder traversal over all trees, roots in display order.
    pub fn iter(&self) -> ForestIterator<'_> {
        ForestIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(Index, usize)> = self.roots.iter().map(|&root| (root, 1)).collect();
        while let Some((idx, level)) = stack.pop() {
            let Some(node) = self.get_node(idx) else {
                continue;
            };
            deepest = deepest.max(level);
            stack.extend(node.children.iter().map(|&child| (child, level + 1)));
        }
        deepest
    }

    /// Ids of all categories without children, in preorder.
    pub fn leaf_ids(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.record.id.as_str())
            .collect()
    }

    /// Materialize the owned nested representation.
    pub fn to_nodes(&self) -> Vec<CategoryNode> {
        self.fold_up(|node, children| CategoryNode {
            record: node.record.clone(),
            children,
            procedures: node.procedures.clone(),
        })
    }

    /// Render every root as a `termtree` tree.
    pub fn to_trees(&self, with_procedures: bool) -> Vec<Tree<String>> {
        self.fold_up(|node, children: Vec<Tree<String>>| {
            let label = if node.record.active {
                node.record.to_string()
            } else {
                format!("{} (inactive)", node.record)
            };
            let mut tree = Tree::new(label).with_leaves(children);
            if with_procedures {
                for procedure in &node.procedures {
                    tree.push(Tree::new(format!("- {procedure}")));
                }
            }
            tree
        })
    }

    /// Build one value per root bottom-up, without recursion.
    ///
    /// `make` gets each node with the values already built for its children,
    /// in display order. Reverse preorder visits children before parents.
    fn fold_up<T>(&self, mut make: impl FnMut(&ArenaNode, Vec<T>) -> T) -> Vec<T> {
        let order: Vec<(Index, &ArenaNode)> = self.iter().collect();
        let mut built: HashMap<Index, T> = HashMap::with_capacity(order.len());
        for &(idx, node) in order.iter().rev() {
            let children = node
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect();
            built.insert(idx, make(node, children));
        }
        self.roots
            .iter()
            .filter_map(|root| built.remove(root))
            .collect()
    }
}

/// Sibling ordering: importance descending, then title, then id.
pub fn sibling_order(a: &CategoryRecord, b: &CategoryRecord) -> std::cmp::Ordering {
    b.importance
        .cmp(&a.importance)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}

pub struct ForestIterator<'a> {
    forest: &'a CategoryForest,
    stack: Vec<Index>,
}

impl<'a> ForestIterator<'a> {
    fn new(forest: &'a CategoryForest) -> Self {
        // Reverse so the first root is popped first
        let stack = forest.roots.iter().rev().copied().collect();
        Self { forest, stack }
    }
}

impl<'a> Iterator for ForestIterator<'a> {
    type Item = (Index, &'a ArenaNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_abc() -> CategoryForest {
        let mut forest = CategoryForest::new();
        let a = forest.insert_node(CategoryRecord::new("A", "alpha"), Vec::new());
        let b = forest.insert_node(CategoryRecord::new("B", "beta").with_importance(1), Vec::new());
        let c = forest.insert_node(CategoryRecord::new("C", "gamma").with_importance(5), Vec::new());
        forest.attach(a, None);
        forest.attach(b, Some(a));
        forest.attach(c, Some(a));
        forest.sort();
        forest
    }

    #[test]
    fn given_forest_when_iterating_then_preorder_in_display_order() {
        let forest = forest_abc();
        let ids: Vec<_> = forest.iter().map(|(_, n)| n.record.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C", "B"]);
    }

    #[test]
    fn given_forest_when_measuring_then_depth_and_leaves_match() {
        let forest = forest_abc();
        assert_eq!(forest.depth(), 2);
        assert_eq!(forest.leaf_ids(), vec!["C", "B"]);
        assert_eq!(forest.len(), 3);
    }

    #[test]
    fn given_empty_forest_when_measuring_then_zero() {
        let forest = CategoryForest::new();
        assert_eq!(forest.depth(), 0);
        assert!(forest.is_empty());
        assert!(forest.to_nodes().is_empty());
    }

    #[test]
    fn given_forest_when_rendering_then_inactive_is_marked() {
        let mut forest = CategoryForest::new();
        let a = forest.insert_node(CategoryRecord::new("A", "alpha").with_active(false), Vec::new());
        forest.attach(a, None);
        let rendered = forest.to_trees(false)[0].to_string();
        assert!(rendered.contains("alpha [A] (inactive)"));
    }
}
