//! Domain layer: entities and hierarchy algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).
//! Everything here is a pure function of the snapshot it is given.

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod resolver;

pub use arena::{sibling_order, ArenaNode, CategoryForest, CategoryNode};
pub use builder::{build_tree, TreeBuilder};
pub use entities::*;
pub use error::{DomainError, StructuralWarning};
pub use resolver::{category_path, collect_procedures, descendant_ids, filter_visible, Resolved};
