//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the category store boundary trait but are themselves
//! concrete structs, not traits.

mod catalog;
mod hierarchy;

pub use catalog::{is_valid_category_id, CatalogService, CategoryDraft};
pub use hierarchy::HierarchyService;
