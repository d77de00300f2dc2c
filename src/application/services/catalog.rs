//! Category catalog service (write side)
//!
//! Validates administrative writes before handing them to the store. The read
//! side tolerates inconsistent data, but nothing written through here may
//! introduce a self-parent or a cycle.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{category_path, CategoryRecord, DomainError};
use crate::infrastructure::store::CategoryStore;

/// Length of generated category ids.
const GENERATED_ID_LEN: usize = 12;

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid id pattern")
    })
}

/// True if `id` is an acceptable category id token.
pub fn is_valid_category_id(id: &str) -> bool {
    id_pattern().is_match(id)
}

/// Category to create or update; `id: None` creates a new category.
#[derive(Debug, Clone, Default)]
pub struct CategoryDraft {
    pub id: Option<String>,
    pub title: String,
    pub parent_id: Option<String>,
    pub importance: i64,
    pub active: bool,
    pub default_open: bool,
    pub allowed_districts: Vec<String>,
    pub icon: Option<String>,
}

/// Service for validated category writes.
pub struct CatalogService {
    store: Arc<dyn CategoryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Move `category_id` under `new_parent_id` (None: make it a root).
    ///
    /// Rejects self-parenting, unknown ids, and moves below the category's
    /// own descendants.
    #[instrument(level = "debug", skip(self))]
    pub fn move_category(&self, category_id: &str, new_parent_id: Option<&str>) -> ApplicationResult<()> {
        if new_parent_id == Some(category_id) {
            return Err(DomainError::SelfParent(category_id.to_string()).into());
        }

        let records = self.store.fetch_all_categories()?;
        if !records.iter().any(|r| r.id == category_id) {
            return Err(ApplicationError::NotFound(category_id.to_string()));
        }

        if let Some(parent) = new_parent_id {
            if !records.iter().any(|r| r.id == parent) {
                return Err(ApplicationError::NotFound(parent.to_string()));
            }
            // The new parent must not sit inside the moved branch
            let ancestors = category_path(&records, parent).value;
            if ancestors.iter().any(|r| r.id == category_id) {
                return Err(DomainError::CycleIntroduced {
                    category: category_id.to_string(),
                    new_parent: parent.to_string(),
                }
                .into());
            }
        }

        self.store.move_category(category_id, new_parent_id)?;
        info!(
            "moved {} under {}",
            category_id,
            new_parent_id.unwrap_or("<root>")
        );
        Ok(())
    }

    /// Create a category, or update the one with the draft's id.
    #[instrument(level = "debug", skip(self, draft), fields(id = ?draft.id))]
    pub fn create_or_update_category(&self, draft: CategoryDraft) -> ApplicationResult<CategoryRecord> {
        let id = match draft.id {
            Some(id) => {
                if !is_valid_category_id(&id) {
                    return Err(DomainError::InvalidId(id).into());
                }
                id
            }
            None => generate_id(),
        };

        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::EmptyTitle(id).into());
        }

        if draft.parent_id.as_deref() == Some(id.as_str()) {
            return Err(DomainError::SelfParent(id).into());
        }

        let records = self.store.fetch_all_categories()?;
        if let Some(parent) = draft.parent_id.as_deref() {
            if !records.iter().any(|r| r.id == parent) {
                return Err(ApplicationError::NotFound(parent.to_string()));
            }
            let ancestors = category_path(&records, parent).value;
            if ancestors.iter().any(|r| r.id == id) {
                return Err(DomainError::CycleIntroduced {
                    category: id,
                    new_parent: parent.to_string(),
                }
                .into());
            }
        }

        let record = CategoryRecord {
            id,
            title,
            parent_id: draft.parent_id,
            importance: draft.importance,
            active: draft.active,
            default_open: draft.default_open,
            allowed_districts: draft.allowed_districts.into_iter().collect(),
            icon: draft.icon,
        };
        let saved = self.store.create_or_update_category(record)?;
        debug!("saved category {}", saved.id);
        Ok(saved)
    }

    /// Delete a category. Its children become dangling and are shown as
    /// roots until moved.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_category(&self, category_id: &str) -> ApplicationResult<()> {
        self.store.delete_category(category_id)?;
        info!("deleted {}", category_id);
        Ok(())
    }
}

fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()[..GENERATED_ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_tokens_when_validating_then_only_alphanumeric_accepted() {
        assert!(is_valid_category_id("clx9a_b-1"));
        assert!(!is_valid_category_id(""));
        assert!(!is_valid_category_id("has space"));
        assert!(!is_valid_category_id("slash/id"));
    }

    #[test]
    fn given_generated_id_when_validating_then_accepted() {
        let id = generate_id();
        assert_eq!(id.len(), GENERATED_ID_LEN);
        assert!(is_valid_category_id(&id));
    }
}
