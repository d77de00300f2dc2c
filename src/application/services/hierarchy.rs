//! Category hierarchy service (read side)
//!
//! Fetches one snapshot per call from the category store and runs the
//! domain algorithms over it.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{
    category_path, collect_procedures, descendant_ids, filter_visible, CategoryForest, CategoryId,
    CategoryRecord, Procedure, Resolved, StructuralWarning, TreeBuilder, Viewer,
};
use crate::infrastructure::store::CategoryStore;

/// Service resolving trees, branches and paths for a viewer.
pub struct HierarchyService {
    store: Arc<dyn CategoryStore>,
}

impl HierarchyService {
    /// Create a new hierarchy service.
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Categories the viewer may see, from a fresh snapshot.
    fn visible_records(&self, viewer: &Viewer) -> ApplicationResult<Vec<CategoryRecord>> {
        let records = self.store.fetch_all_categories()?;
        let visible = filter_visible(&records, viewer);
        debug!(
            "snapshot: {} categories, {} visible",
            records.len(),
            visible.len()
        );
        Ok(visible)
    }

    /// Build the category forest with directly linked procedures.
    #[instrument(level = "debug", skip(self))]
    pub fn tree(&self, viewer: &Viewer) -> ApplicationResult<CategoryForest> {
        let records = self.visible_records(viewer)?;
        let ids: Vec<CategoryId> = records.iter().map(|r| r.id.clone()).collect();
        let links = self.store.fetch_procedure_links(&ids, true)?;

        Ok(TreeBuilder::new()
            .with_procedure_links(&links)
            .build(&records))
    }

    /// Active procedures anywhere under `root_id`, each listed once.
    ///
    /// An unknown (or hidden) root yields an empty list.
    #[instrument(level = "debug", skip(self))]
    pub fn procedures_in_branch(
        &self,
        root_id: &str,
        viewer: &Viewer,
    ) -> ApplicationResult<Resolved<Vec<Procedure>>> {
        let records = self.visible_records(viewer)?;
        let ids = descendant_ids(&records, root_id);
        if ids.is_empty() {
            debug!("branch root {} not in snapshot", root_id);
            return Ok(Resolved::new(Vec::new()));
        }

        let links = self.store.fetch_procedure_links(&ids, true)?;
        let procedures = collect_procedures(&links);
        debug!(
            "branch {}: {} categories, {} links, {} procedures",
            root_id,
            ids.len(),
            links.len(),
            procedures.len()
        );

        // Warnings of the branch only, not of the whole snapshot
        let warnings = TreeBuilder::new()
            .build(&records)
            .warnings()
            .iter()
            .filter(|w| ids.iter().any(|id| id == w.category()))
            .cloned()
            .collect();

        Ok(Resolved {
            value: procedures,
            warnings,
        })
    }

    /// Breadcrumb of `category_id`, root first.
    #[instrument(level = "debug", skip(self))]
    pub fn category_path(
        &self,
        category_id: &str,
        viewer: &Viewer,
    ) -> ApplicationResult<Resolved<Vec<CategoryRecord>>> {
        let records = self.visible_records(viewer)?;
        Ok(category_path(&records, category_id))
    }

    /// Consistency report of the unfiltered snapshot.
    #[instrument(level = "debug", skip(self))]
    pub fn check(&self) -> ApplicationResult<Vec<StructuralWarning>> {
        let records = self.store.fetch_all_categories()?;
        let mut warnings = TreeBuilder::new().build(&records).warnings().to_vec();
        warnings.sort();
        warnings.dedup();
        Ok(warnings)
    }
}
