//! Category record store: the boundary the hierarchy services read from and
//! write through.
//!
//! Two implementations are provided: [`InMemoryStore`] holds the catalog in
//! memory, [`FileStore`] keeps it in a TOML or JSON document on disk and
//! re-reads it on every fetch.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{CategoryId, CategoryRecord, Procedure, ProcedureLink};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::FileSystem;

/// Source of category snapshots and owner of all category writes.
pub trait CategoryStore: Send + Sync {
    /// Full snapshot of category records.
    fn fetch_all_categories(&self) -> StoreResult<Vec<CategoryRecord>>;

    /// Links whose category is in `category_ids`.
    ///
    /// With `include_procedure`, each link carries its target procedure
    /// (links to unknown procedures stay unhydrated).
    fn fetch_procedure_links(
        &self,
        category_ids: &[CategoryId],
        include_procedure: bool,
    ) -> StoreResult<Vec<ProcedureLink>>;

    /// Re-parent a category. Validation is the caller's job.
    fn move_category(&self, category_id: &str, new_parent_id: Option<&str>) -> StoreResult<()>;

    /// Insert a record, or replace the record with the same id.
    fn create_or_update_category(&self, record: CategoryRecord) -> StoreResult<CategoryRecord>;

    /// Remove a category and its procedure links. Children are left in place.
    fn delete_category(&self, category_id: &str) -> StoreResult<()>;
}

/// Persisted catalog: categories, procedures and the links between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub categories: Vec<CategoryRecord>,
    pub procedures: Vec<Procedure>,
    pub links: Vec<ProcedureLink>,
}

impl CatalogDocument {
    pub fn new(
        categories: Vec<CategoryRecord>,
        procedures: Vec<Procedure>,
        links: Vec<ProcedureLink>,
    ) -> Self {
        Self {
            updated_at: None,
            categories,
            procedures,
            links,
        }
    }

    fn links_for(&self, category_ids: &[CategoryId], include_procedure: bool) -> Vec<ProcedureLink> {
        let wanted: HashSet<&str> = category_ids.iter().map(String::as_str).collect();
        let procedures: HashMap<&str, &Procedure> = if include_procedure {
            self.procedures.iter().map(|p| (p.id.as_str(), p)).collect()
        } else {
            HashMap::new()
        };

        self.links
            .iter()
            .filter(|link| wanted.contains(link.category_id.as_str()))
            .map(|link| ProcedureLink {
                procedure_id: link.procedure_id.clone(),
                category_id: link.category_id.clone(),
                procedure: procedures.get(link.procedure_id.as_str()).map(|p| (*p).clone()),
            })
            .collect()
    }

    fn move_category(&mut self, category_id: &str, new_parent_id: Option<&str>) -> StoreResult<()> {
        let record = self
            .categories
            .iter_mut()
            .find(|r| r.id == category_id)
            .ok_or_else(|| StoreError::NotFound(category_id.to_string()))?;
        record.parent_id = new_parent_id.map(str::to_string);
        self.touch();
        Ok(())
    }

    fn upsert(&mut self, record: CategoryRecord) -> CategoryRecord {
        match self.categories.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => self.categories.push(record.clone()),
        }
        self.touch();
        record
    }

    fn delete(&mut self, category_id: &str) -> StoreResult<()> {
        let before = self.categories.len();
        self.categories.retain(|r| r.id != category_id);
        if self.categories.len() == before {
            return Err(StoreError::NotFound(category_id.to_string()));
        }
        self.links.retain(|l| l.category_id != category_id);
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

// ============================================================
// IN-MEMORY STORE
// ============================================================

/// Catalog held in memory; every fetch hands out a cloned snapshot.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    document: RwLock<CatalogDocument>,
}

impl InMemoryStore {
    pub fn new(document: CatalogDocument) -> Self {
        Self {
            document: RwLock::new(document),
        }
    }

    pub fn shared(document: CatalogDocument) -> Arc<Self> {
        Arc::new(Self::new(document))
    }

    /// Copy of the current document.
    pub fn document(&self) -> StoreResult<CatalogDocument> {
        self.document
            .read()
            .map(|d| d.clone())
            .map_err(|_| StoreError::Poisoned)
    }
}

impl CategoryStore for InMemoryStore {
    fn fetch_all_categories(&self) -> StoreResult<Vec<CategoryRecord>> {
        let document = self.document.read().map_err(|_| StoreError::Poisoned)?;
        Ok(document.categories.clone())
    }

    fn fetch_procedure_links(
        &self,
        category_ids: &[CategoryId],
        include_procedure: bool,
    ) -> StoreResult<Vec<ProcedureLink>> {
        let document = self.document.read().map_err(|_| StoreError::Poisoned)?;
        Ok(document.links_for(category_ids, include_procedure))
    }

    fn move_category(&self, category_id: &str, new_parent_id: Option<&str>) -> StoreResult<()> {
        let mut document = self.document.write().map_err(|_| StoreError::Poisoned)?;
        document.move_category(category_id, new_parent_id)
    }

    fn create_or_update_category(&self, record: CategoryRecord) -> StoreResult<CategoryRecord> {
        let mut document = self.document.write().map_err(|_| StoreError::Poisoned)?;
        Ok(document.upsert(record))
    }

    fn delete_category(&self, category_id: &str) -> StoreResult<()> {
        let mut document = self.document.write().map_err(|_| StoreError::Poisoned)?;
        document.delete(category_id)
    }
}

// ============================================================
// FILE STORE
// ============================================================

/// On-disk encoding of a catalog document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFormat {
    Toml,
    Json,
}

impl StoreFormat {
    /// JSON for `.json` files, TOML otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => StoreFormat::Json,
            _ => StoreFormat::Toml,
        }
    }
}

/// Catalog kept in a single document on disk.
///
/// A missing file reads as an empty catalog and is created on first write.
pub struct FileStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    format: StoreFormat,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let format = StoreFormat::from_path(&path);
        Self {
            fs,
            path,
            format,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(level = "debug", skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> StoreResult<CatalogDocument> {
        if !self.fs.exists(&self.path) {
            debug!("catalog file missing, using empty catalog");
            return Ok(CatalogDocument::default());
        }
        let content = self
            .fs
            .read_to_string(&self.path)
            .map_err(|e| StoreError::io(format!("read {}", self.path.display()), e))?;
        self.decode(&content)
    }

    pub fn save(&self, document: &CatalogDocument) -> StoreResult<()> {
        let content = self.encode(document)?;
        self.fs
            .write_atomic(&self.path, &content)
            .map_err(|e| StoreError::io(format!("write {}", self.path.display()), e))?;
        debug!("saved catalog: {} categories", document.categories.len());
        Ok(())
    }

    fn decode(&self, content: &str) -> StoreResult<CatalogDocument> {
        let parse_err = |message: String| StoreError::Parse {
            path: self.path.clone(),
            message,
        };
        match self.format {
            StoreFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
            StoreFormat::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }

    fn encode(&self, document: &CatalogDocument) -> StoreResult<String> {
        match self.format {
            StoreFormat::Toml => {
                toml::to_string_pretty(document).map_err(|e| StoreError::Serialize(e.to_string()))
            }
            StoreFormat::Json => serde_json::to_string_pretty(document)
                .map_err(|e| StoreError::Serialize(e.to_string())),
        }
    }

    fn modify<T>(&self, f: impl FnOnce(&mut CatalogDocument) -> StoreResult<T>) -> StoreResult<T> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut document = self.load()?;
        let result = f(&mut document)?;
        self.save(&document)?;
        Ok(result)
    }
}

impl CategoryStore for FileStore {
    fn fetch_all_categories(&self) -> StoreResult<Vec<CategoryRecord>> {
        Ok(self.load()?.categories)
    }

    fn fetch_procedure_links(
        &self,
        category_ids: &[CategoryId],
        include_procedure: bool,
    ) -> StoreResult<Vec<ProcedureLink>> {
        Ok(self.load()?.links_for(category_ids, include_procedure))
    }

    fn move_category(&self, category_id: &str, new_parent_id: Option<&str>) -> StoreResult<()> {
        self.modify(|doc| doc.move_category(category_id, new_parent_id))
    }

    fn create_or_update_category(&self, record: CategoryRecord) -> StoreResult<CategoryRecord> {
        self.modify(|doc| Ok(doc.upsert(record)))
    }

    fn delete_category(&self, category_id: &str) -> StoreResult<()> {
        self.modify(|doc| doc.delete(category_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> CatalogDocument {
        CatalogDocument::new(
            vec![
                CategoryRecord::new("A", "alpha"),
                CategoryRecord::new("B", "beta").with_parent("A"),
            ],
            vec![Procedure::new("P1", "reset password")],
            vec![ProcedureLink::new("P1", "B"), ProcedureLink::new("P2", "B")],
        )
    }

    #[test]
    fn given_hydration_when_fetching_links_then_known_procedures_attached() {
        let store = InMemoryStore::new(document());

        let links = store.fetch_procedure_links(&["B".to_string()], true).unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].procedure.as_ref().map(|p| p.id.as_str()), Some("P1"));
        assert!(links[1].procedure.is_none());
    }

    #[test]
    fn given_no_hydration_when_fetching_links_then_procedures_absent() {
        let store = InMemoryStore::new(document());

        let links = store.fetch_procedure_links(&["B".to_string()], false).unwrap();

        assert!(links.iter().all(|l| l.procedure.is_none()));
        assert!(store.fetch_procedure_links(&["A".to_string()], true).unwrap().is_empty());
    }

    #[test]
    fn given_delete_when_category_exists_then_record_and_links_removed() {
        let store = InMemoryStore::new(document());

        store.delete_category("B").unwrap();
        store.delete_category("A").unwrap();

        let doc = store.document().unwrap();
        assert!(doc.categories.is_empty());
        assert!(doc.links.is_empty());
        assert!(doc.updated_at.is_some());
    }

    #[test]
    fn given_unknown_category_when_moving_then_not_found() {
        let store = InMemoryStore::new(document());
        let err = store.move_category("missing", None).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "missing"));
    }

    #[test]
    fn given_extension_when_detecting_format_then_json_only_for_json() {
        assert_eq!(StoreFormat::from_path(Path::new("a/catalog.json")), StoreFormat::Json);
        assert_eq!(StoreFormat::from_path(Path::new("a/catalog.JSON")), StoreFormat::Json);
        assert_eq!(StoreFormat::from_path(Path::new("a/catalog.toml")), StoreFormat::Toml);
        assert_eq!(StoreFormat::from_path(Path::new("a/catalog")), StoreFormat::Toml);
    }
}
