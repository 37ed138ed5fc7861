//! File-backed plan store with atomic writes.
//!
//! Documents live at `<root>/plans/<plan-id>/plan.json`. The root defaults
//! to `.coursegen` in the working directory and can be overridden with the
//! `COURSEGEN_HOME` environment variable or an explicit path. Writes go
//! through a temp file + fsync + atomic rename so a crashed writer can never
//! leave a half-written document behind.

use crate::store::{ArtifactStore, StoreError};
use camino::{Utf8Path, Utf8PathBuf};
use coursegen_model::{CoursePlan, PlanId};
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

/// Resolve the coursegen home directory.
///
/// Precedence: `COURSEGEN_HOME` environment variable, then `.coursegen` in
/// the current working directory.
#[must_use]
pub fn coursegen_home() -> Utf8PathBuf {
    if let Ok(home) = std::env::var("COURSEGEN_HOME") {
        return Utf8PathBuf::from(home);
    }
    Utf8PathBuf::from(".coursegen")
}

/// Atomically write content to a file using temp file + fsync + rename.
fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_string(),
        source,
    };

    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent).map_err(io_err)?;

    // Temp file in the same directory so the rename stays on one filesystem.
    let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content.as_bytes()).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path.as_std_path())
        .map_err(|e| io_err(e.error))?;

    Ok(())
}

/// Plan store backed by JSON documents on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: Utf8PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the discovered coursegen home.
    #[must_use]
    pub fn new() -> Self {
        Self::with_root(coursegen_home())
    }

    /// Create a store rooted at an explicit directory.
    #[must_use]
    pub fn with_root(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Directory owned by one plan.
    #[must_use]
    pub fn plan_root(&self, plan_id: &PlanId) -> Utf8PathBuf {
        self.root.join("plans").join(plan_id.as_str())
    }

    fn plan_path(&self, plan_id: &PlanId) -> Utf8PathBuf {
        self.plan_root(plan_id).join("plan.json")
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore for JsonFileStore {
    fn load(&self, plan_id: &PlanId) -> Result<CoursePlan, StoreError> {
        let path = self.plan_path(plan_id);
        if !path.as_std_path().exists() {
            return Err(StoreError::NotFound {
                plan_id: plan_id.to_string(),
            });
        }

        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn save(&self, plan: &CoursePlan) -> Result<(), StoreError> {
        let path = self.plan_path(&plan.id);
        let json = serde_json::to_string_pretty(plan).map_err(|e| StoreError::Corrupt {
            path: path.to_string(),
            reason: format!("failed to serialize plan: {e}"),
        })?;
        write_file_atomic(&path, &json)
    }

    fn exists(&self, plan_id: &PlanId) -> bool {
        self.plan_path(plan_id).as_std_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursegen_model::{Lesson, Module};

    fn isolated_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, JsonFileStore::with_root(root))
    }

    fn plan(id: &str) -> CoursePlan {
        let mut plan = CoursePlan::new(id.parse().unwrap(), "File Test");
        plan.modules = vec![Module {
            id: "m1".to_string(),
            title: "Module m1".to_string(),
            lessons: vec![Lesson {
                id: "l1".to_string(),
                title: "Lesson l1".to_string(),
                voiceover_script: None,
                quiz: None,
            }],
        }];
        plan
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let (_dir, store) = isolated_store();
        let err = store.load(&"absent".parse().unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let (_dir, store) = isolated_store();
        let plan = plan("file-1");

        store.save(&plan).unwrap();
        assert!(store.exists(&plan.id));

        let loaded = store.load(&plan.id).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn test_document_lands_under_plan_root() {
        let (_dir, store) = isolated_store();
        let plan = plan("file-layout");
        store.save(&plan).unwrap();

        let expected = store.plan_root(&plan.id).join("plan.json");
        assert!(expected.as_std_path().exists());
    }

    #[test]
    fn test_save_replaces_previous_version() {
        let (_dir, store) = isolated_store();
        let mut plan = plan("file-2");
        store.save(&plan).unwrap();

        plan.modules.clear();
        store.save(&plan).unwrap();

        let loaded = store.load(&plan.id).unwrap();
        assert_eq!(loaded.module_count(), 0);
    }

    #[test]
    fn test_corrupt_document_reported() {
        let (_dir, store) = isolated_store();
        let plan_id: PlanId = "file-corrupt".parse().unwrap();

        let path = store.plan_root(&plan_id).join("plan.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json }").unwrap();

        let err = store.load(&plan_id).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_missing_optional_fields_load_canonically() {
        // A document written by an older writer that omits lessons and
        // scripts loads as the canonical absent representation.
        let (_dir, store) = isolated_store();
        let plan_id: PlanId = "file-legacy".parse().unwrap();

        let path = store.plan_root(&plan_id).join("plan.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{
                "id": "file-legacy",
                "title": "Legacy",
                "modules": [{"id": "m1", "title": "M1"}],
                "created_at": "2026-01-05T10:00:00Z",
                "updated_at": "2026-01-05T10:00:00Z"
            }"#,
        )
        .unwrap();

        let loaded = store.load(&plan_id).unwrap();
        assert_eq!(loaded.modules_missing_lessons(), 1);
        assert_eq!(loaded.lessons_missing_script(), 0);
    }
}
