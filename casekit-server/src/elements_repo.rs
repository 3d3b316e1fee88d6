//! Disk-backed element-set repository.
//!
//! One JSON file per mockup id under `elements/`, overwritten wholesale on
//! every save (no merge semantics).

use std::path::{Path, PathBuf};

use casekit_core::store::{ElementsRepository, MockupId};
use casekit_core::{CoreError, CoreResult, Element};

/// Directory under the data dir where element sets are stored.
pub const ELEMENTS_SUBDIR: &str = "elements";

/// Filesystem implementation of the element-set storage collaborator.
#[derive(Debug)]
pub struct FsElementsRepository {
    dir: PathBuf,
}

impl FsElementsRepository {
    /// Create a repository under `data_dir`, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn new(data_dir: &Path) -> std::io::Result<Self> {
        let dir = data_dir.join(ELEMENTS_SUBDIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn file_for(&self, mockup_id: MockupId) -> PathBuf {
        self.dir.join(format!("{mockup_id}.json"))
    }
}

impl ElementsRepository for FsElementsRepository {
    fn save_elements(&self, mockup_id: MockupId, elements: &[Element]) -> CoreResult<()> {
        let json = serde_json::to_string_pretty(elements)?;
        std::fs::write(self.file_for(mockup_id), json)?;
        tracing::debug!(mockup_id, count = elements.len(), "persisted element set");
        Ok(())
    }

    fn load_elements(&self, mockup_id: MockupId) -> CoreResult<Option<Vec<Element>>> {
        let path = self.file_for(mockup_id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CoreError::Io(e)),
        };
        let elements = serde_json::from_str(&contents)?;
        Ok(Some(elements))
    }

    fn delete_elements(&self, mockup_id: MockupId) -> CoreResult<()> {
        match std::fs::remove_file(self.file_for(mockup_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casekit_core::{ElementId, ElementSource};

    fn element(id: u64) -> Element {
        Element::new(
            ElementId(id),
            ElementSource::from(format!("/uploads/{id}.png")),
            format!("Element {id}"),
            0,
        )
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsElementsRepository::new(dir.path()).expect("repo");

        let elements = vec![element(1), element(2)];
        repo.save_elements(7, &elements).expect("save");

        let loaded = repo.load_elements(7).expect("load").expect("set");
        assert_eq!(loaded, elements);
    }

    #[test]
    fn test_load_missing_returns_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsElementsRepository::new(dir.path()).expect("repo");
        assert!(repo.load_elements(99).expect("load").is_none());
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsElementsRepository::new(dir.path()).expect("repo");

        repo.save_elements(7, &[element(1), element(2)]).expect("save");
        repo.save_elements(7, &[element(3)]).expect("save");

        let loaded = repo.load_elements(7).expect("load").expect("set");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, ElementId(3));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FsElementsRepository::new(dir.path()).expect("repo");

        repo.save_elements(7, &[element(1)]).expect("save");
        repo.delete_elements(7).expect("delete");
        repo.delete_elements(7).expect("delete again");
        assert!(repo.load_elements(7).expect("load").is_none());
    }
}
