//! On-disk mockup template library.
//!
//! Templates live under `uploads/mockups/` as PNG files whose names encode
//! both identity and model: `{id}_{Model_With_Underscores}.png`. The legacy
//! `{id}.png` form (no model) is still accepted when listing. The numeric id
//! is therefore both filename and identity; renaming a model renames the
//! file, keeping the id.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use casekit_core::MockupTemplate;

use crate::validation::{sanitize_model, DEFAULT_MODEL};

/// Directory under the data dir where templates are stored.
pub const MOCKUPS_SUBDIR: &str = "uploads/mockups";

/// Errors from library operations.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// No template file carries the requested id.
    #[error("mockup {0} not found")]
    NotFound(u64),
    /// The model label failed validation.
    #[error("invalid model name")]
    InvalidModel,
    /// The id could not be parsed.
    #[error("invalid mockup id: {0}")]
    InvalidId(String),
    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One listed template, as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockupEntry {
    /// Numeric identity parsed from the filename.
    pub id: u64,
    /// Display name (the model doubles as the name).
    pub name: String,
    /// Device-model label, underscores restored to spaces.
    pub model: String,
    /// Server-relative URL of the image.
    pub path: String,
    /// The raw on-disk file name.
    pub file_name: String,
}

impl MockupEntry {
    /// Convert to the core template type.
    #[must_use]
    pub fn to_template(&self) -> MockupTemplate {
        MockupTemplate {
            id: self.id,
            name: self.name.clone(),
            model: self.model.clone(),
            path: self.path.clone(),
        }
    }
}

/// Filesystem-backed template library.
#[derive(Debug)]
pub struct MockupLibrary {
    dir: PathBuf,
}

impl MockupLibrary {
    /// Create a library under `data_dir`, creating the mockups directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn new(data_dir: &Path) -> std::io::Result<Self> {
        let dir = data_dir.join(MOCKUPS_SUBDIR);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// List every template, sorted by id. Files whose names do not parse are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be read.
    pub fn list(&self) -> Result<Vec<MockupEntry>, LibraryError> {
        let mut entries = Vec::new();
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if let Some((id, model)) = parse_file_name(file_name) {
                entries.push(MockupEntry {
                    id,
                    name: model.clone(),
                    model,
                    path: format!("/{MOCKUPS_SUBDIR}/{file_name}"),
                    file_name: file_name.to_string(),
                });
            }
        }
        entries.sort_by_key(|e| e.id);
        Ok(entries)
    }

    /// Distinct model labels, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be read.
    pub fn models(&self) -> Result<Vec<String>, LibraryError> {
        let mut models: Vec<String> = self
            .list()?
            .into_iter()
            .map(|e| e.model)
            .collect();
        models.sort();
        models.dedup();
        Ok(models)
    }

    /// Save an uploaded template under `{number}_{model}.png`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidModel`] for an unusable model label or
    /// an IO error when the write fails.
    pub fn save(
        &self,
        number: u64,
        model: &str,
        bytes: &[u8],
    ) -> Result<MockupEntry, LibraryError> {
        let display_model = sanitize_model(model).map_err(|_| LibraryError::InvalidModel)?;
        let file_model = to_file_model(&display_model);
        let file_name = format!("{number}_{file_model}.png");
        std::fs::write(self.dir.join(&file_name), bytes)?;
        tracing::info!(id = number, model = %display_model, "saved mockup template");

        Ok(MockupEntry {
            id: number,
            name: display_model.clone(),
            model: display_model,
            path: format!("/{MOCKUPS_SUBDIR}/{file_name}"),
            file_name,
        })
    }

    /// Rename the model of template `id`, renaming the file.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] when no file carries the id, or
    /// [`LibraryError::InvalidModel`] for an unusable label.
    pub fn rename_model(&self, id: u64, new_model: &str) -> Result<MockupEntry, LibraryError> {
        let display_model = sanitize_model(new_model).map_err(|_| LibraryError::InvalidModel)?;
        let current = self.find_file(id)?.ok_or(LibraryError::NotFound(id))?;

        let file_model = to_file_model(&display_model);
        let new_file = format!("{id}_{file_model}.png");
        std::fs::rename(self.dir.join(&current), self.dir.join(&new_file))?;
        tracing::info!(id, model = %display_model, "renamed mockup model");

        Ok(MockupEntry {
            id,
            name: display_model.clone(),
            model: display_model,
            path: format!("/{MOCKUPS_SUBDIR}/{new_file}"),
            file_name: new_file,
        })
    }

    /// Delete template `id` from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] when no file carries the id.
    pub fn delete(&self, id: u64) -> Result<(), LibraryError> {
        let file = self.find_file(id)?.ok_or(LibraryError::NotFound(id))?;
        std::fs::remove_file(self.dir.join(&file))?;
        tracing::info!(id, "deleted mockup template");
        Ok(())
    }

    /// Look up template `id`, parsed from the directory listing.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::NotFound`] when no file carries the id.
    pub fn get(&self, id: u64) -> Result<MockupEntry, LibraryError> {
        self.list()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or(LibraryError::NotFound(id))
    }

    /// Find the on-disk file name carrying `id`.
    fn find_file(&self, id: u64) -> Result<Option<String>, LibraryError> {
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let file_name = dir_entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if parse_file_name(file_name).is_some_and(|(file_id, _)| file_id == id) {
                return Ok(Some(file_name.to_string()));
            }
        }
        Ok(None)
    }
}

/// Parse `{id}_{Model}.png` or legacy `{id}.png` into (id, display model).
fn parse_file_name(file_name: &str) -> Option<(u64, String)> {
    let stem = file_name.strip_suffix(".png")?;
    match stem.split_once('_') {
        Some((id_part, model_part)) => {
            let id = id_part.parse().ok()?;
            let model = model_part.replace('_', " ");
            let model = if model.trim().is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model
            };
            Some((id, model))
        }
        None => {
            let id = stem.parse().ok()?;
            Some((id, DEFAULT_MODEL.to_string()))
        }
    }
}

/// Filename form of a model label: whitespace runs become underscores.
fn to_file_model(display_model: &str) -> String {
    display_model.split_whitespace().collect::<Vec<_>>().join("_")
}
