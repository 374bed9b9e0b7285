//! On-disk client state: the selected site and the auth token file.

use serde::{Deserialize, Serialize};
use sitebook_core::{SelectionError, SelectionStore, SiteSelection};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSelection {
    selected_site_id: SiteSelection,
}

/// Selected site stored as JSON. Several processes may share the file;
/// each picks up the others' writes through `SiteContext::reload`.
#[derive(Debug, Clone)]
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SelectionStore for FileSelectionStore {
    fn load(&self) -> Result<Option<SiteSelection>, SelectionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        let state = serde_json::from_str::<PersistedSelection>(&contents)?;
        Ok(Some(state.selected_site_id))
    }

    fn save(&self, selection: &SiteSelection) -> Result<(), SelectionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = PersistedSelection {
            selected_site_id: selection.clone(),
        };
        let contents = serde_json::to_string_pretty(&state)?;
        // Readers never observe a partially written file.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Read a bearer token file. Missing or blank files mean no token.
pub fn read_token(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let token = contents.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}
