use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::debug;

use super::models::{ResourceState, StateFile, STATE_VERSION};

/// JSON file holding a `StateFile`.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty state.
    pub fn load(&self) -> Result<StateFile> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No state file, starting empty");
            return Ok(StateFile::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;
        let state: StateFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", self.path.display()))?;
        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, newer than supported version {}",
                self.path.display(),
                state.version,
                STATE_VERSION
            );
        }
        Ok(state)
    }

    pub fn save(&self, state: &StateFile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;
        Ok(())
    }

    /// Replace the record for one resource and save.
    pub fn record(&self, address: &str, mut resource: ResourceState) -> Result<()> {
        let mut state = self.load()?;
        resource.updated_at = chrono::Utc::now().to_rfc3339();
        state.resources.insert(address.to_string(), resource);
        self.save(&state)
    }
}
