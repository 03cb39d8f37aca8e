use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    disclaimer_accepted: bool,
}

/// Persists the one flag that survives restarts: whether the user has
/// acknowledged the legal disclaimer.
#[derive(Debug, Clone)]
pub struct DisclaimerStore {
    path: Option<PathBuf>,
}

impl DisclaimerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// `state.toml` in the platform data directory. Without one, nothing is
    /// persisted and the disclaimer shows on every start.
    pub fn from_project_dirs() -> Self {
        let path = ProjectDirs::from("uz", "legalai", "legalai")
            .map(|dirs| dirs.data_dir().join("state.toml"));
        Self { path }
    }

    pub fn is_accepted(&self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };
        fs::read_to_string(path)
            .ok()
            .and_then(|contents| toml::from_str::<StoredState>(&contents).ok())
            .map(|state| state.disclaimer_accepted)
            .unwrap_or(false)
    }

    pub fn accept(&self) -> Result<()> {
        let Some(path) = &self.path else {
            tracing::warn!("no data directory; disclaimer acceptance not persisted");
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let state = StoredState {
            disclaimer_accepted: true,
        };
        fs::write(path, toml::to_string(&state)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_not_accepted_until_written() {
        let dir = tempdir().unwrap();
        let store = DisclaimerStore::new(dir.path().join("nested").join("state.toml"));
        assert!(!store.is_accepted());

        store.accept().unwrap();
        assert!(store.is_accepted());

        let reopened = DisclaimerStore::new(dir.path().join("nested").join("state.toml"));
        assert!(reopened.is_accepted());
    }

    #[test]
    fn test_corrupt_state_reads_as_not_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.toml");
        fs::write(&path, "disclaimer_accepted = \"maybe\"").unwrap();
        assert!(!DisclaimerStore::new(path).is_accepted());
    }
}
