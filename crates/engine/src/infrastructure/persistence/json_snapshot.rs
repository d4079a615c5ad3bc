//! JSON file storage for the faction snapshot.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use visualdm_domain::FactionData;

use crate::infrastructure::ports::{FactionSnapshotRepo, RepoError};

/// Stores the faction snapshot as a pretty-printed JSON array.
///
/// Saves go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous snapshot intact.
pub struct JsonFactionSnapshotStore {
    path: PathBuf,
}

impl JsonFactionSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl FactionSnapshotRepo for JsonFactionSnapshotStore {
    async fn load(&self) -> Result<Option<Vec<FactionData>>, RepoError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No faction snapshot found");
                return Ok(None);
            }
            Err(e) => return Err(RepoError::storage("load_snapshot", e)),
        };

        let factions: Vec<FactionData> =
            serde_json::from_slice(&bytes).map_err(RepoError::serialization)?;
        tracing::info!(
            path = %self.path.display(),
            count = factions.len(),
            "Faction snapshot loaded"
        );
        Ok(Some(factions))
    }

    async fn save(&self, factions: &[FactionData]) -> Result<(), RepoError> {
        let json = serde_json::to_vec_pretty(factions).map_err(RepoError::serialization)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RepoError::storage("save_snapshot", e))?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| RepoError::storage("save_snapshot", e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| RepoError::storage("save_snapshot", e))?;

        tracing::info!(
            path = %self.path.display(),
            count = factions.len(),
            "Faction snapshot saved"
        );
        Ok(())
    }
}
