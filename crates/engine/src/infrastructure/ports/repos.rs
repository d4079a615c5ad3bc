//! Repository port traits for persistence.

use async_trait::async_trait;
use visualdm_domain::FactionData;

use super::error::RepoError;

// =============================================================================
// Faction Snapshot Storage
// =============================================================================

/// Stores the canonical faction snapshot.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FactionSnapshotRepo: Send + Sync {
    /// Load the last saved snapshot, or `None` when nothing was saved yet.
    async fn load(&self) -> Result<Option<Vec<FactionData>>, RepoError>;
    async fn save(&self, factions: &[FactionData]) -> Result<(), RepoError>;
}
