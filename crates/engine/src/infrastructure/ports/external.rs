//! External collaborator ports.

use visualdm_domain::{FactionType, WorldStateEffect};

use super::error::ConsequenceError;

// =============================================================================
// Consequence System
// =============================================================================

/// Records and executes side effects of faction actions.
///
/// Both calls are synchronous so they can run inside a cancellation cascade
/// while the group lock is held.
#[cfg_attr(test, mockall::automock)]
pub trait ConsequenceSystem: Send + Sync {
    /// Returns the delta that actually landed, which may be smaller than
    /// `delta` when standing is clamped.
    fn apply_reputation_change(
        &self,
        faction: FactionType,
        delta: f64,
        reason: &str,
    ) -> Result<f64, ConsequenceError>;

    fn apply_world_state_effect(&self, effect: &WorldStateEffect) -> Result<(), ConsequenceError>;
}
