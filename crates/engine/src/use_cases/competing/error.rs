//! Competing quest operation errors.

use visualdm_domain::{CompetingGroupId, DomainError, FactionType, QuestId};

use crate::entities::FactionError;
use crate::infrastructure::ports::ConsequenceError;

/// Errors that can occur during competing quest operations.
#[derive(Debug, thiserror::Error)]
pub enum CompetingQuestError {
    #[error("Quest not found in any competing group: {0}")]
    QuestNotFound(QuestId),
    #[error("Competing quest group not found: {0}")]
    GroupNotFound(CompetingGroupId),
    #[error("Faction not found: {0}")]
    FactionNotFound(FactionType),
    #[error("Quest {quest_id} belongs to {expected}, not {actual}")]
    WrongFaction {
        quest_id: QuestId,
        expected: FactionType,
        actual: FactionType,
    },
    #[error("Faction error: {0}")]
    Faction(FactionError),
    #[error("Failed to apply consequence: {0}")]
    ConsequenceApplication(#[source] ConsequenceError),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl From<FactionError> for CompetingQuestError {
    fn from(err: FactionError) -> Self {
        match err {
            FactionError::NotFound(faction) => Self::FactionNotFound(faction),
            FactionError::Domain(domain) => Self::Domain(domain),
            other => Self::Faction(other),
        }
    }
}

impl CompetingQuestError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QuestNotFound(_) | Self::GroupNotFound(_) | Self::FactionNotFound(_)
        )
    }
}
