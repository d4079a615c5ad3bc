//! Domain Events
//!
//! Notifications published by the competing quest manager. Hosts subscribe to
//! these instead of polling for state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CompetingGroupId, FactionPair, FactionType, QuestId, TensionUpdate};

/// State change in the competing quest and tension system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TensionEvent {
    GroupCreated {
        group_id: CompetingGroupId,
        base_quest_id: QuestId,
        factions: Vec<FactionType>,
    },
    Completed {
        group_id: CompetingGroupId,
        quest_id: QuestId,
        faction: FactionType,
        timestamp: DateTime<Utc>,
    },
    Cancelled {
        group_id: CompetingGroupId,
        quest_id: QuestId,
        faction: FactionType,
        timestamp: DateTime<Utc>,
    },
    TensionRaised {
        update: TensionUpdate,
    },
    Decayed {
        update: TensionUpdate,
    },
    DiplomaticOpportunity {
        pair: FactionPair,
        tension: f64,
        timestamp: DateTime<Utc>,
    },
}

impl TensionEvent {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GroupCreated { .. } => "group_created",
            Self::Completed { .. } => "completed",
            Self::Cancelled { .. } => "cancelled",
            Self::TensionRaised { .. } => "tension_raised",
            Self::Decayed { .. } => "decayed",
            Self::DiplomaticOpportunity { .. } => "diplomatic_opportunity",
        }
    }
}
