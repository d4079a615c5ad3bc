//! Historical record of a resolved faction conflict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregates::GroupResolution;
use crate::entities::FactionType;
use crate::ids::{CompetingGroupId, ConflictId, QuestId};

/// One resolved competing quest group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub id: ConflictId,
    pub group_id: CompetingGroupId,
    pub quest_id: QuestId,
    pub winner: FactionType,
    pub losers: Vec<FactionType>,
    pub objective: String,
    pub location: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConflictRecord {
    pub fn from_resolution(
        resolution: &GroupResolution,
        objective: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            id: ConflictId::new(),
            group_id: resolution.group_id,
            quest_id: resolution.completed_quest.clone(),
            winner: resolution.winning_faction,
            losers: resolution.losing_factions().collect(),
            objective: objective.into(),
            location,
            timestamp: resolution.resolved_at,
        }
    }

    pub fn involves(&self, faction: FactionType) -> bool {
        self.winner == faction || self.losers.contains(&faction)
    }
}
