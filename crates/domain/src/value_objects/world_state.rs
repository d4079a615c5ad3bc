//! World state side effects triggered by faction actions.

use serde::{Deserialize, Serialize};

use crate::entities::FactionType;

/// Kind of world state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldStateEffectType {
    QuestCompleted,
    QuestCancelled,
    QuestFailure,
    FactionAllianceBenefit,
    TensionDecrease,
    DiplomaticOpportunity,
    Custom(String),
}

/// A world state change handed to the consequence system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldStateEffect {
    pub kind: WorldStateEffectType,
    pub description: String,
    pub value: f64,
    #[serde(default)]
    pub affected_factions: Vec<FactionType>,
    #[serde(default)]
    pub location: Option<String>,
}

impl WorldStateEffect {
    pub fn new(kind: WorldStateEffectType, description: impl Into<String>, value: f64) -> Self {
        Self {
            kind,
            description: description.into(),
            value,
            affected_factions: Vec::new(),
            location: None,
        }
    }

    pub fn affecting(mut self, factions: impl IntoIterator<Item = FactionType>) -> Self {
        self.affected_factions.extend(factions);
        self
    }

    pub fn at(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    pub fn affects(&self, faction: FactionType) -> bool {
        self.affected_factions.contains(&faction)
    }
}
