//! Quest templates consumed from, and produced for, the host quest engine.

use serde::{Deserialize, Serialize};

use crate::entities::FactionType;
use crate::ids::QuestId;
use crate::value_objects::WorldStateEffect;

/// A single step the player must complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestObjective {
    pub id: String,
    pub description: String,
    /// Objective kind such as "fetch", "combat" or "diplomacy"
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default = "default_amount")]
    pub amount: u32,
    #[serde(default = "default_difficulty")]
    pub difficulty: f64,
}

fn default_amount() -> u32 {
    1
}

fn default_difficulty() -> f64 {
    1.0
}

impl QuestObjective {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            kind: String::new(),
            target: None,
            amount: default_amount(),
            difficulty: default_difficulty(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }
}

/// Player-side gating carried by every template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestRequirements {
    #[serde(default)]
    pub minimum_reputation: Option<f64>,
    #[serde(default)]
    pub minimum_tier: Option<u32>,
}

/// Rewards granted on completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestRewards {
    #[serde(default)]
    pub gold: f64,
    #[serde(default)]
    pub experience: f64,
    #[serde(default)]
    pub items: Vec<String>,
}

/// Base quest template as produced by the quest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestTemplate {
    pub id: QuestId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: QuestRequirements,
    #[serde(default)]
    pub rewards: QuestRewards,
    #[serde(default)]
    pub objectives: Vec<QuestObjective>,
    #[serde(default)]
    pub faction_id: Option<FactionType>,
    /// Where the contested objective takes place
    #[serde(default)]
    pub location: Option<String>,
    /// Special quests require `minimumStandingForSpecialQuests`
    #[serde(default)]
    pub special: bool,
    #[serde(default)]
    pub consequences: Vec<WorldStateEffect>,
}

impl QuestTemplate {
    pub fn new(id: impl Into<QuestId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            requirements: QuestRequirements::default(),
            rewards: QuestRewards::default(),
            objectives: Vec::new(),
            faction_id: None,
            location: None,
            special: false,
            consequences: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_faction(mut self, faction: FactionType) -> Self {
        self.faction_id = Some(faction);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_rewards(mut self, rewards: QuestRewards) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn with_objective(mut self, objective: QuestObjective) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_minimum_tier(mut self, tier: u32) -> Self {
        self.requirements.minimum_tier = Some(tier);
        self
    }

    pub fn with_minimum_reputation(mut self, reputation: f64) -> Self {
        self.requirements.minimum_reputation = Some(reputation);
        self
    }

    pub fn special(mut self) -> Self {
        self.special = true;
        self
    }
}

/// Faction-side gating on top of the base requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionRequirements {
    pub minimum_standing: f64,
    pub maximum_standing: f64,
    #[serde(default)]
    pub minimum_tier: Option<u32>,
}

impl Default for FactionRequirements {
    fn default() -> Self {
        Self {
            minimum_standing: crate::entities::STANDING_MIN,
            maximum_standing: crate::entities::STANDING_MAX,
            minimum_tier: None,
        }
    }
}

/// Faction-side rewards applied on completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionRewards {
    #[serde(default)]
    pub standing_gain: f64,
    #[serde(default)]
    pub reputation_gain: f64,
    #[serde(default)]
    pub special_rewards: Vec<String>,
}

/// A quest template bound to one faction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionQuestTemplate {
    pub quest: QuestTemplate,
    pub faction_id: FactionType,
    #[serde(default)]
    pub faction_requirements: FactionRequirements,
    #[serde(default)]
    pub faction_rewards: FactionRewards,
    #[serde(default)]
    pub faction_objectives: Vec<QuestObjective>,
    /// Rival factions racing for the same objective
    #[serde(default)]
    pub competing_factions: Option<Vec<FactionType>>,
}

impl FactionQuestTemplate {
    /// Bind a base template to a faction with default requirements and rewards.
    pub fn from_template(quest: QuestTemplate, faction_id: FactionType) -> Self {
        let minimum_tier = quest.requirements.minimum_tier;
        let mut quest = quest;
        quest.faction_id = Some(faction_id);
        Self {
            quest,
            faction_id,
            faction_requirements: FactionRequirements {
                minimum_tier,
                ..FactionRequirements::default()
            },
            faction_rewards: FactionRewards::default(),
            faction_objectives: Vec::new(),
            competing_factions: None,
        }
    }

    pub fn with_competing_factions(mut self, factions: Vec<FactionType>) -> Self {
        self.competing_factions = Some(factions);
        self
    }

    pub fn with_faction_rewards(mut self, rewards: FactionRewards) -> Self {
        self.faction_rewards = rewards;
        self
    }

    pub fn id(&self) -> &QuestId {
        &self.quest.id
    }

    pub fn title(&self) -> &str {
        &self.quest.title
    }

    pub fn location(&self) -> Option<&str> {
        self.quest.location.as_deref()
    }

    /// Whether the template names rivals and should spawn a competing group.
    pub fn has_competing_factions(&self) -> bool {
        self.competing_factions
            .as_ref()
            .is_some_and(|factions| !factions.is_empty())
    }
}

/// How a quest ended for the faction that offered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestOutcome {
    Success,
    Failure,
    Abandoned,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_template_binds_faction_and_tier() {
        let template = QuestTemplate::new("market", "Control the market district")
            .with_minimum_tier(2);
        let bound = FactionQuestTemplate::from_template(template, FactionType::Merchants);

        assert_eq!(bound.faction_id, FactionType::Merchants);
        assert_eq!(bound.quest.faction_id, Some(FactionType::Merchants));
        assert_eq!(bound.faction_requirements.minimum_tier, Some(2));
        assert!(!bound.has_competing_factions());
    }

    #[test]
    fn empty_competing_list_does_not_count() {
        let template = QuestTemplate::new("market", "Control the market district");
        let bound = FactionQuestTemplate::from_template(template, FactionType::Merchants)
            .with_competing_factions(Vec::new());
        assert!(!bound.has_competing_factions());
    }

    #[test]
    fn template_json_uses_camel_case() {
        let template = QuestTemplate::new("market", "Control the market district")
            .with_faction(FactionType::Merchants)
            .with_location("market_district");
        let bound = FactionQuestTemplate::from_template(template, FactionType::Merchants)
            .with_competing_factions(vec![FactionType::Thieves]);

        let json = serde_json::to_value(&bound).expect("serialize");
        assert_eq!(json["quest"]["id"], "market");
        assert_eq!(json["quest"]["location"], "market_district");
        assert_eq!(json["factionId"], "merchants");
        assert_eq!(json["competingFactions"][0], "thieves");
        assert_eq!(json["factionRequirements"]["minimumStanding"], -100.0);
    }
}
