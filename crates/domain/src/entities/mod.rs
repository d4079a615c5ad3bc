//! Domain entities - Core business objects with identity

mod conflict;
mod faction;
mod quest;

pub use conflict::ConflictRecord;
pub use faction::{
    clamp_relationship, clamp_standing, fill_missing_faction_types, FactionData, FactionProfile,
    FactionType, RELATIONSHIP_MAX, RELATIONSHIP_MIN, STANDING_MAX, STANDING_MIN,
};
pub use quest::{
    FactionQuestTemplate, FactionRequirements, FactionRewards, QuestObjective, QuestOutcome,
    QuestRequirements, QuestRewards, QuestTemplate,
};
