extern crate self as visualdm_domain;

pub mod aggregates;
pub mod entities;
pub mod error;
pub mod events;
pub mod ids;
pub mod value_objects;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{
    clamp_relationship, clamp_standing, fill_missing_faction_types, ConflictRecord, FactionData,
    FactionProfile, FactionQuestTemplate, FactionRequirements, FactionRewards, FactionType,
    QuestObjective, QuestOutcome, QuestRequirements, QuestRewards, QuestTemplate,
    RELATIONSHIP_MAX, RELATIONSHIP_MIN, STANDING_MAX, STANDING_MIN,
};

pub use aggregates::{
    CancelledQuest, CompetingQuest, CompetingQuestGroup, GroupResolution, GroupStatus, QuestStatus,
};

pub use error::DomainError;
pub use events::TensionEvent;

// Re-export ID types
pub use ids::{CompetingGroupId, ConflictId, QuestId};

pub use value_objects::{
    CompetingQuestConfig, DecayPolicy, FactionPair, FactionQuestConfig, TensionMetrics,
    TensionUpdate, TensionUpdateKind, WorldStateEffect, WorldStateEffectType, MAX_TENSION_HISTORY,
};
