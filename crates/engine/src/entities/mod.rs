//! Entity modules - Domain capability encapsulation.
//!
//! Each module wraps operations for a domain entity type and provides the
//! building blocks for use cases.

pub mod faction;
pub mod faction_quest;

pub use faction::{
    default_catalogue, FactionError, FactionService, RelationshipChange, StandingAdjustment,
};
pub use faction_quest::{
    opposing_quest_id, reverse_objective_description, FactionQuestSystem, StandingChange,
};
