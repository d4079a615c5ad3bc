//! Aggregate roots - domain objects that own their related data
//!
//! Each aggregate has a unique identity, keeps its fields private, and
//! reports what a mutation did through its return value.

pub mod competing_quest_group;

pub use competing_quest_group::{
    CancelledQuest, CompetingQuest, CompetingQuestGroup, GroupResolution, GroupStatus, QuestStatus,
};
