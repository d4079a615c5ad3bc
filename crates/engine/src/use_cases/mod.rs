//! Use cases - User story orchestration.
//!
//! Use cases orchestrate across entity modules to fulfill user stories.

pub mod competing;

pub use competing::{CompetingQuestError, CompetingQuestManager, QuestAvailability};
