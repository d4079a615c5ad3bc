//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Side effects of faction actions (consequence system)
//! - Faction snapshot storage (could swap JSON file -> database)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;

pub use error::{ConsequenceError, RepoError};
pub use external::ConsequenceSystem;
pub use repos::FactionSnapshotRepo;
pub use testing::{ClockPort, RandomPort};

#[cfg(test)]
pub use external::MockConsequenceSystem;
#[cfg(test)]
pub use repos::MockFactionSnapshotRepo;
#[cfg(test)]
pub use testing::MockClockPort;
