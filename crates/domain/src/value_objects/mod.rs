//! Value objects - Immutable objects defined by their attributes

mod settings;
mod tension;
mod world_state;

pub use settings::{CompetingQuestConfig, FactionQuestConfig};
pub use tension::{
    DecayPolicy, FactionPair, TensionMetrics, TensionUpdate, TensionUpdateKind,
    MAX_TENSION_HISTORY,
};
pub use world_state::{WorldStateEffect, WorldStateEffectType};
