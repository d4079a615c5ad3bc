//! Default consequence system.
//!
//! Applies reputation changes to faction standings and keeps an in-memory
//! ledger of every applied consequence for inspection by the host.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use visualdm_domain::{FactionType, WorldStateEffect};

use crate::entities::{FactionError, FactionService};
use crate::infrastructure::ports::{ClockPort, ConsequenceError, ConsequenceSystem};

/// One applied consequence.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsequenceRecord {
    Reputation {
        faction: FactionType,
        delta: f64,
        standing: f64,
        reason: String,
        applied_at: DateTime<Utc>,
    },
    WorldState {
        effect: WorldStateEffect,
        applied_at: DateTime<Utc>,
    },
}

pub struct ConsequenceLedger {
    factions: Arc<FactionService>,
    clock: Arc<dyn ClockPort>,
    records: Mutex<Vec<ConsequenceRecord>>,
}

impl ConsequenceLedger {
    pub fn new(factions: Arc<FactionService>, clock: Arc<dyn ClockPort>) -> Self {
        Self {
            factions,
            clock,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Every applied consequence, oldest first.
    pub fn records(&self) -> Vec<ConsequenceRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn world_effects(&self) -> Vec<WorldStateEffect> {
        self.records()
            .into_iter()
            .filter_map(|record| match record {
                ConsequenceRecord::WorldState { effect, .. } => Some(effect),
                ConsequenceRecord::Reputation { .. } => None,
            })
            .collect()
    }

    fn push(&self, record: ConsequenceRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

impl ConsequenceSystem for ConsequenceLedger {
    fn apply_reputation_change(
        &self,
        faction: FactionType,
        delta: f64,
        reason: &str,
    ) -> Result<f64, ConsequenceError> {
        let adjustment = self
            .factions
            .adjust_standing(faction, delta)
            .map_err(|err| match err {
                FactionError::NotFound(missing) => ConsequenceError::FactionNotFound(missing),
                other => ConsequenceError::Rejected(other.to_string()),
            })?;
        let applied = adjustment.applied_delta();

        tracing::debug!(
            faction = %faction,
            delta,
            applied,
            standing = adjustment.new,
            reason,
            "Reputation change applied"
        );
        self.push(ConsequenceRecord::Reputation {
            faction,
            delta: applied,
            standing: adjustment.new,
            reason: reason.to_string(),
            applied_at: self.clock.now(),
        });
        Ok(applied)
    }

    fn apply_world_state_effect(&self, effect: &WorldStateEffect) -> Result<(), ConsequenceError> {
        if let Some(missing) = effect
            .affected_factions
            .iter()
            .find(|faction| !self.factions.contains(**faction))
        {
            return Err(ConsequenceError::FactionNotFound(*missing));
        }

        tracing::debug!(kind = ?effect.kind, value = effect.value, "World state effect applied");
        self.push(ConsequenceRecord::WorldState {
            effect: effect.clone(),
            applied_at: self.clock.now(),
        });
        Ok(())
    }
}
