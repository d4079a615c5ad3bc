//! Tunable constants for the faction quest and competing quest systems.
//!
//! Both structs are plain data supplied by the host at construction time.
//! Services call `validate()` in their constructors so contradictory
//! thresholds fail fast instead of producing odd gameplay later.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::DecayPolicy;

/// Configuration for standing changes, tiers and quest eligibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionQuestConfig {
    /// Standing gained when a faction's quest succeeds
    pub reputation_gain_rate: f64,
    /// Standing lost when a faction's quest fails
    pub reputation_loss_rate: f64,
    /// Ascending standing thresholds; tier N requires `tier_thresholds[N]`
    pub tier_thresholds: Vec<f64>,
    /// Chance that an opposing faction races for a freshly offered quest
    pub competing_quest_probability: f64,
    /// Factions whose relationship is below this compete instead of cooperating
    pub mutually_exclusive_threshold: i32,
    /// Standing required before a faction offers special quests
    pub minimum_standing_for_special_quests: f64,
    /// Multiplier on a template's faction standing gain
    pub standing_gain_multiplier: f64,
}

impl Default for FactionQuestConfig {
    fn default() -> Self {
        Self {
            reputation_gain_rate: 10.0,
            reputation_loss_rate: 5.0,
            tier_thresholds: vec![0.0, 20.0, 40.0, 60.0, 80.0],
            competing_quest_probability: 0.3,
            mutually_exclusive_threshold: 50,
            minimum_standing_for_special_quests: 50.0,
            standing_gain_multiplier: 1.0,
        }
    }
}

impl FactionQuestConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.reputation_gain_rate < 0.0 || self.reputation_loss_rate < 0.0 {
            return Err(DomainError::invalid_configuration(
                "reputation gain and loss rates must be non-negative",
            ));
        }
        if !(0.0..=1.0).contains(&self.competing_quest_probability) {
            return Err(DomainError::invalid_configuration(format!(
                "competing quest probability {} is outside [0, 1]",
                self.competing_quest_probability
            )));
        }
        if !(-100..=100).contains(&self.mutually_exclusive_threshold) {
            return Err(DomainError::invalid_configuration(format!(
                "mutually exclusive threshold {} is outside [-100, 100]",
                self.mutually_exclusive_threshold
            )));
        }
        if self
            .tier_thresholds
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            return Err(DomainError::invalid_configuration(
                "tier thresholds must be strictly ascending",
            ));
        }
        if self.standing_gain_multiplier < 0.0 {
            return Err(DomainError::invalid_configuration(
                "standing gain multiplier must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Configuration for competing quest groups and faction tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetingQuestConfig {
    /// Length of one decay interval, in seconds
    pub tension_decay_interval_secs: u64,
    /// Tension above which the quest is locked out for the rival faction
    pub quest_lockout_threshold: f64,
    /// Most factions that may compete in one group
    pub max_competing_quests: usize,
    /// Reputation delta applied to each faction whose quest gets cancelled
    pub quest_cancellation_penalty: f64,
    /// Tension added to each rival pair when a group quest completes
    pub quest_completion_tension_increase: f64,
    /// Above this, decay switches to `tension_decay_rate`
    pub high_tension_threshold: f64,
    /// Decay per interval at or below `high_tension_threshold`
    pub base_tension_decay_rate: f64,
    /// Slower decay per interval above `high_tension_threshold`
    pub tension_decay_rate: f64,
    /// Seconds without conflict after which tension is fully dissipated
    pub max_decay_time_threshold_secs: u64,
    /// Dropping below this during decay opens a diplomatic opportunity
    pub low_tension_threshold: f64,
    /// Relationship above which a faction counts as an ally of the winner
    pub alliance_threshold: i32,
    /// Relationship lost between the winner's allies and every loser
    pub allied_relationship_penalty: i32,
    /// Upper bound on tension
    pub max_tension: f64,
}

impl Default for CompetingQuestConfig {
    fn default() -> Self {
        Self {
            tension_decay_interval_secs: 3_600,
            quest_lockout_threshold: 90.0,
            max_competing_quests: 4,
            quest_cancellation_penalty: -10.0,
            quest_completion_tension_increase: 15.0,
            high_tension_threshold: 75.0,
            base_tension_decay_rate: 5.0,
            tension_decay_rate: 2.5,
            max_decay_time_threshold_secs: 7 * 24 * 3_600,
            low_tension_threshold: 10.0,
            alliance_threshold: 30,
            allied_relationship_penalty: 5,
            max_tension: 100.0,
        }
    }
}

impl CompetingQuestConfig {
    /// Saturates at `TimeDelta::MAX`; `validate()` rejects such values.
    pub fn tension_decay_interval(&self) -> TimeDelta {
        secs_to_delta(self.tension_decay_interval_secs).unwrap_or(TimeDelta::MAX)
    }

    /// Saturates at `TimeDelta::MAX`; `validate()` rejects such values.
    pub fn max_decay_time_threshold(&self) -> TimeDelta {
        secs_to_delta(self.max_decay_time_threshold_secs).unwrap_or(TimeDelta::MAX)
    }

    /// Decay policy with a neutral faction modifier.
    pub fn decay_policy(&self) -> DecayPolicy {
        DecayPolicy {
            interval: self.tension_decay_interval(),
            base_rate: self.base_tension_decay_rate,
            high_tension_rate: self.tension_decay_rate,
            high_tension_threshold: self.high_tension_threshold,
            max_decay_time: self.max_decay_time_threshold(),
            modifier: 1.0,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.tension_decay_interval_secs == 0 {
            return Err(DomainError::invalid_configuration(
                "tension decay interval must be positive",
            ));
        }
        for (name, secs) in [
            ("tension decay interval", self.tension_decay_interval_secs),
            ("max decay time threshold", self.max_decay_time_threshold_secs),
        ] {
            if secs_to_delta(secs).is_none() {
                return Err(DomainError::invalid_configuration(format!(
                    "{} of {} seconds is out of range",
                    name, secs
                )));
            }
        }
        if self.max_decay_time_threshold_secs < self.tension_decay_interval_secs {
            return Err(DomainError::invalid_configuration(
                "max decay time threshold must be at least one decay interval",
            ));
        }
        if self.max_competing_quests < 2 {
            return Err(DomainError::invalid_configuration(
                "max competing quests must allow at least two factions",
            ));
        }
        if self.base_tension_decay_rate < 0.0 || self.tension_decay_rate < 0.0 {
            return Err(DomainError::invalid_configuration(
                "tension decay rates must be non-negative",
            ));
        }
        if self.tension_decay_rate > self.base_tension_decay_rate {
            return Err(DomainError::invalid_configuration(format!(
                "high tension decay rate {} must not exceed base rate {}",
                self.tension_decay_rate, self.base_tension_decay_rate
            )));
        }
        if self.quest_completion_tension_increase < 0.0 {
            return Err(DomainError::invalid_configuration(
                "quest completion tension increase must be non-negative",
            ));
        }
        if self.quest_cancellation_penalty > 0.0 {
            return Err(DomainError::invalid_configuration(
                "quest cancellation penalty must not reward the cancelled faction",
            ));
        }
        if self.max_tension <= 0.0 {
            return Err(DomainError::invalid_configuration(
                "max tension must be positive",
            ));
        }
        if !(0.0..=self.high_tension_threshold).contains(&self.low_tension_threshold) {
            return Err(DomainError::invalid_configuration(format!(
                "low tension threshold {} must lie in [0, high tension threshold {}]",
                self.low_tension_threshold, self.high_tension_threshold
            )));
        }
        if self.quest_lockout_threshold < self.high_tension_threshold {
            return Err(DomainError::invalid_configuration(format!(
                "quest lockout threshold {} is below high tension threshold {}",
                self.quest_lockout_threshold, self.high_tension_threshold
            )));
        }
        if self.high_tension_threshold > self.max_tension {
            return Err(DomainError::invalid_configuration(
                "high tension threshold exceeds max tension",
            ));
        }
        if self.allied_relationship_penalty < 0 {
            return Err(DomainError::invalid_configuration(
                "allied relationship penalty must be non-negative",
            ));
        }
        Ok(())
    }
}

fn secs_to_delta(secs: u64) -> Option<TimeDelta> {
    i64::try_from(secs).ok().and_then(TimeDelta::try_seconds)
}
