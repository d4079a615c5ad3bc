//! Faction quest entity module.
//!
//! Translates faction relationship and standing state into quest availability
//! decisions and standing changes, and builds per-faction quest variants.

use std::sync::Arc;

use dashmap::DashMap;
use visualdm_domain::{
    clamp_standing, DomainError, FactionProfile, FactionQuestConfig, FactionQuestTemplate,
    FactionRequirements, FactionType, QuestId, QuestObjective, QuestOutcome, QuestTemplate,
};

use super::faction::{FactionError, FactionService};

/// Result of applying a quest outcome to a faction's standing.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingChange {
    pub faction: FactionType,
    pub delta: f64,
    pub standing: f64,
    pub tier: u32,
    pub promoted: bool,
}

/// Verb rewrites turning an objective into its opposing form.
const OPPOSING_VERBS: [(&str, &str); 4] = [
    ("collect", "prevent collection of"),
    ("kill", "protect"),
    ("destroy", "defend"),
    ("capture", "maintain control of"),
];

pub struct FactionQuestSystem {
    factions: Arc<FactionService>,
    config: FactionQuestConfig,
    quests: DashMap<QuestId, FactionQuestTemplate>,
}

impl FactionQuestSystem {
    pub fn new(factions: Arc<FactionService>, config: FactionQuestConfig) -> Result<Self, DomainError> {
        config.validate()?;
        Ok(Self {
            factions,
            config,
            quests: DashMap::new(),
        })
    }

    /// Read-only configuration, shared with the competing quest manager.
    pub fn config(&self) -> &FactionQuestConfig {
        &self.config
    }

    pub fn factions(&self) -> &Arc<FactionService> {
        &self.factions
    }

    // =========================================================================
    // Eligibility
    // =========================================================================

    /// Whether `faction` may offer `template` at all.
    pub fn can_offer_quest(&self, faction: &FactionProfile, template: &QuestTemplate) -> bool {
        if template.special && faction.reputation < self.config.minimum_standing_for_special_quests
        {
            return false;
        }
        let requirements = &template.requirements;
        if requirements
            .minimum_reputation
            .is_some_and(|minimum| faction.reputation < minimum)
        {
            return false;
        }
        faction.tier >= requirements.minimum_tier.unwrap_or(0)
    }

    /// Whether `faction` currently satisfies the faction-side gating of `template`.
    pub fn meets_faction_requirements(
        &self,
        faction: &FactionProfile,
        template: &FactionQuestTemplate,
    ) -> bool {
        let requirements = &template.faction_requirements;
        if faction.reputation < requirements.minimum_standing
            || faction.reputation > requirements.maximum_standing
        {
            return false;
        }
        faction.tier >= requirements.minimum_tier.unwrap_or(0)
    }

    // =========================================================================
    // Standing and tiers
    // =========================================================================

    /// Signed standing change for `outcome`, trimmed so the result stays in
    /// [-100, 100]. The caller applies it.
    pub fn compute_standing_delta(&self, faction: &FactionProfile, outcome: QuestOutcome) -> f64 {
        let raw = match outcome {
            QuestOutcome::Success => {
                self.config.reputation_gain_rate * self.config.standing_gain_multiplier
            }
            QuestOutcome::Failure => -self.config.reputation_loss_rate,
            QuestOutcome::Abandoned => 0.0,
        };
        clamp_standing(faction.reputation + raw) - faction.reputation
    }

    /// Tier reached at `standing`: the index of the highest threshold at or below it.
    pub fn tier_for_standing(&self, standing: f64) -> u32 {
        self.config
            .tier_thresholds
            .iter()
            .rposition(|threshold| standing >= *threshold)
            .map_or(0, |index| u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Apply the standing delta for `outcome` and promote the faction when a
    /// new tier threshold is reached. Tiers are never lost.
    pub fn apply_quest_outcome(
        &self,
        faction: FactionType,
        outcome: QuestOutcome,
    ) -> Result<StandingChange, FactionError> {
        let profile = self.factions.get_faction(faction)?;
        let delta = self.compute_standing_delta(&profile, outcome);
        let standing = self.factions.adjust_standing(faction, delta)?.new;

        let reached = self.tier_for_standing(standing);
        let promoted = reached > profile.tier;
        let tier = if promoted {
            self.factions.set_tier(faction, reached)?;
            reached
        } else {
            profile.tier
        };

        tracing::info!(
            faction = %faction,
            ?outcome,
            delta,
            standing,
            tier,
            promoted,
            "Quest outcome applied to standing"
        );
        Ok(StandingChange {
            faction,
            delta,
            standing,
            tier,
            promoted,
        })
    }

    // =========================================================================
    // Quest registry
    // =========================================================================

    /// Register a faction quest template, replacing any template with the same id.
    pub fn register_quest(&self, template: FactionQuestTemplate) -> Option<FactionQuestTemplate> {
        tracing::debug!(quest_id = %template.id(), faction = %template.faction_id, "Quest registered");
        self.quests.insert(template.id().clone(), template)
    }

    pub fn get_quest(&self, quest_id: &QuestId) -> Option<FactionQuestTemplate> {
        self.quests.get(quest_id).map(|entry| entry.value().clone())
    }

    /// Registered quests `faction` can offer right now, ordered by id.
    pub fn available_quests(
        &self,
        faction: FactionType,
    ) -> Result<Vec<FactionQuestTemplate>, FactionError> {
        let profile = self.factions.get_faction(faction)?;
        let mut quests: Vec<FactionQuestTemplate> = self
            .quests
            .iter()
            .filter(|entry| entry.faction_id == faction)
            .filter(|entry| {
                self.can_offer_quest(&profile, &entry.quest)
                    && self.meets_faction_requirements(&profile, entry.value())
            })
            .map(|entry| entry.value().clone())
            .collect();
        quests.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(quests)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Factions whose relationship with `faction` is below the mutually
    /// exclusive threshold, ordered by faction type.
    pub fn opposing_factions(&self, faction: FactionType) -> Result<Vec<FactionType>, FactionError> {
        let profile = self.factions.get_faction(faction)?;
        Ok(self
            .factions
            .all_factions()
            .into_iter()
            .filter(|other| other.id != faction)
            .filter(|other| {
                profile.relationship_with(other.id) < self.config.mutually_exclusive_threshold
            })
            .map(|other| other.id)
            .collect())
    }

    /// Build the variant of `template` offered by `faction`.
    ///
    /// Gold and experience scale with the faction's tier. Any faction other
    /// than the template's owner receives the opposing form: new id, reversed
    /// objectives and negated consequences.
    pub fn create_faction_variant(
        &self,
        template: &FactionQuestTemplate,
        faction: &FactionProfile,
    ) -> FactionQuestTemplate {
        let mut variant = template.clone();
        let multiplier = 1.0 + f64::from(faction.tier) * 0.1;
        variant.quest.rewards.gold *= multiplier;
        variant.quest.rewards.experience *= multiplier;

        if faction.id == template.faction_id {
            return variant;
        }

        let base_id = template.id();
        variant.quest.id = opposing_quest_id(base_id, faction.id);
        variant.quest.title = format!("Oppose: {}", template.title());
        variant.quest.faction_id = Some(faction.id);
        variant.quest.objectives = template
            .quest
            .objectives
            .iter()
            .map(|objective| opposing_objective(objective, faction.id))
            .collect();
        variant.quest.consequences = template
            .quest
            .consequences
            .iter()
            .map(|consequence| {
                let mut opposed = consequence.clone();
                opposed.value = -consequence.value;
                opposed.description =
                    format!("{} prevents: {}", faction.name, consequence.description);
                opposed
            })
            .collect();
        variant.faction_id = faction.id;
        variant.faction_requirements = FactionRequirements::default();
        variant.faction_objectives = template
            .faction_objectives
            .iter()
            .map(|objective| opposing_objective(objective, faction.id))
            .collect();
        variant.competing_factions = None;
        variant
    }
}

/// Id of the opposing variant of `base` for `faction`.
pub fn opposing_quest_id(base: &QuestId, faction: FactionType) -> QuestId {
    QuestId::new(format!("opposing_{}_{}", base, faction))
}

fn opposing_objective(objective: &QuestObjective, faction: FactionType) -> QuestObjective {
    QuestObjective {
        id: format!("opposing_{}_{}", objective.id, faction),
        description: reverse_objective_description(&objective.description),
        ..objective.clone()
    }
}

/// Rewrite the first whole-word occurrence of each known verb into its
/// opposing form.
pub fn reverse_objective_description(description: &str) -> String {
    let mut result = description.to_string();
    for (verb, replacement) in OPPOSING_VERBS {
        // ASCII lowercasing keeps byte offsets aligned with `result`.
        if let Some(start) = find_word(&result.to_ascii_lowercase(), verb) {
            result.replace_range(start..start + verb.len(), replacement);
        }
    }
    result
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(word).map(|(start, _)| start).find(|&start| {
        let end = start + word.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}
