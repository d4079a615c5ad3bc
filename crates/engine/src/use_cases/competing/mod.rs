//! Competing quest use cases.
//!
//! Orchestrates competing quest groups across the faction services: decides
//! which factions race for an objective, tracks pairwise tension, gates quest
//! availability by lockout thresholds and cascades cancellation when one
//! faction's quest completes.
//!
//! Each group sits behind its own lock, held for the whole completion
//! cascade. Tension records are keyed by unordered faction pair and mutated
//! under that pair's map shard, so independent pairs never contend.

mod error;


pub use error::CompetingQuestError;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::instrument;
use visualdm_domain::{
    CompetingGroupId, CompetingQuestConfig, CompetingQuestGroup, ConflictRecord, DecayPolicy,
    DomainError, FactionPair, FactionQuestTemplate, FactionType, GroupResolution, QuestId,
    TensionEvent, TensionMetrics, TensionUpdate, WorldStateEffect, WorldStateEffectType,
};

use crate::entities::{FactionError, FactionQuestSystem, FactionService};
use crate::infrastructure::ports::{ClockPort, ConsequenceError, ConsequenceSystem, RandomPort};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Why a quest is or is not available to a faction.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestAvailability {
    /// The quest is not part of any competing group.
    Ungrouped,
    /// Grouped, and no rival pair is above the lockout threshold.
    Open,
    /// Tension with `rival` exceeds the lockout threshold.
    LockedOut { rival: FactionType, tension: f64 },
}

impl QuestAvailability {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::LockedOut { .. })
    }
}

/// A consequence the cascade must apply before the group may change.
#[derive(Debug, Clone)]
enum PlannedConsequence {
    Reputation {
        faction: FactionType,
        delta: f64,
        reason: String,
    },
    /// Relationship penalty between an ally of the winner and a loser
    Relationship {
        ally: FactionType,
        loser: FactionType,
        delta: i32,
    },
    World(WorldStateEffect),
}

impl PlannedConsequence {
    /// Apply the consequence and return it as it actually landed, so that
    /// reverting it restores the prior state even when standing was clamped.
    fn apply(
        &self,
        system: &dyn ConsequenceSystem,
        factions: &FactionService,
    ) -> Result<Self, ConsequenceError> {
        match self {
            Self::Reputation {
                faction,
                delta,
                reason,
            } => {
                let applied = system.apply_reputation_change(*faction, *delta, reason)?;
                Ok(Self::Reputation {
                    faction: *faction,
                    delta: applied,
                    reason: reason.clone(),
                })
            }
            Self::Relationship { ally, loser, delta } => {
                let change = factions
                    .update_relationship(*ally, *loser, *delta)
                    .map_err(relationship_error)?;
                Ok(Self::Relationship {
                    ally: *ally,
                    loser: *loser,
                    delta: change.applied_delta(),
                })
            }
            Self::World(effect) => {
                system.apply_world_state_effect(effect)?;
                Ok(self.clone())
            }
        }
    }

    fn revert(
        &self,
        system: &dyn ConsequenceSystem,
        factions: &FactionService,
    ) -> Result<(), ConsequenceError> {
        match self {
            Self::Reputation {
                faction,
                delta,
                reason,
            } => system
                .apply_reputation_change(*faction, -delta, &format!("Reverted: {}", reason))
                .map(|_| ()),
            Self::Relationship { ally, loser, delta } => factions
                .update_relationship(*ally, *loser, -delta)
                .map(|_| ())
                .map_err(relationship_error),
            Self::World(effect) => {
                let mut inverse = effect.clone();
                inverse.value = -effect.value;
                inverse.description = format!("Reverted: {}", effect.description);
                system.apply_world_state_effect(&inverse)
            }
        }
    }
}

fn relationship_error(err: FactionError) -> ConsequenceError {
    match err {
        FactionError::NotFound(missing) => ConsequenceError::FactionNotFound(missing),
        other => ConsequenceError::Rejected(other.to_string()),
    }
}

/// Competing quest manager - owns every group and every tension record.
pub struct CompetingQuestManager {
    faction_quests: Arc<FactionQuestSystem>,
    consequences: Arc<dyn ConsequenceSystem>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
    config: CompetingQuestConfig,
    groups: DashMap<CompetingGroupId, Arc<Mutex<CompetingQuestGroup>>>,
    quest_index: DashMap<QuestId, CompetingGroupId>,
    tensions: DashMap<FactionPair, TensionMetrics>,
    conflicts: Mutex<Vec<ConflictRecord>>,
    events: broadcast::Sender<TensionEvent>,
}

impl CompetingQuestManager {
    pub fn new(
        faction_quests: Arc<FactionQuestSystem>,
        consequences: Arc<dyn ConsequenceSystem>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
        config: CompetingQuestConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            faction_quests,
            consequences,
            clock,
            random,
            config,
            groups: DashMap::new(),
            quest_index: DashMap::new(),
            tensions: DashMap::new(),
            conflicts: Mutex::new(Vec::new()),
            events,
        })
    }

    pub fn config(&self) -> &CompetingQuestConfig {
        &self.config
    }

    /// Receive every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TensionEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Group creation
    // =========================================================================

    /// Create a competing group for `template` among `candidates`.
    ///
    /// The template's faction is always the primary member. Other candidates
    /// join only while their relationship with the primary is below the
    /// mutually exclusive threshold, up to `max_competing_quests` members in
    /// total. Fewer than two distinct candidates yield a single-member group.
    #[instrument(skip(self, template), fields(quest_id = %template.id()))]
    pub fn create_competing_quest_group(
        &self,
        template: &FactionQuestTemplate,
        candidates: &[FactionType],
    ) -> Result<CompetingQuestGroup, CompetingQuestError> {
        let primary = template.faction_id;
        let rivals = self.select_competitors(primary, candidates)?;
        let mut members = Vec::with_capacity(rivals.len() + 1);
        members.push(primary);
        members.extend(rivals);
        self.register_group(template, &members)
    }

    /// Spawn a group for a freshly offered quest, if anybody competes.
    ///
    /// Uses the template's `competing_factions` when present; otherwise each
    /// opposing faction joins with probability `competing_quest_probability`.
    #[instrument(skip(self, template), fields(quest_id = %template.id()))]
    pub fn spawn_competing_group(
        &self,
        template: &FactionQuestTemplate,
    ) -> Result<Option<CompetingQuestGroup>, CompetingQuestError> {
        let primary = template.faction_id;
        let candidates: Vec<FactionType> = match &template.competing_factions {
            Some(named) if !named.is_empty() => named.clone(),
            _ => {
                let probability = self.faction_quests.config().competing_quest_probability;
                self.faction_quests
                    .opposing_factions(primary)?
                    .into_iter()
                    .filter(|_| self.random.gen_probability() < probability)
                    .collect()
            }
        };

        let rivals = self.select_competitors(primary, &candidates)?;
        if rivals.is_empty() {
            tracing::debug!(faction = %primary, "No faction competes for quest");
            return Ok(None);
        }
        let mut members = Vec::with_capacity(rivals.len() + 1);
        members.push(primary);
        members.extend(rivals);
        self.register_group(template, &members).map(Some)
    }

    /// Rivalrous candidates other than `primary`, deduplicated and capped.
    fn select_competitors(
        &self,
        primary: FactionType,
        candidates: &[FactionType],
    ) -> Result<Vec<FactionType>, CompetingQuestError> {
        let factions = self.faction_quests.factions();
        let primary_profile = factions.get_faction(primary)?;
        let threshold = self.faction_quests.config().mutually_exclusive_threshold;
        let max_rivals = self.config.max_competing_quests.saturating_sub(1);

        let mut rivals = Vec::new();
        for candidate in candidates {
            if *candidate == primary || rivals.contains(candidate) {
                continue;
            }
            if !factions.contains(*candidate) {
                return Err(CompetingQuestError::FactionNotFound(*candidate));
            }
            let relationship = primary_profile.relationship_with(*candidate);
            if relationship >= threshold {
                tracing::debug!(
                    faction = %primary,
                    candidate = %candidate,
                    relationship,
                    "Allied faction cooperates instead of competing"
                );
                continue;
            }
            if rivals.len() == max_rivals {
                break;
            }
            rivals.push(*candidate);
        }
        Ok(rivals)
    }

    fn register_group(
        &self,
        template: &FactionQuestTemplate,
        members: &[FactionType],
    ) -> Result<CompetingQuestGroup, CompetingQuestError> {
        let now = self.clock.now();
        let factions = self.faction_quests.factions();

        let mut variants = Vec::with_capacity(members.len());
        for member in members {
            let profile = factions.get_faction(*member)?;
            variants.push(self.faction_quests.create_faction_variant(template, &profile));
        }

        let objective = if template.quest.description.is_empty() {
            template.title().to_string()
        } else {
            template.quest.description.clone()
        };
        let group = CompetingQuestGroup::new(
            CompetingGroupId::new(),
            objective,
            template.id().clone(),
            variants,
            now,
        )?;
        let group_id = group.id();

        let mut indexed: Vec<QuestId> = Vec::new();
        for quest_id in group.quest_ids() {
            match self.quest_index.entry(quest_id.clone()) {
                Entry::Occupied(existing) => {
                    let other = *existing.get();
                    drop(existing);
                    for id in &indexed {
                        self.quest_index.remove(id);
                    }
                    return Err(DomainError::constraint(format!(
                        "quest {} already belongs to competing group {}",
                        quest_id, other
                    ))
                    .into());
                }
                Entry::Vacant(slot) => {
                    slot.insert(group_id);
                    indexed.push(quest_id.clone());
                }
            }
        }

        for (index, first) in members.iter().enumerate() {
            for second in &members[index + 1..] {
                let pair = FactionPair::new(*first, *second)?;
                self.tensions
                    .entry(pair)
                    .or_insert_with(|| TensionMetrics::new(pair, now));
            }
        }

        self.groups
            .insert(group_id, Arc::new(Mutex::new(group.clone())));

        tracing::info!(
            group_id = %group_id,
            base_quest_id = %template.id(),
            factions = ?members,
            "Competing quest group created"
        );
        self.publish(TensionEvent::GroupCreated {
            group_id,
            base_quest_id: template.id().clone(),
            factions: members.to_vec(),
        });
        Ok(group)
    }

    // =========================================================================
    // Completion cascade
    // =========================================================================

    /// Record that `faction` completed `quest_id`, cancelling every sibling.
    ///
    /// Cancellation penalties, allied relationship penalties and world effects
    /// are applied before the group changes. If any of them fails, the ones
    /// already applied are reverted by the amount that actually landed and
    /// the group is left untouched.
    #[instrument(skip(self))]
    pub fn complete_quest(
        &self,
        quest_id: &QuestId,
        faction: FactionType,
    ) -> Result<GroupResolution, CompetingQuestError> {
        let group_id = self
            .quest_index
            .get(quest_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| CompetingQuestError::QuestNotFound(quest_id.clone()))?;
        let group_lock = self.group_lock(group_id)?;
        let mut group = lock(&group_lock);

        self.cancel_competing_quests(&mut group, quest_id, faction)
    }

    fn cancel_competing_quests(
        &self,
        group: &mut CompetingQuestGroup,
        quest_id: &QuestId,
        faction: FactionType,
    ) -> Result<GroupResolution, CompetingQuestError> {
        let quest = group
            .quest(quest_id)
            .ok_or_else(|| CompetingQuestError::QuestNotFound(quest_id.clone()))?;
        if quest.assigned_faction() != faction {
            return Err(CompetingQuestError::WrongFaction {
                quest_id: quest_id.clone(),
                expected: quest.assigned_faction(),
                actual: faction,
            });
        }
        group.ensure_can_complete(quest_id, faction)?;

        let now = self.clock.now();
        let allies = self.allies_outside_group(group, faction);
        let plan = self.plan_consequences(group, quest_id, faction, &allies);
        let applied = self.apply_plan(&plan)?;

        let resolution = match group.complete(quest_id, faction, now) {
            Ok(resolution) => resolution,
            Err(err) => {
                self.revert_plan(&applied);
                return Err(err.into());
            }
        };

        for rival in group.factions().iter().filter(|f| **f != faction) {
            let update = self.raise_tension(faction, *rival, now, quest_id)?;
            self.publish(TensionEvent::TensionRaised { update });
        }

        let record =
            ConflictRecord::from_resolution(&resolution, group.objective(), group.location().map(str::to_string));
        lock(&self.conflicts).push(record);

        tracing::info!(
            group_id = %resolution.group_id,
            quest_id = %quest_id,
            faction = %faction,
            cancelled = resolution.cancelled.len(),
            "Competing quest completed"
        );
        self.publish(TensionEvent::Completed {
            group_id: resolution.group_id,
            quest_id: quest_id.clone(),
            faction,
            timestamp: now,
        });
        for cancelled in &resolution.cancelled {
            tracing::info!(
                group_id = %resolution.group_id,
                quest_id = %cancelled.quest_id,
                faction = %cancelled.faction,
                "Competing quest cancelled"
            );
            self.publish(TensionEvent::Cancelled {
                group_id: resolution.group_id,
                quest_id: cancelled.quest_id.clone(),
                faction: cancelled.faction,
                timestamp: now,
            });
        }
        Ok(resolution)
    }

    fn plan_consequences(
        &self,
        group: &CompetingQuestGroup,
        quest_id: &QuestId,
        winner: FactionType,
        allies: &[FactionType],
    ) -> Vec<PlannedConsequence> {
        let location = group.location().map(str::to_string);
        let siblings: Vec<(QuestId, FactionType)> = group
            .quests()
            .filter(|quest| quest.is_active() && quest.id() != quest_id)
            .map(|quest| (quest.id().clone(), quest.assigned_faction()))
            .collect();

        let mut plan = Vec::with_capacity((siblings.len() + 1) * (allies.len() + 2));
        for (sibling, loser) in &siblings {
            plan.push(PlannedConsequence::Reputation {
                faction: *loser,
                delta: self.config.quest_cancellation_penalty,
                reason: format!("Quest {} cancelled: {} completed {}", sibling, winner, quest_id),
            });
        }
        for ally in allies {
            for (_, loser) in &siblings {
                plan.push(PlannedConsequence::Relationship {
                    ally: *ally,
                    loser: *loser,
                    delta: -self.config.allied_relationship_penalty,
                });
            }
        }

        plan.push(PlannedConsequence::World(
            WorldStateEffect::new(
                WorldStateEffectType::QuestCompleted,
                format!("{} completed {}: {}", winner, quest_id, group.objective()),
                self.config.quest_completion_tension_increase,
            )
            .affecting([winner])
            .at(location.clone()),
        ));
        for (sibling, loser) in &siblings {
            plan.push(PlannedConsequence::World(
                WorldStateEffect::new(
                    WorldStateEffectType::QuestCancelled,
                    format!("{} lost {} to {}", loser, sibling, winner),
                    self.config.quest_cancellation_penalty,
                )
                .affecting([*loser])
                .at(location.clone()),
            ));
        }
        for ally in allies {
            plan.push(PlannedConsequence::World(
                WorldStateEffect::new(
                    WorldStateEffectType::FactionAllianceBenefit,
                    format!("{} benefits from ally {} winning {}", ally, winner, group.objective()),
                    f64::from(self.config.allied_relationship_penalty),
                )
                .affecting([*ally, winner])
                .at(location.clone()),
            ));
        }
        plan
    }

    fn apply_plan(
        &self,
        plan: &[PlannedConsequence],
    ) -> Result<Vec<PlannedConsequence>, CompetingQuestError> {
        let factions = self.faction_quests.factions();
        let mut applied = Vec::with_capacity(plan.len());
        for consequence in plan {
            match consequence.apply(self.consequences.as_ref(), factions) {
                Ok(landed) => applied.push(landed),
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        applied = applied.len(),
                        "Consequence failed, reverting cascade"
                    );
                    self.revert_plan(&applied);
                    return Err(CompetingQuestError::ConsequenceApplication(err));
                }
            }
        }
        Ok(applied)
    }

    fn revert_plan(&self, applied: &[PlannedConsequence]) {
        let factions = self.faction_quests.factions();
        for consequence in applied.iter().rev() {
            if let Err(err) = consequence.revert(self.consequences.as_ref(), factions) {
                tracing::warn!(error = %err, ?consequence, "Failed to revert consequence");
            }
        }
    }

    /// Factions outside the group whose relationship with `winner` is above
    /// the alliance threshold.
    fn allies_outside_group(
        &self,
        group: &CompetingQuestGroup,
        winner: FactionType,
    ) -> Vec<FactionType> {
        let factions = self.faction_quests.factions();
        let Ok(relationships) = factions.get_relationships(winner) else {
            return Vec::new();
        };
        relationships
            .into_iter()
            .filter(|(ally, score)| {
                *score > self.config.alliance_threshold
                    && !group.includes_faction(*ally)
                    && factions.contains(*ally)
            })
            .map(|(ally, _)| ally)
            .collect()
    }

    // =========================================================================
    // Tension
    // =========================================================================

    fn raise_tension(
        &self,
        a: FactionType,
        b: FactionType,
        now: DateTime<Utc>,
        quest_id: &QuestId,
    ) -> Result<TensionUpdate, CompetingQuestError> {
        let pair = FactionPair::new(a, b)?;
        let policy = self.decay_policy_for(pair);
        let mut metrics = self
            .tensions
            .entry(pair)
            .or_insert_with(|| TensionMetrics::new(pair, now));
        let update = metrics.raise(
            self.config.quest_completion_tension_increase,
            self.config.max_tension,
            now,
            &policy,
            format!("{} completed competing quest {}", a, quest_id),
        );
        if update.new_tension >= self.config.low_tension_threshold {
            metrics.set_diplomacy_pending(false);
        }
        tracing::debug!(
            pair = %pair,
            old = update.old_tension,
            new = update.new_tension,
            "Tension raised"
        );
        Ok(update)
    }

    /// Decay policy for `pair`, scaled by the mean of both factions' modifiers.
    fn decay_policy_for(&self, pair: FactionPair) -> DecayPolicy {
        let factions = self.faction_quests.factions();
        let modifier = [pair.first(), pair.second()]
            .iter()
            .map(|faction| {
                factions
                    .get_faction(*faction)
                    .map(|profile| profile.decay_modifier())
                    .unwrap_or(1.0)
            })
            .sum::<f64>()
            / 2.0;
        self.config.decay_policy().with_modifier(modifier)
    }

    /// Apply decay to every tracked pair up to `now`.
    ///
    /// Safe to retry: a second call with the same `now` changes nothing. When
    /// decay carries a pair below the low tension threshold, a diplomatic
    /// opportunity is applied. A pair whose opportunity could not be applied
    /// stays pending and is retried on the next call. The first such failure
    /// is returned after every pair has been processed.
    pub fn apply_tension_decay(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<TensionUpdate>, CompetingQuestError> {
        let pairs: Vec<FactionPair> = self.tensions.iter().map(|entry| *entry.key()).collect();
        let low = self.config.low_tension_threshold;
        let mut updates = Vec::new();
        let mut first_error = None;

        for pair in pairs {
            let policy = self.decay_policy_for(pair);
            let (update, pending_tension) = match self.tensions.get_mut(&pair) {
                Some(mut metrics) => {
                    let update = metrics.decay(now, &policy);
                    if update
                        .as_ref()
                        .is_some_and(|u| u.old_tension >= low && u.new_tension < low)
                    {
                        metrics.set_diplomacy_pending(true);
                    }
                    let pending = metrics
                        .diplomacy_pending()
                        .then(|| metrics.current_tension());
                    (update, pending)
                }
                None => continue,
            };

            if let Some(update) = update {
                tracing::debug!(
                    pair = %pair,
                    old = update.old_tension,
                    new = update.new_tension,
                    "Tension decayed"
                );
                self.publish(TensionEvent::Decayed {
                    update: update.clone(),
                });
                updates.push(update);
            }

            let Some(tension) = pending_tension else {
                continue;
            };
            match self.open_diplomatic_opportunity(pair, tension, now) {
                Ok(()) => {
                    if let Some(mut metrics) = self.tensions.get_mut(&pair) {
                        metrics.set_diplomacy_pending(false);
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, pair = %pair, "Failed to apply diplomatic opportunity");
                    if first_error.is_none() {
                        first_error = Some(CompetingQuestError::ConsequenceApplication(err));
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(updates),
        }
    }

    fn open_diplomatic_opportunity(
        &self,
        pair: FactionPair,
        tension: f64,
        now: DateTime<Utc>,
    ) -> Result<(), ConsequenceError> {
        let effect = WorldStateEffect::new(
            WorldStateEffectType::DiplomaticOpportunity,
            format!(
                "Tension between {} and {} has eased enough for talks",
                pair.first(),
                pair.second()
            ),
            tension,
        )
        .affecting([pair.first(), pair.second()]);
        self.consequences.apply_world_state_effect(&effect)?;

        tracing::info!(pair = %pair, tension, "Diplomatic opportunity opened");
        self.publish(TensionEvent::DiplomaticOpportunity {
            pair,
            tension,
            timestamp: now,
        });
        Ok(())
    }

    /// Current tension between two factions, with pending decay projected.
    pub fn tension_between(
        &self,
        a: FactionType,
        b: FactionType,
    ) -> Result<f64, CompetingQuestError> {
        let pair = FactionPair::new(a, b)?;
        Ok(self.projected_tension(pair, self.clock.now()))
    }

    /// Snapshot of the stored tension record for a pair.
    pub fn tension_metrics(&self, a: FactionType, b: FactionType) -> Option<TensionMetrics> {
        let pair = FactionPair::new(a, b).ok()?;
        self.tensions.get(&pair).map(|metrics| metrics.value().clone())
    }

    fn projected_tension(&self, pair: FactionPair, now: DateTime<Utc>) -> f64 {
        let policy = self.decay_policy_for(pair);
        self.tensions
            .get(&pair)
            .map_or(0.0, |metrics| metrics.projected_tension(now, &policy))
    }

    #[cfg(test)]
    pub(crate) fn force_tension(&self, a: FactionType, b: FactionType, tension: f64) {
        if let Ok(pair) = FactionPair::new(a, b) {
            let now = self.clock.now();
            self.tensions
                .entry(pair)
                .or_insert_with(|| TensionMetrics::new(pair, now))
                .force_tension(tension);
        }
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Whether `faction` may pursue `quest_id` right now.
    ///
    /// Being locked out is a normal `false`, not an error.
    pub fn check_quest_availability(
        &self,
        quest_id: &QuestId,
        faction: FactionType,
    ) -> Result<bool, CompetingQuestError> {
        Ok(self.quest_availability(quest_id, faction)?.is_available())
    }

    /// Reasoned variant of [`Self::check_quest_availability`].
    pub fn quest_availability(
        &self,
        quest_id: &QuestId,
        faction: FactionType,
    ) -> Result<QuestAvailability, CompetingQuestError> {
        if !self.faction_quests.factions().contains(faction) {
            return Err(CompetingQuestError::FactionNotFound(faction));
        }
        let Some(group_id) = self.quest_index.get(quest_id).map(|entry| *entry.value()) else {
            return Ok(QuestAvailability::Ungrouped);
        };
        let rivals: Vec<FactionType> = {
            let group_lock = self.group_lock(group_id)?;
            let group = lock(&group_lock);
            group
                .factions()
                .iter()
                .copied()
                .filter(|member| *member != faction)
                .collect()
        };

        let now = self.clock.now();
        for rival in rivals {
            let pair = FactionPair::new(faction, rival)?;
            let tension = self.projected_tension(pair, now);
            if tension > self.config.quest_lockout_threshold {
                tracing::debug!(
                    quest_id = %quest_id,
                    faction = %faction,
                    rival = %rival,
                    tension,
                    "Quest locked out by tension"
                );
                return Ok(QuestAvailability::LockedOut { rival, tension });
            }
        }
        Ok(QuestAvailability::Open)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get_quest_group(
        &self,
        group_id: CompetingGroupId,
    ) -> Result<CompetingQuestGroup, CompetingQuestError> {
        let group_lock = self.group_lock(group_id)?;
        let group = lock(&group_lock);
        Ok(group.clone())
    }

    /// Every group, oldest first.
    pub fn all_quest_groups(&self) -> Vec<CompetingQuestGroup> {
        let locks: Vec<Arc<Mutex<CompetingQuestGroup>>> =
            self.groups.iter().map(|entry| entry.value().clone()).collect();
        let mut groups: Vec<CompetingQuestGroup> =
            locks.iter().map(|group| lock(group).clone()).collect();
        groups.sort_by_key(|group| group.created_at());
        groups
    }

    pub fn quest_groups_for_faction(&self, faction: FactionType) -> Vec<CompetingQuestGroup> {
        self.all_quest_groups()
            .into_iter()
            .filter(|group| group.includes_faction(faction))
            .collect()
    }

    pub fn group_for_quest(
        &self,
        quest_id: &QuestId,
    ) -> Result<CompetingQuestGroup, CompetingQuestError> {
        let group_id = self
            .quest_index
            .get(quest_id)
            .map(|entry| *entry.value())
            .ok_or_else(|| CompetingQuestError::QuestNotFound(quest_id.clone()))?;
        self.get_quest_group(group_id)
    }

    /// Every resolved conflict, newest first.
    pub fn historical_conflicts(&self) -> Vec<ConflictRecord> {
        let mut records = lock(&self.conflicts).clone();
        records.reverse();
        records
    }

    pub fn faction_conflicts(&self, faction: FactionType) -> Vec<ConflictRecord> {
        self.historical_conflicts()
            .into_iter()
            .filter(|record| record.involves(faction))
            .collect()
    }

    fn group_lock(
        &self,
        group_id: CompetingGroupId,
    ) -> Result<Arc<Mutex<CompetingQuestGroup>>, CompetingQuestError> {
        self.groups
            .get(&group_id)
            .map(|entry| entry.value().clone())
            .ok_or(CompetingQuestError::GroupNotFound(group_id))
    }

    fn publish(&self, event: TensionEvent) {
        tracing::trace!(event = event.name(), "Publishing tension event");
        // No receivers is not an error.
        let _ = self.events.send(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
