//! CompetingQuestGroup aggregate - faction quest variants racing for one objective
//!
//! # Invariants
//!
//! - Every member quest is assigned to a distinct faction
//! - A member moves `Active -> Completed` or `Active -> Cancelled`, never back
//! - Completing a member cancels every other active member in the same call,
//!   so no caller ever observes a half-resolved group

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{FactionQuestTemplate, FactionType};
use crate::error::DomainError;
use crate::ids::{CompetingGroupId, QuestId};

/// Lifecycle of a member quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    Active,
    Completed,
    Cancelled,
}

impl QuestStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Lifecycle of the group as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Active,
    Resolved,
}

/// One faction's variant inside a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetingQuest {
    template: FactionQuestTemplate,
    assigned_faction: FactionType,
    location: Option<String>,
    status: QuestStatus,
    completion_time: Option<DateTime<Utc>>,
}

impl CompetingQuest {
    pub fn new(template: FactionQuestTemplate) -> Self {
        let assigned_faction = template.faction_id;
        let location = template.quest.location.clone();
        Self {
            template,
            assigned_faction,
            location,
            status: QuestStatus::Active,
            completion_time: None,
        }
    }

    pub fn id(&self) -> &QuestId {
        self.template.id()
    }

    pub fn template(&self) -> &FactionQuestTemplate {
        &self.template
    }

    pub fn assigned_faction(&self) -> FactionType {
        self.assigned_faction
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn status(&self) -> QuestStatus {
        self.status
    }

    /// Set when the quest reaches a terminal status.
    pub fn completion_time(&self) -> Option<DateTime<Utc>> {
        self.completion_time
    }

    pub fn is_active(&self) -> bool {
        self.status == QuestStatus::Active
    }
}

/// A quest cancelled because a sibling completed first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelledQuest {
    pub quest_id: QuestId,
    pub faction: FactionType,
}

/// Outcome of completing one member of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupResolution {
    pub group_id: CompetingGroupId,
    pub completed_quest: QuestId,
    pub winning_faction: FactionType,
    pub cancelled: Vec<CancelledQuest>,
    pub resolved_at: DateTime<Utc>,
}

impl GroupResolution {
    pub fn losing_factions(&self) -> impl Iterator<Item = FactionType> + '_ {
        self.cancelled.iter().map(|quest| quest.faction)
    }
}

/// A named bundle of faction quests targeting the same objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetingQuestGroup {
    id: CompetingGroupId,
    objective: String,
    location: Option<String>,
    base_quest_id: QuestId,
    quests: BTreeMap<QuestId, CompetingQuest>,
    factions: Vec<FactionType>,
    status: GroupStatus,
    winning_faction: Option<FactionType>,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl CompetingQuestGroup {
    /// Build a group from one variant per faction.
    ///
    /// Fails when there are no variants, or when two variants share a faction
    /// or a quest id.
    pub fn new(
        id: CompetingGroupId,
        objective: impl Into<String>,
        base_quest_id: QuestId,
        variants: Vec<FactionQuestTemplate>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if variants.is_empty() {
            return Err(DomainError::validation(
                "competing quest group needs at least one quest",
            ));
        }

        let location = variants
            .iter()
            .find_map(|variant| variant.quest.location.clone());
        let mut quests = BTreeMap::new();
        let mut factions = Vec::with_capacity(variants.len());
        for variant in variants {
            let faction = variant.faction_id;
            if factions.contains(&faction) {
                return Err(DomainError::constraint(format!(
                    "faction {} appears twice in competing group",
                    faction
                )));
            }
            let quest_id = variant.id().clone();
            if quests.contains_key(&quest_id) {
                return Err(DomainError::constraint(format!(
                    "quest {} appears twice in competing group",
                    quest_id
                )));
            }
            factions.push(faction);
            quests.insert(quest_id, CompetingQuest::new(variant));
        }

        Ok(Self {
            id,
            objective: objective.into(),
            location,
            base_quest_id,
            quests,
            factions,
            status: GroupStatus::Active,
            winning_faction: None,
            created_at: now,
            resolved_at: None,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> CompetingGroupId {
        self.id
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn base_quest_id(&self) -> &QuestId {
        &self.base_quest_id
    }

    /// Competing factions, primary faction first.
    pub fn factions(&self) -> &[FactionType] {
        &self.factions
    }

    pub fn quests(&self) -> impl Iterator<Item = &CompetingQuest> {
        self.quests.values()
    }

    pub fn quest(&self, quest_id: &QuestId) -> Option<&CompetingQuest> {
        self.quests.get(quest_id)
    }

    pub fn quest_ids(&self) -> impl Iterator<Item = &QuestId> {
        self.quests.keys()
    }

    pub fn contains_quest(&self, quest_id: &QuestId) -> bool {
        self.quests.contains_key(quest_id)
    }

    pub fn includes_faction(&self, faction: FactionType) -> bool {
        self.factions.contains(&faction)
    }

    pub fn quest_for_faction(&self, faction: FactionType) -> Option<&CompetingQuest> {
        self.quests
            .values()
            .find(|quest| quest.assigned_faction == faction)
    }

    pub fn status(&self) -> GroupStatus {
        self.status
    }

    pub fn is_resolved(&self) -> bool {
        self.status == GroupStatus::Resolved
    }

    /// A group with a single faction has nobody to compete against.
    pub fn is_degenerate(&self) -> bool {
        self.factions.len() < 2
    }

    pub fn winning_faction(&self) -> Option<FactionType> {
        self.winning_faction
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn active_count(&self) -> usize {
        self.quests.values().filter(|quest| quest.is_active()).count()
    }

    // =========================================================================
    // Domain behavior
    // =========================================================================

    /// Check that `faction` may complete `quest_id` without mutating anything.
    pub fn ensure_can_complete(
        &self,
        quest_id: &QuestId,
        faction: FactionType,
    ) -> Result<&CompetingQuest, DomainError> {
        let quest = self
            .quests
            .get(quest_id)
            .ok_or_else(|| DomainError::not_found("Quest", quest_id.to_string()))?;
        if quest.assigned_faction != faction {
            return Err(DomainError::constraint(format!(
                "quest {} is assigned to {}, not {}",
                quest_id, quest.assigned_faction, faction
            )));
        }
        if !quest.is_active() {
            return Err(DomainError::invalid_state_transition(format!(
                "quest {} is already {:?}",
                quest_id, quest.status
            )));
        }
        if self.is_resolved() {
            return Err(DomainError::invalid_state_transition(format!(
                "competing group {} is already resolved",
                self.id
            )));
        }
        Ok(quest)
    }

    /// Mark `quest_id` completed and cancel every other active member.
    ///
    /// All members become terminal and share the same `completion_time`.
    pub fn complete(
        &mut self,
        quest_id: &QuestId,
        faction: FactionType,
        now: DateTime<Utc>,
    ) -> Result<GroupResolution, DomainError> {
        self.ensure_can_complete(quest_id, faction)?;

        let mut cancelled = Vec::new();
        for (id, quest) in self.quests.iter_mut() {
            if !quest.is_active() {
                continue;
            }
            if id == quest_id {
                quest.status = QuestStatus::Completed;
            } else {
                quest.status = QuestStatus::Cancelled;
                cancelled.push(CancelledQuest {
                    quest_id: id.clone(),
                    faction: quest.assigned_faction,
                });
            }
            quest.completion_time = Some(now);
        }

        self.status = GroupStatus::Resolved;
        self.winning_faction = Some(faction);
        self.resolved_at = Some(now);

        Ok(GroupResolution {
            group_id: self.id,
            completed_quest: quest_id.clone(),
            winning_faction: faction,
            cancelled,
            resolved_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::QuestTemplate;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn variant(id: &str, faction: FactionType) -> FactionQuestTemplate {
        let quest = QuestTemplate::new(id, "Control the market district")
            .with_location("market_district");
        FactionQuestTemplate::from_template(quest, faction)
    }

    fn market_group() -> CompetingQuestGroup {
        CompetingQuestGroup::new(
            CompetingGroupId::new(),
            "control the market district",
            QuestId::new("market"),
            vec![
                variant("market", FactionType::Merchants),
                variant("opposing_market_thieves", FactionType::Thieves),
                variant("opposing_market_warriors", FactionType::Warriors),
            ],
            now(),
        )
        .expect("valid group")
    }

    #[test]
    fn new_group_has_all_members_active() {
        let group = market_group();
        assert_eq!(group.active_count(), 3);
        assert_eq!(group.location(), Some("market_district"));
        assert_eq!(group.factions()[0], FactionType::Merchants);
        assert!(!group.is_degenerate());
        assert_eq!(group.status(), GroupStatus::Active);
    }

    #[test]
    fn duplicate_faction_is_rejected() {
        let result = CompetingQuestGroup::new(
            CompetingGroupId::new(),
            "objective",
            QuestId::new("market"),
            vec![
                variant("a", FactionType::Merchants),
                variant("b", FactionType::Merchants),
            ],
            now(),
        );
        assert!(matches!(result, Err(DomainError::Constraint(_))));
    }

    #[test]
    fn empty_group_is_rejected() {
        let result = CompetingQuestGroup::new(
            CompetingGroupId::new(),
            "objective",
            QuestId::new("market"),
            Vec::new(),
            now(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn completion_cancels_every_sibling() {
        let mut group = market_group();
        let resolution = group
            .complete(&QuestId::new("market"), FactionType::Merchants, now())
            .expect("complete");

        assert_eq!(resolution.winning_faction, FactionType::Merchants);
        assert_eq!(resolution.cancelled.len(), 2);
        assert_eq!(group.active_count(), 0);

        let completed = group
            .quests()
            .filter(|quest| quest.status() == QuestStatus::Completed)
            .count();
        assert_eq!(completed, 1);
        assert!(group
            .quests()
            .all(|quest| quest.completion_time() == Some(now())));
        assert!(group.is_resolved());
        assert_eq!(group.winning_faction(), Some(FactionType::Merchants));
    }

    #[test]
    fn wrong_faction_cannot_complete() {
        let group = market_group();
        let err = group
            .ensure_can_complete(&QuestId::new("market"), FactionType::Thieves)
            .expect_err("wrong faction");
        assert!(matches!(err, DomainError::Constraint(_)));
    }

    #[test]
    fn unknown_quest_is_not_found() {
        let group = market_group();
        let err = group
            .ensure_can_complete(&QuestId::new("nope"), FactionType::Merchants)
            .expect_err("unknown quest");
        assert!(err.is_not_found());
    }

    #[test]
    fn terminal_quests_never_reopen() {
        let mut group = market_group();
        group
            .complete(&QuestId::new("market"), FactionType::Merchants, now())
            .expect("complete");

        let err = group
            .complete(
                &QuestId::new("opposing_market_thieves"),
                FactionType::Thieves,
                now(),
            )
            .expect_err("already cancelled");
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        assert_eq!(
            group
                .quest(&QuestId::new("opposing_market_thieves"))
                .map(CompetingQuest::status),
            Some(QuestStatus::Cancelled)
        );
    }

    #[test]
    fn single_faction_group_is_degenerate() {
        let group = CompetingQuestGroup::new(
            CompetingGroupId::new(),
            "objective",
            QuestId::new("solo"),
            vec![variant("solo", FactionType::Clergy)],
            now(),
        )
        .expect("valid group");
        assert!(group.is_degenerate());
    }
}
