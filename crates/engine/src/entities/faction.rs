//! Faction entity module.
//!
//! Single source of truth for faction profiles and their pairwise
//! relationships. Relationship writes are serialized per unordered faction
//! pair, so updates to independent pairs proceed concurrently.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use visualdm_domain::{
    clamp_relationship, clamp_standing, DomainError, FactionData, FactionPair, FactionProfile,
    FactionType,
};

#[derive(Debug, thiserror::Error)]
pub enum FactionError {
    #[error("Faction not found: {0}")]
    NotFound(FactionType),
    #[error("Faction already exists: {0}")]
    DuplicateFaction(FactionType),
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Standing before and after one adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandingAdjustment {
    pub old: f64,
    pub new: f64,
}

impl StandingAdjustment {
    /// The change that actually landed after clamping.
    pub fn applied_delta(&self) -> f64 {
        self.new - self.old
    }
}

/// Relationship score before and after one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipChange {
    pub old: i32,
    pub new: i32,
}

impl RelationshipChange {
    pub fn applied_delta(&self) -> i32 {
        self.new - self.old
    }
}

/// Faction entity - owns every `FactionProfile`.
pub struct FactionService {
    profiles: DashMap<FactionType, FactionProfile>,
    pair_locks: DashMap<FactionPair, Arc<Mutex<()>>>,
}

impl FactionService {
    pub fn new() -> Self {
        Self {
            profiles: DashMap::new(),
            pair_locks: DashMap::new(),
        }
    }

    /// Service pre-populated with one profile per known faction type.
    pub fn with_default_catalogue() -> Self {
        let service = Self::new();
        for profile in default_catalogue() {
            service.profiles.insert(profile.id, profile);
        }
        service
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Insert a profile built from snapshot data.
    pub fn add_faction(&self, data: FactionData) -> Result<(), FactionError> {
        self.add_profile(FactionProfile::from(data))
    }

    pub fn add_profile(&self, profile: FactionProfile) -> Result<(), FactionError> {
        match self.profiles.entry(profile.id) {
            Entry::Occupied(_) => Err(FactionError::DuplicateFaction(profile.id)),
            Entry::Vacant(slot) => {
                tracing::debug!(faction = %profile.id, name = %profile.name, "Faction added");
                slot.insert(profile);
                Ok(())
            }
        }
    }

    /// Snapshot of one profile.
    pub fn get_faction(&self, id: FactionType) -> Result<FactionProfile, FactionError> {
        self.profiles
            .get(&id)
            .map(|profile| profile.value().clone())
            .ok_or(FactionError::NotFound(id))
    }

    pub fn contains(&self, id: FactionType) -> bool {
        self.profiles.contains_key(&id)
    }

    /// Every profile, ordered by faction type.
    pub fn all_factions(&self) -> Vec<FactionProfile> {
        let mut profiles: Vec<FactionProfile> = self
            .profiles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        profiles.sort_by_key(|profile| profile.id);
        profiles
    }

    /// Remove a profile and every relationship pointing at it.
    pub fn remove_faction(&self, id: FactionType) -> Result<FactionProfile, FactionError> {
        let (_, removed) = self
            .profiles
            .remove(&id)
            .ok_or(FactionError::NotFound(id))?;
        for mut entry in self.profiles.iter_mut() {
            entry.value_mut().relationships.remove(&id);
        }
        tracing::info!(faction = %id, "Faction removed");
        Ok(removed)
    }

    // =========================================================================
    // Relationships
    // =========================================================================

    /// Add `delta` to both sides of the relationship between `faction` and
    /// `target`, clamping each side to [-100, 100].
    ///
    /// Returns the `faction -> target` score before and after. Nothing is
    /// written when either faction is unknown.
    pub fn update_relationship(
        &self,
        faction: FactionType,
        target: FactionType,
        delta: i32,
    ) -> Result<RelationshipChange, FactionError> {
        let pair = FactionPair::new(faction, target)?;
        let lock = self.pair_lock(pair);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current_forward = self.relationship_unlocked(faction, target)?;
        let current_backward = self.relationship_unlocked(target, faction)?;
        let forward = clamp_relationship(i64::from(current_forward) + i64::from(delta));
        let backward = clamp_relationship(i64::from(current_backward) + i64::from(delta));

        match self.profiles.get_mut(&faction) {
            Some(mut profile) => {
                profile.relationships.insert(target, forward);
            }
            None => return Err(FactionError::NotFound(faction)),
        }
        match self.profiles.get_mut(&target) {
            Some(mut profile) => {
                profile.relationships.insert(faction, backward);
            }
            None => {
                // Target was removed between the read and the write.
                if let Some(mut profile) = self.profiles.get_mut(&faction) {
                    profile.relationships.insert(target, current_forward);
                }
                return Err(FactionError::NotFound(target));
            }
        }

        tracing::debug!(
            faction = %faction,
            target = %target,
            delta,
            old = current_forward,
            new = forward,
            "Relationship updated"
        );
        Ok(RelationshipChange {
            old: current_forward,
            new: forward,
        })
    }

    /// Score from `faction` towards `target`, neutral when never set.
    pub fn relationship(
        &self,
        faction: FactionType,
        target: FactionType,
    ) -> Result<i32, FactionError> {
        if !self.contains(target) {
            return Err(FactionError::NotFound(target));
        }
        self.relationship_unlocked(faction, target)
    }

    /// Snapshot of every outgoing relationship of `faction`.
    pub fn get_relationships(
        &self,
        faction: FactionType,
    ) -> Result<BTreeMap<FactionType, i32>, FactionError> {
        self.profiles
            .get(&faction)
            .map(|profile| profile.relationships.clone())
            .ok_or(FactionError::NotFound(faction))
    }

    fn relationship_unlocked(
        &self,
        faction: FactionType,
        target: FactionType,
    ) -> Result<i32, FactionError> {
        self.profiles
            .get(&faction)
            .map(|profile| profile.relationship_with(target))
            .ok_or(FactionError::NotFound(faction))
    }

    fn pair_lock(&self, pair: FactionPair) -> Arc<Mutex<()>> {
        self.pair_locks
            .entry(pair)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // =========================================================================
    // Resources, standing and tier
    // =========================================================================

    /// Add `delta` to a resource stockpile. Negative totals are allowed.
    pub fn update_resource(
        &self,
        faction: FactionType,
        resource: &str,
        delta: f64,
    ) -> Result<f64, FactionError> {
        let mut profile = self
            .profiles
            .get_mut(&faction)
            .ok_or(FactionError::NotFound(faction))?;
        let amount = profile.resources.entry(resource.to_string()).or_insert(0.0);
        *amount += delta;
        Ok(*amount)
    }

    pub fn get_resource(&self, faction: FactionType, resource: &str) -> Result<f64, FactionError> {
        self.profiles
            .get(&faction)
            .map(|profile| profile.resources.get(resource).copied().unwrap_or(0.0))
            .ok_or(FactionError::NotFound(faction))
    }

    pub fn standing(&self, faction: FactionType) -> Result<f64, FactionError> {
        self.profiles
            .get(&faction)
            .map(|profile| profile.reputation)
            .ok_or(FactionError::NotFound(faction))
    }

    /// Add `delta` to the player's standing, clamped to [-100, 100].
    pub fn adjust_standing(
        &self,
        faction: FactionType,
        delta: f64,
    ) -> Result<StandingAdjustment, FactionError> {
        let mut profile = self
            .profiles
            .get_mut(&faction)
            .ok_or(FactionError::NotFound(faction))?;
        let old = profile.reputation;
        profile.reputation = clamp_standing(old + delta);
        tracing::debug!(faction = %faction, delta, old, new = profile.reputation, "Standing adjusted");
        Ok(StandingAdjustment {
            old,
            new: profile.reputation,
        })
    }

    pub fn set_tier(&self, faction: FactionType, tier: u32) -> Result<(), FactionError> {
        let mut profile = self
            .profiles
            .get_mut(&faction)
            .ok_or(FactionError::NotFound(faction))?;
        if profile.tier != tier {
            tracing::info!(faction = %faction, old = profile.tier, new = tier, "Faction tier changed");
            profile.tier = tier;
        }
        Ok(())
    }

    // =========================================================================
    // Snapshot
    // =========================================================================

    /// Dense snapshot of every profile, ordered by faction type.
    pub fn serialize(&self) -> Vec<FactionData> {
        self.all_factions()
            .iter()
            .map(FactionProfile::to_data)
            .collect()
    }

    /// Replace every profile with the snapshot contents.
    ///
    /// The snapshot is checked for duplicate ids before anything is replaced.
    pub fn deserialize(&self, data: Vec<FactionData>) -> Result<(), FactionError> {
        let mut restored: BTreeMap<FactionType, FactionProfile> = BTreeMap::new();
        for entry in data {
            let id = entry.id;
            if restored.insert(id, FactionProfile::from(entry)).is_some() {
                return Err(FactionError::DuplicateFaction(id));
            }
        }

        self.profiles.clear();
        for (id, profile) in restored {
            self.profiles.insert(id, profile);
        }
        tracing::info!(count = self.profiles.len(), "Faction snapshot restored");
        Ok(())
    }
}

impl Default for FactionService {
    fn default() -> Self {
        Self::new()
    }
}

/// Starting profiles for every known faction type.
pub fn default_catalogue() -> Vec<FactionProfile> {
    FactionType::ALL
        .iter()
        .map(|faction| match faction {
            FactionType::Merchants => FactionProfile::new(*faction, "Merchant Guild")
                .with_description("Traders who control the flow of coin and goods")
                .with_value("wealth", 0.9)
                .with_value("order", 0.6)
                .with_resource("gold", 1_000.0),
            FactionType::Thieves => FactionProfile::new(*faction, "Shadow Hand")
                .with_description("A network of smugglers, fences and burglars")
                .with_value("freedom", 0.8)
                .with_value("wealth", 0.7)
                .with_resource("gold", 400.0),
            FactionType::Warriors => FactionProfile::new(*faction, "Iron Legion")
                .with_description("Sworn swords and mercenary companies")
                .with_value("honor", 0.8)
                .with_value("strength", 0.9)
                .with_resource("soldiers", 200.0),
            FactionType::Scholars => FactionProfile::new(*faction, "Collegium")
                .with_description("Keepers of libraries and forgotten lore")
                .with_value("knowledge", 0.9)
                .with_value("tradition", 0.5)
                .with_resource("tomes", 300.0),
            FactionType::Mystics => FactionProfile::new(*faction, "Veiled Circle")
                .with_description("Seers and ritualists who bargain with the unseen")
                .with_value("knowledge", 0.6)
                .with_value("mystery", 0.9)
                .with_resource("reagents", 150.0),
            FactionType::Nobility => FactionProfile::new(*faction, "High Court")
                .with_description("Landed houses that hold the titles and the law")
                .with_value("tradition", 0.9)
                .with_value("order", 0.8)
                .with_resource("gold", 2_000.0),
            FactionType::Clergy => FactionProfile::new(*faction, "Temple of Dawn")
                .with_description("Priests and lay brothers of the established faith")
                .with_value("faith", 0.9)
                .with_value("charity", 0.6)
                .with_resource("tithes", 500.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn service_with(factions: &[FactionType]) -> FactionService {
        let service = FactionService::new();
        for faction in factions {
            service
                .add_profile(FactionProfile::new(*faction, faction.to_string()))
                .expect("add faction");
        }
        service
    }

    #[test]
    fn update_relationship_writes_both_sides() {
        let service = service_with(&[FactionType::Merchants, FactionType::Thieves]);

        let change = service
            .update_relationship(FactionType::Merchants, FactionType::Thieves, -80)
            .expect("update");

        assert_eq!(change, RelationshipChange { old: 0, new: -80 });
        assert_eq!(
            service.relationship(FactionType::Merchants, FactionType::Thieves).ok(),
            Some(-80)
        );
        assert_eq!(
            service.relationship(FactionType::Thieves, FactionType::Merchants).ok(),
            Some(-80)
        );
    }

    #[test]
    fn update_relationship_clamps_each_side() {
        let service = service_with(&[FactionType::Merchants, FactionType::Thieves]);
        service
            .update_relationship(FactionType::Merchants, FactionType::Thieves, -90)
            .expect("update");
        let change = service
            .update_relationship(FactionType::Thieves, FactionType::Merchants, -90)
            .expect("update");
        assert_eq!(change.new, -100);
        assert_eq!(change.applied_delta(), -10);
    }

    #[test]
    fn unknown_faction_is_not_found() {
        let service = service_with(&[FactionType::Merchants]);
        assert!(matches!(
            service.get_faction(FactionType::Mystics),
            Err(FactionError::NotFound(FactionType::Mystics))
        ));
    }

    #[test]
    fn update_with_unknown_target_leaves_known_faction_untouched() {
        let service = service_with(&[FactionType::Merchants]);

        let result = service.update_relationship(FactionType::Merchants, FactionType::Thieves, -30);

        assert!(matches!(result, Err(FactionError::NotFound(FactionType::Thieves))));
        let relationships = service
            .get_relationships(FactionType::Merchants)
            .expect("relationships");
        assert!(relationships.is_empty());
    }

    #[test]
    fn self_relationship_is_rejected() {
        let service = service_with(&[FactionType::Merchants]);
        let result = service.update_relationship(FactionType::Merchants, FactionType::Merchants, 5);
        assert!(matches!(result, Err(FactionError::Domain(_))));
    }

    #[test]
    fn duplicate_add_fails() {
        let service = service_with(&[FactionType::Clergy]);
        let result = service.add_profile(FactionProfile::new(FactionType::Clergy, "Again"));
        assert!(matches!(result, Err(FactionError::DuplicateFaction(FactionType::Clergy))));
        assert_eq!(
            service.get_faction(FactionType::Clergy).map(|p| p.name).ok(),
            Some("clergy".to_string())
        );
    }

    #[test]
    fn resources_may_go_negative() {
        let service = service_with(&[FactionType::Merchants]);
        service
            .update_resource(FactionType::Merchants, "gold", 50.0)
            .expect("update");
        let total = service
            .update_resource(FactionType::Merchants, "gold", -80.0)
            .expect("update");
        assert_eq!(total, -30.0);
        assert_eq!(service.get_resource(FactionType::Merchants, "gems").ok(), Some(0.0));
    }

    #[test]
    fn standing_is_clamped() {
        let service = service_with(&[FactionType::Nobility]);
        let adjustment = service
            .adjust_standing(FactionType::Nobility, 250.0)
            .expect("adjust");
        assert_eq!(adjustment.new, 100.0);
        assert_eq!(adjustment.applied_delta(), 100.0);
    }

    #[test]
    fn remove_faction_strips_incoming_relationships() {
        let service = service_with(&[FactionType::Merchants, FactionType::Thieves]);
        service
            .update_relationship(FactionType::Merchants, FactionType::Thieves, -20)
            .expect("update");

        service.remove_faction(FactionType::Thieves).expect("remove");

        let relationships = service
            .get_relationships(FactionType::Merchants)
            .expect("relationships");
        assert!(!relationships.contains_key(&FactionType::Thieves));
        assert!(service.remove_faction(FactionType::Thieves).is_err());
    }

    #[test]
    fn serialize_is_dense_and_round_trips() {
        let service = service_with(&[FactionType::Merchants, FactionType::Thieves]);
        service
            .update_relationship(FactionType::Merchants, FactionType::Thieves, -40)
            .expect("update");
        service.set_tier(FactionType::Merchants, 2).expect("tier");

        let snapshot = service.serialize();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot
            .iter()
            .all(|data| data.relationships.len() == FactionType::ALL.len()));

        let restored = FactionService::new();
        restored.deserialize(snapshot.clone()).expect("restore");
        assert_eq!(restored.serialize(), snapshot);
        assert_eq!(
            restored.get_faction(FactionType::Merchants).map(|p| p.tier).ok(),
            Some(2)
        );
    }

    #[test]
    fn deserialize_rejects_duplicates_without_clearing() {
        let service = service_with(&[FactionType::Warriors]);
        let data = FactionProfile::new(FactionType::Mystics, "Circle").to_data();

        let result = service.deserialize(vec![data.clone(), data]);

        assert!(matches!(result, Err(FactionError::DuplicateFaction(FactionType::Mystics))));
        assert!(service.contains(FactionType::Warriors));
    }

    #[test]
    fn default_catalogue_covers_every_faction() {
        let service = FactionService::with_default_catalogue();
        assert_eq!(service.all_factions().len(), FactionType::ALL.len());
    }

    fn faction_strategy() -> impl Strategy<Value = FactionType> {
        prop::sample::select(FactionType::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn relationships_stay_symmetric_and_clamped(
            updates in prop::collection::vec((faction_strategy(), faction_strategy(), -150i32..150), 0..60)
        ) {
            let service = FactionService::with_default_catalogue();
            for (a, b, delta) in updates {
                if a == b {
                    continue;
                }
                service.update_relationship(a, b, delta).expect("update");
                let forward = service.relationship(a, b).expect("forward");
                let backward = service.relationship(b, a).expect("backward");
                prop_assert_eq!(forward, backward);
                prop_assert!((-100..=100).contains(&forward));
            }
        }
    }
}
