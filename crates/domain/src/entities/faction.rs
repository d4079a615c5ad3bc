//! Faction profiles and their persisted snapshot shape.
//!
//! A faction is an NPC-controlled organization. Its relationships with other
//! factions are kept as a signed score in [-100, 100] that is symmetric by
//! construction: the service that owns profiles always writes both sides.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Lowest relationship score between two factions.
pub const RELATIONSHIP_MIN: i32 = -100;
/// Highest relationship score between two factions.
pub const RELATIONSHIP_MAX: i32 = 100;
/// Lowest player standing with a faction.
pub const STANDING_MIN: f64 = -100.0;
/// Highest player standing with a faction.
pub const STANDING_MAX: f64 = 100.0;

/// Clamp a relationship score into [`RELATIONSHIP_MIN`, `RELATIONSHIP_MAX`].
pub fn clamp_relationship(value: i64) -> i32 {
    // Bounded by the clamp, so the narrowing cast is lossless.
    value.clamp(i64::from(RELATIONSHIP_MIN), i64::from(RELATIONSHIP_MAX)) as i32
}

/// Clamp a standing value into [`STANDING_MIN`, `STANDING_MAX`].
pub fn clamp_standing(value: f64) -> f64 {
    value.clamp(STANDING_MIN, STANDING_MAX)
}

/// The closed set of factions known to the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionType {
    Merchants,
    Thieves,
    Warriors,
    Scholars,
    Mystics,
    Nobility,
    Clergy,
}

impl FactionType {
    /// Every faction type, in declaration order.
    pub const ALL: [FactionType; 7] = [
        FactionType::Merchants,
        FactionType::Thieves,
        FactionType::Warriors,
        FactionType::Scholars,
        FactionType::Mystics,
        FactionType::Nobility,
        FactionType::Clergy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merchants => "merchants",
            Self::Thieves => "thieves",
            Self::Warriors => "warriors",
            Self::Scholars => "scholars",
            Self::Mystics => "mystics",
            Self::Nobility => "nobility",
            Self::Clergy => "clergy",
        }
    }
}

impl fmt::Display for FactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FactionType {
    type Err = DomainError;

    /// Parse a faction type (case-insensitive, accepts singular aliases).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merchants" | "merchant" => Ok(Self::Merchants),
            "thieves" | "thief" => Ok(Self::Thieves),
            "warriors" | "warrior" => Ok(Self::Warriors),
            "scholars" | "scholar" => Ok(Self::Scholars),
            "mystics" | "mystic" => Ok(Self::Mystics),
            "nobility" | "noble" | "nobles" => Ok(Self::Nobility),
            "clergy" | "cleric" => Ok(Self::Clergy),
            _ => Err(DomainError::parse(format!("Unknown faction type: {}", s))),
        }
    }
}

/// Insert a zero score for every known faction type missing from `relationships`.
///
/// Serialized snapshots are always dense so consumers never need a default.
pub fn fill_missing_faction_types(relationships: &mut BTreeMap<FactionType, i32>) {
    for faction in FactionType::ALL {
        relationships.entry(faction).or_insert(0);
    }
}

/// Per-faction static and mutable attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct FactionProfile {
    pub id: FactionType,
    pub name: String,
    pub description: String,
    /// Relationship score towards each other faction, in [-100, 100]
    pub relationships: BTreeMap<FactionType, i32>,
    /// Cultural weights such as "tradition" or "wealth", used for quest flavor
    pub values: BTreeMap<String, f64>,
    /// Resource stockpiles. Never clamped here; callers may go negative.
    pub resources: BTreeMap<String, f64>,
    /// Rank gating which quest templates the faction offers
    pub tier: u32,
    /// Player-facing standing with this faction, in [-100, 100]
    pub reputation: f64,
}

impl FactionProfile {
    pub fn new(id: FactionType, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            relationships: BTreeMap::new(),
            values: BTreeMap::new(),
            resources: BTreeMap::new(),
            tier: 0,
            reputation: 0.0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tier(mut self, tier: u32) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_reputation(mut self, reputation: f64) -> Self {
        self.reputation = clamp_standing(reputation);
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, weight: f64) -> Self {
        self.values.insert(key.into(), weight);
        self
    }

    pub fn with_resource(mut self, key: impl Into<String>, amount: f64) -> Self {
        self.resources.insert(key.into(), amount);
        self
    }

    /// Relationship score towards `other`, defaulting to neutral.
    pub fn relationship_with(&self, other: FactionType) -> i32 {
        self.relationships.get(&other).copied().unwrap_or(0)
    }

    /// Cultural value weight, defaulting to zero.
    pub fn value(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    /// Multiplier applied to tension decay between this faction and a rival.
    ///
    /// Higher-tier factions are more established and settle grudges faster.
    pub fn decay_modifier(&self) -> f64 {
        1.0 + f64::from(self.tier) * 0.1
    }

    /// Dense snapshot of this profile.
    pub fn to_data(&self) -> FactionData {
        let mut relationships = self.relationships.clone();
        fill_missing_faction_types(&mut relationships);
        FactionData {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            relationships,
            values: self.values.clone(),
            resources: self.resources.clone(),
            standing: self.reputation,
            tier: self.tier,
        }
    }
}

/// Canonical snapshot format for a faction.
///
/// Every persistence layer round-trips through exactly this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionData {
    pub id: FactionType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub relationships: BTreeMap<FactionType, i32>,
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    #[serde(default)]
    pub resources: BTreeMap<String, f64>,
    #[serde(default)]
    pub standing: f64,
    #[serde(default)]
    pub tier: u32,
}

impl From<FactionData> for FactionProfile {
    fn from(data: FactionData) -> Self {
        let relationships = data
            .relationships
            .into_iter()
            .map(|(faction, score)| (faction, clamp_relationship(i64::from(score))))
            .collect();
        Self {
            id: data.id,
            name: data.name,
            description: data.description,
            relationships,
            values: data.values,
            resources: data.resources,
            tier: data.tier,
            reputation: clamp_standing(data.standing),
        }
    }
}
