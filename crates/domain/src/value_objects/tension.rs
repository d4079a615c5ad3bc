//! Decaying conflict score between two factions.
//!
//! Tension only moves in two ways: it rises by a fixed amount when a quest in a
//! competing group is completed, and it decays with elapsed wall-clock time.
//! It never drops below zero.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::FactionType;
use crate::error::DomainError;

/// Number of updates retained per pair.
pub const MAX_TENSION_HISTORY: usize = 64;

/// Unordered pair of distinct factions.
///
/// The smaller faction (by declaration order) is always stored first, so
/// `(A, B)` and `(B, A)` map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionPair {
    first: FactionType,
    second: FactionType,
}

impl FactionPair {
    pub fn new(a: FactionType, b: FactionType) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::constraint(format!(
                "faction pair needs two distinct factions, got {} twice",
                a
            )));
        }
        let (first, second) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { first, second })
    }

    pub fn first(&self) -> FactionType {
        self.first
    }

    pub fn second(&self) -> FactionType {
        self.second
    }

    pub fn contains(&self, faction: FactionType) -> bool {
        self.first == faction || self.second == faction
    }

    /// The member that is not `faction`, if `faction` belongs to the pair.
    pub fn other(&self, faction: FactionType) -> Option<FactionType> {
        if self.first == faction {
            Some(self.second)
        } else if self.second == faction {
            Some(self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for FactionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.first, self.second)
    }
}

/// Parameters of the decay function for one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayPolicy {
    /// Length of one decay interval
    pub interval: TimeDelta,
    /// Tension removed per interval while at or below `high_tension_threshold`
    pub base_rate: f64,
    /// Slower rate used while tension is above `high_tension_threshold`
    pub high_tension_rate: f64,
    pub high_tension_threshold: f64,
    /// After this long without a conflict, tension is fully dissipated
    pub max_decay_time: TimeDelta,
    /// Faction-specific multiplier on the rate
    pub modifier: f64,
}

impl DecayPolicy {
    pub fn with_modifier(mut self, modifier: f64) -> Self {
        self.modifier = modifier;
        self
    }

    /// Tension left after `intervals` decay intervals starting from `tension`.
    ///
    /// Decay runs at the slow rate until tension reaches the high tension
    /// threshold and at the base rate below it, so splitting a span into
    /// several calls gives the same result as one call over the whole span.
    fn decay_from(&self, tension: f64, intervals: f64) -> f64 {
        let mut remaining = intervals;
        let mut tension = tension;

        if tension > self.high_tension_threshold {
            let slow = self.high_tension_rate * self.modifier;
            if slow <= 0.0 {
                return tension;
            }
            let to_threshold = (tension - self.high_tension_threshold) / slow;
            if remaining <= to_threshold {
                return tension - slow * remaining;
            }
            remaining -= to_threshold;
            tension = self.high_tension_threshold;
        }

        (tension - self.base_rate * self.modifier * remaining).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionUpdateKind {
    QuestCompletion,
    NaturalDecay,
}

/// One recorded change to a pair's tension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionUpdate {
    pub pair: FactionPair,
    pub kind: TensionUpdateKind,
    pub old_tension: f64,
    pub new_tension: f64,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

impl TensionUpdate {
    pub fn change(&self) -> f64 {
        self.new_tension - self.old_tension
    }
}

/// Tension record for one faction pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensionMetrics {
    pair: FactionPair,
    current_tension: f64,
    historical_peak: f64,
    last_conflict_time: DateTime<Utc>,
    last_decay_time: DateTime<Utc>,
    last_update_time: DateTime<Utc>,
    /// Set when decay crossed the low tension threshold and the resulting
    /// diplomatic opportunity has not been applied yet
    #[serde(default)]
    diplomacy_pending: bool,
    updates: VecDeque<TensionUpdate>,
}

impl TensionMetrics {
    pub fn new(pair: FactionPair, now: DateTime<Utc>) -> Self {
        Self {
            pair,
            current_tension: 0.0,
            historical_peak: 0.0,
            last_conflict_time: now,
            last_decay_time: now,
            last_update_time: now,
            diplomacy_pending: false,
            updates: VecDeque::new(),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn pair(&self) -> FactionPair {
        self.pair
    }

    pub fn current_tension(&self) -> f64 {
        self.current_tension
    }

    pub fn historical_peak(&self) -> f64 {
        self.historical_peak
    }

    pub fn last_conflict_time(&self) -> DateTime<Utc> {
        self.last_conflict_time
    }

    pub fn last_decay_time(&self) -> DateTime<Utc> {
        self.last_decay_time
    }

    pub fn last_update_time(&self) -> DateTime<Utc> {
        self.last_update_time
    }

    pub fn updates(&self) -> impl Iterator<Item = &TensionUpdate> {
        self.updates.iter()
    }

    pub fn diplomacy_pending(&self) -> bool {
        self.diplomacy_pending
    }

    // =========================================================================
    // Domain behavior
    // =========================================================================

    /// Tension as it would be after decaying up to `now`, without mutating.
    ///
    /// Returns the stored value when `now` is not after the last decay, so
    /// out-of-order reads never move tension.
    pub fn projected_tension(&self, now: DateTime<Utc>, policy: &DecayPolicy) -> f64 {
        let elapsed = now - self.last_decay_time;
        if elapsed <= TimeDelta::zero() {
            return self.current_tension;
        }
        if now - self.last_conflict_time >= policy.max_decay_time {
            return 0.0;
        }

        let interval_ms = policy.interval.num_milliseconds().max(1) as f64;
        let intervals = elapsed.num_milliseconds() as f64 / interval_ms;
        policy.decay_from(self.current_tension, intervals)
    }

    /// Apply decay up to `now`.
    ///
    /// Returns the recorded update, or `None` when nothing changed. Calling it
    /// twice with the same `now` changes nothing the second time.
    pub fn decay(&mut self, now: DateTime<Utc>, policy: &DecayPolicy) -> Option<TensionUpdate> {
        if now <= self.last_decay_time {
            return None;
        }
        let old = self.current_tension;
        let new = self.projected_tension(now, policy);
        self.last_decay_time = now;
        if (old - new).abs() < f64::EPSILON {
            return None;
        }

        self.current_tension = new;
        self.last_update_time = now;
        Some(self.record(TensionUpdate {
            pair: self.pair,
            kind: TensionUpdateKind::NaturalDecay,
            old_tension: old,
            new_tension: new,
            timestamp: now,
            reason: "Natural tension decay over time".to_string(),
        }))
    }

    pub fn set_diplomacy_pending(&mut self, pending: bool) {
        self.diplomacy_pending = pending;
    }

    /// Raise tension after a quest completion, capped at `max_tension`.
    ///
    /// Pending decay is applied first so the increase lands on an up-to-date
    /// value.
    pub fn raise(
        &mut self,
        amount: f64,
        max_tension: f64,
        now: DateTime<Utc>,
        policy: &DecayPolicy,
        reason: impl Into<String>,
    ) -> TensionUpdate {
        self.decay(now, policy);

        let old = self.current_tension;
        let new = (old + amount.max(0.0)).min(max_tension).max(0.0);
        self.current_tension = new;
        self.historical_peak = self.historical_peak.max(new);
        self.last_conflict_time = now;
        self.last_decay_time = self.last_decay_time.max(now);
        self.last_update_time = now;

        self.record(TensionUpdate {
            pair: self.pair,
            kind: TensionUpdateKind::QuestCompletion,
            old_tension: old,
            new_tension: new,
            timestamp: now,
            reason: reason.into(),
        })
    }

    /// Overwrite the stored tension (test fixtures only).
    #[doc(hidden)]
    pub fn force_tension(&mut self, tension: f64) {
        self.current_tension = tension.max(0.0);
        self.historical_peak = self.historical_peak.max(self.current_tension);
    }

    fn record(&mut self, update: TensionUpdate) -> TensionUpdate {
        if self.updates.len() == MAX_TENSION_HISTORY {
            self.updates.pop_front();
        }
        self.updates.push_back(update.clone());
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn policy() -> DecayPolicy {
        DecayPolicy {
            interval: TimeDelta::hours(1),
            base_rate: 5.0,
            high_tension_rate: 2.0,
            high_tension_threshold: 75.0,
            max_decay_time: TimeDelta::days(7),
            modifier: 1.0,
        }
    }

    fn pair() -> FactionPair {
        FactionPair::new(FactionType::Thieves, FactionType::Merchants).expect("distinct")
    }

    #[test]
    fn pair_is_order_independent() {
        let a = FactionPair::new(FactionType::Merchants, FactionType::Thieves).expect("distinct");
        let b = FactionPair::new(FactionType::Thieves, FactionType::Merchants).expect("distinct");
        assert_eq!(a, b);
        assert_eq!(a.first(), FactionType::Merchants);
        assert_eq!(a.other(FactionType::Thieves), Some(FactionType::Merchants));
        assert_eq!(a.other(FactionType::Clergy), None);
    }

    #[test]
    fn pair_rejects_same_faction() {
        assert!(FactionPair::new(FactionType::Clergy, FactionType::Clergy).is_err());
    }

    #[test]
    fn new_metrics_start_at_zero() {
        let metrics = TensionMetrics::new(pair(), t0());
        assert_eq!(metrics.current_tension(), 0.0);
        assert_eq!(metrics.updates().count(), 0);
    }

    #[test]
    fn raise_is_capped_and_tracks_peak() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(60.0, 100.0, t0(), &policy(), "first");
        let update = metrics.raise(60.0, 100.0, t0(), &policy(), "second");

        assert_eq!(update.new_tension, 100.0);
        assert_eq!(metrics.current_tension(), 100.0);
        assert_eq!(metrics.historical_peak(), 100.0);
        assert_eq!(metrics.last_conflict_time(), t0());
    }

    #[test]
    fn decay_uses_base_rate_below_high_threshold() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(50.0, 100.0, t0(), &policy(), "conflict");

        let update = metrics
            .decay(t0() + TimeDelta::hours(2), &policy())
            .expect("tension decays");
        assert_eq!(update.kind, TensionUpdateKind::NaturalDecay);
        assert!((metrics.current_tension() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn decay_is_slower_above_high_threshold() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(90.0, 100.0, t0(), &policy(), "conflict");

        metrics.decay(t0() + TimeDelta::hours(2), &policy());
        assert!((metrics.current_tension() - 86.0).abs() < 1e-9);
    }

    #[test]
    fn decay_crosses_high_threshold_at_base_rate() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(80.0, 100.0, t0(), &policy(), "conflict");

        // 2.5 hours at 2.0 reach 75, the remaining 1.5 hours run at 5.0.
        metrics.decay(t0() + TimeDelta::hours(4), &policy());
        assert!((metrics.current_tension() - 67.5).abs() < 1e-9);
    }

    #[test]
    fn one_long_decay_matches_hourly_ticks() {
        let policy = policy().with_modifier(1.1);
        let mut once = TensionMetrics::new(pair(), t0());
        once.raise(80.0, 100.0, t0(), &policy, "conflict");
        let mut hourly = once.clone();

        once.decay(t0() + TimeDelta::hours(10), &policy);
        for hour in 1..=10 {
            hourly.decay(t0() + TimeDelta::hours(hour), &policy);
        }

        assert!((once.current_tension() - hourly.current_tension()).abs() < 1e-9);
        assert!((once.current_tension() - 32.5).abs() < 1e-9);
    }

    #[test]
    fn decay_scales_with_modifier() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(50.0, 100.0, t0(), &policy(), "conflict");

        metrics.decay(t0() + TimeDelta::hours(1), &policy().with_modifier(1.5));
        assert!((metrics.current_tension() - 42.5).abs() < 1e-9);
    }

    #[test]
    fn decay_twice_at_same_instant_is_noop() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(50.0, 100.0, t0(), &policy(), "conflict");
        let later = t0() + TimeDelta::minutes(90);

        metrics.decay(later, &policy());
        let after_first = metrics.current_tension();
        assert!(metrics.decay(later, &policy()).is_none());
        assert_eq!(metrics.current_tension(), after_first);
    }

    #[test]
    fn decay_resets_after_max_decay_time() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(100.0, 100.0, t0(), &policy(), "conflict");

        metrics.decay(t0() + TimeDelta::days(7), &policy());
        assert_eq!(metrics.current_tension(), 0.0);
    }

    #[test]
    fn projection_does_not_mutate() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(50.0, 100.0, t0(), &policy(), "conflict");

        let projected = metrics.projected_tension(t0() + TimeDelta::hours(4), &policy());
        assert!((projected - 30.0).abs() < 1e-9);
        assert_eq!(metrics.current_tension(), 50.0);
    }

    #[test]
    fn out_of_order_decay_is_ignored() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        metrics.raise(50.0, 100.0, t0() + TimeDelta::hours(1), &policy(), "conflict");

        assert!(metrics.decay(t0(), &policy()).is_none());
        assert_eq!(metrics.current_tension(), 50.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut metrics = TensionMetrics::new(pair(), t0());
        for i in 0..(MAX_TENSION_HISTORY + 10) {
            metrics.raise(1.0, 1_000.0, t0() + TimeDelta::seconds(i as i64), &policy(), "tick");
        }
        assert_eq!(metrics.updates().count(), MAX_TENSION_HISTORY);
    }

    proptest! {
        #[test]
        fn tension_never_negative(
            events in prop::collection::vec((any::<bool>(), 0.0f64..40.0, 0i64..200_000), 0..40)
        ) {
            let mut metrics = TensionMetrics::new(pair(), t0());
            let mut now = t0();
            for (is_completion, amount, seconds) in events {
                now += TimeDelta::seconds(seconds);
                if is_completion {
                    metrics.raise(amount, 100.0, now, &policy(), "prop");
                } else {
                    metrics.decay(now, &policy());
                }
                prop_assert!(metrics.current_tension() >= 0.0);
                prop_assert!(metrics.current_tension() <= 100.0);
            }
        }

        #[test]
        fn decay_is_independent_of_tick_count(
            start in 0.0f64..100.0,
            minutes in 1i64..2_000,
            ticks in 1i64..20,
        ) {
            let mut once = TensionMetrics::new(pair(), t0());
            once.raise(start, 100.0, t0(), &policy(), "prop");
            let mut split = once.clone();

            once.decay(t0() + TimeDelta::minutes(minutes * ticks), &policy());
            for tick in 1..=ticks {
                split.decay(t0() + TimeDelta::minutes(minutes * tick), &policy());
            }
            prop_assert!((once.current_tension() - split.current_tension()).abs() < 1e-6);
        }

        #[test]
        fn repeated_decay_is_idempotent(start in 0.0f64..100.0, minutes in 0i64..20_000) {
            let mut metrics = TensionMetrics::new(pair(), t0());
            metrics.raise(start, 100.0, t0(), &policy(), "prop");
            let now = t0() + TimeDelta::minutes(minutes);

            metrics.decay(now, &policy());
            let once = metrics.current_tension();
            metrics.decay(now, &policy());
            prop_assert_eq!(metrics.current_tension(), once);
        }
    }
}
