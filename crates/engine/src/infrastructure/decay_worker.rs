//! Background worker that decays faction tension on a fixed tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::ports::ClockPort;
use crate::use_cases::CompetingQuestManager;

pub struct TensionDecayWorker {
    manager: Arc<CompetingQuestManager>,
    clock: Arc<dyn ClockPort>,
    period: Duration,
}

impl TensionDecayWorker {
    pub fn new(
        manager: Arc<CompetingQuestManager>,
        clock: Arc<dyn ClockPort>,
        period: Duration,
    ) -> Self {
        Self {
            manager,
            clock,
            period,
        }
    }

    /// Run one decay pass. Failures are logged and retried next tick.
    pub fn tick(&self) -> usize {
        match self.manager.apply_tension_decay(self.clock.now()) {
            Ok(updates) => {
                if !updates.is_empty() {
                    tracing::debug!(pairs = updates.len(), "Tension decay tick applied");
                }
                updates.len()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Tension decay tick failed");
                0
            }
        }
    }

    /// Tick until `cancel_token` is cancelled.
    pub async fn run(self, cancel_token: CancellationToken) {
        tracing::info!(period_secs = self.period.as_secs_f64(), "Starting tension decay worker");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    tracing::info!("Tension decay worker shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.tick();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{FactionQuestSystem, FactionService};
    use crate::infrastructure::clock::{FixedRandom, ManualClock};
    use crate::infrastructure::consequences::ConsequenceLedger;
    use chrono::{TimeDelta, TimeZone, Utc};
    use visualdm_domain::{
        CompetingQuestConfig, FactionQuestConfig, FactionQuestTemplate, FactionType,
        QuestTemplate,
    };

    fn manager(clock: Arc<ManualClock>) -> Arc<CompetingQuestManager> {
        let factions = Arc::new(FactionService::with_default_catalogue());
        let faction_quests = Arc::new(
            FactionQuestSystem::new(factions.clone(), FactionQuestConfig::default())
                .expect("valid config"),
        );
        let manager = CompetingQuestManager::new(
            faction_quests,
            Arc::new(ConsequenceLedger::new(factions, clock.clone())),
            clock,
            Arc::new(FixedRandom::new(0.5)),
            CompetingQuestConfig::default(),
        )
        .expect("valid config");
        let template = FactionQuestTemplate::from_template(
            QuestTemplate::new("caravan", "Escort the caravan"),
            FactionType::Merchants,
        );
        manager
            .create_competing_quest_group(&template, &[FactionType::Thieves])
            .expect("create group");
        manager.force_tension(FactionType::Merchants, FactionType::Thieves, 50.0);
        Arc::new(manager)
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn tick_decays_elapsed_time() {
        let clock = Arc::new(ManualClock::new(start()));
        let manager = manager(clock.clone());
        let worker = TensionDecayWorker::new(manager.clone(), clock.clone(), Duration::from_secs(1));

        assert_eq!(worker.tick(), 0);
        clock.advance(TimeDelta::hours(2));
        assert_eq!(worker.tick(), 1);
        assert_eq!(worker.tick(), 0);

        let tension = manager
            .tension_metrics(FactionType::Merchants, FactionType::Thieves)
            .map(|metrics| metrics.current_tension())
            .expect("metrics");
        assert!(tension < 50.0);
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new(start()));
        let manager = manager(clock.clone());
        clock.advance(TimeDelta::hours(1));
        let worker = TensionDecayWorker::new(manager.clone(), clock, Duration::from_millis(5));
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(worker.run(cancel_token.clone()));
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let decayed = manager
                    .tension_metrics(FactionType::Merchants, FactionType::Thieves)
                    .is_some_and(|metrics| metrics.current_tension() < 50.0);
                if decayed {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("decay applied");

        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker stopped")
            .expect("worker task");
    }
}
