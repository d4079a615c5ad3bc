//! Application state and composition.

use std::sync::Arc;

use visualdm_domain::DomainError;

use crate::entities::{FactionError, FactionQuestSystem, FactionService};
use crate::infrastructure::{
    clock::{SystemClock, SystemRandom},
    consequences::ConsequenceLedger,
    decay_worker::TensionDecayWorker,
    ports::{ClockPort, FactionSnapshotRepo, RandomPort, RepoError},
    settings::EngineSettings,
};
use crate::use_cases::CompetingQuestManager;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Faction(#[from] FactionError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Main application state.
///
/// Holds the faction services, the competing quest manager and the adapters
/// they were wired with.
pub struct App {
    pub entities: Entities,
    pub use_cases: UseCases,
    pub consequences: Arc<ConsequenceLedger>,
    snapshots: Arc<dyn FactionSnapshotRepo>,
    clock: Arc<dyn ClockPort>,
}

pub struct Entities {
    pub factions: Arc<FactionService>,
    pub faction_quests: Arc<FactionQuestSystem>,
}

pub struct UseCases {
    pub competing_quests: Arc<CompetingQuestManager>,
}

impl App {
    /// Create a new App backed by the system clock and randomness.
    pub fn new(
        settings: &EngineSettings,
        snapshots: Arc<dyn FactionSnapshotRepo>,
    ) -> Result<Self, AppError> {
        Self::with_ports(
            settings,
            snapshots,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
        )
    }

    pub fn with_ports(
        settings: &EngineSettings,
        snapshots: Arc<dyn FactionSnapshotRepo>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Result<Self, AppError> {
        settings.validate()?;

        let factions = Arc::new(FactionService::new());
        let faction_quests = Arc::new(FactionQuestSystem::new(
            factions.clone(),
            settings.faction_quests.clone(),
        )?);
        let consequences = Arc::new(ConsequenceLedger::new(factions.clone(), clock.clone()));
        let competing_quests = Arc::new(CompetingQuestManager::new(
            faction_quests.clone(),
            consequences.clone(),
            clock.clone(),
            random,
            settings.competing_quests.clone(),
        )?);

        Ok(Self {
            entities: Entities {
                factions,
                faction_quests,
            },
            use_cases: UseCases { competing_quests },
            consequences,
            snapshots,
            clock,
        })
    }

    /// Load the saved faction snapshot, seeding the default catalogue when
    /// nothing was saved yet. Returns the number of factions loaded.
    pub async fn restore_factions(&self) -> Result<usize, AppError> {
        let factions = &self.entities.factions;
        match self.snapshots.load().await? {
            Some(snapshot) => factions.deserialize(snapshot)?,
            None => {
                tracing::info!("No faction snapshot, seeding default catalogue");
                factions.deserialize(FactionService::with_default_catalogue().serialize())?;
            }
        }
        Ok(factions.all_factions().len())
    }

    pub async fn save_factions(&self) -> Result<(), AppError> {
        self.snapshots
            .save(&self.entities.factions.serialize())
            .await?;
        Ok(())
    }

    pub fn decay_worker(&self, settings: &EngineSettings) -> TensionDecayWorker {
        TensionDecayWorker::new(
            self.use_cases.competing_quests.clone(),
            self.clock.clone(),
            settings.decay_tick(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::ports::MockFactionSnapshotRepo;
    use chrono::Utc;
    use visualdm_domain::{FactionData, FactionProfile, FactionType};

    fn app(snapshots: MockFactionSnapshotRepo) -> App {
        App::with_ports(
            &EngineSettings::default(),
            Arc::new(snapshots),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(FixedRandom::new(0.5)),
        )
        .expect("valid settings")
    }

    #[tokio::test]
    async fn missing_snapshot_seeds_catalogue() {
        let mut snapshots = MockFactionSnapshotRepo::new();
        snapshots.expect_load().times(1).returning(|| Ok(None));

        let app = app(snapshots);
        let count = app.restore_factions().await.expect("restore");

        assert_eq!(count, FactionType::ALL.len());
    }

    #[tokio::test]
    async fn saved_snapshot_is_restored() {
        let saved: Vec<FactionData> = vec![
            FactionProfile::new(FactionType::Merchants, "Merchant Guild").to_data(),
            FactionProfile::new(FactionType::Thieves, "Shadow Hand").to_data(),
        ];
        let mut snapshots = MockFactionSnapshotRepo::new();
        snapshots
            .expect_load()
            .times(1)
            .returning(move || Ok(Some(saved.clone())));

        let app = app(snapshots);

        assert_eq!(app.restore_factions().await.expect("restore"), 2);
        assert!(!app.entities.factions.contains(FactionType::Clergy));
    }

    #[tokio::test]
    async fn save_writes_current_factions() {
        let mut snapshots = MockFactionSnapshotRepo::new();
        snapshots.expect_load().returning(|| Ok(None));
        snapshots
            .expect_save()
            .withf(|factions| factions.len() == FactionType::ALL.len())
            .times(1)
            .returning(|_| Ok(()));

        let app = app(snapshots);
        app.restore_factions().await.expect("restore");
        app.save_factions().await.expect("save");
    }

    #[test]
    fn invalid_settings_fail_fast() {
        let mut settings = EngineSettings::default();
        settings.competing_quests.max_competing_quests = 1;

        let result = App::with_ports(
            &settings,
            Arc::new(MockFactionSnapshotRepo::new()),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(FixedRandom::new(0.5)),
        );

        assert!(matches!(result, Err(AppError::Domain(_))));
    }
}
