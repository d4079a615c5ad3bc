//! Engine settings loader.
//!
//! Reads an optional `visualdm.toml` and overlays `VISUALDM__*` environment
//! variables, e.g. `VISUALDM__COMPETING_QUESTS__QUEST_LOCKOUT_THRESHOLD=95`.
//! Nested keys are separated by a double underscore.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use visualdm_domain::{CompetingQuestConfig, DomainError, FactionQuestConfig};

pub const DEFAULT_SETTINGS_FILE: &str = "visualdm.toml";
pub const ENV_PREFIX: &str = "VISUALDM";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error(transparent)]
    Invalid(#[from] DomainError),
}

/// Everything the engine binary needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub faction_quests: FactionQuestConfig,
    pub competing_quests: CompetingQuestConfig,
    /// Where the faction snapshot is loaded from and saved to
    pub snapshot_path: PathBuf,
    /// Seconds between decay worker ticks
    pub decay_tick_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            faction_quests: FactionQuestConfig::default(),
            competing_quests: CompetingQuestConfig::default(),
            snapshot_path: PathBuf::from("data/factions.json"),
            decay_tick_secs: 60,
        }
    }
}

impl EngineSettings {
    /// Load from `visualdm.toml` in the working directory plus the environment.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(Path::new(DEFAULT_SETTINGS_FILE))
    }

    /// Load from `path` (optional) plus the environment.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let settings: Self = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;

        tracing::debug!(path = %path.display(), "Engine settings loaded");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.faction_quests.validate()?;
        self.competing_quests.validate()?;
        if self.decay_tick_secs == 0 {
            return Err(DomainError::invalid_configuration(
                "decay tick interval must be positive",
            ));
        }
        Ok(())
    }

    pub fn decay_tick(&self) -> Duration {
        Duration::from_secs(self.decay_tick_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings =
            EngineSettings::load_from(&dir.path().join("absent.toml")).expect("load");
        assert_eq!(settings.competing_quests, CompetingQuestConfig::default());
        assert_eq!(settings.decay_tick(), Duration::from_secs(60));
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(
            file,
            "decay_tick_secs = 5\n\n[competing_quests]\nquest_lockout_threshold = 95.0\nmax_competing_quests = 3"
        )
        .expect("write");

        let settings = EngineSettings::load_from(file.path()).expect("load");

        assert_eq!(settings.decay_tick_secs, 5);
        assert_eq!(settings.competing_quests.quest_lockout_threshold, 95.0);
        assert_eq!(settings.competing_quests.max_competing_quests, 3);
        assert_eq!(settings.competing_quests.high_tension_threshold, 75.0);
    }

    #[test]
    fn contradictory_thresholds_are_rejected() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("tempfile");
        writeln!(file, "[competing_quests]\nquest_lockout_threshold = 50.0").expect("write");

        let err = EngineSettings::load_from(file.path()).expect_err("invalid");

        assert!(matches!(
            err,
            SettingsError::Invalid(DomainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_tick_is_invalid() {
        let settings = EngineSettings {
            decay_tick_secs: 0,
            ..EngineSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
