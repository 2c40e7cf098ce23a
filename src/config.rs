//! Match configuration.
//!
//! `GameOptions` carries the debugging and rollback knobs the turn engine reads
//! while playing; `MatchConfig` describes a whole match and can be loaded from
//! JSON when the `serialization` feature is enabled.

use std::path::PathBuf;

#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

use crate::game_state::StepKind;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Options consulted by the turn engine during play.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct GameOptions {
    /// With `stop_at_step`, pause after that step on this turn and every later one.
    pub stop_on_turn: Option<u32>,
    pub stop_at_step: Option<StepKind>,
    pub rollback_allowed: bool,
    /// How many turn-start checkpoints are kept for rollback.
    pub max_checkpoints: usize,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            stop_on_turn: None,
            stop_at_step: None,
            rollback_allowed: true,
            max_checkpoints: 8,
        }
    }
}

impl GameOptions {
    pub fn stop_at(turn: u32, step: StepKind) -> Self {
        Self {
            stop_on_turn: Some(turn),
            stop_at_step: Some(step),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialization", serde(default))]
pub struct MatchConfig {
    /// Player names in turn order.
    pub players: Vec<String>,
    pub options: GameOptions,
    /// Upper bound on turns played by `GameLoop::run`.
    pub max_turns: u32,
    pub seed: u64,
    pub library_size: u32,
    pub max_hand_size: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            players: vec!["Alice".to_string(), "Bob".to_string()],
            options: GameOptions::default(),
            max_turns: 20,
            seed: 0,
            library_size: 40,
            max_hand_size: 7,
        }
    }
}

impl MatchConfig {
    pub fn with_players(players: &[&str]) -> Self {
        Self {
            players: players.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players.len() < 2 {
            return Err(ConfigError::Invalid(format!(
                "a match needs at least two players, got {}",
                self.players.len()
            )));
        }
        if self.players.len() > usize::from(u8::MAX) {
            return Err(ConfigError::Invalid(format!(
                "too many players: {}",
                self.players.len()
            )));
        }
        if self.options.max_checkpoints == 0 {
            return Err(ConfigError::Invalid(
                "max_checkpoints must be at least 1".to_string(),
            ));
        }
        if self.options.stop_on_turn.is_some() != self.options.stop_at_step.is_some() {
            return Err(ConfigError::Invalid(
                "stop_on_turn and stop_at_step must be set together".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(feature = "serialization")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|err| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serialization")]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let json = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|err| ConfigError::Parse {
            path: path.clone(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
