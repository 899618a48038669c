use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use crate::error::ConfigError;

/// Default cap on the number of clauses the SAT backend may generate.
pub const DEFAULT_MAX_CLAUSES: usize = 20_000_000;

/// How slots with equal candidate counts are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Longer slots first, then the seeded slot order.
    #[default]
    LongestFirst,
    /// Seeded slot order only.
    SeedOnly,
}

/// Whether the same word may fill two slots of one grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordReuse {
    #[default]
    Forbidden,
    Allowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Heuristics {
    pub tie_break: TieBreak,
    pub word_reuse: WordReuse,
}

impl Heuristics {
    pub fn allows_duplicates(&self) -> bool {
        self.word_reuse == WordReuse::Allowed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Registered backend name. `None` picks the default backend.
    pub backend: Option<String>,
    pub max_steps: Option<u64>,
    #[serde(
        rename = "timeout_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    pub timeout: Option<Duration>,
    pub seed: Option<u64>,
    /// Stream partial assignments while solving.
    pub progress: bool,
    /// Prefer a backend that can prove infeasibility.
    pub exhaustive: bool,
    /// Backend to run once, with a fresh budget, if the first one times out.
    pub fallback: Option<String>,
    pub heuristics: Heuristics,
    pub max_clauses: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            backend: None,
            max_steps: None,
            timeout: None,
            seed: None,
            progress: false,
            exhaustive: false,
            fallback: None,
            heuristics: Heuristics::default(),
            max_clauses: DEFAULT_MAX_CLAUSES,
        }
    }
}

impl SolverConfig {
    pub fn with_backend(mut self, name: &str) -> SolverConfig {
        self.backend = Some(name.to_owned());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> SolverConfig {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> SolverConfig {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> SolverConfig {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> SolverConfig {
        self.progress = progress;
        self
    }

    pub fn with_word_reuse(mut self, word_reuse: WordReuse) -> SolverConfig {
        self.heuristics.word_reuse = word_reuse;
        self
    }

    pub fn with_fallback(mut self, name: &str) -> SolverConfig {
        self.fallback = Some(name.to_owned());
        self
    }

    /// The configured seed, or the fixed default `0`.
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == Some(0) {
            return Err(ConfigError::ZeroBudget("step"));
        }
        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroBudget("time"));
        }
        if self.max_clauses == 0 {
            return Err(ConfigError::ZeroBudget("clause"));
        }
        Ok(())
    }
}

fn serialize_millis<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
        None => serializer.serialize_none(),
    }
}

fn deserialize_millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
    let millis: Option<u64> = Option::deserialize(deserializer)?;
    Ok(millis.map(Duration::from_millis))
}
