use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::SolverConfig,
    error::ConfigError,
    fill::{backtrack::BacktrackFiller, native::NativeFiller, sat::SatFiller, Capabilities, Filler},
};

/// What `list_backends` reports for one backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendDescription {
    pub name: String,
    pub description: String,
    pub capabilities: Capabilities,
}

/// Named backends, in registration order. The first one is the default.
#[derive(Default)]
pub struct Registry {
    fillers: Vec<Arc<dyn Filler>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// `backtrack` (the default), `sat` and the embedded `native` module.
    pub fn with_defaults() -> Registry {
        let mut registry = Registry::new();
        for filler in [
            Arc::new(BacktrackFiller::new()) as Arc<dyn Filler>,
            Arc::new(SatFiller::new()),
            Arc::new(NativeFiller::embedded()),
        ] {
            // names are distinct
            let _ = registry.register(filler);
        }
        registry
    }

    pub fn register(&mut self, filler: Arc<dyn Filler>) -> Result<(), ConfigError> {
        if self.get(filler.name()).is_some() {
            return Err(ConfigError::DuplicateBackend(filler.name().to_owned()));
        }
        self.fillers.push(filler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Filler>> {
        self.fillers
            .iter()
            .find(|filler| filler.name() == name)
            .cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.fillers.iter().map(|filler| filler.name()).collect()
    }

    pub fn descriptions(&self) -> Vec<BackendDescription> {
        self.fillers
            .iter()
            .map(|filler| BackendDescription {
                name: filler.name().to_owned(),
                description: filler.description().to_owned(),
                capabilities: filler.capabilities(),
            })
            .collect()
    }

    /// The backend a config asks for: the named one, else the first exhaustive one when a proof
    /// is wanted, else the default.
    pub fn select(&self, config: &SolverConfig) -> Result<Arc<dyn Filler>, ConfigError> {
        if let Some(name) = &config.backend {
            return self
                .get(name)
                .ok_or_else(|| ConfigError::UnknownBackend(name.clone()));
        }
        if config.exhaustive {
            return self
                .fillers
                .iter()
                .find(|filler| filler.capabilities().exhaustive)
                .cloned()
                .ok_or(ConfigError::NoExhaustiveBackend);
        }
        self.fillers.first().cloned().ok_or(ConfigError::NoBackend)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Registry;
    use crate::{
        config::SolverConfig,
        error::ConfigError,
        fill::{backtrack::BacktrackFiller, sat::SatFiller, Filler},
    };

    #[test]
    fn defaults() {
        let registry = Registry::with_defaults();
        assert_eq!(vec!["backtrack", "sat", "native"], registry.names());

        let descriptions = registry.descriptions();
        assert_eq!(3, descriptions.len());
        assert!(descriptions[1].capabilities.exhaustive);
        assert!(descriptions[0].capabilities.progress);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = Registry::with_defaults();
        assert_eq!(
            Err(ConfigError::DuplicateBackend(String::from("sat"))),
            registry.register(Arc::new(SatFiller::new()))
        );
    }

    #[test]
    fn select_works() {
        let registry = Registry::with_defaults();

        let filler = registry.select(&SolverConfig::default()).unwrap();
        assert_eq!("backtrack", filler.name());

        let filler = registry
            .select(&SolverConfig::default().with_backend("native"))
            .unwrap();
        assert_eq!("native", filler.name());

        let mut config = SolverConfig::default();
        config.exhaustive = true;
        assert_eq!("sat", registry.select(&config).unwrap().name());

        assert_eq!(
            Some(ConfigError::UnknownBackend(String::from("dlx"))),
            registry
                .select(&SolverConfig::default().with_backend("dlx"))
                .err()
        );

        let mut registry = Registry::new();
        assert_eq!(
            Some(ConfigError::NoBackend),
            registry.select(&SolverConfig::default()).err()
        );
        registry.register(Arc::new(BacktrackFiller::new())).unwrap();
        assert_eq!(
            Some(ConfigError::NoExhaustiveBackend),
            registry.select(&config).err()
        );
    }
}
