//! Checker settings, loadable from TOML.
//!
//! ```toml
//! direction = "backward"
//! bound = 40
//! timeout_ms = 5000
//!
//! [solver]
//! max_decisions = 200000
//! ```
use std::{path::Path, time::Duration};

use hysolver::finite::FiniteSolverConfig;
use serde::{Deserialize, Serialize};

use crate::{
    algorithm::imc::Direction,
    error::{AnalysisError, AnalysisResult},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImcConfig {
    pub direction: Direction,
    /// Deepest unrolling explored, unbounded when absent.
    pub bound: Option<usize>,
    pub cumulative_bad_states: bool,
    pub timeout_ms: Option<u64>,
    pub solver: FiniteSolverConfig,
}

impl Default for ImcConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            bound: None,
            cumulative_bad_states: true,
            timeout_ms: None,
            solver: FiniteSolverConfig::default(),
        }
    }
}

impl ImcConfig {
    pub fn from_toml_str(s: &str) -> AnalysisResult<Self> {
        Self::parse(s, "<string>")
    }

    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let toml_str = std::fs::read_to_string(path)?;
        Self::parse(&toml_str, &path.display().to_string())
    }

    fn parse(s: &str, file: &str) -> AnalysisResult<Self> {
        let config: Self = toml::from_str(s).map_err(|source| AnalysisError::ConfigParse {
            source,
            file: file.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.bound == Some(0) {
            return Err(AnalysisError::ZeroBound);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn to_toml_string(&self) -> AnalysisResult<String> {
        Ok(toml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config =
            ImcConfig::from_toml_str("direction = \"backward\"\n[solver]\nmax_cubes = 12\n")
                .unwrap();
        assert_eq!(config.direction, Direction::Backward);
        assert_eq!(config.bound, None);
        assert!(config.cumulative_bad_states);
        assert_eq!(config.solver.max_cubes, 12);
        assert_eq!(config.solver.max_decisions, FiniteSolverConfig::default().max_decisions);
        assert_eq!(ImcConfig::from_toml_str("").unwrap(), ImcConfig::default());
    }

    #[test]
    fn invalid_settings_are_reported() {
        let err = ImcConfig::from_toml_str("direction = \"sideways\"").unwrap_err();
        assert!(err.is_config_parse());
        assert!(err.to_string().contains("<string>"));

        assert!(ImcConfig::from_toml_str("bound = 0").unwrap_err().is_zero_bound());
    }

    #[test]
    fn survives_a_round_trip_through_a_file() {
        let config = ImcConfig {
            bound: Some(12),
            timeout_ms: Some(250),
            ..ImcConfig::default()
        };
        let path = std::env::temp_dir().join(format!("imc-config-{}.toml", std::process::id()));
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("bound = 12"), "{text}");
        assert!(text.contains("[solver]"), "{text}");
        std::fs::write(&path, text).unwrap();
        let loaded = ImcConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.timeout(), Some(Duration::from_millis(250)));

        let missing = ImcConfig::from_file(Path::new("/nonexistent/imc.toml")).unwrap_err();
        assert!(missing.is_io());
    }
}
