use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

// Tunables for the free-text history parser.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Characters that separate one administered dose from the next.
    pub separators: Vec<char>,
    /// `strptime` formats tried, in order, on the trailing date token.
    pub date_formats: Vec<String>,
    /// Upper bound on the edit distance of a fuzzy alias match. The effective
    /// bound also shrinks with the length of the name.
    pub max_edit_distance: usize,
    /// Notes that mean "nothing given yet" rather than a dose to parse.
    pub empty_history_phrases: Vec<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            separators: vec![',', '\n'],
            date_formats: vec!["%Y-%m-%d".to_owned(), "%m/%d/%Y".to_owned()],
            max_edit_distance: 2,
            empty_history_phrases: [
                "no prior vaccinations",
                "no vaccinations",
                "none",
                "n/a",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub history: HistoryConfig,
    /// Doses due within this many days (after today) are shown as upcoming.
    pub upcoming_window_days: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            upcoming_window_days: 7,
        }
    }
}

impl EngineConfig {
    pub fn from_ron(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config =
            Self::from_ron(&text).with_context(|| format!("parsing config {}", path.display()))?;
        debug!("engine config from {}: {config:?}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_fall_back_to_defaults() -> Result<()> {
        let config = EngineConfig::from_ron("(upcoming_window_days: 14)")?;
        assert_eq!(config.upcoming_window_days, 14);
        assert_eq!(config.history, HistoryConfig::default());

        let config = EngineConfig::from_ron("(history: (separators: [';']))")?;
        assert_eq!(config.history.separators, vec![';']);
        assert_eq!(config.history.max_edit_distance, 2);
        assert_eq!(config.upcoming_window_days, 7);
        Ok(())
    }

    #[test]
    fn test_load_reports_path() {
        let err = EngineConfig::load(Path::new("/nonexistent/engine.ron")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/engine.ron"));
    }
}
