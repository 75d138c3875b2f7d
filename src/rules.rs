use crate::error::GuidelineError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Timing constraints for one dose of one series. All figures are days.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct DoseSpec {
    pub series_id: String,
    pub dose_index: u8,
    pub min_age_days: i32,
    /// Absent for dose 1 only.
    #[serde(default)]
    pub min_interval_days: Option<i32>,
    /// Replaces `min_interval_days` when the dose is given on a catch-up basis.
    #[serde(default)]
    pub catch_up_min_interval_days: Option<i32>,
    pub recommended_age_days: (i32, i32),
    #[serde(default)]
    pub is_final_dose_of_series: bool,
}

impl DoseSpec {
    pub fn first(series_id: &str, min_age_days: i32, recommended_age_days: (i32, i32)) -> Self {
        Self {
            series_id: series_id.to_owned(),
            dose_index: 1,
            min_age_days,
            min_interval_days: None,
            catch_up_min_interval_days: None,
            recommended_age_days,
            is_final_dose_of_series: false,
        }
    }

    pub fn next(
        &self,
        min_age_days: i32,
        min_interval_days: i32,
        recommended_age_days: (i32, i32),
    ) -> Self {
        Self {
            series_id: self.series_id.clone(),
            dose_index: self.dose_index + 1,
            min_age_days,
            min_interval_days: Some(min_interval_days),
            catch_up_min_interval_days: None,
            recommended_age_days,
            is_final_dose_of_series: false,
        }
    }

    pub fn with_catch_up_interval(mut self, days: i32) -> Self {
        self.catch_up_min_interval_days = Some(days);
        self
    }

    pub fn final_dose(mut self) -> Self {
        self.is_final_dose_of_series = true;
        self
    }

    fn check(&self) -> Result<(), GuidelineError> {
        let series = || self.series_id.clone();
        let negative = self.min_age_days < 0
            || self.min_interval_days.is_some_and(|d| d < 0)
            || self.catch_up_min_interval_days.is_some_and(|d| d < 0);
        if negative {
            return Err(GuidelineError::NegativeDays {
                series: series(),
                dose: self.dose_index,
            });
        }
        match (self.dose_index, self.min_interval_days) {
            (1, Some(_)) => return Err(GuidelineError::UnexpectedInterval { series: series() }),
            (dose, None) if dose > 1 => {
                return Err(GuidelineError::MissingInterval {
                    series: series(),
                    dose,
                })
            }
            _ => {}
        }
        if self.recommended_age_days.0 > self.recommended_age_days.1 {
            return Err(GuidelineError::InvertedWindow {
                series: series(),
                dose: self.dose_index,
            });
        }
        Ok(())
    }
}

impl fmt::Display for DoseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}: age>={}d", self.series_id, self.dose_index, self.min_age_days)?;
        if let Some(interval) = self.min_interval_days {
            write!(f, ", +{interval}d")?;
        }
        if let Some(interval) = self.catch_up_min_interval_days {
            write!(f, " (catch-up +{interval}d)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct RuleTableData {
    version: String,
    doses: Vec<DoseSpec>,
}

/// Versioned per-series dose timing table. Doses past a series' dose count are
/// boosters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "RuleTableData", into = "RuleTableData")]
pub struct DoseRuleTable {
    version: String,
    rules: BTreeMap<String, Vec<DoseSpec>>,
}

impl DoseRuleTable {
    pub fn new(version: &str, doses: Vec<DoseSpec>) -> Result<Self, GuidelineError> {
        let mut rules: BTreeMap<String, Vec<DoseSpec>> = BTreeMap::new();
        for spec in doses {
            spec.check()?;
            let series = rules.entry(spec.series_id.clone()).or_default();
            if let Some(previous) = series.last() {
                if spec.dose_index <= previous.dose_index {
                    return Err(GuidelineError::NonIncreasingDoseIndex {
                        series: spec.series_id.clone(),
                        previous: previous.dose_index,
                        found: spec.dose_index,
                    });
                }
            }
            series.push(spec);
        }
        Ok(Self {
            version: version.to_owned(),
            rules,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Ordered specs for a series; empty when the table does not know it.
    pub fn rules_for(&self, series_id: &str) -> &[DoseSpec] {
        self.rules.get(series_id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn dose(&self, series_id: &str, dose_index: u8) -> Option<&DoseSpec> {
        self.rules_for(series_id)
            .iter()
            .find(|spec| spec.dose_index == dose_index)
    }

    pub fn series_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

impl TryFrom<RuleTableData> for DoseRuleTable {
    type Error = GuidelineError;

    fn try_from(data: RuleTableData) -> Result<Self, Self::Error> {
        Self::new(&data.version, data.doses)
    }
}

impl From<DoseRuleTable> for RuleTableData {
    fn from(table: DoseRuleTable) -> Self {
        Self {
            version: table.version,
            doses: table.rules.into_values().flatten().collect_vec(),
        }
    }
}
