//! Display/wire format of a generated schedule.

use crate::{
    catalog::VaccineCatalog,
    narrative::NarrativeTextProvider,
    schedule::{Schedule, ScheduleEntry},
    status::DoseStatus,
};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedScheduleEntry {
    pub vaccine: String,
    pub dose_number: u8,
    pub due_date: Date,
    pub is_catch_up: bool,
    pub notes: String,
    pub status: DoseStatus,
}

impl SerializedScheduleEntry {
    /// `notes` is the engine rationale, or the provider's prose when one is given.
    pub fn new(
        entry: &ScheduleEntry,
        catalog: &VaccineCatalog,
        narrative: Option<&dyn NarrativeTextProvider>,
    ) -> Self {
        let series = catalog.series(&entry.series_id);
        let notes = match (series, narrative) {
            (Some(series), Some(provider)) => provider.narrate(entry, series),
            _ => entry.rationale.clone(),
        };
        Self {
            vaccine: series
                .map(|s| s.display_name().to_owned())
                .unwrap_or_else(|| entry.series_id.clone()),
            dose_number: entry.dose_index,
            due_date: entry.due_date,
            is_catch_up: entry.is_catch_up,
            notes,
            status: entry.status,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSchedule {
    pub entries: Vec<SerializedScheduleEntry>,
    pub warnings: Vec<String>,
    pub catalog_version: String,
    pub rules_version: String,
}

impl SerializedSchedule {
    pub fn new(
        schedule: &Schedule,
        catalog: &VaccineCatalog,
        narrative: Option<&dyn NarrativeTextProvider>,
    ) -> Self {
        Self {
            entries: schedule
                .entries
                .iter()
                .map(|entry| SerializedScheduleEntry::new(entry, catalog, narrative))
                .collect(),
            warnings: schedule.warnings.iter().map(ToString::to_string).collect(),
            catalog_version: schedule.catalog_version.clone(),
            rules_version: schedule.rules_version.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
