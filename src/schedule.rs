use crate::{
    catalog::{VaccineCatalog, VaccineSeries},
    catch_up,
    error::{EngineError, ScheduleWarning},
    record::{AdministeredDose, ChildRecord},
    rules::DoseRuleTable,
    status::{classify_within, DoseStatus, UPCOMING_WINDOW_DAYS},
};
use jiff::civil::Date;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::BTreeSet, fmt};

/// The next dose a child needs in one series. Recomputed on every call.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ScheduleEntry {
    pub series_id: String,
    pub dose_index: u8,
    pub due_date: Date,
    pub is_catch_up: bool,
    pub rationale: String,
    pub status: DoseStatus,
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Dose#{} {} [{}]",
            self.series_id, self.dose_index, self.due_date, self.status
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Schedule {
    pub entries: Vec<ScheduleEntry>,
    pub warnings: Vec<ScheduleWarning>,
    pub catalog_version: String,
    pub rules_version: String,
}

impl Schedule {
    pub fn entry(&self, series_id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|entry| entry.series_id == series_id)
    }
}

pub struct ScheduleGenerator<'a> {
    catalog: &'a VaccineCatalog,
    rules: &'a DoseRuleTable,
    upcoming_window_days: i32,
}

impl<'a> ScheduleGenerator<'a> {
    pub fn new(catalog: &'a VaccineCatalog, rules: &'a DoseRuleTable) -> Self {
        Self {
            catalog,
            rules,
            upcoming_window_days: UPCOMING_WINDOW_DAYS,
        }
    }

    pub fn with_upcoming_window(mut self, days: i32) -> Self {
        self.upcoming_window_days = days;
        self
    }

    // Compute the next required dose of every catalog series for `child` as of `today`.
    //
    // Note: `today` only labels entries (catch-up, status); it never moves a due date.
    pub fn generate(&self, child: &ChildRecord, today: Date) -> Result<Schedule, EngineError> {
        let date_of_birth = child.date_of_birth().ok_or_else(|| {
            EngineError::InvalidDateOfBirth("no date of birth recorded".to_owned())
        })?;
        if date_of_birth > today {
            return Err(EngineError::InvalidDateOfBirth(format!(
                "{date_of_birth} is after {today}"
            )));
        }

        let mut entries = Vec::new();
        let mut warnings = Vec::new();
        for series in self.catalog.iter() {
            let doses = child.doses_for(series.id());
            warnings.extend(
                doses
                    .iter()
                    .filter(|dose| dose.date < date_of_birth)
                    .map(|dose| ScheduleWarning::DoseBeforeBirth {
                        series: series.id().to_owned(),
                        date: dose.date,
                    }),
            );
            match self.next_dose(series, &doses, date_of_birth, today) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => debug!("{}: series complete", series.id()),
                Err(warning) => warnings.push(warning),
            }
        }
        warnings.extend(
            child
                .effective_doses()
                .map(|dose| dose.series_id.as_str())
                .filter(|id| self.catalog.series(id).is_none())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(|id| ScheduleWarning::UnknownSeries {
                    series: id.to_owned(),
                }),
        );
        for warning in &warnings {
            warn!("{}: {warning}", child.id());
        }

        entries.sort_by(|a, b| self.entry_order(a, b));
        Ok(Schedule {
            entries,
            warnings,
            catalog_version: self.catalog.version().to_owned(),
            rules_version: self.rules.version().to_owned(),
        })
    }

    fn next_dose(
        &self,
        series: &VaccineSeries,
        doses: &[&AdministeredDose],
        date_of_birth: Date,
        today: Date,
    ) -> Result<Option<ScheduleEntry>, ScheduleWarning> {
        let administered = doses.len();
        let Ok(dose_index) = u8::try_from(administered + 1) else {
            return Ok(None);
        };
        let Some(spec) = self.rules.dose(series.id(), dose_index) else {
            let later_dose_ruled = self
                .rules
                .rules_for(series.id())
                .iter()
                .any(|spec| spec.dose_index > dose_index);
            if administered >= series.dose_count() as usize && !later_dose_ruled {
                return Ok(None);
            }
            return Err(ScheduleWarning::MissingRuleTableEntry {
                series: series.id().to_owned(),
                dose: dose_index,
            });
        };

        let previous = doses.last().map(|dose| dose.date);
        let timing = catch_up::resolve(spec, date_of_birth, previous, today).map_err(|err| {
            debug!("{}: date arithmetic failed: {err}", series.id());
            ScheduleWarning::DateOutOfRange {
                series: series.id().to_owned(),
                dose: dose_index,
            }
        })?;
        let mut rationale = timing.to_string();
        if dose_index > series.dose_count() {
            rationale.push_str(&format!(
                " Booster after the {}-dose primary series.",
                series.dose_count()
            ));
        } else if !timing.is_catch_up {
            let (low, high) = spec.recommended_age_days;
            rationale.push_str(&format!(" Recommended at {low}-{high}d of age."));
        }
        debug!("{}: dose {dose_index} due {} ({rationale})", series.id(), timing.due_date);

        Ok(Some(ScheduleEntry {
            series_id: series.id().to_owned(),
            dose_index,
            due_date: timing.due_date,
            is_catch_up: timing.is_catch_up,
            rationale,
            status: classify_within(timing.due_date, today, self.upcoming_window_days),
        }))
    }

    fn entry_order(&self, a: &ScheduleEntry, b: &ScheduleEntry) -> Ordering {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| self.catalog.position(&a.series_id).cmp(&self.catalog.position(&b.series_id)))
    }
}
