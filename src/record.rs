use crate::{error::StoreError, history::ParsedHistory};
use itertools::Itertools;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashSet};

/// How sure we are that a dose record names the right series.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// The text matched a catalog alias exactly.
    Exact,
    /// The text matched a single alias within the fuzzy-match bound.
    Inferred,
    /// Entered without a matched alias, e.g. imported as-is by the profile store.
    #[default]
    Unparsed,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct AdministeredDose {
    /// Unique within one child record.
    pub id: u32,
    pub series_id: String,
    #[serde(default)]
    pub dose_index: Option<u8>,
    pub date: Date,
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub confidence: Confidence,
    /// The record this one corrects. The corrected record stays for audit.
    #[serde(default)]
    pub supersedes: Option<u32>,
}

impl Ord for AdministeredDose {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for AdministeredDose {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Snapshot of one child as kept by the profile store. The scheduling engine
/// only ever reads it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChildRecord {
    id: String,
    name: String,
    date_of_birth: Option<Date>,
    vaccination_history: String,
    administered_doses: Vec<AdministeredDose>,
}

impl ChildRecord {
    pub fn new(name: &str, date_of_birth: Date) -> Self {
        Self {
            name: name.to_owned(),
            date_of_birth: Some(date_of_birth),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_mut(&mut self) -> &mut String {
        &mut self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date_of_birth(&self) -> Option<Date> {
        self.date_of_birth
    }

    pub fn date_of_birth_mut(&mut self) -> &mut Option<Date> {
        &mut self.date_of_birth
    }

    pub fn vaccination_history(&self) -> &str {
        &self.vaccination_history
    }

    /// Every record ever appended, including corrected ones.
    pub fn administered_doses(&self) -> &[AdministeredDose] {
        &self.administered_doses
    }

    /// Records that have not been corrected by a later record.
    pub fn effective_doses(&self) -> impl Iterator<Item = &AdministeredDose> {
        let superseded: HashSet<u32> = self
            .administered_doses
            .iter()
            .filter_map(|dose| dose.supersedes)
            .collect();
        self.administered_doses
            .iter()
            .filter(move |dose| !superseded.contains(&dose.id))
    }

    /// Effective doses of one series, oldest first.
    pub fn doses_for(&self, series_id: &str) -> Vec<&AdministeredDose> {
        self.effective_doses()
            .filter(|dose| dose.series_id == series_id)
            .sorted()
            .collect()
    }

    fn next_dose_id(&self) -> u32 {
        self.administered_doses
            .iter()
            .map(|dose| dose.id + 1)
            .max()
            .unwrap_or(0)
    }

    /// Append a dose record; returns its id.
    pub fn record_dose(
        &mut self,
        series_id: &str,
        date: Date,
        source_text: &str,
        confidence: Confidence,
    ) -> u32 {
        let id = self.next_dose_id();
        self.administered_doses.push(AdministeredDose {
            id,
            series_id: series_id.to_owned(),
            dose_index: None,
            date,
            source_text: source_text.to_owned(),
            confidence,
            supersedes: None,
        });
        self.resolve_dose_indices();
        id
    }

    /// Append a record that replaces `dose_id`; returns the new record's id.
    pub fn correct_dose(
        &mut self,
        dose_id: u32,
        series_id: &str,
        date: Date,
        source_text: &str,
    ) -> Result<u32, StoreError> {
        if !self.administered_doses.iter().any(|dose| dose.id == dose_id) {
            return Err(StoreError::UnknownDose {
                child: self.id.clone(),
                dose: dose_id,
            });
        }
        if self
            .administered_doses
            .iter()
            .any(|dose| dose.supersedes == Some(dose_id))
        {
            return Err(StoreError::AlreadySuperseded {
                child: self.id.clone(),
                dose: dose_id,
            });
        }
        let id = self.record_dose(series_id, date, source_text, Confidence::Exact);
        if let Some(dose) = self.administered_doses.last_mut() {
            dose.supersedes = Some(dose_id);
        }
        self.resolve_dose_indices();
        Ok(id)
    }

    /// Keep the caregiver's free text and append every dose parsed from it.
    /// Unparsed fragments are the caller's to surface.
    pub fn import_history(&mut self, text: &str, parsed: &ParsedHistory) -> Vec<u32> {
        if !self.vaccination_history.is_empty() {
            self.vaccination_history.push('\n');
        }
        self.vaccination_history.push_str(text);
        let ids = parsed
            .administered
            .iter()
            .map(|dose| {
                let id = self.next_dose_id();
                self.administered_doses.push(AdministeredDose {
                    id,
                    supersedes: None,
                    ..dose.clone()
                });
                id
            })
            .collect();
        self.resolve_dose_indices();
        ids
    }

    // Number every effective dose by its place in its series, oldest first.
    // Superseded records keep the index they had.
    fn resolve_dose_indices(&mut self) {
        let by_series = self
            .effective_doses()
            .map(|dose| (dose.series_id.clone(), (dose.date, dose.id)))
            .into_group_map();
        for (_, mut slots) in by_series {
            slots.sort();
            for (k, (_, id)) in slots.into_iter().enumerate() {
                if let Some(dose) = self.administered_doses.iter_mut().find(|dose| dose.id == id) {
                    dose.dose_index = u8::try_from(k + 1).ok();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use jiff::civil::date;

    #[test]
    fn test_record_dose_assigns_increasing_ids() {
        let mut child = ChildRecord::new("Ada", date(2023, 1, 1));
        let a = child.record_dose("HepB", date(2023, 1, 2), "HepB 2023-01-02", Confidence::Exact);
        let b = child.record_dose("HepB", date(2023, 2, 2), "", Confidence::Unparsed);
        assert_eq!((a, b), (0, 1));
        assert_eq!(child.administered_doses().len(), 2);
    }

    #[test]
    fn test_correction_supersedes_without_overwriting() -> Result<()> {
        let mut child = ChildRecord::new("Ada", date(2023, 1, 1));
        let wrong = child.record_dose("HepB", date(2023, 12, 2), "typo", Confidence::Exact);
        let fixed = child.correct_dose(wrong, "HepB", date(2023, 1, 2), "fixed date")?;

        assert_eq!(child.administered_doses().len(), 2);
        let effective = child.effective_doses().collect_vec();
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].id, fixed);
        assert_eq!(effective[0].supersedes, Some(wrong));
        assert_eq!(child.administered_doses()[0].date, date(2023, 12, 2));

        assert!(matches!(
            child.correct_dose(wrong, "HepB", date(2023, 1, 3), ""),
            Err(StoreError::AlreadySuperseded { dose, .. }) if dose == wrong
        ));
        assert!(matches!(
            child.correct_dose(42, "HepB", date(2023, 1, 3), ""),
            Err(StoreError::UnknownDose { dose: 42, .. })
        ));
        Ok(())
    }

    #[test]
    fn test_repeated_imports_number_doses_across_the_record() -> Result<()> {
        let catalog = crate::catalog::VaccineCatalog::new(
            "c",
            vec![crate::catalog::VaccineSeries::new("HepB", "Hepatitis B", [], 3)],
        )?;
        let parser = crate::history::HistoryParser::default();
        let mut child = ChildRecord::new("Ada", date(2023, 1, 1));
        for text in ["HepB - 2023-02-15", "HepB - 2023-01-02"] {
            let parsed = parser.parse(text, &catalog);
            child.import_history(text, &parsed);
        }
        let stored = child
            .administered_doses()
            .iter()
            .map(|d| (d.id, d.date, d.dose_index))
            .collect_vec();
        assert_eq!(
            stored,
            vec![(0, date(2023, 2, 15), Some(2)), (1, date(2023, 1, 2), Some(1))]
        );
        assert_eq!(child.vaccination_history(), "HepB - 2023-02-15\nHepB - 2023-01-02");

        let fixed = child.correct_dose(1, "HepB", date(2023, 3, 1), "fixed date")?;
        let effective = child.effective_doses().map(|d| (d.id, d.dose_index)).collect_vec();
        assert_eq!(effective, vec![(0, Some(1)), (fixed, Some(2))]);
        Ok(())
    }

    #[test]
    fn test_doses_for_sorts_by_date() {
        let mut child = ChildRecord::new("Ada", date(2023, 1, 1));
        child.record_dose("HepB", date(2023, 3, 1), "", Confidence::Exact);
        child.record_dose("RV", date(2023, 2, 1), "", Confidence::Exact);
        child.record_dose("HepB", date(2023, 1, 2), "", Confidence::Exact);
        let dates = child.doses_for("HepB").iter().map(|d| d.date).collect_vec();
        assert_eq!(dates, vec![date(2023, 1, 2), date(2023, 3, 1)]);
    }
}
