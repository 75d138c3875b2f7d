//! Free-text vaccination history → administered dose records.
//!
//! A history such as `"HepB - 2023-01-15, RV - 2023-03-20"` is split into
//! fragments; each fragment must end in a date and start with something the
//! catalog recognises. Anything else is handed back verbatim so the caregiver
//! can fix it.

use crate::{
    catalog::{normalize_name, VaccineCatalog, VaccineSeries},
    config::HistoryConfig,
    error::HistoryIssue,
    record::{AdministeredDose, Confidence},
};
use itertools::Itertools;
use jiff::civil::Date;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ParsedHistory {
    /// Recognised doses in fragment order, with dose indices assigned per series.
    pub administered: Vec<AdministeredDose>,
    /// Rejected fragments, verbatim.
    pub unparsed: Vec<String>,
    /// One entry per rejected fragment explaining why.
    pub issues: Vec<HistoryIssue>,
}

struct Match<'c> {
    series: &'c VaccineSeries,
    date: Date,
    confidence: Confidence,
}

#[derive(Clone, Debug, Default)]
pub struct HistoryParser {
    config: HistoryConfig,
}

impl HistoryParser {
    pub fn new(config: HistoryConfig) -> Self {
        Self { config }
    }

    pub fn parse(&self, text: &str, catalog: &VaccineCatalog) -> ParsedHistory {
        let mut parsed = ParsedHistory::default();
        for fragment in text.split(self.config.separators.as_slice()) {
            let trimmed = fragment.trim();
            if trimmed.is_empty() || self.is_empty_history_note(trimmed) {
                continue;
            }
            match self.parse_fragment(trimmed, catalog) {
                Ok(found) => {
                    debug!(
                        "history: \"{trimmed}\" -> {} on {} ({:?})",
                        found.series.id(),
                        found.date,
                        found.confidence
                    );
                    parsed.administered.push(AdministeredDose {
                        id: parsed.administered.len() as u32,
                        series_id: found.series.id().to_owned(),
                        dose_index: None,
                        date: found.date,
                        source_text: trimmed.to_owned(),
                        confidence: found.confidence,
                        supersedes: None,
                    });
                }
                Err(issue) => {
                    warn!("history: {issue}");
                    parsed.unparsed.push(trimmed.to_owned());
                    parsed.issues.push(issue);
                }
            }
        }
        assign_dose_indices(&mut parsed.administered);
        parsed
    }

    fn is_empty_history_note(&self, fragment: &str) -> bool {
        let note = normalize_name(fragment.trim_end_matches('.'));
        self.config
            .empty_history_phrases
            .iter()
            .any(|phrase| normalize_name(phrase) == note)
    }

    fn parse_fragment<'c>(
        &self,
        fragment: &str,
        catalog: &'c VaccineCatalog,
    ) -> Result<Match<'c>, HistoryIssue> {
        let (name, date) = self.split_trailing_date(fragment).ok_or_else(|| {
            HistoryIssue::UnparsableHistoryEntry {
                fragment: fragment.to_owned(),
            }
        })?;
        let name = name.trim_end_matches(|c: char| {
            c.is_whitespace() || matches!(c, '-' | ':' | '@' | '–' | '(' | '[')
        });

        if let Some(series) = catalog.lookup_series(name) {
            return Ok(Match {
                series,
                date,
                confidence: Confidence::Exact,
            });
        }
        let candidates = self.fuzzy_candidates(name, catalog);
        match candidates.as_slice() {
            [series] => Ok(Match {
                series: *series,
                date,
                confidence: Confidence::Inferred,
            }),
            [] => Err(HistoryIssue::UnknownVaccineAlias {
                fragment: fragment.to_owned(),
                name: name.to_owned(),
            }),
            _ => Err(HistoryIssue::AmbiguousVaccineAlias {
                fragment: fragment.to_owned(),
                name: name.to_owned(),
                candidates: candidates.iter().map(|s| s.id().to_owned()).collect(),
            }),
        }
    }

    // The longest digit-led tail that parses in a configured format is the date;
    // whatever precedes it is the name. "HepB-2023-01-15" and "HepB 2023-01-15"
    // split the same way.
    fn split_trailing_date<'f>(&self, fragment: &'f str) -> Option<(&'f str, Date)> {
        let body = fragment.trim_end_matches(|c: char| matches!(c, ')' | ']' | '.' | ';'));
        body.char_indices()
            .filter(|&(start, c)| {
                c.is_ascii_digit()
                    && !body[..start].ends_with(|prev: char| prev.is_ascii_digit())
            })
            .find_map(|(start, _)| {
                let token = &body[start..];
                self.config
                    .date_formats
                    .iter()
                    .find_map(|format| Date::strptime(format, token).ok())
                    .map(|date| (&body[..start], date))
            })
    }

    // Series with at least one alias inside the edit-distance bound. Short names
    // get a tighter bound so "RV" can never drift to "MMR".
    fn fuzzy_candidates<'c>(&self, name: &str, catalog: &'c VaccineCatalog) -> Vec<&'c VaccineSeries> {
        let needle = normalize_name(name);
        let bound = self.config.max_edit_distance.min(needle.chars().count() / 4);
        if bound == 0 {
            return vec![];
        }
        catalog
            .aliases()
            .filter(|(alias, _)| strsim::levenshtein(&needle, alias) <= bound)
            .map(|(_, series)| series)
            .unique_by(|&series| series.id())
            .collect()
    }
}

// Within a series the oldest dose is dose 1. Same-day duplicates keep text order.
fn assign_dose_indices(doses: &mut [AdministeredDose]) {
    let by_series = doses
        .iter()
        .enumerate()
        .map(|(position, dose)| (dose.series_id.clone(), (dose.date, position)))
        .into_group_map();
    for (_, mut slots) in by_series {
        slots.sort();
        for (k, (_, position)) in slots.into_iter().enumerate() {
            doses[position].dose_index = u8::try_from(k + 1).ok();
        }
    }
}
