use crate::{catalog::VaccineSeries, schedule::ScheduleEntry};

/// Caregiver-facing prose for a computed entry (plain-language notes, translation).
///
/// Providers only describe an entry. Due date, catch-up flag and status are
/// already fixed by the engine when a provider sees them.
pub trait NarrativeTextProvider {
    fn narrate(&self, entry: &ScheduleEntry, series: &VaccineSeries) -> String;
}

/// Restates the engine's own rationale with the dose position spelled out.
#[derive(Clone, Copy, Debug, Default)]
pub struct RationaleNarrative;

impl NarrativeTextProvider for RationaleNarrative {
    fn narrate(&self, entry: &ScheduleEntry, series: &VaccineSeries) -> String {
        let position = if entry.dose_index > series.dose_count() {
            "Booster dose".to_owned()
        } else {
            format!("{} dose of {}", ordinal(entry.dose_index), series.dose_count())
        };
        format!("{position}. {}", entry.rationale)
    }
}

fn ordinal(n: u8) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
