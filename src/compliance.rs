use crate::{catalog::VaccineCatalog, record::ChildRecord, schedule::Schedule};
use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many of the doses required so far a child has actually had.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct Compliance {
    pub administered: usize,
    pub required_to_date: usize,
}

impl Compliance {
    /// Doses given in catalog series, plus every generated entry already due.
    pub fn measure(child: &ChildRecord, catalog: &VaccineCatalog, schedule: &Schedule, today: Date) -> Self {
        let administered = child
            .effective_doses()
            .filter(|dose| catalog.series(&dose.series_id).is_some())
            .count();
        let outstanding = schedule
            .entries
            .iter()
            .filter(|entry| entry.due_date <= today)
            .count();
        Self {
            administered,
            required_to_date: administered + outstanding,
        }
    }

    /// Whole percent, rounded down. Nothing required yet counts as fully up to date.
    pub fn percent(&self) -> u8 {
        if self.required_to_date == 0 {
            return 100;
        }
        (self.administered * 100 / self.required_to_date) as u8
    }
}

impl fmt::Display for Compliance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}% up to date ({}/{})",
            self.percent(),
            self.administered,
            self.required_to_date
        )
    }
}
