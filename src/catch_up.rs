use crate::rules::DoseSpec;
use jiff::{civil::Date, ToSpan};
use std::{cmp::Ordering, fmt};

/// Which lower bound set the due date.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Floor {
    Age,
    Interval,
    Both,
}

/// Timing decision for one candidate dose.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DoseTiming {
    pub due_date: Date,
    pub is_catch_up: bool,
    pub binding: Floor,
    pub age_days: i32,
    /// Interval actually applied, `None` for the first dose of a series.
    pub interval_days: Option<i32>,
    /// Set when a catch-up interval replaced the routine one.
    pub routine_interval_days: Option<i32>,
}

fn earliest(
    age_floor: Date,
    previous: Option<Date>,
    interval_days: Option<i32>,
) -> Result<(Date, Floor), jiff::Error> {
    let Some((previous, days)) = previous.zip(interval_days) else {
        return Ok((age_floor, Floor::Age));
    };
    let interval_floor = previous.checked_add(days.days())?;
    Ok(match age_floor.cmp(&interval_floor) {
        Ordering::Greater => (age_floor, Floor::Age),
        Ordering::Less => (interval_floor, Floor::Interval),
        Ordering::Equal => (age_floor, Floor::Both),
    })
}

/// Decide routine vs catch-up timing for `spec`, given the date of the dose
/// before it. A first dose is never catch-up; a late first dose is just overdue.
pub fn resolve(
    spec: &DoseSpec,
    date_of_birth: Date,
    previous: Option<Date>,
    today: Date,
) -> Result<DoseTiming, jiff::Error> {
    let age_floor = date_of_birth.checked_add(spec.min_age_days.days())?;
    let (routine_due, routine_binding) = earliest(age_floor, previous, spec.min_interval_days)?;

    let is_catch_up = spec.dose_index > 1 && routine_due < today;
    let catch_up_interval = spec
        .catch_up_min_interval_days
        .filter(|_| is_catch_up)
        .filter(|days| Some(*days) != spec.min_interval_days);

    let Some(interval) = catch_up_interval else {
        return Ok(DoseTiming {
            due_date: routine_due,
            is_catch_up,
            binding: routine_binding,
            age_days: spec.min_age_days,
            interval_days: spec.min_interval_days,
            routine_interval_days: None,
        });
    };
    let (due_date, binding) = earliest(age_floor, previous, Some(interval))?;
    Ok(DoseTiming {
        due_date,
        is_catch_up,
        binding,
        age_days: spec.min_age_days,
        interval_days: Some(interval),
        routine_interval_days: spec.min_interval_days,
    })
}

// e.g. "Catch-up: interval floor (28d after previous dose) governs; age floor already satisfied."
impl fmt::Display for DoseTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let basis = if self.is_catch_up { "Catch-up" } else { "Routine" };
        let age = format!("age floor ({}d after birth)", self.age_days);
        match (self.interval_days, self.binding) {
            (None, _) => write!(f, "{basis}: {age} governs; first dose of series.")?,
            (Some(interval), Floor::Age) => write!(
                f,
                "{basis}: {age} governs; interval floor ({interval}d after previous dose) already satisfied."
            )?,
            (Some(interval), Floor::Interval) => write!(
                f,
                "{basis}: interval floor ({interval}d after previous dose) governs; age floor already satisfied."
            )?,
            (Some(interval), Floor::Both) => write!(
                f,
                "{basis}: {age} and interval floor ({interval}d after previous dose) coincide."
            )?,
        }
        if let (Some(interval), Some(routine)) = (self.interval_days, self.routine_interval_days) {
            write!(f, " Catch-up interval of {interval}d replaces the routine {routine}d.")?;
        }
        Ok(())
    }
}
