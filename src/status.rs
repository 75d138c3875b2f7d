use jiff::{civil::Date, ToSpan};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const UPCOMING_WINDOW_DAYS: i32 = 7;

/// Display urgency of a scheduled dose.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Overdue,
    DueToday,
    Upcoming,
    Scheduled,
}

impl fmt::Display for DoseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overdue => write!(f, "Overdue"),
            Self::DueToday => write!(f, "Due Today"),
            Self::Upcoming => write!(f, "Upcoming"),
            Self::Scheduled => write!(f, "Scheduled"),
        }
    }
}

pub fn classify(due_date: Date, today: Date) -> DoseStatus {
    classify_within(due_date, today, UPCOMING_WINDOW_DAYS)
}

pub fn classify_within(due_date: Date, today: Date, window_days: i32) -> DoseStatus {
    if due_date < today {
        DoseStatus::Overdue
    } else if due_date == today {
        DoseStatus::DueToday
    } else if due_date <= today.saturating_add(window_days.days()) {
        DoseStatus::Upcoming
    } else {
        DoseStatus::Scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    #[test]
    fn test_classify_boundaries() {
        let today = date(2023, 6, 1);
        assert_eq!(classify(date(2023, 5, 31), today), DoseStatus::Overdue);
        assert_eq!(classify(date(2023, 6, 1), today), DoseStatus::DueToday);
        assert_eq!(classify(date(2023, 6, 2), today), DoseStatus::Upcoming);
        assert_eq!(classify(date(2023, 6, 8), today), DoseStatus::Upcoming);
        assert_eq!(classify(date(2023, 6, 9), today), DoseStatus::Scheduled);
    }

    #[test]
    fn test_classify_within_custom_window() {
        let today = date(2023, 6, 1);
        assert_eq!(classify_within(date(2023, 6, 9), today, 14), DoseStatus::Upcoming);
        assert_eq!(classify_within(date(2023, 6, 2), today, 0), DoseStatus::Scheduled);
    }

    #[test]
    fn test_wire_names() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_string(&DoseStatus::DueToday)?, "\"due_today\"");
        assert_eq!(serde_json::to_string(&DoseStatus::Overdue)?, "\"overdue\"");
        Ok(())
    }
}
