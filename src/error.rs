use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input-level failures that abort a whole generation call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid date of birth: {0}")]
    InvalidDateOfBirth(String),
}

/// Why a history fragment produced no administered dose. The fragment text is
/// always preserved so a caregiver can correct it.
#[derive(Debug, Clone, Error, PartialEq, Eq, Deserialize, Serialize)]
pub enum HistoryIssue {
    #[error("no readable date in \"{fragment}\"")]
    UnparsableHistoryEntry { fragment: String },
    #[error("no vaccine named \"{name}\" (from \"{fragment}\")")]
    UnknownVaccineAlias { fragment: String, name: String },
    #[error("\"{name}\" could be any of {} (from \"{fragment}\")", candidates.join(", "))]
    AmbiguousVaccineAlias {
        fragment: String,
        name: String,
        candidates: Vec<String>,
    },
}

impl HistoryIssue {
    pub fn fragment(&self) -> &str {
        match self {
            Self::UnparsableHistoryEntry { fragment }
            | Self::UnknownVaccineAlias { fragment, .. }
            | Self::AmbiguousVaccineAlias { fragment, .. } => fragment,
        }
    }
}

/// Non-fatal, per-series problems reported next to a generated schedule.
#[derive(Debug, Clone, Error, PartialEq, Eq, Deserialize, Serialize)]
pub enum ScheduleWarning {
    #[error("{series}: no timing rule for dose {dose}; series skipped")]
    MissingRuleTableEntry { series: String, dose: u8 },
    #[error("{series}: dose given on {date} is dated before the date of birth")]
    DoseBeforeBirth { series: String, date: Date },
    #[error("{series}: recorded doses do not belong to any known vaccine series")]
    UnknownSeries { series: String },
    #[error("{series}: due date for dose {dose} is outside the supported calendar")]
    DateOutOfRange { series: String, dose: u8 },
}

/// Problems found while loading a catalog or rule table.
#[derive(Debug, Error)]
pub enum GuidelineError {
    #[error("duplicate vaccine series id {0}")]
    DuplicateSeries(String),
    #[error("alias \"{alias}\" is claimed by both {first} and {second}")]
    DuplicateAlias {
        alias: String,
        first: String,
        second: String,
    },
    #[error("{series}: dose count must be at least 1")]
    EmptySeries { series: String },
    #[error("timing rule references unknown series {0}")]
    UnknownSeries(String),
    #[error("{series}: dose index {found} does not follow {previous}")]
    NonIncreasingDoseIndex {
        series: String,
        previous: u8,
        found: u8,
    },
    #[error("{series}: dose {dose} needs a minimum interval from the previous dose")]
    MissingInterval { series: String, dose: u8 },
    #[error("{series}: dose 1 cannot have an interval from a previous dose")]
    UnexpectedInterval { series: String },
    #[error("{series}: no timing rule for primary dose {dose}")]
    MissingPrimaryDose { series: String, dose: u8 },
    #[error("{series}: final-dose flag on dose {dose} disagrees with dose count {dose_count}")]
    FinalFlagMismatch {
        series: String,
        dose: u8,
        dose_count: u8,
    },
    #[error("{series}: dose {dose} has a negative age or interval")]
    NegativeDays { series: String, dose: u8 },
    #[error("{series}: recommended age window for dose {dose} ends before it starts")]
    InvertedWindow { series: String, dose: u8 },
    #[error("malformed guideline data: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Failures of the profile store collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no child profile with id {0}")]
    NotFound(String),
    #[error("child profile {child} has no dose record {dose}")]
    UnknownDose { child: String, dose: u32 },
    #[error("dose record {dose} of child profile {child} was already corrected")]
    AlreadySuperseded { child: String, dose: u32 },
    #[error("profile store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed profile store: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("could not encode profile store: {0}")]
    Encode(#[from] ron::Error),
}
