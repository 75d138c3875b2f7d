#![warn(clippy::all, rust_2018_idioms)]

pub mod catalog;
pub mod catch_up;
pub mod compliance;
pub mod config;
pub mod engine;
pub mod error;
pub mod guideline;
pub mod history;
pub mod narrative;
pub mod record;
pub mod rules;
pub mod schedule;
pub mod status;
pub mod store;
pub mod wire;

pub use catalog::{VaccineCatalog, VaccineSeries};
pub use compliance::Compliance;
pub use config::{EngineConfig, HistoryConfig};
pub use engine::{generate_schedule, parse_history, Engine};
pub use error::{EngineError, GuidelineError, HistoryIssue, ScheduleWarning, StoreError};
pub use guideline::Guideline;
pub use history::{HistoryParser, ParsedHistory};
pub use narrative::{NarrativeTextProvider, RationaleNarrative};
pub use record::{AdministeredDose, ChildRecord, Confidence};
pub use rules::{DoseRuleTable, DoseSpec};
pub use schedule::{Schedule, ScheduleEntry, ScheduleGenerator};
pub use status::{classify, DoseStatus};
pub use store::{ProfileStore, RonProfileStore};
pub use wire::{SerializedSchedule, SerializedScheduleEntry};
