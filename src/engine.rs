//! The public face of the scheduling core: parse a caregiver's history, then
//! compute what each series needs next.
//!
//! Everything here is a pure function of its inputs. Callers fetch a
//! [`ChildRecord`] snapshot from their profile store, pass it in, and may call
//! from any thread.

use crate::{
    catalog::VaccineCatalog,
    compliance::Compliance,
    config::EngineConfig,
    error::EngineError,
    history::{HistoryParser, ParsedHistory},
    record::ChildRecord,
    rules::DoseRuleTable,
    schedule::{Schedule, ScheduleGenerator},
};
use jiff::civil::Date;
use log::info;

#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    parser: HistoryParser,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let parser = HistoryParser::new(config.history.clone());
        Self { config, parser }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parse_history(&self, text: &str, catalog: &VaccineCatalog) -> ParsedHistory {
        self.parser.parse(text, catalog)
    }

    pub fn generate_schedule(
        &self,
        child: &ChildRecord,
        catalog: &VaccineCatalog,
        rules: &DoseRuleTable,
        today: Date,
    ) -> Result<Schedule, EngineError> {
        let schedule = ScheduleGenerator::new(catalog, rules)
            .with_upcoming_window(self.config.upcoming_window_days)
            .generate(child, today)?;
        info!(
            "{}: {} entries, {} warnings (catalog {}, rules {})",
            child.id(),
            schedule.entries.len(),
            schedule.warnings.len(),
            schedule.catalog_version,
            schedule.rules_version
        );
        Ok(schedule)
    }

    pub fn compliance(
        &self,
        child: &ChildRecord,
        catalog: &VaccineCatalog,
        rules: &DoseRuleTable,
        today: Date,
    ) -> Result<Compliance, EngineError> {
        let schedule = self.generate_schedule(child, catalog, rules, today)?;
        Ok(Compliance::measure(child, catalog, &schedule, today))
    }
}

/// [`Engine::parse_history`] with the default configuration.
pub fn parse_history(text: &str, catalog: &VaccineCatalog) -> ParsedHistory {
    HistoryParser::default().parse(text, catalog)
}

/// [`Engine::generate_schedule`] with the default configuration.
pub fn generate_schedule(
    child: &ChildRecord,
    catalog: &VaccineCatalog,
    rules: &DoseRuleTable,
    today: Date,
) -> Result<Schedule, EngineError> {
    ScheduleGenerator::new(catalog, rules).generate(child, today)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        catalog::VaccineSeries,
        guideline::Guideline,
        record::Confidence,
        rules::DoseSpec,
        status::DoseStatus,
    };
    use anyhow::Result;
    use jiff::{civil::date, ToSpan};

    // Simplified HepB: dose1 minAge 0; dose2 minAge 28 interval 28; dose3 minAge 168 interval 56.
    fn hepb() -> Result<(VaccineCatalog, DoseRuleTable)> {
        let catalog = VaccineCatalog::new(
            "hepb-test",
            vec![VaccineSeries::new("HepB", "Hepatitis B", ["Hep B"], 3)],
        )?;
        let d1 = DoseSpec::first("HepB", 0, (0, 1));
        let d2 = d1.next(28, 28, (28, 60));
        let d3 = d2.next(168, 56, (180, 540)).final_dose();
        Ok((catalog, DoseRuleTable::new("hepb-test", vec![d1, d2, d3])?))
    }

    fn newborn() -> ChildRecord {
        ChildRecord::new("Ada", date(2023, 1, 1))
    }

    #[test]
    fn test_scenario_newborn() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let schedule = generate_schedule(&newborn(), &catalog, &rules, date(2023, 1, 1))?;
        assert_eq!(schedule.entries.len(), 1);
        let entry = &schedule.entries[0];
        assert_eq!(
            (entry.series_id.as_str(), entry.dose_index, entry.due_date, entry.is_catch_up, entry.status),
            ("HepB", 1, date(2023, 1, 1), false, DoseStatus::DueToday)
        );
        Ok(())
    }

    #[test]
    fn test_scenario_second_dose() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let mut child = newborn();
        let parsed = parse_history("HepB - 2023-01-02", &catalog);
        child.import_history("HepB - 2023-01-02", &parsed);
        let schedule = generate_schedule(&child, &catalog, &rules, date(2023, 1, 2))?;
        let entry = &schedule.entries[0];
        assert_eq!(entry.dose_index, 2);
        assert_eq!(entry.due_date, date(2023, 1, 30));
        Ok(())
    }

    #[test]
    fn test_scenario_seven_months_no_doses() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let schedule = generate_schedule(&newborn(), &catalog, &rules, date(2023, 8, 1))?;
        assert_eq!(schedule.entries.len(), 1);
        assert_eq!(schedule.entries[0].dose_index, 1);
        assert_eq!(schedule.entries[0].due_date, date(2023, 1, 1));
        assert_eq!(schedule.entries[0].status, DoseStatus::Overdue);
        Ok(())
    }

    #[test]
    fn test_scenario_unparsable_history_does_not_block() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let text = "Flu shot - sometime last year";
        let parsed = parse_history(text, &catalog);
        assert_eq!(parsed.unparsed, vec![text]);
        assert!(parsed.administered.is_empty());

        let mut child = newborn();
        child.import_history(text, &parsed);
        let schedule = generate_schedule(&child, &catalog, &rules, date(2023, 1, 1))?;
        assert_eq!(schedule.entries.len(), 1);
        Ok(())
    }

    #[test]
    fn test_idempotence() -> Result<()> {
        let guideline = Guideline::builtin();
        let engine = Engine::default();
        let mut child = ChildRecord::new("Ada", date(2022, 3, 14));
        let text = "HepB - 2022-03-14, DTaP - 2022-05-20, RV - 05/20/2022, Hib - 2022-05-20";
        let parsed = engine.parse_history(text, guideline.catalog());
        assert!(parsed.unparsed.is_empty(), "{:?}", parsed.issues);
        child.import_history(text, &parsed);

        let today = date(2023, 2, 1);
        let first = engine.generate_schedule(&child, guideline.catalog(), guideline.rules(), today)?;
        let second = engine.generate_schedule(&child, guideline.catalog(), guideline.rules(), today)?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_adding_doses_never_adds_remaining_doses() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let today = date(2023, 9, 1);
        let remaining = |child: &ChildRecord| -> Result<usize> {
            let schedule = generate_schedule(child, &catalog, &rules, today)?;
            Ok(schedule
                .entry("HepB")
                .map(|e| 3 - e.dose_index as usize + 1)
                .unwrap_or(0))
        };

        let mut child = newborn();
        let mut last = remaining(&child)?;
        for when in [date(2023, 1, 1), date(2023, 2, 1), date(2023, 7, 1), date(2023, 8, 1)] {
            child.record_dose("HepB", when, "", Confidence::Exact);
            let now = remaining(&child)?;
            assert!(now <= last);
            last = now;
        }
        assert_eq!(last, 0);
        Ok(())
    }

    #[test]
    fn test_due_dates_never_go_backwards_through_a_series() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let mut child = newborn();
        let mut previous_due = None;
        let mut today = date(2023, 1, 1);
        for _ in 0..3 {
            let schedule = generate_schedule(&child, &catalog, &rules, today)?;
            let entry = schedule.entry("HepB").cloned().unwrap();
            if let Some(previous_due) = previous_due {
                assert!(entry.due_date >= previous_due);
            }
            previous_due = Some(entry.due_date);
            // Give each dose a little late, on a catch-up basis.
            today = entry.due_date.checked_add(10.days())?;
            child.record_dose("HepB", today, "", Confidence::Exact);
            today = today.checked_add(90.days())?;
        }
        Ok(())
    }

    #[test]
    fn test_catch_up_respects_interval() -> Result<()> {
        let guideline = Guideline::builtin();
        let mut child = ChildRecord::new("Ada", date(2019, 6, 1));
        child.record_dose("VAR", date(2020, 6, 1), "", Confidence::Exact);
        child.record_dose("DTaP", date(2019, 8, 1), "", Confidence::Exact);
        let today = date(2024, 1, 15);
        let schedule = generate_schedule(&child, guideline.catalog(), guideline.rules(), today)?;
        for entry in schedule.entries.iter().filter(|e| e.is_catch_up) {
            let spec = guideline.rules().dose(&entry.series_id, entry.dose_index).unwrap();
            let interval = spec.catch_up_min_interval_days.or(spec.min_interval_days).unwrap();
            let previous = child.doses_for(&entry.series_id).last().map(|d| d.date).unwrap();
            assert!(entry.due_date >= previous.checked_add(interval.days())?);
        }
        let var = schedule.entry("VAR").unwrap();
        assert!(var.is_catch_up);
        assert_eq!(var.due_date, date(2020, 8, 29));
        Ok(())
    }

    #[test]
    fn test_compliance_from_engine_outputs() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let mut child = newborn();
        child.record_dose("HepB", date(2023, 1, 1), "", Confidence::Exact);
        let engine = Engine::default();
        let compliance = engine.compliance(&child, &catalog, &rules, date(2023, 3, 1))?;
        assert_eq!((compliance.administered, compliance.required_to_date), (1, 2));
        Ok(())
    }

    #[test]
    fn test_configured_upcoming_window() -> Result<()> {
        let (catalog, rules) = hepb()?;
        let engine = Engine::new(EngineConfig {
            upcoming_window_days: 30,
            ..EngineConfig::default()
        });
        let mut child = newborn();
        child.record_dose("HepB", date(2023, 1, 2), "", Confidence::Exact);
        let schedule = engine.generate_schedule(&child, &catalog, &rules, date(2023, 1, 2))?;
        assert_eq!(schedule.entries[0].status, DoseStatus::Upcoming);
        Ok(())
    }
}
