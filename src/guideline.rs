use crate::{
    catalog::VaccineCatalog,
    error::GuidelineError,
    rules::DoseRuleTable,
};
use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use std::{fs, path::Path, sync::OnceLock};

const BUILTIN_GUIDELINE: &str = include_str!("../data/cdc_childhood.ron");

#[derive(Deserialize)]
struct GuidelineData {
    catalog: VaccineCatalog,
    rules: DoseRuleTable,
}

/// A catalog and the rule table that times its series, checked against each other.
#[derive(Debug, Clone)]
pub struct Guideline {
    catalog: VaccineCatalog,
    rules: DoseRuleTable,
}

impl Guideline {
    pub fn new(catalog: VaccineCatalog, rules: DoseRuleTable) -> Result<Self, GuidelineError> {
        for series_id in rules.series_ids() {
            if catalog.series(series_id).is_none() {
                return Err(GuidelineError::UnknownSeries(series_id.to_owned()));
            }
        }
        for series in catalog.iter() {
            let specs = rules.rules_for(series.id());
            for dose in 1..=series.dose_count() {
                let Some(spec) = specs.iter().find(|spec| spec.dose_index == dose) else {
                    return Err(GuidelineError::MissingPrimaryDose {
                        series: series.id().to_owned(),
                        dose,
                    });
                };
                if spec.is_final_dose_of_series != (dose == series.dose_count()) {
                    return Err(GuidelineError::FinalFlagMismatch {
                        series: series.id().to_owned(),
                        dose,
                        dose_count: series.dose_count(),
                    });
                }
            }
            if let Some(booster) = specs
                .iter()
                .find(|spec| spec.dose_index > series.dose_count() && spec.is_final_dose_of_series)
            {
                return Err(GuidelineError::FinalFlagMismatch {
                    series: series.id().to_owned(),
                    dose: booster.dose_index,
                    dose_count: series.dose_count(),
                });
            }
        }
        Ok(Self { catalog, rules })
    }

    pub fn from_ron(text: &str) -> Result<Self, GuidelineError> {
        let data: GuidelineData = ron::from_str(text)?;
        Self::new(data.catalog, data.rules)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading guideline {}", path.display()))?;
        let guideline = Self::from_ron(&text)
            .with_context(|| format!("loading guideline {}", path.display()))?;
        info!(
            "loaded guideline {} (catalog {}, rules {})",
            path.display(),
            guideline.catalog.version(),
            guideline.rules.version()
        );
        Ok(guideline)
    }

    /// The US childhood schedule shipped with the crate.
    pub fn builtin() -> &'static Guideline {
        static GUIDELINE: OnceLock<Guideline> = OnceLock::new();
        GUIDELINE.get_or_init(|| {
            Self::from_ron(BUILTIN_GUIDELINE).expect("the embedded guideline is valid")
        })
    }

    pub fn catalog(&self) -> &VaccineCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &DoseRuleTable {
        &self.rules
    }
}
