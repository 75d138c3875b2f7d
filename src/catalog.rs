use crate::error::GuidelineError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{
    collections::{hash_map::Entry, BTreeSet, HashMap},
    fmt,
};

/// Lowercase and collapse runs of whitespace so "Hepatitis  B" finds "hepatitis b".
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().map(str::to_lowercase).join(" ")
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct VaccineSeries {
    id: String,
    display_name: String,
    #[serde(default)]
    aliases: BTreeSet<String>,
    dose_count: u8,
}

impl VaccineSeries {
    pub fn new<'a>(
        id: &str,
        display_name: &str,
        aliases: impl IntoIterator<Item = &'a str>,
        dose_count: u8,
    ) -> Self {
        Self {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            aliases: aliases.into_iter().map(str::to_owned).collect(),
            dose_count,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn aliases(&self) -> &BTreeSet<String> {
        &self.aliases
    }

    pub fn dose_count(&self) -> u8 {
        self.dose_count
    }

    // The id and display name are matched like any other alias.
    fn all_names(&self) -> impl Iterator<Item = &str> {
        [self.id.as_str(), self.display_name.as_str()]
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Display for VaccineSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x)", self.display_name, self.dose_count)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogData {
    version: String,
    series: Vec<VaccineSeries>,
}

/// Versioned registry of vaccine series. Series keep their file order, which
/// is also the tie-break order of generated schedules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(try_from = "CatalogData", into = "CatalogData")]
pub struct VaccineCatalog {
    version: String,
    series: Vec<VaccineSeries>,
    // normalized alias -> position in `series`
    alias_index: HashMap<String, usize>,
}

impl VaccineCatalog {
    pub fn new(version: &str, series: Vec<VaccineSeries>) -> Result<Self, GuidelineError> {
        let mut alias_index = HashMap::new();
        let mut ids = BTreeSet::new();
        for (position, entry) in series.iter().enumerate() {
            if !ids.insert(entry.id.clone()) {
                return Err(GuidelineError::DuplicateSeries(entry.id.clone()));
            }
            if entry.dose_count == 0 {
                return Err(GuidelineError::EmptySeries {
                    series: entry.id.clone(),
                });
            }
            for name in entry.all_names() {
                match alias_index.entry(normalize_name(name)) {
                    Entry::Vacant(slot) => {
                        slot.insert(position);
                    }
                    Entry::Occupied(slot) if *slot.get() != position => {
                        return Err(GuidelineError::DuplicateAlias {
                            alias: slot.key().clone(),
                            first: series[*slot.get()].id.clone(),
                            second: entry.id.clone(),
                        });
                    }
                    Entry::Occupied(_) => {}
                }
            }
        }
        Ok(Self {
            version: version.to_owned(),
            series,
            alias_index,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Case-insensitive, whitespace-normalized lookup by id, display name or alias.
    pub fn lookup_series(&self, name_or_alias: &str) -> Option<&VaccineSeries> {
        self.alias_index
            .get(&normalize_name(name_or_alias))
            .map(|position| &self.series[*position])
    }

    pub fn series(&self, id: &str) -> Option<&VaccineSeries> {
        self.series.iter().find(|series| series.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.series.iter().position(|series| series.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VaccineSeries> {
        self.series.iter()
    }

    /// Every normalized alias with its series, in a stable order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &VaccineSeries)> {
        self.alias_index
            .iter()
            .sorted_by_key(|&(alias, position)| (*position, alias.as_str()))
            .map(|(alias, position)| (alias.as_str(), &self.series[*position]))
    }
}

impl TryFrom<CatalogData> for VaccineCatalog {
    type Error = GuidelineError;

    fn try_from(data: CatalogData) -> Result<Self, Self::Error> {
        Self::new(&data.version, data.series)
    }
}

impl From<VaccineCatalog> for CatalogData {
    fn from(catalog: VaccineCatalog) -> Self {
        Self {
            version: catalog.version,
            series: catalog.series,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn catalog() -> Result<VaccineCatalog> {
        Ok(VaccineCatalog::new(
            "test-1",
            vec![
                VaccineSeries::new("HepB", "Hepatitis B", ["Hep B", "HBV"], 3),
                VaccineSeries::new("RV", "Rotavirus", ["Rota"], 3),
            ],
        )?)
    }

    #[test]
    fn test_lookup_is_case_and_space_insensitive() -> Result<()> {
        let catalog = catalog()?;
        assert_eq!(catalog.lookup_series("hepb").map(|s| s.id()), Some("HepB"));
        assert_eq!(
            catalog.lookup_series("  HEPATITIS   b ").map(|s| s.id()),
            Some("HepB")
        );
        assert_eq!(catalog.lookup_series("hbv").map(|s| s.id()), Some("HepB"));
        assert_eq!(catalog.lookup_series("rota").map(|s| s.id()), Some("RV"));
        assert!(catalog.lookup_series("Flu shot").is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_alias_is_rejected() {
        let err = VaccineCatalog::new(
            "bad",
            vec![
                VaccineSeries::new("HepA", "Hepatitis A", ["Hep"], 2),
                VaccineSeries::new("HepB", "Hepatitis B", ["hep"], 3),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, GuidelineError::DuplicateAlias { alias, .. } if alias == "hep"));
    }

    #[test]
    fn test_duplicate_series_and_empty_series_are_rejected() {
        assert!(matches!(
            VaccineCatalog::new(
                "bad",
                vec![
                    VaccineSeries::new("HepB", "Hepatitis B", [], 3),
                    VaccineSeries::new("HepB", "Hep B again", [], 3),
                ],
            ),
            Err(GuidelineError::DuplicateSeries(_))
        ));
        assert!(matches!(
            VaccineCatalog::new("bad", vec![VaccineSeries::new("X", "X", [], 0)]),
            Err(GuidelineError::EmptySeries { .. })
        ));
    }

    #[test]
    fn test_catalog_keeps_file_order() -> Result<()> {
        let catalog = catalog()?;
        assert_eq!(catalog.iter().map(|s| s.id()).collect_vec(), vec!["HepB", "RV"]);
        assert_eq!(catalog.position("RV"), Some(1));
        assert_eq!(catalog.aliases().next().map(|(_, s)| s.id()), Some("HepB"));
        Ok(())
    }
}
