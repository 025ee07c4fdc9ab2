//! Read-only country reference data used to synthesize duel questions and
//! validate continent pools.

mod names;

use std::collections::HashMap;

use serde::Deserialize;

pub use self::names::{CountryLookup, normalize_country_name, normalize_text, repair_mojibake};

/// Country table shipped with the binary.
const EMBEDDED_COUNTRIES: &str = include_str!("../../data/countries.json");

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Country {
    /// Canonical country name.
    pub name: String,
    /// Capital city.
    pub capital: String,
    /// Canonical names of bordering countries.
    #[serde(default)]
    pub neighbors: Vec<String>,
}

/// Immutable lookup over the country table, safe to share between requests.
#[derive(Debug, Clone)]
pub struct CountryCatalog {
    countries: Vec<Country>,
    by_name: HashMap<String, usize>,
}

impl CountryCatalog {
    /// Parse the table embedded at build time.
    pub fn embedded() -> Result<Self, serde_json::Error> {
        let countries = serde_json::from_str::<Vec<Country>>(EMBEDDED_COUNTRIES)?;
        Ok(Self::from_countries(countries))
    }

    /// Build a catalog from explicit rows, repairing mis-encoded accents on the way in.
    pub fn from_countries(countries: Vec<Country>) -> Self {
        let countries = countries
            .into_iter()
            .map(|country| Country {
                name: repair_mojibake(&country.name),
                capital: repair_mojibake(&country.capital),
                neighbors: country
                    .neighbors
                    .iter()
                    .map(|neighbor| repair_mojibake(neighbor))
                    .collect(),
            })
            .collect::<Vec<_>>();

        let by_name = countries
            .iter()
            .enumerate()
            .map(|(index, country)| (country.name.clone(), index))
            .collect();

        Self { countries, by_name }
    }

    /// Every country, in table order.
    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    /// Every canonical country name, in table order.
    pub fn names(&self) -> Vec<String> {
        self.countries
            .iter()
            .map(|country| country.name.clone())
            .collect()
    }

    /// Number of countries in the table.
    pub fn len(&self) -> usize {
        self.countries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// Whether `name` is an exact canonical country name.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Fetch a country by its exact canonical name.
    pub fn get(&self, name: &str) -> Option<&Country> {
        self.by_name
            .get(name)
            .and_then(|index| self.countries.get(*index))
    }

    /// Capital of a country, if the country is known.
    pub fn capital_of(&self, name: &str) -> Option<&str> {
        self.get(name).map(|country| country.capital.as_str())
    }

    /// Keep only the canonical names from `names`, trimmed and deduplicated in first-seen order.
    pub fn canonical_subset(&self, names: &[String]) -> Vec<String> {
        let mut seen = Vec::with_capacity(names.len());
        for name in names {
            let trimmed = name.trim();
            if self.contains(trimmed) && !seen.iter().any(|existing: &String| existing == trimmed) {
                seen.push(trimmed.to_owned());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        let catalog = CountryCatalog::embedded().unwrap();
        assert!(catalog.len() > 150);
        assert_eq!(catalog.capital_of("France"), Some("Paris"));
        assert!(catalog.get("Germany").unwrap().neighbors.contains(&"France".to_string()));
    }

    #[test]
    fn canonical_subset_filters_and_dedupes() {
        let catalog = CountryCatalog::embedded().unwrap();
        let subset = catalog.canonical_subset(&[
            "France".into(),
            "Atlantis".into(),
            " France ".into(),
            "Spain".into(),
        ]);
        assert_eq!(subset, vec!["France".to_string(), "Spain".to_string()]);
    }

    #[test]
    fn mojibake_is_repaired_on_load() {
        let catalog = CountryCatalog::from_countries(vec![Country {
            name: "Testland".into(),
            capital: "Bogot\u{00C3}\u{00A1}".into(),
            neighbors: Vec::new(),
        }]);
        assert_eq!(catalog.capital_of("Testland"), Some("Bogot\u{00E1}"));
    }
}
