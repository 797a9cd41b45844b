//! Location catalogs
//!
//! A catalog is the ordered list of destinations that get ranked. Its order
//! is the tie-break order of the report. Catalogs come either from a
//! built-in preset or from the `[catalog]` section of the configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Location;
use crate::{Result, TripcastError};

/// Built-in catalogs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Sunny holiday destinations around the Mediterranean and beyond
    #[default]
    Mediterranean,
    /// Major ski areas of the Alps and the Krkonoše
    Alpine,
}

impl Preset {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mediterranean => "mediterranean",
            Self::Alpine => "alpine",
        }
    }

    /// The preset's locations in catalog order
    #[must_use]
    pub fn locations(self) -> Vec<Location> {
        let entries: &[(&str, &str, f64, f64)] = match self {
            Self::Mediterranean => &[
                ("Ankara, Turkey", "Turkey", 39.9334, 32.8597),
                ("Athens, Greece", "Greece", 37.9838, 23.7275),
                ("Valletta, Malta", "Malta", 35.8989, 14.5146),
                ("Sardinia, Italy", "Italy", 40.1209, 9.0129),
                ("Sicily, Italy", "Italy", 37.5990, 14.0154),
                ("Nicosia, Cyprus", "Cyprus", 35.1856, 33.3823),
                ("Mallorca, Spain", "Spain", 39.6953, 3.0176),
                ("Lagos, Portugal", "Portugal", 37.1028, -8.6741),
                ("Mauritius", "Mauritius", -20.3484, 57.5522),
                ("Bucharest, Romania", "Romania", 44.4268, 26.1025),
            ],
            Self::Alpine => &[
                ("Les Trois Vallées", "France", 45.3356, 6.5890),
                ("Sölden", "Austria", 46.9655, 11.0076),
                ("Chamonix-Mont Blanc", "France", 45.9237, 6.8694),
                ("Val di Fassa", "Italy", 46.4339, 11.6960),
                ("Salzburger Sportwelt", "Austria", 47.3500, 13.4667),
                ("Alpenarena Flims-Laax-Falera", "Switzerland", 46.8366, 9.2797),
                ("Kitzsteinhorn Kaprun", "Austria", 47.1883, 12.6870),
                ("Ski Arlberg", "Austria", 47.1297, 10.2683),
                ("Espace Killy", "France", 45.4480, 6.9806),
                ("Spindleruv Mlyn", "Czechia", 50.7259, 15.6091),
            ],
        };

        entries
            .iter()
            .map(|&(name, country, lat, lon)| Location::with_country(lat, lon, name, country))
            .collect()
    }
}

impl FromStr for Preset {
    type Err = TripcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mediterranean" | "sun" => Ok(Self::Mediterranean),
            "alpine" | "ski" => Ok(Self::Alpine),
            other => Err(TripcastError::validation(format!(
                "Unknown catalog preset '{other}'. Must be one of: mediterranean, alpine"
            ))),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A catalog entry as written in the configuration file.
///
/// The coordinate may be left out, in which case the name is geocoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub country: Option<String>,
}

impl CatalogEntry {
    /// The entry as a location, if it carries a full coordinate
    #[must_use]
    pub fn to_location(&self) -> Option<Location> {
        let (latitude, longitude) = (self.latitude?, self.longitude?);
        Some(Location {
            latitude,
            longitude,
            name: self.name.clone(),
            country: self.country.clone(),
        })
    }
}

/// An ordered, validated set of locations
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    locations: Vec<Location>,
}

impl Catalog {
    /// Build a catalog, rejecting empty lists and invalid coordinates
    pub fn new(locations: Vec<Location>) -> Result<Self> {
        if locations.is_empty() {
            return Err(TripcastError::validation("Catalog must contain at least one location"));
        }
        for location in &locations {
            location.validate()?;
        }
        Ok(Self { locations })
    }

    #[must_use]
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            locations: preset.locations(),
        }
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Preset::Mediterranean)]
    #[case(Preset::Alpine)]
    fn test_presets_are_valid(#[case] preset: Preset) {
        let locations = preset.locations();
        assert_eq!(locations.len(), 10);
        assert!(Catalog::new(locations).is_ok());
    }

    #[test]
    fn test_mediterranean_order() {
        let catalog = Catalog::from_preset(Preset::Mediterranean);
        assert_eq!(catalog.locations()[0].name, "Ankara, Turkey");
        assert_eq!(catalog.locations()[9].name, "Bucharest, Romania");
    }

    #[rstest]
    #[case("mediterranean", Preset::Mediterranean)]
    #[case("Sun", Preset::Mediterranean)]
    #[case("ALPINE", Preset::Alpine)]
    #[case(" ski ", Preset::Alpine)]
    fn test_preset_from_str(#[case] input: &str, #[case] expected: Preset) {
        assert_eq!(input.parse::<Preset>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_preset() {
        assert!("tropical".parse::<Preset>().is_err());
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(Catalog::new(Vec::new()).is_err());
    }

    #[test]
    fn test_catalog_rejects_bad_coordinates() {
        let locations = vec![
            Location::new(35.0, 14.0, "ok"),
            Location::new(135.0, 14.0, "bad"),
        ];
        let err = Catalog::new(locations).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_entry_without_coordinates() {
        let entry = CatalogEntry {
            name: "Sölden".to_string(),
            latitude: Some(46.9655),
            longitude: None,
            country: None,
        };
        assert!(entry.to_location().is_none());

        let entry = CatalogEntry {
            longitude: Some(11.0076),
            ..entry
        };
        let location = entry.to_location().unwrap();
        assert_eq!(location.name, "Sölden");
        assert_eq!(location.longitude, 11.0076);
    }
}
