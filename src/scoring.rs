//! Preference scoring
//!
//! A location's score is the sum of a temperature sub-score (0-6) and a
//! precipitation sub-score (0 or 4), so every score lies in `0..=10`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Location;
use crate::summary::LocationStats;
use crate::{Result, TripcastError};

/// Highest possible total score
pub const MAX_SCORE: u8 = 10;

/// Points awarded when the mean precipitation stays under the ceiling
pub const RAIN_BONUS: u8 = 4;

/// Upper deviation bound (inclusive, °C) and the sub-score it earns
const TEMPERATURE_STEPS: [(f64, u8); 6] = [
    (1.0, 6),
    (2.0, 5),
    (3.0, 4),
    (5.0, 3),
    (7.0, 2),
    (10.0, 1),
];

/// The three rainfall options offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RainfallChoice {
    /// Less than 1 mm
    UnderOneMm,
    /// Less than 2 mm
    UnderTwoMm,
    /// Doesn't matter
    Any,
}

impl RainfallChoice {
    /// Map the numbered menu selector (1, 2 or 3) to a choice
    pub fn from_selector(selector: u8) -> Result<Self> {
        match selector {
            1 => Ok(Self::UnderOneMm),
            2 => Ok(Self::UnderTwoMm),
            3 => Ok(Self::Any),
            other => Err(TripcastError::invalid_preference(format!(
                "rainfall preference must be 1, 2 or 3, got {other}"
            ))),
        }
    }

    /// Precipitation ceiling in mm, `None` when rain doesn't matter
    #[must_use]
    pub const fn ceiling(self) -> Option<f64> {
        match self {
            Self::UnderOneMm => Some(1.0),
            Self::UnderTwoMm => Some(2.0),
            Self::Any => None,
        }
    }
}

impl FromStr for RainfallChoice {
    type Err = TripcastError;

    fn from_str(s: &str) -> Result<Self> {
        let selector = s.trim().parse::<u8>().map_err(|_| {
            TripcastError::invalid_preference(format!(
                "rainfall preference must be 1, 2 or 3, got '{}'",
                s.trim()
            ))
        })?;
        Self::from_selector(selector)
    }
}

impl fmt::Display for RainfallChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnderOneMm => write!(f, "Less than 1mm"),
            Self::UnderTwoMm => write!(f, "Less than 2mm"),
            Self::Any => write!(f, "Doesn't matter"),
        }
    }
}

/// What the user wants the weather to be like
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    /// Desired mean temperature in Celsius
    pub target_temperature: f64,
    /// Maximum acceptable mean precipitation in mm
    pub rain_ceiling: Option<f64>,
}

impl Preference {
    /// Build a preference from a target temperature and a menu choice
    pub fn new(target_temperature: f64, rainfall: RainfallChoice) -> Result<Self> {
        Self::with_ceiling(target_temperature, rainfall.ceiling())
    }

    /// Build a preference with an arbitrary precipitation ceiling
    pub fn with_ceiling(target_temperature: f64, rain_ceiling: Option<f64>) -> Result<Self> {
        if !target_temperature.is_finite() {
            return Err(TripcastError::invalid_preference(format!(
                "target temperature must be a finite number, got {target_temperature}"
            )));
        }
        if let Some(ceiling) = rain_ceiling {
            if !ceiling.is_finite() || ceiling < 0.0 {
                return Err(TripcastError::invalid_preference(format!(
                    "rain ceiling must be a non-negative number, got {ceiling}"
                )));
            }
        }
        Ok(Self {
            target_temperature,
            rain_ceiling,
        })
    }
}

/// A location together with its statistics and score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLocation {
    pub location: Location,
    pub stats: LocationStats,
    pub score: u8,
}

impl ScoredLocation {
    /// Score `stats` against `preference`
    #[must_use]
    pub fn new(location: Location, stats: LocationStats, preference: &Preference) -> Self {
        let score = score(&stats, preference);
        Self {
            location,
            stats,
            score,
        }
    }
}

/// Temperature sub-score for an absolute deviation from the target.
///
/// Non-increasing step function; non-finite deviations score 0.
#[must_use]
pub fn temperature_subscore(deviation: f64) -> u8 {
    let deviation = deviation.abs();
    TEMPERATURE_STEPS
        .iter()
        .find(|(bound, _)| deviation <= *bound)
        .map_or(0, |&(_, points)| points)
}

/// Precipitation sub-score: the bonus only applies under an explicit ceiling
#[must_use]
pub fn precipitation_subscore(mean_precipitation: f64, ceiling: Option<f64>) -> u8 {
    match ceiling {
        Some(ceiling) if mean_precipitation <= ceiling => RAIN_BONUS,
        _ => 0,
    }
}

/// Total score of `stats` for `preference`, always within `0..=MAX_SCORE`
#[must_use]
pub fn score(stats: &LocationStats, preference: &Preference) -> u8 {
    let deviation = stats.mean_temperature - preference.target_temperature;
    temperature_subscore(deviation)
        + precipitation_subscore(stats.mean_precipitation, preference.rain_ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 6)]
    #[case(1.0, 6)]
    #[case(1.0001, 5)]
    #[case(2.0, 5)]
    #[case(2.5, 4)]
    #[case(3.0, 4)]
    #[case(3.0001, 3)]
    #[case(5.0, 3)]
    #[case(6.0, 2)]
    #[case(7.0, 2)]
    #[case(7.0001, 1)]
    #[case(10.0, 1)]
    #[case(10.0001, 0)]
    #[case(42.0, 0)]
    fn test_temperature_subscore_table(#[case] deviation: f64, #[case] expected: u8) {
        assert_eq!(temperature_subscore(deviation), expected);
        assert_eq!(temperature_subscore(-deviation), expected);
    }

    #[test]
    fn test_temperature_subscore_is_non_increasing() {
        let mut previous = temperature_subscore(0.0);
        for step in 1..=1500 {
            let current = temperature_subscore(f64::from(step) * 0.01);
            assert!(current <= previous, "sub-score rose at deviation {}", f64::from(step) * 0.01);
            previous = current;
        }
    }

    #[test]
    fn test_temperature_subscore_non_finite() {
        assert_eq!(temperature_subscore(f64::NAN), 0);
        assert_eq!(temperature_subscore(f64::INFINITY), 0);
    }

    #[rstest]
    #[case(0.0, Some(1.0), 4)]
    #[case(1.0, Some(1.0), 4)]
    #[case(1.5, Some(1.0), 0)]
    #[case(2.0, Some(2.0), 4)]
    #[case(2.01, Some(2.0), 0)]
    #[case(0.0, None, 0)]
    #[case(25.0, None, 0)]
    fn test_precipitation_subscore(
        #[case] mean_rain: f64,
        #[case] ceiling: Option<f64>,
        #[case] expected: u8,
    ) {
        assert_eq!(precipitation_subscore(mean_rain, ceiling), expected);
    }

    #[test]
    fn test_total_score_stays_in_range() {
        let temps = [-40.0, -3.5, 0.0, 9.99, 15.0, 15.5, 21.0, 33.3, 60.0];
        let rains = [0.0, 0.3, 1.0, 1.999, 2.0, 7.5];
        let targets = [-10.0, 0.0, 15.0, 30.0];
        for &t in &temps {
            for &r in &rains {
                for &target in &targets {
                    for choice in [RainfallChoice::UnderOneMm, RainfallChoice::UnderTwoMm, RainfallChoice::Any] {
                        let pref = Preference::new(target, choice).unwrap();
                        let s = score(&LocationStats::new(t, r, 5), &pref);
                        assert!(s <= MAX_SCORE);
                    }
                }
            }
        }
    }

    #[test]
    fn test_perfect_match_scores_ten() {
        let pref = Preference::new(22.0, RainfallChoice::UnderOneMm).unwrap();
        assert_eq!(score(&LocationStats::new(22.4, 0.0, 5), &pref), MAX_SCORE);
    }

    #[test]
    fn test_no_ceiling_never_earns_bonus() {
        let pref = Preference::new(22.0, RainfallChoice::Any).unwrap();
        assert_eq!(score(&LocationStats::new(22.0, 0.0, 5), &pref), 6);
    }

    #[rstest]
    #[case(1, Some(1.0))]
    #[case(2, Some(2.0))]
    #[case(3, None)]
    fn test_rainfall_selector(#[case] selector: u8, #[case] ceiling: Option<f64>) {
        assert_eq!(RainfallChoice::from_selector(selector).unwrap().ceiling(), ceiling);
    }

    #[rstest]
    #[case("0")]
    #[case("4")]
    #[case("two")]
    #[case("")]
    fn test_invalid_rainfall_selector(#[case] input: &str) {
        let err = input.parse::<RainfallChoice>().unwrap_err();
        assert!(matches!(err, TripcastError::InvalidPreference { .. }));
    }

    #[test]
    fn test_rainfall_selector_parses_with_whitespace() {
        assert_eq!(" 2\n".parse::<RainfallChoice>().unwrap(), RainfallChoice::UnderTwoMm);
    }

    #[test]
    fn test_preference_rejects_non_finite_target() {
        assert!(Preference::new(f64::NAN, RainfallChoice::Any).is_err());
        assert!(Preference::new(f64::INFINITY, RainfallChoice::Any).is_err());
    }

    #[test]
    fn test_preference_rejects_negative_ceiling() {
        let err = Preference::with_ceiling(20.0, Some(-0.5)).unwrap_err();
        assert!(matches!(err, TripcastError::InvalidPreference { .. }));
    }
}
