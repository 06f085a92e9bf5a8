//! Unit conversion between display units and canonical storage units.
//!
//! Weights are stored in kilograms and distances in kilometers. Conversion
//! happens at the read/write boundary; rounding only at presentation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kilograms per international pound
pub const KG_PER_LB: f64 = 0.453_592_37;

/// Kilometers per international mile
pub const KM_PER_MILE: f64 = 1.609_344;

/// Tolerance when comparing canonical weights or distances
pub const CANONICAL_EPSILON: f64 = 1e-6;

/// Decimal places kept when presenting values
pub const DISPLAY_DECIMALS: i32 = 2;

/// Preferred unit for displaying and entering weights
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "kg")]
    Kilograms,
    #[serde(rename = "lb")]
    Pounds,
}

/// Preferred unit for displaying and entering distances
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistanceUnit {
    #[default]
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "mi")]
    Miles,
}

impl WeightUnit {
    /// Convert a value in this unit to kilograms
    pub fn to_kg(self, value: f64) -> f64 {
        match self {
            WeightUnit::Kilograms => value,
            WeightUnit::Pounds => value * KG_PER_LB,
        }
    }

    /// Convert kilograms to this unit
    pub fn from_kg(self, kg: f64) -> f64 {
        match self {
            WeightUnit::Kilograms => kg,
            WeightUnit::Pounds => kg / KG_PER_LB,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeightUnit::Kilograms => "kg",
            WeightUnit::Pounds => "lb",
        }
    }
}

impl DistanceUnit {
    /// Convert a value in this unit to kilometers
    pub fn to_km(self, value: f64) -> f64 {
        match self {
            DistanceUnit::Kilometers => value,
            DistanceUnit::Miles => value * KM_PER_MILE,
        }
    }

    /// Convert kilometers to this unit
    pub fn from_km(self, km: f64) -> f64 {
        match self {
            DistanceUnit::Kilometers => km,
            DistanceUnit::Miles => km / KM_PER_MILE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WeightUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" | "kilograms" => Ok(WeightUnit::Kilograms),
            "lb" | "lbs" | "pounds" => Ok(WeightUnit::Pounds),
            other => Err(crate::Error::Config(format!("unknown weight unit: {}", other))),
        }
    }
}

impl FromStr for DistanceUnit {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "km" | "kilometers" => Ok(DistanceUnit::Kilometers),
            "mi" | "miles" => Ok(DistanceUnit::Miles),
            other => Err(crate::Error::Config(format!(
                "unknown distance unit: {}",
                other
            ))),
        }
    }
}

/// Round a value to the fixed display precision
pub fn round_display(value: f64) -> f64 {
    let factor = 10f64.powi(DISPLAY_DECIMALS);
    (value * factor).round() / factor
}

/// Compare two canonical quantities (kg or km)
pub fn canonical_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < CANONICAL_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kilograms_are_identity() {
        assert_eq!(WeightUnit::Kilograms.to_kg(102.5), 102.5);
        assert_eq!(WeightUnit::Kilograms.from_kg(102.5), 102.5);
    }

    #[test]
    fn test_pounds_conversion() {
        let kg = WeightUnit::Pounds.to_kg(225.0);
        assert!((kg - 102.058_283_25).abs() < 1e-9);
        assert_eq!(round_display(WeightUnit::Pounds.from_kg(100.0)), 220.46);
    }

    #[test]
    fn test_weight_round_trip_within_display_precision() {
        for unit in [WeightUnit::Kilograms, WeightUnit::Pounds] {
            for value in [0.0, 2.5, 45.0, 102.5, 137.75, 315.0, 0.01] {
                let back = unit.from_kg(unit.to_kg(value));
                assert_eq!(round_display(back), round_display(value), "{} {}", unit, value);
                assert!(canonical_eq(unit.to_kg(back), unit.to_kg(value)));
            }
        }
    }

    #[test]
    fn test_distance_round_trip_within_display_precision() {
        for unit in [DistanceUnit::Kilometers, DistanceUnit::Miles] {
            for value in [0.4, 3.1, 5.0, 10.0, 26.2, 42.195] {
                let back = unit.from_km(unit.to_km(value));
                assert_eq!(round_display(back), round_display(value));
            }
        }
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("LB".parse::<WeightUnit>().unwrap(), WeightUnit::Pounds);
        assert_eq!("km".parse::<DistanceUnit>().unwrap(), DistanceUnit::Kilometers);
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_serde_labels() {
        assert_eq!(serde_json::to_string(&WeightUnit::Pounds).unwrap(), "\"lb\"");
        let unit: DistanceUnit = serde_json::from_str("\"mi\"").unwrap();
        assert_eq!(unit, DistanceUnit::Miles);
    }
}
