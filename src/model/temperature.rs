//! Temperature scale conversion and the composite response.

use serde::{Deserialize, Serialize, Serializer};

/// Offset added to celsius to obtain kelvin.
///
/// Kept at 273 (not 273.15) so responses stay identical to the deployed services.
pub const KELVIN_OFFSET: f64 = 273.0;

/// Convert a celsius reading into `(fahrenheit, kelvin)`.
pub fn convert(celsius: f64) -> (f64, f64) {
    (celsius * 1.8 + 32.0, celsius + KELVIN_OFFSET)
}

/// Result returned to the caller by both hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    pub city: String,
    #[serde(rename = "temp_C", serialize_with = "whole_as_integer")]
    pub temp_c: f64,
    #[serde(rename = "temp_F", serialize_with = "whole_as_integer")]
    pub temp_f: f64,
    #[serde(rename = "temp_K", serialize_with = "whole_as_integer")]
    pub temp_k: f64,
}

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Write `25.0` as `25`; fractional values are written unchanged.
fn whole_as_integer<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

impl CompositeResult {
    pub fn from_celsius(city: impl Into<String>, celsius: f64) -> Self {
        let (temp_f, temp_k) = convert(celsius);
        Self {
            city: city.into(),
            temp_c: celsius,
            temp_f,
            temp_k,
        }
    }
}
