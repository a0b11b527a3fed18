//! Feature encoding: raw readings to the model's fixed-width input row.
//!
//! Every column starts at zero. Numeric fields are copied into the column of
//! the same name when both the value and the column exist. Categorical fields
//! set the column `{field}_{value}` to 1 when that column exists; a value the
//! model never saw during training leaves the whole field encoded as zeros.

use std::collections::HashMap;

/// Numeric inputs copied through unchanged.
pub const NUMERIC_FIELDS: [&str; 6] = [
    "indoor_temp",
    "indoor_humidity",
    "occupancy",
    "time_of_day",
    "outdoor_temp",
    "outdoor_humidity",
];

/// Inputs one-hot encoded as `{field}_{value}`.
pub const CATEGORICAL_FIELDS: [&str; 3] = ["weather", "activity_type", "user_feedback"];

/// Merged readings for one run, before encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInput {
    pub indoor_temp: Option<f64>,
    pub indoor_humidity: Option<f64>,
    pub occupancy: Option<f64>,
    /// Local hour of day, 0-23.
    pub time_of_day: Option<f64>,
    pub outdoor_temp: Option<f64>,
    pub outdoor_humidity: Option<f64>,
    /// Weather condition group, e.g. `Clouds`.
    pub weather: Option<String>,
    pub activity_type: Option<String>,
    /// The user's comfort status, e.g. `cold`.
    pub user_feedback: Option<String>,
}

impl RawInput {
    pub fn numeric(&self) -> [(&'static str, Option<f64>); 6] {
        [
            ("indoor_temp", self.indoor_temp),
            ("indoor_humidity", self.indoor_humidity),
            ("occupancy", self.occupancy),
            ("time_of_day", self.time_of_day),
            ("outdoor_temp", self.outdoor_temp),
            ("outdoor_humidity", self.outdoor_humidity),
        ]
    }

    pub fn categorical(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("weather", self.weather.as_deref()),
            ("activity_type", self.activity_type.as_deref()),
            ("user_feedback", self.user_feedback.as_deref()),
        ]
    }
}

/// Encoded model input, one value per schema column, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
    unmatched: Vec<String>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    /// One-hot column names that were wanted but are absent from the schema.
    pub fn unmatched_categories(&self) -> &[String] {
        &self.unmatched
    }
}

/// Encode `raw` against the ordered schema `expected`.
///
/// The result always has exactly `expected.len()` values.
pub fn encode(raw: &RawInput, expected: &[String]) -> FeatureVector {
    let index: HashMap<&str, usize> = expected
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();
    let mut values = vec![0.0; expected.len()];

    for (field, value) in raw.numeric() {
        if let (Some(value), Some(&i)) = (value, index.get(field)) {
            values[i] = value;
        }
    }

    let mut unmatched = Vec::new();
    for (field, value) in raw.categorical() {
        let Some(value) = value else { continue };
        let column = format!("{field}_{value}");
        match index.get(column.as_str()) {
            Some(&i) => values[i] = 1.0,
            None => {
                tracing::warn!(
                    field,
                    value,
                    "category not in model schema, encoding {field} as all zeros"
                );
                unmatched.push(column);
            }
        }
    }

    FeatureVector {
        columns: expected.to_vec(),
        values,
        unmatched,
    }
}
