//! Patient feature record and the canonical column layout shared by
//! every preprocessing stage.

use crate::error::InputError;
use serde_json::{Map, Value};
use std::fmt;

/// A single input column of the classifier.
///
/// Declaration order is the column order the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Pregnancies,
    Glucose,
    BloodPressure,
    SkinThickness,
    Insulin,
    Bmi,
    DiabetesPedigreeFunction,
    Age,
}

impl FeatureColumn {
    /// Canonical column order of the model input vector.
    pub const ALL: [FeatureColumn; 8] = [
        FeatureColumn::Pregnancies,
        FeatureColumn::Glucose,
        FeatureColumn::BloodPressure,
        FeatureColumn::SkinThickness,
        FeatureColumn::Insulin,
        FeatureColumn::Bmi,
        FeatureColumn::DiabetesPedigreeFunction,
        FeatureColumn::Age,
    ];

    /// Columns log-transformed with `ln(x + 1)` before scaling.
    pub const SKEWED: [FeatureColumn; 2] = [FeatureColumn::SkinThickness, FeatureColumn::Insulin];

    /// Columns passed through the fitted min-max scaler, in the order the
    /// scaler was fitted on.
    pub const SCALED: [FeatureColumn; 3] = [
        FeatureColumn::Insulin,
        FeatureColumn::SkinThickness,
        FeatureColumn::DiabetesPedigreeFunction,
    ];

    /// Number of columns in a record.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of this column in the model input vector.
    pub fn index(self) -> usize {
        match self {
            FeatureColumn::Pregnancies => 0,
            FeatureColumn::Glucose => 1,
            FeatureColumn::BloodPressure => 2,
            FeatureColumn::SkinThickness => 3,
            FeatureColumn::Insulin => 4,
            FeatureColumn::Bmi => 5,
            FeatureColumn::DiabetesPedigreeFunction => 6,
            FeatureColumn::Age => 7,
        }
    }

    /// JSON key of this column (exact spelling, case-sensitive).
    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Pregnancies => "Pregnancies",
            FeatureColumn::Glucose => "Glucose",
            FeatureColumn::BloodPressure => "BloodPressure",
            FeatureColumn::SkinThickness => "SkinThickness",
            FeatureColumn::Insulin => "Insulin",
            FeatureColumn::Bmi => "BMI",
            FeatureColumn::DiabetesPedigreeFunction => "DiabetesPedigreeFunction",
            FeatureColumn::Age => "Age",
        }
    }

    /// Look up a column by its JSON key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.name() == name)
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw patient measurements in canonical column order.
///
/// No range checks are applied. Zero values for `SkinThickness` and
/// `Insulin` are not imputed here even though the training data had its
/// zeros replaced by column means, so such inputs do not see the same
/// distribution the model was fitted on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FeatureColumn::COUNT],
}

impl FeatureRecord {
    /// Build a record from values already laid out in canonical order.
    pub fn from_values(values: [f64; FeatureColumn::COUNT]) -> Self {
        Self { values }
    }

    /// Parse a JSON object into a record.
    ///
    /// Only the eight canonical keys are read; anything else in the object
    /// is ignored.
    pub fn from_json_map(map: &Map<String, Value>) -> Result<Self, InputError> {
        let mut values = [0.0; FeatureColumn::COUNT];
        for column in FeatureColumn::ALL {
            let raw = map
                .get(column.name())
                .ok_or(InputError::MissingFeature(column))?;
            values[column.index()] = coerce_f64(column, raw)?;
        }
        Ok(Self { values })
    }

    /// Parse a JSON document into a record. The document must be an object.
    pub fn from_json(value: &Value) -> Result<Self, InputError> {
        match value {
            Value::Object(map) => Self::from_json_map(map),
            other => Err(InputError::NotAnObject(json_kind(other))),
        }
    }

    pub fn get(&self, column: FeatureColumn) -> f64 {
        self.values[column.index()]
    }

    pub fn set(&mut self, column: FeatureColumn, value: f64) {
        self.values[column.index()] = value;
    }

    /// Values in canonical column order.
    pub fn values(&self) -> &[f64; FeatureColumn::COUNT] {
        &self.values
    }
}

/// Coerce a JSON value the way a permissive float conversion would:
/// numbers as-is, numeric strings parsed, booleans as 1/0.
fn coerce_f64(column: FeatureColumn, raw: &Value) -> Result<f64, InputError> {
    match raw {
        Value::Number(n) => n.as_f64().ok_or_else(|| InputError::NotNumeric {
            column,
            value: n.to_string(),
        }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| InputError::NotNumeric {
            column,
            value: s.clone(),
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(InputError::UnsupportedType {
            column,
            kind: json_kind(other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
