//! Preprocessing of feature records into model input vectors.
//!
//! Reproduces the offline training pipeline step for step:
//! `ln(x + 1)` on the skewed columns, then the fitted min-max scaler on
//! the scaled subset, with every stage addressing columns through
//! [`FeatureColumn`] so their order cannot drift apart.

use crate::error::PreprocessingError;
use crate::models::scaler::MinMaxScaler;
use crate::types::record::{FeatureColumn, FeatureRecord};

/// Feature extractor that transforms records into model input features.
pub struct FeatureExtractor {
    scaler: MinMaxScaler,
}

impl FeatureExtractor {
    /// Create a new feature extractor around a fitted scaler.
    pub fn new(scaler: MinMaxScaler) -> Self {
        Self { scaler }
    }

    /// Transform a record into the model input vector.
    ///
    /// Skewed values below -1 turn into NaN here; rejecting them is left to
    /// the classifier.
    pub fn extract(&self, record: &FeatureRecord) -> Result<Vec<f64>, PreprocessingError> {
        let mut row = *record;

        for column in FeatureColumn::SKEWED {
            row.set(column, (row.get(column) + 1.0).ln());
        }

        let mut scaled: Vec<f64> = FeatureColumn::SCALED
            .iter()
            .map(|&column| row.get(column))
            .collect();
        self.scaler.transform(&mut scaled)?;
        for (&column, value) in FeatureColumn::SCALED.iter().zip(scaled) {
            row.set(column, value);
        }

        Ok(row.values().to_vec())
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FeatureColumn::COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scaler::ScalerArtifact;

    fn extractor() -> FeatureExtractor {
        // Insulin, SkinThickness, DiabetesPedigreeFunction
        let scaler = MinMaxScaler::from_artifact(&ScalerArtifact {
            feature_names: None,
            data_min: vec![0.0, 0.0, 0.078],
            data_max: vec![6.75, 4.6, 2.42],
            feature_range: [0.0, 1.0],
        })
        .unwrap();
        FeatureExtractor::new(scaler)
    }

    fn example() -> FeatureRecord {
        FeatureRecord::from_values([2.0, 120.0, 70.0, 30.0, 80.0, 25.5, 0.5, 33.0])
    }

    #[test]
    fn test_unscaled_columns_pass_through() {
        let features = extractor().extract(&example()).unwrap();

        assert_eq!(features.len(), 8);
        assert_eq!(features[0], 2.0);
        assert_eq!(features[1], 120.0);
        assert_eq!(features[2], 70.0);
        assert_eq!(features[5], 25.5);
        assert_eq!(features[7], 33.0);
    }

    #[test]
    fn test_skewed_columns_are_logged_then_scaled() {
        let features = extractor().extract(&example()).unwrap();

        let skin = 31.0_f64.ln() / 4.6;
        let insulin = 81.0_f64.ln() / 6.75;
        let pedigree = (0.5 - 0.078) / (2.42 - 0.078);
        assert!((features[3] - skin).abs() < 1e-12);
        assert!((features[4] - insulin).abs() < 1e-12);
        assert!((features[6] - pedigree).abs() < 1e-12);
    }

    #[test]
    fn test_zero_skewed_values_are_not_imputed() {
        let record = FeatureRecord::from_values([0.0, 100.0, 60.0, 0.0, 0.0, 20.0, 0.078, 21.0]);
        let features = extractor().extract(&record).unwrap();

        assert_eq!(features[3], 0.0);
        assert_eq!(features[4], 0.0);
        assert!(features[6].abs() < 1e-12);
    }

    #[test]
    fn test_values_below_minus_one_become_nan() {
        let mut record = example();
        record.set(FeatureColumn::Insulin, -5.0);

        let features = extractor().extract(&record).unwrap();
        assert!(features[4].is_nan());
    }
}
