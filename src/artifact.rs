//! Pre-fitted model artifacts.
//!
//! The prediction pipeline only sees the [`Classifier`], [`AnomalyDetector`]
//! and [`TrendModel`] traits. The concrete types here are the JSON-backed
//! artifacts written by `fit-artifacts`:
//!
//! ```text
//!  models/*.json
//!        │  serde_json
//!        ▼
//!  LogisticClassifier   softmax over standardized features
//!  ZScoreEnvelope       -1 when any |z| exceeds the threshold, else 1
//!  LinearTrend          intercept + coefficients · x
//! ```

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, Axis};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::assembler::FeatureVector;
use crate::error::ArtifactError;

/// Sentinel returned by anomaly detectors for an outlier.
pub const OUTLIER: i32 = -1;
/// Sentinel returned by anomaly detectors for a normal row.
pub const INLIER: i32 = 1;

pub trait Classifier: Send + Sync {
    /// Class index for the row.
    fn predict(&self, features: &FeatureVector) -> Result<usize, ArtifactError>;

    /// Probability per class index.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ArtifactError>;
}

pub trait AnomalyDetector: Send + Sync {
    /// [`OUTLIER`] or [`INLIER`].
    fn predict(&self, features: &FeatureVector) -> Result<i32, ArtifactError>;
}

pub trait TrendModel: Send + Sync {
    fn predict(&self, inputs: &[f64]) -> Result<f64, ArtifactError>;
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let text = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ArtifactError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn save_json<T: Serialize>(path: &Path, artifact: &T) -> Result<(), ArtifactError> {
    let io_err = |source| ArtifactError::Io {
        path: path.display().to_string(),
        source,
    };
    let text = serde_json::to_string_pretty(artifact).map_err(|source| ArtifactError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    fs::write(path, text).map_err(io_err)
}

/// Checks the input columns against the names the artifact was fitted on
/// and returns the row.
fn checked_row(features: &[String], input: &FeatureVector) -> Result<Array1<f64>, ArtifactError> {
    if features.len() != input.len() {
        return Err(ArtifactError::Shape {
            expected: features.len(),
            actual: input.len(),
        });
    }
    for (expected, actual) in features.iter().zip(input.columns()) {
        if expected != actual {
            return Err(ArtifactError::FeatureMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }
    }
    let matrix = input
        .to_array()
        .map_err(|e| ArtifactError::Malformed(e.to_string()))?;
    Ok(matrix.row(0).to_owned())
}

/// Per-feature standardization stored with an artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl Scaler {
    /// Population statistics per column. Constant columns get unit scale.
    pub fn fit(records: &Array2<f64>) -> Scaler {
        let n = records.ncols();
        let means = records
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(n));
        let scales = records.std_axis(Axis(0), 0.0);
        Scaler {
            means: means.to_vec(),
            scales: scales
                .iter()
                .map(|&s| if s > f64::EPSILON { s } else { 1.0 })
                .collect(),
        }
    }

    pub fn transform(&self, row: &Array1<f64>) -> Array1<f64> {
        let means = Array1::from(self.means.clone());
        let scales = Array1::from(self.scales.clone());
        (row - &means) / &scales
    }

    pub fn transform_matrix(&self, records: &Array2<f64>) -> Array2<f64> {
        let means = Array1::from(self.means.clone());
        let scales = Array1::from(self.scales.clone());
        (records - &means) / &scales
    }
}

/// Multinomial logistic regression over standardized features.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticClassifier {
    pub features: Vec<String>,
    pub scaler: Scaler,
    /// One row per class index, one column per feature.
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LogisticClassifier {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let model: Self = load_json(path)?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        let n = self.features.len();
        if self.coefficients.is_empty() || self.coefficients.len() != self.intercepts.len() {
            return Err(ArtifactError::Malformed(format!(
                "{} coefficient rows for {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        if self.coefficients.iter().any(|row| row.len() != n)
            || self.scaler.means.len() != n
            || self.scaler.scales.len() != n
        {
            return Err(ArtifactError::Malformed(format!(
                "coefficients or scaler do not cover {n} features"
            )));
        }
        Ok(())
    }

    fn weights(&self) -> Result<Array2<f64>, ArtifactError> {
        let classes = self.coefficients.len();
        let flat: Vec<f64> = self.coefficients.iter().flatten().copied().collect();
        Array2::from_shape_vec((classes, self.features.len()), flat)
            .map_err(|e| ArtifactError::Malformed(e.to_string()))
    }

    fn probabilities(&self, row: &Array1<f64>) -> Result<Vec<f64>, ArtifactError> {
        let z = self.weights()?.dot(&self.scaler.transform(row)) + &Array1::from(self.intercepts.clone());
        let max = z.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let exp = z.mapv(|v| (v - max).exp());
        let total = exp.sum();
        Ok(exp.iter().map(|v| v / total).collect())
    }
}

impl Classifier for LogisticClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<usize, ArtifactError> {
        let probs = self.predict_proba(features)?;
        probs
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, _)| i)
            .ok_or_else(|| ArtifactError::Malformed("no classes".into()))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Vec<f64>, ArtifactError> {
        let row = checked_row(&self.features, features)?;
        self.probabilities(&row)
    }
}

/// Flags a row as an outlier when any standardized feature lies beyond
/// `threshold` standard deviations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZScoreEnvelope {
    pub features: Vec<String>,
    pub scaler: Scaler,
    pub threshold: f64,
}

impl ZScoreEnvelope {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let model: Self = load_json(path)?;
        let n = model.features.len();
        if model.scaler.means.len() != n || model.scaler.scales.len() != n {
            return Err(ArtifactError::Malformed(format!("scaler does not cover {n} features")));
        }
        Ok(model)
    }
}

impl AnomalyDetector for ZScoreEnvelope {
    fn predict(&self, features: &FeatureVector) -> Result<i32, ArtifactError> {
        let row = checked_row(&self.features, features)?;
        let z = self.scaler.transform(&row);
        if z.iter().any(|v| v.abs() > self.threshold) {
            Ok(OUTLIER)
        } else {
            Ok(INLIER)
        }
    }
}

/// Linear regression of next-term grade on the given inputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearTrend {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearTrend {
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        load_json(path)
    }
}

impl TrendModel for LinearTrend {
    fn predict(&self, inputs: &[f64]) -> Result<f64, ArtifactError> {
        if inputs.len() != self.coefficients.len() {
            return Err(ArtifactError::Shape {
                expected: self.coefficients.len(),
                actual: inputs.len(),
            });
        }
        let dot: f64 = self.coefficients.iter().zip(inputs).map(|(c, x)| c * x).sum();
        Ok(self.intercept + dot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{assemble, Overrides};
    use crate::data::{ReferenceDataset, Value};

    const SAMPLE: &str = "\
Age,Grade1,Target_Dropout,Target_Enrolled,Target_Graduate
20,10.0,1,0,0
22,14.0,0,0,1
";

    fn vector(age: i64) -> FeatureVector {
        let ds = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assemble(&ds, &Overrides::new().set("Age", Value::Integer(age))).unwrap()
    }

    fn classifier() -> LogisticClassifier {
        LogisticClassifier {
            features: vec!["Age".into(), "Grade1".into()],
            scaler: Scaler {
                means: vec![21.0, 12.0],
                scales: vec![1.0, 2.0],
            },
            coefficients: vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![-1.0, 0.0]],
            intercepts: vec![0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_logistic_probabilities_sum_to_one() {
        let probs = classifier().predict_proba(&vector(25)).unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
    }

    #[test]
    fn test_logistic_predicts_argmax() {
        let model = classifier();
        assert_eq!(model.predict(&vector(25)).unwrap(), 0);
        assert_eq!(model.predict(&vector(17)).unwrap(), 2);
    }

    #[test]
    fn test_feature_mismatch_is_reported() {
        let mut model = classifier();
        model.features = vec!["Grade1".into(), "Age".into()];
        assert!(matches!(
            model.predict(&vector(20)),
            Err(ArtifactError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn test_envelope_flags_outlier() {
        let detector = ZScoreEnvelope {
            features: vec!["Age".into(), "Grade1".into()],
            scaler: Scaler {
                means: vec![21.0, 12.0],
                scales: vec![1.0, 2.0],
            },
            threshold: 3.0,
        };
        assert_eq!(detector.predict(&vector(22)).unwrap(), INLIER);
        assert_eq!(detector.predict(&vector(40)).unwrap(), OUTLIER);
    }

    #[test]
    fn test_trend_checks_arity() {
        let trend = LinearTrend {
            coefficients: vec![0.9],
            intercept: 0.6,
        };
        assert!((trend.predict(&[12.0]).unwrap() - 11.4).abs() < 1e-9);
        assert!(matches!(trend.predict(&[1.0, 2.0]), Err(ArtifactError::Shape { .. })));
    }

    #[test]
    fn test_scaler_handles_constant_column() {
        let records = Array2::from_shape_vec((2, 2), vec![1.0, 5.0, 3.0, 5.0]).unwrap();
        let scaler = Scaler::fit(&records);
        assert_eq!(scaler.means, vec![2.0, 5.0]);
        assert_eq!(scaler.scales, vec![1.0, 1.0]);
    }
}
