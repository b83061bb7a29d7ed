//! Fits the three artifacts from the reference dataset.

use std::path::Path;

use linfa::prelude::*;
use linfa_logistic::MultiLogisticRegression;
use log::info;
use ndarray::{Array1, Array2};
use thiserror::Error;

use crate::artifact::{save_json, LinearTrend, LogisticClassifier, Scaler, ZScoreEnvelope};
use crate::config::{AppConfig, TrainingConfig};
use crate::data::ReferenceDataset;
use crate::error::ArtifactError;
use crate::model::{Outcome, SEM1_GRADE, SEM2_GRADE};

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("column '{0}' is not numeric")]
    NonNumeric(String),

    #[error("dataset has no column '{0}'")]
    MissingColumn(&'static str),

    #[error("training data has no '{0}' rows")]
    MissingClass(Outcome),

    #[error("need at least two rows to fit, found {0}")]
    TooFewRows(usize),

    #[error("logistic regression: {0}")]
    Logistic(#[from] linfa_logistic::error::Error),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

pub struct FittedArtifacts {
    pub classifier: LogisticClassifier,
    pub anomaly: ZScoreEnvelope,
    pub trend: LinearTrend,
    pub accuracy: f64,
}

/// Working columns as a dense matrix; missing cells take the column median.
pub fn feature_matrix(dataset: &ReferenceDataset) -> Result<(Vec<String>, Array2<f64>), TrainingError> {
    let columns: Vec<_> = dataset.working_columns().collect();
    let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
    let rows = dataset.len();

    let mut flat = vec![0.0; rows * columns.len()];
    for (j, column) in columns.iter().enumerate() {
        if !column.kind.is_numeric() {
            return Err(TrainingError::NonNumeric(column.name.clone()));
        }
        let fill = column.median().unwrap_or(0.0);
        for (i, value) in column.values.iter().enumerate() {
            flat[i * columns.len() + j] = value.as_f64().unwrap_or(fill);
        }
    }
    let matrix = Array2::from_shape_vec((rows, names.len()), flat)
        .map_err(|e| ArtifactError::Malformed(e.to_string()))?;
    Ok((names, matrix))
}

pub fn calculate_accuracy(predictions: &Array1<usize>, targets: &Array1<usize>) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(targets.iter())
        .filter(|(pred, actual)| pred == actual)
        .count() as f64
        / targets.len() as f64
}

pub fn fit_classifier(
    names: &[String],
    records: &Array2<f64>,
    targets: &Array1<usize>,
    max_iterations: u64,
) -> Result<(LogisticClassifier, f64), TrainingError> {
    let scaler = Scaler::fit(records);
    let scaled = scaler.transform_matrix(records);

    let dataset = Dataset::new(scaled.clone(), targets.clone());
    let model = MultiLogisticRegression::default()
        .max_iterations(max_iterations)
        .fit(&dataset)?;

    let accuracy = calculate_accuracy(&model.predict(&scaled), targets);

    let params = model.params();
    let intercept = model.intercept();
    let classes = model.classes();

    let mut coefficients = Vec::with_capacity(Outcome::ALL.len());
    let mut intercepts = Vec::with_capacity(Outcome::ALL.len());
    for outcome in Outcome::ALL {
        let p = classes
            .iter()
            .position(|&c| c == outcome.index())
            .ok_or(TrainingError::MissingClass(outcome))?;
        coefficients.push(params.column(p).to_vec());
        intercepts.push(intercept[p]);
    }

    Ok((
        LogisticClassifier {
            features: names.to_vec(),
            scaler,
            coefficients,
            intercepts,
        },
        accuracy,
    ))
}

/// Ordinary least squares of second-semester grade on first-semester grade.
pub fn fit_trend(dataset: &ReferenceDataset) -> Result<LinearTrend, TrainingError> {
    let sem1 = dataset
        .column(SEM1_GRADE)
        .ok_or(TrainingError::MissingColumn(SEM1_GRADE))?;
    let sem2 = dataset
        .column(SEM2_GRADE)
        .ok_or(TrainingError::MissingColumn(SEM2_GRADE))?;

    let pairs: Vec<(f64, f64)> = sem1
        .values
        .iter()
        .zip(&sem2.values)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .collect();
    if pairs.len() < 2 {
        return Err(TrainingError::TooFewRows(pairs.len()));
    }

    let x = Array1::from_iter(pairs.iter().map(|p| p.0));
    let y = Array1::from_iter(pairs.iter().map(|p| p.1));
    let (mx, my) = (x.mean().unwrap_or(0.0), y.mean().unwrap_or(0.0));
    let dx = &x - mx;
    let variance = dx.dot(&dx);
    let slope = if variance > f64::EPSILON {
        dx.dot(&(&y - my)) / variance
    } else {
        0.0
    };

    Ok(LinearTrend {
        coefficients: vec![slope],
        intercept: my - slope * mx,
    })
}

pub fn fit_all(dataset: &ReferenceDataset, config: &TrainingConfig) -> Result<FittedArtifacts, TrainingError> {
    if dataset.len() < 2 {
        return Err(TrainingError::TooFewRows(dataset.len()));
    }
    let (names, records) = feature_matrix(dataset)?;
    let targets = Array1::from_iter(dataset.outcomes().iter().map(|o| o.index()));

    info!(
        "Fitting classifier on {} rows x {} features",
        records.nrows(),
        records.ncols()
    );
    let (classifier, accuracy) = fit_classifier(&names, &records, &targets, config.max_iterations)?;

    let anomaly = ZScoreEnvelope {
        features: names,
        scaler: Scaler::fit(&records),
        threshold: config.anomaly_threshold,
    };
    let trend = fit_trend(dataset)?;

    Ok(FittedArtifacts {
        classifier,
        anomaly,
        trend,
        accuracy,
    })
}

/// Writes the classifier under the first configured candidate file.
pub fn save_all(artifacts: &FittedArtifacts, config: &AppConfig) -> Result<(), TrainingError> {
    let dir = Path::new(&config.models.dir);
    std::fs::create_dir_all(dir).map_err(|source| ArtifactError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    let classifier_file = config
        .models
        .classifiers
        .first()
        .map(|c| c.file.as_str())
        .unwrap_or("tuned_logistic_regression_model.json");

    save_json(&dir.join(classifier_file), &artifacts.classifier)?;
    save_json(&dir.join(&config.models.anomaly_file), &artifacts.anomaly)?;
    save_json(&dir.join(&config.models.trend_file), &artifacts.trend)?;
    info!("Artifacts written to {}", dir.display());
    Ok(())
}
