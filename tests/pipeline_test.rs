use std::path::Path;
use std::sync::Arc;

use edu_predict::artifact::{AnomalyDetector, Classifier, TrendModel};
use edu_predict::assembler::{assemble, FeatureVector, Overrides};
use edu_predict::config::TrainingConfig;
use edu_predict::data::{ReferenceDataset, Value};
use edu_predict::engine::PredictionEngine;
use edu_predict::error::{ArtifactError, EngineError};
use edu_predict::interpreter::interpret;
use edu_predict::model::{Outcome, Role, StudentProfile};
use edu_predict::registry::ModelRegistry;
use edu_predict::training::fit_all;

const COHORT: &str = "\
Marital status,Age at enrollment,Admission grade,Gender,Scholarship holder,Tuition fees up to date,Curricular units 1st sem (grade),Curricular units 2nd sem (grade),Unemployment rate,Inflation rate,GDP,Target_Dropout,Target_Enrolled,Target_Graduate
1,19,140.0,0,1,1,14.0,14.5,10.8,1.4,1.74,0,0,1
1,20,120.0,1,0,1,12.0,12.0,13.9,-0.3,0.79,0,1,0
2,21,110.0,1,0,0,10.0,9.0,9.4,-0.8,-3.12,1,0,0
1,24,125.0,0,0,1,11.0,11.5,16.2,0.3,-0.92,0,1,0
1,30,100.0,1,0,0,0.0,0.0,15.5,2.8,-4.06,1,0,0
";

/// Always answers Dropout at 82%.
struct RiskyClassifier;

impl Classifier for RiskyClassifier {
    fn predict(&self, _: &FeatureVector) -> Result<usize, ArtifactError> {
        Ok(0)
    }

    fn predict_proba(&self, _: &FeatureVector) -> Result<Vec<f64>, ArtifactError> {
        Ok(vec![0.82, 0.1, 0.08])
    }
}

struct AlwaysOutlier;

impl AnomalyDetector for AlwaysOutlier {
    fn predict(&self, _: &FeatureVector) -> Result<i32, ArtifactError> {
        Ok(-1)
    }
}

struct KnownTrend;

impl TrendModel for KnownTrend {
    fn predict(&self, inputs: &[f64]) -> Result<f64, ArtifactError> {
        assert_eq!(inputs, &[12.0]);
        Ok(11.4)
    }
}

fn cohort() -> ReferenceDataset {
    ReferenceDataset::from_reader(COHORT.as_bytes()).unwrap()
}

#[test]
fn test_exactly_one_outcome_per_row() {
    let ds = cohort();
    assert_eq!(
        ds.outcomes(),
        &[
            Outcome::Graduate,
            Outcome::Enrolled,
            Outcome::Dropout,
            Outcome::Enrolled,
            Outcome::Dropout
        ]
    );
}

#[test]
fn test_end_to_end_scenario() {
    let ds = cohort();
    assert_eq!(ds.column("Age at enrollment").unwrap().median(), Some(21.0));

    let overrides = Overrides::new().set("Age at enrollment", Value::Integer(22));
    let features = assemble(&ds, &overrides).unwrap();
    assert_eq!(features.get("Age at enrollment"), Some(&Value::Integer(22)));
    assert_eq!(features.get("Admission grade"), Some(&Value::Float(120.0)));
    assert_eq!(features.get("Marital status"), Some(&Value::Integer(1)));
    assert_eq!(features.get("Inflation rate"), Some(&Value::Float(0.3)));

    let result = interpret(&features, &RiskyClassifier, &AlwaysOutlier, &KnownTrend, 12.0).unwrap();
    assert_eq!(result.outcome, Outcome::Dropout);
    assert_eq!(result.confidence, 82.0);
    assert!(result.anomaly);
    assert_eq!(result.forecast, 11.4);
}

#[test]
fn test_engine_uses_profile_and_role() {
    let registry = ModelRegistry::builder()
        .classifier("Tuned Random Forest", RiskyClassifier)
        .anomaly(AlwaysOutlier)
        .trend(KnownTrend)
        .build();
    let engine = PredictionEngine::new(Arc::new(cohort()), Arc::new(registry)).unwrap();

    let assessment = engine
        .predict(&StudentProfile::default(), None, Role::parse("teacher"))
        .unwrap();
    assert_eq!(assessment.model, "Tuned Random Forest");
    assert_eq!(assessment.headline, "RISK ALERT");
    assert!(assessment.narrative.contains("Sem 2 Pred: 11.4"));
}

#[test]
fn test_engine_refuses_without_anomaly_model() {
    let registry = ModelRegistry::builder()
        .classifier("Tuned Random Forest", RiskyClassifier)
        .trend(KnownTrend)
        .build();
    assert!(!registry.is_ready());
    let err = PredictionEngine::new(Arc::new(cohort()), Arc::new(registry)).err().unwrap();
    assert!(matches!(err, EngineError::NotReady(_)));
}

#[test]
fn test_fitted_artifacts_drive_a_prediction() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/academic_cleaned.csv");
    let ds = ReferenceDataset::load(&path).unwrap();
    let artifacts = fit_all(&ds, &TrainingConfig::default()).unwrap();
    assert!((0.0..=1.0).contains(&artifacts.accuracy));

    let registry = ModelRegistry::builder()
        .classifier("Tuned Logistic Regression", artifacts.classifier)
        .anomaly(artifacts.anomaly)
        .trend(artifacts.trend)
        .build();
    let engine = PredictionEngine::new(Arc::new(ds), Arc::new(registry)).unwrap();

    let assessment = engine
        .predict(&StudentProfile::default(), Some("Tuned Logistic Regression"), Some(Role::Student))
        .unwrap();
    assert!((0.0..=100.0).contains(&assessment.result.confidence));
    assert!(Outcome::ALL.contains(&assessment.result.outcome));
    assert!(assessment.result.forecast.is_finite());
}
