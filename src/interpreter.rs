//! Turns raw artifact outputs into a [`PredictionResult`] and the narrative
//! shown to each role.

use crate::artifact::{AnomalyDetector, Classifier, TrendModel, INLIER, OUTLIER};
use crate::assembler::FeatureVector;
use crate::error::PredictionError;
use crate::model::{round2, Outcome, PredictionResult, Role};

pub fn interpret(
    features: &FeatureVector,
    classifier: &dyn Classifier,
    anomaly: &dyn AnomalyDetector,
    trend: &dyn TrendModel,
    sem1_grade: f64,
) -> Result<PredictionResult, PredictionError> {
    let index = classifier.predict(features)?;
    let probs = classifier.predict_proba(features)?;

    let outcome = Outcome::from_index(index)
        .ok_or_else(|| PredictionError::Contract(format!("class index {index} outside 0..=2")))?;
    if probs.len() != Outcome::ALL.len() {
        return Err(PredictionError::Contract(format!(
            "expected 3 class probabilities, got {}",
            probs.len()
        )));
    }
    let p = probs[index];
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(PredictionError::Contract(format!("probability {p} outside [0, 1]")));
    }
    let confidence = round2(p * 100.0);

    let forecast = trend.predict(&[sem1_grade])?;

    let anomaly = match anomaly.predict(features)? {
        OUTLIER => true,
        INLIER => false,
        other => {
            return Err(PredictionError::Contract(format!(
                "anomaly output {other} is neither -1 nor 1"
            )))
        }
    };

    Ok(PredictionResult {
        outcome,
        confidence,
        anomaly,
        forecast,
    })
}

pub fn narrative(outcome: Outcome, role: Option<Role>, forecast: f64) -> String {
    let next = round2(forecast);
    match (outcome, role) {
        (Outcome::Dropout, Some(Role::Student)) => "Your profile indicates significant academic challenges. Immediate consultation with a counselor is vital to prevent drop-out.".to_string(),
        (Outcome::Dropout, Some(Role::Teacher)) => format!("This student requires high-priority academic support. Key risk factors: Low Grades (Sem 2 Pred: {next}) and potential financial/economic stress."),
        (Outcome::Dropout, Some(Role::Counselor)) => "Trigger Tier 1 intervention protocol. Focus on root causes (financial aid, mental health, or academic skill deficits).".to_string(),
        (Outcome::Dropout, None) => "High risk of attrition detected.".to_string(),

        (Outcome::Graduate, Some(Role::Student)) => "Your path to graduation is strong! Keep maintaining excellent academic and financial standing. Explore career services next.".to_string(),
        (Outcome::Graduate, Some(Role::Teacher)) => format!("Strong performer. Maintain standard engagement. Next Sem Grade: {next}. Consider for advanced placement or mentoring roles."),
        (Outcome::Graduate, Some(Role::Counselor)) => "Student is on track. Mark for Tier 3 (Success) monitoring. Ensure transition to alumni/career services is smooth.".to_string(),
        (Outcome::Graduate, None) => "Student predicted to successfully graduate.".to_string(),

        (Outcome::Enrolled, Some(Role::Student)) => "You are currently maintaining a stable academic path. Focus on continuous improvement and utilize campus resources.".to_string(),
        (Outcome::Enrolled, Some(Role::Teacher)) => format!("Stable performance. Next Sem Grade: {next}. Requires standard monitoring. Low risk of immediate failure."),
        (Outcome::Enrolled, Some(Role::Counselor)) => "Student is stable (Tier 2). Recommend proactive check-ins to optimize performance and prevent minor deviations.".to_string(),
        (Outcome::Enrolled, None) => "Student predicted to continue enrollment.".to_string(),
    }
}
