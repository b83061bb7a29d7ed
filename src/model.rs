use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SchemaError;

pub const AGE_AT_ENROLLMENT: &str = "Age at enrollment";
pub const ADMISSION_GRADE: &str = "Admission grade";
pub const GENDER: &str = "Gender";
pub const SCHOLARSHIP_HOLDER: &str = "Scholarship holder";
pub const TUITION_UP_TO_DATE: &str = "Tuition fees up to date";
pub const SEM1_GRADE: &str = "Curricular units 1st sem (grade)";
pub const SEM2_GRADE: &str = "Curricular units 2nd sem (grade)";
pub const UNEMPLOYMENT_RATE: &str = "Unemployment rate";
pub const INFLATION_RATE: &str = "Inflation rate";
pub const GDP: &str = "GDP";

/// Academic outcome. The discriminant is the class index the classifiers
/// were trained with.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Outcome {
    Dropout = 0,
    Enrolled = 1,
    Graduate = 2,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Dropout, Outcome::Enrolled, Outcome::Graduate];

    pub fn from_index(index: usize) -> Option<Outcome> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Dropout => "Dropout",
            Outcome::Enrolled => "Enrolled",
            Outcome::Graduate => "Graduate",
        }
    }

    pub fn headline(self) -> &'static str {
        match self {
            Outcome::Dropout => "RISK ALERT",
            Outcome::Enrolled => "ON TRACK",
            Outcome::Graduate => "SUCCESS LIKELY",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Counselor,
}

impl Role {
    /// Unrecognized roles map to `None` and get the default narrative.
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "counselor" => Some(Role::Counselor),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn encoded(self) -> i64 {
        match self {
            Gender::Male => 1,
            Gender::Female => 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Yes,
    No,
}

impl Answer {
    pub fn encoded(self) -> i64 {
        match self {
            Answer::Yes => 1,
            Answer::No => 0,
        }
    }

    pub fn is_yes(self) -> bool {
        matches!(self, Answer::Yes)
    }
}

/// Operator-supplied attributes for one prediction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StudentProfile {
    pub age: f64,
    pub admission_grade: f64,
    pub gender: Gender,
    pub scholarship: Answer,
    pub tuition_paid: Answer,
    pub sem1_grade: f64,
    pub sem2_grade: f64,
    pub unemployment: f64,
    pub inflation: f64,
    pub gdp: f64,
}

impl Default for StudentProfile {
    fn default() -> Self {
        Self {
            age: 22.0,
            admission_grade: 120.0,
            gender: Gender::Male,
            scholarship: Answer::Yes,
            tuition_paid: Answer::Yes,
            sem1_grade: 12.0,
            sem2_grade: 12.0,
            unemployment: 7.5,
            inflation: 3.0,
            gdp: 100_000.0,
        }
    }
}

impl StudentProfile {
    /// Bounds of the input form.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let checks: [(&'static str, f64, f64, f64); 7] = [
            ("age", self.age, 17.0, 60.0),
            ("admission_grade", self.admission_grade, 0.0, 200.0),
            ("sem1_grade", self.sem1_grade, 0.0, 20.0),
            ("sem2_grade", self.sem2_grade, 0.0, 20.0),
            ("unemployment", self.unemployment, 0.0, 20.0),
            ("inflation", self.inflation, 0.0, 10.0),
            ("gdp", self.gdp, 0.0, 200_000.0),
        ];
        for (field, value, min, max) in checks {
            if !(min..=max).contains(&value) {
                return Err(SchemaError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Outcome of one prediction request.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PredictionResult {
    pub outcome: Outcome,
    pub confidence: f64,
    pub anomaly: bool,
    pub forecast: f64,
}

/// A result together with what the viewer is shown.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Assessment {
    pub model: String,
    #[serde(flatten)]
    pub result: PredictionResult,
    pub headline: &'static str,
    pub narrative: String,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
