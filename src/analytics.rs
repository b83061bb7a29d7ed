use ndarray::Array1;
use serde::Serialize;
use std::cmp::Ordering;

use crate::data::{Column, ColumnKind, ReferenceDataset};
use crate::model::{Outcome, ADMISSION_GRADE, AGE_AT_ENROLLMENT, SEM1_GRADE, SEM2_GRADE};

const HIGH_RISK_SAMPLE: usize = 5;
const CORRELATION_COLUMNS: usize = 5;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CohortSummary {
    pub total_records: usize,
    pub distribution: Vec<OutcomeShare>,
    pub success_rate: f64,
    pub risk_factor: f64,
    pub admission_by_outcome: Vec<OutcomeSpread>,
    pub semester_means: Option<SemesterMeans>,
    pub high_risk_count: usize,
    pub high_risk_sample: Vec<RiskEntry>,
    pub correlation: CorrelationMatrix,
}

/// Square matrix; `None` where the coefficient is undefined.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OutcomeShare {
    pub outcome: Outcome,
    pub count: usize,
    pub percent: f64,
}

/// Five-number summary of admission grades for one outcome.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct OutcomeSpread {
    pub outcome: Outcome,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SemesterMeans {
    pub first: f64,
    pub second: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RiskEntry {
    pub row: usize,
    pub age: Option<f64>,
    pub admission_grade: Option<f64>,
    pub sem1_grade: Option<f64>,
}

pub struct CohortAnalyzer<'a> {
    dataset: &'a ReferenceDataset,
}

impl<'a> CohortAnalyzer<'a> {
    pub fn new(dataset: &'a ReferenceDataset) -> Self {
        CohortAnalyzer { dataset }
    }

    pub fn summarize(&self) -> CohortSummary {
        let total_records = self.dataset.len();
        let distribution: Vec<OutcomeShare> = Outcome::ALL
            .iter()
            .map(|&outcome| {
                let count = self.dataset.outcomes().iter().filter(|&&o| o == outcome).count();
                OutcomeShare {
                    outcome,
                    count,
                    percent: percent(count, total_records),
                }
            })
            .collect();

        let share = |outcome: Outcome| {
            distribution
                .iter()
                .find(|s| s.outcome == outcome)
                .map_or(0.0, |s| s.percent)
        };
        let success_rate = share(Outcome::Graduate);
        let risk_factor = share(Outcome::Dropout);

        let dropout_rows: Vec<usize> = self
            .dataset
            .outcomes()
            .iter()
            .enumerate()
            .filter(|(_, &o)| o == Outcome::Dropout)
            .map(|(i, _)| i)
            .collect();

        CohortSummary {
            total_records,
            success_rate,
            risk_factor,
            admission_by_outcome: self.admission_spread(),
            semester_means: self.semester_means(),
            high_risk_count: dropout_rows.len(),
            high_risk_sample: dropout_rows
                .iter()
                .take(HIGH_RISK_SAMPLE)
                .map(|&row| RiskEntry {
                    row,
                    age: self.cell(AGE_AT_ENROLLMENT, row),
                    admission_grade: self.cell(ADMISSION_GRADE, row),
                    sem1_grade: self.cell(SEM1_GRADE, row),
                })
                .collect(),
            correlation: self.correlation(),
            distribution,
        }
    }

    fn correlation(&self) -> CorrelationMatrix {
        let columns: Vec<&Column> = self
            .dataset
            .columns()
            .iter()
            .filter(|c| matches!(c.kind, ColumnKind::Integer | ColumnKind::Float))
            .take(CORRELATION_COLUMNS)
            .collect();
        CorrelationMatrix {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            values: columns
                .iter()
                .map(|a| columns.iter().map(|b| pearson(a, b)).collect())
                .collect(),
        }
    }

    fn cell(&self, column: &str, row: usize) -> Option<f64> {
        self.dataset.column(column)?.values.get(row)?.as_f64()
    }

    fn admission_spread(&self) -> Vec<OutcomeSpread> {
        let Some(column) = self.dataset.column(ADMISSION_GRADE) else {
            return Vec::new();
        };
        Outcome::ALL
            .iter()
            .filter_map(|&outcome| {
                let mut grades: Vec<f64> = column
                    .values
                    .iter()
                    .zip(self.dataset.outcomes())
                    .filter(|(_, &o)| o == outcome)
                    .filter_map(|(v, _)| v.as_f64())
                    .collect();
                if grades.is_empty() {
                    return None;
                }
                grades.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                Some(OutcomeSpread {
                    outcome,
                    min: grades[0],
                    q1: quantile(&grades, 0.25),
                    median: quantile(&grades, 0.5),
                    q3: quantile(&grades, 0.75),
                    max: grades[grades.len() - 1],
                })
            })
            .collect()
    }

    fn semester_means(&self) -> Option<SemesterMeans> {
        let first = self.dataset.column(SEM1_GRADE)?.mean()?;
        let second = self.dataset.column(SEM2_GRADE)?.mean()?;
        Some(SemesterMeans { first, second })
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64 * 1000.0).round() / 10.0
    }
}

/// Pearson coefficient over rows where both cells are finite numbers.
fn pearson(a: &Column, b: &Column) -> Option<f64> {
    let (x, y): (Vec<f64>, Vec<f64>) = a
        .values
        .iter()
        .zip(&b.values)
        .filter_map(|(x, y)| Some((x.as_f64()?, y.as_f64()?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .unzip();
    if x.len() < 2 {
        return None;
    }
    let (x, y) = (Array1::from(x), Array1::from(y));
    let dx = &x - x.mean()?;
    let dy = &y - y.mean()?;
    let denom = (dx.dot(&dx) * dy.dot(&dy)).sqrt();
    if denom <= f64::EPSILON {
        None
    } else {
        Some((dx.dot(&dy) / denom).clamp(-1.0, 1.0))
    }
}

/// Linear interpolation between closest ranks over sorted, non-empty input.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}
