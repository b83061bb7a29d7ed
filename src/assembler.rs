//! Builds the single-row model input from operator overrides and
//! dataset-wide defaults.

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use crate::data::{Column, ColumnKind, ReferenceDataset, Value};
use crate::error::SchemaError;
use crate::model::{self, StudentProfile};

/// Named column overrides, applied in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Overrides(Vec<(String, Value)>);

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: Value) -> Self {
        self.0.push((column.into(), value));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(c, v)| (c.as_str(), v))
    }
}

impl From<&StudentProfile> for Overrides {
    fn from(p: &StudentProfile) -> Self {
        Overrides::new()
            .set(model::AGE_AT_ENROLLMENT, Value::Float(p.age))
            .set(model::ADMISSION_GRADE, Value::Float(p.admission_grade))
            .set(model::GENDER, Value::Integer(p.gender.encoded()))
            .set(model::SCHOLARSHIP_HOLDER, Value::Integer(p.scholarship.encoded()))
            .set(model::TUITION_UP_TO_DATE, Value::Integer(p.tuition_paid.encoded()))
            .set(model::SEM1_GRADE, Value::Float(p.sem1_grade))
            .set(model::SEM2_GRADE, Value::Float(p.sem2_grade))
            .set(model::UNEMPLOYMENT_RATE, Value::Float(p.unemployment))
            .set(model::INFLATION_RATE, Value::Float(p.inflation))
            .set(model::GDP, Value::Float(p.gdp))
    }
}

/// One row in the dataset's working-column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl FeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// The row as a `1 x n` matrix for artifact consumption.
    pub fn to_array(&self) -> Result<Array2<f64>, SchemaError> {
        let row = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, value)| value.as_f64().ok_or_else(|| SchemaError::NonNumeric(name.clone())))
            .collect::<Result<Vec<f64>, _>>()?;
        Ok(Array1::from(row).insert_axis(Axis(0)))
    }
}

/// Default cell for a column: median when numeric, otherwise mode, then the
/// first row, then zero.
pub fn column_default(column: &Column) -> Value {
    if column.kind.is_numeric() {
        if let Some(median) = column.median() {
            return Value::Float(median);
        }
    }
    column
        .mode()
        .or_else(|| {
            column
                .values
                .first()
                .filter(|v| !matches!(v, Value::Missing))
                .cloned()
        })
        .unwrap_or(Value::Integer(0))
}

pub fn assemble(dataset: &ReferenceDataset, overrides: &Overrides) -> Result<FeatureVector, SchemaError> {
    let working: Vec<&Column> = dataset.working_columns().collect();
    let mut values: Vec<Value> = working.iter().map(|c| column_default(c)).collect();

    for (name, value) in overrides.iter() {
        let index = working
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))?;
        values[index] = value.clone();
    }

    let values = working
        .iter()
        .zip(values)
        .map(|(column, value)| coerce(column, value))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureVector {
        columns: working.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}

/// Slider input arrives as float; integer reference columns round half to
/// even and store an integer.
fn coerce(column: &Column, value: Value) -> Result<Value, SchemaError> {
    match column.kind {
        ColumnKind::Integer => match value.as_f64() {
            Some(v) if v.is_finite() => Ok(Value::Integer(v.round_ties_even() as i64)),
            _ => Err(SchemaError::Coercion {
                column: column.name.clone(),
                value: value.to_string(),
            }),
        },
        ColumnKind::Float => match value {
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            other => Ok(other),
        },
        ColumnKind::Boolean | ColumnKind::Text => Ok(value),
    }
}
