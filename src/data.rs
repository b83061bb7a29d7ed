//! Reference dataset: the historical student table used to derive request
//! defaults and the column order models were trained on.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

use csv::Reader;
use serde::Serialize;

use crate::error::DatasetError;
use crate::model::Outcome;

pub const TARGET_GRADUATE: &str = "Target_Graduate";
pub const TARGET_ENROLLED: &str = "Target_Enrolled";
pub const TARGET_DROPOUT: &str = "Target_Dropout";

/// Name of the derived label column some exports carry alongside the indicators.
pub const DERIVED_LABEL: &str = "Grade";

/// Cell texts a dataframe reader treats as missing.
const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single cell, typed the way a dataframe would infer it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Missing,
}

impl Value {
    fn parse(raw: &str) -> Value {
        let raw = raw.trim();
        if raw.is_empty() || NA_TOKENS.contains(&raw) {
            return Value::Missing;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return if f.is_nan() { Value::Missing } else { Value::Float(f) };
        }
        match raw {
            "True" | "true" => Value::Boolean(true),
            "False" | "false" => Value::Boolean(false),
            _ => Value::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(_) | Value::Missing => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Text(s) => f.write_str(s),
            Value::Missing => f.write_str("<missing>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        !matches!(self, ColumnKind::Text)
    }

    /// Integer columns holding a missing cell widen to float, and a column
    /// with no observed values at all is treated as text.
    fn infer(values: &[Value]) -> ColumnKind {
        let mut observed = values.iter().filter(|v| !matches!(v, Value::Missing)).peekable();
        if observed.peek().is_none() {
            return ColumnKind::Text;
        }
        let has_missing = values.iter().any(|v| matches!(v, Value::Missing));

        let (mut ints, mut floats, mut bools, mut texts) = (0, 0, 0, 0);
        for value in observed {
            match value {
                Value::Integer(_) => ints += 1,
                Value::Float(_) => floats += 1,
                Value::Boolean(_) => bools += 1,
                Value::Text(_) => texts += 1,
                Value::Missing => {}
            }
        }

        if texts > 0 || (bools > 0 && ints + floats > 0) {
            ColumnKind::Text
        } else if bools > 0 {
            if has_missing {
                ColumnKind::Text
            } else {
                ColumnKind::Boolean
            }
        } else if floats > 0 || has_missing {
            ColumnKind::Float
        } else {
            ColumnKind::Integer
        }
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Value>,
}

impl Column {
    fn finite_numbers(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(Value::as_f64)
            .filter(|v| v.is_finite())
            .collect()
    }

    /// Median over observed, finite numeric cells.
    pub fn median(&self) -> Option<f64> {
        let mut numbers = self.finite_numbers();
        if numbers.is_empty() {
            return None;
        }
        numbers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = numbers.len() / 2;
        if numbers.len() % 2 == 0 {
            Some((numbers[mid - 1] + numbers[mid]) / 2.0)
        } else {
            Some(numbers[mid])
        }
    }

    /// Most frequent observed text value; ties go to the smallest value.
    pub fn mode(&self) -> Option<Value> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in &self.values {
            if !matches!(value, Value::Missing) {
                *counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }
        let mut best: Option<(&String, usize)> = None;
        for (value, &count) in &counts {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((value, count));
            }
        }
        best.map(|(value, _)| Value::parse(value))
    }

    pub fn mean(&self) -> Option<f64> {
        let numbers = self.finite_numbers();
        if numbers.is_empty() {
            None
        } else {
            Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
        }
    }
}

/// Immutable historical table. Outcome indicators are folded into
/// [`Outcome`] once here and never consulted again.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    columns: Vec<Column>,
    working: Vec<usize>,
    outcomes: Vec<Outcome>,
}

impl ReferenceDataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let rdr = Reader::from_path(path)?;
        Self::from_csv(rdr)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        Self::from_csv(Reader::from_reader(reader))
    }

    fn from_csv<R: Read>(mut rdr: Reader<R>) -> Result<Self, DatasetError> {
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
        let mut cells: Vec<Vec<Value>> = vec![Vec::new(); headers.len()];

        for result in rdr.records() {
            let record = result?;
            for (i, column) in cells.iter_mut().enumerate() {
                column.push(record.get(i).map(Value::parse).unwrap_or(Value::Missing));
            }
        }

        let columns: Vec<Column> = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column {
                kind: ColumnKind::infer(&values),
                name,
                values,
            })
            .collect();

        let outcomes = derive_outcomes(&columns)?;
        let working = columns
            .iter()
            .enumerate()
            .filter(|(_, c)| is_working_column(&c.name))
            .map(|(i, _)| i)
            .collect();

        Ok(ReferenceDataset {
            columns,
            working,
            outcomes,
        })
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Every column in file order, indicators included.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Model input columns in dataset order.
    pub fn working_columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.working.iter().map(move |&i| &self.columns[i])
    }

    pub fn working_names(&self) -> Vec<&str> {
        self.working_columns().map(|c| c.name.as_str()).collect()
    }
}

fn is_working_column(name: &str) -> bool {
    !name.contains("Target") && name != DERIVED_LABEL
}

fn indicator<'a>(columns: &'a [Column], name: &'static str) -> Option<&'a Column> {
    columns.iter().find(|c| c.name == name)
}

fn indicator_set(column: &Column, row: usize, name: &'static str) -> Result<bool, DatasetError> {
    match &column.values[row] {
        Value::Boolean(b) => Ok(*b),
        value => match value.as_f64() {
            Some(v) if v == 1.0 => Ok(true),
            Some(v) if v == 0.0 => Ok(false),
            _ => Err(DatasetError::InvalidIndicator {
                row,
                column: name,
                value: value.to_string(),
            }),
        },
    }
}

/// Exports made with a dropped first dummy carry no dropout column; in that
/// case dropout is the row where neither remaining indicator is set.
fn derive_outcomes(columns: &[Column]) -> Result<Vec<Outcome>, DatasetError> {
    let graduate =
        indicator(columns, TARGET_GRADUATE).ok_or(DatasetError::MissingIndicator(TARGET_GRADUATE))?;
    let enrolled =
        indicator(columns, TARGET_ENROLLED).ok_or(DatasetError::MissingIndicator(TARGET_ENROLLED))?;
    let dropout = indicator(columns, TARGET_DROPOUT);

    let rows = graduate.values.len();
    let mut outcomes = Vec::with_capacity(rows);
    for row in 0..rows {
        let g = indicator_set(graduate, row, TARGET_GRADUATE)?;
        let e = indicator_set(enrolled, row, TARGET_ENROLLED)?;
        let d = match dropout {
            Some(col) => indicator_set(col, row, TARGET_DROPOUT)?,
            None => !g && !e,
        };

        let set = [g, e, d].iter().filter(|&&x| x).count();
        if set != 1 {
            return Err(DatasetError::InvalidOutcome { row, set });
        }
        outcomes.push(if g {
            Outcome::Graduate
        } else if e {
            Outcome::Enrolled
        } else {
            Outcome::Dropout
        });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Age at enrollment,Course,Admission grade,Target_Dropout,Target_Enrolled,Target_Graduate
20,Nursing,120.5,0,0,1
21,Nursing,130.0,1,0,0
25,Design,110.0,0,1,0
";

    #[test]
    fn test_outcomes_derived_once_per_row() {
        let ds = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            ds.outcomes(),
            &[Outcome::Graduate, Outcome::Dropout, Outcome::Enrolled]
        );
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_working_columns_exclude_indicators() {
        let ds = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(
            ds.working_names(),
            vec!["Age at enrollment", "Course", "Admission grade"]
        );
    }

    #[test]
    fn test_column_kind_inference() {
        let ds = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.column("Age at enrollment").unwrap().kind, ColumnKind::Integer);
        assert_eq!(ds.column("Admission grade").unwrap().kind, ColumnKind::Float);
        assert_eq!(ds.column("Course").unwrap().kind, ColumnKind::Text);
    }

    #[test]
    fn test_integer_column_with_gap_widens_to_float() {
        let csv = "Age,Target_Enrolled,Target_Graduate\n20,1,0\n,0,1\n";
        let ds = ReferenceDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.column("Age").unwrap().kind, ColumnKind::Float);
    }

    #[test]
    fn test_boolean_indicators_accepted() {
        let csv = "Age,Target_Dropout,Target_Enrolled,Target_Graduate\n20,False,True,False\n";
        let ds = ReferenceDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.outcomes(), &[Outcome::Enrolled]);
    }

    #[test]
    fn test_dropout_implied_without_column() {
        let csv = "Age,Target_Enrolled,Target_Graduate\n20,0,0\n22,0,1\n";
        let ds = ReferenceDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.outcomes(), &[Outcome::Dropout, Outcome::Graduate]);
    }

    #[test]
    fn test_two_indicators_rejected() {
        let csv = "Age,Target_Dropout,Target_Enrolled,Target_Graduate\n20,1,0,1\n";
        let err = ReferenceDataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidOutcome { row: 0, set: 2 }));
    }

    #[test]
    fn test_missing_indicator_column_rejected() {
        let csv = "Age,Target_Dropout\n20,1\n";
        let err = ReferenceDataset::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DatasetError::MissingIndicator(TARGET_GRADUATE)));
    }

    #[test]
    fn test_median_and_mode() {
        let ds = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.column("Age at enrollment").unwrap().median(), Some(21.0));
        assert_eq!(
            ds.column("Course").unwrap().mode(),
            Some(Value::Text("Nursing".to_string()))
        );
    }

    #[test]
    fn test_mode_tie_prefers_smallest() {
        let csv = "City,Target_Enrolled,Target_Graduate\nOslo,1,0\nBergen,0,1\n";
        let ds = ReferenceDataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(
            ds.column("City").unwrap().mode(),
            Some(Value::Text("Bergen".to_string()))
        );
    }

    #[test]
    fn test_nan_cells_ignored_by_median() {
        let csv = "Age,Target_Enrolled,Target_Graduate\n20,1,0\nNaN,0,1\n22,1,0\n21,0,1\n30,1,0\n";
        let ds = ReferenceDataset::from_reader(csv.as_bytes()).unwrap();
        let age = ds.column("Age").unwrap();
        assert_eq!(age.kind, ColumnKind::Float);
        assert_eq!(age.values[1], Value::Missing);
        assert_eq!(age.median(), Some(21.5));
        assert_eq!(age.mean(), Some(23.25));
    }

    #[test]
    fn test_na_tokens_keep_column_numeric() {
        let csv = "Age,Target_Enrolled,Target_Graduate\n20,1,0\nNA,0,1\n22,1,0\nnull,0,1\nN/A,1,0\n";
        let ds = ReferenceDataset::from_reader(csv.as_bytes()).unwrap();
        let age = ds.column("Age").unwrap();
        assert_eq!(age.kind, ColumnKind::Float);
        assert_eq!(age.median(), Some(21.0));
    }
}
