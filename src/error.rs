use thiserror::Error;

/// Failures while reading the reference dataset. Always fatal.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("reading dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset is missing outcome indicator column '{0}'")]
    MissingIndicator(&'static str),

    #[error("row {row}: expected exactly one outcome indicator to be set, found {set}")]
    InvalidOutcome { row: usize, set: usize },

    #[error("row {row}: indicator '{column}' has non-binary value '{value}'")]
    InvalidIndicator {
        row: usize,
        column: &'static str,
        value: String,
    },
}

/// Mismatch between a request and the reference schema. Fatal, never retried.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("override references unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{column}' expects an integer but received '{value}'")]
    Coercion { column: String, value: String },

    #[error("column '{0}' is not numeric and cannot be fed to a model")]
    NonNumeric(String),

    #[error("field '{field}' = {value} is outside the accepted range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Errors raised by an artifact while loading or predicting.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("reading artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing artifact {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("artifact expects {expected} features, received {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("artifact feature '{expected}' does not match input column '{actual}'")]
    FeatureMismatch { expected: String, actual: String },

    #[error("artifact is malformed: {0}")]
    Malformed(String),
}

/// Model registry discovery failures. A missing file is not one of these.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("loading '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: ArtifactError,
    },
}

/// A single prediction request failed. Never retried, never substituted.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("artifact failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("artifact output violates its contract: {0}")]
    Contract(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("models not loaded: {0}")]
    NotReady(String),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

impl From<SchemaError> for EngineError {
    fn from(err: SchemaError) -> Self {
        EngineError::Prediction(PredictionError::Schema(err))
    }
}
