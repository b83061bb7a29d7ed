use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "edupredict.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub name: String,
    pub file: String,
}

impl Candidate {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelsConfig {
    pub dir: String,
    /// Tried in order; the first one loaded is the default classifier.
    pub classifiers: Vec<Candidate>,
    pub anomaly_file: String,
    pub trend_file: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: "models".into(),
            classifiers: vec![
                Candidate::new("Tuned Logistic Regression", "tuned_logistic_regression_model.json"),
                Candidate::new("Tuned Random Forest", "tuned_random_forest_model.json"),
                Candidate::new("Tuned XGBoost", "tuned_xgboost_model.json"),
                Candidate::new("Baseline Random Forest", "rf_model.json"),
            ],
            anomaly_file: "anomaly_model.json".into(),
            trend_file: "trend_model.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    pub max_iterations: u64,
    pub anomaly_threshold: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            anomaly_threshold: 4.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data_path: String,
    pub models: ModelsConfig,
    pub server: ServerConfig,
    pub training: TrainingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: "data/academic_cleaned.csv".into(),
            models: ModelsConfig::default(),
            server: ServerConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl AppConfig {
    /// `EDUPREDICT_CONFIG`, else `edupredict.toml` when present, else
    /// defaults; then environment overrides.
    pub fn load() -> Result<Self> {
        let explicit = env::var("EDUPREDICT_CONFIG").ok();
        let path = explicit.as_deref().unwrap_or(DEFAULT_CONFIG_FILE);

        let mut config = if explicit.is_some() || Path::new(path).exists() {
            info!("Reading configuration from {path}");
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(data) = var("EDUPREDICT_DATA") {
            self.data_path = data;
        }
        if let Some(dir) = var("EDUPREDICT_MODELS") {
            self.models.dir = dir;
        }
        if let Some(host) = var("EDUPREDICT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("EDUPREDICT_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("EDUPREDICT_PORT must be a port number, got '{port}'"))?;
        }
        Ok(())
    }
}
