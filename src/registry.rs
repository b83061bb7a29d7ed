use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

use crate::artifact::{AnomalyDetector, Classifier, LinearTrend, LogisticClassifier, TrendModel, ZScoreEnvelope};
use crate::config::ModelsConfig;
use crate::error::{ArtifactError, RegistryError};

pub type SharedClassifier = Arc<dyn Classifier>;

/// Read-only set of loaded artifacts. Absent files are skipped; the
/// registry is only usable for prediction when [`ModelRegistry::is_ready`].
#[derive(Default, Clone)]
pub struct ModelRegistry {
    classifiers: Vec<(String, SharedClassifier)>,
    anomaly: Option<Arc<dyn AnomalyDetector>>,
    trend: Option<Arc<dyn TrendModel>>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Walks the configured candidates under `config.dir`.
    pub fn discover(config: &ModelsConfig) -> Result<Self, RegistryError> {
        let dir = Path::new(&config.dir);
        let mut builder = Self::builder();

        for candidate in &config.classifiers {
            if let Some(model) = load_optional(dir, &candidate.name, &candidate.file, LogisticClassifier::load)? {
                builder = builder.classifier(candidate.name.clone(), model);
            }
        }
        if let Some(model) = load_optional(dir, "anomaly", &config.anomaly_file, ZScoreEnvelope::load)? {
            builder = builder.anomaly(model);
        }
        if let Some(model) = load_optional(dir, "trend", &config.trend_file, LinearTrend::load)? {
            builder = builder.trend(model);
        }

        let registry = builder.build();
        info!(
            "Model registry: {} classifier(s) [{}], anomaly: {}, trend: {}",
            registry.classifiers.len(),
            registry.classifier_names().join(", "),
            registry.anomaly.is_some(),
            registry.trend.is_some()
        );
        Ok(registry)
    }

    pub fn classifier_names(&self) -> Vec<&str> {
        self.classifiers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn classifier(&self, name: &str) -> Option<&SharedClassifier> {
        self.classifiers.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// First classifier in candidate order.
    pub fn default_classifier(&self) -> Option<(&str, &SharedClassifier)> {
        self.classifiers.first().map(|(n, m)| (n.as_str(), m))
    }

    pub fn anomaly(&self) -> Option<&Arc<dyn AnomalyDetector>> {
        self.anomaly.as_ref()
    }

    pub fn trend(&self) -> Option<&Arc<dyn TrendModel>> {
        self.trend.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        !self.classifiers.is_empty() && self.anomaly.is_some() && self.trend.is_some()
    }

    /// Human-readable reason when not ready.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.classifiers.is_empty() {
            missing.push("classifier");
        }
        if self.anomaly.is_none() {
            missing.push("anomaly model");
        }
        if self.trend.is_none() {
            missing.push("trend model");
        }
        missing
    }
}

fn load_optional<T>(
    dir: &Path,
    name: &str,
    file: &str,
    load: impl FnOnce(&Path) -> Result<T, ArtifactError>,
) -> Result<Option<T>, RegistryError> {
    let path = dir.join(file);
    if !path.exists() {
        debug!("Skipping {name}: {} not found", path.display());
        return Ok(None);
    }
    load(&path).map(Some).map_err(|source| RegistryError::Load {
        name: name.to_string(),
        source,
    })
}

#[derive(Default)]
pub struct ModelRegistryBuilder {
    registry: ModelRegistry,
}

impl ModelRegistryBuilder {
    pub fn classifier(mut self, name: impl Into<String>, model: impl Classifier + 'static) -> Self {
        self.registry.classifiers.push((name.into(), Arc::new(model)));
        self
    }

    pub fn anomaly(mut self, model: impl AnomalyDetector + 'static) -> Self {
        self.registry.anomaly = Some(Arc::new(model));
        self
    }

    pub fn trend(mut self, model: impl TrendModel + 'static) -> Self {
        self.registry.trend = Some(Arc::new(model));
        self
    }

    pub fn build(self) -> ModelRegistry {
        self.registry
    }
}
