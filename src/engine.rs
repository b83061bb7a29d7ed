use std::sync::Arc;

use log::debug;

use crate::assembler::{assemble, Overrides};
use crate::data::ReferenceDataset;
use crate::error::EngineError;
use crate::interpreter::{interpret, narrative};
use crate::model::{Assessment, Role, StudentProfile};
use crate::registry::ModelRegistry;

/// Dataset and artifacts bundled for request handlers. Only constructible
/// over a ready registry, so a prediction is never attempted without all
/// three artifact kinds.
#[derive(Clone)]
pub struct PredictionEngine {
    dataset: Arc<ReferenceDataset>,
    registry: Arc<ModelRegistry>,
}

impl PredictionEngine {
    pub fn new(dataset: Arc<ReferenceDataset>, registry: Arc<ModelRegistry>) -> Result<Self, EngineError> {
        if !registry.is_ready() {
            return Err(EngineError::NotReady(format!(
                "missing {}",
                registry.missing().join(", ")
            )));
        }
        Ok(Self { dataset, registry })
    }

    /// `model` selects a classifier by display name; `None` uses the default.
    pub fn predict(
        &self,
        profile: &StudentProfile,
        model: Option<&str>,
        role: Option<Role>,
    ) -> Result<Assessment, EngineError> {
        let (name, classifier) = match model {
            Some(name) => (
                name,
                self.registry
                    .classifier(name)
                    .ok_or_else(|| EngineError::UnknownModel(name.to_string()))?,
            ),
            None => self
                .registry
                .default_classifier()
                .ok_or_else(|| EngineError::NotReady("no classifier".into()))?,
        };
        let (anomaly, trend) = match (self.registry.anomaly(), self.registry.trend()) {
            (Some(a), Some(t)) => (a, t),
            _ => return Err(EngineError::NotReady("side models missing".into())),
        };

        let features = assemble(&self.dataset, &Overrides::from(profile))?;
        debug!("Assembled {} features for {name}", features.len());

        let result = interpret(
            &features,
            classifier.as_ref(),
            anomaly.as_ref(),
            trend.as_ref(),
            profile.sem1_grade,
        )?;

        Ok(Assessment {
            model: name.to_string(),
            headline: result.outcome.headline(),
            narrative: narrative(result.outcome, role, result.forecast),
            result,
        })
    }
}
