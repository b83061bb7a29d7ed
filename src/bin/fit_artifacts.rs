//! Fits the classifier, anomaly and trend artifacts from the reference
//! dataset and writes them where the service looks for them.

use anyhow::Context;
use log::info;

use edu_predict::config::AppConfig;
use edu_predict::data::ReferenceDataset;
use edu_predict::training::{fit_all, save_all};

fn main() -> anyhow::Result<()> {
    edu_predict::init_logging();
    let config = AppConfig::load()?;

    let dataset = ReferenceDataset::load(&config.data_path)
        .with_context(|| format!("loading {}", config.data_path))?;
    info!("Loaded {} student records", dataset.len());

    let artifacts = fit_all(&dataset, &config.training)?;
    info!("Classifier trained, accuracy: {:.2}%", artifacts.accuracy * 100.0);
    info!(
        "Trend: next = {:.3} + {:.3} x sem1",
        artifacts.trend.intercept, artifacts.trend.coefficients[0]
    );

    save_all(&artifacts, &config)?;
    Ok(())
}
