use actix_web::{web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};

use edu_predict::config::AppConfig;
use edu_predict::data::ReferenceDataset;
use edu_predict::registry::ModelRegistry;
use edu_predict::server::{configure, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    edu_predict::init_logging();
    let config = AppConfig::load()?;

    info!("Loading reference data from {}", config.data_path);
    let loader = config.clone();
    let (dataset, registry) = tokio::task::spawn_blocking(move || {
        (
            ReferenceDataset::load(&loader.data_path),
            ModelRegistry::discover(&loader.models),
        )
    })
    .await
    .context("loading task panicked")?;

    let state = web::Data::new(AppState::from_loaded(dataset, registry));
    if !state.is_ready() {
        warn!("SYSTEM ERROR: MODELS NOT LOADED. Verify the data and models directories.");
    }

    let (host, port) = (config.server.host.clone(), config.server.port);
    info!("Starting EduPredict on http://{host}:{port}");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind((host.as_str(), port))?
        .run()
        .await?;

    Ok(())
}
