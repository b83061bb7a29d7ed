//! EduPredict: academic outcome prediction over pre-fitted student models.
//!
//! ```text
//!  operator input ──► assembler ──► interpreter ──► report / JSON
//!                        ▲             ▲
//!                 ReferenceDataset  ModelRegistry
//! ```

pub mod analytics;
pub mod artifact;
pub mod assembler;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod interpreter;
pub mod model;
pub mod registry;
pub mod report;
pub mod server;
pub mod training;

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
