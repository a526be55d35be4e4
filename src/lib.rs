pub mod config;
pub mod dataset_loader;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod monitoring;
pub mod normalizer;
pub mod pipeline;
pub mod store;
pub mod types;

pub use error::MigrationError;
pub use pipeline::{MigrationOutcome, MigrationPipeline};
