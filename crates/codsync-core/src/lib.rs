//! codsync Core - Domain types, reconciliation logic, error handling, and configuration.

pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod sync;

pub use config::{default_config_path, load_config, AppConfig, HttpConfig, ServiceUrls};
pub use error::AppError;
pub use models::{CodType, Country, Dataset, Resource};
pub use report::ErrorLog;
pub use sync::{
    add_service_resources, is_upstream_service, remove_upstream_resources, LevelOutcome,
    UPSTREAM_HOST,
};
