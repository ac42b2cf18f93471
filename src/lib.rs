pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{FirestoreBackend, MemoryStore};
pub use app::{BoardSettings, NominationApp};
pub use config::AppConfig;
pub use crate::core::{aggregator::tally, live_view::LiveView, submission::SubmissionPipeline};
pub use utils::error::{BoardError, Result};
