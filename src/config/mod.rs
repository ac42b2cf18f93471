#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{Cli, Command, RegisterArgs};
pub use toml_config::{AdminConfig, AppConfig, DeploymentConfig, EventConfig, FirebaseConfig};
