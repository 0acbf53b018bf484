//! Configuration loading for the tracker client.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        clear_config_dir, config_dir, credentials_path, discover_and_load,
        find_or_default_config_path, load_config, set_config_dir,
    },
    schema::{ApiConfig, AuthConfig, TriageConfig},
};
