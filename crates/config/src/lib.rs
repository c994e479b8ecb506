//! Configuration: schema types plus file discovery and loading.
//!
//! A `stuga.{toml,yaml,yml,json}` file is looked up project-local first,
//! then under `~/.config/stuga/`. Missing or broken files fall back to
//! defaults so the server always starts.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{clear_config_dir, discover_and_load, load_config, set_config_dir},
    schema::StugaConfig,
};
