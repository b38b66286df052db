// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Quiver queue delivery engine.
//!
//! TOML configuration with strict key checking, a file hierarchy, `QUIVER_`
//! environment overrides, and miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use quiver_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Broker: {}", config.producer.base_url);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{CompatConfig, LimitsConfig, ProducerConfig, QuiverConfig};

/// Load configuration from the file hierarchy and validate it.
pub fn load_and_validate() -> Result<QuiverConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<QuiverConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Source text of every config file that exists, for error spans.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut sources = Vec::new();

    let local = loader::local_config_path();
    if let Ok(content) = std::fs::read_to_string(local) {
        let path = std::env::current_dir()
            .map(|d| d.join(local).display().to_string())
            .unwrap_or_else(|_| local.display().to_string());
        sources.push((path, content));
    }

    if let Some(path) = loader::user_config_path() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push((path.display().to_string(), content));
        }
    }

    let system = loader::system_config_path();
    if let Ok(content) = std::fs::read_to_string(system) {
        sources.push((system.display().to_string(), content));
    }

    sources
}
