// SPDX-FileCopyrightText: 2026 Quiver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading.
//!
//! Lookup order: `./quiver.toml` > `~/.config/quiver/quiver.toml` > `/etc/quiver/quiver.toml`,
//! with `QUIVER_` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::QuiverConfig;

const SYSTEM_CONFIG: &str = "/etc/quiver/quiver.toml";
const LOCAL_CONFIG: &str = "quiver.toml";

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/quiver/quiver.toml`
/// 3. `~/.config/quiver/quiver.toml`
/// 4. `./quiver.toml`
/// 5. `QUIVER_*` environment variables
pub fn load_config() -> Result<QuiverConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<QuiverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QuiverConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<QuiverConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(QuiverConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(QuiverConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("quiver/quiver.toml"))
}

pub(crate) fn system_config_path() -> &'static Path {
    Path::new(SYSTEM_CONFIG)
}

pub(crate) fn local_config_path() -> &'static Path {
    Path::new(LOCAL_CONFIG)
}

/// Environment provider mapping `QUIVER_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `map()` rather than `split("_")`: keys themselves contain underscores,
/// e.g. `QUIVER_LIMITS_WALL_CLOCK_TIMEOUT_SECS` is `limits.wall_clock_timeout_secs`.
pub fn env_provider() -> Env {
    Env::prefixed("QUIVER_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("compat_", "compat.", 1)
            .replacen("limits_", "limits.", 1)
            .replacen("producer_", "producer.", 1);
        mapped.into()
    })
}
