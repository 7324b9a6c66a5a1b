//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/javelin/config.toml)
//! 3. Project config (.javelin/config.toml)
//! 4. Environment variables (JAVELIN_* prefix)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::Config;
use crate::types::{JavelinError, Result};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with the full resolution chain
    pub fn load() -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            debug!("loading global config from {}", global_path.display());
            figment = figment.merge(Toml::file(&global_path));
        }

        let project_path = Self::project_config_path();
        if project_path.exists() {
            debug!("loading project config from {}", project_path.display());
            figment = figment.merge(Toml::file(&project_path));
        }

        figment = figment.merge(Env::prefixed("JAVELIN_").split('_').lowercase(true));

        let config: Config = figment
            .extract()
            .map_err(|e| JavelinError::Config(format!("configuration error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from one file only, on top of defaults
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(|e| JavelinError::Config(format!("configuration error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Global config directory (~/.config/javelin/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                env::var("HOME")
                    .ok()
                    .map(|home| PathBuf::from(home).join(".config"))
            })
            .map(|p| p.join("javelin"))
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".javelin/config.toml")
    }

    /// Print where configuration is read from
    pub fn show_paths() {
        println!("Configuration paths:");
        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "present" } else { "absent" };
            println!("  global:  {} ({exists})", global.display());
        }
        let project = Self::project_config_path();
        let exists = if project.exists() { "present" } else { "absent" };
        println!("  project: {} ({exists})", project.display());
    }
}
