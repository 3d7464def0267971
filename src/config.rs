//! Configuration loading and defaults for keyblock-focusd.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::{KeySpec, Modifier, combine_modifiers};
use crate::keysym::{KeyError, string_to_keysym};

/// How the window class is compared against `target_class`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ClassMatch {
    /// Byte-for-byte comparison (default).
    #[default]
    Exact,
    /// ASCII case-insensitive comparison.
    IgnoreCase,
}

/// Main configuration for keyblock-focusd.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Most specific WM_CLASS entry of the application to protect
    /// (default: "Firefox").
    pub target_class: String,

    /// How `target_class` is compared.
    pub class_match: ClassMatch,

    /// Key to block, as a keysym name (default: "q").
    pub key: String,

    /// Modifiers that must be held for the key to be blocked
    /// (default: `["control"]`).
    pub modifiers: Vec<Modifier>,

    /// Modifiers whose state is ignored, e.g. NumLock and CapsLock
    /// (default: `["mod2", "lock"]`).
    pub ignored_modifiers: Vec<Modifier>,

    /// Pause before reconnecting after a failure, in milliseconds
    /// (default: 1000).
    pub restart_delay_ms: u64,

    /// X display to connect to. Falls back to `$DISPLAY`.
    pub display: Option<String>,

    /// Dry run mode: log grabs instead of installing them.
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_class: "Firefox".to_string(),
            class_match: ClassMatch::default(),
            key: "q".to_string(),
            modifiers: vec![Modifier::Control],
            ignored_modifiers: vec![Modifier::Mod2, Modifier::Lock],
            restart_delay_ms: 1000,
            display: None,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from the default path, or return defaults if not found.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(p) = path {
            return Self::load(p);
        }

        if let Some(default_path) = Self::default_path()
            && default_path.exists()
        {
            return Self::load(&default_path);
        }

        Ok(Self::default())
    }

    /// `$XDG_CONFIG_HOME/keyblock-focusd/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("keyblock-focusd").join("config.toml"))
    }

    /// Check the settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<()> {
        if self.target_class.trim().is_empty() {
            anyhow::bail!("target_class must not be empty");
        }
        self.key_spec()?;
        Ok(())
    }

    /// Resolve the configured key combination.
    pub fn key_spec(&self) -> Result<KeySpec, KeyError> {
        let keysym =
            string_to_keysym(&self.key).ok_or_else(|| KeyError::UnknownName(self.key.clone()))?;

        Ok(KeySpec {
            name: self.key.clone(),
            keysym,
            modifiers: combine_modifiers(&self.modifiers),
            ignored: self.ignored_modifiers.iter().map(|m| m.bit()).collect(),
        })
    }

    /// Pause between supervisor restarts.
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }
}
