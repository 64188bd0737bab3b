//! Layered configuration.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults ([`Settings::default`]).
//! 2. A configuration file (TOML, YAML or JSON, chosen by extension).
//! 3. Environment variables prefixed with `CDNENV_`, nested keys separated by
//!    `__` (`CDNENV_CDN__QUEUE__INTERVAL=600`).

pub mod error;
mod settings;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
pub use settings::{
    AutoUploadSettings, CdnSettings, ConfigSettings, DatabaseSettings, FtpSettings, QueueSettings, Settings,
    SiteSettings,
};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "CDNENV_";

/// Validated settings plus the merged sources they came from.
///
/// Two configs compare equal when their typed settings are equal; the raw
/// sources only back the dynamic `get_*` lookups.
#[derive(Clone, Debug)]
pub struct Config {
    figment: Figment,
    settings: Settings,
}

impl Config {
    /// Loads defaults, then `path` (or the per-user default file if it
    /// exists), then the environment.
    #[tracing::instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        match path {
            Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
            Some(path) => figment = merge_file(figment, path)?,
            None => {
                if let Some(path) = Self::default_path()
                    && path.is_file()
                {
                    figment = merge_file(figment, &path)?;
                }
            },
        }
        Self::from_figment(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// `config.toml` in the platform's per-user configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "cdnenv").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Extracts and validates [`Settings`] from an arbitrary figment.
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let settings: Settings = figment.extract().or_raise(|| ErrorKind::Load)?;
        settings.validate()?;
        Ok(Self { figment, settings })
    }

    pub fn from_settings(settings: Settings) -> Result<Self> {
        Self::from_figment(Figment::from(Serialized::defaults(settings)))
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cdn(&self) -> &CdnSettings {
        &self.settings.cdn
    }

    /// Dotted-key lookup, e.g. `cdn.cors_header`.
    pub fn get_boolean(&self, key: &str) -> Result<bool> {
        self.figment.extract_inner(key).or_raise(|| ErrorKind::Key(key.to_string()))
    }

    pub fn get_integer(&self, key: &str) -> Result<i64> {
        self.figment.extract_inner(key).or_raise(|| ErrorKind::Key(key.to_string()))
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.figment.extract_inner(key).or_raise(|| ErrorKind::Key(key.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())), settings: Settings::default() }
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.settings == other.settings
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    tracing::debug!(path = %path.display(), "Merging configuration file");
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
