use crate::error::{ErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Every setting the CDN environment reads, with its default.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    pub config: ConfigSettings,
    pub cdn: CdnSettings,
    pub site: SiteSettings,
    pub database: DatabaseSettings,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ConfigSettings {
    /// Reconcile the rules file on every admin request.
    pub check: bool,
}
impl Default for ConfigSettings {
    fn default() -> Self {
        Self { check: true }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CdnSettings {
    pub enabled: bool,
    /// Engine identifier, e.g. `ftp` or `cf2`.
    pub engine: String,
    pub queue: QueueSettings,
    pub autoupload: AutoUploadSettings,
    /// Emit `Link: rel="canonical"` for static assets.
    pub canonical_header: bool,
    /// Emit `Access-Control-Allow-Origin: *` for fonts.
    pub cors_header: bool,
    pub ftp: FtpSettings,
}
impl Default for CdnSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            engine: "ftp".to_string(),
            queue: QueueSettings::default(),
            autoupload: AutoUploadSettings::default(),
            canonical_header: false,
            cors_header: false,
            ftp: FtpSettings::default(),
        }
    }
}
impl CdnSettings {
    pub fn queue_interval(&self) -> Duration {
        Duration::from_secs(self.queue.interval)
    }

    pub fn autoupload_interval(&self) -> Duration {
        Duration::from_secs(self.autoupload.interval)
    }

    pub fn is_ftp(&self) -> bool {
        self.engine == "ftp"
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Seconds between queue runs.
    pub interval: u64,
}
impl Default for QueueSettings {
    fn default() -> Self {
        Self { interval: 900 }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct AutoUploadSettings {
    pub enabled: bool,
    /// Seconds between upload runs.
    pub interval: u64,
}
impl Default for AutoUploadSettings {
    fn default() -> Self {
        Self { enabled: false, interval: 3600 }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct FtpSettings {
    /// Public host name of the FTP-backed CDN.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct SiteSettings {
    /// Canonical host of the origin site.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Naming of the CDN tables. Hosts build their persistence layer from these
/// values (see `cdnenv_environment::open_database`); reconciliation then
/// reads them back from that layer only.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Prepended to every table name.
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,
}

impl Settings {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.cdn.queue.interval == 0 {
            exn::bail!(ErrorKind::Invalid("cdn.queue.interval must be at least one second".to_string()));
        }
        if self.cdn.autoupload.interval == 0 {
            exn::bail!(ErrorKind::Invalid("cdn.autoupload.interval must be at least one second".to_string()));
        }
        if self.cdn.engine.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("cdn.engine must not be empty".to_string()));
        }
        Ok(())
    }
}
