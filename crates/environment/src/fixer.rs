//! Reconciles the CDN environment with the configuration.

use crate::engine::{EngineCatalog, FTP_ENGINE, KnownEngines};
use crate::error::{ErrorBatch, Result, UnknownEvent};
use crate::reconcile;
use crate::server::{ServerDetector, ServerSoftware};
use cdnenv_config::{Config, DatabaseSettings};
use cdnenv_rules::markers::{BEGIN_CDN, CDN_HINTS, END_CDN};
use cdnenv_rules::{RuleOptions, RuleWriter, generate};
use cdnenv_schedule::{ScheduleManager, Scheduler, Task};
use cdnenv_schema::{Database, Persistence};
use cdnenv_schema::error::Result as SchemaResult;
use derive_more::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Host lifecycle events that trigger [`EnvironmentFixer::fix_on_event`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Event {
    /// The CDN module was switched on. Existing tables are reset.
    #[display("activate")]
    Activate,
    #[display("deactivate")]
    Deactivate,
    /// Configuration was saved.
    #[display("config_save")]
    ConfigSave,
}
impl FromStr for Event {
    type Err = UnknownEvent;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "activate" => Ok(Self::Activate),
            "deactivate" => Ok(Self::Deactivate),
            "config_save" => Ok(Self::ConfigSave),
            _ => Err(UnknownEvent(s.to_string())),
        }
    }
}

/// A rules file some server needs, and what the CDN block in it should be.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequiredRule {
    /// Local path, or an `ftp://` URL for the copy on an FTP mirror.
    pub location: String,
    pub content: String,
}

/// A manual step for operators who apply changes themselves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub title: String,
    pub area: String,
    pub content: String,
}

/// Keeps rules, scheduled jobs and tables in line with the configuration.
///
/// Each entry point runs every step it owns even when an earlier one fails
/// and reports all failures together in an [`ErrorBatch`]. Scheduling can't
/// fail. Callers must not run two fixers against the same rules file at the
/// same time.
pub struct EnvironmentFixer {
    scheduler: Arc<dyn Scheduler>,
    persistence: Arc<dyn Persistence>,
    rules: Arc<dyn RuleWriter>,
    rules_path: PathBuf,
    server: Arc<dyn ServerDetector>,
    engines: Arc<dyn EngineCatalog>,
}

impl EnvironmentFixer {
    /// The server is detected from `SERVER_SOFTWARE`; mirror engines come
    /// from [`KnownEngines`].
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        persistence: Arc<dyn Persistence>,
        rules: Arc<dyn RuleWriter>,
        rules_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scheduler,
            persistence,
            rules,
            rules_path: rules_path.into(),
            server: Arc::new(ServerSoftware::from_env()),
            engines: Arc::new(KnownEngines),
        }
    }

    pub fn with_server(mut self, server: Arc<dyn ServerDetector>) -> Self {
        self.server = server;
        self
    }

    pub fn with_engines(mut self, engines: Arc<dyn EngineCatalog>) -> Self {
        self.engines = engines;
        self
    }

    pub fn rules_path(&self) -> &Path {
        &self.rules_path
    }

    /// Runs on every admin request: brings the rules block in line with
    /// `cdn.enabled`. Skipped unless `config.check` is set or `force` is
    /// given. Jobs and tables are left alone.
    #[instrument(level = "debug", skip_all, fields(force = force))]
    pub async fn fix_on_request(&self, config: &Config, force: bool) -> Result<()> {
        let mut batch = ErrorBatch::default();
        if config.settings().config.check || force {
            if config.cdn().enabled {
                self.rules_add(config, &mut batch).await;
            } else {
                self.rules_remove(&mut batch).await;
            }
        }
        batch.into_result()
    }

    /// Runs after `event`: schedules or cancels the queue and upload jobs,
    /// then ensures the tables exist when the CDN is enabled (resetting them
    /// on [`Event::Activate`]).
    ///
    /// `previous` is the configuration before the change; a job whose
    /// interval differs from it is recreated.
    #[instrument(level = "debug", skip_all, fields(event = %event))]
    pub async fn fix_on_event(&self, config: &Config, event: Event, previous: Option<&Config>) -> Result<()> {
        let cdn = config.cdn();
        let pushes = cdn.enabled && !self.engines.is_mirror(&cdn.engine);
        let schedules = ScheduleManager::new(self.scheduler.as_ref());
        sync_job(
            &schedules,
            Task::QueueProcess,
            pushes,
            cdn.queue_interval(),
            previous.map(|p| p.cdn().queue_interval()),
        );
        sync_job(
            &schedules,
            Task::Upload,
            pushes && cdn.autoupload.enabled,
            cdn.autoupload_interval(),
            previous.map(|p| p.cdn().autoupload_interval()),
        );

        let mut batch = ErrorBatch::default();
        if cdn.enabled {
            batch.extend(cdnenv_schema::apply(self.persistence.as_ref(), event == Event::Activate, true).await);
        }
        batch.into_result()
    }

    /// Runs once the module is deactivated: removes the rules block and
    /// drops both tables.
    #[instrument(level = "debug", skip_all)]
    pub async fn fix_after_deactivation(&self) -> Result<()> {
        let mut batch = ErrorBatch::default();
        self.rules_remove(&mut batch).await;
        batch.extend(cdnenv_schema::apply(self.persistence.as_ref(), true, false).await);
        batch.into_result()
    }

    /// The CDN rules block for this server, or an empty string when no
    /// header is enabled.
    pub fn rules_generate(&self, config: &Config, ftp: bool) -> String {
        let cdn = config.cdn();
        let options = RuleOptions {
            canonical_header: cdn.canonical_header,
            cors_header: cdn.cors_header,
            site_host: config.settings().site.host.as_deref(),
        };
        generate(self.server.kind(), &options, ftp)
    }

    /// The block uploaded to an FTP mirror.
    pub fn generate_for_ftp(&self, config: &Config) -> String {
        self.rules_generate(config, true)
    }

    /// Rules files the CDN needs, for hosts that show or upload them.
    ///
    /// `None` when the CDN is disabled; empty when no header is enabled.
    pub fn required_rules(&self, config: &Config) -> Option<Vec<RequiredRule>> {
        let cdn = config.cdn();
        if !cdn.enabled {
            return None;
        }
        let content = self.rules_generate(config, false);
        if content.is_empty() {
            return Some(Vec::new());
        }
        let mut rules = Vec::new();
        if cdn.engine == FTP_ENGINE {
            match cdn.ftp.domain.as_deref().filter(|d| !d.is_empty()) {
                Some(domain) => rules.push(RequiredRule {
                    location: format!("ftp://{domain}/.htaccess"),
                    content: self.generate_for_ftp(config),
                }),
                None => tracing::warn!("FTP engine without cdn.ftp.domain; skipping remote rules"),
            }
        }
        rules.push(RequiredRule { location: self.rules_path.display().to_string(), content });
        Some(rules)
    }

    /// SQL operators must run by hand when the host can't create tables.
    ///
    /// Table names, charset and collation come from the same persistence
    /// layer [`fix_on_event`](Self::fix_on_event) creates the tables with.
    /// `None` when the CDN is disabled.
    pub fn instructions(&self, config: &Config) -> SchemaResult<Option<Vec<Instruction>>> {
        if !config.cdn().enabled {
            return Ok(None);
        }
        let persistence = self.persistence.as_ref();
        let sql = cdnenv_schema::queue_reset_sql(persistence.prefix(), persistence.charset(), persistence.collate())?;
        Ok(Some(vec![Instruction {
            title: "CDN module: Required Database SQL".to_string(),
            area: "database".to_string(),
            content: sql,
        }]))
    }

    async fn rules_add(&self, config: &Config, batch: &mut ErrorBatch) {
        let block = self.rules_generate(config, false);
        reconcile::add_or_update(batch, self.rules.as_ref(), &self.rules_path, &block, BEGIN_CDN, END_CDN, CDN_HINTS)
            .await;
    }

    async fn rules_remove(&self, batch: &mut ErrorBatch) {
        reconcile::remove(batch, self.rules.as_ref(), &self.rules_path, BEGIN_CDN, END_CDN).await;
    }
}

/// Opens the SQLite database at `path`, naming tables after `settings`.
#[instrument(level = "debug", skip_all, fields(prefix = %settings.prefix))]
pub async fn open_database(path: impl AsRef<Path>, settings: &DatabaseSettings) -> SchemaResult<Database> {
    Ok(Database::connect(path)
        .await?
        .with_prefix(settings.prefix.clone())
        .with_charset(settings.charset.clone())
        .with_collate(settings.collate.clone()))
}

fn sync_job(schedules: &ScheduleManager<'_>, task: Task, enabled: bool, interval: Duration, previous: Option<Duration>) {
    if !enabled {
        schedules.unschedule(task);
        return;
    }
    if let Some(previous) = previous {
        schedules.reschedule(task, previous, interval);
    }
    schedules.ensure_scheduled(task, interval);
}
