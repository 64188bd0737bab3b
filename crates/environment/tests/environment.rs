use async_trait::async_trait;
use cdnenv_config::{Config, Settings};
use cdnenv_environment::{EngineCatalog, EnvironmentFixer, Event, Failure, ServerSoftware};
use cdnenv_rules::error::ErrorKind as RulesErrorKind;
use cdnenv_rules::{FONT_EXTENSIONS, RulesFile, ServerKind};
use cdnenv_schedule::{InMemoryScheduler, Scheduler, Task};
use cdnenv_schema::error::{ErrorKind as SchemaErrorKind, Result as SchemaResult};
use cdnenv_schema::{Database, Dialect, Persistence, QueueCommand, QueueRepository};
use cdnenv_storage::backend::{LocalBackend, MockBackend};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const WORDPRESS: &str = "# BEGIN WordPress\n<IfModule mod_rewrite.c>\nRewriteEngine On\n</IfModule>\n# END WordPress\n";

struct Harness {
    scheduler: Arc<InMemoryScheduler>,
    backend: Arc<MockBackend>,
    db: Database,
    fixer: EnvironmentFixer,
}

async fn harness(backend: MockBackend) -> Harness {
    let scheduler = Arc::new(InMemoryScheduler::default());
    let backend = Arc::new(backend);
    let db = Database::connect_in_memory().await.unwrap().with_prefix("wp_");
    let fixer =
        EnvironmentFixer::new(scheduler.clone(), Arc::new(db.clone()), Arc::new(RulesFile::new(backend.clone())), ".htaccess")
            .with_server(Arc::new(ServerSoftware::parse("Apache/2.4.58 (Ubuntu)")));
    Harness { scheduler, backend, db, fixer }
}

fn config(edit: impl FnOnce(&mut Settings)) -> Config {
    let mut settings = Settings::default();
    edit(&mut settings);
    Config::from_settings(settings).unwrap()
}

fn cdn_with_cors() -> Config {
    config(|s| {
        s.cdn.enabled = true;
        s.cdn.cors_header = true;
        s.cdn.canonical_header = true;
    })
}

async fn queue_table_exists(db: &Database) -> bool {
    QueueRepository::new(db).unwrap().pending(1).await.is_ok()
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rules_reconciliation_is_idempotent() {
    let h = harness(MockBackend::with_files([(".htaccess", WORDPRESS)])).await;
    let config = cdn_with_cors();
    h.fixer.fix_on_request(&config, false).await.unwrap();
    let first = h.backend.contents(".htaccess").unwrap();
    h.fixer.fix_on_request(&config, false).await.unwrap();
    h.fixer.fix_on_request(&config, true).await.unwrap();
    assert_eq!(h.backend.contents(".htaccess").unwrap(), first);
    assert_eq!(h.backend.writes(), 1);
    assert_eq!(first.matches("# BEGIN CDN").count(), 1);
}

#[tokio::test]
async fn enabling_then_disabling_restores_file() {
    let original = format!("Options -Indexes\n{WORDPRESS}");
    let h = harness(MockBackend::with_files([(".htaccess", original.as_str())])).await;
    h.fixer.fix_on_request(&cdn_with_cors(), false).await.unwrap();
    assert_ne!(h.backend.contents(".htaccess").unwrap(), original);
    h.fixer.fix_on_request(&config(|s| s.cdn.cors_header = true), false).await.unwrap();
    assert_eq!(h.backend.contents(".htaccess").unwrap(), original);
}

#[tokio::test]
async fn block_goes_before_application_rules() {
    let h = harness(MockBackend::with_files([(".htaccess", WORDPRESS)])).await;
    h.fixer.fix_on_request(&cdn_with_cors(), false).await.unwrap();
    let text = h.backend.contents(".htaccess").unwrap();
    let cdn_end = text.find("# END CDN").unwrap();
    assert!(cdn_end < text.find("# BEGIN WordPress").unwrap());
    assert!(text.ends_with(WORDPRESS));
}

#[tokio::test]
async fn block_goes_after_page_cache_block() {
    let page_cache = "# BEGIN Page Cache cache\nRewriteRule x\n# END Page Cache cache\n";
    let original = format!("{page_cache}Options -Indexes\n");
    let h = harness(MockBackend::with_files([(".htaccess", original.as_str())])).await;
    h.fixer.fix_on_request(&cdn_with_cors(), false).await.unwrap();
    let text = h.backend.contents(".htaccess").unwrap();
    assert!(text.starts_with(&format!("{page_cache}# BEGIN CDN\n")));
    assert!(text.ends_with("# END CDN\nOptions -Indexes\n"));
}

#[tokio::test]
async fn nothing_enabled_removes_block() {
    let h = harness(MockBackend::with_files([(".htaccess", WORDPRESS)])).await;
    h.fixer.fix_on_request(&cdn_with_cors(), false).await.unwrap();
    h.fixer.fix_on_request(&config(|s| s.cdn.enabled = true), false).await.unwrap();
    assert_eq!(h.backend.contents(".htaccess").as_deref(), Some(WORDPRESS));
}

#[tokio::test]
async fn ftp_rules_guard_fonts() {
    let h = harness(MockBackend::default()).await;
    let config = config(|s| {
        s.cdn.enabled = true;
        s.cdn.cors_header = true;
    });
    let ftp = h.fixer.generate_for_ftp(&config);
    let guard = format!("<FilesMatch \"\\.({})$\">", FONT_EXTENSIONS.join("|"));
    assert_eq!(FONT_EXTENSIONS, ["ttf", "ttc", "otf", "eot", "woff", "woff2", "font.css"]);
    assert!(ftp.contains(&guard), "{ftp}");
    assert!(!h.fixer.rules_generate(&config, false).contains("FilesMatch"));
}

#[tokio::test]
async fn rules_written_to_real_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".htaccess"), WORDPRESS).unwrap();
    let backend = LocalBackend::new("docroot", dir.path()).unwrap();
    let db = Database::connect_in_memory().await.unwrap();
    let fixer = EnvironmentFixer::new(
        Arc::new(InMemoryScheduler::default()),
        Arc::new(db),
        Arc::new(RulesFile::new(Arc::new(backend))),
        ".htaccess",
    )
    .with_server(Arc::new(ServerSoftware::new(ServerKind::LiteSpeed)));
    fixer.fix_on_request(&cdn_with_cors(), false).await.unwrap();
    let text = std::fs::read_to_string(dir.path().join(".htaccess")).unwrap();
    assert!(text.starts_with("# BEGIN CDN\n"));
    assert!(text.contains("Header set Access-Control-Allow-Origin \"*\""));
    fixer.fix_after_deactivation().await.unwrap();
    assert_eq!(std::fs::read_to_string(dir.path().join(".htaccess")).unwrap(), WORDPRESS);
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn events_keep_one_job_per_task() {
    let h = harness(MockBackend::default()).await;
    let config = config(|s| {
        s.cdn.enabled = true;
        s.cdn.autoupload.enabled = true;
    });
    for _ in 0..3 {
        h.fixer.fix_on_event(&config, Event::ConfigSave, Some(&config)).await.unwrap();
    }
    let jobs = h.scheduler.jobs();
    assert_eq!(jobs.len(), 2);
    assert_eq!(h.scheduler.job(Task::QueueProcess.name()).unwrap().interval, Duration::from_secs(900));
    assert_eq!(h.scheduler.job(Task::Upload.name()).unwrap().interval, Duration::from_secs(3600));
}

#[tokio::test]
async fn changed_interval_recreates_job() {
    let h = harness(MockBackend::default()).await;
    let before = config(|s| s.cdn.enabled = true);
    h.fixer.fix_on_event(&before, Event::Activate, None).await.unwrap();
    let first = h.scheduler.job(Task::QueueProcess.name()).unwrap();

    let after = config(|s| {
        s.cdn.enabled = true;
        s.cdn.queue.interval = 60;
    });
    h.fixer.fix_on_event(&after, Event::ConfigSave, Some(&before)).await.unwrap();
    let second = h.scheduler.job(Task::QueueProcess.name()).unwrap();
    assert_eq!(second.interval, Duration::from_secs(60));
    assert_ne!(first.interval, second.interval);
    assert_eq!(h.scheduler.jobs().len(), 1);
}

#[tokio::test]
async fn unchanged_interval_keeps_job() {
    let h = harness(MockBackend::default()).await;
    let config = config(|s| s.cdn.enabled = true);
    h.fixer.fix_on_event(&config, Event::Activate, None).await.unwrap();
    let first = h.scheduler.job(Task::QueueProcess.name()).unwrap();
    h.fixer.fix_on_event(&config, Event::ConfigSave, Some(&config)).await.unwrap();
    assert_eq!(h.scheduler.job(Task::QueueProcess.name()).unwrap(), first);
}

#[tokio::test]
async fn autoupload_needs_its_own_flag() {
    let h = harness(MockBackend::default()).await;
    let enabled = config(|s| {
        s.cdn.enabled = true;
        s.cdn.autoupload.enabled = true;
    });
    h.fixer.fix_on_event(&enabled, Event::ConfigSave, None).await.unwrap();
    assert!(h.scheduler.is_scheduled(Task::Upload.name()));
    let disabled = config(|s| s.cdn.enabled = true);
    h.fixer.fix_on_event(&disabled, Event::ConfigSave, Some(&enabled)).await.unwrap();
    assert!(!h.scheduler.is_scheduled(Task::Upload.name()));
    assert!(h.scheduler.is_scheduled(Task::QueueProcess.name()));
}

#[tokio::test]
async fn disabling_cdn_cancels_jobs() {
    let h = harness(MockBackend::default()).await;
    let enabled = config(|s| {
        s.cdn.enabled = true;
        s.cdn.autoupload.enabled = true;
    });
    h.fixer.fix_on_event(&enabled, Event::ConfigSave, None).await.unwrap();
    h.fixer.fix_on_event(&Config::default(), Event::Deactivate, Some(&enabled)).await.unwrap();
    assert!(h.scheduler.jobs().is_empty());
}

#[tokio::test]
async fn mirror_engines_get_no_jobs() {
    let h = harness(MockBackend::default()).await;
    let config = config(|s| {
        s.cdn.enabled = true;
        s.cdn.autoupload.enabled = true;
        s.cdn.engine = "cf2".to_string();
    });
    h.fixer.fix_on_event(&config, Event::ConfigSave, None).await.unwrap();
    assert!(h.scheduler.jobs().is_empty());
}

struct OnlyMirrorX;
impl EngineCatalog for OnlyMirrorX {
    fn is_mirror(&self, engine: &str) -> bool {
        engine == "mirror-x"
    }
}

#[tokio::test]
async fn engine_catalog_is_consulted() {
    let Harness { scheduler, fixer, .. } = harness(MockBackend::default()).await;
    let fixer = fixer.with_engines(Arc::new(OnlyMirrorX));
    let mirror = config(|s| {
        s.cdn.enabled = true;
        s.cdn.engine = "mirror-x".to_string();
    });
    fixer.fix_on_event(&mirror, Event::ConfigSave, None).await.unwrap();
    assert!(scheduler.jobs().is_empty());
    let push = config(|s| {
        s.cdn.enabled = true;
        s.cdn.engine = "cf2".to_string();
    });
    fixer.fix_on_event(&push, Event::ConfigSave, None).await.unwrap();
    assert!(scheduler.is_scheduled(Task::QueueProcess.name()));
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tables_follow_lifecycle() {
    let h = harness(MockBackend::default()).await;
    let enabled = config(|s| s.cdn.enabled = true);

    h.fixer.fix_on_event(&Config::default(), Event::ConfigSave, None).await.unwrap();
    assert!(!queue_table_exists(&h.db).await, "disabled CDN creates no tables");

    h.fixer.fix_on_event(&enabled, Event::ConfigSave, None).await.unwrap();
    h.fixer.fix_on_event(&enabled, Event::ConfigSave, None).await.unwrap();
    let queue = QueueRepository::new(&h.db).unwrap();
    queue.enqueue("wp-content/a.css", "a.css", QueueCommand::Upload).await.unwrap();

    h.fixer.fix_on_event(&enabled, Event::ConfigSave, None).await.unwrap();
    assert_eq!(queue.pending(10).await.unwrap().len(), 1, "config save keeps rows");

    h.fixer.fix_on_event(&enabled, Event::Activate, None).await.unwrap();
    assert!(queue.pending(10).await.unwrap().is_empty(), "activation resets tables");

    h.fixer.fix_after_deactivation().await.unwrap();
    assert!(!queue_table_exists(&h.db).await);
}

// ---------------------------------------------------------------------------
// Error aggregation
// ---------------------------------------------------------------------------

/// Fails every statement that mentions `fail_on`.
struct BrokenPersistence {
    fail_on: &'static str,
    executed: Mutex<Vec<String>>,
}

#[async_trait]
impl Persistence for BrokenPersistence {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }
    fn prefix(&self) -> &str {
        "wp_"
    }
    async fn execute(&self, statement: &str) -> SchemaResult<()> {
        self.executed.lock().unwrap().push(statement.to_string());
        if statement.contains(self.fail_on) {
            exn::bail!(SchemaErrorKind::Database);
        }
        Ok(())
    }
}

fn broken_fixer(backend: MockBackend, persistence: Arc<BrokenPersistence>) -> EnvironmentFixer {
    EnvironmentFixer::new(
        Arc::new(InMemoryScheduler::default()),
        persistence,
        Arc::new(RulesFile::new(Arc::new(backend))),
        ".htaccess",
    )
    .with_server(Arc::new(ServerSoftware::new(ServerKind::Apache)))
}

#[tokio::test]
async fn deactivation_reports_every_failure() {
    let original = format!("# BEGIN CDN\nHeader set X 1\n# END CDN\n{WORDPRESS}");
    let backend = MockBackend::with_files([(".htaccess", original.as_str())]).protect(".htaccess");
    let persistence = Arc::new(BrokenPersistence { fail_on: "wp_cdn_queue", executed: Mutex::default() });
    let fixer = broken_fixer(backend, persistence.clone());

    let batch = fixer.fix_after_deactivation().await.unwrap_err();
    assert_eq!(batch.len(), 2);
    let Failure::Rules(rules) = &batch.failures()[0] else { panic!("expected rules failure first") };
    let RulesErrorKind::CredentialsRequired { content, instructions, .. } = &**rules else {
        panic!("expected credentials request, got {rules:?}");
    };
    assert!(content.is_none());
    assert!(instructions.contains("# BEGIN CDN"));
    let Failure::Schema(schema) = &batch.failures()[1] else { panic!("expected schema failure") };
    assert!(matches!(&**schema, SchemaErrorKind::DropTable(name) if name == "wp_cdn_queue"));
    // The path map was still dropped after the queue failed.
    assert!(persistence.executed.lock().unwrap().iter().any(|s| s.contains("wp_cdn_pathmap")));
}

#[tokio::test]
async fn failed_create_names_the_table() {
    let persistence = Arc::new(BrokenPersistence { fail_on: "CREATE TABLE IF NOT EXISTS \"wp_cdn_pathmap\"", executed: Mutex::default() });
    let fixer = broken_fixer(MockBackend::default(), persistence.clone());
    let batch = fixer.fix_on_event(&config(|s| s.cdn.enabled = true), Event::ConfigSave, None).await.unwrap_err();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch.to_string(), "1 environment problem(s):\n- can't create table wp_cdn_pathmap");
}

#[tokio::test]
async fn request_failure_is_batched() {
    let backend = MockBackend::with_files([(".htaccess", WORDPRESS)]).protect(".htaccess");
    let persistence = Arc::new(BrokenPersistence { fail_on: "never", executed: Mutex::default() });
    let fixer = broken_fixer(backend, persistence.clone());
    let batch = fixer.fix_on_request(&cdn_with_cors(), false).await.unwrap_err();
    let requests: Vec<_> = batch.credential_requests().collect();
    assert_eq!(requests.len(), 1);
    let RulesErrorKind::CredentialsRequired { content, instructions, .. } = requests[0] else { unreachable!() };
    assert!(content.as_deref().unwrap().starts_with("# BEGIN CDN\n"));
    assert!(instructions.contains("add the following rules above the application directives"));
    assert!(persistence.executed.lock().unwrap().is_empty(), "requests never touch tables");
}
