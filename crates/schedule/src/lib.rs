//! Recurring job registration.
//!
//! The host owns the timer that actually fires jobs; this crate only keeps
//! the job registry in the right shape: at most one job per [`Task`], created
//! at the configured interval and recreated (never mutated) when the
//! interval changes.

mod memory;

pub use crate::memory::{InMemoryScheduler, Job};
use std::fmt;
use std::time::Duration;
use time::UtcDateTime;

/// Registry of recurring jobs provided by the host.
///
/// Each method is expected to be atomic on its own. None of them can fail:
/// hosts back this with an in-process registry.
pub trait Scheduler: Send + Sync {
    fn is_scheduled(&self, task: &str) -> bool;
    /// Registers `task` to fire at `first_fire` and every `interval` after.
    fn schedule(&self, task: &str, first_fire: UtcDateTime, interval: Duration);
    fn unschedule(&self, task: &str);
}

/// Background tasks this crate keeps registered.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Task {
    /// Drains the upload/delete/purge queue.
    QueueProcess,
    /// Mirrors new local content to the CDN.
    Upload,
}
impl Task {
    pub const fn name(self) -> &'static str {
        match self {
            Self::QueueProcess => "cdn_cron_queue_process",
            Self::Upload => "cdn_cron_upload",
        }
    }
}
impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keeps [`Task`] registrations in line with the configuration.
///
/// # Examples
///
/// ```
/// use cdnenv_schedule::{InMemoryScheduler, ScheduleManager, Task};
/// use std::time::Duration;
///
/// let registry = InMemoryScheduler::default();
/// let schedules = ScheduleManager::new(&registry);
/// schedules.ensure_scheduled(Task::QueueProcess, Duration::from_secs(900));
/// schedules.ensure_scheduled(Task::QueueProcess, Duration::from_secs(900));
/// assert_eq!(registry.jobs().len(), 1);
/// ```
#[derive(Clone, Copy)]
pub struct ScheduleManager<'a> {
    scheduler: &'a dyn Scheduler,
}

impl<'a> ScheduleManager<'a> {
    pub fn new(scheduler: &'a dyn Scheduler) -> Self {
        Self { scheduler }
    }

    /// Registers `task` firing now and every `interval` after, unless a job
    /// for it already exists. An existing job is left untouched even if its
    /// interval differs; see [`reschedule`](Self::reschedule).
    pub fn ensure_scheduled(&self, task: Task, interval: Duration) {
        if self.scheduler.is_scheduled(task.name()) {
            tracing::debug!(%task, "Job already scheduled");
            return;
        }
        self.scheduler.schedule(task.name(), UtcDateTime::now(), interval);
        tracing::info!(%task, interval_secs = interval.as_secs(), "Job scheduled");
    }

    /// Cancels `task` when its interval changed, so the next
    /// [`ensure_scheduled`](Self::ensure_scheduled) recreates it.
    pub fn reschedule(&self, task: Task, old: Duration, new: Duration) {
        if old != new {
            tracing::debug!(%task, old_secs = old.as_secs(), new_secs = new.as_secs(), "Job interval changed");
            self.unschedule(task);
        }
    }

    /// Cancels `task` if it is registered.
    pub fn unschedule(&self, task: Task) {
        if self.scheduler.is_scheduled(task.name()) {
            self.scheduler.unschedule(task.name());
            tracing::info!(%task, "Job unscheduled");
        }
    }
}
