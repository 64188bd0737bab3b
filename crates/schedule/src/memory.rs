//! In-process job registry.

use crate::Scheduler;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use time::UtcDateTime;

/// A registered recurring job.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Job {
    pub task: String,
    pub first_fire: UtcDateTime,
    pub interval: Duration,
}

/// [`Scheduler`] keeping jobs in a map behind a [`Mutex`].
///
/// Good enough for hosts that run their own timer loop over
/// [`jobs`](Self::jobs), and for tests.
#[derive(Debug, Default)]
pub struct InMemoryScheduler {
    jobs: Mutex<BTreeMap<String, Job>>,
}

impl InMemoryScheduler {
    /// Snapshot of all registered jobs, ordered by task name.
    pub fn jobs(&self) -> Vec<Job> {
        self.lock().values().cloned().collect()
    }

    pub fn job(&self, task: &str) -> Option<Job> {
        self.lock().get(task).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Job>> {
        // Every critical section is a single map operation, so a poisoned
        // map is still consistent.
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for InMemoryScheduler {
    fn is_scheduled(&self, task: &str) -> bool {
        self.lock().contains_key(task)
    }

    fn schedule(&self, task: &str, first_fire: UtcDateTime, interval: Duration) {
        let job = Job { task: task.to_string(), first_fire, interval };
        self.lock().insert(task.to_string(), job);
    }

    fn unschedule(&self, task: &str) {
        self.lock().remove(task);
    }
}
