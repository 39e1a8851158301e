//! AssistNow backend: cached snapshot, refresh worker
//! and freshness synchronization.
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::assistnow::Settings;

pub mod freshness;
pub mod schedule;
pub mod scheduler;
pub mod snapshot;
pub mod wake;

use freshness::Completion;
use schedule::Schedule;
use snapshot::Snapshot;
use wake::{Wake, WakeCondition};

/// Everything guarded by the data lock
#[derive(Debug)]
pub struct Data {
    pub schedule: Schedule,
    pub settings: Settings,
    pub snapshot: Snapshot,
}

/// Backend context, shared by the worker and every client session.
#[derive(Debug)]
pub struct Backend {
    data: Mutex<Data>,
    /// Run-now condition
    pub wake: WakeCondition,
    /// Completion condition
    pub completion: Completion,
    /// Download size limit
    pub max_size: usize,
}

impl Backend {
    pub fn new(schedule: Schedule, settings: Settings, max_size: usize) -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(Data {
                schedule,
                settings,
                snapshot: Snapshot::default(),
            }),
            wake: Default::default(),
            completion: Default::default(),
            max_size,
        })
    }

    /// Acquires the data lock
    pub async fn lock(&self) -> MutexGuard<'_, Data> {
        self.data.lock().await
    }

    /// Requests a cycle, in addition to scheduled runs
    pub fn run_now(&self) {
        self.wake.signal(Wake::RunNow);
    }

    /// Replaces the cron expression and has the worker evaluate it.
    /// The parsing error, if any, is returned to the caller and the
    /// worker stays idle until the schedule is corrected.
    pub async fn replace_schedule(&self, expression: &str) -> Result<(), crate::error::Error> {
        let ret = self.lock().await.schedule.replace(expression);
        self.wake.signal(Wake::Resync);
        ret
    }
}
