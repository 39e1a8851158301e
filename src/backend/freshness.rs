use hifitime::prelude::Duration;
use log::debug;
use tokio::sync::watch;

use crate::{
    backend::{Backend, wake::Wake},
    error::Error,
    utils::{log_time, now},
};

/// Completion condition state
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct WaitGroup {
    /// Callers currently blocked
    pub waiters: usize,
    /// Completed cycles
    pub generation: u64,
}

/// Completion condition: the worker is the only one to reset
/// the waiter count, which it does along a single broadcast.
#[derive(Debug)]
pub struct Completion {
    tx: watch::Sender<WaitGroup>,
}

/// Registered waiter
pub struct Ticket {
    rx: watch::Receiver<WaitGroup>,
    generation: u64,
}

impl Default for Completion {
    fn default() -> Self {
        let (tx, _) = watch::channel(WaitGroup::default());
        Self { tx }
    }
}

impl Completion {
    /// Register a new waiter. The [Ticket] is released by the
    /// first cycle completing after this call.
    pub fn register(&self) -> Ticket {
        let rx = self.tx.subscribe();
        let mut generation = 0;

        // registration does not wake other waiters
        self.tx.send_if_modified(|wg| {
            wg.waiters += 1;
            generation = wg.generation;
            false
        });

        Ticket { rx, generation }
    }

    /// Marks the end of a cycle, releases all waiters.
    /// Returns the number of released waiters.
    pub fn complete(&self) -> usize {
        let mut released = 0;

        self.tx.send_modify(|wg| {
            released = wg.waiters;
            wg.waiters = 0;
            wg.generation += 1;
        });

        released
    }

    pub fn state(&self) -> WaitGroup {
        *self.tx.borrow()
    }
}

impl Ticket {
    pub async fn wait(mut self) {
        let generation = self.generation;
        // Sender outlives every ticket
        let _ = self.rx.wait_for(|wg| wg.generation > generation).await;
    }
}

impl Backend {
    /// Makes sure the snapshot is no older than `max_age`. When it is,
    /// forces a cycle and blocks until a cycle completes, successfully
    /// or not: the snapshot age must be checked again by the caller.
    pub async fn ensure_fresh(&self, max_age: Duration) -> Result<(), Error> {
        let t = now()?;
        let age = self.lock().await.snapshot.age(t);

        if age <= max_age {
            return Ok(());
        }

        debug!(
            "{} - snapshot is {} old (max. {}): forcing refresh",
            log_time(t),
            age,
            max_age
        );

        let ticket = self.completion.register();
        self.wake.signal(Wake::RunNow);
        ticket.wait().await;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::Completion;
    use crate::{
        assistnow::Settings,
        backend::{
            Backend,
            schedule::{DEFAULT_CRON, Schedule},
            snapshot::Snapshot,
            wake::Wake,
        },
        utils::now,
    };
    use hifitime::prelude::Duration;
    use std::{sync::Arc, time::Duration as StdDuration};
    use tokio::time::timeout;

    fn backend() -> Arc<Backend> {
        let t = now().unwrap();
        Backend::new(Schedule::new(DEFAULT_CRON, t), Settings::default(), 65536)
    }

    async fn until_waiters(backend: &Backend, waiters: usize) {
        timeout(StdDuration::from_secs(5), async {
            while backend.completion.state().waiters < waiters {
                tokio::time::sleep(StdDuration::from_millis(1)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_single_broadcast() {
        let completion = Arc::new(Completion::default());

        let handles = (0..8)
            .map(|_| {
                let ticket = completion.register();
                tokio::spawn(ticket.wait())
            })
            .collect::<Vec<_>>();

        assert_eq!(completion.state().waiters, 8);
        assert_eq!(completion.complete(), 8);

        for handle in handles {
            timeout(StdDuration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap();
        }

        let state = completion.state();
        assert_eq!(state.waiters, 0);
        assert_eq!(state.generation, 1);
    }

    #[tokio::test]
    async fn test_completed_before_wait() {
        let completion = Completion::default();
        let ticket = completion.register();
        completion.complete();

        timeout(StdDuration::from_secs(5), ticket.wait())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_does_not_block() {
        let backend = backend();

        // empty snapshot
        backend.ensure_fresh(Duration::ZERO).await.unwrap();
        assert_eq!(backend.wake.pending(), None);

        let t = now().unwrap();
        backend.lock().await.snapshot = Snapshot::new(vec![], vec![], t);

        backend
            .ensure_fresh(Duration::from_seconds(30.0))
            .await
            .unwrap();

        assert_eq!(backend.wake.pending(), None);
        assert_eq!(backend.completion.state().waiters, 0);
    }

    #[tokio::test]
    async fn test_stale_blocks_until_completion() {
        let backend = backend();
        let t = now().unwrap() - Duration::from_hours(1.0);
        backend.lock().await.snapshot = Snapshot::new(vec![], vec![], t);

        let handles = (0..4)
            .map(|_| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    backend
                        .ensure_fresh(Duration::from_seconds(30.0))
                        .await
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        until_waiters(&backend, 4).await;
        assert_eq!(backend.wake.pending(), Some(Wake::RunNow));

        for handle in handles.iter() {
            assert!(!handle.is_finished());
        }

        // one cycle releases everyone
        assert_eq!(backend.completion.complete(), 4);

        for handle in handles {
            timeout(StdDuration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
