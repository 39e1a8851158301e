use std::sync::Mutex;

use tokio::{
    sync::Notify,
    time::{Instant, timeout_at},
};

/// Reason the worker is woken up early.
/// Ordered so that merging two signals keeps the strongest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Wake {
    /// Schedule was replaced: next trigger must be evaluated again
    Resync,
    /// Run a cycle now, in addition to scheduled runs
    RunNow,
}

/// Run-now condition: pending predicate and its notifier.
/// Signaled by any task, consumed by the worker only.
#[derive(Debug, Default)]
pub struct WakeCondition {
    pending: Mutex<Option<Wake>>,
    notify: Notify,
}

impl WakeCondition {
    pub fn signal(&self, wake: Wake) {
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            *pending = (*pending).max(Some(wake));
        }
        self.notify.notify_one();
    }

    /// Pending signal, if any, without consuming it
    pub fn pending(&self) -> Option<Wake> {
        *self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take(&self) -> Option<Wake> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    /// Waits for a signal, until `deadline` if any.
    /// Returns None when the deadline was reached first.
    pub async fn wait(&self, deadline: Option<Instant>) -> Option<Wake> {
        loop {
            if let Some(wake) = self.take() {
                return Some(wake);
            }

            match deadline {
                Some(deadline) => {
                    if timeout_at(deadline, self.notify.notified()).await.is_err() {
                        return self.take();
                    }
                },
                None => self.notify.notified().await,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Wake, WakeCondition};
    use std::{sync::Arc, time::Duration};
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_pending_signal() {
        let condition = WakeCondition::default();
        assert_eq!(condition.pending(), None);

        condition.signal(Wake::RunNow);
        assert_eq!(condition.pending(), Some(Wake::RunNow));

        // not waiting yet: signal is retained
        assert_eq!(condition.wait(None).await, Some(Wake::RunNow));
        assert_eq!(condition.pending(), None);
    }

    #[tokio::test]
    async fn test_run_now_dominates() {
        let condition = WakeCondition::default();

        condition.signal(Wake::RunNow);
        condition.signal(Wake::Resync);
        assert_eq!(condition.pending(), Some(Wake::RunNow));

        assert_eq!(condition.wait(None).await, Some(Wake::RunNow));
    }

    #[tokio::test]
    async fn test_deadline() {
        let condition = WakeCondition::default();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(condition.wait(Some(deadline)).await, None);
    }

    #[tokio::test]
    async fn test_stale_permit() {
        let condition = WakeCondition::default();

        // consumed through the predicate, the notifier permit remains
        condition.signal(Wake::Resync);
        assert_eq!(condition.wait(None).await, Some(Wake::Resync));

        let deadline = Instant::now() + Duration::from_millis(20);
        assert_eq!(condition.wait(Some(deadline)).await, None);
    }

    #[tokio::test]
    async fn test_early_wake() {
        let condition = Arc::new(WakeCondition::default());
        let waiter = Arc::clone(&condition);

        let handle = tokio::spawn(async move {
            let deadline = Instant::now() + Duration::from_secs(3600);
            waiter.wait(Some(deadline)).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        condition.signal(Wake::RunNow);

        let woken = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(woken, Some(Wake::RunNow));
    }
}
