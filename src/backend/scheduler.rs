use std::{sync::Arc, time::Duration as StdDuration};

use hifitime::prelude::{Duration, Epoch};
use itertools::Itertools;
use log::{debug, error, info, trace, warn};
use tokio::time::Instant;

use crate::{
    assistnow::Downloader,
    backend::{Backend, schedule::NextRun, snapshot::Snapshot, wake::Wake},
    error::Error,
    ubx::{Packet, decode_batch},
    utils::{log_time, now},
};

/// Worker state, between two cycles
#[derive(Debug, Copy, Clone, PartialEq)]
enum State {
    ComputeNext,
    /// Sleeping until deadline or early wake
    Sleeping(Epoch),
    /// Invalid schedule: waiting for a new schedule or a run-now
    AwaitingResync,
    /// Fetch, decode, publish
    Cycle,
}

/// Background worker refreshing the [Backend] snapshot.
pub struct Scheduler<D: Downloader> {
    backend: Arc<Backend>,
    downloader: D,
}

fn describe(packets: &[Packet]) -> String {
    packets
        .iter()
        .filter_map(|pkt| pkt.constellation())
        .counts()
        .into_iter()
        .sorted_by_key(|(constellation, _)| constellation.to_string())
        .map(|(constellation, count)| format!("{}: {}", constellation, count))
        .join(", ")
}

/// Logged once, when entering [State::AwaitingResync]
const RESYNC_NOTICE: &str = "invalid cron schedule - waiting for resync event";

fn resync_notice(t: Epoch) -> String {
    format!("{} - {}", log_time(t), RESYNC_NOTICE)
}

/// Sleeping strategy, towards next trigger
#[derive(Debug, PartialEq)]
enum Sleep {
    /// Trigger is due
    Due,
    /// Sleep until deadline or early wake
    Until(Instant),
    /// System time is unknown: only a signal may wake us up
    UntilSignal,
}

/// How to wait for trigger `t`, as of `now`
fn plan(t: Epoch, now: Result<Epoch, Error>) -> Sleep {
    let now = match now {
        Ok(now) => now,
        Err(e) => {
            error!("{} - waiting for next signal", e);
            return Sleep::UntilSignal;
        },
    };

    let delay = t - now;
    if delay <= Duration::ZERO {
        Sleep::Due
    } else {
        let nanos = delay.total_nanoseconds() as u64;
        Sleep::Until(Instant::now() + StdDuration::from_nanos(nanos))
    }
}

impl<D: Downloader> Scheduler<D> {
    pub fn new(backend: Arc<Backend>, downloader: D) -> Self {
        Self {
            backend,
            downloader,
        }
    }

    /// Runs forever
    pub async fn run(self) {
        let mut state = State::ComputeNext;
        let mut awaiting_resync = false;

        loop {
            state = match state {
                State::ComputeNext => {
                    let next = {
                        let data = self.backend.lock().await;
                        data.schedule.next_trigger(data.schedule.basis)
                    };

                    match next {
                        NextRun::Invalid => State::AwaitingResync,
                        NextRun::At(t) => {
                            awaiting_resync = false;
                            State::Sleeping(t)
                        },
                    }
                },
                State::Sleeping(t) => match plan(t, now()) {
                    Sleep::Due => State::Cycle,
                    Sleep::Until(deadline) => {
                        trace!("next run: {}", log_time(t));

                        match self.backend.wake.wait(Some(deadline)).await {
                            Some(Wake::Resync) => State::ComputeNext,
                            Some(Wake::RunNow) | None => State::Cycle,
                        }
                    },
                    Sleep::UntilSignal => match self.backend.wake.wait(None).await {
                        Some(Wake::RunNow) => State::Cycle,
                        _ => State::ComputeNext,
                    },
                },
                State::AwaitingResync => {
                    if !awaiting_resync {
                        match now() {
                            Ok(t) => warn!("{}", resync_notice(t)),
                            Err(_) => warn!("{}", RESYNC_NOTICE),
                        }
                        awaiting_resync = true;
                    }

                    match self.backend.wake.wait(None).await {
                        Some(Wake::RunNow) => State::Cycle,
                        _ => State::ComputeNext,
                    }
                },
                State::Cycle => {
                    self.cycle().await;
                    State::ComputeNext
                },
            };
        }
    }

    /// One cycle. Waiters are always released, whatever the outcome.
    async fn cycle(&self) {
        match self.refresh().await {
            Ok(t) => {
                let data = self.backend.lock().await;
                info!(
                    "{} - UBX AssistNow downloaded: {} packets ({} bytes) {}",
                    log_time(t),
                    data.snapshot.len(),
                    data.snapshot.raw().len(),
                    describe(data.snapshot.packets()),
                );
            },
            Err(e) => match now() {
                Ok(t) => error!("{} - {}", log_time(t), e),
                Err(_) => error!("{}", e),
            },
        }

        if let Ok(t) = now() {
            self.backend.lock().await.schedule.basis = t;
        }

        let released = self.backend.completion.complete();
        if released > 0 {
            debug!("released {} waiter(s)", released);
        }
    }

    /// Fetch, decode and publish. The data lock is not held while downloading.
    async fn refresh(&self) -> Result<Epoch, Error> {
        let url = self.backend.lock().await.settings.url()?;

        let bytes = self.downloader.download(&url, self.backend.max_size).await?;

        let packets = decode_batch(&bytes)?;
        let t = now()?;

        self.backend.lock().await.snapshot = Snapshot::new(packets, bytes, t);
        Ok(t)
    }
}
