//! Background sweeper that lifts timed mutes once they expire.
//!
//! One managed task polls the restriction store on a fixed interval; there are
//! no per-mute timers. Lifecycle is `Stopped -> Running -> Stopped`, with
//! cancellation taking effect between sweeps only.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{moderation::store::RestrictionStore, Result};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ExpiryScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: Arc<dyn RestrictionStore>,
    period: Duration,
    task: Mutex<Option<SweepTask>>,
}

struct SweepTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ExpiryScheduler {
    pub fn new(store: Arc<dyn RestrictionStore>, period: Duration) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                period: period.max(Duration::from_millis(1)),
                task: Mutex::new(None),
            }),
        }
    }

    pub fn period(&self) -> Duration {
        self.inner.period
    }

    /// Spawn the sweep loop. Returns `false` (and does nothing else) if it is
    /// already running.
    pub async fn start(&self) -> bool {
        let mut task = self.inner.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            tracing::info!("mute expiry scheduler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sweep_loop(
            self.inner.store.clone(),
            self.inner.period,
            cancel.clone(),
        ));
        *task = Some(SweepTask { cancel, handle });

        tracing::info!(
            interval_secs = self.inner.period.as_secs(),
            "mute expiry scheduler started"
        );
        true
    }

    /// Cancel the loop and wait for an in-flight sweep to finish.
    ///
    /// Safe to call when already stopped.
    pub async fn stop(&self) {
        let Some(task) = self.inner.task.lock().await.take() else {
            return;
        };

        task.cancel.cancel();
        if let Err(e) = task.handle.await {
            tracing::error!(error = %e, "mute expiry scheduler task ended abnormally");
        }
        tracing::info!("mute expiry scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Run one sweep immediately, independent of the background loop.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize> {
        sweep(self.inner.store.as_ref(), now).await
    }
}

/// Find expired timed mutes and clear them in one batch.
pub async fn sweep(store: &dyn RestrictionStore, now: DateTime<Utc>) -> Result<usize> {
    let expired = store.expired(now).await?;
    if expired.is_empty() {
        return Ok(0);
    }
    store.clear_expired(&expired, now).await
}

async fn sweep_loop(store: Arc<dyn RestrictionStore>, period: Duration, cancel: CancellationToken) {
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                match sweep(store.as_ref(), Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(cleared = n, "expired mutes cleared"),
                    // The next tick retries the same query.
                    Err(e) => tracing::error!(error = %e, "mute expiry sweep failed"),
                }
            }
        }
    }
}
