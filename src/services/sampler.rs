//! Sampler driving periodic foreground observation
//!
//! Each tick asks the OS layer for the focused app outside of any lock and
//! hands `(elapsed, app, now)` to the [`Aggregator`].

use crate::platform::ForegroundSource;
use crate::services::{Aggregator, UsageStore};
use crate::types::{AppId, Attribution, Result};
use chrono::{DateTime, Local};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Default tick period
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct TrackerState {
    pub is_tracking: bool,
    pub last_tick_time: DateTime<Local>,
}

pub struct Sampler {
    aggregator: Arc<Aggregator>,
    source: Arc<dyn ForegroundSource>,
    store: UsageStore,
    state: Mutex<TrackerState>,
    /// Lookup that outlived its tick; no new lookup starts until it finishes
    pending_lookup: Mutex<Option<JoinHandle<Option<AppId>>>>,
    tick_interval: Duration,
}

impl Sampler {
    pub fn new(
        aggregator: Arc<Aggregator>,
        source: Arc<dyn ForegroundSource>,
        store: UsageStore,
    ) -> Self {
        Self {
            aggregator,
            source,
            store,
            state: Mutex::new(TrackerState {
                is_tracking: false,
                last_tick_time: Local::now(),
            }),
            pending_lookup: Mutex::new(None),
            tick_interval: TICK_INTERVAL,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn store(&self) -> &UsageStore {
        &self.store
    }

    pub fn state(&self) -> TrackerState {
        *self.lock_state()
    }

    pub fn is_tracking(&self) -> bool {
        self.lock_state().is_tracking
    }

    pub fn start(&self) {
        self.start_at(Local::now());
    }

    /// Begin tracking with `now` as the reference time. Calling this while
    /// already tracking only resets the reference time.
    pub fn start_at(&self, now: DateTime<Local>) {
        let mut state = self.lock_state();
        if !state.is_tracking {
            log::info!("tracking started");
        }
        state.is_tracking = true;
        state.last_tick_time = now;
    }

    /// Stop tracking and flush the aggregates to the store.
    pub fn stop(&self) -> Result<()> {
        let was_tracking = {
            let mut state = self.lock_state();
            std::mem::replace(&mut state.is_tracking, false)
        };
        if was_tracking {
            log::info!("tracking stopped");
        }
        self.flush()
    }

    /// Save the aggregates now
    pub fn flush(&self) -> Result<()> {
        self.aggregator.save(&self.store)?;
        log::debug!("saved usage to {}", self.store.path().display());
        Ok(())
    }

    /// One tick with a synchronous lookup
    pub fn tick(&self, now: DateTime<Local>) -> Attribution {
        if !self.is_tracking() {
            return Attribution::NotTracking;
        }
        let app = self.source.sample_foreground_app();
        self.record(now, app)
    }

    /// Apply an observation made at `now`.
    ///
    /// The reference time advances even when nothing is attributed so that
    /// a rejected gap does not carry into the next tick. It never moves
    /// backwards: an observation older than the last `start` is skipped.
    pub fn record(&self, now: DateTime<Local>, app: Option<AppId>) -> Attribution {
        let mut state = self.lock_state();
        if !state.is_tracking {
            return Attribution::NotTracking;
        }

        let elapsed = (now - state.last_tick_time)
            .num_microseconds()
            .map(|us| us as f64 / 1_000_000.0)
            .unwrap_or(f64::INFINITY);
        if now > state.last_tick_time {
            state.last_tick_time = now;
        }

        let outcome = self.aggregator.attribute(elapsed, app.as_deref(), now);
        match outcome {
            Attribution::GapRejected => {
                log::info!("ignoring {:.1}s gap since last tick", elapsed)
            }
            Attribution::InvalidElapsed => {
                log::warn!("clock moved backwards by {:.3}s, tick skipped", -elapsed)
            }
            _ => {}
        }
        outcome
    }

    /// Look up the focused app on a blocking worker, bounded by the tick period.
    ///
    /// A lookup that times out keeps its worker; until it finishes, further
    /// ticks observe no app instead of starting another one.
    pub async fn sample(&self) -> Option<AppId> {
        {
            let mut pending = self
                .pending_lookup
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if pending.as_ref().is_some_and(|handle| !handle.is_finished()) {
                log::debug!("previous foreground lookup still running, counting as no app");
                return None;
            }
            // a late answer belongs to an earlier tick
            *pending = None;
        }

        let source = Arc::clone(&self.source);
        let mut lookup = tokio::task::spawn_blocking(move || source.sample_foreground_app());

        match tokio::time::timeout(self.tick_interval, &mut lookup).await {
            Ok(Ok(app)) => app,
            Ok(Err(e)) => {
                log::warn!("foreground lookup worker failed: {}", e);
                None
            }
            Err(_) => {
                log::debug!(
                    "foreground lookup exceeded {}ms, counting as no app",
                    self.tick_interval.as_millis()
                );
                *self
                    .pending_lookup
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(lookup);
                None
            }
        }
    }

    /// Tick until cancelled. Stopping only prevents the next tick's lookup;
    /// a tick already in flight completes.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_tracking() {
                        continue;
                    }
                    let now = Local::now();
                    let app = self.sample().await;
                    self.record(now, app);
                }
                _ = cancel.cancelled() => {
                    log::info!("sampler shutting down");
                    break;
                }
            }
        }
    }
}
