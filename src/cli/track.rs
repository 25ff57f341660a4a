//! `screentrack track` subcommand: sample the focused app until Ctrl-C

use anyhow::Context;
use chrono::Local;
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::cli::report::UsageReport;
use crate::config::TrackerConfig;
use crate::platform;
use crate::services::{Aggregator, Sampler, UsageStore};
use crate::types::ScreentrackError;

/// Track foreground application usage
#[derive(Args, Debug, Default)]
pub struct TrackArgs {
    /// Seconds between samples
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Seconds between printed reports
    #[arg(long, value_name = "SECS")]
    pub refresh: Option<u64>,

    /// Start empty if the usage store is corrupt (it is overwritten on the next save)
    #[arg(long)]
    pub discard_corrupt: bool,
}

impl TrackArgs {
    pub fn apply(&self, config: &mut TrackerConfig) {
        if let Some(interval) = self.interval {
            config.tick_interval_secs = interval;
        }
        if let Some(refresh) = self.refresh {
            config.refresh_interval_secs = refresh;
        }
    }

    pub fn run(self, mut config: TrackerConfig, store: UsageStore) -> anyhow::Result<()> {
        self.apply(&mut config);
        config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(self.track(config, store))
    }

    async fn track(self, config: TrackerConfig, store: UsageStore) -> anyhow::Result<()> {
        let aggregator = Arc::new(Aggregator::with_threshold(config.activity_threshold_secs));

        match aggregator.load(&store) {
            Ok(true) => log::info!("loaded usage from {}", store.path().display()),
            Ok(false) => log::info!(
                "no usage store at {}, starting empty",
                store.path().display()
            ),
            Err(e @ ScreentrackError::CorruptStore { .. }) if self.discard_corrupt => {
                log::warn!("{}; starting empty", e)
            }
            Err(e) => {
                return Err(e).context("failed to load usage store (use --discard-corrupt to start over)")
            }
        }

        let sampler = Arc::new(
            Sampler::new(aggregator, platform::native_source(), store)
                .with_tick_interval(config.tick_interval()),
        );
        let cancel = CancellationToken::new();

        sampler.start();
        let sampler_task = tokio::spawn(Arc::clone(&sampler).run(cancel.clone()));
        let refresh_task = tokio::spawn(refresh_loop(
            Arc::clone(&sampler),
            config.refresh_interval(),
            config.autosave_interval(),
            cancel.clone(),
        ));

        let signal = tokio::signal::ctrl_c().await;
        let stopped = shutdown(&sampler, &cancel, vec![sampler_task, refresh_task]).await;

        signal.context("failed to listen for Ctrl-C")?;
        stopped.context("failed to save usage on stop")?;
        UsageReport::for_date(sampler.aggregator(), Local::now().date_naive()).print(false)?;
        UsageReport::lifetime(sampler.aggregator(), config.top_limit).print(false)?;
        Ok(())
    }
}

/// Cancel the background tasks, wait for them, then stop and flush.
/// Runs on every exit path so tracked time is never dropped unsaved.
async fn shutdown(
    sampler: &Sampler,
    cancel: &CancellationToken,
    tasks: Vec<JoinHandle<()>>,
) -> crate::types::Result<()> {
    cancel.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            log::warn!("background task ended abnormally: {}", e);
        }
    }
    sampler.stop()
}

/// Periodic report and autosave, independent of the tick cadence
async fn refresh_loop(
    sampler: Arc<Sampler>,
    refresh_interval: Duration,
    autosave_interval: Duration,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now();
    let mut refresh = tokio::time::interval_at(start + refresh_interval, refresh_interval);
    let mut autosave = tokio::time::interval_at(start + autosave_interval, autosave_interval);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
    autosave.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = refresh.tick() => {
                if sampler.is_tracking() {
                    let report = UsageReport::for_date(sampler.aggregator(), Local::now().date_naive());
                    print!("{}", report.render_text());
                }
            }
            _ = autosave.tick() => {
                if let Err(e) = sampler.flush() {
                    log::error!("autosave failed: {}", e);
                }
            }
            _ = cancel.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ForegroundSource, NullSource};
    use crate::types::{AppId, Result};
    use tempfile::TempDir;

    struct FixedSource;

    impl ForegroundSource for FixedSource {
        fn name(&self) -> &str {
            "fixed"
        }

        fn foreground_app(&self) -> Result<Option<AppId>> {
            Ok(Some("code".into()))
        }
    }

    #[tokio::test]
    async fn test_shutdown_stops_tasks_and_flushes() {
        let temp_dir = TempDir::new().unwrap();
        let store = UsageStore::with_path(temp_dir.path().join("usage.json"));
        let sampler = Arc::new(
            Sampler::new(Arc::new(Aggregator::new()), Arc::new(FixedSource), store)
                .with_tick_interval(Duration::from_millis(10)),
        );
        let cancel = CancellationToken::new();

        sampler.start();
        let task = tokio::spawn(Arc::clone(&sampler).run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(80)).await;

        shutdown(&sampler, &cancel, vec![task]).await.unwrap();

        assert!(cancel.is_cancelled());
        assert!(!sampler.is_tracking());
        let stored = sampler.store().load().unwrap().unwrap();
        assert_eq!(stored, sampler.aggregator().snapshot());
        assert!(stored.app_usage.get("code").is_some());
    }

    #[tokio::test]
    async fn test_shutdown_reports_save_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let sampler = Sampler::new(
            Arc::new(Aggregator::new()),
            Arc::new(NullSource),
            UsageStore::with_path(blocker.join("usage.json")),
        );
        let cancel = CancellationToken::new();

        sampler.start();
        assert!(shutdown(&sampler, &cancel, Vec::new()).await.is_err());
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_apply_overrides_config() {
        let args = TrackArgs {
            interval: Some(2),
            refresh: Some(30),
            discard_corrupt: false,
        };
        let mut config = TrackerConfig::default();
        args.apply(&mut config);

        assert_eq!(config.tick_interval_secs, 2);
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.autosave_interval_secs, 60);
    }

    #[test]
    fn test_apply_without_flags_keeps_config() {
        let mut config = TrackerConfig::default();
        TrackArgs::default().apply(&mut config);
        assert_eq!(config, TrackerConfig::default());
    }
}
