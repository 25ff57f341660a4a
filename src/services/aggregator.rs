//! Aggregator service owning the usage mappings
//!
//! Both mappings live behind one mutex so every attribution updates them
//! together and every read sees them in the same state.

use crate::services::UsageStore;
use crate::types::{AppId, Attribution, Result, UsageData};
use chrono::{DateTime, Local, NaiveDate};
use std::sync::{Mutex, MutexGuard};

/// Gaps at or above this many seconds are not counted as active time
pub const ACTIVITY_THRESHOLD_SECS: f64 = 5.0;

/// Aggregator for per-app and per-day usage
pub struct Aggregator {
    data: Mutex<UsageData>,
    activity_threshold: f64,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self::with_threshold(ACTIVITY_THRESHOLD_SECS)
    }

    pub fn with_threshold(activity_threshold: f64) -> Self {
        Self {
            data: Mutex::new(UsageData::default()),
            activity_threshold,
        }
    }

    pub fn from_data(data: UsageData) -> Self {
        Self {
            data: Mutex::new(data),
            activity_threshold: ACTIVITY_THRESHOLD_SECS,
        }
    }

    // A panic while holding the lock cannot leave the mappings half-updated
    // (attribution finishes both additions before releasing), so a poisoned
    // lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, UsageData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attribute one tick's elapsed seconds to the app observed at the end of the tick.
    ///
    /// Lifetime and daily totals are updated in the same critical section.
    pub fn attribute(&self, elapsed: f64, app: Option<&str>, now: DateTime<Local>) -> Attribution {
        let Some(app) = app else {
            return Attribution::NoApp;
        };
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Attribution::InvalidElapsed;
        }
        if elapsed >= self.activity_threshold {
            return Attribution::GapRejected;
        }

        let today = now.date_naive();
        let mut data = self.lock();
        data.app_usage.add(app, elapsed);
        data.daily_usage.entry(today).or_default().add(app, elapsed);
        Attribution::Recorded
    }

    /// Lifetime top apps by seconds, ties in first-seen order
    pub fn top_apps(&self, limit: usize) -> Vec<(AppId, f64)> {
        self.lock().app_usage.ranked(limit)
    }

    /// Total seconds for a date (today when `None`). Unknown dates are 0.
    pub fn daily_total(&self, date: Option<NaiveDate>) -> f64 {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        self.lock()
            .daily_usage
            .get(&date)
            .map(|apps| apps.total())
            .unwrap_or(0.0)
    }

    /// Per-app seconds for one date, sorted descending
    pub fn apps_for_date(&self, date: NaiveDate) -> Vec<(AppId, f64)> {
        self.lock()
            .daily_usage
            .get(&date)
            .map(|apps| apps.ranked(usize::MAX))
            .unwrap_or_default()
    }

    /// Sum of all lifetime seconds
    pub fn lifetime_total(&self) -> f64 {
        self.lock().app_usage.total()
    }

    /// Dates with recorded usage, ascending
    pub fn tracked_dates(&self) -> Vec<NaiveDate> {
        self.lock().daily_usage.keys().copied().collect()
    }

    /// Consistent copy of both mappings
    pub fn snapshot(&self) -> UsageData {
        self.lock().clone()
    }

    /// Write both mappings to the store.
    ///
    /// The snapshot is taken under the lock, the file write happens after
    /// releasing it so ticks are not blocked on disk I/O.
    pub fn save(&self, store: &UsageStore) -> Result<()> {
        let data = self.snapshot();
        store.save(&data)
    }

    /// Replace the mappings with the stored document.
    ///
    /// Returns `Ok(false)` when no store exists (mappings left as they are).
    /// On error the in-memory mappings are untouched.
    pub fn load(&self, store: &UsageStore) -> Result<bool> {
        match store.load()? {
            Some(loaded) => {
                *self.lock() = loaded;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Render seconds as `HH:MM:SS`, truncating each unit. Hours are not wrapped at 24.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}
