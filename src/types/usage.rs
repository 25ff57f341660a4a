//! Usage types for foreground-app time tracking

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Application identity as reported by the OS layer (process executable name).
/// Compared by exact string match only.
pub type AppId = String;

/// Per-app seconds that remember the order in which apps were first seen.
///
/// The first-seen order is the tie-break for ranking and is kept through
/// serialization, so a saved and reloaded map ranks identically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppTotals {
    order: Vec<AppId>,
    seconds: HashMap<AppId, f64>,
}

impl AppTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add seconds to an app, registering it at the end of the order if new.
    pub fn add(&mut self, app: &str, secs: f64) {
        match self.seconds.get_mut(app) {
            Some(total) => *total += secs,
            None => {
                self.order.push(app.to_string());
                self.seconds.insert(app.to_string(), secs);
            }
        }
    }

    /// Set an app's seconds, keeping its original position if already present.
    pub fn insert(&mut self, app: AppId, secs: f64) {
        if !self.seconds.contains_key(&app) {
            self.order.push(app.clone());
        }
        self.seconds.insert(app, secs);
    }

    pub fn get(&self, app: &str) -> Option<f64> {
        self.seconds.get(app).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.order
            .iter()
            .map(move |app| (app.as_str(), self.seconds.get(app).copied().unwrap_or(0.0)))
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, secs)| secs).sum()
    }

    /// Apps sorted by seconds descending, ties in first-seen order, truncated to `limit`.
    pub fn ranked(&self, limit: usize) -> Vec<(AppId, f64)> {
        let mut sorted: Vec<(AppId, f64)> = self
            .iter()
            .map(|(app, secs)| (app.to_string(), secs))
            .collect();
        // sort_by is stable, equal seconds keep first-seen order
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        sorted.truncate(limit);
        sorted
    }
}

impl Serialize for AppTotals {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for AppTotals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AppTotalsVisitor;

        impl<'de> Visitor<'de> for AppTotalsVisitor {
            type Value = AppTotals;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of application name to seconds")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<AppTotals, A::Error> {
                let mut totals = AppTotals::new();
                while let Some((app, secs)) = access.next_entry::<AppId, f64>()? {
                    if !secs.is_finite() || secs < 0.0 {
                        return Err(serde::de::Error::custom(format!(
                            "invalid seconds for {}: {}",
                            app, secs
                        )));
                    }
                    totals.insert(app, secs);
                }
                Ok(totals)
            }
        }

        deserializer.deserialize_map(AppTotalsVisitor)
    }
}

/// Lifetime seconds per app, independent of date boundaries
pub type LifetimeUsage = AppTotals;

/// Seconds per app per local calendar date
pub type DailyUsage = BTreeMap<NaiveDate, AppTotals>;

/// Both usage mappings. This is also the on-disk store document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageData {
    #[serde(default)]
    pub app_usage: LifetimeUsage,
    #[serde(default)]
    pub daily_usage: DailyUsage,
}

impl UsageData {
    pub fn is_empty(&self) -> bool {
        self.app_usage.is_empty() && self.daily_usage.is_empty()
    }
}

/// Outcome of one attribution step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// Elapsed time was added to both mappings
    Recorded,
    /// No foreground app was observed
    NoApp,
    /// Gap at or above the activity threshold (away, suspended, delayed tick)
    GapRejected,
    /// Negative or non-finite elapsed time (clock stepped backwards)
    InvalidElapsed,
    /// Tracking is off
    NotTracking,
}
