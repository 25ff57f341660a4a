//! Text and JSON usage reports

use crate::services::{format_duration, Aggregator};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppRow {
    pub app: String,
    pub seconds: f64,
    pub duration: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageReport {
    /// Date (`YYYY-MM-DD`) or "all time"
    pub period: String,
    pub total_seconds: f64,
    pub total: String,
    pub apps: Vec<AppRow>,
}

impl UsageReport {
    fn new(period: String, total_seconds: f64, apps: Vec<(String, f64)>) -> Self {
        Self {
            period,
            total_seconds,
            total: format_duration(total_seconds),
            apps: apps
                .into_iter()
                .map(|(app, seconds)| AppRow {
                    duration: format_duration(seconds),
                    app,
                    seconds,
                })
                .collect(),
        }
    }

    /// One day's total and per-app breakdown
    pub fn for_date(aggregator: &Aggregator, date: NaiveDate) -> Self {
        Self::new(
            date.format("%Y-%m-%d").to_string(),
            aggregator.daily_total(Some(date)),
            aggregator.apps_for_date(date),
        )
    }

    /// Lifetime total and top apps
    pub fn lifetime(aggregator: &Aggregator, limit: usize) -> Self {
        Self::new(
            "all time".to_string(),
            aggregator.lifetime_total(),
            aggregator.top_apps(limit),
        )
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("Total ({}): {}\n", self.period, self.total);
        if self.apps.is_empty() {
            out.push_str("  no usage recorded\n");
            return out;
        }

        let width = self.apps.iter().map(|row| row.app.len()).max().unwrap_or(0);
        for row in &self.apps {
            out.push_str(&format!("  {:<width$}  {}\n", row.app, row.duration, width = width));
        }
        out
    }

    pub fn print(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
        } else {
            print!("{}", self.render_text());
        }
        Ok(())
    }
}
