//! Criterion benchmarks for the attribution and query paths

use chrono::{Duration, Local, NaiveDate, TimeZone};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use screentrack::services::{format_duration, Aggregator};
use screentrack::types::{AppTotals, UsageData};
use std::hint::black_box;

/// A year of history over `apps` applications
fn build_history(apps: usize) -> UsageData {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut data = UsageData::default();

    for day in 0..365 {
        let date = start + Duration::days(day);
        let mut totals = AppTotals::new();
        for app in 0..apps {
            let name = format!("app-{}", app);
            let secs = ((day as usize * 31 + app * 17) % 3600) as f64;
            totals.add(&name, secs);
            data.app_usage.add(&name, secs);
        }
        data.daily_usage.insert(date, totals);
    }
    data
}

fn bench_attribute(c: &mut Criterion) {
    let aggregator = Aggregator::new();
    let now = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap();
    let apps = ["code", "firefox", "alacritty", "slack"];

    let mut group = c.benchmark_group("aggregator");
    group.throughput(Throughput::Elements(1));

    let mut i = 0usize;
    group.bench_function("attribute", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            aggregator.attribute(black_box(1.0), Some(apps[i % apps.len()]), now)
        });
    });

    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregator");

    for apps in [10usize, 100, 1000] {
        let aggregator = Aggregator::from_data(build_history(apps));
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        group.bench_with_input(BenchmarkId::new("top_apps", apps), &aggregator, |b, agg| {
            b.iter(|| agg.top_apps(black_box(20)));
        });

        group.bench_with_input(BenchmarkId::new("daily_total", apps), &aggregator, |b, agg| {
            b.iter(|| agg.daily_total(black_box(Some(date))));
        });
    }

    group.finish();
}

fn bench_format_duration(c: &mut Criterion) {
    c.bench_function("format_duration", |b| {
        b.iter(|| format_duration(black_box(90061.5)));
    });
}

criterion_group!(benches, bench_attribute, bench_queries, bench_format_duration);
criterion_main!(benches);
