//! Foreground application screen time tracking
//!
//! A [`services::Sampler`] polls the OS for the focused application once per
//! tick and feeds a shared [`services::Aggregator`], which keeps lifetime and
//! per-day totals and persists them through a [`services::UsageStore`].

pub mod cli;
pub mod config;
pub mod platform;
pub mod services;
pub mod types;
