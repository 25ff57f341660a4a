//! Services for usage tracking, aggregation and persistence

pub mod aggregator;
pub mod sampler;
pub mod store;

pub use aggregator::{format_duration, Aggregator, ACTIVITY_THRESHOLD_SECS};
pub use sampler::{Sampler, TrackerState};
pub use store::UsageStore;
