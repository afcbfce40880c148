pub mod events;
pub mod format;
pub mod metrics;

pub use metrics::try_init_prometheus;
