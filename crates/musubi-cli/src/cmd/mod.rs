pub mod config;
pub mod dedupe;
pub mod health;
pub mod metrics;
pub mod status;
pub mod sync;
pub mod tasks;
pub mod trigger;
pub mod watch;
