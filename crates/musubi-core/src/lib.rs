pub mod config;
pub mod error;
pub mod io;
pub mod orchestrator;
pub mod parse;
pub mod paths;
pub mod script_runner;
pub mod types;
pub mod worker;

pub use error::{Result, SyncError};
pub use orchestrator::SyncOrchestrator;
