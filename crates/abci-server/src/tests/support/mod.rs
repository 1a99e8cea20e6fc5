//! Shared fixtures for the server test suites.

mod app;
mod config_loader;
mod reporter;
mod wire;

pub use app::RecordingApp;
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use wire::{SharedBuffer, decode_responses, encode_requests, run_block, validator};
