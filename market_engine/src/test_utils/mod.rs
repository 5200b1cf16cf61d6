//! Helpers for testing the engine and the code that builds on it. Only compiled for tests, or with the `test_utils`
//! feature.
pub mod fake_gateway;
pub mod fixtures;
pub mod prepare_env;
pub mod recording_notifier;

pub use fake_gateway::{FakeGateway, FAKE_WEBHOOK_SIGNATURE};
pub use recording_notifier::RecordingNotifier;
