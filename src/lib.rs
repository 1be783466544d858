// Library exports for the CLI and integration tests

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod pattern;
pub mod poller;
pub mod preview;
pub mod shutdown;
pub mod upload_queue;
