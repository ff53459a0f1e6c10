//! server_core: plumbing shared by the TCP services.
//!
//! - `telemetry`: tracing subscriber + optional Prometheus exporter.
//! - `shutdown`: watch-based stop signal with Ctrl-C hookup.
//! - `listener`: accept loop spawning one task per connection.

pub mod listener;
pub mod shutdown;
pub mod telemetry;

pub use shutdown::{Shutdown, ShutdownSignal};
