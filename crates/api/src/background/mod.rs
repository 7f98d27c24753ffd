//! Housekeeping loops spawned from `main` next to the HTTP server.
//!
//! Each stops when its `CancellationToken` is cancelled during shutdown.

pub mod staging_cleanup;
