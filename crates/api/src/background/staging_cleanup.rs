//! Periodic purge of abandoned staged uploads.
//!
//! Staged images only live in memory; a user who leaves the upload step
//! without committing would otherwise hold their bytes until restart.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::staging::UploadStaging;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

/// Run the staging cleanup loop.
///
/// Drops staged images older than `ttl`. Runs until `cancel` is triggered.
pub async fn run(staging: Arc<UploadStaging>, ttl: Duration, cancel: CancellationToken) {
    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Staging cleanup job started"
    );

    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(3650));
    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Staging cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                let Some(cutoff) = Utc::now().checked_sub_signed(ttl) else {
                    continue;
                };
                let purged = staging.purge_older_than(cutoff).await;
                if purged > 0 {
                    tracing::info!(purged, "Staging cleanup: discarded abandoned uploads");
                } else {
                    tracing::debug!("Staging cleanup: nothing to discard");
                }
            }
        }
    }
}
