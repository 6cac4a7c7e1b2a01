use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::BlobStore;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::SweepConfig;
use crate::store::RecordStore;

/// Outcome of one orphan sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Blobs found in the store.
    pub scanned: usize,
    /// Blobs still referenced by a record.
    pub referenced: usize,
    /// Orphans removed.
    pub deleted: usize,
    /// Orphans that could not be removed.
    pub errors: usize,
}

/// Run the orphan sweep as a background task.
pub async fn run_orphan_sweep(
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    config: SweepConfig,
) {
    let scan_interval = Duration::from_secs(config.interval_secs.max(1));
    let grace = config.grace_period();

    info!(
        interval_secs = config.interval_secs,
        grace_period_secs = config.grace_period_secs,
        "Starting orphan blob sweep"
    );

    let mut interval = tokio::time::interval(scan_interval);

    loop {
        interval.tick().await;

        match sweep_orphans(records.as_ref(), blobs.as_ref(), grace, Utc::now()).await {
            Ok(report) if report.deleted > 0 || report.errors > 0 => info!(
                scanned = report.scanned,
                deleted = report.deleted,
                errors = report.errors,
                "Orphan sweep finished"
            ),
            Ok(report) => debug!(scanned = report.scanned, "Orphan sweep found nothing"),
            Err(e) => error!(error = %e, "Orphan sweep failed"),
        }
    }
}

/// Delete blobs that no record references and that are older than `grace`.
///
/// The blob listing is taken before the reference set, so an upload that
/// becomes referenced mid-sweep is seen as referenced. Uploads still waiting
/// for their record are protected by the grace period.
pub async fn sweep_orphans(
    records: &dyn RecordStore,
    blobs: &dyn BlobStore,
    grace: chrono::Duration,
    now: DateTime<Utc>,
) -> anyhow::Result<SweepReport> {
    let entries = blobs.list().await?;
    let referenced = records.referenced_blobs().await?;
    // A grace period reaching back past the representable range protects everything.
    let cutoff = now.checked_sub_signed(grace);

    let mut report = SweepReport {
        scanned: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        if referenced.contains(entry.name.as_str()) {
            report.referenced += 1;
            continue;
        }
        if cutoff.is_none_or(|cutoff| entry.modified > cutoff) {
            continue;
        }

        match blobs.delete(&entry.name).await {
            Ok(_) => {
                debug!(blob = %entry.name, size = entry.size, "Removed orphaned blob");
                report.deleted += 1;
            }
            Err(e) => {
                warn!(blob = %entry.name, error = %e, "Failed to remove orphaned blob");
                report.errors += 1;
            }
        }
    }

    Ok(report)
}
