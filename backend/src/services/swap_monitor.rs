//! # Swap Monitor Service
//!
//! Background task that keeps the index in step with the chain.
//!
//! ## Monitoring Flow
//!
//! ```text
//! SwapMonitor (background task)
//!              │
//!              └── Every SWAP_SYNC_INTERVAL seconds:
//!                    ├── refresh every open swap from chain
//!                    ├── drop PENDING swaps whose new_swap never landed
//!                    └── warn about swaps stuck in INITIATED
//! ```
//!
//! The program has no expiry for `Initiated` swaps; escrowed Onramp funds
//! stay in the vault until the operator completes the swap. The stale
//! warning is the operator's cue to attest one way or the other.

use std::time::Duration;

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::db::models::SwapRecord;
use crate::db::{queries, Database};
use crate::services::swap_manager::{refresh_swap, SwapServiceError};
use crate::solana::layout::SwapStatus;
use crate::solana::SolanaClient;
use crate::utils::parse_pubkey;

/// A prepared `new_swap` whose blockhash is long expired.
const PENDING_EXPIRY_SECS: i64 = 300;

/// Open swaps examined per pass.
const BATCH_SIZE: i64 = 200;

/// Counters from one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub checked: usize,
    pub updated: usize,
    pub dropped: usize,
    pub stale: usize,
}

/// `true` once a swap has sat in `Initiated` for at least `threshold_secs`.
pub fn is_stale(record: &SwapRecord, now: DateTime<Utc>, threshold_secs: i64) -> bool {
    match (record.chain_status(), record.initiated_at) {
        (Some(SwapStatus::Initiated), Some(initiated_at)) => {
            (now - initiated_at).num_seconds() >= threshold_secs
        }
        _ => false,
    }
}

/// `true` for a pending swap whose `new_swap` can no longer land.
pub fn is_expired_pending(record: &SwapRecord, now: DateTime<Utc>) -> bool {
    record.chain_status().is_none() && (now - record.created_at).num_seconds() >= PENDING_EXPIRY_SECS
}

/// The Swap Monitor service.
///
/// ## Usage
///
/// ```rust,ignore
/// let monitor = SwapMonitor::new(db, solana, config);
///
/// tokio::spawn(async move {
///     monitor.start().await;
/// });
/// ```
#[derive(Clone)]
pub struct SwapMonitor {
    db: Database,
    solana: SolanaClient,
    config: AppConfig,
}

impl SwapMonitor {
    pub fn new(db: Database, solana: SolanaClient, config: AppConfig) -> Self {
        Self { db, solana, config }
    }

    /// Run reconciliation passes forever.
    pub async fn start(&self) {
        info!(
            "Swap monitor started (interval {}s, stale after {}s)",
            self.config.swap_sync_interval, self.config.stale_swap_after_secs
        );

        let mut ticker = interval(Duration::from_secs(self.config.swap_sync_interval));
        loop {
            ticker.tick().await;

            match self.run_once().await {
                Ok(report) if report != SyncReport::default() => info!(
                    "Swap sync: {} checked, {} updated, {} dropped, {} stale",
                    report.checked, report.updated, report.dropped, report.stale
                ),
                Ok(_) => debug!("Swap sync: nothing open"),
                Err(e) => error!("Swap sync failed: {}", e),
            }
        }
    }

    /// One reconciliation pass over the open swaps.
    pub async fn run_once(&self) -> Result<SyncReport, SwapServiceError> {
        let now = Utc::now();
        let open = queries::list_open_swaps(self.db.pool(), BATCH_SIZE).await?;
        let mut report = SyncReport::default();

        for record in open {
            report.checked += 1;

            let authority = match parse_pubkey(&record.authority) {
                Ok(authority) => authority,
                Err(e) => {
                    warn!("Skipping swap with bad authority: {}", e);
                    continue;
                }
            };

            match self.sync_one(&record, &authority, now).await {
                Ok(SyncOutcome::Updated(refreshed)) => {
                    if refreshed.status != record.status {
                        report.updated += 1;
                    }
                    if is_stale(&refreshed, now, self.config.stale_swap_after_secs) {
                        report.stale += 1;
                        warn!(
                            "Swap {}#{} has been INITIATED since {:?}; awaiting operator attestation",
                            refreshed.authority, refreshed.sequence_index, refreshed.initiated_at
                        );
                    }
                }
                Ok(SyncOutcome::Dropped) => report.dropped += 1,
                Ok(SyncOutcome::Unchanged) => {}
                Err(e) => warn!(
                    "Failed to sync swap {}#{}: {}",
                    record.authority, record.sequence_index, e
                ),
            }
        }

        Ok(report)
    }

    async fn sync_one(
        &self,
        record: &SwapRecord,
        authority: &Pubkey,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SwapServiceError> {
        let index = record.sequence_index as u64;

        if let Some(refreshed) = refresh_swap(&self.db, &self.solana, authority, index).await? {
            return Ok(SyncOutcome::Updated(refreshed));
        }

        if is_expired_pending(record, now) {
            queries::delete_pending_swap(self.db.pool(), &record.authority, record.sequence_index).await?;
            return Ok(SyncOutcome::Dropped);
        }

        Ok(SyncOutcome::Unchanged)
    }
}

enum SyncOutcome {
    Updated(SwapRecord),
    Dropped,
    Unchanged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn initiated(age_secs: i64) -> SwapRecord {
        let mut record = SwapRecord::pending("auth".into(), 1, "swap".into());
        record.status = "INITIATED".into();
        record.initiated_at = Some(Utc::now() - ChronoDuration::seconds(age_secs));
        record
    }

    #[test]
    fn test_stale_only_when_initiated_long_enough() {
        let now = Utc::now();
        assert!(is_stale(&initiated(100), now, 60));
        assert!(!is_stale(&initiated(10), now, 60));

        let mut settled = initiated(100);
        settled.status = "SETTLED".into();
        assert!(!is_stale(&settled, now, 60));
    }

    #[test]
    fn test_pending_expiry() {
        let now = Utc::now();
        let mut pending = SwapRecord::pending("auth".into(), 2, "swap".into());
        assert!(!is_expired_pending(&pending, now));

        pending.created_at = now - ChronoDuration::seconds(PENDING_EXPIRY_SECS + 1);
        assert!(is_expired_pending(&pending, now));

        let created = {
            let mut r = pending.clone();
            r.status = "CREATED".into();
            r
        };
        assert!(!is_expired_pending(&created, now));
    }
}
