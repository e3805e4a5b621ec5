//! # Database Queries
//!
//! SQL for the index tables, grouped by table:
//! - `user_*` - bridge_users
//! - `swap_*` - swaps
//! - `transaction_*` - swap_transactions

use deadpool_postgres::{Object, Pool};
use tokio_postgres::Row;
use tracing::{debug, info};
use uuid::Uuid;

use super::models::*;
use super::DatabaseError;

async fn client(pool: &Pool) -> Result<Object, DatabaseError> {
    pool.get()
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
}

// ============================================
// HELPER FUNCTIONS
// ============================================

fn row_to_user(row: &Row) -> BridgeUserRecord {
    BridgeUserRecord {
        authority: row.get("authority"),
        user_account: row.get("user_account"),
        swap_sequence: row.get("swap_sequence"),
        total_settled_value: row.get("total_settled_value"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_swap(row: &Row) -> SwapRecord {
    SwapRecord {
        id: row.get("id"),
        authority: row.get("authority"),
        sequence_index: row.get("sequence_index"),
        swap_account: row.get("swap_account"),
        status: row.get("status"),
        stablecoin: row.get("stablecoin"),
        fiat_currency: row.get("fiat_currency"),
        tx_kind: row.get("tx_kind"),
        amount: row.get("amount"),
        settled: row.get("settled"),
        created_at: row.get("created_at"),
        initiated_at: row.get("initiated_at"),
        completed_at: row.get("completed_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_transaction(row: &Row) -> SwapTransactionRecord {
    SwapTransactionRecord {
        id: row.get("id"),
        authority: row.get("authority"),
        sequence_index: row.get("sequence_index"),
        instruction: row.get("instruction"),
        status: row.get("status"),
        signature: row.get("signature"),
        error_code: row.get("error_code"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SWAP_COLUMNS: &str = "id, authority, sequence_index, swap_account, status, \
    stablecoin, fiat_currency, tx_kind, amount, settled, \
    created_at, initiated_at, completed_at, updated_at";

// ============================================
// USER QUERIES
// ============================================

pub async fn get_user(pool: &Pool, authority: &str) -> Result<Option<BridgeUserRecord>, DatabaseError> {
    debug!("Fetching user: {}", authority);

    let rows = client(pool)
        .await?
        .query(
            r#"
            SELECT authority, user_account, swap_sequence, total_settled_value,
                   created_at, updated_at
            FROM bridge_users
            WHERE authority = $1
            "#,
            &[&authority],
        )
        .await?;

    Ok(rows.first().map(row_to_user))
}

/// Create or refresh a user row. `created_at` keeps its first value.
pub async fn upsert_user(pool: &Pool, user: &BridgeUserRecord) -> Result<(), DatabaseError> {
    debug!("Upserting user: {}", user.authority);

    client(pool)
        .await?
        .execute(
            r#"
            INSERT INTO bridge_users (
                authority, user_account, swap_sequence, total_settled_value,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (authority) DO UPDATE SET
                swap_sequence = EXCLUDED.swap_sequence,
                total_settled_value = EXCLUDED.total_settled_value,
                updated_at = EXCLUDED.updated_at
            "#,
            &[
                &user.authority,
                &user.user_account,
                &user.swap_sequence,
                &user.total_settled_value,
                &user.created_at,
                &user.updated_at,
            ],
        )
        .await?;

    Ok(())
}

// ============================================
// SWAP QUERIES
// ============================================

pub async fn get_swap(
    pool: &Pool,
    authority: &str,
    sequence_index: i64,
) -> Result<Option<SwapRecord>, DatabaseError> {
    let rows = client(pool)
        .await?
        .query(
            &format!(
                "SELECT {} FROM swaps WHERE authority = $1 AND sequence_index = $2",
                SWAP_COLUMNS
            ),
            &[&authority, &sequence_index],
        )
        .await?;

    Ok(rows.first().map(row_to_swap))
}

/// Newest first.
pub async fn list_swaps_by_authority(
    pool: &Pool,
    authority: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<SwapRecord>, DatabaseError> {
    debug!("Listing swaps for {} (limit: {}, offset: {})", authority, limit, offset);

    let rows = client(pool)
        .await?
        .query(
            &format!(
                "SELECT {} FROM swaps WHERE authority = $1 \
                 ORDER BY sequence_index DESC LIMIT $2 OFFSET $3",
                SWAP_COLUMNS
            ),
            &[&authority, &limit, &offset],
        )
        .await?;

    Ok(rows.iter().map(row_to_swap).collect())
}

/// Swaps the monitor still has to follow: pending, created or initiated.
pub async fn list_open_swaps(pool: &Pool, limit: i64) -> Result<Vec<SwapRecord>, DatabaseError> {
    let rows = client(pool)
        .await?
        .query(
            &format!(
                "SELECT {} FROM swaps WHERE status IN ('PENDING', 'CREATED', 'INITIATED') \
                 ORDER BY updated_at ASC LIMIT $1",
                SWAP_COLUMNS
            ),
            &[&limit],
        )
        .await?;

    Ok(rows.iter().map(row_to_swap).collect())
}

/// Insert a swap, or refresh the cached chain fields of an existing one.
pub async fn upsert_swap(pool: &Pool, swap: &SwapRecord) -> Result<(), DatabaseError> {
    debug!("Upserting swap {}#{}", swap.authority, swap.sequence_index);

    client(pool)
        .await?
        .execute(
            r#"
            INSERT INTO swaps (
                id, authority, sequence_index, swap_account, status,
                stablecoin, fiat_currency, tx_kind, amount, settled,
                created_at, initiated_at, completed_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (authority, sequence_index) DO UPDATE SET
                status = EXCLUDED.status,
                stablecoin = EXCLUDED.stablecoin,
                fiat_currency = EXCLUDED.fiat_currency,
                tx_kind = EXCLUDED.tx_kind,
                amount = EXCLUDED.amount,
                settled = EXCLUDED.settled,
                created_at = EXCLUDED.created_at,
                initiated_at = EXCLUDED.initiated_at,
                completed_at = EXCLUDED.completed_at,
                updated_at = EXCLUDED.updated_at
            "#,
            &[
                &swap.id,
                &swap.authority,
                &swap.sequence_index,
                &swap.swap_account,
                &swap.status,
                &swap.stablecoin,
                &swap.fiat_currency,
                &swap.tx_kind,
                &swap.amount,
                &swap.settled,
                &swap.created_at,
                &swap.initiated_at,
                &swap.completed_at,
                &swap.updated_at,
            ],
        )
        .await?;

    Ok(())
}

/// Drop a pending swap whose slot was never claimed.
pub async fn delete_pending_swap(
    pool: &Pool,
    authority: &str,
    sequence_index: i64,
) -> Result<u64, DatabaseError> {
    let deleted = client(pool)
        .await?
        .execute(
            "DELETE FROM swaps WHERE authority = $1 AND sequence_index = $2 AND status = 'PENDING'",
            &[&authority, &sequence_index],
        )
        .await?;

    if deleted > 0 {
        info!("Dropped unclaimed pending swap {}#{}", authority, sequence_index);
    }
    Ok(deleted)
}

// ============================================
// TRANSACTION QUERIES
// ============================================

pub async fn create_transaction(
    pool: &Pool,
    tx: &SwapTransactionRecord,
) -> Result<Uuid, DatabaseError> {
    debug!("Recording {} transaction for {}", tx.instruction, tx.authority);

    client(pool)
        .await?
        .execute(
            r#"
            INSERT INTO swap_transactions (
                id, authority, sequence_index, instruction, status,
                signature, error_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
            &[
                &tx.id,
                &tx.authority,
                &tx.sequence_index,
                &tx.instruction,
                &tx.status,
                &tx.signature,
                &tx.error_code,
                &tx.created_at,
                &tx.updated_at,
            ],
        )
        .await?;

    Ok(tx.id)
}

pub async fn get_transaction(
    pool: &Pool,
    id: Uuid,
) -> Result<Option<SwapTransactionRecord>, DatabaseError> {
    let rows = client(pool)
        .await?
        .query(
            r#"
            SELECT id, authority, sequence_index, instruction, status,
                   signature, error_code, created_at, updated_at
            FROM swap_transactions
            WHERE id = $1
            "#,
            &[&id],
        )
        .await?;

    Ok(rows.first().map(row_to_transaction))
}

pub async fn update_transaction_status(
    pool: &Pool,
    id: Uuid,
    status: TransactionStatus,
    signature: Option<&str>,
    error_code: Option<&str>,
) -> Result<(), DatabaseError> {
    debug!("Updating transaction {} status to: {}", id, status.as_str());

    let updated = client(pool)
        .await?
        .execute(
            r#"
            UPDATE swap_transactions
            SET status = $2,
                signature = COALESCE($3, signature),
                error_code = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
            &[&id, &status.as_str(), &signature, &error_code],
        )
        .await?;

    if updated == 0 {
        return Err(DatabaseError::NotFound(format!("Transaction not found: {}", id)));
    }
    Ok(())
}
