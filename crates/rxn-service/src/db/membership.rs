//! Membership and root-history persistence.
//!
//! Operates on `group_member_commitments`, `merkle_root_history` and
//! `processed_membership_events`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use rxn_core::{
    BlockHeight, Commitment, FeedId, GroupMemberCommitment, MerkleRoot, MerkleRootHistory,
};

use super::{feed_lock_key, height_from_db, height_to_db, PgStore};
use crate::error::StorageError;
use crate::events::EventId;
use crate::store::{
    root_over, CommitmentRepository, EventApplied, MembershipChange, RegisterOutcome,
    RootHistoryRepository,
};

async fn lock_feed(conn: &mut PgConnection, feed_id: &FeedId) -> Result<(), StorageError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(feed_lock_key(feed_id))
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn active_in(
    conn: &mut PgConnection,
    feed_id: &FeedId,
) -> Result<Vec<Commitment>, StorageError> {
    let rows: Vec<(Vec<u8>,)> = sqlx::query_as(
        "SELECT commitment FROM group_member_commitments
         WHERE feed_id = $1 AND revoked_at_block IS NULL
         ORDER BY commitment",
    )
    .bind(feed_id.0)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(raw,)| {
            Commitment::from_slice(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
        })
        .collect()
}

async fn latest_root(
    conn: &mut PgConnection,
    feed_id: &FeedId,
) -> Result<Option<MerkleRoot>, StorageError> {
    let row: Option<(Vec<u8>,)> = sqlx::query_as(
        "SELECT root FROM merkle_root_history WHERE feed_id = $1 ORDER BY id DESC LIMIT 1",
    )
    .bind(feed_id.0)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|(raw,)| MerkleRoot::from_slice(&raw).map_err(|e| StorageError::Corrupt(e.to_string())))
        .transpose()
}

async fn insert_root(
    conn: &mut PgConnection,
    feed_id: &FeedId,
    root: &MerkleRoot,
    height: BlockHeight,
) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO merkle_root_history (feed_id, root, block_height, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(feed_id.0)
    .bind(root.as_bytes().as_slice())
    .bind(height_to_db(height)?)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Recompute over the active set as seen by `conn` and append.
async fn append_root(
    conn: &mut PgConnection,
    feed_id: &FeedId,
    height: BlockHeight,
) -> Result<MerkleRoot, StorageError> {
    let active = active_in(conn, feed_id).await?;
    let root = root_over(&active)?;
    insert_root(conn, feed_id, &root, height).await?;
    Ok(root)
}

/// Make `commitment` active and append the new root. The caller holds the
/// feed lock and owns the transaction.
async fn activate_in(
    conn: &mut PgConnection,
    feed_id: &FeedId,
    commitment: &Commitment,
    key_generation: u32,
    height: BlockHeight,
) -> Result<RegisterOutcome, StorageError> {
    let existing: Option<(Option<i64>,)> = sqlx::query_as(
        "SELECT revoked_at_block FROM group_member_commitments
         WHERE feed_id = $1 AND commitment = $2",
    )
    .bind(feed_id.0)
    .bind(commitment.as_bytes().as_slice())
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((None,)) = existing {
        let root = latest_root(conn, feed_id).await?;
        return Ok(RegisterOutcome::AlreadyActive { root });
    }

    // Root first: a commitment the tree rejects must not reach the table.
    let mut active = active_in(conn, feed_id).await?;
    active.push(*commitment);
    let root = root_over(&active)?;

    let reactivated = existing.is_some();
    if reactivated {
        sqlx::query(
            "UPDATE group_member_commitments
             SET revoked_at_block = NULL, registered_at_block = $3, key_generation = $4
             WHERE feed_id = $1 AND commitment = $2",
        )
        .bind(feed_id.0)
        .bind(commitment.as_bytes().as_slice())
        .bind(height_to_db(height)?)
        .bind(i64::from(key_generation))
        .execute(&mut *conn)
        .await?;
    } else {
        sqlx::query(
            "INSERT INTO group_member_commitments
             (feed_id, commitment, key_generation, registered_at, registered_at_block, revoked_at_block)
             VALUES ($1, $2, $3, $4, $5, NULL)",
        )
        .bind(feed_id.0)
        .bind(commitment.as_bytes().as_slice())
        .bind(i64::from(key_generation))
        .bind(Utc::now())
        .bind(height_to_db(height)?)
        .execute(&mut *conn)
        .await?;
    }

    insert_root(conn, feed_id, &root, height).await?;
    Ok(RegisterOutcome::Registered { root, reactivated })
}

/// Revoke `commitment` and append the root over the remaining set.
///
/// When the commitment is already inactive but the latest recorded root
/// does not match the active set, the current root is appended anyway.
/// `None` means nothing was written.
async fn deactivate_in(
    conn: &mut PgConnection,
    feed_id: &FeedId,
    commitment: &Commitment,
    height: BlockHeight,
) -> Result<Option<MerkleRoot>, StorageError> {
    let active = active_in(conn, feed_id).await?;
    if !active.contains(commitment) {
        let Some(latest) = latest_root(conn, feed_id).await? else {
            return Ok(None);
        };
        let current = root_over(&active)?;
        if latest == current {
            return Ok(None);
        }
        insert_root(conn, feed_id, &current, height).await?;
        return Ok(Some(current));
    }

    let remaining: Vec<Commitment> = active.into_iter().filter(|c| c != commitment).collect();
    let root = root_over(&remaining)?;
    sqlx::query(
        "UPDATE group_member_commitments SET revoked_at_block = $3
         WHERE feed_id = $1 AND commitment = $2 AND revoked_at_block IS NULL",
    )
    .bind(feed_id.0)
    .bind(commitment.as_bytes().as_slice())
    .bind(height_to_db(height)?)
    .execute(&mut *conn)
    .await?;
    insert_root(conn, feed_id, &root, height).await?;
    Ok(Some(root))
}

#[async_trait]
impl CommitmentRepository for PgStore {
    async fn get_commitment(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
    ) -> Result<Option<GroupMemberCommitment>, StorageError> {
        let row = sqlx::query_as::<_, CommitmentRow>(
            "SELECT feed_id, commitment, key_generation, registered_at, registered_at_block, revoked_at_block
             FROM group_member_commitments WHERE feed_id = $1 AND commitment = $2",
        )
        .bind(feed_id.0)
        .bind(commitment.as_bytes().as_slice())
        .fetch_optional(self.pool())
        .await?;

        row.map(CommitmentRow::into_record).transpose()
    }

    async fn active_commitments(&self, feed_id: &FeedId) -> Result<Vec<Commitment>, StorageError> {
        let mut conn = self.pool().acquire().await?;
        active_in(&mut conn, feed_id).await
    }

    async fn register(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        key_generation: u32,
        height: BlockHeight,
    ) -> Result<RegisterOutcome, StorageError> {
        let mut tx = self.pool().begin().await?;
        lock_feed(&mut tx, feed_id).await?;
        let outcome = activate_in(&mut tx, feed_id, commitment, key_generation, height).await?;
        match outcome {
            RegisterOutcome::AlreadyActive { .. } => tx.rollback().await?,
            RegisterOutcome::Registered { .. } => tx.commit().await?,
        }
        Ok(outcome)
    }

    async fn revoke(
        &self,
        feed_id: &FeedId,
        commitment: &Commitment,
        height: BlockHeight,
    ) -> Result<bool, StorageError> {
        let mut tx = self.pool().begin().await?;
        lock_feed(&mut tx, feed_id).await?;

        let result = sqlx::query(
            "UPDATE group_member_commitments SET revoked_at_block = $3
             WHERE feed_id = $1 AND commitment = $2 AND revoked_at_block IS NULL",
        )
        .bind(feed_id.0)
        .bind(commitment.as_bytes().as_slice())
        .bind(height_to_db(height)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_root(
        &self,
        feed_id: &FeedId,
        height: BlockHeight,
    ) -> Result<MerkleRoot, StorageError> {
        let mut tx = self.pool().begin().await?;
        lock_feed(&mut tx, feed_id).await?;
        let root = append_root(&mut tx, feed_id, height).await?;
        tx.commit().await?;
        Ok(root)
    }

    async fn apply_event(
        &self,
        event_id: &EventId,
        feed_id: &FeedId,
        commitment: &Commitment,
        change: MembershipChange,
        height: BlockHeight,
    ) -> Result<EventApplied, StorageError> {
        let mut tx = self.pool().begin().await?;
        lock_feed(&mut tx, feed_id).await?;

        let kind = match change {
            MembershipChange::Activate { .. } => "activate",
            MembershipChange::Revoke => "revoke",
        };
        let claimed = sqlx::query(
            "INSERT INTO processed_membership_events (event_id, feed_id, kind, processed_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id.0)
        .bind(feed_id.0)
        .bind(kind)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(EventApplied::Duplicate);
        }

        let applied = match change {
            MembershipChange::Activate { key_generation } => EventApplied::Registered(
                activate_in(&mut tx, feed_id, commitment, key_generation, height).await?,
            ),
            MembershipChange::Revoke => {
                match deactivate_in(&mut tx, feed_id, commitment, height).await? {
                    Some(root) => EventApplied::Revoked { root },
                    None => EventApplied::NotActive,
                }
            }
        };
        tx.commit().await?;
        Ok(applied)
    }

    async fn is_event_processed(&self, event_id: &EventId) -> Result<bool, StorageError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM processed_membership_events WHERE event_id = $1)",
        )
        .bind(event_id.0)
        .fetch_one(self.pool())
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl RootHistoryRepository for PgStore {
    async fn recent_history(
        &self,
        feed_id: &FeedId,
        count: usize,
    ) -> Result<Vec<MerkleRootHistory>, StorageError> {
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, RootRow>(
            "SELECT feed_id, root, block_height, created_at FROM merkle_root_history
             WHERE feed_id = $1 ORDER BY id DESC LIMIT $2",
        )
        .bind(feed_id.0)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(RootRow::into_record).collect()
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct CommitmentRow {
    feed_id: Uuid,
    commitment: Vec<u8>,
    key_generation: i64,
    registered_at: DateTime<Utc>,
    registered_at_block: i64,
    revoked_at_block: Option<i64>,
}

impl CommitmentRow {
    fn into_record(self) -> Result<GroupMemberCommitment, StorageError> {
        Ok(GroupMemberCommitment {
            feed_id: FeedId(self.feed_id),
            commitment: Commitment::from_slice(&self.commitment)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            key_generation: u32::try_from(self.key_generation).map_err(|_| {
                StorageError::Corrupt(format!("key_generation {} out of range", self.key_generation))
            })?,
            registered_at: self.registered_at,
            registered_at_block: height_from_db(self.registered_at_block)?,
            revoked_at_block: self.revoked_at_block.map(height_from_db).transpose()?,
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct RootRow {
    feed_id: Uuid,
    root: Vec<u8>,
    block_height: i64,
    created_at: DateTime<Utc>,
}

impl RootRow {
    fn into_record(self) -> Result<MerkleRootHistory, StorageError> {
        Ok(MerkleRootHistory {
            feed_id: FeedId(self.feed_id),
            root: MerkleRoot::from_slice(&self.root)
                .map_err(|e| StorageError::Corrupt(e.to_string()))?,
            block_height: height_from_db(self.block_height)?,
            created_at: self.created_at,
        })
    }
}
