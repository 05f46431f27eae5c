//! Reaction persistence.
//!
//! Operates on `reaction_nullifiers`, `message_reaction_tallies` and
//! `reaction_transactions`. Ciphertext vectors are stored as JSONB in their
//! serde form (an array of `{c1, c2}` hex points).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use rxn_core::{
    FeedId, MessageId, MessageReactionTally, Nullifier, ReactionNullifier, ReactionTransaction,
    TransactionId, VoteCiphertext,
};
use rxn_state::ReactionWrite;

use super::{count_from_db, count_to_db, height_from_db, height_to_db, PgStore};
use crate::error::StorageError;
use crate::store::ReactionRepository;

#[async_trait]
impl ReactionRepository for PgStore {
    async fn get_nullifier(
        &self,
        nullifier: &Nullifier,
    ) -> Result<Option<ReactionNullifier>, StorageError> {
        let row = sqlx::query_as::<_, NullifierRow>(
            "SELECT nullifier, message_id, vote, encrypted_backup, created_at, updated_at
             FROM reaction_nullifiers WHERE nullifier = $1",
        )
        .bind(nullifier.as_bytes().as_slice())
        .fetch_optional(self.pool())
        .await?;

        row.map(NullifierRow::into_record).transpose()
    }

    async fn get_tally(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<MessageReactionTally>, StorageError> {
        let row = sqlx::query_as::<_, TallyRow>(
            "SELECT message_id, feed_id, tally, total_count, version, last_updated
             FROM message_reaction_tallies WHERE message_id = $1",
        )
        .bind(message_id.0)
        .fetch_optional(self.pool())
        .await?;

        row.map(TallyRow::into_record).transpose()
    }

    async fn get_tallies(
        &self,
        feed_id: &FeedId,
        message_ids: &[MessageId],
    ) -> Result<Vec<MessageReactionTally>, StorageError> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = message_ids.iter().map(|m| m.0).collect();
        let rows = sqlx::query_as::<_, TallyRow>(
            "SELECT message_id, feed_id, tally, total_count, version, last_updated
             FROM message_reaction_tallies WHERE feed_id = $1 AND message_id = ANY($2)",
        )
        .bind(feed_id.0)
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TallyRow::into_record).collect()
    }

    async fn commit_reaction(&self, write: &ReactionWrite) -> Result<(), StorageError> {
        let n = &write.nullifier;
        let t = &write.tally;
        let tx_row = &write.transaction;
        let vote_json = serde_json::to_value(&n.vote)?;
        let tally_json = serde_json::to_value(&t.tally)?;
        let ciphertext_json = serde_json::to_value(&tx_row.ciphertext)?;

        let mut tx = self.pool().begin().await?;

        let nullifier_rows = if write.is_new_nullifier {
            sqlx::query(
                "INSERT INTO reaction_nullifiers
                 (nullifier, message_id, vote, encrypted_backup, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (nullifier) DO NOTHING",
            )
            .bind(n.nullifier.as_bytes().as_slice())
            .bind(n.message_id.0)
            .bind(&vote_json)
            .bind(n.encrypted_backup.as_deref())
            .bind(n.created_at)
            .bind(n.updated_at)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                "UPDATE reaction_nullifiers
                 SET vote = $3, encrypted_backup = $4, updated_at = $5
                 WHERE nullifier = $1 AND message_id = $2",
            )
            .bind(n.nullifier.as_bytes().as_slice())
            .bind(n.message_id.0)
            .bind(&vote_json)
            .bind(n.encrypted_backup.as_deref())
            .bind(n.updated_at)
            .execute(&mut *tx)
            .await?
        };
        if nullifier_rows.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "nullifier {} changed concurrently",
                n.nullifier
            )));
        }

        let tally_rows = match write.expected_tally_version {
            None => {
                sqlx::query(
                    "INSERT INTO message_reaction_tallies
                     (message_id, feed_id, tally, total_count, version, last_updated)
                     VALUES ($1, $2, $3, $4, $5, $6)
                     ON CONFLICT (message_id) DO NOTHING",
                )
                .bind(t.message_id.0)
                .bind(t.feed_id.0)
                .bind(&tally_json)
                .bind(count_to_db(t.total_count, "total_count")?)
                .bind(count_to_db(t.version, "version")?)
                .bind(t.last_updated)
                .execute(&mut *tx)
                .await?
            }
            Some(expected) => {
                sqlx::query(
                    "UPDATE message_reaction_tallies
                     SET tally = $2, total_count = $3, version = $4, last_updated = $5
                     WHERE message_id = $1 AND version = $6",
                )
                .bind(t.message_id.0)
                .bind(&tally_json)
                .bind(count_to_db(t.total_count, "total_count")?)
                .bind(count_to_db(t.version, "version")?)
                .bind(t.last_updated)
                .bind(count_to_db(expected, "version")?)
                .execute(&mut *tx)
                .await?
            }
        };
        if tally_rows.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "tally of {} moved past version {:?}",
                t.message_id, write.expected_tally_version
            )));
        }

        sqlx::query(
            "INSERT INTO reaction_transactions
             (id, block_height, feed_id, message_id, nullifier, ciphertext, proof_bytes, circuit_version, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(tx_row.id.0)
        .bind(height_to_db(tx_row.block_height)?)
        .bind(tx_row.feed_id.0)
        .bind(tx_row.message_id.0)
        .bind(tx_row.nullifier.as_bytes().as_slice())
        .bind(&ciphertext_json)
        .bind(tx_row.proof_bytes.as_slice())
        .bind(&tx_row.circuit_version)
        .bind(tx_row.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn transactions_for(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<ReactionTransaction>, StorageError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT id, block_height, feed_id, message_id, nullifier, ciphertext, proof_bytes, circuit_version, created_at
             FROM reaction_transactions WHERE message_id = $1 ORDER BY created_at",
        )
        .bind(message_id.0)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(TransactionRow::into_record).collect()
    }
}

fn vote_from_json(value: serde_json::Value) -> Result<VoteCiphertext, StorageError> {
    Ok(serde_json::from_value(value)?)
}

fn nullifier_from_db(raw: &[u8]) -> Result<Nullifier, StorageError> {
    Nullifier::from_slice(raw).map_err(|e| StorageError::Corrupt(e.to_string()))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct NullifierRow {
    nullifier: Vec<u8>,
    message_id: Uuid,
    vote: serde_json::Value,
    encrypted_backup: Option<Vec<u8>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NullifierRow {
    fn into_record(self) -> Result<ReactionNullifier, StorageError> {
        Ok(ReactionNullifier {
            nullifier: nullifier_from_db(&self.nullifier)?,
            message_id: MessageId(self.message_id),
            vote: vote_from_json(self.vote)?,
            encrypted_backup: self.encrypted_backup,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TallyRow {
    message_id: Uuid,
    feed_id: Uuid,
    tally: serde_json::Value,
    total_count: i64,
    version: i64,
    last_updated: DateTime<Utc>,
}

impl TallyRow {
    fn into_record(self) -> Result<MessageReactionTally, StorageError> {
        Ok(MessageReactionTally {
            message_id: MessageId(self.message_id),
            feed_id: FeedId(self.feed_id),
            tally: vote_from_json(self.tally)?,
            total_count: count_from_db(self.total_count, "total_count")?,
            version: count_from_db(self.version, "version")?,
            last_updated: self.last_updated,
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    block_height: i64,
    feed_id: Uuid,
    message_id: Uuid,
    nullifier: Vec<u8>,
    ciphertext: serde_json::Value,
    proof_bytes: Vec<u8>,
    circuit_version: String,
    created_at: DateTime<Utc>,
}

impl TransactionRow {
    fn into_record(self) -> Result<ReactionTransaction, StorageError> {
        Ok(ReactionTransaction {
            id: TransactionId(self.id),
            block_height: height_from_db(self.block_height)?,
            feed_id: FeedId(self.feed_id),
            message_id: MessageId(self.message_id),
            nullifier: nullifier_from_db(&self.nullifier)?,
            ciphertext: vote_from_json(self.ciphertext)?,
            proof_bytes: self.proof_bytes,
            circuit_version: self.circuit_version,
            created_at: self.created_at,
        })
    }
}
