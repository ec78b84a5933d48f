//! Disposition slot store
//!
//! Pending and synced dispositions live in two fixed slots, each a JSON array.
//! Every write is a whole-list replace guarded by the slot's `version`
//! counter: a writer re-reads and retries when another writer got there first.

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{DispositionId, DispositionRecord};
use crate::util::now_millis;

/// Read-modify-write attempts before a write gives up with [`Error::Conflict`]
const MAX_WRITE_ATTEMPTS: usize = 5;

/// One of the two fixed storage slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Pending,
    Synced,
}

impl Slot {
    /// Storage key of the slot
    pub const fn key(self) -> &'static str {
        match self {
            Self::Pending => "pending_dispositions",
            Self::Synced => "synced_dispositions",
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Pending => Self::Synced,
            Self::Synced => Self::Pending,
        }
    }
}

/// A decoded slot together with the version it was read at.
///
/// `version` is `None` when the slot row is missing.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    records: Vec<DispositionRecord>,
    version: Option<i64>,
}

impl Snapshot {
    fn contains(&self, id: &DispositionId) -> bool {
        self.records.iter().any(|record| &record.id == id)
    }
}

/// Trait for disposition storage operations (async)
#[allow(async_fn_in_trait)]
pub trait DispositionStore {
    /// Records waiting for delivery, in insertion order
    async fn pending(&self) -> Result<Vec<DispositionRecord>>;

    /// Records confirmed delivered, in insertion order
    async fn synced(&self) -> Result<Vec<DispositionRecord>>;

    /// Union of both slots, newest first
    async fn all(&self) -> Result<Vec<DispositionRecord>>;

    /// Append a record to a slot. Returns `false` if the id already exists in
    /// either slot.
    async fn append(&self, slot: Slot, record: &DispositionRecord) -> Result<bool>;

    /// Move a pending record into the synced slot. Returns `false` if the id
    /// was not pending.
    async fn promote(&self, id: &DispositionId) -> Result<bool>;

    /// Count a failed delivery attempt on a pending record.
    async fn record_failure(&self, id: &DispositionId, error: &str) -> Result<bool>;

    /// Current version counter of a slot
    async fn slot_version(&self, slot: Slot) -> Result<Option<i64>>;

    /// Empty both slots
    async fn clear(&self) -> Result<()>;
}

/// libSQL implementation of `DispositionStore`
pub struct LibSqlDispositionStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDispositionStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn read(&self, slot: Slot) -> Result<Snapshot> {
        let mut rows = self
            .conn
            .query(
                "SELECT payload, version FROM disposition_slots WHERE slot = ?",
                [slot.key()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            tracing::warn!("Storage slot {} is missing; treating as empty", slot.key());
            return Ok(Snapshot::default());
        };

        let payload: String = row.get(0)?;
        let version: i64 = row.get(1)?;
        Ok(Snapshot {
            records: decode_payload(slot, &payload),
            version: Some(version),
        })
    }

    /// Replace a slot's contents if it is still at `expected`.
    ///
    /// Returns `false` when another writer bumped the version first.
    async fn write(
        &self,
        slot: Slot,
        records: &[DispositionRecord],
        expected: Option<i64>,
    ) -> Result<bool> {
        let payload = serde_json::to_string(records)?;
        let now = now_millis();

        let affected = match expected {
            Some(version) => {
                self.conn
                    .execute(
                        "UPDATE disposition_slots
                         SET payload = ?, version = version + 1, updated_at = ?
                         WHERE slot = ? AND version = ?",
                        params![payload, now, slot.key(), version],
                    )
                    .await?
            }
            None => {
                self.conn
                    .execute(
                        "INSERT INTO disposition_slots (slot, payload, version, updated_at)
                         VALUES (?, ?, 1, ?)
                         ON CONFLICT(slot) DO NOTHING",
                        params![slot.key(), payload, now],
                    )
                    .await?
            }
        };

        Ok(affected == 1)
    }

    async fn rollback(&self) {
        if let Err(error) = self.conn.execute("ROLLBACK", ()).await {
            tracing::warn!("Rollback failed: {}", error);
        }
    }
}

impl DispositionStore for LibSqlDispositionStore<'_> {
    async fn pending(&self) -> Result<Vec<DispositionRecord>> {
        Ok(self.read(Slot::Pending).await?.records)
    }

    async fn synced(&self) -> Result<Vec<DispositionRecord>> {
        Ok(self.read(Slot::Synced).await?.records)
    }

    async fn all(&self) -> Result<Vec<DispositionRecord>> {
        let mut records = self.synced().await?;
        records.extend(self.pending().await?);
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn append(&self, slot: Slot, record: &DispositionRecord) -> Result<bool> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut target = self.read(slot).await?;
            let other = self.read(slot.other()).await?;
            if target.contains(&record.id) || other.contains(&record.id) {
                tracing::debug!("Disposition {} already stored; skipping append", record.id);
                return Ok(false);
            }

            target.records.push(record.clone());
            if self.write(slot, &target.records, target.version).await? {
                tracing::debug!("Appended disposition {} to {}", record.id, slot.key());
                return Ok(true);
            }

            tracing::debug!(
                "Version conflict appending to {} (attempt {}/{})",
                slot.key(),
                attempt,
                MAX_WRITE_ATTEMPTS
            );
        }

        Err(Error::Conflict(slot.key().to_string()))
    }

    async fn promote(&self, id: &DispositionId) -> Result<bool> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut pending = self.read(Slot::Pending).await?;
            let mut synced = self.read(Slot::Synced).await?;

            let Some(index) = pending.records.iter().position(|record| &record.id == id) else {
                return Ok(false);
            };
            let record = pending.records.remove(index).into_synced();
            if !synced.contains(id) {
                synced.records.push(record);
            }

            self.conn.execute("BEGIN IMMEDIATE", ()).await?;
            let outcome = async {
                if !self
                    .write(Slot::Pending, &pending.records, pending.version)
                    .await?
                {
                    return Ok(false);
                }
                self.write(Slot::Synced, &synced.records, synced.version)
                    .await
            }
            .await;

            match outcome {
                Ok(true) => {
                    if let Err(error) = self.conn.execute("COMMIT", ()).await {
                        self.rollback().await;
                        return Err(error.into());
                    }
                    tracing::debug!("Promoted disposition {} to synced", id);
                    return Ok(true);
                }
                Ok(false) => {
                    self.rollback().await;
                    tracing::debug!(
                        "Version conflict promoting {} (attempt {}/{})",
                        id,
                        attempt,
                        MAX_WRITE_ATTEMPTS
                    );
                }
                Err(error) => {
                    self.rollback().await;
                    return Err(error);
                }
            }
        }

        Err(Error::Conflict(Slot::Pending.key().to_string()))
    }

    async fn record_failure(&self, id: &DispositionId, error: &str) -> Result<bool> {
        for _ in 0..MAX_WRITE_ATTEMPTS {
            let mut pending = self.read(Slot::Pending).await?;
            let Some(record) = pending.records.iter_mut().find(|record| &record.id == id) else {
                return Ok(false);
            };
            record.sync_attempts = record.sync_attempts.saturating_add(1);
            record.last_sync_error = Some(error.to_string());

            if self
                .write(Slot::Pending, &pending.records, pending.version)
                .await?
            {
                return Ok(true);
            }
        }

        Err(Error::Conflict(Slot::Pending.key().to_string()))
    }

    async fn slot_version(&self, slot: Slot) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                "SELECT version FROM disposition_slots WHERE slot = ?",
                [slot.key()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn clear(&self) -> Result<()> {
        self.conn
            .execute(
                "UPDATE disposition_slots
                 SET payload = '[]', version = version + 1, updated_at = ?",
                [now_millis()],
            )
            .await?;
        tracing::info!("Cleared pending and synced dispositions");
        Ok(())
    }
}

/// Decode a slot payload; malformed JSON is logged and read as empty.
fn decode_payload(slot: Slot, payload: &str) -> Vec<DispositionRecord> {
    match serde_json::from_str(payload) {
        Ok(records) => records,
        Err(error) => {
            tracing::warn!(
                "Failed to decode {} ({}); treating as empty",
                slot.key(),
                error
            );
            Vec::new()
        }
    }
}

/// Sort by `created_at` descending. The sort is stable, so ties keep their
/// input order.
pub fn sort_newest_first(records: &mut [DispositionRecord]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
