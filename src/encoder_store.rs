//! Durable storage for the encoder table.
//!
//! The table is persisted as a single JSON unit under one sled key. Writers
//! never read-modify-write blindly: a save succeeds only when the stored
//! bytes are still the snapshot the caller loaded (sled compare-and-swap),
//! which turns concurrent extensions of the same field from a silent
//! lost-update into a retryable conflict.

use sled::Db;
use std::path::Path;

use crate::encoder::EncoderTable;
use crate::errors::{RiskError, RiskResult};

const TABLE_KEY: &[u8] = b"encoder_table";

/// A sled-backed store holding the encoder table as one versioned unit.
pub struct SledEncoderStore {
    db: Db,
}

impl SledEncoderStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> RiskResult<Self> {
        let db = sled::open(path).map_err(|e| {
            RiskError::persistence("open_encoder_store", format!("{}: {e}", path.display()))
        })?;
        Ok(SledEncoderStore { db })
    }

    /// Load the current table. An absent key means no encoder exists yet and
    /// yields an empty table at version 0.
    pub fn load(&self) -> RiskResult<EncoderTable> {
        match self.db.get(TABLE_KEY)? {
            Some(bytes) => {
                let table: EncoderTable = serde_json::from_slice(&bytes)
                    .map_err(|e| RiskError::serialization("decode_encoder_table", e))?;
                Ok(table)
            }
            None => Ok(EncoderTable::new()),
        }
    }

    /// Persist `table` only if the stored snapshot is still the version the
    /// caller loaded. On success the stored version is `table.version + 1`
    /// and the write is flushed before returning. Returns false on conflict,
    /// leaving the newer snapshot untouched.
    pub fn save_if_current(&self, table: &EncoderTable) -> RiskResult<bool> {
        let current = self.db.get(TABLE_KEY)?;

        // Fast-path version check; atomicity comes from the CAS below.
        if let Some(bytes) = &current {
            let stored: EncoderTable = serde_json::from_slice(bytes)
                .map_err(|e| RiskError::serialization("decode_encoder_table", e))?;
            if stored.version != table.version {
                return Ok(false);
            }
        } else if table.version != 0 {
            return Ok(false);
        }

        let mut next = table.clone();
        next.version += 1;
        let new_bytes = serde_json::to_vec(&next)
            .map_err(|e| RiskError::serialization("encode_encoder_table", e))?;

        let swap = match current {
            Some(old) => self
                .db
                .compare_and_swap(TABLE_KEY, Some(old), Some(new_bytes))?,
            None => self
                .db
                .compare_and_swap(TABLE_KEY, None::<&[u8]>, Some(new_bytes))?,
        };

        if swap.is_err() {
            return Ok(false);
        }
        self.db.flush()?;
        Ok(true)
    }

    /// Unconditional write for the single-writer training path.
    pub fn save(&self, table: &EncoderTable) -> RiskResult<()> {
        let mut next = table.clone();
        next.version += 1;
        let bytes = serde_json::to_vec(&next)
            .map_err(|e| RiskError::serialization("encode_encoder_table", e))?;
        self.db.insert(TABLE_KEY, bytes)?;
        self.db.flush()?;
        Ok(())
    }
}
