//! Saved-state bundle and its binary encoding.

use crate::error::{BillingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Magic bytes for encoded saved state.
const SAVED_STATE_MAGIC: &[u8; 4] = b"BSS\0";

/// Current saved state format version.
const SAVED_STATE_VERSION: u8 = 1;

/// magic + version + body length + crc32
const HEADER_LEN: usize = 4 + 1 + 8 + 4;

/// Named slots of string lists, captured when a screen is suspended.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {
    slots: BTreeMap<String, Vec<String>>,
}

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `codes` under `slot`, replacing any previous value.
    pub fn put(&mut self, slot: impl Into<String>, codes: Vec<String>) {
        self.slots.insert(slot.into(), codes);
    }

    pub fn get(&self, slot: &str) -> Option<&[String]> {
        self.slots.get(slot).map(Vec::as_slice)
    }

    pub fn remove(&mut self, slot: &str) -> Option<Vec<String>> {
        self.slots.remove(slot)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Encode as `magic | version | len (u64 LE) | crc32 (u32 LE) | MessagePack body`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = rmp_serde::to_vec(self)?;
        let checksum = crc32fast::hash(&body);

        let mut out = Vec::with_capacity(HEADER_LEN + body.len());
        out.extend_from_slice(SAVED_STATE_MAGIC);
        out.push(SAVED_STATE_VERSION);
        out.extend_from_slice(&(body.len() as u64).to_le_bytes());
        out.extend_from_slice(&checksum.to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode bytes produced by [`SavedState::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(BillingError::InvalidFormat(format!(
                "Saved state too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != SAVED_STATE_MAGIC {
            return Err(BillingError::InvalidFormat("Invalid saved state magic".into()));
        }

        let version = bytes[4];
        if version != SAVED_STATE_VERSION {
            return Err(BillingError::InvalidFormat(format!(
                "Unsupported saved state version: {}",
                version
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[5..13]);
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&bytes[13..17]);
        let expected = u32::from_le_bytes(crc_bytes);

        let body = &bytes[HEADER_LEN..];
        if body.len() != len {
            return Err(BillingError::InvalidFormat(format!(
                "Saved state body is {} bytes, header says {}",
                body.len(),
                len
            )));
        }

        let got = crc32fast::hash(body);
        if got != expected {
            return Err(BillingError::ChecksumMismatch { expected, got });
        }

        Ok(rmp_serde::from_slice(body)?)
    }
}
