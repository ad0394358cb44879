//! MariaDB `GTID_EVENT` (event type 162) and `GTID_LIST_EVENT` (163).
//!
//! Wire format of `GTID_EVENT`'s post-header + body (MariaDB KB
//! "GTID_EVENT"):
//!   sequence (8, LE) | domain_id (4, LE) | flags (1)
//!   [ commit_id (6, LE) if flags & FL_GROUP_COMMIT_ID ]
//!
//! `flags` bit 0 (`FL_STANDALONE`) marks a GTID whose single following
//! statement is the whole transaction (spec.md §3 "standalone_flag"; §4.5
//! "Standalone-flagged transactions close on their single statement").
//! bit 1 (`FL_GROUP_COMMIT_ID`) indicates the optional `commit_id` tail.
//! bit 2 (`FL_TRANSACTIONAL`) marks an InnoDB/XA-capable transaction.

use byteorder::{LittleEndian, ReadBytesExt};
use common::err::decode_error::ReError;
use std::io::{Cursor, Read};

use crate::mariadb::gtid::{GtidList, MariadbGtid};

pub const FL_STANDALONE: u8 = 1;
pub const FL_GROUP_COMMIT_ID: u8 = 2;
pub const FL_TRANSACTIONAL: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MariadbGtidEvent {
    pub gtid: MariadbGtid,
    pub flags: u8,
    pub commit_id: Option<u64>,
}

impl MariadbGtidEvent {
    pub fn is_standalone(&self) -> bool {
        self.flags & FL_STANDALONE != 0
    }

    pub fn is_transactional(&self) -> bool {
        self.flags & FL_TRANSACTIONAL != 0
    }

    /// `body` is the event body with the 19-byte header already stripped,
    /// and the trailing 4-byte CRC32 (if present) already stripped by the
    /// caller per the FDE's checksum algorithm.
    pub fn parse(body: &[u8], server_id: u32, domain_hint: Option<u32>) -> Result<Self, ReError> {
        let mut c = Cursor::new(body);
        let sequence = c
            .read_u64::<LittleEndian>()
            .map_err(|e| ReError::CorruptBinlog(format!("GTID_EVENT sequence: {}", e)))?;
        let domain_id = c
            .read_u32::<LittleEndian>()
            .map_err(|e| ReError::CorruptBinlog(format!("GTID_EVENT domain_id: {}", e)))?;
        let flags = c
            .read_u8()
            .map_err(|e| ReError::CorruptBinlog(format!("GTID_EVENT flags: {}", e)))?;

        let commit_id = if flags & FL_GROUP_COMMIT_ID != 0 {
            let mut buf = [0u8; 6];
            c.read_exact(&mut buf)
                .map_err(|e| ReError::CorruptBinlog(format!("GTID_EVENT commit_id: {}", e)))?;
            let mut v = 0u64;
            for (i, b) in buf.iter().enumerate() {
                v |= (*b as u64) << (8 * i);
            }
            Some(v)
        } else {
            None
        };

        let _ = domain_hint;
        Ok(MariadbGtidEvent {
            gtid: MariadbGtid::new(domain_id, server_id, sequence),
            flags,
            commit_id,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(13);
        out.extend_from_slice(&self.gtid.sequence.to_le_bytes());
        out.extend_from_slice(&self.gtid.domain_id.to_le_bytes());
        out.push(self.flags);
        if let Some(commit_id) = self.commit_id {
            out.extend_from_slice(&commit_id.to_le_bytes()[..6]);
        }
        out
    }
}

/// `GTID_LIST_EVENT` (163): `count (4, LE)` followed by `count` entries of
/// `domain_id (4) | server_id (4) | sequence (8)`, all little-endian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GtidListEvent {
    pub list: GtidList,
}

impl GtidListEvent {
    /// Inverse of `parse`; used to synthesize a fake `GTID_LIST_EVENT` body
    /// alongside a fake `ROTATE_EVENT` (spec.md §4.5 step 3).
    pub fn serialize(&self) -> Vec<u8> {
        let entries: Vec<&MariadbGtid> = self.list.iter().collect();
        let mut out = Vec::with_capacity(4 + entries.len() * 16);
        out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for g in entries {
            out.extend_from_slice(&g.domain_id.to_le_bytes());
            out.extend_from_slice(&g.server_id.to_le_bytes());
            out.extend_from_slice(&g.sequence.to_le_bytes());
        }
        out
    }

    pub fn parse(body: &[u8]) -> Result<Self, ReError> {
        let mut c = Cursor::new(body);
        let count = c
            .read_u32::<LittleEndian>()
            .map_err(|e| ReError::CorruptBinlog(format!("GTID_LIST_EVENT count: {}", e)))?;
        // Top 4 bits of count are reserved flags in the real format; router
        // only needs the entry list so it is masked off here.
        let count = count & 0x0FFF_FFFF;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let domain_id = c.read_u32::<LittleEndian>()?;
            let server_id = c.read_u32::<LittleEndian>()?;
            let sequence = c.read_u64::<LittleEndian>()?;
            entries.push(MariadbGtid::new(domain_id, server_id, sequence));
        }
        Ok(GtidListEvent {
            list: GtidList::new(entries),
        })
    }
}
