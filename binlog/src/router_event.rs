//! Router-level view of a binlog event.
//!
//! The binlog router (spec.md §3, "Event kinds tracked") only needs to
//! fully parse a handful of event kinds; everything else passes through the
//! file manager opaquely. It never needs a table's schema to do its job, so
//! it has no dependency on column/row decoding or table-map caches.

use crate::events::event_header::Header;
use crate::events::event_header_flag::EventFlag;
use common::err::decode_error::ReError;

/// Event type codes the router must recognize by number, either because
/// they carry transaction-boundary information or because MariaDB assigns
/// them outside the MySQL 0..35 range.
pub mod event_type {
    pub const START_EVENT_V3: u8 = 1;
    pub const QUERY_EVENT: u8 = 2;
    pub const ROTATE_EVENT: u8 = 4;
    pub const FORMAT_DESCRIPTION_EVENT: u8 = 15;
    pub const XID_EVENT: u8 = 16;
    pub const HEARTBEAT_LOG_EVENT: u8 = 27;
    pub const IGNORABLE_LOG_EVENT: u8 = 28;

    /// MariaDB-specific event codes, outside the MySQL 0..35 range.
    pub const ANNOTATE_ROWS_EVENT: u8 = 160;
    pub const BINLOG_CHECKPOINT_EVENT: u8 = 161;
    pub const GTID_EVENT: u8 = 162;
    pub const GTID_LIST_EVENT: u8 = 163;
    pub const START_ENCRYPTION_EVENT: u8 = 164;
}

/// A binlog event as the router sees it: a parsed 19-byte header plus the
/// still-encoded (and, if applicable, still-encrypted) body bytes.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub header: Header,
    pub body: Vec<u8>,
}

impl RawEvent {
    pub fn new(header: Header, body: Vec<u8>) -> Self {
        RawEvent { header, body }
    }

    pub fn event_type(&self) -> u8 {
        self.header.get_event_type()
    }

    pub fn flags(&self) -> EventFlag {
        self.header.get_flags_attr()
    }

    /// Full on-the-wire length: 19-byte header + body (body already
    /// includes the trailing checksum, when present).
    pub fn total_len(&self) -> u32 {
        19 + self.body.len() as u32
    }

    /// Assembles a complete on-the-wire event from scratch: 19-byte header
    /// plus `body`, with a trailing CRC32 checksum appended — the inverse of
    /// `parse`. Used for events the router synthesizes itself rather than
    /// relays (`IGNORABLE_EVENT` gap-fillers, fake `GTID_LIST_EVENT`s).
    pub fn build(when: u32, event_type: u8, server_id: u32, log_pos: u32, flags: u16, body: Vec<u8>) -> Vec<u8> {
        let body = crate::crc::append(body);
        let event_length = 19 + body.len() as u32;
        let mut out = Vec::with_capacity(event_length as usize);
        out.extend_from_slice(&when.to_le_bytes());
        out.push(event_type);
        out.extend_from_slice(&server_id.to_le_bytes());
        out.extend_from_slice(&event_length.to_le_bytes());
        out.extend_from_slice(&log_pos.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Parse the 19-byte header followed by the rest of the event from a
    /// fully reassembled buffer (see spec.md §4.4, reassembly).
    pub fn parse(buf: &[u8]) -> Result<RawEvent, ReError> {
        if buf.len() < 19 {
            return Err(ReError::CorruptBinlog(format!(
                "event buffer too short: {} bytes",
                buf.len()
            )));
        }
        let (rest, header) = Header::parse_v4_header(buf)
            .map_err(|e| ReError::CorruptBinlog(format!("bad event header: {:?}", e)))?;
        if header.event_length == 0 {
            return Err(ReError::CorruptBinlog("event_length is zero".to_string()));
        }
        let body_len = header.event_length as usize - 19;
        if rest.len() < body_len {
            return Err(ReError::CorruptBinlog(format!(
                "event body truncated: want {} have {}",
                body_len,
                rest.len()
            )));
        }
        Ok(RawEvent::new(header, rest[..body_len].to_vec()))
    }
}
