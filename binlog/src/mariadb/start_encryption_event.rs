//! MariaDB `START_ENCRYPTION_EVENT` (164) and the per-file encryption
//! context it establishes, spec.md §3 "Encryption context".

use byteorder::ReadBytesExt;
use common::err::decode_error::ReError;
use std::io::{Cursor, Read};

pub const NONCE_LEN: usize = 12;

/// `scheme (1) | key_version (4, LE) | nonce (12)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartEncryptionEvent {
    pub scheme: u8,
    pub key_version: u32,
    pub nonce: [u8; NONCE_LEN],
}

impl StartEncryptionEvent {
    pub fn parse(body: &[u8]) -> Result<Self, ReError> {
        let mut c = Cursor::new(body);
        let scheme = c
            .read_u8()
            .map_err(|e| ReError::CorruptBinlog(format!("START_ENCRYPTION scheme: {}", e)))?;
        let mut kv_buf = [0u8; 4];
        c.read_exact(&mut kv_buf)
            .map_err(|e| ReError::CorruptBinlog(format!("START_ENCRYPTION key_version: {}", e)))?;
        let key_version = u32::from_le_bytes(kv_buf);
        let mut nonce = [0u8; NONCE_LEN];
        c.read_exact(&mut nonce)
            .map_err(|e| ReError::CorruptBinlog(format!("START_ENCRYPTION nonce: {}", e)))?;
        Ok(StartEncryptionEvent {
            scheme,
            key_version,
            nonce,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 4 + NONCE_LEN);
        out.push(self.scheme);
        out.extend_from_slice(&self.key_version.to_le_bytes());
        out.extend_from_slice(&self.nonce);
        out
    }

    /// Per-event IV = `nonce || u32be(event_pos)`, spec.md §3/§4.4.
    pub fn iv_for_pos(&self, event_pos: u32) -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv[..NONCE_LEN].copy_from_slice(&self.nonce);
        iv[NONCE_LEN..].copy_from_slice(&event_pos.to_be_bytes());
        iv
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips() {
        let ev = StartEncryptionEvent {
            scheme: 1,
            key_version: 3,
            nonce: [7u8; NONCE_LEN],
        };
        let bytes = ev.serialize();
        let parsed = StartEncryptionEvent::parse(&bytes).unwrap();
        assert_eq!(parsed, ev);
    }

    #[test]
    fn iv_appends_big_endian_position() {
        let ev = StartEncryptionEvent {
            scheme: 1,
            key_version: 1,
            nonce: [0u8; NONCE_LEN],
        };
        let iv = ev.iv_for_pos(0x0102_0304);
        assert_eq!(&iv[12..], &[0x01, 0x02, 0x03, 0x04]);
    }
}
