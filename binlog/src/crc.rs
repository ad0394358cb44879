//! CRC32 event validation, spec.md §4.4.
//!
//! When the FDE advertises `BINLOG_CHECKSUM_ALG_CRC32`, every subsequent
//! event's last 4 bytes are a CRC32 over everything before them.

use common::err::decode_error::ReError;

pub const CHECKSUM_LEN: usize = 4;

/// `event` is the full header+body, with the trailing 4-byte checksum
/// still attached. Returns an error if it does not match.
pub fn verify(event: &[u8]) -> Result<(), ReError> {
    if event.len() < CHECKSUM_LEN {
        return Err(ReError::ChecksumMismatch("event shorter than a CRC32 trailer".to_string()));
    }
    let (body, trailer) = event.split_at(event.len() - CHECKSUM_LEN);
    let expected = u32::from_le_bytes(trailer.try_into().unwrap());
    let actual = crc32fast::hash(body);
    if actual != expected {
        return Err(ReError::ChecksumMismatch(format!(
            "crc32 mismatch: expected {:08x} got {:08x}",
            expected, actual
        )));
    }
    Ok(())
}

/// Computes and appends a trailing CRC32 to `body`, returning the full
/// on-the-wire event bytes.
pub fn append(mut body: Vec<u8>) -> Vec<u8> {
    let crc = crc32fast::hash(&body);
    body.extend_from_slice(&crc.to_le_bytes());
    body
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips() {
        let event = append(vec![1, 2, 3, 4, 5]);
        assert!(verify(&event).is_ok());
    }

    #[test]
    fn detects_single_byte_mutation() {
        let mut event = append(vec![1, 2, 3, 4, 5]);
        event[2] ^= 0xff;
        assert!(verify(&event).is_err());
    }
}
