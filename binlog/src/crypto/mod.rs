//! MariaDB 10.1 binlog event encryption (spec.md §4.4).
//!
//! Per-event IV = `nonce || u32be(event_pos)`. Encryption works over the
//! event bytes `[4..L)` (the first 4 bytes, the timestamp, are left alone
//! on the wire so a gap-filling reader never has to decrypt to locate the
//! next event by its clear size field). To keep a readable size field
//! available without the key, the (4-byte) event-size field normally at
//! offset `[9..13)` and the (4-byte) timestamp normally at `[0..4)` trade
//! places around the cipher step:
//!
//!   1. stash the clear size `SZ = event[9..13)`
//!   2. copy the timestamp into the size slot: `event[9..13) = event[0..4)`
//!   3. cipher `event[4..L)` in place
//!   4. restore the size field in clear: `event[0..4) = SZ`
//!
//! so after encryption `event[0..4)` is the plaintext size and
//! `event[9..13)` holds the now-encrypted timestamp. Decryption runs the
//! mirror image. AES-CTR handles arbitrary lengths directly; AES-CBC is
//! block-aligned, so any trailing partial block is instead XORed against
//! `AES-ECB(key, running_iv)` to preserve the event's length exactly.

use common::config::router_config::EncryptionAlgorithm;
use common::err::decode_error::ReError;
use openssl::symm::{Cipher, Crypter, Mode};

const BLOCK_LEN: usize = 16;

fn cbc_cipher_for_key_len(key_len: usize) -> Result<Cipher, ReError> {
    match key_len {
        16 => Ok(Cipher::aes_128_cbc()),
        24 => Ok(Cipher::aes_192_cbc()),
        32 => Ok(Cipher::aes_256_cbc()),
        n => Err(ReError::EncryptionErr(format!("unsupported AES key length: {}", n))),
    }
}

fn ecb_cipher_for_key_len(key_len: usize) -> Result<Cipher, ReError> {
    match key_len {
        16 => Ok(Cipher::aes_128_ecb()),
        24 => Ok(Cipher::aes_192_ecb()),
        32 => Ok(Cipher::aes_256_ecb()),
        n => Err(ReError::EncryptionErr(format!("unsupported AES key length: {}", n))),
    }
}

fn ctr_cipher_for_key_len(key_len: usize) -> Result<Cipher, ReError> {
    match key_len {
        16 => Ok(Cipher::aes_128_ctr()),
        24 => Ok(Cipher::aes_192_ctr()),
        32 => Ok(Cipher::aes_256_ctr()),
        n => Err(ReError::EncryptionErr(format!("unsupported AES key length: {}", n))),
    }
}

/// One AES-ECB block encryption of `iv`, used to derive the CBC tail
/// keystream. `iv` is exactly 16 bytes (the per-event IV).
fn ecb_encrypt_block(key: &[u8], iv: &[u8; 16]) -> Result<[u8; 16], ReError> {
    let cipher = ecb_cipher_for_key_len(key.len())?;
    let mut crypter = Crypter::new(cipher, Mode::Encrypt, key, None)
        .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
    crypter.pad(false);
    let mut out = vec![0u8; BLOCK_LEN + cipher.block_size()];
    let mut n = crypter
        .update(iv, &mut out)
        .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
    n += crypter
        .finalize(&mut out[n..])
        .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
    let mut block = [0u8; BLOCK_LEN];
    block.copy_from_slice(&out[..BLOCK_LEN.min(n)]);
    Ok(block)
}

fn cbc_transform(mode: Mode, key: &[u8], iv: &[u8; 16], data: &mut [u8]) -> Result<(), ReError> {
    let full_len = (data.len() / BLOCK_LEN) * BLOCK_LEN;
    let (full, tail) = data.split_at_mut(full_len);

    let mut running_iv = *iv;
    if full_len > 0 {
        let cipher = cbc_cipher_for_key_len(key.len())?;
        let mut crypter =
            Crypter::new(cipher, mode, key, Some(iv)).map_err(|e| ReError::EncryptionErr(e.to_string()))?;
        crypter.pad(false);
        let mut out = vec![0u8; full_len + cipher.block_size()];
        let mut n = crypter
            .update(full, &mut out)
            .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
        n += crypter
            .finalize(&mut out[n..])
            .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
        full.copy_from_slice(&out[..n]);
        running_iv.copy_from_slice(&full[full_len - BLOCK_LEN..]);
    }

    if !tail.is_empty() {
        let keystream = ecb_encrypt_block(key, &running_iv)?;
        for (b, k) in tail.iter_mut().zip(keystream.iter()) {
            *b ^= *k;
        }
    }
    Ok(())
}

fn ctr_transform(mode: Mode, key: &[u8], iv: &[u8; 16], data: &mut [u8]) -> Result<(), ReError> {
    let cipher = ctr_cipher_for_key_len(key.len())?;
    let mut crypter =
        Crypter::new(cipher, mode, key, Some(iv)).map_err(|e| ReError::EncryptionErr(e.to_string()))?;
    crypter.pad(false);
    let mut out = vec![0u8; data.len() + cipher.block_size()];
    let mut n = crypter
        .update(data, &mut out)
        .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
    n += crypter
        .finalize(&mut out[n..])
        .map_err(|e| ReError::EncryptionErr(e.to_string()))?;
    data.copy_from_slice(&out[..data.len().min(n)]);
    Ok(())
}

fn rotate_size_field(event: &mut [u8], restore: bool) -> Result<(), ReError> {
    if event.len() < 13 {
        return Err(ReError::EncryptionErr("event shorter than fixed header".to_string()));
    }
    if !restore {
        // encrypt path: stash SZ, copy TS into the size slot.
        let mut sz = [0u8; 4];
        sz.copy_from_slice(&event[9..13]);
        let mut ts = [0u8; 4];
        ts.copy_from_slice(&event[0..4]);
        event[9..13].copy_from_slice(&ts);
        event[0..4].copy_from_slice(&sz);
        // NB: `sz` (the true clear size) now occupies [0..4); the encrypted
        // body will leave the relocated `ts` at [9..13) as ciphertext.
    } else {
        // decrypt path: after deciphering, [9..13) holds the plaintext
        // timestamp, [0..4) still holds the clear size stashed by encrypt.
        let mut sz = [0u8; 4];
        sz.copy_from_slice(&event[0..4]);
        let mut ts = [0u8; 4];
        ts.copy_from_slice(&event[9..13]);
        event[0..4].copy_from_slice(&ts);
        event[9..13].copy_from_slice(&sz);
    }
    Ok(())
}

/// Encrypt `event` (full header + body, header field layout intact) in
/// place using `algorithm`, `key` and the per-event IV `nonce || be(pos)`.
pub fn encrypt_event(
    event: &mut [u8],
    algorithm: EncryptionAlgorithm,
    key: &[u8],
    iv: &[u8; 16],
) -> Result<(), ReError> {
    rotate_size_field(event, false)?;
    let body = &mut event[4..];
    match algorithm {
        EncryptionAlgorithm::AesCbc => cbc_transform(Mode::Encrypt, key, iv, body),
        EncryptionAlgorithm::AesCtr => ctr_transform(Mode::Encrypt, key, iv, body),
    }
}

/// Inverse of [`encrypt_event`].
pub fn decrypt_event(
    event: &mut [u8],
    algorithm: EncryptionAlgorithm,
    key: &[u8],
    iv: &[u8; 16],
) -> Result<(), ReError> {
    let body = &mut event[4..];
    match algorithm {
        EncryptionAlgorithm::AesCbc => cbc_transform(Mode::Decrypt, key, iv, body)?,
        EncryptionAlgorithm::AesCtr => ctr_transform(Mode::Decrypt, key, iv, body)?,
    }
    rotate_size_field(event, true)
}

/// Parses the `1;<hex-key>` line format of a `file_key_management` key
/// file, spec.md §6 "Encryption key file". Blank lines and lines starting
/// with `#` are skipped; only the row whose numeric id is 1 is used.
///
/// Mirrors the documented real-world bug: `from_hex` does not validate its
/// input and silently maps non-hex digits to zero (spec.md §9).
pub fn parse_key_file(contents: &str) -> Result<Vec<u8>, ReError> {
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(2, ';');
        let id = parts.next().unwrap_or("");
        let hex_key = parts.next().unwrap_or("");
        if id.trim() == "1" {
            let key = from_hex_lossy(hex_key.trim());
            return match key.len() {
                16 | 24 | 32 => Ok(key),
                n => Err(ReError::EncryptionErr(format!("unsupported key length: {}", n))),
            };
        }
    }
    Err(ReError::EncryptionErr("no key with id 1 found".to_string()))
}

/// Like `hex::decode`, but never fails: any non-hex nibble decodes as 0.
/// Spec.md §9 notes this matches the original's lenient `from_hex`.
fn from_hex_lossy(s: &str) -> Vec<u8> {
    let nibble = |c: u8| -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => 0,
        }
    };
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len() / 2);
    let mut i = 0;
    while i + 1 < bytes.len() {
        out.push((nibble(bytes[i]) << 4) | nibble(bytes[i + 1]));
        i += 2;
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_event(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn cbc_round_trip_preserves_length_for_various_sizes() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        for len in [19usize, 32, 33, 47, 64, 100] {
            let orig = sample_event(len);
            let mut buf = orig.clone();
            encrypt_event(&mut buf, EncryptionAlgorithm::AesCbc, &key, &iv).unwrap();
            assert_eq!(buf.len(), orig.len());
            assert_eq!(&buf[0..4], &orig[0..4], "clear size field must be readable");
            decrypt_event(&mut buf, EncryptionAlgorithm::AesCbc, &key, &iv).unwrap();
            assert_eq!(buf, orig);
        }
    }

    #[test]
    fn ctr_round_trip() {
        let key = [0x33u8; 24];
        let iv = [0x44u8; 16];
        let orig = sample_event(50);
        let mut buf = orig.clone();
        encrypt_event(&mut buf, EncryptionAlgorithm::AesCtr, &key, &iv).unwrap();
        assert_eq!(&buf[0..4], &orig[0..4]);
        decrypt_event(&mut buf, EncryptionAlgorithm::AesCtr, &key, &iv).unwrap();
        assert_eq!(buf, orig);
    }

    #[test]
    fn key_file_parses_numbered_line_and_skips_comments() {
        let contents = "# comment\n\n1;0102030405060708090a0b0c0d0e0f10\n2;ff\n";
        let key = parse_key_file(contents).unwrap();
        assert_eq!(key.len(), 16);
        assert_eq!(key[0], 0x01);
    }

    #[test]
    fn from_hex_lossy_treats_bad_digits_as_zero() {
        assert_eq!(from_hex_lossy("zz"), vec![0x00]);
    }
}
