//! AES-256-CFB8 content decryption
//!
//! Protected pack entries are encrypted with AES-256 in CFB-8 mode, with the
//! initialization vector taken from the first 16 bytes of the key itself.
//! The key-as-IV construction is part of the wire format: both producer and
//! consumer must derive the identical stream, so it is reproduced here
//! exactly even though it is weak as cryptography.
//!
//! The same primitive serves the pack-wide content key and every per-file
//! key from the content directory.

use crate::error::{PackError, Result};
use aes::Aes256;
use cfb8::cipher::{AsyncStreamCipher, KeyIvInit};

/// Required key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// IV length in bytes; the IV is `key[..IV_LEN]`.
pub const IV_LEN: usize = 16;

type Aes256Cfb8Enc = cfb8::Encryptor<Aes256>;
type Aes256Cfb8Dec = cfb8::Decryptor<Aes256>;

fn check_key(key: &[u8]) -> Result<()> {
    if key.len() != KEY_LEN {
        return Err(PackError::InvalidKeyLength(key.len()));
    }
    Ok(())
}

/// Decrypt `data` in place under `key` with the self-derived IV.
pub fn decrypt_in_place(key: &[u8], data: &mut [u8]) -> Result<()> {
    check_key(key)?;
    let cipher = Aes256Cfb8Dec::new_from_slices(key, &key[..IV_LEN])
        .map_err(|_| PackError::InvalidKeyLength(key.len()))?;
    cipher.decrypt(data);
    Ok(())
}

/// Encrypt `data` in place under `key` with the self-derived IV.
///
/// The intake pipeline itself only decrypts; encryption exists for
/// producing protected packs and for round-trip tests.
pub fn encrypt_in_place(key: &[u8], data: &mut [u8]) -> Result<()> {
    check_key(key)?;
    let cipher = Aes256Cfb8Enc::new_from_slices(key, &key[..IV_LEN])
        .map_err(|_| PackError::InvalidKeyLength(key.len()))?;
    cipher.encrypt(data);
    Ok(())
}

/// Map a key string to its wire bytes.
///
/// Keys travel as Latin-1 text: one byte per code point, low byte only.
pub fn key_bytes(key: &str) -> Vec<u8> {
    key.chars().map(|c| c as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8; 32] = b"s5s5ejuDru4uchuF2drUFuthaspAbepE";

    #[test]
    fn test_round_trip() {
        let mut data = b"protected entry contents".to_vec();
        encrypt_in_place(KEY, &mut data).unwrap();
        assert_ne!(&data, b"protected entry contents");
        decrypt_in_place(KEY, &mut data).unwrap();
        assert_eq!(&data, b"protected entry contents");
    }

    #[test]
    fn test_deterministic_stream() {
        // The IV is derived from the key, so the same key always yields the
        // same ciphertext for the same plaintext
        let mut a = b"same plaintext".to_vec();
        let mut b = b"same plaintext".to_vec();
        encrypt_in_place(KEY, &mut a).unwrap();
        encrypt_in_place(KEY, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrong_key_does_not_recover() {
        let other = b"AbepEs5s5ejuDru4uchuF2drUFuthasp";
        let mut data = b"protected entry contents".to_vec();
        encrypt_in_place(KEY, &mut data).unwrap();
        decrypt_in_place(other, &mut data).unwrap();
        assert_ne!(&data, b"protected entry contents");
    }

    #[test]
    fn test_rejects_short_key() {
        let mut data = vec![0u8; 16];
        let err = decrypt_in_place(b"too-short", &mut data).unwrap_err();
        assert!(matches!(err, PackError::InvalidKeyLength(9)));
    }

    #[test]
    fn test_empty_data() {
        let mut data = Vec::new();
        encrypt_in_place(KEY, &mut data).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_key_bytes_latin1() {
        assert_eq!(key_bytes("abc"), b"abc");
        assert_eq!(key_bytes("\u{00ff}"), vec![0xff]);
    }
}
