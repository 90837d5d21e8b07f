//! Encrypted content directory
//!
//! A protected pack carries a `contents.json` entry whose tail is encrypted
//! with the pack's content key. Once decrypted it lists every protected
//! entry together with that entry's own decryption key. A fixed binary
//! header in front of the ciphertext names the content id the directory
//! belongs to, which must match the id the pack was declared with.

use crate::crypto;
use crate::error::{PackError, Result};
use crate::store::PackContents;
use serde::Deserialize;
use tracing::{debug, warn};

/// Path of the content directory entry.
pub const DIRECTORY_PATH: &str = "contents.json";

/// Magic constant identifying an encrypted content directory.
const ENCRYPTED_MAGIC: [u8; 4] = [0xFC, 0xB9, 0xCF, 0x9B];

/// Offset of the length-prefixed content id inside the header.
const CONTENT_ID_OFFSET: usize = 16;

/// Fixed header size; the ciphertext starts here.
const HEADER_LEN: usize = 256;

/// Entries always delivered in cleartext, even when listed with a key.
const CLEARTEXT_PATHS: [&str; 3] = ["manifest.json", "pack_icon.png", "README.txt"];

#[derive(Debug, Deserialize)]
struct Directory {
    content: Vec<DirectoryEntry>,
}

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    #[serde(default)]
    key: Option<String>,
    path: String,
}

/// Decrypt a protected pack in place.
///
/// Decrypts the content directory under `content_key`, checks its magic and
/// content id, then decrypts every listed entry under that entry's own key.
/// Listed paths absent from the store are logged and left alone.
pub fn decrypt_pack(
    store: &mut PackContents,
    content_key: &[u8],
    expected_content_id: &str,
) -> Result<()> {
    let raw = store
        .get(DIRECTORY_PATH)
        .ok_or_else(|| PackError::MissingEntry(DIRECTORY_PATH.to_string()))?;
    let listing = decrypt_directory(raw, content_key, expected_content_id)?;
    let directory: Directory = serde_json::from_slice(&listing)?;
    store.insert(DIRECTORY_PATH, listing);
    debug!(
        "Content directory decrypted with {} entries",
        directory.content.len()
    );

    for entry in &directory.content {
        let Some(key) = entry.key.as_deref() else {
            continue;
        };
        if CLEARTEXT_PATHS.contains(&entry.path.as_str()) {
            continue;
        }
        let Some(bytes) = store.get(&entry.path) else {
            warn!("Listed entry {} missing from pack", entry.path);
            continue;
        };
        let mut bytes = bytes.to_vec();
        crypto::decrypt_in_place(&crypto::key_bytes(key), &mut bytes)?;
        store.insert(entry.path.clone(), bytes);
    }
    Ok(())
}

/// Validate the directory header and decrypt the ciphertext tail.
///
/// Header layout: bytes [0,4) format version (ignored), [4,8) magic, [16]
/// content id length, [17..) content id, padding up to 256, ciphertext
/// after.
fn decrypt_directory(
    raw: &[u8],
    content_key: &[u8],
    expected_content_id: &str,
) -> Result<Vec<u8>> {
    if raw.len() < HEADER_LEN {
        return Err(PackError::DirectoryTruncated(raw.len()));
    }
    let mut magic = [0u8; 4];
    magic.copy_from_slice(&raw[4..8]);
    if magic != ENCRYPTED_MAGIC {
        return Err(PackError::DirectoryMagicMismatch(magic));
    }
    let id_len = raw[CONTENT_ID_OFFSET] as usize;
    let id_start = CONTENT_ID_OFFSET + 1;
    if id_start + id_len > HEADER_LEN {
        return Err(PackError::InvalidDirectory(format!(
            "content id of {id_len} bytes overruns the header"
        )));
    }
    let content_id = std::str::from_utf8(&raw[id_start..id_start + id_len])
        .map_err(|e| PackError::InvalidDirectory(format!("bad content id: {e}")))?;
    if !content_id.eq_ignore_ascii_case(expected_content_id) {
        return Err(PackError::ContentIdMismatch {
            expected: expected_content_id.to_string(),
            actual: content_id.to_string(),
        });
    }
    let mut body = raw[HEADER_LEN..].to_vec();
    crypto::decrypt_in_place(content_key, &mut body)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTENT_KEY: &[u8; 32] = b"DRowaQUcrE5tltLmMn6ustu6uwlXaCHA";
    const FILE_KEY: &str = "XaCHADRowaQUcrE5tltLmMn6ustu6uwl";

    fn encode_directory(content_id: &str, listing: &[u8], key: &[u8]) -> Vec<u8> {
        let mut raw = vec![0u8; HEADER_LEN];
        raw[4..8].copy_from_slice(&ENCRYPTED_MAGIC);
        raw[CONTENT_ID_OFFSET] = content_id.len() as u8;
        raw[CONTENT_ID_OFFSET + 1..CONTENT_ID_OFFSET + 1 + content_id.len()]
            .copy_from_slice(content_id.as_bytes());
        let mut body = listing.to_vec();
        crypto::encrypt_in_place(key, &mut body).unwrap();
        raw.extend_from_slice(&body);
        raw
    }

    fn protected_store(listing: &str) -> PackContents {
        let mut store = PackContents::default();
        store.insert(
            DIRECTORY_PATH,
            encode_directory("com.example.pack", listing.as_bytes(), CONTENT_KEY),
        );
        store
    }

    #[test]
    fn test_decrypts_listed_entries() {
        let listing = format!(
            r#"{{"content":[{{"path":"scripts/main.js","key":"{FILE_KEY}"}},{{"path":"README.txt","key":null}}]}}"#
        );
        let mut store = protected_store(&listing);
        let mut secret = b"console.log(1)".to_vec();
        crypto::encrypt_in_place(&crypto::key_bytes(FILE_KEY), &mut secret).unwrap();
        store.insert("scripts/main.js", secret);
        store.put_string("README.txt", "readme");

        decrypt_pack(&mut store, CONTENT_KEY, "com.example.pack").unwrap();

        assert_eq!(store.get("scripts/main.js").unwrap(), b"console.log(1)");
        assert_eq!(store.get_string("README.txt").as_deref(), Some("readme"));
        // The directory entry now holds the decrypted listing
        assert_eq!(store.get(DIRECTORY_PATH).unwrap(), listing.as_bytes());
    }

    #[test]
    fn test_case_insensitive_content_id() {
        let mut store = protected_store(r#"{"content":[]}"#);
        decrypt_pack(&mut store, CONTENT_KEY, "COM.EXAMPLE.PACK").unwrap();
    }

    #[test]
    fn test_cleartext_exemptions_are_skipped() {
        let listing = format!(
            r#"{{"content":[{{"path":"manifest.json","key":"{FILE_KEY}"}},{{"path":"pack_icon.png","key":"{FILE_KEY}"}}]}}"#
        );
        let mut store = protected_store(&listing);
        store.put_string("manifest.json", "{}");

        decrypt_pack(&mut store, CONTENT_KEY, "com.example.pack").unwrap();

        // Exempt entries are untouched even though the listing carries keys
        assert_eq!(store.get_string("manifest.json").as_deref(), Some("{}"));
        assert!(!store.contains("pack_icon.png"));
    }

    #[test]
    fn test_missing_listed_entry_is_tolerated() {
        let listing = format!(r#"{{"content":[{{"path":"gone.bin","key":"{FILE_KEY}"}}]}}"#);
        let mut store = protected_store(&listing);
        decrypt_pack(&mut store, CONTENT_KEY, "com.example.pack").unwrap();
        assert!(!store.contains("gone.bin"));
    }

    #[test]
    fn test_magic_mismatch_is_fatal() {
        let mut store = protected_store(r#"{"content":[]}"#);
        let mut raw = store.get(DIRECTORY_PATH).unwrap().to_vec();
        raw[4] = 0x00;
        store.insert(DIRECTORY_PATH, raw);
        let err = decrypt_pack(&mut store, CONTENT_KEY, "com.example.pack").unwrap_err();
        assert!(matches!(err, PackError::DirectoryMagicMismatch(_)));
    }

    #[test]
    fn test_content_id_mismatch_is_fatal() {
        let mut store = protected_store(r#"{"content":[]}"#);
        let err = decrypt_pack(&mut store, CONTENT_KEY, "com.other.pack").unwrap_err();
        assert!(matches!(err, PackError::ContentIdMismatch { .. }));
    }

    #[test]
    fn test_truncated_directory_is_fatal() {
        let mut store = PackContents::default();
        store.insert(DIRECTORY_PATH, vec![0u8; 64]);
        let err = decrypt_pack(&mut store, CONTENT_KEY, "com.example.pack").unwrap_err();
        assert!(matches!(err, PackError::DirectoryTruncated(64)));
    }

    #[test]
    fn test_malformed_listing_is_fatal() {
        let mut store = protected_store("not json at all");
        let err = decrypt_pack(&mut store, CONTENT_KEY, "com.example.pack").unwrap_err();
        assert!(matches!(err, PackError::Json(_)));
    }
}
