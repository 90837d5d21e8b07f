//! Zip container decode and encode
//!
//! Packs travel as ordinary zip archives. Extraction produces an ordered
//! path -> bytes mapping with entry bytes preserved exactly and archive
//! order retained; serialization writes one entry per mapping key in
//! iteration order. Archives that wrap everything in a single top-level
//! folder are normalized by stripping that folder from every path.

use crate::error::Result;
use crate::manifest::MANIFEST_PATH;
use indexmap::IndexMap;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Decode `data` as a zip archive into an ordered path -> bytes mapping.
///
/// Directory entries are skipped. If the result has no root-level
/// `manifest.json`, every path is rewritten by stripping its first segment.
pub fn extract(data: &[u8]) -> Result<IndexMap<String, Vec<u8>>> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut entries = IndexMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        entries.insert(file.name().to_string(), bytes);
    }
    if !entries.contains_key(MANIFEST_PATH) {
        debug!("No root-level manifest, stripping wrapping directory");
        entries = strip_wrapping_directory(entries);
    }
    Ok(entries)
}

/// Drop the first path segment of every entry, up to and including the
/// first `/`. Paths without a separator are kept as-is.
fn strip_wrapping_directory(entries: IndexMap<String, Vec<u8>>) -> IndexMap<String, Vec<u8>> {
    entries
        .into_iter()
        .map(|(path, bytes)| {
            let stripped = match path.find('/') {
                Some(i) => path[i + 1..].to_string(),
                None => path,
            };
            (stripped, bytes)
        })
        .collect()
}

/// Serialize an ordered path -> bytes mapping as a zip archive, one entry
/// per key in iteration order.
pub fn to_zip(entries: &IndexMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (path, bytes) in entries {
        writer.start_file(path.as_str(), FileOptions::default())?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(paths: &[(&str, &[u8])]) -> IndexMap<String, Vec<u8>> {
        paths
            .iter()
            .map(|(p, b)| (p.to_string(), b.to_vec()))
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_bytes_and_order() {
        let entries = sample(&[
            ("manifest.json", b"{}"),
            ("textures/a.png", &[0, 159, 146, 150]),
            ("empty.bin", b""),
        ]);
        let data = to_zip(&entries).unwrap();
        let extracted = extract(&data).unwrap();
        assert_eq!(extracted, entries);
        let order: Vec<&String> = extracted.keys().collect();
        assert_eq!(order, ["manifest.json", "textures/a.png", "empty.bin"]);
    }

    #[test]
    fn test_wrapping_directory_is_stripped() {
        let entries = sample(&[
            ("mypack/manifest.json", b"{}"),
            ("mypack/texts/en_US.lang", b"a=1"),
            ("loose.txt", b"x"),
        ]);
        let data = to_zip(&entries).unwrap();
        let extracted = extract(&data).unwrap();
        assert!(extracted.contains_key("manifest.json"));
        assert!(extracted.contains_key("texts/en_US.lang"));
        // No separator: kept verbatim
        assert!(extracted.contains_key("loose.txt"));
    }

    #[test]
    fn test_root_manifest_suppresses_strip() {
        let entries = sample(&[
            ("manifest.json", b"{}"),
            ("sub/inner.txt", b"inner"),
        ]);
        let data = to_zip(&entries).unwrap();
        let extracted = extract(&data).unwrap();
        assert_eq!(extracted, entries);
    }

    #[test]
    fn test_garbage_input_is_an_error() {
        assert!(extract(b"not a zip archive").is_err());
    }
}
