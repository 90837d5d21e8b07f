//! Typed content store
//!
//! The final path -> bytes view of a fully processed pack. Downstream
//! converters read and write through typed accessors: UTF-8 text,
//! `\n`-joined line lists, `key=value` language tables, JSON documents and
//! PNG images. Parsed language tables are cached per path; every write to a
//! path drops or replaces that path's cache entry, so readers never observe
//! a stale table.

use crate::archive;
use crate::error::{PackError, Result};
use image::DynamicImage;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;

/// Separator used by the line-list codec.
///
/// This is the literal two-character sequence backslash + `n`, not a
/// newline byte; the wire format stores line lists this way.
const LINE_SEPARATOR: &str = "\\n";

/// Ordered path -> bytes mapping with typed accessors.
///
/// Iteration order is insertion order, which also fixes the entry order of
/// [`PackContents::to_zip`].
#[derive(Debug, Default, Clone)]
pub struct PackContents {
    entries: IndexMap<String, Vec<u8>>,
    lang_cache: HashMap<String, HashMap<String, String>>,
}

impl PackContents {
    /// Wrap an extracted path -> bytes mapping.
    pub fn new(entries: IndexMap<String, Vec<u8>>) -> Self {
        PackContents {
            entries,
            lang_cache: HashMap::new(),
        }
    }

    /// Raw bytes of an entry.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(Vec::as_slice)
    }

    /// Insert or replace an entry, returning the previous bytes.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        let path = path.into();
        self.lang_cache.remove(&path);
        self.entries.insert(path, bytes)
    }

    /// Remove an entry, returning its bytes.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.lang_cache.remove(path);
        self.entries.shift_remove(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry paths in iteration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
    }

    /// Entry decoded as UTF-8 text (lossy).
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Write an entry as UTF-8 text.
    pub fn put_string(&mut self, path: impl Into<String>, text: impl AsRef<str>) {
        self.insert(path, text.as_ref().as_bytes().to_vec());
    }

    /// Entry decoded as a `\n`-separated line list.
    pub fn get_lines(&self, path: &str) -> Option<Vec<String>> {
        self.get_string(path)
            .map(|text| text.split(LINE_SEPARATOR).map(str::to_string).collect())
    }

    /// Write an entry as a `\n`-joined line list.
    pub fn put_lines<S: AsRef<str>>(&mut self, path: impl Into<String>, lines: &[S]) {
        let joined = lines
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(LINE_SEPARATOR);
        self.put_string(path, joined);
    }

    /// Entry parsed as a `key=value` language table.
    ///
    /// Lines starting with `##` are dropped; an inline `##` truncates the
    /// line before the `=` split; keys and values are trimmed; the last
    /// duplicate key wins. The parsed table is cached until the path is
    /// next written.
    pub fn get_lang(&mut self, path: &str) -> Option<&HashMap<String, String>> {
        if !self.lang_cache.contains_key(path) {
            let lines = self.get_lines(path)?;
            self.lang_cache
                .insert(path.to_string(), parse_lang(&lines));
        }
        self.lang_cache.get(path)
    }

    /// Write an entry as a language table and cache the parsed form.
    pub fn put_lang(&mut self, path: impl Into<String>, table: &HashMap<String, String>) {
        let path = path.into();
        let lines: Vec<String> = table
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        self.put_lines(path.as_str(), &lines);
        // put_lines dropped the cache entry; reinstall the fresh table
        self.lang_cache.insert(path, table.clone());
    }

    /// Entry parsed as a JSON document.
    pub fn get_json(&self, path: &str) -> Result<Value> {
        let bytes = self
            .get(path)
            .ok_or_else(|| PackError::MissingEntry(path.to_string()))?;
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Entry parsed as JSON with object keys recursively sorted.
    pub fn get_sorted_json(&self, path: &str) -> Result<Value> {
        Ok(sort_json(self.get_json(path)?))
    }

    /// Write an entry as a JSON document.
    pub fn put_json(&mut self, path: impl Into<String>, value: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.insert(path, bytes);
        Ok(())
    }

    /// Entry decoded as a PNG image.
    pub fn get_image(&self, path: &str) -> Result<DynamicImage> {
        let bytes = self
            .get(path)
            .ok_or_else(|| PackError::MissingEntry(path.to_string()))?;
        Ok(image::load_from_memory_with_format(
            bytes,
            image::ImageFormat::Png,
        )?)
    }

    /// Write an entry as PNG-encoded image bytes.
    pub fn put_image(&mut self, path: impl Into<String>, image: &DynamicImage) -> Result<()> {
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
        self.insert(path, bytes);
        Ok(())
    }

    /// Serialize the whole store as a zip archive, one entry per path in
    /// iteration order.
    pub fn to_zip(&self) -> Result<Vec<u8>> {
        archive::to_zip(&self.entries)
    }
}

/// Parse `key=value` language lines into a table.
fn parse_lang(lines: &[String]) -> HashMap<String, String> {
    let mut table = HashMap::new();
    for line in lines {
        if line.starts_with("##") {
            continue;
        }
        let line = match line.find("##") {
            Some(i) => &line[..i],
            None => line.as_str(),
        };
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        table.insert(key.trim().to_string(), value.trim().to_string());
    }
    table
}

/// Recursively sort JSON object keys by natural string order.
///
/// Useful for diff-stable serialization of documents whose producers emit
/// keys in arbitrary order.
pub fn sort_json(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_json(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}
