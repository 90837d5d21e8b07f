//! # respack-rs - Chunked Resource Pack Intake
//!
//! `respack-rs` turns a content pack delivered in fragments over an
//! unreliable transport into a typed, queryable content store:
//!
//! - **Fragment reassembly** with duplicate and out-of-range tolerance
//! - **SHA-256 integrity check** over the assembled buffer (optional)
//! - **Zip extraction** with single-wrapping-folder normalization
//! - **Content decryption**: AES-256-CFB8 with the wire format's
//!   key-derived IV, driven by an encrypted per-pack content directory
//! - **Manifest validation** against the pack's out-of-band identity
//! - **Typed content store**: text, line lists, language tables, JSON and
//!   PNG accessors plus re-serialization to a zip archive
//!
//! The pipeline runs synchronously the moment the last fragment arrives and
//! either installs a complete [`PackContents`] or surfaces one terminal
//! error; no partial store is ever observable.
//!
//! ## Quick Start
//!
//! ```rust
//! use respack_rs::{Pack, PackContents};
//! use uuid::Uuid;
//!
//! # fn main() -> respack_rs::Result<()> {
//! // Build a pack archive (normally this arrives from the transport)
//! let id = Uuid::new_v4();
//! let mut source = PackContents::default();
//! source.put_json("manifest.json", &serde_json::json!({
//!     "format_version": 2,
//!     "header": { "uuid": id.to_string(), "version": [1, 0, 0] }
//! }))?;
//! source.put_string("texts/en_US.lang", "greeting=Hello");
//! let archive = source.to_zip()?;
//!
//! // Receive it in fragments
//! let mut pack = Pack::new(id, "1.0.0", "");
//! pack.declare_size(archive.len() as u32, 1024)?;
//! for (index, fragment) in archive.chunks(1024).enumerate() {
//!     pack.submit_fragment(index as u32, fragment)?;
//! }
//!
//! let store = pack.contents_mut().expect("pipeline complete");
//! let lang = store.get_lang("texts/en_US.lang").expect("lang table");
//! assert_eq!(lang.get("greeting").map(String::as_str), Some("Hello"));
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod contents;
pub mod crypto;
pub mod error;
pub mod manifest;
pub mod pack;
pub mod registry;
pub mod store;
pub mod transfer;

pub use contents::DIRECTORY_PATH;
pub use error::{PackError, Result};
pub use manifest::{set_validation, validation_enabled, Manifest, MANIFEST_PATH};
pub use pack::{Pack, PackType};
pub use registry::PackRegistry;
pub use store::{sort_json, PackContents};
pub use transfer::FragmentAssembler;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
