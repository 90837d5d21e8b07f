//! Pack state and decode pipeline
//!
//! A [`Pack`] tracks one content package from size declaration through
//! fragment reassembly to the synchronous decode pipeline: integrity check,
//! archive extraction, conditional content decryption and manifest
//! validation. The assembled buffer is consumed by the pipeline exactly
//! once; afterwards the pack either owns a complete [`PackContents`] or the
//! terminal error has been surfaced to the caller and no partial store is
//! ever exposed.

use crate::archive;
use crate::contents;
use crate::error::{PackError, Result};
use crate::manifest::{self, Manifest};
use crate::store::PackContents;
use crate::transfer::FragmentAssembler;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use uuid::Uuid;

/// Kind of content package, passed through from the declaring packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackType {
    Invalid,
    Addon,
    Cached,
    CopyProtected,
    Behavior,
    PersonaPiece,
    #[default]
    Resources,
    Skins,
    WorldTemplate,
}

/// One content package in flight or resident.
#[derive(Debug)]
pub struct Pack {
    id: Uuid,
    version: String,
    content_id: String,
    sub_pack_name: String,
    content_key: Vec<u8>,
    scripting: bool,
    raytracing_capable: bool,
    premium: bool,
    pack_type: PackType,
    expected_hash: Option<[u8; 32]>,
    assembler: Option<FragmentAssembler>,
    contents: Option<PackContents>,
}

impl Pack {
    /// Create a pack shell from its out-of-band identity.
    pub fn new(id: Uuid, version: impl Into<String>, content_id: impl Into<String>) -> Self {
        Pack {
            id,
            version: version.into(),
            content_id: content_id.into(),
            sub_pack_name: String::new(),
            content_key: Vec::new(),
            scripting: false,
            raytracing_capable: false,
            premium: false,
            pack_type: PackType::default(),
            expected_hash: None,
            assembler: None,
            contents: None,
        }
    }

    /// Set the symmetric content key; an empty key means "not encrypted".
    pub fn with_content_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.content_key = key.into();
        self
    }

    /// Set the sub-pack name; empty means the root sub-pack.
    pub fn with_sub_pack_name(mut self, name: impl Into<String>) -> Self {
        self.sub_pack_name = name.into();
        self
    }

    /// Set the opaque capability flags.
    pub fn with_capabilities(mut self, scripting: bool, raytracing_capable: bool) -> Self {
        self.scripting = scripting;
        self.raytracing_capable = raytracing_capable;
        self
    }

    /// Set the pack type.
    pub fn with_pack_type(mut self, pack_type: PackType) -> Self {
        self.pack_type = pack_type;
        self
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn sub_pack_name(&self) -> &str {
        &self.sub_pack_name
    }

    pub fn content_key(&self) -> &[u8] {
        &self.content_key
    }

    pub fn scripting(&self) -> bool {
        self.scripting
    }

    pub fn raytracing_capable(&self) -> bool {
        self.raytracing_capable
    }

    pub fn premium(&self) -> bool {
        self.premium
    }

    pub fn pack_type(&self) -> PackType {
        self.pack_type
    }

    /// Replace the content key, e.g. once key negotiation completes.
    pub fn set_content_key(&mut self, key: impl Into<Vec<u8>>) {
        self.content_key = key.into();
    }

    /// Expect this SHA-256 over the fully assembled buffer.
    pub fn set_expected_hash(&mut self, hash: [u8; 32]) {
        self.expected_hash = Some(hash);
    }

    pub fn set_premium(&mut self, premium: bool) {
        self.premium = premium;
    }

    pub fn set_pack_type(&mut self, pack_type: PackType) {
        self.pack_type = pack_type;
    }

    /// Declared total size in bytes, once known.
    pub fn declared_len(&self) -> Option<usize> {
        self.assembler.as_ref().map(FragmentAssembler::length)
    }

    /// Allocate the assembly buffer and fragment bitmap.
    ///
    /// Errors if the size was already declared.
    pub fn declare_size(&mut self, length: u32, max_fragment_size: u32) -> Result<()> {
        if self.assembler.is_some() || self.contents.is_some() {
            return Err(PackError::AlreadyDeclared);
        }
        self.assembler = Some(FragmentAssembler::new(length, max_fragment_size)?);
        Ok(())
    }

    /// Feed one fragment.
    ///
    /// Returns `Ok(true)` when this fragment completed the transfer and the
    /// decode pipeline ran to success. Non-fatal transfer anomalies are
    /// logged and reported as `Ok(false)`; a fatal pipeline error discards
    /// the assembled data and is returned to the caller.
    pub fn submit_fragment(&mut self, index: u32, data: &[u8]) -> Result<bool> {
        let Some(assembler) = self.assembler.as_mut() else {
            if self.contents.is_some() {
                warn!("Fragment {} for already assembled pack {}", index, self.id);
                return Ok(false);
            }
            return Err(PackError::NotDeclared);
        };
        if !assembler.submit(index, data) {
            return Ok(false);
        }
        let Some(assembler) = self.assembler.take() else {
            return Ok(false);
        };
        let buffer = assembler.into_buffer();
        debug!("Pack {} fully assembled with {} bytes", self.id, buffer.len());
        self.decode(buffer)?;
        Ok(true)
    }

    /// True once the decode pipeline has produced a content store.
    pub fn is_complete(&self) -> bool {
        self.contents.is_some()
    }

    /// The processed content store, present iff the pipeline succeeded.
    pub fn contents(&self) -> Option<&PackContents> {
        self.contents.as_ref()
    }

    /// Mutable access for converter stages; writes go through the store's
    /// invalidation-safe accessors.
    pub fn contents_mut(&mut self) -> Option<&mut PackContents> {
        self.contents.as_mut()
    }

    /// Take ownership of the content store, e.g. to hand it to a
    /// compositor.
    pub fn into_contents(self) -> Option<PackContents> {
        self.contents
    }

    /// Run verify -> extract -> decrypt -> validate on the assembled
    /// buffer.
    fn decode(&mut self, buffer: Vec<u8>) -> Result<()> {
        if let Some(expected) = &self.expected_hash {
            let actual: [u8; 32] = Sha256::digest(&buffer).into();
            if actual != *expected {
                return Err(PackError::HashMismatch {
                    expected: hex::encode(expected),
                    actual: hex::encode(actual),
                });
            }
        }

        let mut store = PackContents::new(archive::extract(&buffer)?);
        drop(buffer);

        if !self.content_key.is_empty() {
            contents::decrypt_pack(&mut store, &self.content_key, &self.content_id)?;
        }

        if manifest::validation_enabled() {
            Manifest::from_store(&store)?.validate(&self.id, &self.version)?;
        }

        self.contents = Some(store);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pack() -> (Pack, Vec<u8>) {
        let id = Uuid::new_v4();
        let mut source = PackContents::default();
        source
            .put_json(
                "manifest.json",
                &serde_json::json!({
                    "format_version": 2,
                    "header": { "uuid": id.to_string(), "version": [1, 0, 0] }
                }),
            )
            .unwrap();
        source.put_string("data.txt", "payload");
        let archive = source.to_zip().unwrap();
        (Pack::new(id, "1.0.0", ""), archive)
    }

    #[test]
    fn test_declare_twice_is_an_error() {
        let (mut pack, archive) = sample_pack();
        pack.declare_size(archive.len() as u32, 64).unwrap();
        let err = pack.declare_size(archive.len() as u32, 64).unwrap_err();
        assert!(matches!(err, PackError::AlreadyDeclared));
    }

    #[test]
    fn test_fragment_before_declare_is_an_error() {
        let (mut pack, _) = sample_pack();
        let err = pack.submit_fragment(0, b"data").unwrap_err();
        assert!(matches!(err, PackError::NotDeclared));
    }

    #[test]
    fn test_single_fragment_pack_completes() {
        let (mut pack, archive) = sample_pack();
        pack.declare_size(archive.len() as u32, archive.len() as u32)
            .unwrap();
        assert!(pack.submit_fragment(0, &archive).unwrap());
        assert!(pack.is_complete());
        let store = pack.contents().unwrap();
        assert_eq!(store.get_string("data.txt").as_deref(), Some("payload"));
    }

    #[test]
    fn test_fragment_after_assembly_is_ignored() {
        let (mut pack, archive) = sample_pack();
        pack.declare_size(archive.len() as u32, archive.len() as u32)
            .unwrap();
        assert!(pack.submit_fragment(0, &archive).unwrap());
        assert!(!pack.submit_fragment(0, &archive).unwrap());
        assert!(pack.is_complete());
    }
}
