//! Pack manifest validation
//!
//! Every pack self-describes through a root `manifest.json`. After the
//! content pipeline finishes, the manifest's identity fields are checked
//! against the identity the pack was declared with out of band; any
//! disagreement discards the pack.
//!
//! Validation can be switched off globally for harnesses that feed
//! hand-built packs without full metadata.

use crate::error::{PackError, Result};
use crate::store::PackContents;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

/// Path of the manifest entry at the mapping root.
pub const MANIFEST_PATH: &str = "manifest.json";

/// Manifest format versions this pipeline accepts.
pub const SUPPORTED_FORMAT_VERSIONS: [i64; 2] = [1, 2];

static VALIDATE: AtomicBool = AtomicBool::new(true);

/// Globally enable or disable manifest validation (enabled by default).
pub fn set_validation(enabled: bool) {
    VALIDATE.store(enabled, Ordering::Relaxed);
}

/// True if manifest validation is currently enabled.
pub fn validation_enabled() -> bool {
    VALIDATE.load(Ordering::Relaxed)
}

/// Root object of `manifest.json`, reduced to the fields the intake
/// pipeline checks.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub format_version: i64,
    pub header: ManifestHeader,
}

/// `header` object of the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestHeader {
    pub uuid: String,
    pub version: Vec<serde_json::Value>,
}

impl Manifest {
    /// Parse the manifest entry out of a content store.
    pub fn from_store(store: &PackContents) -> Result<Self> {
        let bytes = store
            .get(MANIFEST_PATH)
            .ok_or_else(|| PackError::MissingEntry(MANIFEST_PATH.to_string()))?;
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Render `header.version` as a dotted version string.
    ///
    /// Components may be JSON numbers or strings; `[1, 0, 0]` becomes
    /// `"1.0.0"`.
    pub fn version_string(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.header.version.len());
        for component in &self.header.version {
            match component {
                serde_json::Value::Number(n) => parts.push(n.to_string()),
                serde_json::Value::String(s) => parts.push(s.clone()),
                other => {
                    return Err(PackError::InvalidManifest(format!(
                        "non-numeric version component: {other}"
                    )))
                }
            }
        }
        Ok(parts.join("."))
    }

    /// Check the manifest against the pack's declared identity.
    pub fn validate(&self, pack_id: &Uuid, pack_version: &str) -> Result<()> {
        if !SUPPORTED_FORMAT_VERSIONS.contains(&self.format_version) {
            return Err(PackError::UnsupportedFormatVersion(self.format_version));
        }
        let manifest_id = Uuid::parse_str(&self.header.uuid)
            .map_err(|e| PackError::InvalidManifest(format!("bad header.uuid: {e}")))?;
        if manifest_id != *pack_id {
            return Err(PackError::PackIdMismatch {
                expected: *pack_id,
                actual: manifest_id,
            });
        }
        let version = self.version_string()?;
        if version != pack_version {
            return Err(PackError::VersionMismatch {
                expected: pack_version.to_string(),
                actual: version,
            });
        }
        Ok(())
    }
}
