use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Pack size already declared")]
    AlreadyDeclared,

    #[error("Fragment received before pack size was declared")]
    NotDeclared,

    #[error("Invalid size declaration: length {length} with max fragment size {max_fragment_size}")]
    InvalidDeclaration { length: u32, max_fragment_size: u32 },

    #[error("Unknown pack: {0}")]
    UnknownPack(Uuid),

    #[error("Assembled data hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing pack entry: {0}")]
    MissingEntry(String),

    #[error("Content directory magic mismatch: {0:02x?}")]
    DirectoryMagicMismatch([u8; 4]),

    #[error("Content directory truncated: {0} bytes")]
    DirectoryTruncated(usize),

    #[error("Malformed content directory: {0}")]
    InvalidDirectory(String),

    #[error("Content id mismatch: expected {expected}, got {actual}")]
    ContentIdMismatch { expected: String, actual: String },

    #[error("Invalid content key length: {0} bytes (expected 32)")]
    InvalidKeyLength(usize),

    #[error("Unsupported manifest format version: {0}")]
    UnsupportedFormatVersion(i64),

    #[error("Manifest pack id mismatch: expected {expected}, got {actual}")]
    PackIdMismatch { expected: Uuid, actual: Uuid },

    #[error("Manifest version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, PackError>;
