//! Content-addressed attachment naming.
//!
//! Uploaded files are stored as `<sha256-hex><ext>`, so two uploads with the
//! same bytes resolve to one file on disk.

use sha2::{Digest, Sha256};

/// Extension used when the uploaded filename has none.
pub const DEFAULT_ATTACHMENT_EXTENSION: &str = ".png";

/// Name of the hash -> filename map kept next to the attachments.
pub const HASH_MAP_FILENAME: &str = "image_hashes.json";

/// SHA-256 hex digest of `data`.
pub fn content_hash(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Lowercased extension (with leading dot) of a client filename.
///
/// Falls back to [`DEFAULT_ATTACHMENT_EXTENSION`] when there is none or when
/// it contains anything other than ASCII alphanumerics.
pub fn attachment_extension(original_name: &str) -> String {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or("");
    match base.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => DEFAULT_ATTACHMENT_EXTENSION.to_string(),
    }
}

/// Stored filename for an attachment with the given hash and client name.
pub fn attachment_filename(hash: &str, original_name: &str) -> String {
    format!("{hash}{}", attachment_extension(original_name))
}
