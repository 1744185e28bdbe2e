//! Document path rules and format-option defaults.
//!
//! Document paths are relative, slash-separated and always end in `.md`. The
//! same normalized string is used as the file location under the documents
//! root and as the lease key, so a read and a save of the same document
//! always contend for the same lock.

use serde_json::{json, Value};

use crate::error::CoreError;

/// Markdown extension every document carries.
pub const DOCUMENT_EXTENSION: &str = ".md";

/// Extension of the sidecar file holding a document's format options.
pub const SIDECAR_EXTENSION: &str = ".json";

/// Format options used when a document has no sidecar or a save omits them.
pub fn default_format_options() -> Value {
    json!({
        "font": "Arial, sans-serif",
        "fontSize": "16px",
        "fontColor": "#333333",
    })
}

/// Normalize a client-supplied directory path.
///
/// Backslashes become slashes, empty and `.` components are dropped, and the
/// result is rejected if it would escape the root (`..`, absolute paths) or
/// contains control characters. An empty result means the root itself.
pub fn normalize_dir_path(raw: &str) -> Result<String, CoreError> {
    let unified = raw.trim().replace('\\', "/");
    if unified.starts_with('/') {
        return Err(CoreError::Validation(format!(
            "Path must be relative, got '{raw}'"
        )));
    }

    let mut parts = Vec::new();
    for part in unified.split('/') {
        let part = part.trim();
        match part {
            "" | "." => continue,
            ".." => {
                return Err(CoreError::Validation(format!(
                    "Path must not contain '..', got '{raw}'"
                )))
            }
            _ if part.chars().any(char::is_control) => {
                return Err(CoreError::Validation(
                    "Path must not contain control characters".into(),
                ))
            }
            _ => parts.push(part),
        }
    }
    Ok(parts.join("/"))
}

/// Normalize a document path and ensure it ends in `.md`.
pub fn normalize_document_path(raw: &str) -> Result<String, CoreError> {
    let path = normalize_dir_path(raw)?;
    if path.is_empty() {
        return Err(CoreError::Validation("Document path is required".into()));
    }
    if path.ends_with(DOCUMENT_EXTENSION) {
        Ok(path)
    } else {
        Ok(format!("{path}{DOCUMENT_EXTENSION}"))
    }
}

/// Sidecar path for a normalized document path (`a/b.md` -> `a/b.json`).
pub fn sidecar_path(document_path: &str) -> String {
    let stem = document_path
        .strip_suffix(DOCUMENT_EXTENSION)
        .unwrap_or(document_path);
    format!("{stem}{SIDECAR_EXTENSION}")
}
