//! Markdown documents and their format-option sidecars on disk.
//!
//! Every path taken here is already normalized (relative, slash-separated,
//! no `..`), see [`mdedit_core::documents`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mdedit_core::documents::{default_format_options, sidecar_path, DOCUMENT_EXTENSION};
use serde::Serialize;
use serde_json::Value;
use walkdir::WalkDir;

use super::DocumentError;

/// A document's content together with its format options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub content: String,
    pub format_options: Value,
}

/// One entry of the documents tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

/// File-backed document storage rooted at `WORK_DIR/documents`.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Read a document and its format options.
    ///
    /// A missing or unreadable sidecar falls back to the default options.
    pub async fn read(&self, path: &str) -> Result<Document, DocumentError> {
        let content = match tokio::fs::read_to_string(self.resolve(path)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found("Document", path)),
            Err(e) => return Err(e.into()),
        };

        let format_options = match tokio::fs::read(self.resolve(&sidecar_path(path))).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path, error = %e, "Ignoring malformed format options");
                default_format_options()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => default_format_options(),
            Err(e) => return Err(e.into()),
        };

        Ok(Document {
            content,
            format_options,
        })
    }

    /// Write a document and its sidecar, creating parent directories.
    pub async fn write(
        &self,
        path: &str,
        content: &str,
        format_options: &Value,
    ) -> Result<(), DocumentError> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&full_path, content).await?;

        let sidecar = serde_json::to_vec_pretty(format_options).map_err(std::io::Error::from)?;
        tokio::fs::write(self.resolve(&sidecar_path(path)), sidecar).await?;
        Ok(())
    }

    /// Delete a document and its sidecar.
    pub async fn delete(&self, path: &str) -> Result<(), DocumentError> {
        match tokio::fs::remove_file(self.resolve(path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found("Document", path)),
            Err(e) => return Err(e.into()),
        }
        remove_if_exists(&self.resolve(&sidecar_path(path))).await?;
        Ok(())
    }

    /// Move a document (and its sidecar, if any) to a new path.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), DocumentError> {
        let source = self.resolve(from);
        if !tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_file()) {
            return Err(not_found("Document", from));
        }
        let target = self.resolve(to);
        if tokio::fs::try_exists(&target).await? {
            return Err(DocumentError::AlreadyExists {
                kind: "Document",
                path: to.to_string(),
            });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&source, &target).await?;

        if from.ends_with(DOCUMENT_EXTENSION) && to.ends_with(DOCUMENT_EXTENSION) {
            let old_sidecar = self.resolve(&sidecar_path(from));
            if tokio::fs::try_exists(&old_sidecar).await? {
                tokio::fs::rename(&old_sidecar, self.resolve(&sidecar_path(to))).await?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Directories
    // -----------------------------------------------------------------------

    /// Create a directory and any missing parents.
    pub async fn create_dir(&self, path: &str) -> Result<(), DocumentError> {
        tokio::fs::create_dir_all(self.resolve(path)).await?;
        Ok(())
    }

    /// Recursively delete a directory.
    pub async fn delete_dir(&self, path: &str) -> Result<(), DocumentError> {
        let full_path = self.resolve(path);
        if !tokio::fs::metadata(&full_path).await.is_ok_and(|m| m.is_dir()) {
            return Err(not_found("Directory", path));
        }
        tokio::fs::remove_dir_all(full_path).await?;
        Ok(())
    }

    /// Move a directory to a new path.
    pub async fn rename_dir(&self, from: &str, to: &str) -> Result<(), DocumentError> {
        let source = self.resolve(from);
        if !tokio::fs::metadata(&source).await.is_ok_and(|m| m.is_dir()) {
            return Err(not_found("Directory", from));
        }
        let target = self.resolve(to);
        if tokio::fs::try_exists(&target).await? {
            return Err(DocumentError::AlreadyExists {
                kind: "Directory",
                path: to.to_string(),
            });
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(source, target).await?;
        Ok(())
    }

    /// Every directory and `.md` file under the root, sorted by path.
    pub async fn list_tree(&self) -> Result<Vec<TreeEntry>, DocumentError> {
        let root = self.root.clone();
        let entries = tokio::task::spawn_blocking(move || walk_tree(&root))
            .await
            .map_err(std::io::Error::other)??;
        Ok(entries)
    }
}

fn walk_tree(root: &Path) -> Result<Vec<TreeEntry>, std::io::Error> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let kind = if entry.file_type().is_dir() {
            EntryKind::Directory
        } else if entry.file_type().is_file()
            && entry.file_name().to_string_lossy().ends_with(DOCUMENT_EXTENSION)
        {
            EntryKind::File
        } else {
            continue;
        };

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        entries.push(TreeEntry {
            kind,
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

async fn remove_if_exists(path: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn not_found(kind: &'static str, path: &str) -> DocumentError {
    DocumentError::NotFound {
        kind,
        path: path.to_string(),
    }
}
