//! Request-scoped staging of uploaded files.
//!
//! A [`StagedFile`] owns its temporary path: dropping it deletes the file, so
//! every exit from a handler releases the upload exactly once.
//! [`StagedFile::release`] is the explicit form of the same action and logs
//! the outcome.

use crate::{Error, Result};
use axum::body::Bytes;
use futures_util::{Stream, StreamExt};
use std::{
    fmt::Display,
    path::{Path, PathBuf},
};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("Upload staging directory: {}", dir.display());
        Ok(Self { dir })
    }

    /// Streams `chunks` into a fresh temporary file under the staging
    /// directory. On any error the partial file is removed before returning.
    pub async fn stage<S, E>(
        &self,
        file_name: Option<&str>,
        mime_type: Option<&str>,
        chunks: S,
    ) -> Result<StagedFile>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Display,
    {
        let (file, path) = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&self.dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut size: u64 = 0;

        tokio::pin!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(|e| Error::upload(e.to_string()))?;
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);

        let file_name = file_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("upload")
            .to_string();
        let mime_type = resolve_mime_type(mime_type, &file_name);

        debug!(
            "Staged {} ({}, {} bytes) at {}",
            file_name,
            mime_type,
            size,
            path.display()
        );

        Ok(StagedFile {
            path,
            mime_type,
            file_name,
            size,
        })
    }
}

/// An uploaded file held on disk for the duration of one request.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    mime_type: String,
    file_name: String,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Client-supplied name. Never used to build a filesystem path.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Opens the staged file for reading. The handle does not extend the
    /// file's lifetime past [`StagedFile::release`].
    pub async fn open(&self) -> Result<tokio::fs::File> {
        Ok(tokio::fs::File::open(&self.path).await?)
    }

    /// Deletes the staged file. Failures are logged and swallowed.
    pub fn release(self) {
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => debug!("Released staged file {}", path.display()),
            Err(e) => warn!("Failed to remove staged file {}: {}", path.display(), e),
        }
    }
}

fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> String {
    declared
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(file_name)
                .first()
                .map(|m| m.essence_str().to_string())
                .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
        })
}
