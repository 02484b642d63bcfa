//! Edit-session controller: the single authority over the current document,
//! its undo history, and its synchronization with the remote service.

pub mod command;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

use crate::remote::{RemoteError, RemoteProcessor, UploadPayload};

pub use command::EditCommand;

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no document loaded")]
    NoDocument,
    #[error("unsupported image format: {path}")]
    UnsupportedFormat { path: PathBuf },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// One committed, immutable state of the document as encoded raster bytes.
///
/// Cloning is cheap; the underlying buffer is shared and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes(Bytes);

impl ImageBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for ImageBytes {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for ImageBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

/// Derived UI-enablement state, recomputed after every session mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandStates {
    pub apply: bool,
    pub undo: bool,
    pub reset: bool,
    pub save: bool,
}

const OPEN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif"];

/// Controller for one open document.
///
/// All remote-touching operations leave visible state untouched on failure;
/// history entries are pushed only after the service confirms success.
#[derive(Debug, Default)]
pub struct EditSession {
    current: Option<ImageBytes>,
    history: Vec<ImageBytes>,
    baseline: Option<ImageBytes>,
    uploaded: bool,
    document_path: Option<PathBuf>,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ImageBytes> {
        self.current.as_ref()
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.document_path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.is_some()
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// True when the displayed image is byte-identical to the baseline, or
    /// vacuously true while no baseline exists.
    pub fn is_at_baseline(&self) -> bool {
        match (&self.current, &self.baseline) {
            (Some(current), Some(baseline)) => current == baseline,
            _ => true,
        }
    }

    pub fn command_states(&self) -> CommandStates {
        CommandStates {
            apply: self.current.is_some(),
            undo: !self.history.is_empty(),
            reset: self.baseline.is_some() && !self.is_at_baseline(),
            save: self.current.is_some(),
        }
    }

    /// Opens a document from disk, replacing any previous one.
    ///
    /// The file must carry a supported extension and decode as an image;
    /// on any failure the prior session state is left unchanged.
    pub fn load(&mut self, path: &Path) -> SessionResult<()> {
        if !has_supported_extension(path) {
            return Err(SessionError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path)?;
        image::load_from_memory(&bytes)?;

        tracing::info!(path = %path.display(), size = bytes.len(), "document loaded");
        self.current = Some(ImageBytes::from(bytes));
        self.history.clear();
        self.baseline = None;
        self.uploaded = false;
        self.document_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Returns to the empty state, dropping the document and its history.
    pub fn close(&mut self) {
        self.current = None;
        self.history.clear();
        self.baseline = None;
        self.uploaded = false;
        self.document_path = None;
    }

    /// Applies a named remote operation to the current document.
    ///
    /// Uploads the working image first if the service has not seen it yet.
    /// The pre-call state is pushed onto the undo history only once the
    /// operation succeeds.
    pub async fn apply<P: RemoteProcessor + Sync>(
        &mut self,
        command: EditCommand,
        processor: &P,
    ) -> SessionResult<()> {
        let current = self.current.clone().ok_or(SessionError::NoDocument)?;
        self.ensure_uploaded(&current, processor).await?;

        let result = processor.apply(command.operation()).await?;

        self.history.push(current);
        self.current = Some(ImageBytes::from(result));
        Ok(())
    }

    /// Restores the most recent history entry, re-submitting it so the
    /// service's working image stays in step. Returns false when there is
    /// nothing to undo.
    pub async fn undo<P: RemoteProcessor + Sync>(
        &mut self,
        processor: &P,
    ) -> SessionResult<bool> {
        let Some(snapshot) = self.history.last().cloned() else {
            return Ok(false);
        };

        let restored = processor
            .upload(UploadPayload::png(snapshot.into_bytes()))
            .await?;

        self.history.pop();
        self.current = Some(ImageBytes::from(restored));
        self.uploaded = true;
        Ok(true)
    }

    /// Returns the document to its baseline, discarding the whole history.
    /// Returns false when no baseline has been captured yet.
    pub async fn reset<P: RemoteProcessor + Sync>(
        &mut self,
        processor: &P,
    ) -> SessionResult<bool> {
        let Some(baseline) = self.baseline.clone() else {
            return Ok(false);
        };

        let restored = processor
            .upload(UploadPayload::png(baseline.into_bytes()))
            .await?;

        self.history.clear();
        self.current = Some(ImageBytes::from(restored));
        self.uploaded = true;
        Ok(true)
    }

    pub(crate) fn set_document_path(&mut self, path: PathBuf) {
        self.document_path = Some(path);
    }

    async fn ensure_uploaded<P: RemoteProcessor + Sync>(
        &mut self,
        current: &ImageBytes,
        processor: &P,
    ) -> SessionResult<()> {
        if self.uploaded {
            return Ok(());
        }

        let payload = match &self.document_path {
            Some(path) => UploadPayload::for_file(current.clone().into_bytes(), path),
            None => UploadPayload::png(current.clone().into_bytes()),
        };

        // The response body is the service's canonical re-encoding; the
        // locally decoded bytes stay current until an operation replaces
        // them, matching the established client behavior.
        let _ = processor.upload(payload).await?;

        self.uploaded = true;
        if self.baseline.is_none() {
            self.baseline = Some(current.clone());
        }
        Ok(())
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| OPEN_EXTENSIONS.contains(&ext.as_str()))
}
