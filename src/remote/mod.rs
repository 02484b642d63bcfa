//! Contract with the stateless remote image-processing service.
//!
//! The service holds a single working image per client session: it is seeded
//! by a multipart upload and every named operation transforms it in place,
//! returning the re-encoded result. The client treats each call as
//! independent; no retries, no caching.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

pub use http::HttpProcessingClient;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("response from {endpoint} could not be decoded: {message}")]
    Decode { endpoint: String, message: String },
}

/// A named server-side transform with its query parameters.
///
/// Parameter order is preserved so request URLs are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub endpoint: &'static str,
    pub params: &'static [(&'static str, &'static str)],
}

impl Operation {
    pub const fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            params: &[],
        }
    }

    pub const fn with_params(
        endpoint: &'static str,
        params: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { endpoint, params }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.endpoint)?;
        for (index, (key, value)) in self.params.iter().enumerate() {
            f.write_str(if index == 0 { "?" } else { "&" })?;
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Encoded image bytes together with the filename and content type sent in
/// the multipart `file` part.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: &'static str,
}

impl UploadPayload {
    /// Builds a payload for a file path, deriving filename and content type
    /// from the extension. Unknown extensions are sent as octet-stream.
    pub fn for_file(bytes: Bytes, path: &std::path::Path) -> Self {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(DEFAULT_UPLOAD_FILENAME)
            .to_string();
        Self {
            bytes,
            content_type: content_type_for_path(path),
            filename,
        }
    }

    /// Builds a payload for in-memory PNG bytes (history and baseline
    /// snapshots are always service-canonical PNG).
    pub fn png(bytes: Bytes) -> Self {
        Self {
            bytes,
            filename: DEFAULT_UPLOAD_FILENAME.to_string(),
            content_type: PNG_CONTENT_TYPE,
        }
    }
}

const DEFAULT_UPLOAD_FILENAME: &str = "image.png";
const PNG_CONTENT_TYPE: &str = "image/png";

pub(crate) fn content_type_for_path(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => PNG_CONTENT_TYPE,
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Ranked classification output of the `ONNX` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Classification {
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub certainty: f64,
}

#[derive(Debug, Deserialize)]
struct ClassificationEnvelope {
    onnx: Classification,
}

impl Classification {
    /// Parses the `{"onnx":{"predictions":[..]}}` envelope the service emits.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<ClassificationEnvelope>(body).map(|envelope| envelope.onnx)
    }
}

/// Transport boundary to the processing service.
///
/// Every call either yields a decoded payload or one of the `RemoteError`
/// kinds; implementations must not retry.
#[async_trait]
pub trait RemoteProcessor {
    /// Seeds the service's working image; returns the canonical re-encoding.
    async fn upload(&self, payload: UploadPayload) -> RemoteResult<Bytes>;

    /// Applies a named operation to the already-uploaded working image.
    async fn apply(&self, operation: Operation) -> RemoteResult<Bytes>;

    /// Runs the classifier over the working image.
    async fn classify(&self) -> RemoteResult<Classification>;

    /// Connectivity probe.
    async fn ping(&self) -> RemoteResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn operation_display_renders_endpoint_and_ordered_params() {
        assert_eq!(Operation::new("grayscale").to_string(), "grayscale");
        assert_eq!(
            Operation::with_params("rotate", &[("angle", "90")]).to_string(),
            "rotate?angle=90"
        );
        assert_eq!(
            Operation::with_params("resize", &[("w", "10"), ("h", "20")]).to_string(),
            "resize?w=10&h=20"
        );
    }

    #[test]
    fn content_type_follows_extension_case_insensitively() {
        assert_eq!(content_type_for_path(Path::new("a.png")), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(
            content_type_for_path(Path::new("a.bmp")),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for_path(Path::new("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn upload_payload_for_file_keeps_original_filename() {
        let payload = UploadPayload::for_file(Bytes::from_static(b"x"), Path::new("/pics/cod.jpg"));
        assert_eq!(payload.filename, "cod.jpg");
        assert_eq!(payload.content_type, "image/jpeg");
    }

    #[test]
    fn upload_payload_png_uses_default_name() {
        let payload = UploadPayload::png(Bytes::from_static(b"x"));
        assert_eq!(payload.filename, "image.png");
        assert_eq!(payload.content_type, "image/png");
    }

    #[test]
    fn classification_parses_service_envelope_in_rank_order() {
        let body = r#"{"onnx":{"predictions":[
            {"label":"cod","certainty":91.3},
            {"label":"haddock","certainty":6.1},
            {"label":"pollock","certainty":1.2}
        ]}}"#;
        let classification = Classification::from_json(body).expect("envelope should parse");
        assert_eq!(classification.predictions.len(), 3);
        assert_eq!(classification.predictions[0].label, "cod");
        assert_eq!(classification.predictions[0].certainty, 91.3);
        assert_eq!(classification.predictions[2].label, "pollock");
    }

    #[test]
    fn classification_rejects_missing_envelope() {
        assert!(Classification::from_json(r#"{"predictions":[]}"#).is_err());
        assert!(Classification::from_json("not json").is_err());
    }
}
