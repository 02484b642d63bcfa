//! Command boundary: ties the edit session, canvas state, and remote client
//! together and guards against overlapping remote requests.

use std::path::{Path, PathBuf};

use crate::config;
use crate::error::{AppError, AppResult};
use crate::geometry::{CanvasPoint, Color, Extent, LineSegment};
use crate::remote::{Classification, HttpProcessingClient, RemoteProcessor};
use crate::session::{CommandStates, EditCommand, EditSession, ImageBytes, SessionError};
use crate::stroke::{BrushSize, Stroke, StrokeRecorder};
use crate::viewport::CanvasViewport;

/// Width, height, and encoding of the loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentProperties {
    pub width: u32,
    pub height: u32,
    pub mime_type: &'static str,
    pub path: Option<PathBuf>,
}

pub struct App<P: RemoteProcessor> {
    session: EditSession,
    viewport: CanvasViewport,
    recorder: StrokeRecorder,
    brush_size: BrushSize,
    brush_width: f64,
    brush_color: Color,
    processor: P,
    busy: bool,
}

impl App<HttpProcessingClient> {
    /// Builds the app from `config.json`, falling back to defaults for
    /// anything missing or malformed.
    pub fn from_env_config() -> Self {
        let config = config::load_app_config();
        let mut app = Self::new(HttpProcessingClient::new(config.base_url()));

        if let Some(name) = config.brush_size.as_deref() {
            app.brush_size = BrushSize::from_name(name).unwrap_or_default();
            // An unrecognized name still yields a usable stroke width.
            app.brush_width = BrushSize::width_for_name(name);
        }
        app
    }
}

impl<P: RemoteProcessor + Sync> App<P> {
    pub fn new(processor: P) -> Self {
        Self {
            session: EditSession::new(),
            viewport: CanvasViewport::new(),
            recorder: StrokeRecorder::new(),
            brush_size: BrushSize::default(),
            brush_width: BrushSize::default().width(),
            brush_color: Color::new(0, 0, 0),
            processor,
            busy: false,
        }
    }

    pub fn session(&self) -> &EditSession {
        &self.session
    }

    pub fn viewport(&self) -> &CanvasViewport {
        &self.viewport
    }

    pub fn command_states(&self) -> CommandStates {
        self.session.command_states()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Connectivity probe against the processing service.
    pub async fn ping(&self) -> AppResult<()> {
        self.processor.ping().await.map_err(AppError::from)
    }

    /// Opens a document and resets the canvas transform for it.
    pub fn load(&mut self, path: &Path) -> AppResult<()> {
        self.session.load(path)?;
        self.viewport.reset();
        self.sync_content_size();
        Ok(())
    }

    pub fn close(&mut self) {
        self.session.close();
        self.viewport.reset();
        self.viewport.set_content_size(Extent::ZERO);
    }

    /// Runs one edit command against the remote service.
    pub async fn apply(&mut self, command: EditCommand) -> AppResult<()> {
        self.begin_request()?;
        let result = self.session.apply(command, &self.processor).await;
        self.busy = false;

        result?;
        tracing::info!(command = command.label(), "operation applied");
        self.sync_content_size();
        Ok(())
    }

    /// Steps the document one state back. Returns false when the history is
    /// empty.
    pub async fn undo(&mut self) -> AppResult<bool> {
        self.begin_request()?;
        let result = self.session.undo(&self.processor).await;
        self.busy = false;

        let undone = result?;
        if undone {
            self.sync_content_size();
        }
        Ok(undone)
    }

    /// Returns the document to its baseline. Returns false when no baseline
    /// exists yet.
    pub async fn reset(&mut self) -> AppResult<bool> {
        self.begin_request()?;
        let result = self.session.reset(&self.processor).await;
        self.busy = false;

        let reset = result?;
        if reset {
            self.sync_content_size();
        }
        Ok(reset)
    }

    /// Asks the service to classify the working image.
    pub async fn classify(&mut self) -> AppResult<Classification> {
        if !self.session.is_loaded() {
            return Err(SessionError::NoDocument.into());
        }
        self.begin_request()?;
        let result = self.processor.classify().await;
        self.busy = false;
        Ok(result?)
    }

    /// Saves to the document's stored path; errors when none exists yet.
    pub fn save(&mut self) -> AppResult<()> {
        let path = self
            .session
            .document_path()
            .ok_or(AppError::NoSavePath)?
            .to_path_buf();
        self.write_current_to(&path)
    }

    /// Saves to `path` and adopts it as the document path.
    pub fn save_as(&mut self, path: &Path) -> AppResult<()> {
        self.write_current_to(path)?;
        self.session.set_document_path(path.to_path_buf());
        Ok(())
    }

    pub fn document_properties(&self) -> AppResult<DocumentProperties> {
        let current = self.session.current().ok_or(SessionError::NoDocument)?;
        let format =
            image::guess_format(current.as_slice()).map_err(SessionError::from)?;
        let (width, height) = image::load_from_memory(current.as_slice())
            .map_err(SessionError::from)
            .map(|image| (image.width(), image.height()))?;

        Ok(DocumentProperties {
            width,
            height,
            mime_type: format.to_mime_type(),
            path: self.session.document_path().map(Path::to_path_buf),
        })
    }

    // Canvas input passthrough.

    pub fn zoom(&mut self, delta: f64, anchor: CanvasPoint) {
        self.viewport.zoom(delta, anchor);
    }

    pub fn pan(&mut self, delta_x: f64, delta_y: f64) {
        self.viewport.pan(delta_x, delta_y);
    }

    pub fn surface_resized(&mut self, surface: Extent) {
        self.viewport.set_surface_size(surface);
    }

    pub fn set_brush_size(&mut self, size: BrushSize) {
        self.brush_size = size;
        self.brush_width = size.width();
    }

    pub fn brush_size(&self) -> BrushSize {
        self.brush_size
    }

    pub fn set_brush_color(&mut self, color: Color) {
        self.brush_color = color;
    }

    pub fn begin_stroke(&mut self, point: CanvasPoint) {
        self.recorder
            .begin(point, self.brush_width, self.brush_color);
    }

    pub fn extend_stroke(&mut self, point: CanvasPoint) -> Option<LineSegment> {
        self.recorder.extend(point)
    }

    /// Ends the active stroke. The result is overlay-only; it is never merged
    /// into the document sent to the service.
    pub fn end_stroke(&mut self) -> Option<Stroke> {
        self.recorder.end()
    }

    fn begin_request(&mut self) -> AppResult<()> {
        if self.busy {
            return Err(AppError::Busy);
        }
        self.busy = true;
        Ok(())
    }

    fn write_current_to(&self, path: &Path) -> AppResult<()> {
        let current = self.session.current().ok_or(SessionError::NoDocument)?;
        encode_to_path(current, path)?;
        tracing::info!(path = %path.display(), "document saved");
        Ok(())
    }

    fn sync_content_size(&mut self) {
        let Some(current) = self.session.current() else {
            return;
        };
        match image::load_from_memory(current.as_slice()) {
            Ok(image) => self.viewport.set_content_size(Extent::new(
                f64::from(image.width()),
                f64::from(image.height()),
            )),
            Err(err) => {
                tracing::warn!(?err, "current image failed to decode for canvas sizing");
            }
        }
    }
}

/// Rendered lines of a classification result, most confident first.
pub fn format_classification(classification: &Classification) -> String {
    let mut report = String::new();
    for (index, prediction) in classification.predictions.iter().enumerate() {
        report.push_str(&format!(
            "#{} {}: {}%\n",
            index + 1,
            prediction.label,
            prediction.certainty
        ));
    }
    report
}

// Save re-encodes as PNG unless the target extension asks for JPEG.
fn encode_to_path(current: &ImageBytes, path: &Path) -> Result<(), SessionError> {
    let image = image::load_from_memory(current.as_slice())?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        // JPEG has no alpha channel.
        Some("jpg") | Some("jpeg") => image
            .to_rgb8()
            .save_with_format(path, image::ImageFormat::Jpeg)?,
        _ => image.save_with_format(path, image::ImageFormat::Png)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{Operation, Prediction, RemoteError, RemoteResult, UploadPayload};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct TestProcessor {
        responses: Mutex<Vec<Bytes>>,
    }

    impl TestProcessor {
        fn new(responses: Vec<Vec<u8>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(Bytes::from).collect()),
            }
        }

        fn empty() -> Self {
            Self::new(Vec::new())
        }
    }

    #[async_trait]
    impl RemoteProcessor for TestProcessor {
        async fn upload(&self, payload: UploadPayload) -> RemoteResult<Bytes> {
            Ok(payload.bytes)
        }

        async fn apply(&self, operation: Operation) -> RemoteResult<Bytes> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or(RemoteError::Status {
                    endpoint: operation.endpoint.to_string(),
                    status: 500,
                })
        }

        async fn classify(&self) -> RemoteResult<Classification> {
            Ok(Classification {
                predictions: vec![
                    Prediction {
                        label: "cod".to_string(),
                        certainty: 91.3,
                    },
                    Prediction {
                        label: "haddock".to_string(),
                        certainty: 6.1,
                    },
                ],
            })
        }

        async fn ping(&self) -> RemoteResult<()> {
            Ok(())
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn temp_png(name: &str, width: u32, height: u32) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, png_bytes(width, height)).unwrap();
        path
    }

    #[test]
    fn load_sizes_the_canvas_to_the_document() {
        let path = temp_png("fishedit-app-load.png", 64, 48);
        let mut app = App::new(TestProcessor::empty());

        app.load(&path).unwrap();
        app.surface_resized(Extent::new(32.0, 24.0));

        assert!(app.session().is_loaded());
        assert_eq!(app.viewport().scale(), 1.0);
        assert_eq!(app.viewport().max_offset(), (16.0, 12.0));

        app.zoom(1.0, CanvasPoint::new(0.0, 0.0));
        assert!((app.viewport().scale() - 1.1).abs() < 1e-9);
        app.pan(1000.0, 1000.0);
        let (tx, ty) = app.viewport().translation();
        let (max_x, max_y) = app.viewport().max_offset();
        assert!(tx <= max_x && ty <= max_y);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn apply_resizes_the_canvas_when_the_result_changes_shape() {
        let path = temp_png("fishedit-app-apply.png", 40, 20);
        let mut app = App::new(TestProcessor::new(vec![png_bytes(20, 40)]));
        app.load(&path).unwrap();
        app.surface_resized(Extent::new(10.0, 10.0));

        app.apply(EditCommand::Rotate90).await.unwrap();

        assert_eq!(app.viewport().max_offset(), (5.0, 15.0));
        assert!(!app.is_busy());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn busy_guard_rejects_an_overlapping_command() {
        let path = temp_png("fishedit-app-busy.png", 4, 4);
        let mut app = App::new(TestProcessor::empty());
        app.load(&path).unwrap();

        app.busy = true;
        let err = app.apply(EditCommand::Grayscale).await.unwrap_err();
        assert!(matches!(err, AppError::Busy));
        assert!(matches!(app.undo().await.unwrap_err(), AppError::Busy));
        assert!(matches!(app.reset().await.unwrap_err(), AppError::Busy));
        assert!(matches!(app.classify().await.unwrap_err(), AppError::Busy));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn busy_flag_clears_after_a_failed_command() {
        let path = temp_png("fishedit-app-fail.png", 4, 4);
        let mut app = App::new(TestProcessor::empty());
        app.load(&path).unwrap();

        assert!(app.apply(EditCommand::Sobel).await.is_err());
        assert!(!app.is_busy());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn classify_requires_a_document() {
        let mut app = App::new(TestProcessor::empty());
        let err = app.classify().await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Session(SessionError::NoDocument)
        ));
    }

    #[tokio::test]
    async fn classify_returns_the_ranked_predictions() {
        let path = temp_png("fishedit-app-classify.png", 4, 4);
        let mut app = App::new(TestProcessor::empty());
        app.load(&path).unwrap();

        app.ping().await.unwrap();
        let classification = app.classify().await.unwrap();
        assert_eq!(classification.predictions[0].label, "cod");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn classification_report_is_ranked_and_percented() {
        let classification = Classification {
            predictions: vec![
                Prediction {
                    label: "cod".to_string(),
                    certainty: 91.3,
                },
                Prediction {
                    label: "haddock".to_string(),
                    certainty: 6.1,
                },
            ],
        };
        assert_eq!(
            format_classification(&classification),
            "#1 cod: 91.3%\n#2 haddock: 6.1%\n"
        );
    }

    #[test]
    fn save_without_a_path_directs_to_save_as() {
        let mut app = App::new(TestProcessor::empty());
        assert!(matches!(app.save().unwrap_err(), AppError::NoSavePath));
    }

    #[test]
    fn save_as_reencodes_and_adopts_the_path() {
        let source = temp_png("fishedit-app-saveas-src.png", 8, 8);
        let target = std::env::temp_dir().join("fishedit-app-saveas-dst.jpg");
        let mut app = App::new(TestProcessor::empty());
        app.load(&source).unwrap();

        app.save_as(&target).unwrap();
        let written = std::fs::read(&target).unwrap();
        assert_eq!(
            image::guess_format(&written).unwrap(),
            image::ImageFormat::Jpeg
        );
        assert_eq!(app.session().document_path(), Some(target.as_path()));

        // Plain save now reuses the adopted path.
        app.save().unwrap();

        let _ = std::fs::remove_file(&source);
        let _ = std::fs::remove_file(&target);
    }

    #[test]
    fn properties_report_dimensions_and_mime() {
        let path = temp_png("fishedit-app-props.png", 12, 7);
        let mut app = App::new(TestProcessor::empty());
        app.load(&path).unwrap();

        let properties = app.document_properties().unwrap();
        assert_eq!(properties.width, 12);
        assert_eq!(properties.height, 7);
        assert_eq!(properties.mime_type, "image/png");
        assert_eq!(properties.path, Some(path.clone()));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn strokes_stay_out_of_the_session() {
        let path = temp_png("fishedit-app-stroke.png", 4, 4);
        let mut app = App::new(TestProcessor::empty());
        app.load(&path).unwrap();
        let before = app.session().current().cloned();

        app.set_brush_size(BrushSize::Large);
        app.begin_stroke(CanvasPoint::new(0.0, 0.0));
        app.extend_stroke(CanvasPoint::new(5.0, 5.0));
        let stroke = app.end_stroke().unwrap();
        assert_eq!(stroke.width, 10.0);

        // The overlay never touches the authoritative document.
        assert_eq!(app.session().current().cloned(), before);
        assert_eq!(app.session().history_depth(), 0);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn close_empties_the_canvas() {
        let path = temp_png("fishedit-app-close.png", 16, 16);
        let mut app = App::new(TestProcessor::empty());
        app.load(&path).unwrap();
        app.surface_resized(Extent::new(4.0, 4.0));

        app.close();
        assert!(!app.session().is_loaded());
        assert_eq!(app.viewport().max_offset(), (0.0, 0.0));

        let _ = std::fs::remove_file(&path);
    }
}
