//! Freehand stroke capture for the local drawing overlay.
//!
//! Strokes are preview-only: they are rendered over the canvas but never
//! folded into the document sent to the processing service.

use crate::geometry::{CanvasPoint, Color, LineSegment};

const FALLBACK_BRUSH_WIDTH: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrushSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl BrushSize {
    pub const fn width(self) -> f64 {
        match self {
            Self::Small => 2.0,
            Self::Medium => 5.0,
            Self::Large => 10.0,
        }
    }

    /// Resolves a configured size name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            _ => None,
        }
    }

    /// Width for a configured size name, falling back to a middle-of-the-road
    /// width for anything unrecognized.
    pub fn width_for_name(name: &str) -> f64 {
        Self::from_name(name).map_or(FALLBACK_BRUSH_WIDTH, Self::width)
    }
}

/// A completed freehand stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub points: Vec<CanvasPoint>,
    pub width: f64,
    pub color: Color,
}

/// Captures pointer-drag input into line segments while a button is held.
#[derive(Debug, Default)]
pub struct StrokeRecorder {
    active: Option<Stroke>,
}

impl StrokeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a stroke at `point`. A stroke already in progress is replaced;
    /// pointer-grab loss can swallow the matching release event.
    pub fn begin(&mut self, point: CanvasPoint, width: f64, color: Color) {
        self.active = Some(Stroke {
            points: vec![point],
            width,
            color,
        });
    }

    /// Extends the active stroke to `point`, returning the segment to draw
    /// from the previous position. Returns None when no stroke is active.
    pub fn extend(&mut self, point: CanvasPoint) -> Option<LineSegment> {
        let stroke = self.active.as_mut()?;
        let last = *stroke.points.last()?;
        stroke.points.push(point);
        Some(LineSegment::new(last, point))
    }

    /// Finishes the active stroke and hands it to the caller for overlay
    /// rendering.
    pub fn end(&mut self) -> Option<Stroke> {
        self.active.take()
    }
}
