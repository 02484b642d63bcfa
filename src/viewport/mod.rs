//! Interactive view transform for the scrollable, zoomable canvas surface.

use crate::geometry::{CanvasPoint, Extent};

pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 5.0;
const ZOOM_STEP: f64 = 0.1;

/// Affine view transform (uniform scale plus translation) clamped so the
/// scaled image can never be panned entirely out of the visible viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasViewport {
    scale: f64,
    translate_x: f64,
    translate_y: f64,
    content: Extent,
    surface: Extent,
}

impl Default for CanvasViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasViewport {
    pub const fn new() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
            content: Extent::ZERO,
            surface: Extent::ZERO,
        }
    }

    pub const fn scale(&self) -> f64 {
        self.scale
    }

    pub const fn translation(&self) -> (f64, f64) {
        (self.translate_x, self.translate_y)
    }

    /// Adjusts scale by one fixed step in the sign of `delta`, keeping the
    /// content under `anchor` stationary where the clamping allows.
    ///
    /// The anchor is given relative to the surface center. Zero delta leaves
    /// the transform untouched.
    pub fn zoom(&mut self, delta: f64, anchor: CanvasPoint) {
        if delta == 0.0 {
            return;
        }
        let previous = self.scale;
        let step = if delta > 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
        self.scale = (previous + step).clamp(MIN_SCALE, MAX_SCALE);

        let ratio = self.scale / previous;
        self.translate_x = anchor.x - (anchor.x - self.translate_x) * ratio;
        self.translate_y = anchor.y - (anchor.y - self.translate_y) * ratio;
        self.clamp_translation();
    }

    pub fn pan(&mut self, delta_x: f64, delta_y: f64) {
        self.translate_x += delta_x;
        self.translate_y += delta_y;
        self.clamp_translation();
    }

    /// Called when a new document (or a differently sized result) backs the
    /// canvas.
    pub fn set_content_size(&mut self, content: Extent) {
        self.content = content;
        self.clamp_translation();
    }

    /// Called when the drawing surface is resized.
    pub fn set_surface_size(&mut self, surface: Extent) {
        self.surface = surface;
        self.clamp_translation();
    }

    /// Returns the transform to identity, keeping the tracked sizes.
    pub fn reset(&mut self) {
        self.scale = 1.0;
        self.translate_x = 0.0;
        self.translate_y = 0.0;
    }

    pub fn max_offset(&self) -> (f64, f64) {
        (
            axis_max_offset(self.content.width, self.surface.width, self.scale),
            axis_max_offset(self.content.height, self.surface.height, self.scale),
        )
    }

    fn clamp_translation(&mut self) {
        let (max_x, max_y) = self.max_offset();
        self.translate_x = self.translate_x.clamp(-max_x, max_x);
        self.translate_y = self.translate_y.clamp(-max_y, max_y);
    }
}

fn axis_max_offset(content_dim: f64, surface_dim: f64, scale: f64) -> f64 {
    ((content_dim * scale - surface_dim) / 2.0).max(0.0)
}
