//! Menu commands and their remote operation descriptors.
//!
//! The mapping is a table, not code: each command resolves to an endpoint
//! name plus fixed query parameters.

use crate::remote::Operation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditCommand {
    Grayscale,
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    GaussianBlur,
    Sobel,
    Binary,
    ZoomIn,
    ZoomOut,
}

impl EditCommand {
    pub const ALL: [Self; 11] = [
        Self::Grayscale,
        Self::Rotate90,
        Self::Rotate180,
        Self::Rotate270,
        Self::FlipHorizontal,
        Self::FlipVertical,
        Self::GaussianBlur,
        Self::Sobel,
        Self::Binary,
        Self::ZoomIn,
        Self::ZoomOut,
    ];

    pub const fn operation(self) -> Operation {
        match self {
            Self::Grayscale => Operation::new("grayscale"),
            Self::Rotate90 => Operation::with_params("rotate", &[("angle", "90")]),
            Self::Rotate180 => Operation::with_params("rotate", &[("angle", "180")]),
            Self::Rotate270 => Operation::with_params("rotate", &[("angle", "270")]),
            Self::FlipHorizontal => Operation::new("flip_horizontal"),
            Self::FlipVertical => Operation::new("flip_vertical"),
            Self::GaussianBlur => Operation::with_params("gaussian_blur", &[("k_size", "5")]),
            Self::Sobel => Operation::with_params("sobel", &[("k_size", "3")]),
            Self::Binary => Operation::new("binary"),
            Self::ZoomIn => Operation::new("zoom_in"),
            Self::ZoomOut => Operation::new("zoom_out"),
        }
    }

    /// Menu label shown for the command.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::Rotate90 => "Rotate 90°",
            Self::Rotate180 => "Rotate 180°",
            Self::Rotate270 => "Rotate 270°",
            Self::FlipHorizontal => "Flip Horizontal",
            Self::FlipVertical => "Flip Vertical",
            Self::GaussianBlur => "Gaussian Blur",
            Self::Sobel => "Sobel Filter",
            Self::Binary => "Binary Filter",
            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
        }
    }
}
