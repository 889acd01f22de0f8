use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for detection and capture operations.
pub type DetectResult<T> = Result<T, DetectError>;

/// The error type for template loading, matching and the capture loop.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Cannot open camera (device index {index})")]
    CameraUnavailable { index: i32 },

    #[error("Camera read failed: {description}")]
    CameraReadFailed { description: String },

    #[error("Display window error: {description}")]
    DisplayFailed { description: String },

    #[error("Failed to load template {path:?}: {source}")]
    TemplateLoadFailed {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Template {path:?} has no pixels")]
    EmptyTemplate { path: PathBuf },

    #[error("Frame has no pixels")]
    EmptyFrame,

    #[error(
        "Template {template_width}x{template_height} is larger than frame {frame_width}x{frame_height}"
    )]
    TemplateLargerThanFrame {
        template_width: u32,
        template_height: u32,
        frame_width: u32,
        frame_height: u32,
    },

    #[error("Threshold {value} is outside 0.0..=1.0")]
    InvalidThreshold { value: f32 },

    #[error("Failed to save frame to {path:?}: {source}")]
    FrameSaveFailed {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Invalid argument: {description}")]
    InvalidArgument { description: String },

    #[cfg(feature = "camera")]
    #[error("OpenCV call failed: {source}")]
    OpenCv {
        #[from]
        source: opencv::Error,
    },
}

impl DetectError {
    /// Errors raised before the capture loop starts (camera, template, arguments)
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            DetectError::CameraUnavailable { .. }
                | DetectError::TemplateLoadFailed { .. }
                | DetectError::EmptyTemplate { .. }
                | DetectError::InvalidThreshold { .. }
                | DetectError::InvalidArgument { .. }
        )
    }
}
