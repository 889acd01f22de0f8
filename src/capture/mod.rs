// Capture module - camera polling loop around the template matcher
// The loop owns the camera, window and template for its lifetime and runs
// single-threaded: read, match, annotate, show, poll key, sleep.

#[cfg(feature = "camera")]
pub mod opencv_backend;
pub mod session;
pub mod types;


#[cfg(feature = "camera")]
pub use opencv_backend::OpenCvBackend;
pub use session::CaptureSession;
pub use types::{CaptureBackend, CaptureConfig, FrameSink, FrameSource, RunSummary, StopReason};
