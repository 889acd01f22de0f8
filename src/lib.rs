pub mod args;
pub mod capture;
pub mod error;
pub mod template_matching;

pub use capture::{CaptureConfig, CaptureSession, RunSummary, StopReason};
pub use error::{DetectError, DetectResult};
pub use template_matching::{MatchConfig, MatchSet, Template, TemplateMatcher};
