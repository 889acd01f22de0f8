// Capture loop types and device traits
use crate::error::DetectResult;
use crate::template_matching::MatchConfig;
use image::RgbImage;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Camera device index passed to the backend
    pub camera_index: i32,
    /// Reference image searched for in every frame
    pub template_path: PathBuf,
    /// Title of the display window
    pub window_title: String,
    /// Delay after each iteration, independent of processing time
    pub frame_interval: Duration,
    /// How long to wait for a keypress each iteration
    pub key_wait: Duration,
    /// Key that ends the session
    pub quit_key: char,
    /// Write annotated frames as res<N>.png into this directory
    pub save_frames_dir: Option<PathBuf>,
    pub matching: MatchConfig,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            template_path: PathBuf::from("ref.png"),
            window_title: "Detected".to_string(),
            frame_interval: Duration::from_millis(100),
            key_wait: Duration::from_millis(1),
            quit_key: 'q',
            save_frames_dir: None,
            matching: MatchConfig::default(),
        }
    }
}

/// Why the loop stopped. Neither case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Camera returned no frame (disconnect or end of stream)
    EndOfStream,
    /// User pressed the quit key
    UserQuit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub stop_reason: StopReason,
}

/// A source of color frames. Dropping it releases the device.
pub trait FrameSource {
    /// `Ok(None)` signals end of stream
    fn read_frame(&mut self) -> DetectResult<Option<RgbImage>>;
}

/// A display window. Dropping it closes the window.
pub trait FrameSink {
    fn show(&mut self, frame: &RgbImage) -> DetectResult<()>;

    /// Wait up to `delay` for a keypress
    fn wait_key(&mut self, delay: Duration) -> DetectResult<Option<char>>;
}

/// Opens the camera and display resources a session owns
pub trait CaptureBackend {
    type Source: FrameSource;
    type Sink: FrameSink;

    fn open_camera(&mut self, index: i32) -> DetectResult<Self::Source>;
    fn open_window(&mut self, title: &str) -> DetectResult<Self::Sink>;
}
