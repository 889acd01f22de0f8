//! Capture session: camera → match → annotate → display, one frame at a time

use super::types::{CaptureBackend, CaptureConfig, FrameSink, FrameSource, RunSummary, StopReason};
use crate::error::{DetectError, DetectResult};
use crate::template_matching::{Template, TemplateMatcher};
use image::RgbImage;
use std::path::PathBuf;
use std::thread::sleep;

/// Everything the capture loop owns for its lifetime.
///
/// Camera and window are released when the session is dropped, whichever way the run ends.
pub struct CaptureSession<S: FrameSource, K: FrameSink> {
    camera: S,
    window: K,
    template: Template,
    matcher: TemplateMatcher,
    config: CaptureConfig,
    frame_count: u64,
}

impl<S: FrameSource, K: FrameSink> CaptureSession<S, K> {
    /// Open the camera, load the template, then open the window.
    ///
    /// Fails without retrying if the camera cannot be opened; nothing else is touched then.
    pub fn open<B>(backend: &mut B, config: CaptureConfig) -> DetectResult<Self>
    where
        B: CaptureBackend<Source = S, Sink = K>,
    {
        let matcher = TemplateMatcher::new(config.matching.clone())?;

        log::info!("Opening camera {}", config.camera_index);
        let camera = backend.open_camera(config.camera_index)?;

        let template = Template::load(&config.template_path)?;
        log::info!(
            "Template {:?} loaded ({}x{}), threshold {:.2}",
            config.template_path,
            template.width(),
            template.height(),
            matcher.config().threshold
        );

        let window = backend.open_window(&config.window_title)?;

        Ok(Self {
            camera,
            window,
            template,
            matcher,
            config,
            frame_count: 0,
        })
    }

    /// Run until the stream ends or the quit key is pressed
    pub fn run(mut self) -> DetectResult<RunSummary> {
        loop {
            if let Some(stop_reason) = self.step()? {
                log::info!(
                    "Capture stopped ({:?}) after {} frames",
                    stop_reason,
                    self.frame_count
                );
                return Ok(RunSummary {
                    frames_processed: self.frame_count,
                    stop_reason,
                });
            }
        }
    }

    /// One loop iteration. Returns `Some` when the loop should stop.
    pub fn step(&mut self) -> DetectResult<Option<StopReason>> {
        let Some(mut frame) = self.camera.read_frame()? else {
            return Ok(Some(StopReason::EndOfStream));
        };
        log::debug!(
            "Read a new frame #{} ({}x{})",
            self.frame_count,
            frame.width(),
            frame.height()
        );

        let matches = self.matcher.process_frame(&mut frame, &self.template)?;
        if !matches.is_empty() {
            log::debug!("Frame #{}: {} matches", self.frame_count, matches.len());
        }
        self.window.show(&frame)?;

        if let Some(dir) = &self.config.save_frames_dir {
            save_frame(&frame, dir, self.frame_count)?;
        }
        self.frame_count += 1;

        if self.window.wait_key(self.config.key_wait)? == Some(self.config.quit_key) {
            return Ok(Some(StopReason::UserQuit));
        }

        if !self.config.frame_interval.is_zero() {
            sleep(self.config.frame_interval);
        }
        Ok(None)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frame_count
    }

    pub fn template(&self) -> &Template {
        &self.template
    }
}

fn save_frame(frame: &RgbImage, dir: &std::path::Path, index: u64) -> DetectResult<PathBuf> {
    let path = dir.join(format!("res{index}.png"));
    frame
        .save(&path)
        .map_err(|source| DetectError::FrameSaveFailed {
            path: path.clone(),
            source,
        })?;
    log::debug!("Saved {:?}", path);
    Ok(path)
}
