//! OpenCV camera capture and HighGUI display

use super::types::{CaptureBackend, FrameSink, FrameSource};
use crate::error::{DetectError, DetectResult};
use image::RgbImage;
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio,
};
use std::time::Duration;

/// Opens system cameras through `VideoCapture` and windows through HighGUI
#[derive(Debug, Default)]
pub struct OpenCvBackend;

pub struct OpenCvCamera {
    capture: videoio::VideoCapture,
    index: i32,
}

pub struct OpenCvWindow {
    title: String,
}

impl CaptureBackend for OpenCvBackend {
    type Source = OpenCvCamera;
    type Sink = OpenCvWindow;

    fn open_camera(&mut self, index: i32) -> DetectResult<OpenCvCamera> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY).map_err(|e| {
            log::warn!("VideoCapture::new({index}) failed: {e}");
            DetectError::CameraUnavailable { index }
        })?;

        if !capture.is_opened()? {
            return Err(DetectError::CameraUnavailable { index });
        }

        Ok(OpenCvCamera { capture, index })
    }

    fn open_window(&mut self, title: &str) -> DetectResult<OpenCvWindow> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE).map_err(display_failed)?;
        Ok(OpenCvWindow {
            title: title.to_string(),
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn read_frame(&mut self) -> DetectResult<Option<RgbImage>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        bgr_mat_to_rgb(&frame).map(Some)
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            log::warn!("Failed to release camera {}: {}", self.index, e);
        }
    }
}

impl FrameSink for OpenCvWindow {
    fn show(&mut self, frame: &RgbImage) -> DetectResult<()> {
        let mat = rgb_to_bgr_mat(frame).map_err(display_failed)?;
        highgui::imshow(&self.title, &mat).map_err(display_failed)?;
        Ok(())
    }

    fn wait_key(&mut self, delay: Duration) -> DetectResult<Option<char>> {
        // wait_key(0) blocks forever
        let millis = delay.as_millis().clamp(1, i32::MAX as u128) as i32;
        let key = highgui::wait_key(millis)?;
        if key < 0 {
            return Ok(None);
        }
        Ok(char::from_u32((key & 0xFF) as u32))
    }
}

impl Drop for OpenCvWindow {
    fn drop(&mut self) {
        if let Err(e) = highgui::destroy_window(&self.title) {
            log::warn!("Failed to close window '{}': {}", self.title, e);
        }
    }
}

fn display_failed(e: opencv::Error) -> DetectError {
    DetectError::DisplayFailed {
        description: e.to_string(),
    }
}

fn bgr_mat_to_rgb(frame: &Mat) -> DetectResult<RgbImage> {
    if frame.typ() != core::CV_8UC3 {
        return Err(DetectError::CameraReadFailed {
            description: format!("unsupported frame type {}", frame.typ()),
        });
    }

    // cvtColor always allocates a fresh, continuous destination
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(frame, &mut rgb, imgproc::COLOR_BGR2RGB)?;

    let width = rgb.cols() as u32;
    let height = rgb.rows() as u32;
    RgbImage::from_raw(width, height, rgb.data_bytes()?.to_vec()).ok_or_else(|| {
        DetectError::CameraReadFailed {
            description: format!("frame buffer does not match {width}x{height}"),
        }
    })
}

fn rgb_to_bgr_mat(frame: &RgbImage) -> opencv::Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color_def(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR)?;
    Ok(bgr)
}
