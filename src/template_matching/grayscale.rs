//! BT.601 grayscale conversion with OpenCV's fixed-point rounding

use image::{DynamicImage, GrayImage, Luma, RgbImage};

// 0.299 / 0.587 / 0.114 scaled by 2^14, as cvtColor(BGR2GRAY) uses them
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Luma of one RGB pixel
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
    ((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8
}

/// Convert a color frame to grayscale
pub fn rgb_to_gray(frame: &RgbImage) -> GrayImage {
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b] = frame.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

/// Convert a decoded image file to grayscale. Gray files are kept as-is; alpha is ignored.
pub fn image_to_gray(image: DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray,
        other @ (DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_)) => other.to_luma8(),
        other => rgb_to_gray(&other.to_rgb8()),
    }
}
