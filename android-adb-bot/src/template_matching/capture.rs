//! Screen capture: device screenshot → pixel buffer.

use crate::adb::DeviceControl;
use crate::game_automation::error::AutomationResult;
use image::{GrayImage, RgbImage};

/// Crop rectangle in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Decode a PNG/JPEG screenshot into grayscale.
pub fn decode_gray(bytes: &[u8]) -> AutomationResult<GrayImage> {
    Ok(image::load_from_memory(bytes)?.to_luma8())
}

/// Current screen as grayscale; the buffer every match runs on.
pub async fn capture_gray<D: DeviceControl>(device: &D) -> AutomationResult<GrayImage> {
    let capture = device.screen_capture().await?;
    log::debug!(
        "📸 {} captured {} bytes in {}ms",
        device.device_name(),
        capture.bytes.len(),
        capture.duration_ms
    );
    decode_gray(&capture.bytes)
}

/// Current screen in colour.
pub async fn capture_rgb<D: DeviceControl>(device: &D) -> AutomationResult<RgbImage> {
    let bytes = device.screen_capture_bytes().await?;
    Ok(image::load_from_memory(&bytes)?.to_rgb8())
}

/// Current screen in grayscale, cut down to `rect` (clipped to the screen).
pub async fn capture_cropped<D: DeviceControl>(
    device: &D,
    rect: CropRect,
) -> AutomationResult<GrayImage> {
    let gray = capture_gray(device).await?;
    Ok(crop(&gray, rect))
}

pub fn crop(image: &GrayImage, rect: CropRect) -> GrayImage {
    let x = rect.x.min(image.width());
    let y = rect.y.min(image.height());
    let width = rect.width.min(image.width() - x);
    let height = rect.height.min(image.height() - y);
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}
