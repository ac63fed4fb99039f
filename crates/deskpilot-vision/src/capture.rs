//! Screen capture.
//!
//! This module provides:
//! - The `ScreenCapture` trait the control loop talks to
//! - A multi-monitor implementation on top of `xcap` that composes every
//!   monitor into one virtual-desktop image
//! - PNG / base64 helpers used when shipping the image to a model

use crate::geometry::{CapturedImage, ScreenGeometry};
use async_trait::async_trait;
use base64::Engine;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

/// Errors that can occur during screen capture.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Screen capture not available on this platform")]
    NotAvailable,

    #[error("Failed to capture screen: {0}")]
    CaptureFailed(String),

    #[error("No monitors found")]
    NoMonitors,

    #[error("Image encoding failed: {0}")]
    EncodingFailed(String),
}

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// One captured frame of the whole virtual desktop.
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// PNG-encoded image, exactly what the model is shown
    pub png: Vec<u8>,
    /// Pixel dimensions of `png`
    pub image: CapturedImage,
    /// Desktop rectangle the image covers
    pub geometry: ScreenGeometry,
}

impl Screenshot {
    /// Base64 of the PNG bytes.
    pub fn to_base64(&self) -> String {
        to_base64(&self.png)
    }

    /// `data:` URL suitable for an `input_image` part.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

/// Source of desktop screenshots and desktop geometry.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Capture every monitor as one image.
    async fn capture(&self) -> CaptureResult<Screenshot>;

    /// Current virtual-desktop rectangle without capturing pixels.
    async fn refresh_geometry(&self) -> CaptureResult<ScreenGeometry>;
}

/// Encode an RGBA image as PNG.
pub fn encode_png(image: &RgbaImage) -> CaptureResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut buffer, image::ImageFormat::Png)
        .map_err(|e| CaptureError::EncodingFailed(e.to_string()))?;
    Ok(buffer.into_inner())
}

pub fn to_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Shrink `image` to at most `max_width` pixels wide, keeping the aspect ratio.
pub fn downscale(image: RgbaImage, max_width: Option<u32>) -> RgbaImage {
    match max_width {
        Some(max) if max > 0 && image.width() > max => {
            let height = ((image.height() as u64 * max as u64) / image.width() as u64).max(1) as u32;
            image::imageops::resize(&image, max, height, image::imageops::FilterType::Triangle)
        }
        _ => image,
    }
}

fn to_captured(image: &RgbaImage) -> CapturedImage {
    CapturedImage::new(
        i32::try_from(image.width()).unwrap_or(i32::MAX),
        i32::try_from(image.height()).unwrap_or(i32::MAX),
    )
}

/// Platform screen capture implementation using xcap.
#[cfg(feature = "screen-capture")]
pub mod platform {
    use super::*;
    use crate::config::CaptureSettings;
    use tracing::debug;

    /// Captures every monitor and composes them into one virtual-desktop image.
    #[derive(Debug, Clone, Default)]
    pub struct XcapCapture {
        settings: CaptureSettings,
    }

    struct MonitorFrame {
        rect: ScreenGeometry,
        image: Option<RgbaImage>,
    }

    impl XcapCapture {
        pub fn new(settings: CaptureSettings) -> Self {
            Self { settings }
        }

        fn monitors(with_pixels: bool) -> CaptureResult<Vec<MonitorFrame>> {
            let monitors =
                xcap::Monitor::all().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;

            let mut frames = Vec::with_capacity(monitors.len());
            for m in monitors {
                let x = m.x().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
                let y = m.y().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
                let w = m.width().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
                let h = m.height().map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
                let image = if with_pixels {
                    Some(
                        m.capture_image()
                            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?,
                    )
                } else {
                    None
                };
                frames.push(MonitorFrame {
                    rect: ScreenGeometry::new(x, y, w as i32, h as i32),
                    image,
                });
            }
            if frames.is_empty() {
                return Err(CaptureError::NoMonitors);
            }
            Ok(frames)
        }

        fn desktop(frames: &[MonitorFrame]) -> CaptureResult<ScreenGeometry> {
            ScreenGeometry::union_of(frames.iter().map(|f| f.rect)).ok_or(CaptureError::NoMonitors)
        }

        fn capture_blocking(settings: &CaptureSettings) -> CaptureResult<Screenshot> {
            let frames = Self::monitors(true)?;
            let geometry = Self::desktop(&frames)?;
            let canvas = compose(&frames_to_tiles(frames), geometry);
            let canvas = downscale(canvas, settings.max_width);
            debug!(
                monitors_w = geometry.width,
                monitors_h = geometry.height,
                image_w = canvas.width(),
                image_h = canvas.height(),
                "Captured desktop"
            );
            Ok(Screenshot {
                image: to_captured(&canvas),
                png: encode_png(&canvas)?,
                geometry,
            })
        }
    }

    fn frames_to_tiles(frames: Vec<MonitorFrame>) -> Vec<(ScreenGeometry, RgbaImage)> {
        frames
            .into_iter()
            .filter_map(|f| f.image.map(|img| (f.rect, img)))
            .collect()
    }

    #[async_trait]
    impl ScreenCapture for XcapCapture {
        async fn capture(&self) -> CaptureResult<Screenshot> {
            let settings = self.settings.clone();
            tokio::task::spawn_blocking(move || Self::capture_blocking(&settings))
                .await
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?
        }

        async fn refresh_geometry(&self) -> CaptureResult<ScreenGeometry> {
            tokio::task::spawn_blocking(|| Self::desktop(&Self::monitors(false)?))
                .await
                .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?
        }
    }
}

/// Paint each monitor tile onto one canvas covering `desktop`.
pub fn compose(tiles: &[(ScreenGeometry, RgbaImage)], desktop: ScreenGeometry) -> RgbaImage {
    let mut canvas = RgbaImage::new(desktop.width.max(1) as u32, desktop.height.max(1) as u32);
    for (rect, tile) in tiles {
        let dx = (rect.origin_x - desktop.origin_x) as i64;
        let dy = (rect.origin_y - desktop.origin_y) as i64;
        image::imageops::overlay(&mut canvas, tile, dx, dy);
    }
    canvas
}

/// Fixed-size captures for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a blank image of fixed size on every call.
    #[derive(Debug)]
    pub struct MockCapture {
        image: CapturedImage,
        geometry: ScreenGeometry,
        fail: bool,
        captures: AtomicUsize,
    }

    impl MockCapture {
        /// Image space equal to a desktop of the same size at the origin.
        pub fn new(width: i32, height: i32) -> Self {
            Self::with_geometry(
                CapturedImage::new(width, height),
                ScreenGeometry::new(0, 0, width, height),
            )
        }

        pub fn with_geometry(image: CapturedImage, geometry: ScreenGeometry) -> Self {
            Self {
                image,
                geometry,
                fail: false,
                captures: AtomicUsize::new(0),
            }
        }

        /// Every capture fails.
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(1, 1)
            }
        }

        pub fn captures(&self) -> usize {
            self.captures.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScreenCapture for MockCapture {
        async fn capture(&self) -> CaptureResult<Screenshot> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CaptureError::NotAvailable);
            }
            let canvas = RgbaImage::new(self.image.width.max(1) as u32, self.image.height.max(1) as u32);
            Ok(Screenshot {
                png: encode_png(&canvas)?,
                image: self.image,
                geometry: self.geometry,
            })
        }

        async fn refresh_geometry(&self) -> CaptureResult<ScreenGeometry> {
            if self.fail {
                return Err(CaptureError::NotAvailable);
            }
            Ok(self.geometry)
        }
    }
}
