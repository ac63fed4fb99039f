//! Coordinate spaces and the mapping between them.
//!
//! Two spaces matter when driving a desktop from a screenshot:
//!
//! - **Image space**: pixel coordinates inside the screenshot the model saw.
//! - **Virtual-screen space**: real desktop pixels spanning every monitor. The
//!   origin may be negative when a monitor sits left of or above the primary one.
//!
//! [`CoordinateMapper`] holds the most recent [`ScreenGeometry`] and
//! [`CapturedImage`] as plain values. The control loop refreshes both once per
//! iteration and hands the mapper to whoever needs to translate coordinates.

use serde::{Deserialize, Serialize};

/// Bounding rectangle of the virtual desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenGeometry {
    /// Left edge (may be negative)
    pub origin_x: i32,
    /// Top edge (may be negative)
    pub origin_y: i32,
    /// Total width across all monitors
    pub width: i32,
    /// Total height across all monitors
    pub height: i32,
}

impl ScreenGeometry {
    pub fn new(origin_x: i32, origin_y: i32, width: i32, height: i32) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Both extents are strictly positive, so the geometry can be divided by.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Inclusive right-most pixel column.
    pub fn right(&self) -> i32 {
        self.origin_x + self.width - 1
    }

    /// Inclusive bottom-most pixel row.
    pub fn bottom(&self) -> i32 {
        self.origin_y + self.height - 1
    }

    /// Whether a screen point lies on the desktop.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.is_valid() && x >= self.origin_x && x <= self.right() && y >= self.origin_y && y <= self.bottom()
    }

    /// Smallest rectangle covering every given monitor rectangle.
    pub fn union_of<I>(rects: I) -> Option<Self>
    where
        I: IntoIterator<Item = ScreenGeometry>,
    {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for r in rects.into_iter().filter(|r| r.is_valid()) {
            let (l, t, rr, b) = (r.origin_x, r.origin_y, r.origin_x + r.width, r.origin_y + r.height);
            bounds = Some(match bounds {
                None => (l, t, rr, b),
                Some((bl, bt, br, bb)) => (bl.min(l), bt.min(t), br.max(rr), bb.max(b)),
            });
        }
        bounds.map(|(l, t, r, b)| Self::new(l, t, r - l, b - t))
    }
}

/// Dimensions of the most recent screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapturedImage {
    pub width: i32,
    pub height: i32,
}

impl CapturedImage {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Whether an image-space point falls inside the bitmap.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.is_valid() && x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }
}

/// Translates image-space and normalized coordinates into virtual-screen pixels.
///
/// When either the image size or the desktop geometry is unknown (or has a
/// non-positive extent) the mapper falls back to a pure offset: the point is
/// shifted by the known desktop origin and nothing is scaled or clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinateMapper {
    geometry: Option<ScreenGeometry>,
    image: Option<CapturedImage>,
}

impl CoordinateMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(mut self, geometry: ScreenGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_image(mut self, image: CapturedImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn set_geometry(&mut self, geometry: ScreenGeometry) {
        self.geometry = Some(geometry);
    }

    /// Record the size of a freshly captured screenshot, superseding the last one.
    pub fn record_image(&mut self, image: CapturedImage) {
        self.image = Some(image);
    }

    pub fn geometry(&self) -> Option<ScreenGeometry> {
        self.geometry
    }

    pub fn image(&self) -> Option<CapturedImage> {
        self.image
    }

    fn origin(&self) -> (i32, i32) {
        self.geometry
            .map(|g| (g.origin_x, g.origin_y))
            .unwrap_or((0, 0))
    }

    /// Map a screenshot pixel to a desktop pixel.
    pub fn map_from_image_pixel(&self, x: i32, y: i32) -> (i32, i32) {
        let (ox, oy) = self.origin();
        let (geometry, image) = match (self.geometry, self.image) {
            (Some(g), Some(i)) if g.is_valid() && i.is_valid() => (g, i),
            _ => return (x.saturating_add(ox), y.saturating_add(oy)),
        };

        let sx = geometry.width as f64 / image.width as f64;
        let sy = geometry.height as f64 / image.height as f64;
        let mx = (geometry.origin_x as f64 + x as f64 * sx).round();
        let my = (geometry.origin_y as f64 + y as f64 * sy).round();
        self.clamp_to_virtual_desktop(saturate(mx), saturate(my))
    }

    /// Map a `[0, 1]` pair onto the desktop, refreshing geometry first when it is unset.
    pub fn map_from_normalized<F>(&mut self, x_norm: f64, y_norm: f64, refresh: F) -> (i32, i32)
    where
        F: FnOnce() -> ScreenGeometry,
    {
        if !self.geometry.is_some_and(|g| g.is_valid()) {
            self.geometry = Some(refresh());
        }
        let (ox, oy) = self.origin();
        let geometry = match self.geometry {
            Some(g) if g.is_valid() => g,
            _ => return (ox, oy),
        };

        let mx = (geometry.origin_x as f64 + x_norm * geometry.width as f64).round();
        let my = (geometry.origin_y as f64 + y_norm * geometry.height as f64).round();
        self.clamp_to_virtual_desktop(saturate(mx), saturate(my))
    }

    /// Clamp a desktop point into the known virtual desktop. Points are returned
    /// unchanged while the geometry is unknown.
    pub fn clamp_to_virtual_desktop(&self, x: i32, y: i32) -> (i32, i32) {
        match self.geometry {
            Some(g) if g.is_valid() => (
                x.max(g.origin_x).min(g.right()),
                y.max(g.origin_y).min(g.bottom()),
            ),
            _ => (x, y),
        }
    }
}

fn saturate(v: f64) -> i32 {
    if v >= i32::MAX as f64 {
        i32::MAX
    } else if v <= i32::MIN as f64 {
        i32::MIN
    } else {
        v as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(w: i32, h: i32, geo: ScreenGeometry) -> CoordinateMapper {
        CoordinateMapper::new()
            .with_image(CapturedImage::new(w, h))
            .with_geometry(geo)
    }

    #[test]
    fn test_corners_map_to_desktop_corners() {
        let cases = [
            (1920, 1080, ScreenGeometry::new(0, 0, 1920, 1080)),
            (1280, 720, ScreenGeometry::new(0, 0, 2560, 1440)),
            (1000, 500, ScreenGeometry::new(-1920, -200, 3840, 1280)),
            (800, 800, ScreenGeometry::new(100, 50, 1024, 768)),
        ];
        for (w, h, geo) in cases {
            let m = mapper(w, h, geo);
            assert_eq!(m.map_from_image_pixel(0, 0), (geo.origin_x, geo.origin_y));

            let (bx, by) = m.map_from_image_pixel(w - 1, h - 1);
            let sx = (geo.width as f64 / w as f64).ceil() as i32;
            let sy = (geo.height as f64 / h as f64).ceil() as i32;
            assert!((geo.right() - bx).abs() <= sx, "x {} vs {}", bx, geo.right());
            assert!((geo.bottom() - by).abs() <= sy, "y {} vs {}", by, geo.bottom());
        }
    }

    #[test]
    fn test_non_uniform_scale() {
        let m = mapper(1000, 1000, ScreenGeometry::new(0, 0, 2000, 500));
        assert_eq!(m.map_from_image_pixel(500, 500), (1000, 250));
    }

    #[test]
    fn test_negative_origin_offset() {
        let m = mapper(3840, 1080, ScreenGeometry::new(-1920, 0, 3840, 1080));
        assert_eq!(m.map_from_image_pixel(10, 20), (-1910, 20));

        // Half-size image doubles x before the offset
        let m = mapper(1920, 1080, ScreenGeometry::new(-1920, 0, 3840, 1080));
        assert_eq!(m.map_from_image_pixel(10, 20), (-1900, 20));
    }

    #[test]
    fn test_clamp_keeps_result_inside() {
        let m = mapper(100, 100, ScreenGeometry::new(0, 0, 200, 200));
        assert_eq!(m.map_from_image_pixel(500, -30), (199, 0));
    }

    #[test]
    fn test_clamp_idempotent() {
        let m = CoordinateMapper::new().with_geometry(ScreenGeometry::new(-1280, -10, 3200, 1210));
        for &(x, y) in &[
            (i32::MIN, i32::MAX),
            (-5000, 0),
            (0, 0),
            (1919, 1199),
            (5000, -5000),
            (-1280, -10),
        ] {
            let once = m.clamp_to_virtual_desktop(x, y);
            assert_eq!(m.clamp_to_virtual_desktop(once.0, once.1), once);
        }
    }

    #[test]
    fn test_clamp_inside_point_unchanged() {
        let m = CoordinateMapper::new().with_geometry(ScreenGeometry::new(0, 0, 1920, 1080));
        assert_eq!(m.clamp_to_virtual_desktop(640, 480), (640, 480));
    }

    #[test]
    fn test_degenerate_geometry_uses_offset() {
        for geo in [
            ScreenGeometry::new(30, 40, 0, 1080),
            ScreenGeometry::new(30, 40, 1920, -1),
            ScreenGeometry::new(-30, 40, -5, -5),
        ] {
            let m = mapper(1920, 1080, geo);
            assert_eq!(m.map_from_image_pixel(7, 9), (7 + geo.origin_x, 9 + geo.origin_y));
            assert_eq!(m.map_from_image_pixel(5000, 5000), (5000 + geo.origin_x, 5000 + geo.origin_y));
        }
    }

    #[test]
    fn test_unknown_image_uses_offset() {
        let m = CoordinateMapper::new().with_geometry(ScreenGeometry::new(-100, 10, 1920, 1080));
        assert_eq!(m.map_from_image_pixel(50, 60), (-50, 70));

        let bare = CoordinateMapper::new();
        assert_eq!(bare.map_from_image_pixel(50, 60), (50, 60));
    }

    #[test]
    fn test_normalized_refreshes_unset_geometry() {
        let mut m = CoordinateMapper::new();
        let mut refreshed = false;
        let p = m.map_from_normalized(0.5, 0.5, || {
            refreshed = true;
            ScreenGeometry::new(0, 0, 1000, 800)
        });
        assert!(refreshed);
        assert_eq!(p, (500, 400));

        // Geometry is now known, so no second refresh
        let p = m.map_from_normalized(1.0, 1.0, || panic!("should not refresh"));
        assert_eq!(p, (999, 799));
    }

    #[test]
    fn test_union_of_monitors() {
        let g = ScreenGeometry::union_of([
            ScreenGeometry::new(0, 0, 1920, 1080),
            ScreenGeometry::new(-1280, 100, 1280, 1024),
        ])
        .unwrap();
        assert_eq!(g, ScreenGeometry::new(-1280, 0, 3200, 1124));
        assert!(ScreenGeometry::union_of(Vec::new()).is_none());
    }

    #[test]
    fn test_image_contains() {
        let img = CapturedImage::new(100, 50);
        assert!(img.contains(0, 0));
        assert!(img.contains(99, 49));
        assert!(!img.contains(100, 10));
        assert!(!img.contains(-1, 10));
        assert!(!CapturedImage::default().contains(0, 0));
    }
}
