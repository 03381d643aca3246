use crate::geo::GeoPoint;
use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 100.0;

/// Project a geographic coordinate to normalized Web Mercator space
/// (x and y both in [0, 1], y growing southward).
#[inline]
fn mercator_norm(lon: f64, lat: f64) -> (f64, f64) {
    let x = (lon + 180.0) / 360.0;
    let lat_rad = lat * PI / 180.0;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone)]
pub struct Viewport {
    /// Map center
    pub center: GeoPoint,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

impl Viewport {
    pub fn new(center: GeoPoint, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
        }
    }

    /// Create a world view (shows the entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(GeoPoint::new(20.0, 0.0), 1.0, width, height)
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width as f64);
        self.center.lon += dx as f64 * scale;
        self.center.lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center.lon > 180.0 {
            self.center.lon -= 360.0;
        } else if self.center.lon < -180.0 {
            self.center.lon += 360.0;
        }

        // Clamp latitude
        self.center.lat = self.center.lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor keeping the point under (px, py) fixed
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Pan so the anchor lands back under the cursor
        let (new_px, new_py) = self.project(anchor);
        self.pan(new_px - px, new_py - py);
    }

    /// Unproject pixel coordinates back to a geographic coordinate
    pub fn unproject(&self, px: i32, py: i32) -> GeoPoint {
        let scale = self.zoom * self.width as f64;
        let (center_x, center_y) = mercator_norm(self.center.lon, self.center.lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        let lon = x * 360.0 - 180.0;
        let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
        GeoPoint::new(lat_rad * 180.0 / PI, lon)
    }

    /// Project a geographic coordinate to pixel coordinates
    pub fn project(&self, point: GeoPoint) -> (i32, i32) {
        let (x, y) = mercator_norm(point.lon, point.lat);
        let (center_x, center_y) = mercator_norm(self.center.lon, self.center.lat);

        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Center and zoom so that all given points are visible, with some margin.
    /// Used when drilling into a pool: the scoped view frames its members.
    pub fn fit_bounds(&mut self, points: &[GeoPoint]) {
        let Some(first) = points.first() else {
            return;
        };

        let mut min_lat = first.lat;
        let mut max_lat = first.lat;
        let mut min_lon = first.lon;
        let mut max_lon = first.lon;
        for p in &points[1..] {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lon = min_lon.min(p.lon);
            max_lon = max_lon.max(p.lon);
        }

        self.center = GeoPoint::new((min_lat + max_lat) / 2.0, (min_lon + max_lon) / 2.0);

        // Pick the largest zoom that keeps the bounds inside the canvas,
        // with a 20% margin on each axis
        let (x0, y0) = mercator_norm(min_lon, max_lat);
        let (x1, y1) = mercator_norm(max_lon, min_lat);
        let span_x = (x1 - x0).abs().max(1e-6);
        let span_y = (y1 - y0).abs().max(1e-6);

        let zoom_x = 0.8 / span_x;
        let zoom_y = 0.8 * (self.height as f64 / self.width as f64) / span_y;
        self.zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10 && px < self.width as i32 + 10 && py >= -10 && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(GeoPoint::new(0.0, 0.0), 1.0, 100, 100);
        let (x, y) = vp.project(GeoPoint::new(0.0, 0.0));
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(GeoPoint::new(0.0, 0.0), 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center.lon > 0.0);
    }

    #[test]
    fn test_unproject_roundtrip() {
        let vp = Viewport::new(GeoPoint::new(30.0, -20.0), 4.0, 200, 120);
        let p = GeoPoint::new(31.5, -18.2);
        let (px, py) = vp.project(p);
        let back = vp.unproject(px, py);
        assert!((back.lat - p.lat).abs() < 0.5);
        assert!((back.lon - p.lon).abs() < 0.5);
    }

    #[test]
    fn test_fit_bounds_contains_points() {
        let mut vp = Viewport::world(400, 200);
        let points = [
            GeoPoint::new(40.7, -74.0),
            GeoPoint::new(51.5, -0.1),
            GeoPoint::new(48.9, 2.3),
        ];
        vp.fit_bounds(&points);
        for p in &points {
            let (px, py) = vp.project(*p);
            assert!(vp.is_visible(px, py), "{:?} projected off-canvas", p);
        }
    }

    #[test]
    fn test_fit_bounds_empty_is_noop() {
        let mut vp = Viewport::world(400, 200);
        let before = (vp.center, vp.zoom);
        vp.fit_bounds(&[]);
        assert_eq!(before.0, vp.center);
        assert_eq!(before.1, vp.zoom);
    }
}
