use glam::DVec2;

/// A geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Center of the bounding box spanned by two points.
    /// This is the anchor a two-point line reports to the cluster index.
    pub fn bounds_center(a: GeoPoint, b: GeoPoint) -> GeoPoint {
        GeoPoint::new(
            (a.lat.min(b.lat) + a.lat.max(b.lat)) / 2.0,
            (a.lon.min(b.lon) + a.lon.max(b.lon)) / 2.0,
        )
    }

    /// (lon, lat) as a vector for centroid and fan-out math.
    pub fn to_vec(self) -> DVec2 {
        DVec2::new(self.lon, self.lat)
    }

    pub fn from_vec(v: DVec2) -> Self {
        GeoPoint::new(v.y, v.x)
    }
}

/// Normalize longitude from [-180, 180] to [0, 360) for grid indexing
#[inline(always)]
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0)
}

/// Normalize latitude from [-90, 90] to [0, 180) for grid indexing
#[inline(always)]
pub fn normalize_lat(lat: f64) -> f64 {
    (lat + 90.0).clamp(0.0, 179.999)
}
