//! Geographic primitives shared by the data source, the reconciler, and the
//! map scene.
//!
//! Coordinates are WGS84 degrees. The scene uses a local equirectangular
//! projection anchored at the basemap origin: one world unit equals one
//! meter, east is +X and north is +Y. At city scale the distortion is
//! negligible and the math stays trivially invertible.

use bevy::prelude::Vec2;

/// Meters per degree of latitude (WGS84 mean)
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// Mean Earth radius in kilometers, for haversine distances
const EARTH_RADIUS_KM: f64 = 6_371.0;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    ///
    /// Records with coordinates this rejects are excluded from mapping, not
    /// treated as errors.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// Great-circle distance to another point in kilometers (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat_a = self.lat.to_radians();
        let lat_b = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();

        let h = (d_lat / 2.0).sin().powi(2)
            + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
    }
}

/// Local equirectangular projection anchored at `origin`.
#[derive(Debug, Clone, Copy)]
pub struct MapProjection {
    origin: GeoPoint,
    meters_per_deg_lng: f64,
}

impl MapProjection {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            origin,
            meters_per_deg_lng: METERS_PER_DEG_LAT * origin.lat.to_radians().cos(),
        }
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Project a geographic point to scene world coordinates (meters).
    pub fn to_world(&self, point: GeoPoint) -> Vec2 {
        Vec2::new(
            ((point.lng - self.origin.lng) * self.meters_per_deg_lng) as f32,
            ((point.lat - self.origin.lat) * METERS_PER_DEG_LAT) as f32,
        )
    }

    /// Inverse of [`MapProjection::to_world`].
    pub fn to_geo(&self, world: Vec2) -> GeoPoint {
        GeoPoint {
            lat: self.origin.lat + world.y as f64 / METERS_PER_DEG_LAT,
            lng: self.origin.lng + world.x as f64 / self.meters_per_deg_lng,
        }
    }

    /// World-unit spacing of a graticule drawn every `degrees` of latitude.
    pub fn graticule_spacing_world(&self, degrees: f64) -> f32 {
        (degrees * METERS_PER_DEG_LAT) as f32
    }
}

/// Axis-aligned geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl GeoBounds {
    /// Tight bounds around a non-empty slice of points.
    pub fn around(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = GeoBounds { min: *first, max: *first };
        for p in &points[1..] {
            bounds.min.lat = bounds.min.lat.min(p.lat);
            bounds.min.lng = bounds.min.lng.min(p.lng);
            bounds.max.lat = bounds.max.lat.max(p.lat);
            bounds.max.lng = bounds.max.lng.max(p.lng);
        }
        Some(bounds)
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min.lat + self.max.lat) / 2.0,
            lng: (self.min.lng + self.max.lng) / 2.0,
        }
    }
}

/// Camera movement resolved from a `fit_bounds` request.
///
/// Every widget backend routes `fit_bounds` through [`camera_plan`] so the
/// degenerate cases behave identically everywhere: zero points means no
/// camera movement at all, a single point (or zero-area bounds) pans at the
/// default zoom instead of fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraPlan {
    Center { at: GeoPoint, zoom: f32 },
    Frame(GeoBounds),
}

pub fn camera_plan(points: &[GeoPoint], default_zoom: f32) -> Option<CameraPlan> {
    let bounds = GeoBounds::around(points)?;
    if points.len() == 1 || (bounds.min == bounds.max) {
        return Some(CameraPlan::Center {
            at: bounds.center(),
            zoom: default_zoom,
        });
    }
    Some(CameraPlan::Frame(bounds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_accepts_valid_coordinates() {
        assert!(GeoPoint::checked(44.97, -93.26).is_some());
        assert!(GeoPoint::checked(-90.0, 180.0).is_some());
        assert!(GeoPoint::checked(0.0, 0.0).is_some());
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(GeoPoint::checked(90.1, 0.0).is_none());
        assert!(GeoPoint::checked(-90.1, 0.0).is_none());
        assert!(GeoPoint::checked(0.0, 180.5).is_none());
        assert!(GeoPoint::checked(0.0, -181.0).is_none());
    }

    #[test]
    fn test_checked_rejects_non_finite() {
        assert!(GeoPoint::checked(f64::NAN, 0.0).is_none());
        assert!(GeoPoint::checked(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = GeoPoint { lat: 44.97, lng: -93.26 };
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        // One degree of latitude is roughly 111 km everywhere
        let a = GeoPoint { lat: 44.0, lng: -93.0 };
        let b = GeoPoint { lat: 45.0, lng: -93.0 };
        let d = a.distance_km(&b);
        assert!((d - 111.2).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_projection_roundtrip() {
        let projection = MapProjection::new(GeoPoint { lat: 44.97, lng: -93.26 });
        let p = GeoPoint { lat: 45.01, lng: -93.19 };
        let back = projection.to_geo(projection.to_world(p));
        assert!((back.lat - p.lat).abs() < 1e-9);
        assert!((back.lng - p.lng).abs() < 1e-9);
    }

    #[test]
    fn test_projection_origin_is_world_zero() {
        let origin = GeoPoint { lat: 44.97, lng: -93.26 };
        let projection = MapProjection::new(origin);
        assert_eq!(projection.to_world(origin), Vec2::ZERO);
    }

    #[test]
    fn test_projection_north_is_positive_y() {
        let projection = MapProjection::new(GeoPoint { lat: 44.0, lng: -93.0 });
        let north = projection.to_world(GeoPoint { lat: 44.5, lng: -93.0 });
        assert!(north.y > 0.0);
        assert!(north.x.abs() < 1e-3);
    }

    #[test]
    fn test_bounds_around_points() {
        let points = [
            GeoPoint { lat: 44.0, lng: -93.5 },
            GeoPoint { lat: 45.0, lng: -93.0 },
            GeoPoint { lat: 44.5, lng: -94.0 },
        ];
        let bounds = GeoBounds::around(&points).unwrap();
        assert_eq!(bounds.min, GeoPoint { lat: 44.0, lng: -94.0 });
        assert_eq!(bounds.max, GeoPoint { lat: 45.0, lng: -93.0 });
    }

    #[test]
    fn test_bounds_empty_slice() {
        assert!(GeoBounds::around(&[]).is_none());
    }

    #[test]
    fn test_camera_plan_empty_is_none() {
        assert!(camera_plan(&[], 0.5).is_none());
    }

    #[test]
    fn test_camera_plan_single_point_centers() {
        let p = GeoPoint { lat: 44.97, lng: -93.26 };
        let plan = camera_plan(&[p], 0.5).unwrap();
        assert_eq!(plan, CameraPlan::Center { at: p, zoom: 0.5 });
    }

    #[test]
    fn test_camera_plan_identical_points_center() {
        // Two providers at the same address produce zero-area bounds
        let p = GeoPoint { lat: 44.97, lng: -93.26 };
        let plan = camera_plan(&[p, p], 0.5).unwrap();
        assert_eq!(plan, CameraPlan::Center { at: p, zoom: 0.5 });
    }

    #[test]
    fn test_camera_plan_spread_points_frame() {
        let a = GeoPoint { lat: 44.0, lng: -93.5 };
        let b = GeoPoint { lat: 45.0, lng: -93.0 };
        match camera_plan(&[a, b], 0.5).unwrap() {
            CameraPlan::Frame(bounds) => {
                assert_eq!(bounds.min, GeoPoint { lat: 44.0, lng: -93.5 });
                assert_eq!(bounds.max, GeoPoint { lat: 45.0, lng: -93.0 });
            }
            other => panic!("expected frame, got {:?}", other),
        }
    }
}
