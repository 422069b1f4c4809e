//! Geodesic helpers for trip statistics and map viewports
//!
//! All inputs are WGS84 degrees. Nothing here validates ranges: callers pass
//! coordinates that already came from the map.

use crate::LatLng;
use ::geo::{BoundingRect, Coord, LineString, Rect};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Overview regions are at least this many degrees wide
pub const MIN_OVERVIEW_DELTA: f64 = 50.0;

/// Overview regions never exceed this many degrees, to avoid distortion
pub const MAX_OVERVIEW_DELTA: f64 = 150.0;

/// Padding factor applied to the bounding box span of an overview region
const OVERVIEW_SPAN_FACTOR: f64 = 2.5;

/// Great-circle distance between two coordinates in kilometers (haversine)
///
/// Symmetric, and exactly zero for identical inputs.
#[inline]
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` just past 1 for antipodal pairs
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance between two [`LatLng`] values in kilometers
#[inline]
pub fn distance_between(a: LatLng, b: LatLng) -> f64 {
    distance(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Unrounded sum of the consecutive leg distances, in visiting order
pub fn route_distance(coordinates: &[LatLng]) -> f64 {
    #[cfg(feature = "profiling")]
    profiling::scope!("geodesy::route_distance");

    coordinates
        .windows(2)
        .map(|leg| distance_between(leg[0], leg[1]))
        .sum()
}

/// Total length of a route in kilometers, rounded to the nearest integer
///
/// Routes with fewer than two coordinates have no legs and measure 0.
pub fn total_route_distance(coordinates: &[LatLng]) -> u64 {
    route_distance(coordinates).round() as u64
}

/// Bounding rectangle of a coordinate set (x = longitude, y = latitude)
pub fn bounding_rect(coordinates: &[LatLng]) -> Option<Rect<f64>> {
    let line: LineString<f64> = coordinates.iter().map(|c| Coord::from(*c)).collect();
    line.bounding_rect()
}

/// A map viewport expressed as a center and a span in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    pub center: LatLng,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// Region that shows every coordinate with generous padding
///
/// Used for the initial "fit all routes" view: the span is the bounding box
/// scaled by 2.5, clamped to `[MIN_OVERVIEW_DELTA, MAX_OVERVIEW_DELTA]`.
pub fn overview_region(coordinates: &[LatLng]) -> Option<MapRegion> {
    let rect = bounding_rect(coordinates)?;
    let delta = |span: f64| {
        (span * OVERVIEW_SPAN_FACTOR)
            .max(MIN_OVERVIEW_DELTA)
            .min(MAX_OVERVIEW_DELTA)
    };

    Some(MapRegion {
        center: rect.center().into(),
        latitude_delta: delta(rect.height()),
        longitude_delta: delta(rect.width()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAN_FRANCISCO: LatLng = LatLng::new(37.7749, -122.4194);
    const MONTEREY: LatLng = LatLng::new(36.6002, -121.8947);
    const LOS_ANGELES: LatLng = LatLng::new(34.0522, -118.2437);

    #[test]
    fn test_distance_same_point_is_zero() {
        for c in [SAN_FRANCISCO, LOS_ANGELES, LatLng::new(0.0, 0.0)] {
            assert_eq!(distance_between(c, c), 0.0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (SAN_FRANCISCO, LOS_ANGELES),
            (MONTEREY, LOS_ANGELES),
            (LatLng::new(-33.8688, 151.2093), LatLng::new(51.5074, -0.1278)),
        ];
        for (a, b) in pairs {
            assert!((distance_between(a, b) - distance_between(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_san_francisco_to_los_angeles() {
        let dist = distance(37.7749, -122.4194, 34.0522, -118.2437);
        assert!(dist > 500.0);
        assert!(dist < 600.0);
    }

    #[test]
    fn test_total_route_distance_short_routes() {
        assert_eq!(total_route_distance(&[]), 0);
        assert_eq!(total_route_distance(&[LatLng::new(0.0, 0.0)]), 0);
    }

    #[test]
    fn test_total_route_distance_sums_legs() {
        let route = [SAN_FRANCISCO, MONTEREY, LOS_ANGELES];
        let total = total_route_distance(&route);
        let legs = distance_between(SAN_FRANCISCO, MONTEREY) + distance_between(MONTEREY, LOS_ANGELES);
        assert!(total > 500);
        assert_eq!(total, legs.round() as u64);
    }

    #[test]
    fn test_route_order_matters() {
        let forward = [SAN_FRANCISCO, LOS_ANGELES, MONTEREY];
        let sorted = [SAN_FRANCISCO, MONTEREY, LOS_ANGELES];
        assert!(total_route_distance(&forward) > total_route_distance(&sorted));
    }

    #[test]
    fn test_appending_never_shrinks_route() {
        let stops = [
            SAN_FRANCISCO,
            MONTEREY,
            LOS_ANGELES,
            LOS_ANGELES,
            LatLng::new(36.1699, -115.1398),
        ];
        let mut previous = 0.0;
        for end in 0..=stops.len() {
            let current = route_distance(&stops[..end]);
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_antipodal_distance_is_half_circumference() {
        let half = std::f64::consts::PI * EARTH_RADIUS_KM;
        let mut lat = -89.5;
        while lat < 90.0 {
            let mut lon = -179.5;
            while lon < 0.0 {
                let d = distance(lat, lon, -lat, lon + 180.0);
                assert!(d.is_finite(), "{lat},{lon}");
                assert!((d - half).abs() < 1e-3, "{lat},{lon}: {d}");
                lon += 0.7;
            }
            lat += 0.9;
        }
        assert!(distance(-29.877, -125.679, 29.877, 54.321).is_finite());
    }

    #[test]
    fn test_appending_antipode_never_shrinks_route() {
        let a = LatLng::new(-29.877, -125.679);
        let b = LatLng::new(29.877, 54.321);
        let origin = LatLng::new(0.0, 0.0);
        let two = total_route_distance(&[origin, a]);
        let three = total_route_distance(&[origin, a, b]);
        assert!(two > 13_000);
        assert!(three >= two + 20_000);
    }

    #[test]
    fn test_bounding_rect() {
        assert!(bounding_rect(&[]).is_none());

        let rect = bounding_rect(&[SAN_FRANCISCO, LOS_ANGELES]).unwrap();
        assert_eq!(rect.min().y, LOS_ANGELES.latitude);
        assert_eq!(rect.max().y, SAN_FRANCISCO.latitude);
        assert_eq!(rect.min().x, SAN_FRANCISCO.longitude);
        assert_eq!(rect.max().x, LOS_ANGELES.longitude);
    }

    #[test]
    fn test_overview_region_small_area_uses_minimum_delta() {
        let region = overview_region(&[SAN_FRANCISCO, LOS_ANGELES]).unwrap();
        assert_eq!(region.latitude_delta, MIN_OVERVIEW_DELTA);
        assert_eq!(region.longitude_delta, MIN_OVERVIEW_DELTA);
        assert!((region.center.latitude - (37.7749 + 34.0522) / 2.0).abs() < 1e-9);
        assert!((region.center.longitude - (-122.4194 + -118.2437) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_overview_region_world_spanning_is_capped() {
        let region =
            overview_region(&[LatLng::new(-60.0, -170.0), LatLng::new(70.0, 170.0)]).unwrap();
        assert_eq!(region.latitude_delta, MAX_OVERVIEW_DELTA);
        assert_eq!(region.longitude_delta, MAX_OVERVIEW_DELTA);
    }

    #[test]
    fn test_overview_region_empty() {
        assert!(overview_region(&[]).is_none());
    }
}
