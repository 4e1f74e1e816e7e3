//! Flight formation layout.
//!
//! Maps a zone rectangle, a formation kind and a list of drone ids to
//! one target waypoint per drone. Coordinates are worked in raw degrees;
//! no projection is applied.

use std::f64::consts::PI;

use crate::models::{FormationKind, FormationWaypoint, Zone, ZoneBounds};

/// Altitude assigned to every formation waypoint.
pub const FORMATION_ALTITUDE_M: f64 = 50.0;

/// Fraction of the zone kept clear on each side for grid-like layouts.
pub const ZONE_MARGIN_RATIO: f64 = 0.05;

/// Circle/spiral radius as a fraction of the smaller half-extent.
pub const RING_RADIUS_RATIO: f64 = 0.4;

/// Angle between consecutive spiral points (three points per turn).
pub const SPIRAL_ANGLE_STEP: f64 = 2.0 * PI / 3.0;

/// Compute formation waypoints for `drone_ids` inside `bounds`.
///
/// The i-th waypoint is assigned to the i-th drone. An empty id list
/// yields an empty result.
pub fn calculate<S: AsRef<str>>(
    bounds: &ZoneBounds,
    kind: FormationKind,
    drone_ids: &[S],
) -> Vec<FormationWaypoint> {
    let n = drone_ids.len();
    if n == 0 {
        return Vec::new();
    }

    let positions = match kind {
        FormationKind::Grid => grid_positions(bounds, n, false),
        FormationKind::Zigzag => grid_positions(bounds, n, true),
        FormationKind::Line => line_positions(bounds, n),
        FormationKind::Circle => circle_positions(bounds, n),
        FormationKind::Spiral => spiral_positions(bounds, n),
    };

    drone_ids
        .iter()
        .zip(positions)
        .map(|(id, (lat, lon))| FormationWaypoint {
            drone_id: id.as_ref().to_string(),
            lat,
            lon,
            altitude_m: FORMATION_ALTITUDE_M,
        })
        .collect()
}

/// Same as [`calculate`], taking the bounds from a registered zone.
pub fn calculate_for_zone<S: AsRef<str>>(
    zone: &Zone,
    kind: FormationKind,
    drone_ids: &[S],
) -> Vec<FormationWaypoint> {
    calculate(&zone.bounds, kind, drone_ids)
}

/// Rows x columns used by the grid and zigzag layouts.
pub fn grid_dimensions(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let rows = (n as f64).sqrt().ceil() as usize;
    let cols = n.div_ceil(rows);
    (rows, cols)
}

/// Zone bounds shrunk by the margin on every side.
struct Inner {
    north: f64,
    west: f64,
    height: f64,
    width: f64,
}

fn inner_area(bounds: &ZoneBounds) -> Inner {
    let height = bounds.north - bounds.south;
    let width = bounds.east - bounds.west;
    Inner {
        north: bounds.north - height * ZONE_MARGIN_RATIO,
        west: bounds.west + width * ZONE_MARGIN_RATIO,
        height: height * (1.0 - 2.0 * ZONE_MARGIN_RATIO),
        width: width * (1.0 - 2.0 * ZONE_MARGIN_RATIO),
    }
}

fn grid_positions(bounds: &ZoneBounds, n: usize, alternate_rows: bool) -> Vec<(f64, f64)> {
    let (rows, cols) = grid_dimensions(n);
    let inner = inner_area(bounds);
    let row_step = inner.height / rows as f64;
    let col_step = inner.width / cols as f64;

    (0..n)
        .map(|i| {
            let row = i / cols;
            let mut col = i % cols;
            if alternate_rows && row % 2 == 1 {
                col = cols - 1 - col;
            }
            // Cell centers, filled north to south, west to east
            let lat = inner.north - (row as f64 + 0.5) * row_step;
            let lon = inner.west + (col as f64 + 0.5) * col_step;
            (lat, lon)
        })
        .collect()
}

fn line_positions(bounds: &ZoneBounds, n: usize) -> Vec<(f64, f64)> {
    let inner = inner_area(bounds);
    let (_, center_lon) = bounds.center();
    let step = inner.height / n as f64;

    (0..n)
        .map(|i| (inner.north - (i as f64 + 0.5) * step, center_lon))
        .collect()
}

fn ring_radius(bounds: &ZoneBounds) -> f64 {
    RING_RADIUS_RATIO * bounds.half_width().min(bounds.half_height())
}

fn circle_positions(bounds: &ZoneBounds, n: usize) -> Vec<(f64, f64)> {
    let (center_lat, center_lon) = bounds.center();
    let radius = ring_radius(bounds);
    let angle_step = 2.0 * PI / n as f64;

    (0..n)
        .map(|i| {
            let angle = i as f64 * angle_step;
            (
                center_lat + radius * angle.cos(),
                center_lon + radius * angle.sin(),
            )
        })
        .collect()
}

fn spiral_positions(bounds: &ZoneBounds, n: usize) -> Vec<(f64, f64)> {
    let (center_lat, center_lon) = bounds.center();
    let max_radius = ring_radius(bounds);

    (0..n)
        .map(|i| {
            let angle = i as f64 * SPIRAL_ANGLE_STEP;
            let radius = max_radius * (i + 1) as f64 / n as f64;
            (
                center_lat + radius * angle.cos(),
                center_lon + radius * angle.sin(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merida_zone() -> ZoneBounds {
        ZoneBounds::new(20.98, 20.96, -89.58, -89.61)
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("DRONE_{:03}", i)).collect()
    }

    #[test]
    fn test_empty_drone_list_returns_empty() {
        for kind in FormationKind::ALL {
            assert!(calculate::<String>(&merida_zone(), kind, &[]).is_empty());
        }
    }

    #[test]
    fn test_grid_dimensions() {
        assert_eq!(grid_dimensions(1), (1, 1));
        assert_eq!(grid_dimensions(4), (2, 2));
        assert_eq!(grid_dimensions(5), (3, 2));
        assert_eq!(grid_dimensions(10), (4, 3));
    }

    #[test]
    fn test_grid_stays_inside_zone() {
        let bounds = merida_zone();
        for n in 1..=17 {
            let waypoints = calculate(&bounds, FormationKind::Grid, &ids(n));
            assert_eq!(waypoints.len(), n);
            for wp in &waypoints {
                assert!(bounds.contains(wp.lat, wp.lon), "{wp:?} outside zone");
                assert_eq!(wp.altitude_m, FORMATION_ALTITUDE_M);
            }
        }
    }

    #[test]
    fn test_grid_assigns_ids_in_order() {
        let waypoints = calculate(&merida_zone(), FormationKind::Grid, &ids(3));
        let assigned: Vec<_> = waypoints.iter().map(|w| w.drone_id.as_str()).collect();
        assert_eq!(assigned, vec!["DRONE_000", "DRONE_001", "DRONE_002"]);
    }

    #[test]
    fn test_zigzag_reverses_odd_rows() {
        let bounds = merida_zone();
        let grid = calculate(&bounds, FormationKind::Grid, &ids(4));
        let zigzag = calculate(&bounds, FormationKind::Zigzag, &ids(4));

        // First row identical
        assert_eq!(grid[0].lon, zigzag[0].lon);
        assert_eq!(grid[1].lon, zigzag[1].lon);
        // Second row mirrored
        assert_eq!(grid[2].lon, zigzag[3].lon);
        assert_eq!(grid[3].lon, zigzag[2].lon);
        assert_eq!(grid[2].lat, zigzag[2].lat);
    }

    #[test]
    fn test_line_shares_center_longitude() {
        let bounds = merida_zone();
        let (_, center_lon) = bounds.center();
        let waypoints = calculate(&bounds, FormationKind::Line, &ids(5));

        assert_eq!(waypoints.len(), 5);
        for pair in waypoints.windows(2) {
            assert_eq!(pair[0].lon, center_lon);
            assert!(pair[0].lat > pair[1].lat, "line should run north to south");
        }
        for wp in &waypoints {
            assert!(bounds.contains(wp.lat, wp.lon));
        }
    }

    #[test]
    fn test_single_drone_line_sits_at_center() {
        let bounds = merida_zone();
        let waypoints = calculate(&bounds, FormationKind::Line, &ids(1));
        let (center_lat, center_lon) = bounds.center();
        assert!((waypoints[0].lat - center_lat).abs() < 1e-12);
        assert_eq!(waypoints[0].lon, center_lon);
    }

    #[test]
    fn test_circle_equal_angular_spacing() {
        let bounds = merida_zone();
        let (center_lat, center_lon) = bounds.center();
        let n = 6;
        let waypoints = calculate(&bounds, FormationKind::Circle, &ids(n));
        let expected_radius = RING_RADIUS_RATIO * bounds.half_width().min(bounds.half_height());

        let angles: Vec<f64> = waypoints
            .iter()
            .map(|wp| (wp.lon - center_lon).atan2(wp.lat - center_lat).rem_euclid(2.0 * PI))
            .collect();

        for (i, angle) in angles.iter().enumerate() {
            let expected = i as f64 * 2.0 * PI / n as f64;
            assert!((angle - expected).abs() < 1e-9, "angle {i} was {angle}");
        }
        for wp in &waypoints {
            let r = ((wp.lat - center_lat).powi(2) + (wp.lon - center_lon).powi(2)).sqrt();
            assert!((r - expected_radius).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spiral_radius_grows() {
        let bounds = merida_zone();
        let (center_lat, center_lon) = bounds.center();
        let waypoints = calculate(&bounds, FormationKind::Spiral, &ids(7));
        let radii: Vec<f64> = waypoints
            .iter()
            .map(|wp| ((wp.lat - center_lat).powi(2) + (wp.lon - center_lon).powi(2)).sqrt())
            .collect();

        for pair in radii.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        let max_radius = RING_RADIUS_RATIO * bounds.half_width().min(bounds.half_height());
        assert!((radii[6] - max_radius).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_zone_collapses() {
        let bounds = ZoneBounds::new(21.0, 21.0, -89.0, -89.0);
        let waypoints = calculate(&bounds, FormationKind::Circle, &ids(3));
        for wp in &waypoints {
            assert_eq!(wp.lat, 21.0);
            assert_eq!(wp.lon, -89.0);
        }
    }
}
