use crate::boundary::{BoundEdge, BoundKind, PathBoundary, PathBoundPoint};
use crate::decider::SLState;
use crate::error::{CorridorError, Result};
use crate::obstacle::SLPolygon;
use crate::ref_line::SLPoint;
use crate::ObstacleId;
use log::warn;

/// Builds the extra station for one polygon vertex falling strictly between
/// two existing stations: bounds linearly interpolated from the enclosing
/// stations, then tightened to the vertex itself.
///
/// Returns the insertion index and the station, or `None` when the vertex
/// lies outside the corridor, lands on an existing station (within
/// `tolerance`), or does not actually tighten anything.
pub fn corner_point(
    vertex: SLPoint,
    id: ObstacleId,
    bound: &PathBoundary,
    edge_buffer: f64,
    obstacle_buffer: f64,
    tolerance: f64,
) -> Option<(usize, PathBoundPoint)> {
    let points = bound.points();
    if points.len() < 2 {
        return None;
    }

    let idx = points.partition_point(|p| p.s < vertex.s);
    if idx == 0 || idx >= points.len() {
        return None;
    }
    let (a, b) = (&points[idx - 1], &points[idx]);
    if vertex.s - a.s < tolerance || b.s - vertex.s < tolerance {
        // Close enough to a regular station that the sweep already saw it
        return None;
    }

    let t = (vertex.s - a.s) / (b.s - a.s);
    let lerp = |x: f64, y: f64| x + t * (y - x);
    let mut point = PathBoundPoint {
        s: vertex.s,
        lower: BoundEdge {
            l: lerp(a.lower.l, b.lower.l),
            ..a.lower
        },
        upper: BoundEdge {
            l: lerp(a.upper.l, b.upper.l),
            ..a.upper
        },
        center_l: a
            .center_l
            .zip(b.center_l)
            .map(|(ca, cb)| lerp(ca, cb)),
    };
    let interpolated = point;

    // Tighten towards the vertex on the side the sweep assigned this
    // obstacle to; fall back to the vertex's position about the free
    // interval when the obstacle never constrained a regular station.
    let on_left = if a.upper.id == Some(id) || b.upper.id == Some(id) {
        true
    } else if a.lower.id == Some(id) || b.lower.id == Some(id) {
        false
    } else {
        vertex.l > point.lateral().midpoint()
    };
    if on_left {
        point.update_left_with_buffer(
            vertex.l - obstacle_buffer,
            BoundKind::Obstacle,
            Some(id),
            edge_buffer,
        );
    } else {
        point.update_right_with_buffer(
            vertex.l + obstacle_buffer,
            BoundKind::Obstacle,
            Some(id),
            edge_buffer,
        );
    }

    (point != interpolated).then_some((idx, point))
}

/// Inserts exact-corner constraint stations wherever a polygon vertex falls
/// strictly between two regular stations, so a piecewise-linear path drawn
/// through the remaining stations cannot clip an obstacle corner.
///
/// A corner that leaves no feasible interval blocks the corridor there,
/// trimming it like any other blockage.
pub fn add_corner_bounds(
    polygons: &[SLPolygon],
    bound: &mut PathBoundary,
    edge_buffer: f64,
    obstacle_buffer: f64,
    tolerance: f64,
) {
    for polygon in polygons {
        for &vertex in polygon.points() {
            let Some((idx, point)) = corner_point(
                vertex,
                polygon.id(),
                bound,
                edge_buffer,
                obstacle_buffer,
                tolerance,
            ) else {
                continue;
            };
            if point.is_feasible() {
                bound.insert_point(idx, point);
            } else {
                warn!(
                    "corner of obstacle {:?} closes the path at s = {:.2}",
                    polygon.id(),
                    vertex.s
                );
                bound.trim_at(idx);
                let narrowest = bound.narrowest_width();
                bound.set_blockage(Some(polygon.id()), narrowest);
            }
        }
    }
}

/// Widens the corridor's initial stations just enough to include the
/// vehicle's current lateral position when lane/road bounds alone exclude
/// it, leaving every obstacle-caused constraint in place.
///
/// Fails when inclusion would require crossing an obstacle bound: that is
/// an irreducible infeasibility the caller must handle.
pub fn relax_ego_lateral_boundary(
    bound: &mut PathBoundary,
    init: &SLState,
    relax_range: f64,
) -> Result<()> {
    let adc_l = init.l[0];
    let end_s = init.s[0] + relax_range;

    for point in bound.points_mut() {
        if point.s > end_s {
            break;
        }
        if adc_l > point.upper.l {
            if point.upper.kind == BoundKind::Obstacle {
                return Err(CorridorError::EgoOutsideObstacleBound { s: point.s });
            }
            point.upper = BoundEdge {
                l: adc_l,
                kind: BoundKind::Adc,
                id: None,
            };
        }
        if adc_l < point.lower.l {
            if point.lower.kind == BoundKind::Obstacle {
                return Err(CorridorError::EgoOutsideObstacleBound { s: point.s });
            }
            point.lower = BoundEdge {
                l: adc_l,
                kind: BoundKind::Adc,
                id: None,
            };
        }
    }
    Ok(())
}
