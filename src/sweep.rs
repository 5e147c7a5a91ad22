use crate::boundary::{BoundKind, PathBoundary};
use crate::decider::SLState;
use crate::lane::Side;
use crate::obstacle::SLPolygon;
use crate::util::Interval;
use crate::ObstacleId;
use log::warn;
use smallvec::SmallVec;

/// One sweep event: an obstacle polygon entering or leaving the corridor's
/// longitudinal axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleEdge {
    /// True at the polygon's minimum `s`, false at its maximum.
    pub is_start: bool,
    /// Longitudinal position of the event in m.
    pub s: f64,
    /// The polygon's overall lateral extent.
    pub lat: Interval<f64>,
    pub id: ObstacleId,
}

/// The result of carving obstacles out of a corridor.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SweepOutcome {
    /// Index of the first blocked station, before trimming.
    pub blocked_idx: Option<usize>,
    /// The obstacle reported as the proximate cause of the blockage.
    pub blocking_id: Option<ObstacleId>,
    /// The narrowest corridor width observed across all swept stations.
    pub narrowest_width: Option<f64>,
}

/// An obstacle currently overlapping the sweep position, along with the
/// side of the corridor it was assigned to when it became active.
#[derive(Clone, Copy)]
struct ActiveObstacle {
    poly_idx: usize,
    id: ObstacleId,
    start_s: f64,
    side: Side,
}

/// Emits two sorted sweep events per polygon: ascending by `s`, start
/// edges before end edges at equal `s`, and ties among edges of the same
/// kind broken by obstacle id. Sorting makes the sweep independent of the
/// obstacle set's iteration order.
pub fn sort_obstacles_for_sweep_line(polygons: &[SLPolygon]) -> Vec<ObstacleEdge> {
    let mut edges = Vec::with_capacity(2 * polygons.len());
    for polygon in polygons {
        edges.push(ObstacleEdge {
            is_start: true,
            s: polygon.s_range().min,
            lat: polygon.l_range(),
            id: polygon.id(),
        });
        edges.push(ObstacleEdge {
            is_start: false,
            s: polygon.s_range().max,
            lat: polygon.l_range(),
            id: polygon.id(),
        });
    }
    edges.sort_by(|a, b| {
        a.s.partial_cmp(&b.s)
            .unwrap()
            .then_with(|| b.is_start.cmp(&a.is_start))
            .then_with(|| a.id.cmp(&b.id))
    });
    edges
}

/// Among the obstacles currently blocking the corridor (id mapped to that
/// obstacle's start `s`), picks the one furthest along the corridor as the
/// proximate cause of the stop. Returns `None` for an empty set.
pub fn find_farthest_blocking_id(obs_id_to_start_s: &[(ObstacleId, f64)]) -> Option<ObstacleId> {
    obs_id_to_start_s
        .iter()
        .max_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap()
                .then_with(|| a.0.cmp(&b.0))
        })
        .map(|(id, _)| *id)
}

/// Carves every polygon out of the corridor with an ordered sweep over the
/// stations. See [update_boundary_by_sl_polygons] for the variant that also
/// maintains the per-station centre line.
pub fn boundary_from_static_obstacles(
    bound: &mut PathBoundary,
    polygons: &[SLPolygon],
    init: &SLState,
    edge_buffer: f64,
    obstacle_buffer: f64,
) -> SweepOutcome {
    sweep(bound, polygons, init, edge_buffer, obstacle_buffer, false)
}

/// Like [boundary_from_static_obstacles], but additionally records, per
/// station, the midpoint of the remaining free interval for use by
/// relaxation and downstream centering.
pub fn update_boundary_by_sl_polygons(
    bound: &mut PathBoundary,
    polygons: &[SLPolygon],
    init: &SLState,
    edge_buffer: f64,
    obstacle_buffer: f64,
) -> SweepOutcome {
    sweep(bound, polygons, init, edge_buffer, obstacle_buffer, true)
}

fn sweep(
    bound: &mut PathBoundary,
    polygons: &[SLPolygon],
    init: &SLState,
    edge_buffer: f64,
    obstacle_buffer: f64,
    write_center: bool,
) -> SweepOutcome {
    let edges = sort_obstacles_for_sweep_line(polygons);

    // The active set lives only for this call; each cycle sweeps from a
    // clean slate.
    let mut active: SmallVec<[ActiveObstacle; 8]> = SmallVec::new();
    let mut edge_idx = 0;
    let mut center_l = init.l[0];
    let mut narrowest = f64::INFINITY;
    let mut outcome = SweepOutcome::default();

    for idx in 0..bound.len() {
        let s = bound.points()[idx].s;

        // Advance the event queue. Start edges are due at `edge.s <= s`,
        // end edges only once `edge.s < s`: an obstacle beginning exactly
        // at this station constrains it, and one ending exactly here still
        // does.
        while edge_idx < edges.len() {
            let edge = &edges[edge_idx];
            let due = if edge.is_start { edge.s <= s } else { edge.s < s };
            if !due {
                break;
            }
            if edge.is_start {
                if let Some(poly_idx) = polygons.iter().position(|p| p.id() == edge.id) {
                    // The side the obstacle sits on, fixed for its whole
                    // extent so carving never flips direction mid-obstacle.
                    let side = if edge.lat.midpoint() > center_l {
                        Side::Left
                    } else {
                        Side::Right
                    };
                    active.push(ActiveObstacle {
                        poly_idx,
                        id: edge.id,
                        start_s: edge.s,
                        side,
                    });
                }
            } else {
                active.retain(|a| a.id != edge.id);
            }
            edge_idx += 1;
        }

        // Tighten the station against every active polygon, tracking which
        // obstacles contributed in case this station turns out blocked.
        let point = &mut bound.points_mut()[idx];
        let mut feasible = true;
        let mut contributors: SmallVec<[(ObstacleId, f64); 8]> = SmallVec::new();
        for a in active.iter() {
            let Some(lat) = polygons[a.poly_idx].lateral_extent_at(s) else {
                continue;
            };
            let lat = lat.expand(obstacle_buffer);
            contributors.push((a.id, a.start_s));
            feasible &= match a.side {
                Side::Left => point.update_left_with_buffer(
                    lat.min,
                    BoundKind::Obstacle,
                    Some(a.id),
                    edge_buffer,
                ),
                Side::Right => point.update_right_with_buffer(
                    lat.max,
                    BoundKind::Obstacle,
                    Some(a.id),
                    edge_buffer,
                ),
            };
        }

        narrowest = f64::min(narrowest, point.width());

        if !feasible {
            outcome.blocked_idx = Some(idx);
            outcome.blocking_id = find_farthest_blocking_id(&contributors);
            warn!(
                "path blocked at s = {:.2} (station {}), {} obstacle(s) active",
                s,
                idx,
                contributors.len()
            );
            break;
        }

        if point.width().is_finite() {
            center_l = point.lateral().midpoint();
        }
        if write_center {
            point.center_l = Some(center_l);
        }
    }

    if let Some(idx) = outcome.blocked_idx {
        bound.trim_at(idx);
    }
    outcome.narrowest_width = narrowest.is_finite().then_some(narrowest);
    outcome
}
