use crate::boundary::{BoundEdge, BoundKind, PathBoundary};
use crate::error::{CorridorError, Result};
use crate::lane::{LaneBorrow, LaneModel, LaneWidth, Side};
use crate::math::{Point2d, Vector2d};
use crate::obstacle::{self, SLPolygon};
use crate::ref_line::RefLine;
use crate::refine::{add_corner_bounds, relax_ego_lateral_boundary};
use crate::sweep::update_boundary_by_sl_polygons;
use crate::util::Interval;
use crate::ObstacleSet;
use cgmath::prelude::*;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric parameters of corridor construction. All values are passed in
/// explicitly; nothing is read from the environment.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CorridorConfig {
    /// Longitudinal station spacing in m.
    pub delta_s: f64,
    /// Corridor length ahead of the vehicle in m.
    pub horizon: f64,
    /// Extra room kept beside the vehicle when lane bounds are widened to
    /// include it, in m.
    pub adc_buffer: f64,
    /// Extra room used by the boundary extension stage, in m.
    pub adc_extend_buffer: f64,
    /// Lateral clearance kept to obstacle edges, in m.
    pub obstacle_lat_buffer: f64,
    /// Distance below which a corner point merges into an existing
    /// station, in m.
    pub corner_tolerance: f64,
    /// Obstacles slower than this are treated as static, in m/s.
    pub static_speed_threshold: f64,
    /// Lane half-width assumed where lane geometry is missing, in m.
    pub default_lane_half_width: f64,
    /// Time horizon sizing the initial region where bounds follow the
    /// vehicle rather than the lane, in s.
    pub adc_time_buffer: f64,
    /// Minimum length of that initial region, in m.
    pub min_extend_length: f64,
    /// Whether lane bounds are widened to include the vehicle at all.
    pub is_extend_adc: bool,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            delta_s: 0.5,
            horizon: 100.0,
            adc_buffer: 0.5,
            adc_extend_buffer: 0.5,
            obstacle_lat_buffer: 0.4,
            corner_tolerance: 0.01,
            static_speed_threshold: 0.5,
            default_lane_half_width: 1.75,
            adc_time_buffer: 2.0,
            min_extend_length: 5.0,
            is_extend_adc: true,
        }
    }
}

/// The geometry of the vehicle being planned for.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleParams {
    /// The vehicle width in m.
    pub width: f64,
    /// Distance from the rear axle to the front axle in m.
    pub wheelbase: f64,
}

impl VehicleParams {
    /// Half the vehicle's width in m.
    pub fn half_width(&self) -> f64 {
        0.5 * self.width
    }

    /// The distance between the vehicle's centre and its lateral edge.
    /// Lateral bounds are stated for the vehicle centre, so every bound
    /// update shrinks by this much.
    pub fn edge_buffer(&self) -> f64 {
        self.half_width()
    }
}

/// The vehicle's kinematic state in the SL frame at planning start:
/// the longitudinal triple `(s, ṡ, s̈)` and the lateral triple
/// `(l, l′, l″)`, lateral derivatives taken with respect to `s`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SLState {
    pub s: [f64; 3],
    pub l: [f64; 3],
}

/// The planning-start pose handed in by the upstream planner.
#[derive(Clone, Copy, Debug)]
pub struct PlanningStartPoint {
    /// Position in world space.
    pub pos: Point2d,
    /// Unit heading vector.
    pub dir: Vector2d,
    /// Speed in m/s.
    pub vel: f64,
    /// Acceleration in m/s^2.
    pub acc: f64,
}

/// Translates a pose given at the rear-axle centre to the front-axle
/// centre: a rigid transform by the wheelbase along the heading. Lateral
/// bounds are evaluated against the vehicle's leading point, so corridor
/// construction always works from the front axle.
pub fn infer_front_axle_center_from_rear_axle(
    point: &PlanningStartPoint,
    wheelbase: f64,
) -> PlanningStartPoint {
    PlanningStartPoint {
        pos: point.pos + wheelbase * point.dir,
        ..*point
    }
}

/// Builds the lateral drivable corridor for one planning cycle.
///
/// Holds shared references to the cycle's read-only inputs; the produced
/// [PathBoundary] is owned by the caller.
pub struct CorridorBuilder<'a, L: LaneModel> {
    ref_line: &'a RefLine,
    lanes: &'a L,
    obstacles: &'a ObstacleSet,
    vehicle: VehicleParams,
    config: CorridorConfig,
}

impl<'a, L: LaneModel> CorridorBuilder<'a, L> {
    pub fn new(
        ref_line: &'a RefLine,
        lanes: &'a L,
        obstacles: &'a ObstacleSet,
        vehicle: VehicleParams,
        config: CorridorConfig,
    ) -> Self {
        Self {
            ref_line,
            lanes,
            obstacles,
            vehicle,
            config,
        }
    }

    /// Projects the planning-start pose onto the reference line and derives
    /// the initial SL state.
    ///
    /// When `at_rear_axle` is set the pose is first translated to the
    /// front-axle centre.
    pub fn start_state(
        &self,
        start: &PlanningStartPoint,
        at_rear_axle: bool,
    ) -> Result<SLState> {
        let start = if at_rear_axle {
            infer_front_axle_center_from_rear_axle(start, self.vehicle.wheelbase)
        } else {
            *start
        };

        let sl = self
            .ref_line
            .project(start.pos)
            .ok_or(CorridorError::UnprojectablePose)?;
        let tan = self.ref_line.sample_centre(sl.s).tan;

        // Split speed and acceleration between the s and l axes using the
        // heading offset to the reference-line tangent.
        let cos = start.dir.dot(tan);
        let sin = tan.perp_dot(start.dir);
        if cos <= 1e-6 {
            // Heading perpendicular to or against the reference line
            return Err(CorridorError::UnprojectablePose);
        }

        Ok(SLState {
            s: [sl.s, start.vel * cos, start.acc * cos],
            l: [sl.l, sin / cos, 0.0],
        })
    }

    /// Lane half-widths at `s`, falling back to the configured default
    /// where lane geometry is missing.
    pub fn adc_lane_width(&self, s: f64) -> LaneWidth {
        self.lanes.lane_width_at(s).unwrap_or(LaneWidth::new(
            self.config.default_lane_half_width,
            self.config.default_lane_half_width,
        ))
    }

    /// Length of the initial region where bounds track the vehicle itself:
    /// the distance covered in the configured time buffer, at least the
    /// configured minimum.
    fn extend_length(&self, init: &SLState) -> f64 {
        f64::max(self.config.min_extend_length, init.s[1] * self.config.adc_time_buffer)
    }

    /// Sets every station's bounds to the current lane's edges.
    /// Fails where lane geometry is unavailable.
    pub fn boundary_from_self_lane(&self, bound: &mut PathBoundary) -> Result<()> {
        self.boundary_from_widths(bound, BoundKind::Lane, |s| {
            self.lanes
                .lane_width_at(s)
                .ok_or(CorridorError::MissingLaneGeometry { s })
        })
    }

    /// Sets every station's bounds to the road's edges, the wider fallback
    /// used during lane changes. Fails where road geometry is unavailable.
    pub fn boundary_from_road(&self, bound: &mut PathBoundary) -> Result<()> {
        self.boundary_from_widths(bound, BoundKind::Road, |s| {
            self.lanes
                .road_width_at(s)
                .ok_or(CorridorError::MissingRoadGeometry { s })
        })
    }

    fn boundary_from_widths(
        &self,
        bound: &mut PathBoundary,
        kind: BoundKind,
        width_at: impl Fn(f64) -> Result<LaneWidth>,
    ) -> Result<()> {
        let buffer = self.vehicle.edge_buffer();
        let mut blocked_idx = None;
        for (idx, point) in bound.points_mut().iter_mut().enumerate() {
            let width = width_at(point.s)?;
            if !point.update_with_buffer(width.left, -width.right, kind, kind, None, None, buffer) {
                blocked_idx = Some(idx);
                break;
            }
        }
        if let Some(idx) = blocked_idx {
            bound.trim_at(idx);
        }
        Ok(())
    }

    /// The lane-policy stage: bounds from the self lane plus any borrowed
    /// neighbour, widened around the vehicle's current position where
    /// needed so the corridor starts out feasible.
    ///
    /// In fallback lane-change mode the vehicle-centred widening applies at
    /// every station rather than only the initial region. Returns the
    /// diagnostic label recording which lane type(s) contributed.
    pub fn boundary_from_lanes_and_adc(
        &self,
        init: &SLState,
        borrow: LaneBorrow,
        is_extend_adc: bool,
        adc_buffer: f64,
        is_fallback_lane_change: bool,
        bound: &mut PathBoundary,
    ) -> Result<String> {
        let buffer = self.vehicle.edge_buffer();
        let fallback_width = self.adc_lane_width(init.s[0]);
        let extend_end_s = init.s[0] + self.extend_length(init);
        let mut borrowed = false;
        let mut blocked_idx = None;

        for (idx, point) in bound.points_mut().iter_mut().enumerate() {
            let width = self.lanes.lane_width_at(point.s).unwrap_or(fallback_width);
            let mut left = width.left;
            let mut right = width.right;
            match borrow.side() {
                Some(Side::Left) => {
                    if let Some(w) = self.lanes.neighbor_width_at(point.s, Side::Left) {
                        left += w;
                        borrowed = true;
                    }
                }
                Some(Side::Right) => {
                    if let Some(w) = self.lanes.neighbor_width_at(point.s, Side::Right) {
                        right += w;
                        borrowed = true;
                    }
                }
                None => {}
            }

            let mut left_bound = left;
            let mut right_bound = -right;
            let mut left_kind = BoundKind::Lane;
            let mut right_kind = BoundKind::Lane;

            // Keep the vehicle's own footprint inside the corridor where it
            // cannot yet have converged back to the lane
            if is_extend_adc && (is_fallback_lane_change || point.s <= extend_end_s) {
                let adc_left = init.l[0] + buffer + adc_buffer;
                if adc_left > left_bound {
                    left_bound = adc_left;
                    left_kind = BoundKind::Adc;
                }
                let adc_right = init.l[0] - buffer - adc_buffer;
                if adc_right < right_bound {
                    right_bound = adc_right;
                    right_kind = BoundKind::Adc;
                }
            }

            if !point.update_with_buffer(
                left_bound,
                right_bound,
                left_kind,
                right_kind,
                None,
                None,
                buffer,
            ) {
                blocked_idx = Some(idx);
                break;
            }
        }
        if let Some(idx) = blocked_idx {
            bound.trim_at(idx);
        }

        let label = match (borrow, borrowed) {
            (LaneBorrow::Left, true) => "self/left",
            (LaneBorrow::Right, true) => "self/right",
            _ => "self",
        };
        Ok(label.to_string())
    }

    /// Widens the initial stations so the vehicle's half-width plus the
    /// extension buffer is inside the corridor. Stations beyond the
    /// extension region are untouched.
    pub fn extend_boundary_by_adc(
        &self,
        init: &SLState,
        extend_buffer: f64,
        bound: &mut PathBoundary,
    ) {
        let end_s = init.s[0] + self.extend_length(init);
        let target_upper = init.l[0] + extend_buffer;
        let target_lower = init.l[0] - extend_buffer;

        for point in bound.points_mut() {
            if point.s > end_s {
                break;
            }
            if point.upper.l < target_upper {
                point.upper = BoundEdge {
                    l: target_upper,
                    kind: BoundKind::Adc,
                    id: None,
                };
            }
            if point.lower.l > target_lower {
                point.lower = BoundEdge {
                    l: target_lower,
                    kind: BoundKind::Adc,
                    id: None,
                };
            }
        }
    }

    /// Remaps station `s` values measured along the lane centre onto
    /// reference-line arc length. Obstacle geometry and the optimizer both
    /// work in the reference-line frame, which diverges from lane-centre
    /// arc length on curves.
    pub fn convert_boundary_s_axis(&self, bound: &mut PathBoundary) {
        for point in bound.points_mut() {
            point.s = self.lanes.lane_center_s_to_ref_s(point.s);
        }
    }

    /// Projects every in-scope static obstacle into the SL frame.
    pub fn sl_polygons(&self, init: &SLState) -> Vec<SLPolygon> {
        obstacle::sl_polygons(
            self.obstacles,
            self.ref_line,
            Interval::new(init.s[0], init.s[0] + self.config.horizon),
            self.config.static_speed_threshold,
        )
    }

    /// Runs the whole pipeline and returns the corridor: lane policy,
    /// vehicle extension, s-axis remap, obstacle sweep, corner
    /// augmentation, and (when the initial stations exclude the vehicle)
    /// ego relaxation.
    ///
    /// A blocked corridor is a normal result, trimmed and carrying the
    /// blocking obstacle's id; an `Err` means construction failed outright.
    pub fn build(
        &self,
        init: &SLState,
        borrow: LaneBorrow,
        is_fallback_lane_change: bool,
    ) -> Result<PathBoundary> {
        let mut bound = PathBoundary::init(
            init.s[0],
            self.config.delta_s,
            self.ref_line.length(),
            self.config.horizon,
        )?;

        let label = self.boundary_from_lanes_and_adc(
            init,
            borrow,
            self.config.is_extend_adc,
            self.config.adc_buffer,
            is_fallback_lane_change,
            &mut bound,
        )?;
        bound.set_label(label);
        if self.config.is_extend_adc {
            self.extend_boundary_by_adc(init, self.config.adc_extend_buffer, &mut bound);
        }
        self.convert_boundary_s_axis(&mut bound);

        let polygons = self.sl_polygons(init);
        debug!(
            "corridor [{}]: {} station(s), {} obstacle polygon(s)",
            bound.label(),
            bound.len(),
            polygons.len()
        );

        let outcome = update_boundary_by_sl_polygons(
            &mut bound,
            &polygons,
            init,
            self.vehicle.edge_buffer(),
            self.config.obstacle_lat_buffer,
        );
        bound.set_blockage(outcome.blocking_id, outcome.narrowest_width);

        add_corner_bounds(
            &polygons,
            &mut bound,
            self.vehicle.edge_buffer(),
            self.config.obstacle_lat_buffer,
            self.config.corner_tolerance,
        );

        let excludes_adc = bound
            .points()
            .first()
            .map_or(false, |p| !p.lateral().contains(init.l[0]));
        if excludes_adc {
            relax_ego_lateral_boundary(&mut bound, init, self.extend_length(init))?;
        }

        #[cfg(feature = "debug")]
        crate::debug::debug_corridor("path_boundary", &bound);

        Ok(bound)
    }

    /// Maps a Cartesian point to a station and checks it against the
    /// corridor's lateral bounds, interpolating between stations.
    ///
    /// Returns the index of the enclosing station on success, `None` when
    /// the point is outside the horizon or the lateral bound.
    pub fn point_within_path_bound(
        &self,
        point: Point2d,
        bound: &PathBoundary,
    ) -> Option<usize> {
        let sl = self.ref_line.project(point)?;
        let points = bound.points();
        let idx = points.partition_point(|p| p.s <= sl.s);
        if idx == 0 {
            return None;
        }

        let a = &points[idx - 1];
        let lat = if idx == points.len() {
            if sl.s > a.s {
                return None;
            }
            a.lateral()
        } else {
            let b = &points[idx];
            let t = (sl.s - a.s) / (b.s - a.s);
            Interval::new(
                a.lower.l + t * (b.lower.l - a.lower.l),
                a.upper.l + t * (b.upper.l - a.upper.l),
            )
        };
        lat.contains(sl.l).then_some(idx - 1)
    }
}
