use crate::math::Point2d;
use crate::ref_line::{RefLine, SLPoint};
use crate::util::Interval;
use crate::{ObstacleId, ObstacleSet};
use itertools::Itertools;

/// A perceived object the corridor must not contain.
///
/// The footprint is the world-space convex outline of the object. Whether
/// the obstacle takes part in corridor construction is decided by
/// [`Obstacle::is_path_decider_scope`].
#[derive(Clone, Debug)]
pub struct Obstacle {
    /// The corners of the obstacle's footprint in world space.
    pub footprint: Vec<Point2d>,
    /// The obstacle's speed in m/s.
    pub speed: f64,
    /// Set by an upstream decision to exclude this obstacle from path
    /// shaping (e.g. an object that will be handled longitudinally).
    pub ignorable: bool,
}

impl Obstacle {
    /// Creates a static obstacle from its footprint corners.
    pub fn new(footprint: Vec<Point2d>) -> Self {
        Self {
            footprint,
            speed: 0.0,
            ignorable: false,
        }
    }

    /// Whether the obstacle moves slowly enough to be treated as static.
    pub fn is_static(&self, speed_threshold: f64) -> bool {
        self.speed.abs() <= speed_threshold
    }

    /// Whether the obstacle should be considered when shaping the path:
    /// static and not marked ignorable. The longitudinal-range check
    /// happens after SL projection, in [`sl_polygons`].
    pub fn is_path_decider_scope(&self, speed_threshold: f64) -> bool {
        self.is_static(speed_threshold) && !self.ignorable
    }
}

/// An obstacle's footprint projected into the SL frame: a vertex ring with
/// its longitudinal extent, supporting lateral-extent queries at any `s`
/// inside that extent.
#[derive(Clone, Debug)]
pub struct SLPolygon {
    id: ObstacleId,
    points: Vec<SLPoint>,
    s_range: Interval<f64>,
    l_range: Interval<f64>,
}

impl SLPolygon {
    /// Creates a polygon from a projected vertex ring.
    /// Returns `None` for an empty ring.
    pub fn new(id: ObstacleId, points: Vec<SLPoint>) -> Option<Self> {
        let (s_min, s_max) = points.iter().map(|p| p.s).minmax().into_option()?;
        let (l_min, l_max) = points.iter().map(|p| p.l).minmax().into_option()?;
        Some(Self {
            id,
            points,
            s_range: Interval::new(s_min, s_max),
            l_range: Interval::new(l_min, l_max),
        })
    }

    /// The obstacle this polygon was projected from.
    pub fn id(&self) -> ObstacleId {
        self.id
    }

    /// The projected vertex ring.
    pub fn points(&self) -> &[SLPoint] {
        &self.points
    }

    /// The longitudinal extent `[s_min, s_max]`.
    pub fn s_range(&self) -> Interval<f64> {
        self.s_range
    }

    /// The overall lateral extent over the whole longitudinal range.
    pub fn l_range(&self) -> Interval<f64> {
        self.l_range
    }

    /// The polygon's lateral extent at longitudinal position `s`,
    /// interpolated along the boundary edges; `None` outside `[s_min, s_max]`.
    pub fn lateral_extent_at(&self, s: f64) -> Option<Interval<f64>> {
        const EPS: f64 = 1e-9;

        if !self.s_range.contains(s) {
            return None;
        }

        let mut min_l = f64::INFINITY;
        let mut max_l = f64::NEG_INFINITY;
        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            if (a.s - s) * (b.s - s) > 0.0 {
                // Edge lies entirely on one side of `s`
                continue;
            }
            if (b.s - a.s).abs() < EPS {
                min_l = f64::min(min_l, f64::min(a.l, b.l));
                max_l = f64::max(max_l, f64::max(a.l, b.l));
            } else {
                let l = a.l + (s - a.s) / (b.s - a.s) * (b.l - a.l);
                min_l = f64::min(min_l, l);
                max_l = f64::max(max_l, l);
            }
        }

        (min_l <= max_l).then(|| Interval::new(min_l, max_l))
    }
}

/// Projects every in-scope static obstacle into the SL frame, producing one
/// [SLPolygon] per obstacle in the obstacle map's insertion order.
///
/// Obstacles that are non-static, ignorable, unprojectable, or outside the
/// corridor's longitudinal range are dropped.
pub fn sl_polygons(
    obstacles: &ObstacleSet,
    ref_line: &RefLine,
    s_range: Interval<f64>,
    static_speed_threshold: f64,
) -> Vec<SLPolygon> {
    obstacles
        .iter()
        .filter(|(_, obstacle)| obstacle.is_path_decider_scope(static_speed_threshold))
        .filter_map(|(id, obstacle)| {
            let points = obstacle
                .footprint
                .iter()
                .filter_map(|&corner| ref_line.project(corner))
                .collect::<Vec<_>>();
            SLPolygon::new(id, points)
        })
        .filter(|polygon| polygon.s_range().overlaps(&s_range))
        .collect()
}
