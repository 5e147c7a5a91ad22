use crate::math::{
    equidistant_points_along_curve, project_point_onto_curve, rot90, ParametricCurve2d, Point2d,
    QuadraticBezier2d, Vector2d,
};
use crate::util::Interval;
use cgmath::prelude::*;

/// A position in the SL (Frenet) frame: `s` is the arc length along the
/// reference line, `l` the signed lateral offset from it (positive left).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SLPoint {
    pub s: f64,
    pub l: f64,
}

/// The reference line: an arc-length parameterised curve that the corridor's
/// longitudinal axis follows.
///
/// Built once per planning cycle from whatever parametric curve the
/// reference-line provider produced, then queried read-only.
#[derive(Clone)]
pub struct RefLine {
    scale: f64,
    length: f64,
    segments: Vec<QuadraticBezier2d>,
}

/// The result of sampling a [RefLine].
pub struct RefSample {
    /// The point on the reference line.
    pub pos: Point2d,
    /// The tangent unit vector of the reference line.
    pub tan: Vector2d,
}

impl RefSample {
    /// The point at the given lateral offset from the reference line.
    pub fn lat_offset(&self, l: f64) -> Point2d {
        self.pos + l * rot90(self.tan)
    }
}

impl RefLine {
    /// Creates a new [RefLine] from the given parametric curve,
    /// with the default step size.
    pub fn new(curve: &impl ParametricCurve2d) -> Self {
        const REF_SEGMENT_LEN: f64 = 0.5;
        Self::with_step(curve, REF_SEGMENT_LEN)
    }

    /// Creates a new [RefLine] from the given parametric curve,
    /// with the given step size.
    pub fn with_step(curve: &impl ParametricCurve2d, step: f64) -> Self {
        let (mut points, length) = equidistant_points_along_curve(curve, step);

        // Ensure number of points are odd so they can be evenly divided among segments
        if points.len() % 2 == 0 {
            let p1 = points[points.len() - 2];
            let p2 = points[points.len() - 1];
            let p3 = Point2d::from_vec(Vector2d::lerp(p1.to_vec(), p2.to_vec(), 2.0));
            points.push(p3);
        }

        let segments = points
            .windows(3)
            .step_by(2)
            .map(|points| {
                let [p1, p2, p3]: [_; 3] = points.try_into().unwrap();
                let mid = Vector2d::lerp(p1.to_vec(), p3.to_vec(), 0.5);
                let control = Point2d::from_vec(Vector2d::lerp(p2.to_vec(), mid, -1.0));
                QuadraticBezier2d::new(&[p1, control, p3])
            })
            .collect::<Vec<_>>();

        Self {
            scale: 0.5 / step,
            length,
            segments,
        }
    }

    /// The length of the reference line in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Samples the reference line at arc length `s`.
    pub fn sample_centre(&self, s: f64) -> RefSample {
        let (segment, t) = self.segment_at(s);
        let pos = segment.sample(t);
        let tan = segment.sample_dt(t).normalize();
        RefSample { pos, tan }
    }

    /// Projects a Cartesian point into the SL frame of the reference line.
    ///
    /// Returns `None` when the projection diverges or lands outside the
    /// reference line's arc-length range.
    pub fn project(&self, point: Point2d) -> Option<SLPoint> {
        let s = project_point_onto_curve(self, point, 0.001, None)?;
        if !self.bounds().contains(s) {
            return None;
        }
        let sample = self.sample_centre(s);
        let l = (point - sample.pos).dot(rot90(sample.tan));
        Some(SLPoint { s, l })
    }

    fn segment_at(&self, s: f64) -> (&QuadraticBezier2d, f64) {
        let s = s * self.scale;

        let idx = usize::min(s as u32 as _, self.segments.len() - 1);
        let segment = unsafe {
            // SAFETY: The way `idx` is calculated above ensures its within bounds
            self.segments.get_unchecked(idx)
        };

        let t = s - (idx as f64);

        (segment, t)
    }
}

impl ParametricCurve2d for RefLine {
    fn sample(&self, t: f64) -> Point2d {
        let (segment, t) = self.segment_at(t);
        segment.sample(t)
    }

    fn bounds(&self) -> Interval<f64> {
        Interval::new(0.0, self.length())
    }

    fn sample_dt(&self, t: f64) -> Vector2d {
        let (segment, t) = self.segment_at(t);
        segment.sample_dt(t)
    }

    fn sample_dt2(&self, t: f64) -> Vector2d {
        let (segment, t) = self.segment_at(t);
        segment.sample_dt2(t)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::LineSegment2d;
    use assert_approx_eq::assert_approx_eq;

    fn straight_ref_line(len: f64) -> RefLine {
        RefLine::new(&LineSegment2d::from_ends(
            Point2d::new(0.0, 0.0),
            Point2d::new(len, 0.0),
        ))
    }

    #[test]
    fn curve_is_arclength_parameterised() {
        let curve = QuadraticBezier2d::new(&[
            Point2d::new(10.0, 10.0),
            Point2d::new(60.0, 40.0),
            Point2d::new(100.0, 45.0),
        ]);
        let ref_line = RefLine::new(&curve);

        let ts = (0..100)
            .map(|i| i as f64 * 0.01 * ref_line.length())
            .collect::<Vec<_>>();
        for ts in ts.windows(2) {
            let p1 = ref_line.sample_centre(ts[0]).pos;
            let p2 = ref_line.sample_centre(ts[1]).pos;
            assert_approx_eq::assert_approx_eq!((p2 - p1).magnitude(), ts[1] - ts[0], 0.01);
        }
    }

    #[test]
    fn project_left_is_positive() {
        let ref_line = straight_ref_line(100.0);
        let sl = ref_line.project(Point2d::new(30.0, 2.0)).unwrap();
        assert_approx_eq!(sl.s, 30.0, 0.01);
        assert_approx_eq!(sl.l, 2.0, 0.01);

        let sl = ref_line.project(Point2d::new(30.0, -1.5)).unwrap();
        assert_approx_eq!(sl.l, -1.5, 0.01);
    }

    #[test]
    fn project_outside_range_fails() {
        let ref_line = straight_ref_line(100.0);
        assert!(ref_line.project(Point2d::new(-20.0, 0.0)).is_none());
        assert!(ref_line.project(Point2d::new(130.0, 0.0)).is_none());
    }
}
