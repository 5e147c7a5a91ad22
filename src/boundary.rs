use crate::error::{CorridorError, Result};
use crate::util::Interval;
use crate::ObstacleId;

/// The source of a lateral bound at a station.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoundKind {
    Lane,
    Road,
    Obstacle,
    Adc,
    #[default]
    Unconstrained,
}

/// One side of a station's lateral bound: the bound value, the kind of
/// geometry that produced it, and the contributing obstacle if any.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundEdge {
    pub l: f64,
    pub kind: BoundKind,
    pub id: Option<ObstacleId>,
}

impl BoundEdge {
    fn unconstrained(l: f64) -> Self {
        Self {
            l,
            kind: BoundKind::Unconstrained,
            id: None,
        }
    }
}

/// A single station of the corridor: the lateral interval
/// `[lower.l, upper.l]` the optimizer may use at longitudinal position `s`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathBoundPoint {
    /// Arc length along the reference line in m.
    pub s: f64,
    /// The right bound (minimum lateral offset).
    pub lower: BoundEdge,
    /// The left bound (maximum lateral offset).
    pub upper: BoundEdge,
    /// Midpoint of the free interval, maintained by the sweep when a
    /// running centre-line estimate is requested.
    pub center_l: Option<f64>,
}

impl PathBoundPoint {
    /// Creates a station with infinite bounds.
    pub fn unconstrained(s: f64) -> Self {
        Self {
            s,
            lower: BoundEdge::unconstrained(f64::NEG_INFINITY),
            upper: BoundEdge::unconstrained(f64::INFINITY),
            center_l: None,
        }
    }

    /// Whether a feasible lateral interval remains at this station.
    pub fn is_feasible(&self) -> bool {
        self.lower.l <= self.upper.l
    }

    /// The width of the remaining lateral interval in m.
    pub fn width(&self) -> f64 {
        self.upper.l - self.lower.l
    }

    /// The remaining lateral interval.
    pub fn lateral(&self) -> Interval<f64> {
        Interval::new(self.lower.l, self.upper.l)
    }

    /// Tightens the left bound to `left_bound - buffer` and stamps its
    /// source, if that is tighter than the current bound.
    ///
    /// Returns whether the station remains feasible. This is the single
    /// feasibility primitive every construction stage goes through, so
    /// "blocked" means the same thing regardless of which stage caused it.
    pub fn update_left_with_buffer(
        &mut self,
        left_bound: f64,
        kind: BoundKind,
        id: Option<ObstacleId>,
        buffer: f64,
    ) -> bool {
        let new_upper = left_bound - buffer;
        if new_upper < self.upper.l {
            self.upper = BoundEdge {
                l: new_upper,
                kind,
                id,
            };
        }
        self.is_feasible()
    }

    /// Tightens the right bound to `right_bound + buffer` and stamps its
    /// source, if that is tighter than the current bound.
    /// Returns whether the station remains feasible.
    pub fn update_right_with_buffer(
        &mut self,
        right_bound: f64,
        kind: BoundKind,
        id: Option<ObstacleId>,
        buffer: f64,
    ) -> bool {
        let new_lower = right_bound + buffer;
        if new_lower > self.lower.l {
            self.lower = BoundEdge {
                l: new_lower,
                kind,
                id,
            };
        }
        self.is_feasible()
    }

    /// Tightens both bounds at once. Returns whether the station remains
    /// feasible.
    #[allow(clippy::too_many_arguments)]
    pub fn update_with_buffer(
        &mut self,
        left_bound: f64,
        right_bound: f64,
        left_kind: BoundKind,
        right_kind: BoundKind,
        left_id: Option<ObstacleId>,
        right_id: Option<ObstacleId>,
        buffer: f64,
    ) -> bool {
        self.update_left_with_buffer(left_bound, left_kind, left_id, buffer);
        self.update_right_with_buffer(right_bound, right_kind, right_id, buffer)
    }
}

/// The lateral drivable corridor along the reference line.
///
/// Stations are kept in strictly increasing `s` order, and every retained
/// station is feasible: once a station becomes infeasible the corridor is
/// trimmed there. Exclusively owned and mutated by one planning cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathBoundary {
    points: Vec<PathBoundPoint>,
    start_s: f64,
    delta_s: f64,
    start_index: usize,
    label: String,
    blocking_id: Option<ObstacleId>,
    narrowest_width: Option<f64>,
}

impl PathBoundary {
    /// Builds the initial unconstrained corridor: stations from `start_s`
    /// to `start_s + horizon` at `delta_s` resolution, clipped to the end
    /// of the reference line.
    ///
    /// Fails when the reference line cannot fit at least two stations
    /// past `start_s`.
    pub fn init(start_s: f64, delta_s: f64, ref_length: f64, horizon: f64) -> Result<Self> {
        let available = ref_length - start_s;
        let length = f64::min(horizon, available);
        if length < delta_s {
            return Err(CorridorError::ReferenceLineTooShort {
                available,
                required: delta_s,
            });
        }

        let num_points = (length / delta_s) as usize + 1;
        let points = (0..num_points)
            .map(|i| PathBoundPoint::unconstrained(start_s + i as f64 * delta_s))
            .collect();

        Ok(Self {
            points,
            start_s,
            delta_s,
            start_index: 0,
            label: String::new(),
            blocking_id: None,
            narrowest_width: None,
        })
    }

    /// The stations of the corridor, in strictly increasing `s` order.
    pub fn points(&self) -> &[PathBoundPoint] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [PathBoundPoint] {
        &mut self.points
    }

    pub(crate) fn insert_point(&mut self, idx: usize, point: PathBoundPoint) {
        self.points.insert(idx, point);
    }

    /// Arc length of the first station in m.
    pub fn start_s(&self) -> f64 {
        self.start_s
    }

    /// The regular station spacing in m. Corner augmentation may insert
    /// stations between the regular ones.
    pub fn delta_s(&self) -> f64 {
        self.delta_s
    }

    /// Index of the station at the vehicle's initial position.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// A diagnostic label recording which lane type(s) contributed.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    /// The obstacle reported as the proximate cause of a blockage.
    pub fn blocking_id(&self) -> Option<ObstacleId> {
        self.blocking_id
    }

    /// The narrowest corridor width observed by the obstacle sweep.
    pub fn narrowest_width(&self) -> Option<f64> {
        self.narrowest_width
    }

    /// Whether the corridor was cut short by a blockage.
    pub fn is_blocked(&self) -> bool {
        self.blocking_id.is_some()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn set_blockage(&mut self, id: Option<ObstacleId>, narrowest_width: Option<f64>) {
        self.blocking_id = id;
        self.narrowest_width = narrowest_width;
    }

    /// Truncates the corridor at the first blocked station, so that no
    /// infeasible station is ever exposed to the optimizer.
    pub fn trim_at(&mut self, blocked_idx: usize) {
        self.points.truncate(blocked_idx);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn init_spacing_and_bounds() {
        let bound = PathBoundary::init(10.0, 0.5, 200.0, 100.0).unwrap();
        assert_eq!(bound.len(), 201);
        assert_eq!(bound.points()[0].s, 10.0);
        assert!(bound
            .points()
            .iter()
            .all(|p| p.lower.l == f64::NEG_INFINITY && p.upper.l == f64::INFINITY));
        assert!(bound
            .points()
            .windows(2)
            .all(|w| w[0].s < w[1].s));
    }

    #[test]
    fn init_fails_on_short_reference_line() {
        let err = PathBoundary::init(99.8, 0.5, 100.0, 100.0).unwrap_err();
        assert!(matches!(
            err,
            CorridorError::ReferenceLineTooShort { .. }
        ));
    }

    #[test]
    fn update_is_idempotent() {
        let mut point = PathBoundPoint::unconstrained(0.0);
        assert!(point.update_with_buffer(
            1.75,
            -1.75,
            BoundKind::Lane,
            BoundKind::Lane,
            None,
            None,
            1.0,
        ));
        let snapshot = point;

        // A looser-or-equal bound must leave the station untouched.
        assert!(point.update_left_with_buffer(1.75, BoundKind::Road, None, 1.0));
        assert!(point.update_right_with_buffer(-2.0, BoundKind::Road, None, 1.0));
        assert_eq!(point, snapshot);
    }

    #[test]
    fn update_detects_blockage() {
        let mut point = PathBoundPoint::unconstrained(0.0);
        point.update_left_with_buffer(0.5, BoundKind::Obstacle, None, 1.0);
        assert!(!point.update_right_with_buffer(0.5, BoundKind::Obstacle, None, 1.0));
        assert!(!point.is_feasible());
    }

    #[test]
    fn trim_drops_blocked_suffix() {
        let mut bound = PathBoundary::init(0.0, 1.0, 100.0, 10.0).unwrap();
        bound.trim_at(4);
        assert_eq!(bound.len(), 4);
        assert_eq!(bound.points().last().unwrap().s, 3.0);
    }
}
