use crate::util::Interval;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A side of the reference line. `Left` is the positive-`l` side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    Left,
    Right,
}

/// Whether the corridor may extend into an adjacent lane, chosen by an
/// external decision layer and consumed read-only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LaneBorrow {
    Left,
    #[default]
    None,
    Right,
}

impl LaneBorrow {
    /// The side being borrowed, if any.
    pub fn side(self) -> Option<Side> {
        match self {
            LaneBorrow::Left => Some(Side::Left),
            LaneBorrow::None => None,
            LaneBorrow::Right => Some(Side::Right),
        }
    }
}

/// Half-widths of a lane or road about the reference line, in m.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneWidth {
    /// Distance from the reference line to the left edge.
    pub left: f64,
    /// Distance from the reference line to the right edge.
    pub right: f64,
}

impl LaneWidth {
    pub const fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    /// The lateral interval spanned by these half-widths.
    pub fn lateral(&self) -> Interval<f64> {
        Interval::new(-self.right, self.left)
    }
}

/// Lane and road geometry queries along the reference line.
///
/// Implemented by the map/topology provider; all queries take an arc length
/// `s` on the reference line and return `None` where geometry is missing.
pub trait LaneModel {
    /// Half-widths of the current lane at `s`.
    fn lane_width_at(&self, s: f64) -> Option<LaneWidth>;

    /// Half-widths of the road at `s`.
    fn road_width_at(&self, s: f64) -> Option<LaneWidth>;

    /// Full width of the neighbouring lane on the given side at `s`.
    fn neighbor_width_at(&self, s: f64, side: Side) -> Option<f64>;

    /// Remaps an arc length measured along the lane centre onto the
    /// reference line. Must be monotonically increasing.
    ///
    /// The two arc lengths diverge on curves whenever the lane centre is
    /// laterally offset from the reference line; the default covers the
    /// common case where they coincide.
    fn lane_center_s_to_ref_s(&self, s: f64) -> f64 {
        s
    }
}

/// A lane model with constant widths, for tests and standalone use.
#[derive(Clone, Copy, Debug)]
pub struct UniformLaneModel {
    pub lane: LaneWidth,
    pub road: LaneWidth,
    /// Full width of each neighbouring lane.
    pub neighbor: f64,
}

impl LaneModel for UniformLaneModel {
    fn lane_width_at(&self, _s: f64) -> Option<LaneWidth> {
        Some(self.lane)
    }

    fn road_width_at(&self, _s: f64) -> Option<LaneWidth> {
        Some(self.road)
    }

    fn neighbor_width_at(&self, _s: f64, _side: Side) -> Option<f64> {
        Some(self.neighbor)
    }
}
