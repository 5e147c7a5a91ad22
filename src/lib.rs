pub use boundary::{BoundEdge, BoundKind, PathBoundPoint, PathBoundary};
pub use cgmath;
pub use decider::{
    infer_front_axle_center_from_rear_axle, CorridorBuilder, CorridorConfig, PlanningStartPoint,
    SLState, VehicleParams,
};
pub use error::CorridorError;
pub use lane::{LaneBorrow, LaneModel, LaneWidth, Side, UniformLaneModel};
pub use obstacle::{sl_polygons, Obstacle, SLPolygon};
pub use ref_line::{RefLine, RefSample, SLPoint};
pub use refine::{add_corner_bounds, corner_point, relax_ego_lateral_boundary};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use sweep::{
    boundary_from_static_obstacles, find_farthest_blocking_id, sort_obstacles_for_sweep_line,
    update_boundary_by_sl_polygons, ObstacleEdge, SweepOutcome,
};
pub use util::Interval;

mod boundary;
mod debug;
mod decider;
mod error;
mod lane;
pub mod math;
mod obstacle;
mod ref_line;
mod refine;
mod sweep;
mod util;

new_key_type! {
    /// Unique ID of an [Obstacle].
    pub struct ObstacleId;
}

/// The cycle's static-obstacle collection: insertion-ordered and iterated
/// deterministically.
pub type ObstacleSet = SlotMap<ObstacleId, Obstacle>;
