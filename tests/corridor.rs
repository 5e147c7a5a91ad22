//! Scenario tests that run the whole corridor pipeline.

use assert_approx_eq::assert_approx_eq;
use path_corridor::{
    boundary_from_static_obstacles, CorridorBuilder, CorridorConfig, CorridorError, LaneBorrow,
    LaneModel, LaneWidth, Obstacle, ObstacleSet, PathBoundary, PlanningStartPoint, RefLine,
    SLState, UniformLaneModel, VehicleParams,
};
use path_corridor::math::{LineSegment2d, Point2d, Vector2d};
use rand::seq::SliceRandom;

fn straight_ref_line(len: f64) -> RefLine {
    RefLine::new(&LineSegment2d::from_ends(
        Point2d::new(0.0, 0.0),
        Point2d::new(len, 0.0),
    ))
}

fn lanes() -> UniformLaneModel {
    UniformLaneModel {
        lane: LaneWidth::new(1.75, 1.75),
        road: LaneWidth::new(5.0, 5.0),
        neighbor: 3.5,
    }
}

fn vehicle() -> VehicleParams {
    VehicleParams {
        width: 1.8,
        wheelbase: 2.8,
    }
}

/// A rectangular obstacle footprint in world space.
fn rect_obstacle(x: [f64; 2], y: [f64; 2]) -> Obstacle {
    Obstacle::new(vec![
        Point2d::new(x[0], y[0]),
        Point2d::new(x[1], y[0]),
        Point2d::new(x[1], y[1]),
        Point2d::new(x[0], y[1]),
    ])
}

fn init_state(s: f64, l: f64) -> SLState {
    SLState {
        s: [s, 0.0, 0.0],
        l: [l, 0.0, 0.0],
    }
}

/// With no obstacles and no borrowing, the corridor is the self lane
/// shrunk by the vehicle's half-width, and nothing blocks it.
#[test]
fn empty_scene_follows_lane_edges() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let bound = builder
        .build(&init_state(0.0, 0.0), LaneBorrow::None, false)
        .unwrap();

    assert_eq!(bound.blocking_id(), None);
    assert_eq!(bound.label(), "self");
    assert_eq!(bound.len(), 201);
    for point in bound.points() {
        assert_approx_eq!(point.upper.l, 1.75 - 0.9);
        assert_approx_eq!(point.lower.l, -(1.75 - 0.9));
    }
}

/// An obstacle covering most of the lane leaves no room on either side:
/// the corridor is blocked at the obstacle's start and trimmed there.
#[test]
fn impassable_obstacle_blocks_corridor() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let mut obstacles = ObstacleSet::with_key();
    let id = obstacles.insert(rect_obstacle([10.0, 15.0], [-0.5, 3.5]));
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let bound = builder
        .build(&init_state(0.0, 0.0), LaneBorrow::None, false)
        .unwrap();

    assert_eq!(bound.blocking_id(), Some(id));
    assert!(bound.is_blocked());
    assert!(!bound.is_empty());
    assert!(bound.points().iter().all(|p| p.is_feasible()));
    assert!(bound.points().iter().all(|p| p.s < 10.0));
    assert!(bound.narrowest_width().unwrap() < 0.0);
}

/// A vehicle starting outside the lane keeps its own footprint inside the
/// corridor's initial stations; stations beyond the extension region keep
/// the pure lane bounds.
#[test]
fn initial_stations_include_offset_vehicle() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let bound = builder
        .build(&init_state(0.0, 2.0), LaneBorrow::None, false)
        .unwrap();

    assert_eq!(bound.blocking_id(), None);
    let first = &bound.points()[0];
    assert!(first.lateral().contains(2.0));
    for point in bound.points() {
        if point.s > 5.0 {
            assert_approx_eq!(point.upper.l, 0.85);
            assert_approx_eq!(point.lower.l, -0.85);
        }
    }
}

/// Borrowing the left lane extends the left bound into it.
#[test]
fn left_borrow_widens_left_bound() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let bound = builder
        .build(&init_state(0.0, 0.0), LaneBorrow::Left, false)
        .unwrap();

    assert_eq!(bound.label(), "self/left");
    for point in bound.points() {
        assert_approx_eq!(point.upper.l, 1.75 + 3.5 - 0.9);
        assert_approx_eq!(point.lower.l, -0.85);
    }
}

/// Re-running the pipeline on identical input yields an identical
/// corridor, and the sweep does not depend on polygon order.
#[test]
fn corridor_construction_is_deterministic() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let mut obstacles = ObstacleSet::with_key();
    obstacles.insert(rect_obstacle([10.0, 18.0], [0.8, 2.5]));
    obstacles.insert(rect_obstacle([14.0, 25.0], [-2.5, -1.1]));
    obstacles.insert(rect_obstacle([40.0, 44.0], [1.0, 1.6]));
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );
    let init = init_state(0.0, 0.0);

    let bound1 = builder.build(&init, LaneBorrow::None, false).unwrap();
    let bound2 = builder.build(&init, LaneBorrow::None, false).unwrap();
    assert_eq!(bound1, bound2);

    // Feed the sweep the same polygons in random orders
    let polygons = builder.sl_polygons(&init);
    let lane_bound = || {
        let mut bound = PathBoundary::init(0.0, 0.5, ref_line.length(), 100.0).unwrap();
        builder.boundary_from_self_lane(&mut bound).unwrap();
        bound
    };

    let mut reference: Option<PathBoundary> = None;
    let mut rng = rand::thread_rng();
    for _ in 0..5 {
        let mut shuffled = polygons.clone();
        shuffled.shuffle(&mut rng);
        let mut bound = lane_bound();
        boundary_from_static_obstacles(&mut bound, &shuffled, &init, 0.9, 0.4);
        match &reference {
            Some(reference) => assert_eq!(bound, *reference),
            None => reference = Some(bound),
        }
    }
}

/// A point on a station's midline is reported as within the corridor at
/// that station; points outside the horizon or the bound are not.
#[test]
fn containment_round_trip() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let mut obstacles = ObstacleSet::with_key();
    obstacles.insert(rect_obstacle([10.0, 18.0], [0.8, 2.5]));
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let bound = builder
        .build(&init_state(0.0, 0.0), LaneBorrow::None, false)
        .unwrap();

    for idx in [0, 25, 100] {
        let point = &bound.points()[idx];
        let mid = ref_line
            .sample_centre(point.s)
            .lat_offset(point.lateral().midpoint());
        assert_eq!(builder.point_within_path_bound(mid, &bound), Some(idx));
    }

    // Outside the horizon
    assert_eq!(
        builder.point_within_path_bound(Point2d::new(150.0, 0.0), &bound),
        None
    );
    // Outside the lateral bound
    assert_eq!(
        builder.point_within_path_bound(Point2d::new(30.0, 5.0), &bound),
        None
    );
}

/// The start state comes from the front axle: a rear-axle pose is
/// translated by the wheelbase along the heading before projection.
#[test]
fn start_state_projects_front_axle() {
    use cgmath::InnerSpace;

    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let pose = PlanningStartPoint {
        pos: Point2d::new(20.0, 0.3),
        dir: Vector2d::new(1.0, 0.0).normalize(),
        vel: 10.0,
        acc: 0.5,
    };
    let state = builder.start_state(&pose, true).unwrap();
    assert_approx_eq!(state.s[0], 22.8, 0.01);
    assert_approx_eq!(state.s[1], 10.0, 0.01);
    assert_approx_eq!(state.l[0], 0.3, 0.01);
    assert_approx_eq!(state.l[1], 0.0, 0.01);

    let state = builder.start_state(&pose, false).unwrap();
    assert_approx_eq!(state.s[0], 20.0, 0.01);
}

/// Hard failures are distinct from blockage: a reference line too short
/// for even a couple of stations aborts construction.
#[test]
fn short_reference_line_fails() {
    let ref_line = straight_ref_line(30.0);
    let lanes = lanes();
    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let err = builder
        .build(&init_state(29.8, 0.0), LaneBorrow::None, false)
        .unwrap_err();
    assert!(matches!(err, CorridorError::ReferenceLineTooShort { .. }));
}

/// Missing lane geometry is a hard failure of the self-lane stage.
#[test]
fn missing_lane_geometry_fails() {
    struct GappyLanes;
    impl LaneModel for GappyLanes {
        fn lane_width_at(&self, s: f64) -> Option<LaneWidth> {
            (s < 50.0).then(|| LaneWidth::new(1.75, 1.75))
        }
        fn road_width_at(&self, _s: f64) -> Option<LaneWidth> {
            Some(LaneWidth::new(5.0, 5.0))
        }
        fn neighbor_width_at(&self, _s: f64, _side: path_corridor::Side) -> Option<f64> {
            None
        }
    }

    let ref_line = straight_ref_line(200.0);
    let lanes = GappyLanes;
    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(
        &ref_line,
        &lanes,
        &obstacles,
        vehicle(),
        CorridorConfig::default(),
    );

    let mut bound = PathBoundary::init(0.0, 0.5, 200.0, 100.0).unwrap();
    let err = builder.boundary_from_self_lane(&mut bound).unwrap_err();
    assert!(matches!(err, CorridorError::MissingLaneGeometry { s } if s >= 50.0));

    // The road query still covers the gap
    let mut bound = PathBoundary::init(0.0, 0.5, 200.0, 100.0).unwrap();
    builder.boundary_from_road(&mut bound).unwrap();
    assert_approx_eq!(bound.points()[0].upper.l, 5.0 - 0.9);
}

/// When lane bounds exclude the vehicle and widening is disabled, the
/// relaxation stage still pulls the initial stations out to the vehicle;
/// an obstacle sitting on the vehicle's position is irreducible.
#[test]
fn relaxation_includes_vehicle_or_fails() {
    let ref_line = straight_ref_line(200.0);
    let lanes = lanes();
    let config = CorridorConfig {
        is_extend_adc: false,
        ..Default::default()
    };

    let obstacles = ObstacleSet::with_key();
    let builder = CorridorBuilder::new(&ref_line, &lanes, &obstacles, vehicle(), config);
    let bound = builder
        .build(&init_state(0.0, 2.0), LaneBorrow::None, false)
        .unwrap();
    let first = &bound.points()[0];
    assert!(first.lateral().contains(2.0));
    assert_eq!(first.upper.kind, path_corridor::BoundKind::Adc);

    let mut obstacles = ObstacleSet::with_key();
    obstacles.insert(rect_obstacle([0.0, 6.0], [1.0, 4.0]));
    let builder = CorridorBuilder::new(&ref_line, &lanes, &obstacles, vehicle(), config);
    let err = builder
        .build(&init_state(0.0, 2.0), LaneBorrow::None, false)
        .unwrap_err();
    assert!(matches!(err, CorridorError::EgoOutsideObstacleBound { .. }));
}
