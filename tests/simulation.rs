//! End-to-end simulation tests: proximity classification across poses and
//! a full drop-onto-slab scenario.

use tumble::{
    Body, Cuboid, GjkDetector, Mat4, PhysicsConfig, PhysicsWorld, Proximity, Pyramid, Quat, Real,
    TransformedShape, Vec3,
};

const INTERSECTING_TOLERANCE: Real = 1.0e-4;
const CONTACTING_TOLERANCE: Real = 1.0e-2;

fn placed(
    shape: Box<dyn tumble::Shape>,
    position: Vec3,
    rotation: Quat,
) -> TransformedShape {
    let mut transformed = TransformedShape::new(shape);
    transformed.set_transform(Mat4::from_rotation_translation(rotation, position));
    transformed
}

#[test]
fn test_separated_pairs_classify_as_separate() {
    let detector = GjkDetector::new();
    let rotations = [
        Quat::IDENTITY,
        Quat::from_axis_angle(Vec3::Z, 0.6),
        Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 1.1),
    ];

    for rotation in rotations {
        // anything translated apart by more than the sum of both shapes'
        // reach plus both tolerances is separate
        let a = placed(Box::new(Cuboid::new(1.0, 1.0, 1.0)), Vec3::ZERO, rotation);
        let b = placed(
            Box::new(Pyramid::new(1.0, 1.0, 2.0)),
            Vec3::new(6.0, 0.0, 0.0),
            rotation,
        );
        assert_eq!(
            detector.compare(INTERSECTING_TOLERANCE, CONTACTING_TOLERANCE, &a, &b),
            Proximity::Separate,
        );

        let c = placed(
            Box::new(Cuboid::new(0.5, 2.0, 0.5)),
            Vec3::new(0.0, -8.0, 3.0),
            rotation,
        );
        assert_eq!(
            detector.compare(INTERSECTING_TOLERANCE, CONTACTING_TOLERANCE, &a, &c),
            Proximity::Separate,
        );
    }
}

#[test]
fn test_coincident_boxes_classify_as_intersecting() {
    let detector = GjkDetector::new();
    let a = placed(Box::new(Cuboid::new(1.0, 1.0, 1.0)), Vec3::ZERO, Quat::IDENTITY);
    let b = placed(Box::new(Cuboid::new(1.0, 1.0, 1.0)), Vec3::ZERO, Quat::IDENTITY);
    assert_eq!(
        detector.compare(INTERSECTING_TOLERANCE, CONTACTING_TOLERANCE, &a, &b),
        Proximity::Intersecting,
    );
}

#[test]
fn test_near_touching_boxes_contact_with_axis_plane() {
    let detector = GjkDetector::new();
    let a = placed(Box::new(Cuboid::new(1.0, 1.0, 1.0)), Vec3::ZERO, Quat::IDENTITY);
    let b = placed(
        Box::new(Cuboid::new(1.0, 1.0, 1.0)),
        Vec3::new(2.001, 0.0, 0.0),
        Quat::IDENTITY,
    );

    let (proximity, pair) = detector
        .compare_surfaces(INTERSECTING_TOLERANCE, CONTACTING_TOLERANCE, &a, &b)
        .expect("surface extraction succeeds");
    assert_eq!(proximity, Proximity::Contacting);

    let plane = pair.expect("contacting pair carries surfaces").plane;
    assert!(
        plane.normal().x.abs() > 1.0 - 1.0e-6,
        "separating plane normal {:?} is not along x",
        plane.normal()
    );
    assert!(plane.normal().y.abs() < 1.0e-6);
    assert!(plane.normal().z.abs() < 1.0e-6);
}

#[test]
fn test_dropped_box_settles_into_steady_contact() {
    let mut world = PhysicsWorld::new(PhysicsConfig::default());

    let mut cube = Body::new(Box::new(Cuboid::new(0.5, 0.5, 0.5)), 1.0 / 1000.0);
    cube.set_position(Vec3::new(0.0, 0.0, 0.7));
    let cube_id = world.add_body(cube);

    let mut slab = Body::new(Box::new(Cuboid::new(5.0, 5.0, 0.5)), 0.0);
    slab.set_position(Vec3::new(0.0, 0.0, -0.5));
    let slab_id = world.add_body(slab);

    let detector = GjkDetector::new();
    let dt = 0.002;
    let mut steady_ticks = 0;
    for step in 0..3000 {
        let t = step as Real * dt;
        world
            .advance(t, dt)
            .unwrap_or_else(|e| panic!("tick at t = {t} failed: {e}"));

        // repeated classification must converge to contact, not keep
        // oscillating through separate or intersecting states
        let proximity = detector.compare(
            INTERSECTING_TOLERANCE,
            CONTACTING_TOLERANCE,
            &world.bodies()[cube_id],
            &world.bodies()[slab_id],
        );
        if proximity == Proximity::Contacting {
            steady_ticks += 1;
        } else {
            steady_ticks = 0;
        }
    }

    // the box came to rest on the slab and stayed there
    assert!(
        steady_ticks >= 500,
        "contact not steady: only {steady_ticks} consecutive contacting ticks"
    );

    let z = world.bodies()[cube_id].position().z;
    assert!(
        (0.45..0.65).contains(&z),
        "box did not rest on the slab surface: z = {z}"
    );
    let speed = world.bodies()[cube_id].velocity().length();
    assert!(speed < 0.05, "box still moving after settling: {speed}");
}
