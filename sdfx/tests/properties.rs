//! Numeric laws of the compiled expressions, checked with the CPU evaluator
use approx::assert_relative_eq;
use proptest::prelude::*;
use sdfx::{
    context::{Literal, SceneNode},
    eval::BasicAtoms,
    Error,
};

/// Values with at most three decimal places, which survive rounding
fn milli(range: std::ops::Range<i32>) -> impl Strategy<Value = f64> {
    range.prop_map(|i| i as f64 / 1000.0)
}

fn eval(s: &SceneNode, x: f64, y: f64) -> f64 {
    sdfx::compile(s).unwrap().eval(&BasicAtoms, x, y).unwrap()
}

fn shapes() -> impl Strategy<Value = SceneNode> {
    prop_oneof![
        milli(100..1500).prop_map(|r| SceneNode::atom("circle", [r])),
        (milli(100..1500), milli(100..1500)).prop_map(|(w, h)| {
            SceneNode::atom("plainBox", [format!("vec2({w}, {h})")])
        }),
        Just(SceneNode::atom("heart", Vec::<Literal>::new())),
    ]
}

proptest! {
    #[test]
    fn translate_shifts_the_point(
        s in shapes(),
        dx in milli(-2000..2000),
        dy in milli(-2000..2000),
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        let t = s.translate(format!("vec2({dx}, {dy})"));
        assert_relative_eq!(
            eval(&t, x, y),
            eval(&s, x - dx, y - dy),
            epsilon = 1e-9
        );
    }

    #[test]
    fn translate_substitutes_text(
        s in shapes(),
        dx in milli(-2000..2000),
        dy in milli(-2000..2000),
    ) {
        let d = format!("vec2({dx}, {dy})");
        let t = sdfx::compile(&s.scale(0.5).translate(d.as_str())).unwrap();
        let c = sdfx::compile(&s.scale(0.5)).unwrap();
        prop_assert_eq!(
            t.apply("p").unwrap(),
            c.apply(&format!("(p - {d})")).unwrap()
        );
    }

    #[test]
    fn opposite_rotations_cancel(
        s in shapes(),
        angle in milli(-6283..6283),
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        let r = s.rotate(-angle).rotate(angle);
        assert_relative_eq!(eval(&r, x, y), eval(&s, x, y), epsilon = 1e-9);
    }

    #[test]
    fn noop_is_identity(
        s in shapes(),
        meta in "[a-z0-9]{0,8}",
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        let n = s.noop(meta.as_str());
        prop_assert_eq!(eval(&n, x, y), eval(&s, x, y));
    }

    #[test]
    fn rotate_round_trip(
        s in shapes(),
        angle in milli(-6283..6283),
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        let (sin, cos) = angle.sin_cos();
        let (rx, ry) = (cos * x - sin * y, sin * x + cos * y);
        assert_relative_eq!(
            eval(&s.rotate(angle), rx, ry),
            eval(&s, x, y),
            epsilon = 1e-9
        );
    }

    #[test]
    fn scale_law(
        s in shapes(),
        k in milli(100..5000),
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        assert_relative_eq!(
            eval(&s.scale(k), x, y),
            k * eval(&s, x / k, y / k),
            epsilon = 1e-9
        );
    }

    #[test]
    fn boolean_identities(
        a in shapes(),
        b in shapes(),
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        let (da, db) = (eval(&a, x, y), eval(&b, x, y));
        prop_assert_eq!(eval(&a.unite(&b), x, y), da.min(db));
        prop_assert_eq!(eval(&a.intersect(&b), x, y), da.max(db));
        prop_assert_eq!(eval(&a.subtract(&b), x, y), (-da).max(db));
    }

    #[test]
    fn smooth_union_never_exceeds_union(
        a in shapes(),
        b in shapes(),
        k in milli(1..1000),
        x in -3.0..3.0f64,
        y in -3.0..3.0f64,
    ) {
        // Blend width grows away from the origin, and is always positive
        let blend = SceneNode::atom("circle", [-k]);
        let width = eval(&blend, x, y);
        let hard = eval(&a.unite(&b), x, y);
        let soft = eval(&a.smooth_unite(&b, &blend), x, y);
        prop_assert!(soft <= hard + 1e-12);
        prop_assert!(hard - soft <= width / 4.0 + 1e-12);
    }

    #[test]
    fn compilation_is_deterministic(s in shapes(), a in milli(-6283..6283)) {
        let s = s.rotate(a).scale(1.5).hollow(0.05);
        let one = sdfx::compile(&s).unwrap().apply("p").unwrap();
        let two = sdfx::compile(&s).unwrap().apply("p").unwrap();
        prop_assert_eq!(one, two);
    }
}

#[test]
fn smooth_union_example() {
    // Distances of 1 and 3 with a blend of 2: the blend window is exceeded,
    // so the result matches a hard union.
    let a = SceneNode::atom("circle", [1.0]);
    let b = SceneNode::atom("circle", [-1.0]);
    let k = SceneNode::atom("circle", [0.0]);
    let s = a.smooth_unite(&b, &k);
    let d = eval(&s, 2.0, 0.0);
    assert_relative_eq!(d, 1.0);
}

#[test]
fn rotate_formatting() {
    let s = SceneNode::atom("circle", ["1.0"]).rotate("20");
    let out = sdfx::compile(&s).unwrap().apply("p").unwrap();
    assert!(out.contains("cos(20.000)"), "{out}");
    assert!(!out.contains("20.0)"), "{out}");
}

#[test]
fn unknown_operator_is_reconstructed() {
    let s = SceneNode::unknown("TWIST", [SceneNode::atom("circle", [1.0])]);
    let c = sdfx::compile(&s).unwrap();
    let (name, args) = c.unknown().unwrap();
    assert_eq!(name, "TWIST");
    assert_eq!(args.len(), 1);
    assert!(matches!(
        c.eval(&BasicAtoms, 0.0, 0.0),
        Err(Error::UnknownOperator(..))
    ));
}
