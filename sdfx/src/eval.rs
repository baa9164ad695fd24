//! CPU evaluation of compiled expressions
//!
//! The evaluator interprets an [`Expr`] at a single point, following shader
//! semantics: `vec2` arithmetic is component-wise (with scalar broadcasting),
//! `mat2(a, b, c, d)` is column-major, and `mat2 * vec2` is a matrix-vector
//! product.  Primitive calls are dispatched to an [`Atoms`] implementation.
//!
//! ```
//! use sdfx::{context::SceneNode, eval::BasicAtoms};
//!
//! let scene = SceneNode::atom("circle", [1.0]).translate("vec2(2.0, 0.0)");
//! let c = sdfx::compile(&scene)?;
//! assert_eq!(c.eval(&BasicAtoms, 2.0, 0.0)?, -1.0);
//! assert_eq!(c.eval(&BasicAtoms, 4.0, 0.0)?, 1.0);
//! # Ok::<(), sdfx::Error>(())
//! ```
use crate::{
    context::{Axis, BinaryOpcode, Expr, ExprOp, UnaryOpcode},
    Error,
};
use nalgebra::{Matrix2, Vector2, Vector3, Vector4};

/// Value produced while evaluating an expression
#[derive(Copy, Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Value {
    Scalar(f64),
    Vec2(Vector2<f64>),
    Vec3(Vector3<f64>),
    Vec4(Vector4<f64>),
    Mat2(Matrix2<f64>),
}

impl Value {
    /// Returns the inner scalar, or an error
    pub fn scalar(&self) -> Result<f64, Error> {
        match self {
            Value::Scalar(v) => Ok(*v),
            _ => Err(Error::TypeMismatch("expected a scalar")),
        }
    }

    /// Returns the inner `vec2`, or an error
    pub fn vec2(&self) -> Result<Vector2<f64>, Error> {
        match self {
            Value::Vec2(v) => Ok(*v),
            _ => Err(Error::TypeMismatch("expected a vec2")),
        }
    }

    /// Returns a `vec4`, broadcasting scalars
    pub fn vec4(&self) -> Result<Vector4<f64>, Error> {
        match self {
            Value::Scalar(v) => Ok(Vector4::repeat(*v)),
            Value::Vec4(v) => Ok(*v),
            _ => Err(Error::TypeMismatch("expected a vec4")),
        }
    }

    fn components(&self) -> &[f64] {
        match self {
            Value::Scalar(v) => std::slice::from_ref(v),
            Value::Vec2(v) => v.as_slice(),
            Value::Vec3(v) => v.as_slice(),
            Value::Vec4(v) => v.as_slice(),
            Value::Mat2(m) => m.as_slice(),
        }
    }

    /// Applies `f` to every component
    fn map<F: Fn(f64) -> f64>(self, f: F) -> Self {
        match self {
            Value::Scalar(v) => Value::Scalar(f(v)),
            Value::Vec2(v) => Value::Vec2(v.map(f)),
            Value::Vec3(v) => Value::Vec3(v.map(f)),
            Value::Vec4(v) => Value::Vec4(v.map(f)),
            Value::Mat2(m) => Value::Mat2(m.map(f)),
        }
    }

    /// Combines two values component-wise, broadcasting scalars
    fn zip<F: Fn(f64, f64) -> f64>(
        self,
        other: Self,
        f: F,
    ) -> Result<Self, Error> {
        let out = match (self, other) {
            (Value::Scalar(a), b) => b.map(|b| f(a, b)),
            (a, Value::Scalar(b)) => a.map(|a| f(a, b)),
            (Value::Vec2(a), Value::Vec2(b)) => Value::Vec2(a.zip_map(&b, f)),
            (Value::Vec3(a), Value::Vec3(b)) => Value::Vec3(a.zip_map(&b, f)),
            (Value::Vec4(a), Value::Vec4(b)) => Value::Vec4(a.zip_map(&b, f)),
            (Value::Mat2(a), Value::Mat2(b)) => Value::Mat2(a.zip_map(&b, f)),
            _ => return Err(Error::TypeMismatch("operand sizes differ")),
        };
        Ok(out)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vector2<f64>> for Value {
    fn from(v: Vector2<f64>) -> Self {
        Value::Vec2(v)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Parses a literal argument, e.g. `0.5`, `.07`, or `vec2(0.8, 0.9)`
///
/// Vector and matrix constructors follow shader rules: a single scalar is
/// broadcast (or, for `mat2`, placed on the diagonal), and otherwise the
/// components of all arguments are concatenated.
pub fn parse_literal(s: &str) -> Result<Value, Error> {
    let s = s.trim();
    if let Ok(v) = s.parse::<f64>() {
        return Ok(Value::Scalar(v));
    }
    let bad = || Error::BadLiteral(s.to_owned());
    let (name, rest) = s.split_once('(').ok_or_else(bad)?;
    let body = rest.strip_suffix(')').ok_or_else(bad)?;
    let args = split_args(body)
        .into_iter()
        .map(parse_literal)
        .collect::<Result<Vec<_>, _>>()?;

    let name = name.trim();
    let n = match name {
        "vec2" => 2,
        "vec3" => 3,
        "vec4" | "mat2" => 4,
        _ => return Err(bad()),
    };
    let flat: Vec<f64> = match args.as_slice() {
        [Value::Scalar(v)] if name == "mat2" => vec![*v, 0.0, 0.0, *v],
        [Value::Scalar(v)] => vec![*v; n],
        _ => args.iter().flat_map(|a| a.components()).copied().collect(),
    };
    if flat.len() != n {
        return Err(bad());
    }
    Ok(match name {
        "vec2" => Value::Vec2(Vector2::from_column_slice(&flat)),
        "vec3" => Value::Vec3(Vector3::from_column_slice(&flat)),
        "vec4" => Value::Vec4(Vector4::from_column_slice(&flat)),
        _ => Value::Mat2(Matrix2::from_column_slice(&flat)),
    })
}

/// Splits constructor arguments at top-level commas
fn split_args(s: &str) -> Vec<&str> {
    let mut out = vec![];
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                out.push(&s[start..i]);
                start = i + 1;
            }
            _ => (),
        }
    }
    if !s[start..].trim().is_empty() || !out.is_empty() {
        out.push(&s[start..]);
    }
    out
}

////////////////////////////////////////////////////////////////////////////////

/// Library of primitive distance functions
pub trait Atoms {
    /// Evaluates the primitive `name` at the point `p`
    ///
    /// `args` are the primitive's literal arguments (after the point).
    fn atom(&self, name: &str, p: Vector2<f64>, args: &[Value])
        -> Result<f64, Error>;
}

/// A handful of common primitives
///
/// - `circle(p, r)`
/// - `boxAtom(p, b, r)`: box with half-size `b` and per-corner radii `r`
///   (a `vec4`, defaulting to `0.01` when omitted)
/// - `plainBox(p, b)`: `boxAtom` with the default radii
/// - `heart(p)`
/// - `star(p, r, rf)`: five-pointed star with outer radius `r`, where `rf`
///   scales the inner vertices
/// - `triangle(p, r)`: equilateral triangle with half-side `r`
/// - `moon(p, d, ra, rb)`: disk of radius `ra`, minus a disk of radius `rb`
///   offset by `d` along +x
/// - `ellipse(p, ab)`: ellipse with semi-axes `ab`
#[derive(Copy, Clone, Debug, Default)]
pub struct BasicAtoms;

impl BasicAtoms {
    const CORNER: f64 = 0.01;
}

impl Atoms for BasicAtoms {
    fn atom(
        &self,
        name: &str,
        p: Vector2<f64>,
        args: &[Value],
    ) -> Result<f64, Error> {
        let arity = |n: usize| {
            if args.len() == n {
                Ok(())
            } else {
                Err(Error::BadArity {
                    op: name.to_owned(),
                    expected: n,
                    actual: args.len(),
                })
            }
        };
        match name {
            "circle" => {
                arity(1)?;
                Ok(p.norm() - args[0].scalar()?)
            }
            "plainBox" => {
                arity(1)?;
                let r = Vector4::repeat(Self::CORNER);
                Ok(rounded_box(p, args[0].vec2()?, r))
            }
            "boxAtom" => {
                let r = match args {
                    [_] => Vector4::repeat(Self::CORNER),
                    [_, r] => r.vec4()?,
                    _ => {
                        return Err(Error::BadArity {
                            op: name.to_owned(),
                            expected: 2,
                            actual: args.len(),
                        });
                    }
                };
                Ok(rounded_box(p, args[0].vec2()?, r))
            }
            "heart" => {
                arity(0)?;
                Ok(heart(p))
            }
            "star" => {
                arity(2)?;
                Ok(star(p, args[0].scalar()?, args[1].scalar()?))
            }
            "triangle" => {
                arity(1)?;
                Ok(triangle(p, args[0].scalar()?))
            }
            "moon" => {
                arity(3)?;
                let [d, ra, rb] = [&args[0], &args[1], &args[2]];
                Ok(moon(p, d.scalar()?, ra.scalar()?, rb.scalar()?))
            }
            "ellipse" => {
                arity(1)?;
                Ok(ellipse(p, args[0].vec2()?))
            }
            _ => Err(Error::UnknownAtom(name.to_owned())),
        }
    }
}

/// Shader-style `sign`, which returns 0 at 0
fn sign(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v.signum() }
}

/// Shader-style `clamp`, which doesn't panic if `lo > hi`
fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Box with half-size `b` and corner radii `r` (+x+y, +x-y, -x+y, -x-y)
fn rounded_box(p: Vector2<f64>, b: Vector2<f64>, r: Vector4<f64>) -> f64 {
    let (hi, lo) = if p.x > 0.0 { (r.x, r.y) } else { (r.z, r.w) };
    let r = if p.y > 0.0 { hi } else { lo };
    let q = p.abs() - b + Vector2::repeat(r);
    if q.x.min(q.y) < 0.0 {
        return q.x.max(q.y) - r;
    }
    // Distance to a circular corner, computed in rotated corner coordinates
    let uv = Vector2::new((q.x - q.y).abs(), q.x + q.y - r) / r;
    let d = (uv - Vector2::new(0.0, -1.0)).norm() - 2f64.sqrt();
    d * r * 0.5f64.sqrt()
}

fn heart(p: Vector2<f64>) -> f64 {
    let p = Vector2::new(p.x.abs(), p.y);
    if p.x + p.y > 1.0 {
        return (p - Vector2::new(0.25, 0.75)).norm() - 2f64.sqrt() / 4.0;
    }
    let a = (p - Vector2::new(0.0, 1.0)).norm_squared();
    let b = (p - Vector2::repeat(0.5 * (p.x + p.y).max(0.0))).norm_squared();
    a.min(b).sqrt() * sign(p.x - p.y)
}

fn star(p: Vector2<f64>, r: f64, rf: f64) -> f64 {
    let k1 = Vector2::new(0.809016994375, -0.587785252292);
    let k2 = Vector2::new(-k1.x, k1.y);
    let mut p = Vector2::new(p.x.abs(), p.y);
    p -= 2.0 * k1.dot(&p).max(0.0) * k1;
    p -= 2.0 * k2.dot(&p).max(0.0) * k2;
    let p = Vector2::new(p.x.abs(), p.y - r);
    let ba = rf * Vector2::new(-k1.y, k1.x) - Vector2::new(0.0, 1.0);
    let h = clamp(p.dot(&ba) / ba.norm_squared(), 0.0, r);
    (p - ba * h).norm() * sign(p.y * ba.x - p.x * ba.y)
}

fn triangle(p: Vector2<f64>, r: f64) -> f64 {
    let k = 3f64.sqrt();
    let mut p = Vector2::new(p.x.abs() - r, p.y + r / k);
    if p.x + k * p.y > 0.0 {
        p = Vector2::new(p.x - k * p.y, -k * p.x - p.y) / 2.0;
    }
    p.x -= clamp(p.x, -2.0 * r, 0.0);
    -p.norm() * sign(p.y)
}

fn moon(p: Vector2<f64>, d: f64, ra: f64, rb: f64) -> f64 {
    let p = Vector2::new(p.x, p.y.abs());
    let a = (ra * ra - rb * rb + d * d) / (2.0 * d);
    let b = (ra * ra - a * a).max(0.0).sqrt();
    if d * (p.x * b - p.y * a) > d * d * (b - p.y).max(0.0) {
        return (p - Vector2::new(a, b)).norm();
    }
    (p.norm() - ra).max(-((p - Vector2::new(d, 0.0)).norm() - rb))
}

/// Exact ellipse distance, solving the quartic for the closest point
fn ellipse(p: Vector2<f64>, ab: Vector2<f64>) -> f64 {
    let p = p.abs();
    let (p, ab) = if p.x > p.y {
        (Vector2::new(p.y, p.x), Vector2::new(ab.y, ab.x))
    } else {
        (p, ab)
    };
    let l = ab.y * ab.y - ab.x * ab.x;
    let m = ab.x * p.x / l;
    let n = ab.y * p.y / l;
    let (m2, n2) = (m * m, n * n);
    let c = (m2 + n2 - 1.0) / 3.0;
    let c3 = c * c * c;
    let q = c3 + m2 * n2 * 2.0;
    let d = c3 + m2 * n2;
    let g = m + m * n2;
    let co = if d < 0.0 {
        let h = (q / c3).acos() / 3.0;
        let s = h.cos();
        let t = h.sin() * 3f64.sqrt();
        let rx = (-c * (s + t + 2.0) + m2).sqrt();
        let ry = (-c * (s - t + 2.0) + m2).sqrt();
        (ry + sign(l) * rx + g.abs() / (rx * ry) - m) / 2.0
    } else {
        let h = 2.0 * m * n * d.sqrt();
        let s = sign(q + h) * (q + h).abs().cbrt();
        let u = sign(q - h) * (q - h).abs().cbrt();
        let rx = -s - u - c * 4.0 + 2.0 * m2;
        let ry = (s - u) * 3f64.sqrt();
        let rm = rx.hypot(ry);
        (ry / (rm - rx).sqrt() + 2.0 * g / rm - m) / 2.0
    };
    let r = ab.component_mul(&Vector2::new(co, (1.0 - co * co).sqrt()));
    (r - p).norm() * sign(p.y - r.y)
}

////////////////////////////////////////////////////////////////////////////////

/// Interpreter for [`Expr`] trees
pub struct Evaluator<'a, A: ?Sized> {
    atoms: &'a A,
}

impl<'a, A: Atoms + ?Sized> Evaluator<'a, A> {
    /// Builds an evaluator which uses the given primitive library
    pub fn new(atoms: &'a A) -> Self {
        Self { atoms }
    }

    /// Evaluates a distance expression at `(x, y)`
    pub fn eval(&self, e: &Expr, x: f64, y: f64) -> Result<f64, Error> {
        self.value(e, Vector2::new(x, y))?.scalar()
    }

    /// Evaluates an arbitrary expression with `p` as the query point
    pub fn value(&self, e: &Expr, p: Vector2<f64>) -> Result<Value, Error> {
        let v = match &**e {
            ExprOp::Point => Value::Vec2(p),
            ExprOp::Literal(s) => parse_literal(s)?,
            ExprOp::Const(c) => Value::Scalar(c.get()),
            ExprOp::Call { name, args } => {
                let (first, rest) =
                    args.split_first().ok_or(Error::TypeMismatch(
                        "primitive calls need a point argument",
                    ))?;
                let q = self.value(first, p)?.vec2()?;
                let rest = rest
                    .iter()
                    .map(|a| self.value(a, p))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Scalar(self.atoms.atom(name, q, &rest)?)
            }
            ExprOp::Mat2(m) => {
                let mut out = [0.0; 4];
                for (o, e) in out.iter_mut().zip(m) {
                    *o = self.value(e, p)?.scalar()?;
                }
                Value::Mat2(Matrix2::from_column_slice(&out))
            }
            ExprOp::Unary(op, a) => {
                let a = self.value(a, p)?;
                match op {
                    UnaryOpcode::Neg => a.map(|v| -v),
                    UnaryOpcode::Abs => a.map(f64::abs),
                    UnaryOpcode::Sin => a.map(f64::sin),
                    UnaryOpcode::Cos => a.map(f64::cos),
                    UnaryOpcode::Inverse => match a {
                        Value::Mat2(m) => Value::Mat2(
                            m.try_inverse()
                                .ok_or(Error::SingularMatrix("mat2"))?,
                        ),
                        _ => {
                            return Err(Error::TypeMismatch(
                                "inverse requires a mat2",
                            ));
                        }
                    },
                }
            }
            ExprOp::Binary(op, a, b) => {
                binary(*op, self.value(a, p)?, self.value(b, p)?)?
            }
            ExprOp::Swizzle(a, axis) => {
                let a = self.value(a, p)?;
                let i = match axis {
                    Axis::X => 0,
                    Axis::Y => 1,
                };
                match a {
                    Value::Vec2(..) | Value::Vec3(..) | Value::Vec4(..) => {
                        Value::Scalar(a.components()[i])
                    }
                    _ => {
                        return Err(Error::TypeMismatch(
                            "swizzle requires a vector",
                        ));
                    }
                }
            }
            ExprOp::Remap { target, point } => {
                let q = self.value(point, p)?.vec2()?;
                self.value(target, q)?
            }
            ExprOp::Unknown { name, .. } => {
                return Err(Error::UnknownOperator(name.clone()));
            }
        };
        Ok(v)
    }
}

fn binary(op: BinaryOpcode, a: Value, b: Value) -> Result<Value, Error> {
    let out = match (op, a, b) {
        (BinaryOpcode::Mul, Value::Mat2(m), Value::Vec2(v)) => {
            Value::Vec2(m * v)
        }
        (BinaryOpcode::Mul, Value::Vec2(v), Value::Mat2(m)) => {
            Value::Vec2(m.transpose() * v)
        }
        (BinaryOpcode::Mul, Value::Mat2(a), Value::Mat2(b)) => {
            Value::Mat2(a * b)
        }
        (BinaryOpcode::Add, a, b) => a.zip(b, |a, b| a + b)?,
        (BinaryOpcode::Sub, a, b) => a.zip(b, |a, b| a - b)?,
        (BinaryOpcode::Mul, a, b) => a.zip(b, |a, b| a * b)?,
        (BinaryOpcode::Div, a, b) => a.zip(b, |a, b| a / b)?,
        (BinaryOpcode::Min, a, b) => a.zip(b, f64::min)?,
        (BinaryOpcode::Max, a, b) => a.zip(b, f64::max)?,
    };
    Ok(out)
}
