//! Deferred distance expressions
use super::{
    op::{is_atomic, prec},
    Axis, BinaryOpcode, Scalar, UnaryOpcode,
};
use crate::Error;
use std::fmt::Write;
use std::sync::Arc;

/// Opcode type for expressions
///
/// Every expression is written in terms of a single free variable, the query
/// [`Point`](ExprOp::Point), whose text is only chosen when the expression is
/// rendered.
#[derive(Debug, PartialEq)]
pub enum ExprOp {
    /// The query point (a `vec2`)
    Point,
    /// Verbatim text, e.g. a primitive's `vec2(0.8, 0.9)` argument
    Literal(String),
    /// Fixed-precision number
    Const(Scalar),
    /// Function call, e.g. a primitive's distance function
    Call {
        /// Function name
        name: String,
        /// Arguments, in order
        args: Vec<Expr>,
    },
    /// Column-major `mat2(a, b, c, d)` constructor
    Mat2([Expr; 4]),
    /// Unary operation
    Unary(UnaryOpcode, Expr),
    /// Binary operation
    Binary(BinaryOpcode, Expr, Expr),
    /// Component of a vector
    Swizzle(Expr, Axis),
    /// Lazy substitution of the query point
    ///
    /// When rendered or evaluated, every [`Point`](ExprOp::Point) within
    /// `target` is replaced by `point` (which is itself written in terms of the
    /// outer query point).
    Remap {
        /// Expression being remapped
        target: Expr,
        /// New query point
        point: Expr,
    },
    /// Reconstructed operator that has no compiled form
    ///
    /// This is never valid output; rendering or evaluating it is an error.
    Unknown {
        /// Operator name
        name: String,
        /// Compiled arguments
        args: Vec<Expr>,
    },
}

/// Owned handle for an immutable distance expression
///
/// Equality is structural.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr(Arc<ExprOp>);

impl std::ops::Deref for Expr {
    type Target = ExprOp;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Expr {
        Expr::constant(v)
    }
}

impl From<Scalar> for Expr {
    fn from(v: Scalar) -> Expr {
        Expr(Arc::new(ExprOp::Const(v)))
    }
}

/// Text substituted for [`ExprOp::Point`] during rendering
#[derive(Copy, Clone)]
struct Coord<'a> {
    text: &'a str,
    prec: u8,
}

#[allow(missing_docs)]
impl Expr {
    pub fn point() -> Self {
        Expr(Arc::new(ExprOp::Point))
    }
    pub fn constant<S: Into<Scalar>>(s: S) -> Self {
        Expr::from(s.into())
    }
    pub fn literal(s: &str) -> Self {
        Expr(Arc::new(ExprOp::Literal(s.to_owned())))
    }
    pub fn call<I: IntoIterator<Item = Expr>>(name: &str, args: I) -> Self {
        Expr(Arc::new(ExprOp::Call {
            name: name.to_owned(),
            args: args.into_iter().collect(),
        }))
    }
    pub fn mat2(a: Expr, b: Expr, c: Expr, d: Expr) -> Self {
        Expr(Arc::new(ExprOp::Mat2([a, b, c, d])))
    }
    pub fn unknown<I: IntoIterator<Item = Expr>>(name: &str, args: I) -> Self {
        Expr(Arc::new(ExprOp::Unknown {
            name: name.to_owned(),
            args: args.into_iter().collect(),
        }))
    }
    fn op_unary(a: Expr, op: UnaryOpcode) -> Self {
        Expr(Arc::new(ExprOp::Unary(op, a)))
    }
    fn op_binary(a: Expr, b: Expr, op: BinaryOpcode) -> Self {
        Expr(Arc::new(ExprOp::Binary(op, a, b)))
    }
    pub fn abs(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Abs)
    }
    pub fn sin(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Sin)
    }
    pub fn cos(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Cos)
    }
    pub fn inverse(&self) -> Self {
        Self::op_unary(self.clone(), UnaryOpcode::Inverse)
    }
    pub fn min<T: Into<Expr>>(&self, other: T) -> Self {
        Self::op_binary(self.clone(), other.into(), BinaryOpcode::Min)
    }
    pub fn max<T: Into<Expr>>(&self, other: T) -> Self {
        Self::op_binary(self.clone(), other.into(), BinaryOpcode::Max)
    }
    pub fn x(&self) -> Self {
        Expr(Arc::new(ExprOp::Swizzle(self.clone(), Axis::X)))
    }
    pub fn y(&self) -> Self {
        Expr(Arc::new(ExprOp::Swizzle(self.clone(), Axis::Y)))
    }

    /// Substitutes `point` for the query point within this expression
    ///
    /// The substitution is lazy; it is not performed until the expression is
    /// rendered or evaluated.
    pub fn remap(&self, point: Expr) -> Self {
        Expr(Arc::new(ExprOp::Remap {
            target: self.clone(),
            point,
        }))
    }

    /// Returns a pointer to the inner [`ExprOp`]
    ///
    /// This can be used as a strong (but not unique) identity.
    pub fn as_ptr(&self) -> *const ExprOp {
        Arc::as_ptr(&self.0)
    }

    /// Renders this expression as shader text, using `coord` as the query
    /// point
    ///
    /// `coord` is inserted verbatim; if it isn't a single identifier, call, or
    /// parenthesized group, it is wrapped in parentheses where precedence
    /// requires it.
    ///
    /// ```
    /// # use sdfx::context::Expr;
    /// let p = Expr::point();
    /// let e = Expr::call("circle", [p.clone() / 2.0, Expr::literal("1.0")]);
    /// assert_eq!(e.render("center")?, "circle(center / 2.000, 1.0)");
    /// assert_eq!(e.render("a + b")?, "circle((a + b) / 2.000, 1.0)");
    /// # Ok::<(), sdfx::Error>(())
    /// ```
    pub fn render(&self, coord: &str) -> Result<String, Error> {
        let text = coord.trim();
        let coord = Coord {
            text,
            prec: if is_atomic(text) {
                prec::ATOM
            } else {
                prec::LOWEST
            },
        };
        let mut out = String::new();
        self.write(coord, &mut out)?;
        Ok(out)
    }

    /// Returns the name of the first [`ExprOp::Unknown`] node, if any
    pub fn find_unknown(&self) -> Option<&str> {
        match &*self.0 {
            ExprOp::Unknown { name, .. } => Some(name.as_str()),
            ExprOp::Point | ExprOp::Literal(..) | ExprOp::Const(..) => None,
            ExprOp::Call { args, .. } => {
                args.iter().find_map(|a| a.find_unknown())
            }
            ExprOp::Mat2(m) => m.iter().find_map(|a| a.find_unknown()),
            ExprOp::Unary(_, a) | ExprOp::Swizzle(a, _) => a.find_unknown(),
            ExprOp::Binary(_, a, b)
            | ExprOp::Remap {
                target: a,
                point: b,
            } => a.find_unknown().or_else(|| b.find_unknown()),
        }
    }

    /// Binding strength of this expression's rendered text
    fn prec(&self, coord: Coord) -> u8 {
        match &*self.0 {
            ExprOp::Point => coord.prec,
            ExprOp::Literal(s) => {
                if is_atomic(s) {
                    prec::ATOM
                } else {
                    prec::LOWEST
                }
            }
            ExprOp::Const(c) => {
                if c.get() < 0.0 {
                    prec::PREFIX
                } else {
                    prec::ATOM
                }
            }
            ExprOp::Unary(UnaryOpcode::Neg, _) => prec::PREFIX,
            ExprOp::Binary(op, ..) => op.precedence(),
            ExprOp::Remap { target, .. } => target.prec(Coord {
                text: "",
                prec: prec::ATOM,
            }),
            ExprOp::Call { .. }
            | ExprOp::Mat2(..)
            | ExprOp::Unary(..)
            | ExprOp::Swizzle(..)
            | ExprOp::Unknown { .. } => prec::ATOM,
        }
    }

    /// Writes this expression, wrapping it if it binds looser than `min`
    fn write_operand(
        &self,
        coord: Coord,
        min: u8,
        out: &mut String,
    ) -> Result<(), Error> {
        if self.prec(coord) < min {
            out.push('(');
            self.write(coord, out)?;
            out.push(')');
            Ok(())
        } else {
            self.write(coord, out)
        }
    }

    fn write_args<'a, I: IntoIterator<Item = &'a Expr>>(
        name: &str,
        args: I,
        coord: Coord,
        out: &mut String,
    ) -> Result<(), Error> {
        out.push_str(name);
        out.push('(');
        for (i, a) in args.into_iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            a.write(coord, out)?;
        }
        out.push(')');
        Ok(())
    }

    fn write(&self, coord: Coord, out: &mut String) -> Result<(), Error> {
        match &*self.0 {
            ExprOp::Point => out.push_str(coord.text),
            ExprOp::Literal(s) => out.push_str(s),
            ExprOp::Const(c) => write!(out, "{c}").unwrap(),
            ExprOp::Call { name, args } => {
                Self::write_args(name, args, coord, out)?
            }
            ExprOp::Mat2(m) => Self::write_args("mat2", m, coord, out)?,
            ExprOp::Unary(op, a) => match op.function_name() {
                Some(name) => Self::write_args(name, [a], coord, out)?,
                None => {
                    // Strictly tighter than prefix, so we never emit `--a`
                    out.push('-');
                    a.write_operand(coord, prec::ATOM, out)?;
                }
            },
            ExprOp::Binary(op, a, b) => match op.symbol() {
                Some(sym) => {
                    let p = op.precedence();
                    a.write_operand(coord, p, out)?;
                    write!(out, " {sym} ").unwrap();
                    b.write_operand(coord, p + 1, out)?;
                }
                None => {
                    let name = op.function_name().unwrap_or_default();
                    Self::write_args(name, [a, b], coord, out)?
                }
            },
            ExprOp::Swizzle(a, axis) => {
                a.write_operand(coord, prec::ATOM, out)?;
                out.push('.');
                out.push_str(axis.name());
            }
            ExprOp::Remap { target, point } => {
                let mut inner = String::new();
                point.write_operand(coord, prec::ATOM, &mut inner)?;
                target.write(
                    Coord {
                        text: &inner,
                        prec: prec::ATOM,
                    },
                    out,
                )?;
            }
            ExprOp::Unknown { name, .. } => {
                return Err(Error::UnknownOperator(name.clone()));
            }
        }
        Ok(())
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::op_unary(self, UnaryOpcode::Neg)
    }
}

macro_rules! impl_binary {
    ($op:ident, $base_fn:ident) => {
        impl<A: Into<Expr>> std::ops::$op<A> for Expr {
            type Output = Self;

            fn $base_fn(self, other: A) -> Self {
                Self::op_binary(self, other.into(), BinaryOpcode::$op)
            }
        }
        impl std::ops::$op<Expr> for f64 {
            type Output = Expr;
            fn $base_fn(self, other: Expr) -> Expr {
                Expr::op_binary(self.into(), other, BinaryOpcode::$op)
            }
        }
    };
}

impl_binary!(Add, add);
impl_binary!(Sub, sub);
impl_binary!(Mul, mul);
impl_binary!(Div, div);

#[cfg(test)]
mod test {
    use super::*;

    fn p() -> Expr {
        Expr::point()
    }

    #[test]
    fn render_point() {
        assert_eq!(p().render("center").unwrap(), "center");
        assert_eq!(p().render("  center ").unwrap(), "center");
        assert_eq!(p().x().render("center").unwrap(), "center.x");
        assert_eq!(p().x().render("a + b").unwrap(), "(a + b).x");
    }

    #[test]
    fn render_precedence() {
        let e = (p().x() - 1.0) * 2.0;
        assert_eq!(e.render("p").unwrap(), "(p.x - 1.000) * 2.000");

        let e = p().x() - (p().y() - 1.0);
        assert_eq!(e.render("p").unwrap(), "p.x - (p.y - 1.000)");

        let e = p().x() - p().y() - 1.0;
        assert_eq!(e.render("p").unwrap(), "p.x - p.y - 1.000");

        let e = p().x() / (p().y() * 2.0);
        assert_eq!(e.render("p").unwrap(), "p.x / (p.y * 2.000)");
    }

    #[test]
    fn render_negation() {
        assert_eq!((-p().x()).render("p").unwrap(), "-p.x");
        assert_eq!((-(p().x() + 1.0)).render("p").unwrap(), "-(p.x + 1.000)");
        assert_eq!((-(-p().x())).render("p").unwrap(), "-(-p.x)");
        assert_eq!((-Expr::constant(-0.5)).render("p").unwrap(), "-(-0.500)");
        assert_eq!(
            (p().x() - Expr::constant(-0.5)).render("p").unwrap(),
            "p.x - -0.500"
        );
    }

    #[test]
    fn render_calls() {
        let e = p().x().min(p().y()).abs();
        assert_eq!(e.render("p").unwrap(), "abs(min(p.x, p.y))");
        let (one, zero) = (Expr::constant(1.0), Expr::constant(0.0));
        let m = Expr::mat2(one.clone(), zero.clone(), zero, one);
        assert_eq!(
            (m.inverse() * p()).render("p").unwrap(),
            "inverse(mat2(1.000, 0.000, 0.000, 1.000)) * p"
        );
    }

    #[test]
    fn render_remap() {
        let inner = Expr::call("circle", [p(), Expr::literal("0.5")]);
        let moved = inner.remap(p() - Expr::literal("vec2(1.0, 0.0)"));
        assert_eq!(
            moved.render("center").unwrap(),
            "circle((center - vec2(1.0, 0.0)), 0.5)"
        );
        assert_eq!(
            moved.render("center").unwrap(),
            inner.render("(center - vec2(1.0, 0.0))").unwrap()
        );

        // Nested remapping sees the parent's substituted point
        let twice = moved.remap(p() * 2.0);
        assert_eq!(
            twice.render("q").unwrap(),
            "circle(((q * 2.000) - vec2(1.0, 0.0)), 0.5)"
        );
    }

    #[test]
    fn render_unknown() {
        let e = Expr::unknown("FOOBAR", [p()]).min(p().x());
        assert!(matches!(
            e.render("p"),
            Err(Error::UnknownOperator(s)) if s == "FOOBAR"
        ));
        assert_eq!(e.find_unknown(), Some("FOOBAR"));
        assert_eq!(p().x().find_unknown(), None);
    }

    #[test]
    fn structural_eq() {
        let a = Expr::call("circle", [p(), Expr::constant(1.0)]);
        let b = Expr::call("circle", [p(), Expr::constant(1.0)]);
        assert_eq!(a, b);
        assert_ne!(a.as_ptr(), b.as_ptr());
        assert_ne!(a, Expr::call("circle", [p(), Expr::constant(2.0)]));
    }
}
