//! Infrastructure for representing scenes and the expressions compiled from
//! them
//!
//! There are two tree types in this module:
//!
//! - A [`SceneNode`] is the authored scene: primitive calls, geometric
//!   transforms, and boolean combinators.
//! - An [`Expr`] is a distance expression over a (deferred) query point, which
//!   can be rendered to shader text or evaluated on the CPU.
//!
//! Both are immutable, reference-counted handles, so subtrees can be shared
//! freely (including across threads).
mod expr;
mod op;
mod scene;

pub use expr::{Expr, ExprOp};
pub use op::{Axis, BinaryOpcode, UnaryOpcode};
pub use scene::{
    BooleanKind, Literal, Param, SceneNode, SceneOp, TransformKind,
};

/// Fixed-precision number, as embedded in generated text
///
/// Values are rounded to [`Scalar::DECIMALS`] decimal places on construction,
/// so the value used by the CPU evaluator is exactly the value written into
/// the shader text.  Exact ties round away from zero.  Negative zero is
/// normalized to zero, meaning that any two numerically equal inputs produce
/// byte-identical text.
///
/// ```
/// # use sdfx::context::Scalar;
/// assert_eq!(Scalar::new(20.0).to_string(), "20.000");
/// assert_eq!(Scalar::new(0.12345).get(), 0.123);
/// assert_eq!(Scalar::new(0.0625).to_string(), "0.063");
/// assert_eq!(Scalar::new(-0.0001).to_string(), "0.000");
/// ```
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Scalar(f64);

impl Scalar {
    /// Number of decimal places in rendered text
    pub const DECIMALS: usize = 3;

    /// Builds a new scalar, rounding to [`Self::DECIMALS`] places
    pub fn new(v: f64) -> Self {
        let rounded = to_fixed(v, Self::DECIMALS)
            .parse::<f64>()
            .unwrap_or(v);
        if rounded == 0.0 {
            Self(0.0)
        } else {
            Self(rounded)
        }
    }

    /// Returns the (rounded) value
    pub fn get(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::new(v)
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.*}", Self::DECIMALS, self.0)
    }
}

/// Formats `v` with `decimals` places, rounding exact ties away from zero
///
/// Any other value is rounded to the nearest representable text, as with
/// `format!("{v:.N}")`.
pub(crate) fn to_fixed(v: f64, decimals: usize) -> String {
    // Exact decimal ties are the odd multiples of 2^-(decimals + 1)
    let t = v * 2f64.powi(decimals as i32 + 1);
    let v = if t.is_finite() && t.fract() == 0.0 && t % 2.0 != 0.0 {
        v + v.signum() * 0.5 * 10f64.powi(-(decimals as i32))
    } else {
        v
    };
    format!("{v:.decimals$}")
}

////////////////////////////////////////////////////////////////////////////////

/// Position of a node within a scene tree
///
/// Each step is the index of the argument (in `{op, args}` record order) that
/// leads to the next node: for a transform, the parameter is `args[0]` and the
/// child is `args[1]`; for a boolean operation, `left`, `right`, and `blend`
/// are `args[0..3]`.
///
/// ```
/// # use sdfx::context::NodePath;
/// let p = NodePath::root().child(1).child(0);
/// assert_eq!(p.to_string(), "args[1].args[0]");
/// assert_eq!(NodePath::root().to_string(), "root");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// Returns the path to the root node
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path, extended by one step
    pub fn child(&self, i: usize) -> Self {
        let mut out = self.clone();
        out.push(i);
        out
    }

    /// Extends this path by one step
    pub fn push(&mut self, i: usize) {
        self.0.push(i);
    }

    /// Removes the last step from this path
    pub fn pop(&mut self) -> Option<usize> {
        self.0.pop()
    }

    /// Returns the number of steps from the root
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether this is the root path
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the individual steps
    pub fn steps(&self) -> &[usize] {
        &self.0
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        for (i, s) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "args[{s}]")?;
        }
        Ok(())
    }
}
