//! Scene-to-expression compiler
//!
//! The compiler walks a [`SceneNode`] and builds a deferred [`Expr`], written
//! in terms of a query point that is only chosen when the result is rendered.
//! Transforms that move the query point (`TRANSLATE`, `ROTATE`, `SCALE`,
//! `BEND`) wrap their child in a lazy [`remap`](Expr::remap), so nested
//! transforms see their parent's already-substituted point.
//!
//! | Operator | Distance at point `x` |
//! |----------|-----------------------|
//! | `name(args..)` | `name(x, args..)` |
//! | `NOOP(meta, a)` | `a(x)` |
//! | `TRANSLATE(d, a)` | `a(x - d)` |
//! | `ROTATE(θ, a)` | `a(inverse(R(θ)) * x)` |
//! | `SCALE(s, a)` | `s * a(x / s)` |
//! | `HOLLOW(r, a)` | `abs(a(x)) - r` |
//! | `MELT(r, a)` | `a(x) - r` |
//! | `BEND(k, a)` | `a(R(-k * x.x) * x)` |
//! | `DISPLACE(k, a)` | `a(x) + sin(k * x.x) * sin(k * x.y)` |
//! | `UNITE(a, b)` | `min(A, B)` |
//! | `SUBTRACT(a, b)` | `max(-A, B)` |
//! | `INTERSECT(a, b)` | `max(A, B)` |
//! | `SMUNITE(a, b, k)` | `min(A, B) - s(A - B)` |
//! | `SMUTRACT(a, b, k)` | `-min(A, -B) - s(A + B)` |
//! | `SMUSECT(a, b, k)` | `-min(-A, -B) - s(-A + B)` |
//!
//! where `s(g) = h² / 4K` with `h = max(K - abs(g), 0)`.
//!
//! `BEND` and `DISPLACE` are approximate effects; their output is not a true
//! distance field.
use crate::{
    context::{
        BooleanKind, Expr, ExprOp, Literal, NodePath, Param, Scalar,
        SceneNode, SceneOp, TransformKind,
    },
    eval::{Atoms, Evaluator},
    Error,
};
use log::{debug, trace, warn};

/// What to do when the compiler meets an unrecognized operator
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnknownPolicy {
    /// Reconstruct the operator as [`ExprOp::Unknown`], with its arguments
    /// compiled
    ///
    /// Compilation succeeds, but rendering or evaluating the result fails with
    /// [`Error::UnknownOperator`].
    #[default]
    Defer,

    /// Fail immediately with [`Error::UnknownOperator`]
    Reject,
}

/// Settings for compilation
#[derive(Copy, Clone, Debug, Default)]
pub struct CompileConfig {
    /// Handling of unrecognized operators
    pub unknown: UnknownPolicy,

    /// Maximum scene depth, or `None` for no limit
    ///
    /// Compilation recurses once per level of the scene tree.
    pub max_depth: Option<usize>,
}

impl CompileConfig {
    /// Compiles a scene using this configuration
    pub fn compile(&self, node: &SceneNode) -> Result<Compiled, Error> {
        debug!(
            "compiling scene with {} nodes (depth {})",
            node.len(),
            node.depth()
        );
        let mut c = Compiler {
            cfg: self,
            path: NodePath::root(),
        };
        let root = c.node(node)?;
        Ok(Compiled { root })
    }
}

/// Compiles a scene with the default configuration
///
/// ```
/// use sdfx::context::SceneNode;
///
/// let scene = SceneNode::atom("circle", ["1.0"]).scale(0.5);
/// let c = sdfx::compile(&scene)?;
/// assert_eq!(c.apply("p")?, "0.500 * circle((p / 0.500), 1.0)");
/// # Ok::<(), sdfx::Error>(())
/// ```
pub fn compile(node: &SceneNode) -> Result<Compiled, Error> {
    CompileConfig::default().compile(node)
}

////////////////////////////////////////////////////////////////////////////////

/// Compiled scene: a distance expression waiting for its query point
///
/// This is cheap to clone and may be shared between threads.
#[derive(Clone, Debug, PartialEq)]
pub struct Compiled {
    root: Expr,
}

impl Compiled {
    /// Renders the distance expression with `coord` as the query point
    ///
    /// The output is valid as the right-hand side of a `float` assignment,
    /// given a valid `vec2` coordinate expression.  Fails with
    /// [`Error::UnknownOperator`] if the scene contained an unrecognized
    /// operator.
    pub fn apply(&self, coord: &str) -> Result<String, Error> {
        self.root.render(coord)
    }

    /// Evaluates the distance at the given point
    pub fn eval<A: Atoms + ?Sized>(
        &self,
        atoms: &A,
        x: f64,
        y: f64,
    ) -> Result<f64, Error> {
        Evaluator::new(atoms).eval(&self.root, x, y)
    }

    /// Returns the root expression
    pub fn expr(&self) -> &Expr {
        &self.root
    }

    /// If the root is a reconstructed unknown operator, returns its name and
    /// compiled arguments
    pub fn unknown(&self) -> Option<(&str, &[Expr])> {
        match &*self.root {
            ExprOp::Unknown { name, args } => {
                Some((name.as_str(), args.as_slice()))
            }
            _ => None,
        }
    }
}

impl From<Compiled> for Expr {
    fn from(c: Compiled) -> Self {
        c.root
    }
}

////////////////////////////////////////////////////////////////////////////////

struct Compiler<'a> {
    cfg: &'a CompileConfig,
    path: NodePath,
}

impl Compiler<'_> {
    /// Runs `f` with argument `i` appended to the current path
    fn at<T, F>(&mut self, i: usize, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut Self) -> Result<T, Error>,
    {
        self.path.push(i);
        let out = f(self);
        self.path.pop();
        out
    }

    fn node(&mut self, node: &SceneNode) -> Result<Expr, Error> {
        if let Some(max) = self.cfg.max_depth {
            if self.path.len() >= max {
                return Err(Error::DepthLimit(max));
            }
        }
        trace!("compiling `{}` at {}", node.op_name(), self.path);
        match &**node {
            SceneOp::Atom { name, args } => {
                let args = args
                    .iter()
                    .enumerate()
                    .map(|(i, a)| self.at(i, |c| c.literal(a)))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::call(
                    name,
                    std::iter::once(Expr::point()).chain(args),
                ))
            }
            SceneOp::Transform { kind, param, child } => {
                self.transform(*kind, param, child)
            }
            SceneOp::Boolean {
                kind,
                left,
                right,
                blend,
            } => self.boolean(*kind, left, right, blend.as_ref()),
            SceneOp::Unknown { name, args } => self.unknown(name, args),
        }
    }

    fn transform(
        &mut self,
        kind: TransformKind,
        param: &Param,
        child: &SceneNode,
    ) -> Result<Expr, Error> {
        // The metadata of a NOOP is never looked at
        if kind == TransformKind::Noop {
            return self.at(1, |c| c.node(child));
        }
        let v = self.at(0, |c| match kind {
            TransformKind::Translate => c.offset(param),
            _ => c.scalar(param),
        })?;
        let inner = self.at(1, |c| c.node(child))?;
        let x = Expr::point();

        let out = match kind {
            TransformKind::Noop => inner,
            TransformKind::Translate => inner.remap(x - v),
            TransformKind::Rotate => {
                let m = Expr::mat2(v.cos(), v.sin(), -v.sin(), v.cos());
                inner.remap(m.inverse() * x)
            }
            TransformKind::Scale => v.clone() * inner.remap(x / v),
            TransformKind::Hollow => inner.abs() - v,
            TransformKind::Melt => inner - v,
            TransformKind::Bend => {
                let a = v * x.x();
                let m = Expr::mat2(a.cos(), -a.sin(), a.sin(), a.cos());
                inner.remap(m * x)
            }
            TransformKind::Displace => {
                inner + (v.clone() * x.x()).sin() * (v * x.y()).sin()
            }
        };
        Ok(out)
    }

    fn boolean(
        &mut self,
        kind: BooleanKind,
        left: &SceneNode,
        right: &SceneNode,
        blend: Option<&SceneNode>,
    ) -> Result<Expr, Error> {
        let a = self.at(0, |c| c.node(left))?;
        let b = self.at(1, |c| c.node(right))?;
        let k = match blend {
            Some(k) => Some(self.at(2, |c| c.node(k))?),
            None => None,
        };

        let out = match (kind, k) {
            (BooleanKind::Unite, None) => a.min(b),
            (BooleanKind::Subtract, None) => (-a).max(b),
            (BooleanKind::Intersect, None) => a.max(b),
            (BooleanKind::SmoothUnite, Some(k)) => {
                smooth(a.min(b.clone()), a - b, k)
            }
            (BooleanKind::SmoothSubtract, Some(k)) => {
                smooth(-a.min(-b.clone()), a + b, k)
            }
            (BooleanKind::SmoothIntersect, Some(k)) => {
                smooth(-(-a.clone()).min(-b.clone()), -a + b, k)
            }
            (kind, Some(..)) => return Err(Error::UnexpectedBlend(kind)),
            (kind, None) => return Err(Error::MissingBlend(kind)),
        };
        Ok(out)
    }

    fn unknown(&mut self, name: &str, args: &[Param]) -> Result<Expr, Error> {
        if self.cfg.unknown == UnknownPolicy::Reject {
            return Err(Error::UnknownOperator(name.to_owned()));
        }
        warn!("unknown operator `{name}` at {}; reconstructing it", self.path);
        let args = args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                self.at(i, |c| match a {
                    Param::Node(n) => c.node(n),
                    Param::Number(v) => c.finite(*v, || v.to_string()),
                    Param::Text(s) => Ok(Expr::literal(s)),
                    Param::Meta(v) => Ok(Expr::literal(&v.to_string())),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Expr::unknown(name, args))
    }

    /// Converts a scalar parameter into an expression
    ///
    /// Numbers (and numeric text) become fixed-precision constants; node
    /// parameters are compiled and evaluated at the current query point.
    fn scalar(&mut self, param: &Param) -> Result<Expr, Error> {
        match param {
            Param::Number(v) => self.finite(*v, || v.to_string()),
            Param::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) => self.finite(v, || s.clone()),
                Err(_) => Err(Error::BadParam {
                    path: self.path.clone(),
                    text: s.clone(),
                }),
            },
            Param::Node(n) => self.node(n),
            Param::Meta(v) => Err(Error::BadParam {
                path: self.path.clone(),
                text: v.to_string(),
            }),
        }
    }

    /// Converts a primitive's literal argument into an expression
    ///
    /// Numbers must be finite; text is passed through verbatim.
    fn literal(&self, a: &Literal) -> Result<Expr, Error> {
        match a {
            Literal::Number(v) => self.finite(*v, || v.to_string()),
            Literal::Text(s) => Ok(Expr::literal(s)),
        }
    }

    /// Converts a `TRANSLATE` offset into an expression
    ///
    /// Unlike scalar parameters, text is embedded verbatim, since offsets are
    /// usually vectors (e.g. `vec2(0.1, 0.2)`).
    fn offset(&mut self, param: &Param) -> Result<Expr, Error> {
        match param {
            Param::Text(s) if s.trim().is_empty() => {
                Err(Error::malformed(&self.path, "empty offset"))
            }
            Param::Text(s) => Ok(Expr::literal(s.trim())),
            _ => self.scalar(param),
        }
    }

    fn finite<F: FnOnce() -> String>(
        &self,
        v: f64,
        text: F,
    ) -> Result<Expr, Error> {
        if v.is_finite() {
            Ok(Expr::constant(Scalar::new(v)))
        } else {
            Err(Error::BadParam {
                path: self.path.clone(),
                text: text(),
            })
        }
    }
}

/// Builds the smooth-minimum correction shared by the smooth combinators
///
/// Returns `base - h * h * 0.25 / k`, where `h = max(k - abs(gap), 0)`.
fn smooth(base: Expr, gap: Expr, k: Expr) -> Expr {
    let h = (k.clone() - gap.abs()).max(0.0);
    base - h.clone() * h * 0.25 / k
}
