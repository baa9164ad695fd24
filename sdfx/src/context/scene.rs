//! Authored scene trees
use crate::{context::Scalar, Error};
use std::sync::Arc;

/// Geometric transform applied to a single child
///
/// Keywords are the upper-case variant names (`NOOP`, `TRANSLATE`, ...).
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum TransformKind {
    /// Passthrough; the parameter carries non-geometric metadata
    Noop,
    /// Moves the child by the parameter (isometry)
    Translate,
    /// Rotates the child by the parameter, in radians (isometry)
    Rotate,
    /// Uniformly scales the child, re-scaling the returned distance
    Scale,
    /// Turns a filled region into a shell of the given half-thickness
    Hollow,
    /// Dilates (or, with a negative parameter, erodes) the child
    Melt,
    /// Position-dependent rotation; not distance-preserving
    Bend,
    /// Sinusoidal perturbation of the distance value; not distance-preserving
    Displace,
}

/// Boolean combinator over two children
#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Eq,
    PartialEq,
    strum::EnumString,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
)]
pub enum BooleanKind {
    /// Union of both shapes
    #[strum(serialize = "UNITE")]
    Unite,
    /// Removes the first shape from the second
    #[strum(serialize = "SUBTRACT")]
    Subtract,
    /// Intersection of both shapes
    #[strum(serialize = "INTERSECT")]
    Intersect,
    /// Union with a blended seam
    #[strum(serialize = "SMUNITE")]
    SmoothUnite,
    /// Subtraction with a blended seam
    #[strum(serialize = "SMUTRACT")]
    SmoothSubtract,
    /// Intersection with a blended seam
    #[strum(serialize = "SMUSECT")]
    SmoothIntersect,
}

impl BooleanKind {
    /// Checks whether this operation takes a blend radius
    pub fn is_smooth(&self) -> bool {
        matches!(
            self,
            BooleanKind::SmoothUnite
                | BooleanKind::SmoothSubtract
                | BooleanKind::SmoothIntersect
        )
    }
}

/// Argument to a primitive call, passed through after the query point
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Number, rendered with fixed precision
    Number(f64),
    /// Pre-formatted text (e.g. `vec2(0.8, 0.9)`), rendered verbatim
    Text(String),
}

/// Transform parameter
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    /// Number, rendered with fixed precision
    Number(f64),
    /// Pre-formatted text
    ///
    /// Scalar parameters must parse as a number and are re-rendered with fixed
    /// precision; `TRANSLATE` offsets are embedded verbatim.
    Text(String),
    /// Computed parameter, evaluated at the current query point
    Node(SceneNode),
    /// Opaque metadata (e.g. a `NOOP`'s authoring history)
    ///
    /// This is carried through record conversion but never interpreted.
    Meta(serde_json::Value),
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Number(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Text(v.to_owned())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Text(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Number(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_owned())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<SceneNode> for Param {
    fn from(v: SceneNode) -> Self {
        Param::Node(v)
    }
}

impl From<Literal> for Param {
    fn from(v: Literal) -> Self {
        match v {
            Literal::Number(f) => Param::Number(f),
            Literal::Text(s) => Param::Text(s),
        }
    }
}

/// Node type for scene trees
#[derive(Debug, PartialEq)]
pub enum SceneOp {
    /// Call to an externally-defined primitive, `name(p, args...)`
    Atom {
        /// Primitive name (conventionally lower-case)
        name: String,
        /// Additional literal arguments
        args: Vec<Literal>,
    },
    /// Unary geometric transform
    Transform {
        /// Transform keyword
        kind: TransformKind,
        /// Transform parameter
        param: Param,
        /// Transformed shape
        child: SceneNode,
    },
    /// Boolean combinator
    ///
    /// `blend` is present if and only if `kind` is a smooth variant.
    Boolean {
        /// Combinator keyword
        kind: BooleanKind,
        /// First operand
        left: SceneNode,
        /// Second operand
        right: SceneNode,
        /// Blend radius, compiled and evaluated at the query point
        blend: Option<SceneNode>,
    },
    /// Unrecognized upper-case operator
    Unknown {
        /// Operator name
        name: String,
        /// Operator arguments
        args: Vec<Param>,
    },
}

/// Owned handle for an immutable scene tree
///
/// Cloning is cheap (it's an `Arc`), so subtrees may be shared between
/// multiple parents.  Equality is structural.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode(Arc<SceneOp>);

impl std::ops::Deref for SceneNode {
    type Target = SceneOp;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SceneNode {
    /// Builds a primitive call
    ///
    /// ```
    /// # use sdfx::context::SceneNode;
    /// let c = SceneNode::atom("circle", [1.0]);
    /// assert_eq!(c.to_string(), "circle(1.000)");
    /// ```
    pub fn atom<I, L>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Self(Arc::new(SceneOp::Atom {
            name: name.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
        }))
    }

    /// Builds a transform node
    pub fn transform<P: Into<Param>>(
        kind: TransformKind,
        param: P,
        child: SceneNode,
    ) -> Self {
        Self(Arc::new(SceneOp::Transform {
            kind,
            param: param.into(),
            child,
        }))
    }

    /// Builds a boolean node, checking that `blend` matches `kind`
    pub fn boolean(
        kind: BooleanKind,
        left: SceneNode,
        right: SceneNode,
        blend: Option<SceneNode>,
    ) -> Result<Self, Error> {
        match (kind.is_smooth(), blend.is_some()) {
            (true, false) => Err(Error::MissingBlend(kind)),
            (false, true) => Err(Error::UnexpectedBlend(kind)),
            _ => Ok(Self(Arc::new(SceneOp::Boolean {
                kind,
                left,
                right,
                blend,
            }))),
        }
    }

    /// Builds a node for an operator that the compiler doesn't recognize
    pub fn unknown<I, P>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        Self(Arc::new(SceneOp::Unknown {
            name: name.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
        }))
    }

    fn op_boolean(self, kind: BooleanKind, other: SceneNode) -> Self {
        Self(Arc::new(SceneOp::Boolean {
            kind,
            left: self,
            right: other,
            blend: None,
        }))
    }

    fn op_smooth(
        self,
        kind: BooleanKind,
        other: SceneNode,
        blend: SceneNode,
    ) -> Self {
        Self(Arc::new(SceneOp::Boolean {
            kind,
            left: self,
            right: other,
            blend: Some(blend),
        }))
    }

    /// Wraps this node in a `NOOP` carrying the given metadata
    pub fn noop<P: Into<Param>>(&self, meta: P) -> Self {
        Self::transform(TransformKind::Noop, meta, self.clone())
    }
    /// Moves this shape by `d` (a number or pre-formatted vector text)
    pub fn translate<P: Into<Param>>(&self, d: P) -> Self {
        Self::transform(TransformKind::Translate, d, self.clone())
    }
    /// Rotates this shape by `angle` radians
    pub fn rotate<P: Into<Param>>(&self, angle: P) -> Self {
        Self::transform(TransformKind::Rotate, angle, self.clone())
    }
    /// Scales this shape uniformly
    pub fn scale<P: Into<Param>>(&self, s: P) -> Self {
        Self::transform(TransformKind::Scale, s, self.clone())
    }
    /// Hollows this shape into a shell with half-thickness `r`
    pub fn hollow<P: Into<Param>>(&self, r: P) -> Self {
        Self::transform(TransformKind::Hollow, r, self.clone())
    }
    /// Rounds this shape by `r`
    pub fn melt<P: Into<Param>>(&self, r: P) -> Self {
        Self::transform(TransformKind::Melt, r, self.clone())
    }
    /// Bends this shape with strength `k`
    pub fn bend<P: Into<Param>>(&self, k: P) -> Self {
        Self::transform(TransformKind::Bend, k, self.clone())
    }
    /// Displaces this shape's distance with frequency `k`
    pub fn displace<P: Into<Param>>(&self, k: P) -> Self {
        Self::transform(TransformKind::Displace, k, self.clone())
    }

    /// Union of `self` and `other`
    pub fn unite(&self, other: &SceneNode) -> Self {
        self.clone().op_boolean(BooleanKind::Unite, other.clone())
    }
    /// Removes `self` from `other`
    pub fn subtract(&self, other: &SceneNode) -> Self {
        self.clone().op_boolean(BooleanKind::Subtract, other.clone())
    }
    /// Intersection of `self` and `other`
    pub fn intersect(&self, other: &SceneNode) -> Self {
        self.clone().op_boolean(BooleanKind::Intersect, other.clone())
    }
    /// Smooth union with blend radius `k`
    pub fn smooth_unite(&self, other: &SceneNode, k: &SceneNode) -> Self {
        self.clone()
            .op_smooth(BooleanKind::SmoothUnite, other.clone(), k.clone())
    }
    /// Smooth subtraction with blend radius `k`
    pub fn smooth_subtract(&self, other: &SceneNode, k: &SceneNode) -> Self {
        self.clone()
            .op_smooth(BooleanKind::SmoothSubtract, other.clone(), k.clone())
    }
    /// Smooth intersection with blend radius `k`
    pub fn smooth_intersect(&self, other: &SceneNode, k: &SceneNode) -> Self {
        self.clone().op_smooth(
            BooleanKind::SmoothIntersect,
            other.clone(),
            k.clone(),
        )
    }

    /// Returns the operator name, as used in `{op, args}` records
    pub fn op_name(&self) -> &str {
        match &*self.0 {
            SceneOp::Atom { name, .. } | SceneOp::Unknown { name, .. } => name,
            SceneOp::Transform { kind, .. } => (*kind).into(),
            SceneOp::Boolean { kind, .. } => (*kind).into(),
        }
    }

    /// Iterates over child nodes, in argument order
    ///
    /// Node-valued parameters are included.
    pub fn children(&self) -> impl Iterator<Item = &SceneNode> {
        let out: Vec<&SceneNode> = match &*self.0 {
            SceneOp::Atom { .. } => vec![],
            SceneOp::Transform { param, child, .. } => match param {
                Param::Node(n) => vec![n, child],
                _ => vec![child],
            },
            SceneOp::Boolean {
                left, right, blend, ..
            } => [Some(left), Some(right), blend.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            SceneOp::Unknown { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    Param::Node(n) => Some(n),
                    _ => None,
                })
                .collect(),
        };
        out.into_iter()
    }

    /// Returns the depth of the tree (a lone atom has depth 1)
    pub fn depth(&self) -> usize {
        1 + self.children().map(|c| c.depth()).max().unwrap_or(0)
    }

    /// Returns the number of nodes in the tree, counting shared nodes once per
    /// reference
    pub fn len(&self) -> usize {
        1 + self.children().map(|c| c.len()).sum::<usize>()
    }

    /// Always false; a tree contains at least its root
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Number(v) => write!(f, "{}", Scalar::new(*v)),
            Literal::Text(s) => write!(f, "{s}"),
        }
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Param::Number(v) => write!(f, "{}", Scalar::new(*v)),
            Param::Text(s) => write!(f, "{s}"),
            Param::Node(n) => write!(f, "{n}"),
            Param::Meta(v) => write!(f, "{v}"),
        }
    }
}

/// Compact `OP(arg, arg, ...)` notation, for logging and debugging
impl std::fmt::Display for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn list<T: std::fmt::Display>(
            f: &mut std::fmt::Formatter<'_>,
            items: impl IntoIterator<Item = T>,
        ) -> std::fmt::Result {
            for (i, a) in items.into_iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{a}")?;
            }
            Ok(())
        }
        write!(f, "{}(", self.op_name())?;
        match &*self.0 {
            SceneOp::Atom { args, .. } => list(f, args)?,
            SceneOp::Transform { param, child, .. } => {
                write!(f, "{param}, {child}")?
            }
            SceneOp::Boolean {
                left, right, blend, ..
            } => {
                let children = [Some(left), Some(right), blend.as_ref()];
                list(f, children.into_iter().flatten())?
            }
            SceneOp::Unknown { args, .. } => list(f, args)?,
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn keywords() {
        assert_eq!(TransformKind::Noop.to_string(), "NOOP");
        assert_eq!(TransformKind::Displace.to_string(), "DISPLACE");
        assert_eq!(
            TransformKind::from_str("TRANSLATE").unwrap(),
            TransformKind::Translate
        );
        assert!(TransformKind::from_str("translate").is_err());
        assert_eq!(
            BooleanKind::from_str("SMUSECT").unwrap(),
            BooleanKind::SmoothIntersect
        );
        assert_eq!(BooleanKind::SmoothSubtract.to_string(), "SMUTRACT");
        for k in TransformKind::iter() {
            let s: &str = k.into();
            assert!(s.chars().all(|c| c.is_ascii_uppercase()));
            assert!(BooleanKind::from_str(s).is_err());
        }
        assert_eq!(BooleanKind::iter().filter(|k| k.is_smooth()).count(), 3);
    }

    #[test]
    fn blend_invariant() {
        let a = SceneNode::atom("circle", [0.5]);
        let b = SceneNode::atom("heart", Vec::<Literal>::new());
        let k = SceneNode::atom("blend", Vec::<Literal>::new());
        let boolean = |kind, blend: Option<&SceneNode>| {
            SceneNode::boolean(kind, a.clone(), b.clone(), blend.cloned())
        };
        assert!(matches!(
            boolean(BooleanKind::SmoothUnite, None),
            Err(Error::MissingBlend(BooleanKind::SmoothUnite))
        ));
        assert!(matches!(
            boolean(BooleanKind::Unite, Some(&k)),
            Err(Error::UnexpectedBlend(BooleanKind::Unite))
        ));
        let s = boolean(BooleanKind::SmoothUnite, Some(&k)).unwrap();
        assert_eq!(s, a.smooth_unite(&b, &k));
    }

    #[test]
    fn display() {
        let s = SceneNode::atom("boxAtom", ["vec2(0.8, 0.9)"])
            .rotate("20.0")
            .noop("666");
        assert_eq!(
            s.to_string(),
            "NOOP(666, ROTATE(20.0, boxAtom(vec2(0.8, 0.9))))"
        );
        let heart = SceneNode::atom("heart", Vec::<Literal>::new());
        let u = SceneNode::atom("circle", [1.0]).unite(&heart);
        assert_eq!(u.to_string(), "UNITE(circle(1.000), heart())");
    }

    #[test]
    fn depth_and_len() {
        let a = SceneNode::atom("circle", [0.5]);
        assert_eq!(a.depth(), 1);
        assert_eq!(a.len(), 1);
        let s = a.scale(2.0).unite(&a.translate("vec2(0.1, 0.0)"));
        assert_eq!(s.depth(), 3);
        assert_eq!(s.len(), 5);

        let r = a.rotate(SceneNode::atom("angle", Vec::<Literal>::new()));
        assert_eq!(r.children().count(), 2);
    }

    #[test]
    fn op_names() {
        let a = SceneNode::atom("circle", [0.5]);
        assert_eq!(a.op_name(), "circle");
        assert_eq!(a.melt(0.1).op_name(), "MELT");
        assert_eq!(a.subtract(&a).op_name(), "SUBTRACT");
        assert_eq!(SceneNode::unknown("FOOBAR", [a]).op_name(), "FOOBAR");
    }
}
