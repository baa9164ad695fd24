//! `sdfx` compiles 2D signed-distance-field scenes into shader expressions.
//!
//! A **signed distance field** is a function `f(p)` over a 2D point `p`,
//! which returns the distance from `p` to the boundary of a shape: negative
//! inside, positive outside, and zero on the boundary.
//!
//! A **scene** is a small tree of operators: leaves are calls to primitive
//! distance functions (`circle`, `boxAtom`, ...), which are defined elsewhere
//! (e.g. in the shader that will use the output); interior nodes are
//! geometric transforms (`TRANSLATE`, `ROTATE`, `SCALE`, ...) and boolean
//! combinators (`UNITE`, `SUBTRACT`, `SMUNITE`, ...).
//!
//! Compiling a scene produces a single scalar expression over a query point,
//! suitable for the right-hand side of a `float` assignment in a pixel shader.
//!
//! # Scene construction
//! Scenes are immutable trees of [`SceneNode`](context::SceneNode) handles,
//! which can be built with methods:
//!
//! ```
//! use sdfx::context::SceneNode;
//!
//! let body = SceneNode::atom("boxAtom", ["vec2(0.8, 0.9)"]);
//! let scene = body.rotate(20.0).scale(0.5);
//! ```
//!
//! Scenes may also be read from `{op, args}` [records](record::Record), which
//! is how they're usually stored on disk:
//!
//! ```
//! use sdfx::{context::SceneNode, record::Record};
//!
//! let r = Record::from_json(r#"
//!     {"op": "SCALE", "args": ["0.5", {"op": "circle", "args": ["1.0"]}]}
//! "#.as_bytes())?;
//! let scene = SceneNode::try_from(&r)?;
//! # Ok::<(), sdfx::Error>(())
//! ```
//!
//! With the `rhai` feature enabled (on by default), scenes can be built from
//! [Rhai](https://rhai.rs) scripts, using the [`sdfx::rhai`](crate::rhai)
//! namespace.
//!
//! # Compilation
//! [`compile`] turns a scene into a [`Compiled`] expression, which is waiting
//! for the name of its query point:
//!
//! ```
//! use sdfx::context::SceneNode;
//!
//! let scene = SceneNode::atom("boxAtom", ["vec2(0.8, 0.9)"])
//!     .translate("vec2(0.1, 0.2)");
//! let c = sdfx::compile(&scene)?;
//! assert_eq!(
//!     c.apply("center")?,
//!     "boxAtom((center - vec2(0.1, 0.2)), vec2(0.8, 0.9))"
//! );
//! # Ok::<(), sdfx::Error>(())
//! ```
//!
//! Compilation is deterministic: numeric parameters are rendered with exactly
//! three decimal places, so scenes with numerically equal parameters produce
//! byte-identical text.  Behavior around unrecognized operators and deep
//! scenes is controlled by a [`CompileConfig`].
//!
//! # Evaluation
//! Compiled expressions can also be evaluated on the CPU, given
//! implementations of their primitives (see the [`eval`] module).  This is
//! used for previews and for checking numeric properties of the compiler.
//!
//! ```
//! use sdfx::{context::SceneNode, eval::BasicAtoms};
//!
//! let scene = SceneNode::atom("circle", [1.0]).scale(2.0);
//! let c = sdfx::compile(&scene)?;
//! assert_eq!(c.eval(&BasicAtoms, 3.0, 0.0)?, 1.0);
//! # Ok::<(), sdfx::Error>(())
//! ```
//!
//! # Feature flags
#![doc = document_features::document_features!()]
#![warn(missing_docs)]

pub mod compiler;
pub mod context;
pub mod eval;
pub mod notation;
pub mod record;

pub use compiler::{compile, CompileConfig, Compiled, UnknownPolicy};

mod error;
pub use error::Error;

#[cfg(feature = "rhai")]
pub mod rhai;
