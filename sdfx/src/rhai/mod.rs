//! Rhai bindings for building scenes
//!
//! The simplest option is to call [`eval`], which evaluates a single
//! expression and returns the resulting scene:
//!
//! ```
//! let scene = sdfx::rhai::eval("circle(0.5).rotate(20.0)")?;
//! let c = sdfx::compile(&scene)?;
//! assert!(c.apply("p")?.contains("20.000"));
//! # Ok::<(), sdfx::Error>(())
//! ```
//!
//! To evaluate a full script, construct an [`Engine`] then call
//! [`Engine::run`].  Within the script, `draw` inserts scenes into
//! [`ScriptContext::scenes`], which is returned after evaluation is complete.
//!
//! ```
//! use sdfx::rhai::Engine;
//!
//! let mut engine = Engine::new();
//! let out = engine.run(r#"
//!     let b = plainBox(vec2(0.2, 0.4)).translate(vec2(0.5, 0.0));
//!     draw(circle(0.5).unite(b));
//! "#)?;
//! assert_eq!(out.scenes.len(), 1);
//! # Ok::<(), sdfx::Error>(())
//! ```
//!
//! Scene nodes support every transform (`translate`, `rotate`, `scale`,
//! `hollow`, `melt`, `bend`, `displace`, `noop`) and boolean operation
//! (`unite`, `subtract`, `intersect`, `smooth_unite`, `smooth_subtract`,
//! `smooth_intersect`) as methods.  Arbitrary primitives are built with
//! `atom(name)` or `atom(name, [args...])`; the script prelude defines
//! shorthands for the primitives in [`BasicAtoms`](crate::eval::BasicAtoms)
//! (`circle`, `plainBox`, `boxAtom`, `heart`, `star`, `triangle`, `moon`, and
//! `ellipse`), along with `vec2(x, y)` and `vec4(a, b, c, d)` helpers that
//! build literal text.
use std::sync::{Arc, Mutex};

use crate::{
    context::{Literal, Param, SceneNode},
    Error,
};

/// Engine for evaluating a Rhai script with scene-building bindings
pub struct Engine {
    engine: rhai::Engine,
    context: Arc<Mutex<ScriptContext>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Constructs a script evaluation engine
    pub fn new() -> Self {
        let mut engine = rhai::Engine::new();
        engine.register_type_with_name::<SceneNode>("SceneNode");
        engine.register_fn("to_string", |n: &mut SceneNode| n.to_string());

        engine.register_fn("atom", atom);
        engine.register_fn("atom", atom_args);
        engine.register_fn("unknown", unknown);
        engine.register_fn("draw", draw);

        macro_rules! register_fns {
            ($engine:ident, $($name:ident),*) => {
                $($engine.register_fn(stringify!($name), $name::node);)*
            };
        }
        register_fns!(
            engine, noop, translate, rotate, scale, hollow, melt, bend, displace
        );
        register_fns!(
            engine,
            unite,
            subtract,
            intersect,
            smooth_unite,
            smooth_subtract,
            smooth_intersect
        );

        let context = Arc::new(Mutex::new(ScriptContext::new()));
        engine.set_default_tag(rhai::Dynamic::from(context.clone()));
        engine.set_max_expr_depths(64, 32);

        let ast = engine
            .compile(include_str!("core.rhai"))
            .expect("script prelude must compile");
        let module =
            rhai::Module::eval_ast_as_new(rhai::Scope::new(), &ast, &engine)
                .expect("script prelude must evaluate");
        engine.register_global_module(rhai::Shared::new(module));

        Self { engine, context }
    }

    /// Executes a full script
    pub fn run(&mut self, script: &str) -> Result<ScriptContext, Error> {
        self.context.lock().unwrap().clear();

        let mut scope = rhai::Scope::new();
        self.engine
            .run_with_scope(&mut scope, script)
            .map_err(|e| *e)?;

        // Steal the ScriptContext's contents
        let mut lock = self.context.lock().unwrap();
        Ok(std::mem::take(&mut lock))
    }

    /// Evaluates a single expression, which must produce a scene
    pub fn eval(&mut self, script: &str) -> Result<SceneNode, Error> {
        self.context.lock().unwrap().clear();

        let mut scope = rhai::Scope::new();
        let out = self
            .engine
            .eval_expression_with_scope::<SceneNode>(&mut scope, script)
            .map_err(|e| *e)?;

        Ok(out)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Context for script evaluation
///
/// This object stores a set of scenes, which is populated by calls to `draw`
/// during script evaluation.
#[derive(Default)]
pub struct ScriptContext {
    /// List of scenes populated since the last call to [`clear`](Self::clear)
    pub scenes: Vec<SceneNode>,
}

impl ScriptContext {
    /// Builds a new empty script context
    pub fn new() -> Self {
        Self { scenes: vec![] }
    }
    /// Resets the script context
    pub fn clear(&mut self) {
        self.scenes.clear();
    }
}

////////////////////////////////////////////////////////////////////////////////
// Functions injected into the Rhai context

type RhaiResult<T> = Result<T, Box<rhai::EvalAltResult>>;

fn literal(v: rhai::Dynamic, what: &str) -> RhaiResult<Literal> {
    if let Some(v) = v.clone().try_cast::<f64>() {
        Ok(Literal::Number(v))
    } else if let Some(v) = v.clone().try_cast::<i64>() {
        Ok(Literal::Number(v as f64))
    } else if let Some(s) = v.clone().try_cast::<rhai::ImmutableString>() {
        Ok(Literal::Text(s.to_string()))
    } else {
        Err(format!("invalid type for {what}: {}", v.type_name()).into())
    }
}

fn param(v: rhai::Dynamic, what: &str) -> RhaiResult<Param> {
    if let Some(n) = v.clone().try_cast::<SceneNode>() {
        Ok(Param::Node(n))
    } else {
        literal(v, what).map(Param::from)
    }
}

fn atom(name: &str) -> SceneNode {
    SceneNode::atom(name, Vec::<Literal>::new())
}

fn atom_args(name: &str, args: rhai::Array) -> RhaiResult<SceneNode> {
    let args = args
        .into_iter()
        .map(|a| literal(a, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SceneNode::atom(name, args))
}

fn unknown(name: &str, args: rhai::Array) -> RhaiResult<SceneNode> {
    let args = args
        .into_iter()
        .map(|a| param(a, name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SceneNode::unknown(name, args))
}

fn draw(ctx: rhai::NativeCallContext, scene: SceneNode) -> RhaiResult<()> {
    let Some(tag) = ctx.tag() else {
        return Err("draw called without a script context".into());
    };
    let ctx = tag.clone_cast::<Arc<Mutex<ScriptContext>>>();
    ctx.lock().unwrap().scenes.push(scene);
    Ok(())
}

macro_rules! define_transform_fns {
    ($($name:ident),*) => {
        $(
        mod $name {
            use super::*;
            pub fn node(
                a: SceneNode,
                p: rhai::Dynamic,
            ) -> RhaiResult<SceneNode> {
                let p = param(p, stringify!($name))?;
                Ok(a.$name(p))
            }
        }
        )*
    };
}

macro_rules! define_boolean_fns {
    ($($name:ident),*) => {
        $(
        mod $name {
            use super::*;
            pub fn node(a: SceneNode, b: SceneNode) -> SceneNode {
                a.$name(&b)
            }
        }
        )*
    };
}

macro_rules! define_smooth_fns {
    ($($name:ident),*) => {
        $(
        mod $name {
            use super::*;
            pub fn node(a: SceneNode, b: SceneNode, k: SceneNode) -> SceneNode {
                a.$name(&b, &k)
            }
        }
        )*
    };
}

define_transform_fns!(
    noop, translate, rotate, scale, hollow, melt, bend, displace
);
define_boolean_fns!(unite, subtract, intersect);
define_smooth_fns!(smooth_unite, smooth_subtract, smooth_intersect);

////////////////////////////////////////////////////////////////////////////////

/// One-shot evaluation of a single expression
pub fn eval(s: &str) -> Result<SceneNode, Error> {
    let mut engine = Engine::new();
    engine.eval(s)
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bind() {
        let mut engine = Engine::new();
        let out = engine
            .run("draw(heart().melt(0.1)); draw(circle(1))")
            .unwrap();
        assert_eq!(out.scenes.len(), 2);
        assert_eq!(out.scenes[1], SceneNode::atom("circle", [1.0]));
    }

    #[test]
    fn test_eval() {
        let s = eval("circle(0.5).rotate(20.0).scale(\"0.5\")").unwrap();
        let expected =
            SceneNode::atom("circle", [0.5]).rotate(20.0).scale("0.5");
        assert_eq!(s, expected);
    }

    #[test]
    fn test_atoms() {
        let s = eval(r#"atom("star", [".07", "0.3"])"#).unwrap();
        assert_eq!(s, SceneNode::atom("star", [".07", "0.3"]));
        let s = eval(r#"boxAtom(vec2(0.8, 0.9))"#).unwrap();
        assert_eq!(s, SceneNode::atom("boxAtom", ["vec2(0.8, 0.9)"]));
        assert!(eval(r#"atom("circle", [heart()])"#).is_err());

        let s = eval("star(0.5, 0.4).unite(moon(0.5, 1.0, 0.8))").unwrap();
        let moon = SceneNode::atom("moon", [0.5, 1.0, 0.8]);
        assert_eq!(s, SceneNode::atom("star", [0.5, 0.4]).unite(&moon));
        let s = eval("ellipse(vec2(2, 1)).subtract(triangle(1))").unwrap();
        let t = SceneNode::atom("triangle", [1.0]);
        assert_eq!(s, SceneNode::atom("ellipse", ["vec2(2, 1)"]).subtract(&t));
    }

    #[test]
    fn test_node_params() {
        let s = eval(
            r#"heart().smooth_unite(circle(1), atom("k")).bend(atom("b"))"#,
        )
        .unwrap();
        let k = SceneNode::atom("k", Vec::<Literal>::new());
        let b = SceneNode::atom("b", Vec::<Literal>::new());
        let heart = SceneNode::atom("heart", Vec::<Literal>::new());
        let expected = heart
            .smooth_unite(&SceneNode::atom("circle", [1.0]), &k)
            .bend(b);
        assert_eq!(s, expected);
    }

    #[test]
    fn test_unknown() {
        let s = eval(r#"unknown("FOOBAR", [heart(), 2])"#).unwrap();
        assert_eq!(s.op_name(), "FOOBAR");
        assert_eq!(s.children().count(), 1);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            eval("circle(1).rotate([1])"),
            Err(Error::RhaiEvalError(..))
        ));
        assert!(eval("circle(1").is_err());
    }
}
