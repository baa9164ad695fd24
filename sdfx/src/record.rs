//! Serializable `{op, args}` records
//!
//! A [`Record`] is the interchange form of a scene, as produced by an editor
//! and stored on disk as JSON:
//!
//! ```json
//! { "op": "ROTATE",
//!   "args": ["20.0", { "op": "boxAtom", "args": ["vec2(0.8, 0.9)"] }] }
//! ```
//!
//! An operator whose name starts with a lower-case letter is a primitive; an
//! upper-case keyword (`ROTATE`, `SMUNITE`, ...) is a transform or boolean
//! operation; any other name becomes [`SceneOp::Unknown`].
use crate::{
    context::{
        BooleanKind, Literal, NodePath, Param, SceneNode, SceneOp,
        TransformKind,
    },
    Error,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Generic `{op, args}` node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Operator name
    pub op: String,
    /// Operator arguments
    #[serde(default)]
    pub args: Vec<Arg>,
}

/// Argument within a [`Record`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    /// Numeric leaf
    Number(f64),
    /// Pre-formatted text leaf
    Text(String),
    /// Nested record
    Record(Record),
    /// Any other JSON value (e.g. `null` or an object without an `op`)
    ///
    /// This is only meaningful as opaque metadata, such as the first argument
    /// of a `NOOP`.
    Meta(serde_json::Value),
}

impl Record {
    /// Builds a new record
    pub fn new<S: Into<String>>(op: S, args: Vec<Arg>) -> Self {
        Self {
            op: op.into(),
            args,
        }
    }

    /// Reads a record from JSON
    pub fn from_json<R: std::io::Read>(r: R) -> Result<Self, Error> {
        Ok(serde_json::from_reader(r)?)
    }

    /// Writes this record as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Number(v)
    }
}

impl From<&str> for Arg {
    fn from(v: &str) -> Self {
        Arg::Text(v.to_owned())
    }
}

impl From<Record> for Arg {
    fn from(v: Record) -> Self {
        Arg::Record(v)
    }
}

/// Checks whether an operator name refers to a primitive
///
/// Names are primitives if their first character is a lower-case letter;
/// digits, symbols, and the empty string don't qualify.
pub fn is_primitive(op: &str) -> bool {
    op.chars().next().is_some_and(|c| c.is_lowercase())
}

////////////////////////////////////////////////////////////////////////////////

impl TryFrom<&Record> for SceneNode {
    type Error = Error;
    fn try_from(r: &Record) -> Result<Self, Error> {
        let mut path = NodePath::root();
        to_scene(r, &mut path)
    }
}

impl TryFrom<Record> for SceneNode {
    type Error = Error;
    fn try_from(r: Record) -> Result<Self, Error> {
        SceneNode::try_from(&r)
    }
}

fn to_scene(r: &Record, path: &mut NodePath) -> Result<SceneNode, Error> {
    if r.op.is_empty() {
        return Err(Error::malformed(path, "empty operator name"));
    }
    if is_primitive(&r.op) {
        let mut args = Vec::with_capacity(r.args.len());
        for (i, a) in r.args.iter().enumerate() {
            args.push(match a {
                Arg::Number(v) => Literal::Number(*v),
                Arg::Text(s) => Literal::Text(s.clone()),
                Arg::Record(..) | Arg::Meta(..) => {
                    return Err(Error::malformed(
                        &path.child(i),
                        "primitive arguments must be literals",
                    ));
                }
            });
        }
        Ok(SceneNode::atom(&r.op, args))
    } else if let Ok(kind) = TransformKind::from_str(&r.op) {
        check_arity(r, 2, path)?;
        // NOOP metadata is kept as-is, without checking its structure
        let param = if kind == TransformKind::Noop {
            Param::Meta(serde_json::to_value(&r.args[0])?)
        } else {
            param(&r.args[0], 0, path)?
        };
        let child = child(&r.args[1], 1, path)?;
        Ok(SceneNode::transform(kind, param, child))
    } else if let Ok(kind) = BooleanKind::from_str(&r.op) {
        check_arity(r, if kind.is_smooth() { 3 } else { 2 }, path)?;
        let left = child(&r.args[0], 0, path)?;
        let right = child(&r.args[1], 1, path)?;
        let blend = match r.args.get(2) {
            Some(a) => Some(child(a, 2, path)?),
            None => None,
        };
        SceneNode::boolean(kind, left, right, blend)
    } else {
        let args = r
            .args
            .iter()
            .enumerate()
            .map(|(i, a)| param(a, i, path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SceneNode::unknown(&r.op, args))
    }
}

fn check_arity(r: &Record, n: usize, path: &NodePath) -> Result<(), Error> {
    if r.args.len() == n {
        Ok(())
    } else {
        Err(Error::malformed(
            path,
            format!("`{}` takes {n} arguments, got {}", r.op, r.args.len()),
        ))
    }
}

fn param(a: &Arg, i: usize, path: &mut NodePath) -> Result<Param, Error> {
    Ok(match a {
        Arg::Number(v) => Param::Number(*v),
        Arg::Text(s) => Param::Text(s.clone()),
        Arg::Record(r) => {
            path.push(i);
            let out = to_scene(r, path);
            path.pop();
            Param::Node(out?)
        }
        Arg::Meta(v) => Param::Meta(v.clone()),
    })
}

fn child(a: &Arg, i: usize, path: &mut NodePath) -> Result<SceneNode, Error> {
    match param(a, i, path)? {
        Param::Node(n) => Ok(n),
        _ => Err(Error::malformed(&path.child(i), "expected a node")),
    }
}

////////////////////////////////////////////////////////////////////////////////

impl From<&SceneNode> for Record {
    fn from(n: &SceneNode) -> Self {
        let args = match &**n {
            SceneOp::Atom { args, .. } => args
                .iter()
                .map(|a| match a {
                    Literal::Number(v) => Arg::Number(*v),
                    Literal::Text(s) => Arg::Text(s.clone()),
                })
                .collect(),
            SceneOp::Transform { param, child, .. } => {
                vec![param.into(), Arg::Record(child.into())]
            }
            SceneOp::Boolean {
                left, right, blend, ..
            } => [Some(left), Some(right), blend.as_ref()]
                .into_iter()
                .flatten()
                .map(|c| Arg::Record(c.into()))
                .collect(),
            SceneOp::Unknown { args, .. } => {
                args.iter().map(Arg::from).collect()
            }
        };
        Record::new(n.op_name(), args)
    }
}

impl From<&Param> for Arg {
    fn from(p: &Param) -> Self {
        match p {
            Param::Number(v) => Arg::Number(*v),
            Param::Text(s) => Arg::Text(s.clone()),
            Param::Node(n) => Arg::Record(n.into()),
            Param::Meta(v) => Arg::Meta(v.clone()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(s: &str) -> Record {
        Record::from_json(s.as_bytes()).unwrap()
    }

    fn expect_malformed(s: &str, at: &str) -> String {
        match SceneNode::try_from(&parse(s)) {
            Err(Error::MalformedNode { path, reason }) => {
                assert_eq!(path.to_string(), at);
                reason
            }
            r => panic!("expected malformed node, got {r:?}"),
        }
    }

    #[test]
    fn primitive_names() {
        assert!(is_primitive("circle"));
        assert!(is_primitive("boxAtom"));
        assert!(!is_primitive("ROTATE"));
        assert!(!is_primitive("Circle"));
        assert!(!is_primitive("_circle"));
        assert!(!is_primitive(""));
    }

    #[test]
    fn parse_scene() {
        let r = parse(
            r#"{"op": "ROTATE", "args": [
                "20.0",
                {"op": "NOOP", "args": [
                    666,
                    {"op": "boxAtom", "args": ["vec2(0.8, 0.9)"]}
                ]}
            ]}"#,
        );
        let s = SceneNode::try_from(&r).unwrap();
        let expected = SceneNode::atom("boxAtom", ["vec2(0.8, 0.9)"])
            .noop(Param::Meta(serde_json::json!(666.0)))
            .rotate("20.0");
        assert_eq!(s, expected);
    }

    #[test]
    fn noop_metadata() {
        let circle = SceneNode::atom("circle", ["1.0"]);
        for meta in [
            "null",
            r#"{"history": [1, 2]}"#,
            r#"{"op": "", "args": []}"#,
            r#"{"op": "SCALE", "args": ["not a number"]}"#,
            r#"[true, "x"]"#,
        ] {
            let r = parse(&format!(
                r#"{{"op": "NOOP",
                    "args": [{meta}, {{"op": "circle", "args": ["1.0"]}}]}}"#
            ));
            let s = SceneNode::try_from(&r).unwrap();
            assert_eq!(
                crate::compile(&s).unwrap(),
                crate::compile(&circle).unwrap(),
                "{meta}"
            );

            // Metadata survives a trip back to JSON
            let json = Record::from(&s).to_json().unwrap();
            let again = SceneNode::try_from(&parse(&json)).unwrap();
            assert_eq!(again, s, "{meta}");
        }
    }

    #[test]
    fn metadata_elsewhere() {
        expect_malformed(r#"{"op": "circle", "args": [null]}"#, "args[0]");
        assert!(matches!(
            SceneNode::try_from(&parse(
                r#"{"op": "ROTATE", "args": [null, {"op": "x"}]}"#
            ))
            .map(|s| crate::compile(&s)),
            Ok(Err(Error::BadParam { .. }))
        ));
    }

    #[test]
    fn atom_without_args() {
        let s = SceneNode::try_from(&parse(r#"{"op": "heart"}"#)).unwrap();
        assert_eq!(s, SceneNode::atom("heart", Vec::<Literal>::new()));
    }

    #[test]
    fn smooth_blend() {
        let s = SceneNode::try_from(&parse(
            r#"{"op": "SMUNITE",
                "args": [{"op": "a"}, {"op": "b"}, {"op": "k"}]}"#,
        ))
        .unwrap();
        assert!(matches!(
            &*s,
            SceneOp::Boolean {
                kind: BooleanKind::SmoothUnite,
                blend: Some(..),
                ..
            }
        ));

        let reason = expect_malformed(
            r#"{"op": "SMUNITE", "args": [{"op": "a"}, {"op": "b"}]}"#,
            "root",
        );
        assert!(reason.contains("takes 3 arguments"));
        expect_malformed(
            r#"{"op": "UNITE",
                "args": [{"op": "a"}, {"op": "b"}, {"op": "k"}]}"#,
            "root",
        );
    }

    #[test]
    fn malformed_paths() {
        expect_malformed(r#"{"op": "", "args": []}"#, "root");
        expect_malformed(
            r#"{"op": "UNITE", "args": [{"op": "a"}, "vec2(1.0, 0.0)"]}"#,
            "args[1]",
        );
        expect_malformed(
            r#"{"op": "SCALE",
                "args": [0.5, {"op": "TRANSLATE", "args": ["d"]}]}"#,
            "args[1]",
        );
        expect_malformed(
            r#"{"op": "SCALE",
                "args": [0.5, {"op": "circle", "args": [{"op": "x"}]}]}"#,
            "args[1].args[0]",
        );
        expect_malformed(
            r#"{"op": "SCALE",
                "args": [{"op": "", "args": []}, {"op": "x"}]}"#,
            "args[0]",
        );
    }

    #[test]
    fn unknown_operator() {
        let s = SceneNode::try_from(&parse(
            r#"{"op": "FOOBAR", "args": [{"op": "x"}, 1.5, "text"]}"#,
        ))
        .unwrap();
        match &*s {
            SceneOp::Unknown { name, args } => {
                assert_eq!(name, "FOOBAR");
                assert_eq!(args.len(), 3);
                assert_eq!(args[1], Param::Number(1.5));
                assert_eq!(args[2], Param::Text("text".to_owned()));
            }
            op => panic!("unexpected op {op:?}"),
        }
    }

    #[test]
    fn scene_to_record() {
        let a = SceneNode::atom("circle", [0.5]);
        let s = a
            .rotate(a.clone())
            .smooth_unite(&a.translate("vec2(0.1, 0.2)"), &a);
        let r = Record::from(&s);
        assert_eq!(r.op, "SMUNITE");
        assert_eq!(r.args.len(), 3);
        assert_eq!(SceneNode::try_from(&r).unwrap(), s);

        let json = r.to_json().unwrap();
        assert_eq!(Record::from_json(json.as_bytes()).unwrap(), r);
    }

    #[test]
    fn bad_json() {
        assert!(matches!(
            Record::from_json("{\"args\": []}".as_bytes()),
            Err(Error::JsonError(..))
        ));
    }
}
