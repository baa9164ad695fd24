//! Shader notation for generic `{op, args}` records
//!
//! This is independent of the scene compiler: it renders a [`Record`] tree
//! directly, treating comparison and arithmetic symbols as infix operators and
//! everything else as function application.
//!
//! ```
//! use sdfx::record::{Arg, Record};
//!
//! let r = Record::new("+", vec![
//!     Arg::Number(1.0),
//!     Record::new("vec2", vec![Arg::Number(0.5), "y".into()]).into(),
//! ]);
//! assert_eq!(sdfx::notation::to_glsl(&r)?, "(1.00 + vec2(0.50, y))");
//! # Ok::<(), sdfx::Error>(())
//! ```
use crate::{
    context::to_fixed,
    record::{Arg, Record},
    Error,
};
use std::str::FromStr;

/// Binary operator rendered in infix position
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::EnumString, strum::Display)]
#[allow(missing_docs)]
pub enum InfixOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}

/// How an operator is written
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Form {
    /// `(a op b)`
    Infix(InfixOp),
    /// Vector constructor (`vec2(..)`, `ivec3(..)`, ...)
    Constructor,
    /// Ordinary function call
    Call,
}

impl Form {
    /// Classifies an operator name
    pub fn of(op: &str) -> Self {
        if let Ok(i) = InfixOp::from_str(op) {
            Form::Infix(i)
        } else if ["vec", "ivec", "uvec", "bvec"]
            .iter()
            .any(|p| op.starts_with(p))
        {
            Form::Constructor
        } else {
            Form::Call
        }
    }
}

/// Renders a record as shader text
///
/// Numbers are written with two decimal places and text is copied verbatim.
/// Infix operators are fully parenthesized, and must have exactly two
/// arguments; otherwise, this returns [`Error::BadArity`].
pub fn to_glsl(r: &Record) -> Result<String, Error> {
    let mut out = String::new();
    write_record(r, &mut out)?;
    Ok(out)
}

fn write_arg(a: &Arg, out: &mut String) -> Result<(), Error> {
    match a {
        Arg::Number(v) => out.push_str(&to_fixed(*v, 2)),
        Arg::Text(s) => out.push_str(s),
        Arg::Record(r) => write_record(r, out)?,
        Arg::Meta(v) => out.push_str(&v.to_string()),
    }
    Ok(())
}

fn write_record(r: &Record, out: &mut String) -> Result<(), Error> {
    match Form::of(&r.op) {
        Form::Infix(op) => {
            let [a, b] = r.args.as_slice() else {
                return Err(Error::BadArity {
                    op: op.to_string(),
                    expected: 2,
                    actual: r.args.len(),
                });
            };
            out.push('(');
            write_arg(a, out)?;
            out.push_str(&format!(" {op} "));
            write_arg(b, out)?;
            out.push(')');
        }
        Form::Constructor | Form::Call => {
            out.push_str(&r.op);
            out.push('(');
            for (i, a) in r.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_arg(a, out)?;
            }
            out.push(')');
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn rec(op: &str, args: Vec<Arg>) -> Record {
        Record::new(op, args)
    }

    #[test]
    fn classify() {
        assert_eq!(Form::of("<="), Form::Infix(InfixOp::Le));
        assert_eq!(Form::of("||"), Form::Infix(InfixOp::Or));
        assert_eq!(Form::of("vec2"), Form::Constructor);
        assert_eq!(Form::of("bvec4"), Form::Constructor);
        assert_eq!(Form::of("min"), Form::Call);
        assert_eq!(Form::of("%"), Form::Call);
    }

    #[test]
    fn infix() {
        let r = rec(
            "&&",
            vec![
                rec("<", vec!["a".into(), Arg::Number(1.0)]).into(),
                rec("!=", vec!["b".into(), Arg::Number(0.126)]).into(),
            ],
        );
        assert_eq!(to_glsl(&r).unwrap(), "((a < 1.00) && (b != 0.13))");
    }

    #[test]
    fn calls() {
        let r = rec(
            "max",
            vec![
                rec("abs", vec!["x".into()]).into(),
                rec("ivec2", vec![Arg::Number(1.0), Arg::Number(2.0)]).into(),
            ],
        );
        assert_eq!(to_glsl(&r).unwrap(), "max(abs(x), ivec2(1.00, 2.00))");
        assert_eq!(to_glsl(&rec("time", vec![])).unwrap(), "time()");
    }

    #[test]
    fn numbers() {
        let r = rec(
            "vec3",
            vec![
                Arg::Number(0.125),
                Arg::Number(-0.375),
                Arg::Meta(serde_json::json!(null)),
            ],
        );
        assert_eq!(to_glsl(&r).unwrap(), "vec3(0.13, -0.38, null)");
    }

    #[test]
    fn bad_arity() {
        let r = rec("max", vec![rec("*", vec!["x".into()]).into()]);
        match to_glsl(&r) {
            Err(Error::BadArity {
                op,
                expected,
                actual,
            }) => {
                assert_eq!(op, "*");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            r => panic!("unexpected result {r:?}"),
        }
        let err = to_glsl(&rec("-", vec![])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "operator `-` must have exactly 2 arguments (got 0)"
        );
    }
}
