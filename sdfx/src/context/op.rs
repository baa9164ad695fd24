/// A one-argument operation in a distance expression
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum UnaryOpcode {
    /// Prefix negation, rendered as `-a`
    Neg,
    Abs,
    Sin,
    Cos,
    /// Matrix inverse, only meaningful for `mat2` operands
    Inverse,
}

/// A two-argument operation in a distance expression
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum BinaryOpcode {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
}

/// Vector component selected by a swizzle
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[allow(missing_docs)]
pub enum Axis {
    X,
    Y,
}

/// Binding strength of a rendered expression
///
/// An operand is wrapped in parentheses when it binds more loosely than its
/// position requires.
pub(crate) mod prec {
    /// Anything, e.g. a caller-supplied coordinate we can't classify
    pub const LOWEST: u8 = 0;
    pub const SUM: u8 = 1;
    pub const PRODUCT: u8 = 2;
    pub const PREFIX: u8 = 3;
    /// Identifiers, literals, calls, and parenthesized groups
    pub const ATOM: u8 = 4;
}

impl UnaryOpcode {
    /// Returns the function name used when rendering, if this is a call
    pub fn function_name(&self) -> Option<&'static str> {
        match self {
            UnaryOpcode::Neg => None,
            UnaryOpcode::Abs => Some("abs"),
            UnaryOpcode::Sin => Some("sin"),
            UnaryOpcode::Cos => Some("cos"),
            UnaryOpcode::Inverse => Some("inverse"),
        }
    }
}

impl BinaryOpcode {
    /// Returns the infix symbol used when rendering, if this is an operator
    pub fn symbol(&self) -> Option<&'static str> {
        match self {
            BinaryOpcode::Add => Some("+"),
            BinaryOpcode::Sub => Some("-"),
            BinaryOpcode::Mul => Some("*"),
            BinaryOpcode::Div => Some("/"),
            BinaryOpcode::Min | BinaryOpcode::Max => None,
        }
    }

    /// Returns the function name used when rendering, if this is a call
    pub fn function_name(&self) -> Option<&'static str> {
        match self {
            BinaryOpcode::Min => Some("min"),
            BinaryOpcode::Max => Some("max"),
            _ => None,
        }
    }

    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOpcode::Add | BinaryOpcode::Sub => prec::SUM,
            BinaryOpcode::Mul | BinaryOpcode::Div => prec::PRODUCT,
            BinaryOpcode::Min | BinaryOpcode::Max => prec::ATOM,
        }
    }
}

impl Axis {
    /// Returns the swizzle suffix (without the dot)
    pub fn name(&self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }
}

/// Checks whether the given text can be used as an operand without wrapping
///
/// This is true for identifiers and numbers (`center`, `0.5`), calls
/// (`vec2(0.8, 0.9)`), and fully parenthesized groups (`(p - d)`).
pub(crate) fn is_atomic(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    let bytes = s.as_bytes();
    let head = bytes
        .iter()
        .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_' || **c == b'.')
        .count();
    if head == bytes.len() {
        return true;
    }
    bytes[head] == b'('
        && closing_paren(&bytes[head..]) == Some(bytes.len() - head - 1)
}

/// Returns the index of the parenthesis matching the one at `s[0]`
fn closing_paren(s: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.iter().enumerate() {
        match c {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => (),
        }
    }
    None
}
