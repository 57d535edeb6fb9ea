//! Comparison operators.

use std::fmt;

/// The relation a constraint asserts between its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Oper {
    /// `left <= right`
    LessEq,
    /// `left >= right`
    GreaterEq,
    /// `left == right`
    Equal,
}

impl Oper {
    pub fn as_str(&self) -> &'static str {
        match self {
            Oper::LessEq => "<=",
            Oper::GreaterEq => ">=",
            Oper::Equal => "==",
        }
    }
}

impl fmt::Display for Oper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
