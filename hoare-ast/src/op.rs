#![forbid(unsafe_code)]

use std::fmt;

/// Category of an operator. Drives the type rules: every operator in a
/// class shares operand and result types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpClass {
    /// `Int x Int -> Int`
    Arith,
    /// `Int x Int -> Bool`
    Comp,
    /// `Bool x Bool -> Bool`
    Bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Implies,
    Iff,
}

impl Op {
    pub const ALL: [Op; 16] = [
        Op::Add,
        Op::Sub,
        Op::Mul,
        Op::Div,
        Op::Mod,
        Op::Eq,
        Op::NEq,
        Op::Lt,
        Op::Le,
        Op::Gt,
        Op::Ge,
        Op::And,
        Op::Or,
        Op::Not,
        Op::Implies,
        Op::Iff,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Eq => "==",
            Op::NEq => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::And => "and",
            Op::Or => "or",
            Op::Not => "not",
            Op::Implies => "==>",
            Op::Iff => "<==>",
        }
    }

    pub fn class(self) -> OpClass {
        match self {
            Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod => OpClass::Arith,
            Op::Eq | Op::NEq | Op::Lt | Op::Le | Op::Gt | Op::Ge => OpClass::Comp,
            Op::And | Op::Or | Op::Not | Op::Implies | Op::Iff => OpClass::Bool,
        }
    }

    pub fn is_arith(self) -> bool {
        self.class() == OpClass::Arith
    }

    pub fn is_comp(self) -> bool {
        self.class() == OpClass::Comp
    }

    /// Operators accepted in unary position: sign prefixes and `not`.
    pub fn is_unary(self) -> bool {
        matches!(self, Op::Add | Op::Sub | Op::Not)
    }

    /// `not` has no binary form.
    pub fn is_binary(self) -> bool {
        self != Op::Not
    }

    /// Binding strength used by the pretty printer; mirrors the parser's
    /// precedence levels (higher binds tighter).
    pub fn precedence(self) -> u8 {
        match self {
            Op::And | Op::Or | Op::Implies | Op::Iff => 1,
            Op::Not => 2,
            Op::Eq | Op::NEq => 3,
            Op::Lt | Op::Le | Op::Gt | Op::Ge => 4,
            Op::Add | Op::Sub => 5,
            Op::Mul | Op::Div | Op::Mod => 6,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
