#![forbid(unsafe_code)]

use std::fmt;

use hoare_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwAnd,
    KwOr,
    KwNot,
    KwForall,
    KwExists,
    KwTrue,
    KwFalse,

    // Operators / punctuation
    Implies,
    Iff,
    ColonColon,
    Colon,
    EqEq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    LParen,
    RParen,
    LBracket,
    RBracket,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(i64),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::KwAnd => "`and`",
            TokenKind::KwOr => "`or`",
            TokenKind::KwNot => "`not`",
            TokenKind::KwForall => "`forall`",
            TokenKind::KwExists => "`exists`",
            TokenKind::KwTrue => "`True`",
            TokenKind::KwFalse => "`False`",
            TokenKind::Implies => "`==>`",
            TokenKind::Iff => "`<==>`",
            TokenKind::ColonColon => "`::`",
            TokenKind::Colon => "`:`",
            TokenKind::EqEq => "`==`",
            TokenKind::Neq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::Gt => "`>`",
            TokenKind::Le => "`<=`",
            TokenKind::Ge => "`>=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Percent => "`%`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Eof => "end of input",
            TokenKind::Ident(name) => return write!(f, "identifier `{name}`"),
            TokenKind::Int(n) => return write!(f, "integer `{n}`"),
        };
        f.write_str(s)
    }
}
