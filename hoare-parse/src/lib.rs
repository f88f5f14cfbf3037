#![forbid(unsafe_code)]

mod error;
mod parser;

use hoare_ast::{Expr, FreshNames};
use hoare_lex::Lexer;

pub use error::ParseError;
pub use parser::Parser;

/// Parse a standalone assertion with its own fresh-name supply.
pub fn parse_assertion(src: &str) -> Result<Expr, ParseError> {
    let mut fresh = FreshNames::new();
    parse_assertion_with(src, &mut fresh)
}

/// Parse an assertion, drawing quantifier names from `fresh` so that several
/// assertions of one verification call never share a bound name.
pub fn parse_assertion_with(src: &str, fresh: &mut FreshNames) -> Result<Expr, ParseError> {
    let tokens = Lexer::new(src).lex()?;
    let mut parser = Parser::new(&tokens, fresh);
    parser.parse_expr_eof()
}
