#![forbid(unsafe_code)]

use std::mem;

use hoare_ast::{span_between, Expr, FreshNames, Op, QuantKind, Span, VarType};
use hoare_lex::{Token, TokenKind};

use crate::error::ParseError;

/// Recursive-descent parser for assertions.
///
/// Quantifiers are sanitized as soon as they are parsed, drawing bound
/// names from the caller's [`FreshNames`].
pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
    fresh: &'a mut FreshNames,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], fresh: &'a mut FreshNames) -> Self {
        Self { tokens, idx: 0, fresh }
    }

    pub fn parse_expr_eof(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.at(TokenKind::Eof) {
            return Err(self.error_here("expected end of input"));
        }
        Ok(expr)
    }

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwForall) | Some(TokenKind::KwExists) => self.parse_quantifier(),
            _ => self.parse_logical_expr(),
        }
    }

    fn parse_quantifier(&mut self) -> Result<Expr, ParseError> {
        let kind = match self.expect_any()?.kind {
            TokenKind::KwExists => QuantKind::Exists,
            _ => QuantKind::Forall,
        };
        let var = self.expect_ident("bound variable")?;
        let ty = if self.at(TokenKind::Colon) {
            self.next();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::ColonColon)?;
        let body = self.parse_expr()?;
        Ok(Expr::quantifier(kind, var, ty, body).sanitize(self.fresh))
    }

    fn parse_type(&mut self) -> Result<VarType, ParseError> {
        let tok = self.expect_any()?;
        match &tok.kind {
            TokenKind::Ident(name) => name.parse::<VarType>().map_err(|message| ParseError {
                message,
                span: tok.span,
            }),
            other => Err(ParseError {
                message: format!("expected a type, found {other}"),
                span: tok.span,
            }),
        }
    }

    fn parse_logical_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_logical_operand()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::KwAnd) => Some(Op::And),
                Some(TokenKind::KwOr) => Some(Op::Or),
                Some(TokenKind::Implies) => Some(Op::Implies),
                Some(TokenKind::Iff) => Some(Op::Iff),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_logical_operand()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_logical_operand(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwNot) => {
                self.next();
                Ok(Expr::negate(self.parse_logical_operand()?))
            }
            Some(TokenKind::KwForall) | Some(TokenKind::KwExists) => self.parse_quantifier(),
            _ => self.parse_equality_expr(),
        }
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::EqEq) => Some(Op::Eq),
                Some(TokenKind::Neq) => Some(Op::NEq),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_relational_expr()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_add_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => Some(Op::Lt),
                Some(TokenKind::Le) => Some(Op::Le),
                Some(TokenKind::Gt) => Some(Op::Gt),
                Some(TokenKind::Ge) => Some(Op::Ge),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_add_expr()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_add_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => Some(Op::Add),
                Some(TokenKind::Minus) => Some(Op::Sub),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_mul_expr()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => Some(Op::Mul),
                Some(TokenKind::Slash) => Some(Op::Div),
                Some(TokenKind::Percent) => Some(Op::Mod),
                _ => None,
            };
            let Some(op) = op else { break };
            self.next();
            let right = self.parse_unary_expr()?;
            left = Expr::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::Minus) => {
                self.next();
                Ok(Expr::unary(Op::Sub, self.parse_primary()?))
            }
            Some(TokenKind::Plus) => {
                self.next();
                self.parse_primary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::KwTrue => Ok(Expr::bool(true)),
            TokenKind::KwFalse => Ok(Expr::bool(false)),
            TokenKind::Int(n) => Ok(Expr::int(n)),
            TokenKind::Ident(name) => {
                if self.at(TokenKind::LBracket) {
                    self.next();
                    let index = self.parse_index()?;
                    self.expect(TokenKind::RBracket)?;
                    Ok(Expr::subscript(name, index))
                } else {
                    Ok(Expr::Var(name))
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            other => Err(ParseError {
                message: format!("unexpected {other}"),
                span: tok.span,
            }),
        }
    }

    /// `i`, `l:u`, `l:`, `:u` or `:`.
    fn parse_index(&mut self) -> Result<Expr, ParseError> {
        let lower = if self.at(TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        if !self.at(TokenKind::Colon) {
            return lower.ok_or_else(|| self.error_here("expected index expression"));
        }
        self.next();
        let upper = if self.at(TokenKind::RBracket) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        Ok(Expr::slice(lower, upper))
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(name),
            other => Err(ParseError {
                message: format!("expected {what}, found {other}"),
                span: tok.span,
            }),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError {
                message: format!("expected {expected}, found {}", tok.kind),
                span: tok.span,
            })
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        self.next().ok_or_else(|| ParseError {
            message: "unexpected end of input".to_string(),
            span: self.end_span(),
        })
    }

    fn error_here(&self, what: &str) -> ParseError {
        let found = self
            .peek_kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "end of input".to_string());
        ParseError {
            message: format!("{what}, found {found}"),
            span: self.peek_span().unwrap_or_else(|| self.end_span()),
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn peek_span(&self) -> Option<Span> {
        self.tokens.get(self.idx).map(|t| t.span)
    }

    fn end_span(&self) -> Span {
        self.tokens
            .last()
            .map(|t| t.span)
            .unwrap_or_else(|| span_between(0, 0))
    }
}
