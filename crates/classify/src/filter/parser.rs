//! Recursive-descent parser for display filters
//!
//! ```text
//! expr    := or
//! or      := and (("or" | "||") and)*
//! and     := unary (("and" | "&&") unary)*
//! unary   := ("not" | "!") unary | "(" expr ")" | field [cmp value]
//! ```
//!
//! Chains of `and`/`or` parse flat, so only parentheses and `not` nest.
//! Nesting deeper than [`MAX_DEPTH`] is rejected.

use super::FilterError;
use super::lexer::{CmpOp, Spanned, Token};

/// Deepest nesting of parentheses and `not` a filter may use
pub(crate) const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    /// Two or more terms, all of which must hold
    And(Vec<Expr>),
    /// Two or more terms, one of which must hold
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// Bare field or protocol name
    Present(String),
    Compare {
        field: String,
        op: CmpOp,
        value: String,
    },
}

pub(crate) struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    pub(crate) fn parse(mut self) -> Result<Expr, FilterError> {
        let expr = self.parse_or()?;
        match self.tokens.get(self.pos) {
            None => Ok(expr),
            Some(extra) => Err(unexpected(extra)),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<Expr, FilterError> {
        let mut terms = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            terms.push(self.parse_and()?);
        }
        Ok(flatten(terms, Expr::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, FilterError> {
        let mut terms = vec![self.parse_unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            terms.push(self.parse_unary()?);
        }
        Ok(flatten(terms, Expr::And))
    }

    /// Enter one level of nesting, run `inner`, leave it again
    fn nested<T>(
        &mut self,
        pos: usize,
        inner: impl FnOnce(&mut Self) -> Result<T, FilterError>,
    ) -> Result<T, FilterError> {
        if self.depth >= MAX_DEPTH {
            return Err(FilterError::TooDeep {
                pos,
                max: MAX_DEPTH,
            });
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn parse_unary(&mut self) -> Result<Expr, FilterError> {
        let Some(spanned) = self.advance() else {
            return Err(FilterError::UnexpectedEnd);
        };

        match spanned.token {
            Token::Not => self.nested(spanned.pos, |p| Ok(Expr::Not(Box::new(p.parse_unary()?)))),
            Token::LParen => {
                let inner = self.nested(spanned.pos, Self::parse_or)?;
                match self.advance() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(unexpected(&other)),
                    None => Err(FilterError::UnexpectedEnd),
                }
            }
            Token::Word(field) => {
                if !field.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    return Err(unexpected(&Spanned {
                        token: Token::Word(field),
                        pos: spanned.pos,
                    }));
                }
                let Some(Token::Cmp(op)) = self.peek().cloned() else {
                    return Ok(Expr::Present(field.to_ascii_lowercase()));
                };
                self.pos += 1;
                match self.advance() {
                    Some(Spanned {
                        token: Token::Word(value) | Token::Quoted(value),
                        ..
                    }) => Ok(Expr::Compare {
                        field: field.to_ascii_lowercase(),
                        op,
                        value,
                    }),
                    Some(other) => Err(unexpected(&other)),
                    None => Err(FilterError::UnexpectedEnd),
                }
            }
            _ => Err(unexpected(&spanned)),
        }
    }
}

fn flatten(mut terms: Vec<Expr>, join: fn(Vec<Expr>) -> Expr) -> Expr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        join(terms)
    }
}

fn unexpected(spanned: &Spanned) -> FilterError {
    FilterError::UnexpectedToken {
        pos: spanned.pos,
        found: format!("{:?}", spanned.token),
    }
}
