//! Boolean expressions over features.
//!
//! The expression language is the one used by `constraint` directives:
//!
//! ```text
//! expr   := term ('|' term)*
//! term   := factor ('&' factor)*
//! factor := ('!' | '~') factor | '(' expr ')' | feature
//! ```
//!
//! `!` binds tighter than `&`, which binds tighter than `|`.
//! Binary operators are left-associative.
//! Parsed trees are at most [`MAX_DEPTH`] levels deep.
//!
//! ```
//! use fm_compiler::expr::Expr;
//!
//! let e: Expr = "A & !(B | C)".parse().unwrap();
//! assert_eq!(e.to_string(), "A & !(B | C)");
//! assert!(e.eval(|f| f.name() == "A"));
//! ```

use std::collections::HashSet;
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use thiserror::Error;

use crate::error::EngineError;
use crate::types::{is_identifier_char, Feature};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr {
    Var(Feature),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(feature: Feature) -> Self {
        Expr::Var(feature)
    }

    /// Negation, collapsing double negation.
    pub fn not(value: Self) -> Self {
        match value {
            Expr::Not(inner) => *inner,
            _ => Expr::Not(Box::new(value)),
        }
    }

    pub fn and(lhs: Self, rhs: Self) -> Self {
        Expr::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Expr::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Features referenced by the expression, in order of first appearance.
    pub fn vars(&self) -> Vec<&Feature> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Var(f) => {
                    if seen.insert(f) {
                        result.push(f);
                    }
                }
                Expr::Not(a) => stack.push(a),
                Expr::And(a, b) | Expr::Or(a, b) => {
                    stack.push(b);
                    stack.push(a);
                }
            }
        }
        result
    }

    /// Evaluates the expression under the given assignment.
    pub fn eval<F>(&self, assignment: F) -> bool
    where
        F: Fn(&Feature) -> bool + Copy,
    {
        match self {
            Expr::Var(f) => assignment(f),
            Expr::Not(a) => !a.eval(assignment),
            Expr::And(a, b) => a.eval(assignment) && b.eval(assignment),
            Expr::Or(a, b) => a.eval(assignment) || b.eval(assignment),
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(..) => 1,
            Expr::And(..) => 2,
            Expr::Not(_) => 3,
            Expr::Var(_) => 4,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(v) => write!(f, "{}", v),
            Expr::Not(a) => {
                f.write_str("!")?;
                a.fmt_operand(f, 3)
            }
            Expr::And(a, b) => {
                a.fmt_operand(f, 2)?;
                f.write_str(" & ")?;
                // Right operand of a left-associative operator needs parens at equal precedence.
                b.fmt_operand(f, 3)
            }
            Expr::Or(a, b) => {
                a.fmt_operand(f, 1)?;
                f.write_str(" | ")?;
                b.fmt_operand(f, 2)
            }
        }
    }
}

impl FromStr for Expr {
    type Err = ParseExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_expr(s)
    }
}

/// Syntax error in a boolean expression. `column` is 1-based.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{reason} at column {column}")]
pub struct ParseExprError {
    pub column: usize,
    pub reason: String,
}

impl From<ParseExprError> for EngineError {
    fn from(err: ParseExprError) -> Self {
        EngineError::malformed(err.to_string())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Token {
    Ident(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(name) => write!(f, "`{}`", name),
            Token::And => f.write_str("`&`"),
            Token::Or => f.write_str("`|`"),
            Token::Not => f.write_str("`!`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, ParseExprError> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<CharIndices<'_>> = input.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '&' => Token::And,
            '|' => Token::Or,
            '!' | '~' => Token::Not,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if is_identifier_char(c) => {
                let mut name = String::from(c);
                while let Some(&(_, c)) = chars.peek() {
                    if !is_identifier_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                Token::Ident(name)
            }
            other => {
                return Err(ParseExprError {
                    column: column_of(input, pos),
                    reason: format!("unexpected character `{}`", other),
                });
            }
        };
        tokens.push((column_of(input, pos), token));
    }

    Ok(tokens)
}

fn column_of(input: &str, byte_pos: usize) -> usize {
    input[..byte_pos].chars().count() + 1
}

/// Maximum height of a parsed expression tree.
///
/// Counts nested parentheses, negations and chained binary operators.
pub const MAX_DEPTH: usize = 256;

/// Parser state. Every `parse_*` method returns the subtree with its height.
struct ExprParser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end_column: usize,
    nesting: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn column(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(c, _)| *c)
            .unwrap_or(self.end_column)
    }

    fn error(&self, reason: impl Into<String>) -> ParseExprError {
        ParseExprError {
            column: self.column(),
            reason: reason.into(),
        }
    }

    fn too_deep(column: usize) -> ParseExprError {
        ParseExprError {
            column,
            reason: format!("expression nested too deeply (more than {} levels)", MAX_DEPTH),
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn check_height(&self, height: usize, column: usize) -> Result<usize, ParseExprError> {
        if height > MAX_DEPTH {
            return Err(Self::too_deep(column));
        }
        Ok(height)
    }

    /// Runs `parse` one nesting level deeper, failing before the recursion gets too deep.
    fn nested<T>(
        &mut self,
        column: usize,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseExprError>,
    ) -> Result<T, ParseExprError> {
        if self.nesting >= MAX_DEPTH {
            return Err(Self::too_deep(column));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<(Expr, usize), ParseExprError> {
        let (mut lhs, mut height) = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            let column = self.column();
            self.advance();
            let (rhs, rhs_height) = self.parse_and()?;
            height = self.check_height(height.max(rhs_height) + 1, column)?;
            lhs = Expr::or(lhs, rhs);
        }
        Ok((lhs, height))
    }

    fn parse_and(&mut self) -> Result<(Expr, usize), ParseExprError> {
        let (mut lhs, mut height) = self.parse_factor()?;
        while self.peek() == Some(&Token::And) {
            let column = self.column();
            self.advance();
            let (rhs, rhs_height) = self.parse_factor()?;
            height = self.check_height(height.max(rhs_height) + 1, column)?;
            lhs = Expr::and(lhs, rhs);
        }
        Ok((lhs, height))
    }

    fn parse_factor(&mut self) -> Result<(Expr, usize), ParseExprError> {
        let column = self.column();
        match self.advance() {
            Some(Token::Not) => {
                let (inner, height) = self.nested(column, Self::parse_factor)?;
                let height = self.check_height(height + 1, column)?;
                Ok((Expr::Not(Box::new(inner)), height))
            }
            Some(Token::LParen) => {
                let inner = self.nested(column, Self::parse_or)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ParseExprError {
                        column: self.tokens[self.pos - 1].0,
                        reason: format!("expected `)`, found {}", other),
                    }),
                    None => Err(ParseExprError {
                        column,
                        reason: "unclosed `(`".to_string(),
                    }),
                }
            }
            Some(Token::Ident(name)) => {
                let feature = Feature::new(name).map_err(|e| ParseExprError {
                    column,
                    reason: e.to_string(),
                })?;
                Ok((Expr::Var(feature), 1))
            }
            Some(other) => Err(ParseExprError {
                column,
                reason: format!("expected a feature, `!` or `(`, found {}", other),
            }),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

/// Parses a boolean expression.
pub fn parse_expr(input: &str) -> Result<Expr, ParseExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseExprError {
            column: 1,
            reason: "empty expression".to_string(),
        });
    }

    let mut parser = ExprParser {
        tokens,
        pos: 0,
        end_column: input.chars().count() + 1,
        nesting: 0,
    };
    let (expr, _) = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(parser.error(format!("unexpected {}", token)));
    }
    Ok(expr)
}
