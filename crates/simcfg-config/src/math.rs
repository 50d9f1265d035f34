//! Arithmetic evaluation pass.
//!
//! Evaluates `$(( expr ))` expressions embedded in scalars. Expressions
//! support integer and float literals, `+ - * / %`, unary minus, and
//! parentheses. Integer arithmetic stays integral; anything involving a
//! float (including inexact division) produces a float. A scalar that is
//! nothing but one expression becomes a numeric scalar; expressions inside
//! surrounding text interpolate the rendered number.
//!
//! Evaluated output contains no `$((` markers, so the pass is idempotent.

use crate::construct::LoadOptions;
use crate::error::ConfigError;
use crate::value::Value;
use yaml_rust2::Yaml;

const MATH_OPEN: &str = "$((";

/// Run arithmetic evaluation over the whole tree.
pub fn evaluate_math(tree: Value, options: &LoadOptions) -> Result<Value, ConfigError> {
    rewrite(tree, 0, options)
}

fn rewrite(value: Value, depth: usize, options: &LoadOptions) -> Result<Value, ConfigError> {
    if depth > options.max_depth {
        return Err(ConfigError::NestingTooDeep {
            max_depth: options.max_depth,
            path: Vec::new(),
        });
    }
    match value {
        Value::Sequence(items) => Ok(Value::Sequence(
            items
                .into_iter()
                .map(|item| rewrite(item, depth + 1, options))
                .collect::<Result<_, _>>()?,
        )),
        Value::Mapping(entries) => {
            let mut rewritten = indexmap::IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                rewritten.insert(key, rewrite(item, depth + 1, options)?);
            }
            Ok(Value::Mapping(rewritten))
        }
        Value::Scalar(Yaml::String(text)) => rewrite_scalar(text),
        other => Ok(other),
    }
}

fn rewrite_scalar(text: String) -> Result<Value, ConfigError> {
    let Some(span) = find_expression(&text) else {
        return Ok(Value::Scalar(Yaml::String(text)));
    };

    // Whole-scalar form keeps the numeric type.
    let prefix = &text[..span.start];
    let suffix = &text[span.end..];
    if prefix.trim().is_empty() && suffix.trim().is_empty() {
        let result = evaluate(&text[span.inner.clone()])?;
        tracing::debug!(expr = %&text[span.inner.clone()], "evaluated arithmetic expression");
        return Ok(Value::Scalar(result.to_yaml()));
    }

    // Embedded form: interpolate every expression into the surrounding text.
    let mut rendered = String::with_capacity(text.len());
    let mut rest = text.as_str();
    while let Some(span) = find_expression(rest) {
        rendered.push_str(&rest[..span.start]);
        let result = evaluate(&rest[span.inner.clone()])?;
        rendered.push_str(&result.to_display());
        rest = &rest[span.end..];
    }
    rendered.push_str(rest);
    Ok(Value::Scalar(Yaml::String(rendered)))
}

struct ExprSpan {
    /// Byte offset of `$((`.
    start: usize,
    /// Byte offset just past the closing `))`.
    end: usize,
    /// Range of the expression text between the delimiters.
    inner: std::ops::Range<usize>,
}

/// Locate the first `$(( ... ))` expression, honoring nested parentheses.
fn find_expression(text: &str) -> Option<ExprSpan> {
    let start = text.find(MATH_OPEN)?;
    let body_start = start + MATH_OPEN.len();
    // The two opening parens of "$((" are open; the expression ends where
    // the paren depth returns to zero.
    let mut depth = 2usize;
    for (offset, ch) in text[body_start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let close = body_start + offset;
                    // inner excludes the first of the two closing parens
                    return Some(ExprSpan {
                        start,
                        end: close + 1,
                        inner: body_start..close - 1,
                    });
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn to_yaml(self) -> Yaml {
        match self {
            Num::Int(i) => Yaml::Integer(i),
            Num::Float(f) => Yaml::Real(format!("{f:?}")),
        }
    }

    fn to_display(self) -> String {
        match self {
            Num::Int(i) => i.to_string(),
            Num::Float(f) => format!("{f:?}"),
        }
    }

    fn as_float(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

/// Evaluate one expression string.
pub fn evaluate_expression(expr: &str) -> Result<Yaml, ConfigError> {
    evaluate(expr).map(Num::to_yaml)
}

fn evaluate(expr: &str) -> Result<Num, ConfigError> {
    let tokens = tokenize(expr)?;
    let mut parser = ExprParser {
        expr,
        tokens,
        pos: 0,
    };
    let result = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.error("trailing input after expression"));
    }
    Ok(result)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Num),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ConfigError> {
    let mut tokens = Vec::new();
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < bytes.len() && matches!(bytes[i] as char, '0'..='9' | '.') {
                    i += 1;
                }
                let literal = &expr[start..i];
                let number = if literal.contains('.') {
                    literal.parse::<f64>().map(Num::Float).map_err(|_| {
                        math_error(expr, format!("invalid number '{literal}'"))
                    })?
                } else {
                    literal.parse::<i64>().map(Num::Int).map_err(|_| {
                        math_error(expr, format!("invalid number '{literal}'"))
                    })?
                };
                tokens.push(Token::Number(number));
            }
            other => {
                return Err(math_error(
                    expr,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    expr: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser<'_> {
    fn error(&self, message: impl Into<String>) -> ConfigError {
        math_error(self.expr, message.into())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self) -> Result<Num, ConfigError> {
        let mut left = self.term()?;
        while let Some(op) = self.peek() {
            let op = match op {
                Token::Plus => Token::Plus,
                Token::Minus => Token::Minus,
                _ => break,
            };
            self.pos += 1;
            let right = self.term()?;
            left = apply(self.expr, &op, left, right)?;
        }
        Ok(left)
    }

    fn term(&mut self) -> Result<Num, ConfigError> {
        let mut left = self.factor()?;
        while let Some(op) = self.peek() {
            let op = match op {
                Token::Star => Token::Star,
                Token::Slash => Token::Slash,
                Token::Percent => Token::Percent,
                _ => break,
            };
            self.pos += 1;
            let right = self.factor()?;
            left = apply(self.expr, &op, left, right)?;
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Num, ConfigError> {
        match self.advance() {
            Some(Token::Number(number)) => Ok(number),
            Some(Token::Minus) => {
                let inner = self.factor()?;
                Ok(match inner {
                    Num::Int(i) => Num::Int(-i),
                    Num::Float(f) => Num::Float(-f),
                })
            }
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(token) => Err(self.error(format!("unexpected token {token:?}"))),
            None => Err(self.error("expression ended unexpectedly")),
        }
    }
}

fn apply(expr: &str, op: &Token, left: Num, right: Num) -> Result<Num, ConfigError> {
    use Num::{Float, Int};
    Ok(match (op, left, right) {
        (Token::Plus, Int(a), Int(b)) => Int(a.checked_add(b).ok_or_else(|| overflow(expr))?),
        (Token::Minus, Int(a), Int(b)) => Int(a.checked_sub(b).ok_or_else(|| overflow(expr))?),
        (Token::Star, Int(a), Int(b)) => Int(a.checked_mul(b).ok_or_else(|| overflow(expr))?),
        (Token::Slash, Int(a), Int(b)) => {
            if b == 0 {
                return Err(math_error(expr, "division by zero".to_string()));
            }
            if a % b == 0 {
                Int(a / b)
            } else {
                Float(a as f64 / b as f64)
            }
        }
        (Token::Percent, Int(a), Int(b)) => {
            if b == 0 {
                return Err(math_error(expr, "division by zero".to_string()));
            }
            Int(a % b)
        }
        (Token::Plus, a, b) => Float(a.as_float() + b.as_float()),
        (Token::Minus, a, b) => Float(a.as_float() - b.as_float()),
        (Token::Star, a, b) => Float(a.as_float() * b.as_float()),
        (Token::Slash, a, b) => {
            let divisor = b.as_float();
            if divisor == 0.0 {
                return Err(math_error(expr, "division by zero".to_string()));
            }
            Float(a.as_float() / divisor)
        }
        (Token::Percent, a, b) => Float(a.as_float() % b.as_float()),
        _ => return Err(math_error(expr, "invalid operator".to_string())),
    })
}

fn overflow(expr: &str) -> ConfigError {
    math_error(expr, "integer overflow".to_string())
}

fn math_error(expr: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::MathError {
        expr: expr.trim().to_string(),
        message: message.into(),
    }
}
