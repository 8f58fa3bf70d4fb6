//! Arithmetic evaluator behind the `calculator` tool.
//!
//! Recursive descent over `+ - * /`, parentheses, unary minus and decimal
//! literals. Nothing else is accepted. Input length and nesting depth are
//! bounded since the expression comes from model text.

use std::fmt;

/// Deepest allowed nesting of parentheses and unary signs.
pub const MAX_DEPTH: usize = 64;

/// Longest accepted expression, in characters.
pub const MAX_INPUT_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    Empty,
    UnexpectedChar(char, usize),
    UnexpectedEnd,
    TrailingInput(usize),
    DivisionByZero,
    InvalidNumber(String),
    TooDeep(usize),
    TooLong(usize),
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::UnexpectedChar(c, pos) => write!(f, "unexpected '{}' at position {}", c, pos),
            Self::UnexpectedEnd => write!(f, "unexpected end of expression"),
            Self::TrailingInput(pos) => write!(f, "unexpected input at position {}", pos),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::InvalidNumber(n) => write!(f, "invalid number '{}'", n),
            Self::TooDeep(pos) => write!(
                f,
                "expression nested deeper than {} levels at position {}",
                MAX_DEPTH, pos
            ),
            Self::TooLong(len) => write!(
                f,
                "expression of {} characters exceeds the limit of {}",
                len, MAX_INPUT_CHARS
            ),
        }
    }
}

impl std::error::Error for CalcError {}

/// Evaluate `expr`.
pub fn evaluate(expr: &str) -> Result<f64, CalcError> {
    let chars: Vec<char> = expr.chars().collect();
    if chars.len() > MAX_INPUT_CHARS {
        return Err(CalcError::TooLong(chars.len()));
    }
    let mut parser = Parser {
        chars,
        pos: 0,
        depth: 0,
    };
    parser.skip_ws();
    if parser.at_end() {
        return Err(CalcError::Empty);
    }
    let value = parser.expression()?;
    parser.skip_ws();
    if !parser.at_end() {
        return Err(CalcError::TrailingInput(parser.pos));
    }
    Ok(value)
}

/// Integral values print without a fractional part.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('+') => {
                    self.pos += 1;
                    value += self.term()?;
                }
                Some('-') => {
                    self.pos += 1;
                    value -= self.term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        loop {
            self.skip_ws();
            match self.peek() {
                Some('*') => {
                    self.pos += 1;
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.pos += 1;
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    // factor := '-' factor | '+' factor | '(' expression ')' | number
    fn factor(&mut self) -> Result<f64, CalcError> {
        self.skip_ws();
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep(self.pos));
        }
        self.depth += 1;
        let value = self.nested_factor();
        self.depth -= 1;
        value
    }

    fn nested_factor(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            None => Err(CalcError::UnexpectedEnd),
            Some('-') => {
                self.pos += 1;
                Ok(-self.factor()?)
            }
            Some('+') => {
                self.pos += 1;
                self.factor()
            }
            Some('(') => {
                self.pos += 1;
                let value = self.expression()?;
                self.skip_ws();
                match self.peek() {
                    Some(')') => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(c) => Err(CalcError::UnexpectedChar(c, self.pos)),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(CalcError::UnexpectedChar(c, self.pos)),
        }
    }

    fn number(&mut self) -> Result<f64, CalcError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| CalcError::InvalidNumber(literal))
    }
}
