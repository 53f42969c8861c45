//! Lexer and recursive-descent parser for debugger expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary ('*' unary)*
//! unary   := ('+' | '-' | '&' | '*') unary | postfix
//! postfix := primary ('[' expr ']' | '.' ident)*
//! primary := int | float | string | ident | '(' expr ')'
//! ```

use std::fmt;

use crate::error::SymbolError;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    String(String),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Index(Box<Expr>, Box<Expr>), // arr[i]
    Member(Box<Expr>, String),   // s.f
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
    AddressOf,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::AddressOf => "&",
            UnaryOp::Deref => "*",
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
        })
    }
}

/// Renders the expression back to source form, parenthesizing binary operations.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{}", v),
            Expr::Float(v) => write!(f, "{}", v),
            Expr::String(s) => write!(f, "{:?}", s),
            Expr::Variable(name) => f.write_str(name),
            Expr::Unary { op, operand } => write!(f, "{}{}", op, operand),
            Expr::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expr::Index(base, index) => write!(f, "{}[{}]", base, index),
            Expr::Member(base, field) => write!(f, "{}.{}", base, field),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Amp,
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(v) => write!(f, "{}", v),
            Token::Float(v) => write!(f, "{}", v),
            Token::Str(s) => write!(f, "{:?}", s),
            Token::Ident(name) => f.write_str(name),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Amp => f.write_str("&"),
            Token::Dot => f.write_str("."),
            Token::LBracket => f.write_str("["),
            Token::RBracket => f.write_str("]"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Eof => f.write_str("end of input"),
        }
    }
}

fn syntax(position: usize, message: impl Into<String>) -> SymbolError {
    SymbolError::Syntax {
        position,
        message: message.into(),
    }
}

/// Tokens paired with their 1-based column.
fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, SymbolError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let column = i + 1;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '&' => Some(Token::Amp),
            '.' => Some(Token::Dot),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(token) = single {
            tokens.push((token, column));
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            if c == '0' && matches!(chars.get(i + 1), Some('x') | Some('X')) {
                i += 2;
                let digits_start = i;
                while i < chars.len() && chars[i].is_ascii_hexdigit() {
                    i += 1;
                }
                let digits: String = chars[digits_start..i].iter().collect();
                let value = i64::from_str_radix(&digits, 16)
                    .map_err(|_| syntax(column, format!("invalid hex literal '0x{}'", digits)))?;
                tokens.push((Token::Int(value), column));
                continue;
            }
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let is_float = chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit());
            if is_float {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| syntax(column, format!("invalid float literal '{}'", text)))?;
                tokens.push((Token::Float(value), column));
            } else {
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| syntax(column, format!("integer literal '{}' out of range", text)))?;
                tokens.push((Token::Int(value), column));
            }
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push((Token::Ident(chars[start..i].iter().collect()), column));
            continue;
        }

        if c == '"' {
            i += 1;
            let mut text = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(syntax(column, "unterminated string literal")),
                    Some('"') => {
                        i += 1;
                        break;
                    }
                    Some('\\') => {
                        let escaped = match chars.get(i + 1) {
                            Some('n') => '\n',
                            Some('t') => '\t',
                            Some(other) => *other,
                            None => return Err(syntax(column, "unterminated string literal")),
                        };
                        text.push(escaped);
                        i += 2;
                    }
                    Some(other) => {
                        text.push(*other);
                        i += 1;
                    }
                }
            }
            tokens.push((Token::Str(text), column));
            continue;
        }

        return Err(syntax(column, format!("unexpected character '{}'", c)));
    }

    tokens.push((Token::Eof, chars.len() + 1));
    Ok(tokens)
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn column(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), SymbolError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(syntax(
                self.column(),
                format!("expected '{}', found '{}'", expected, self.peek()),
            ))
        }
    }

    fn expr(&mut self) -> Result<Expr, SymbolError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, SymbolError> {
        let mut left = self.unary()?;
        while *self.peek() == Token::Star {
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op: BinaryOp::Multiply,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, SymbolError> {
        let op = match self.peek() {
            Token::Plus => UnaryOp::Plus,
            Token::Minus => UnaryOp::Negate,
            Token::Amp => UnaryOp::AddressOf,
            Token::Star => UnaryOp::Deref,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, SymbolError> {
        let mut base = self.primary()?;
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(Token::RBracket)?;
                    base = Expr::Index(Box::new(base), Box::new(index));
                }
                Token::Dot => {
                    self.advance();
                    let column = self.column();
                    match self.advance() {
                        Token::Ident(field) => base = Expr::Member(Box::new(base), field),
                        other => {
                            return Err(syntax(column, format!("expected field name, found '{}'", other)))
                        }
                    }
                }
                _ => return Ok(base),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, SymbolError> {
        let column = self.column();
        match self.advance() {
            Token::Int(v) => Ok(Expr::Int(v)),
            Token::Float(v) => Ok(Expr::Float(v)),
            Token::Str(s) => Ok(Expr::String(s)),
            Token::Ident(name) => Ok(Expr::Variable(name)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            other => Err(syntax(column, format!("expected an expression, found '{}'", other))),
        }
    }
}

/// Parse a complete expression; trailing tokens are an error.
pub fn parse(source: &str) -> Result<Expr, SymbolError> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
    };
    let expr = parser.expr()?;
    if *parser.peek() != Token::Eof {
        return Err(syntax(
            parser.column(),
            format!("unexpected '{}' after expression", parser.peek()),
        ));
    }
    Ok(expr)
}
