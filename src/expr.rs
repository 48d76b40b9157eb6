//! Metric expression parsing and evaluation.
//!
//! Expression metrics reference sibling metric results by name, e.g.
//! `{revenue} / {orders}`. The formula is parsed once into an AST and
//! tree-walked per cell; anything outside the grammar is rejected at
//! parse time, so no character filtering or dynamic code is involved.
//!
//! GRAMMAR:
//!   expression     --> additive
//!   additive       --> multiplicative ( ("+" | "-") multiplicative )*
//!   multiplicative --> unary ( ("*" | "/") unary )*
//!   unary          --> "-" unary | primary
//!   primary        --> NUMBER | "{" IDENT "}" | "(" expression ")"

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Parse errors with descriptive messages. Never crosses the engine
/// boundary: a metric whose formula fails to parse evaluates to null.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expression parse error: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

// ============================================================================
// TOKENS
// ============================================================================

/// Tokens recognized by the expression lexer.
#[derive(Debug, PartialEq, Clone)]
enum Token {
    Number(f64),
    /// A sibling metric reference: `{field}`.
    Reference(String),
    Plus,
    Minus,
    Asterisk,
    Slash,
    LParen,
    RParen,
    Eof,
    Illegal(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Reference(name) => write!(f, "{{{}}}", name),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Eof => write!(f, "<eof>"),
            Token::Illegal(c) => write!(f, "{}", c),
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars().peekable(),
        }
    }

    fn next_token(&mut self) -> Token {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }

        let c = match self.chars.next() {
            Some(c) => c,
            None => return Token::Eof,
        };

        match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => self.read_reference(),
            c if c.is_ascii_digit() || c == '.' => self.read_number(c),
            c => Token::Illegal(c),
        }
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut text = String::new();
        text.push(first);
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit() || *c == '.') {
            text.push(self.chars.next().unwrap());
        }
        match text.parse::<f64>() {
            Ok(n) => Token::Number(n),
            Err(_) => Token::Illegal(first),
        }
    }

    fn read_reference(&mut self) -> Token {
        let mut name = String::new();
        loop {
            match self.chars.next() {
                Some('}') => break,
                Some(c) if c.is_alphanumeric() || c == '_' || c == '.' => name.push(c),
                Some(c) => return Token::Illegal(c),
                None => return Token::Illegal('{'),
            }
        }
        Token::Reference(name)
    }
}

// ============================================================================
// AST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A parsed metric expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// A reference to a sibling metric's already-computed aggregate.
    Reference(String),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    Negate(Box<Expr>),
}

impl Expr {
    /// Tree-walking evaluation. Missing or non-finite references resolve
    /// to 0. Division follows IEEE f64 semantics; the caller maps any
    /// non-finite result to the configured placeholder.
    pub fn evaluate(&self, context: &FxHashMap<String, f64>) -> f64 {
        match self {
            Expr::Number(n) => *n,
            Expr::Reference(name) => context
                .get(name)
                .copied()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
            Expr::BinaryOp { left, op, right } => {
                let l = left.evaluate(context);
                let r = right.evaluate(context);
                match op {
                    BinaryOperator::Add => l + r,
                    BinaryOperator::Subtract => l - r,
                    BinaryOperator::Multiply => l * r,
                    BinaryOperator::Divide => l / r,
                }
            }
            Expr::Negate(operand) => -operand.evaluate(context),
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Recursive descent parser over the expression grammar.
struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    fn parse(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::Eof {
            return Err(ParseError::new("empty expression"));
        }

        let expr = self.parse_additive()?;

        if self.current_token != Token::Eof {
            return Err(ParseError::new(format!(
                "unexpected token after expression: {}",
                self.current_token
            )));
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token {
                Token::Asterisk => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.current_token == Token::Minus {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.current_token.clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Reference(name) => {
                self.advance();
                Ok(Expr::Reference(name))
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_additive()?;
                if self.current_token != Token::RParen {
                    return Err(ParseError::new("expected closing parenthesis"));
                }
                self.advance();
                Ok(expr)
            }
            token => Err(ParseError::new(format!("unexpected token: {}", token))),
        }
    }
}

/// Parses a metric formula into an AST.
pub fn parse_expression(input: &str) -> ParseResult<Expr> {
    Parser::new(input).parse()
}
