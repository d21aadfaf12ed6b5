//! Tokenizer for the restricted line language.

use crate::interp::error::{EvalError, EvalResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    And,
    As,
    Break,
    Continue,
    Def,
    Elif,
    Else,
    False,
    For,
    From,
    If,
    Import,
    In,
    Is,
    Lambda,
    None,
    Not,
    Or,
    Pass,
    Return,
    True,
    While,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Keyword> {
        let kw = match word {
            "and" => Keyword::And,
            "as" => Keyword::As,
            "break" => Keyword::Break,
            "continue" => Keyword::Continue,
            "def" => Keyword::Def,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "False" => Keyword::False,
            "for" => Keyword::For,
            "from" => Keyword::From,
            "if" => Keyword::If,
            "import" => Keyword::Import,
            "in" => Keyword::In,
            "is" => Keyword::Is,
            "lambda" => Keyword::Lambda,
            "None" => Keyword::None,
            "not" => Keyword::Not,
            "or" => Keyword::Or,
            "pass" => Keyword::Pass,
            "return" => Keyword::Return,
            "True" => Keyword::True,
            "while" => Keyword::While,
            _ => return None,
        };
        Some(kw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Imaginary(f64),
    Str(String),
    Name(String),
    Keyword(Keyword),

    // Arithmetic
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,

    // Bitwise
    Amp,
    Pipe,
    Caret,
    Tilde,
    LeftShift,
    RightShift,

    // Comparison
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    EqualEqual,
    NotEqual,

    // Assignment
    Assign,
    AugAssign(AugOp),

    // Grouping
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // Separators
    Comma,
    Colon,
    Semicolon,
    Dot,
    Newline,

    Eof,
}

/// Operator half of an augmented assignment such as `+=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AugOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    index: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            index: 0,
        }
    }

    pub fn tokenize(mut self) -> EvalResult<Vec<Token>> {
        let mut tokens = Vec::new();
        // Newlines inside brackets are insignificant.
        let mut depth = 0usize;

        loop {
            self.skip_whitespace_and_comments();
            let position = self.offset();
            let Some(ch) = self.current() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position,
                });
                return Ok(tokens);
            };

            let kind = match ch {
                '\n' => {
                    self.advance();
                    if depth > 0 {
                        continue;
                    }
                    TokenKind::Newline
                }
                '0'..='9' => self.number()?,
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.number()?,
                '\'' | '"' => self.string(ch)?,
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.identifier();
                    // String prefixes such as r'..' are not part of the language.
                    match Keyword::lookup(&word) {
                        Some(kw) => TokenKind::Keyword(kw),
                        None => TokenKind::Name(word),
                    }
                }
                _ => {
                    let kind = self.operator(ch, position)?;
                    match kind {
                        TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::LeftBrace => {
                            depth += 1
                        }
                        TokenKind::RightParen
                        | TokenKind::RightBracket
                        | TokenKind::RightBrace => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    kind
                }
            };
            tokens.push(Token { kind, position });
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.index).map(|(_, c)| *c)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.index + 1).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.index)
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current() {
            match ch {
                ' ' | '\t' | '\r' => self.advance(),
                '\\' if self.peek() == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '#' => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn identifier(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.current() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn digits(&mut self, text: &mut String, radix: u32) {
        while let Some(c) = self.current() {
            if c.is_digit(radix) {
                text.push(c);
                self.advance();
            } else if c == '_' && self.peek().is_some_and(|n| n.is_digit(radix)) {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn number(&mut self) -> EvalResult<TokenKind> {
        if self.current() == Some('0') {
            let radix = match self.peek() {
                Some('x' | 'X') => Some(16),
                Some('o' | 'O') => Some(8),
                Some('b' | 'B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                self.advance();
                let mut text = String::new();
                self.digits(&mut text, radix);
                if text.is_empty() {
                    return Err(EvalError::syntax("invalid number literal"));
                }
                return i64::from_str_radix(&text, radix)
                    .map(TokenKind::Int)
                    .map_err(|_| EvalError::overflow());
            }
        }

        let mut text = String::new();
        let mut is_float = false;
        self.digits(&mut text, 10);
        if self.current() == Some('.') && !self.peek().is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            is_float = true;
            text.push('.');
            self.advance();
            self.digits(&mut text, 10);
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let sign = self.peek();
            let has_exponent = match sign {
                Some('+' | '-') => self
                    .chars
                    .get(self.index + 2)
                    .is_some_and(|(_, c)| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if has_exponent {
                is_float = true;
                text.push('e');
                self.advance();
                if let Some(c @ ('+' | '-')) = self.current() {
                    text.push(c);
                    self.advance();
                }
                self.digits(&mut text, 10);
            }
        }

        if matches!(self.current(), Some('j' | 'J')) {
            self.advance();
            let value: f64 = text
                .parse()
                .map_err(|_| EvalError::syntax("invalid imaginary literal"))?;
            return Ok(TokenKind::Imaginary(value));
        }
        if self.current().is_some_and(|c| c.is_alphabetic() || c == '_') {
            return Err(EvalError::syntax("invalid decimal literal"));
        }

        if is_float {
            text.parse()
                .map(TokenKind::Float)
                .map_err(|_| EvalError::syntax("invalid float literal"))
        } else {
            text.parse()
                .map(TokenKind::Int)
                .map_err(|_| EvalError::overflow())
        }
    }

    fn string(&mut self, quote: char) -> EvalResult<TokenKind> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                None | Some('\n') => {
                    return Err(EvalError::syntax("unterminated string literal"));
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(TokenKind::Str(value));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some(other) => {
                            value.push('\\');
                            other
                        }
                        None => return Err(EvalError::syntax("unterminated string literal")),
                    };
                    value.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    fn operator(&mut self, ch: char, position: usize) -> EvalResult<TokenKind> {
        self.advance();
        let kind = match ch {
            '+' => self.with_aug(TokenKind::Plus, AugOp::Add),
            '-' => self.with_aug(TokenKind::Minus, AugOp::Sub),
            '%' => self.with_aug(TokenKind::Percent, AugOp::Mod),
            '*' => {
                if self.eat('*') {
                    self.with_aug(TokenKind::DoubleStar, AugOp::Pow)
                } else {
                    self.with_aug(TokenKind::Star, AugOp::Mul)
                }
            }
            '/' => {
                if self.eat('/') {
                    self.with_aug(TokenKind::DoubleSlash, AugOp::FloorDiv)
                } else {
                    self.with_aug(TokenKind::Slash, AugOp::Div)
                }
            }
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '<' => {
                if self.eat('<') {
                    TokenKind::LeftShift
                } else if self.eat('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                if self.eat('>') {
                    TokenKind::RightShift
                } else if self.eat('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '=' => {
                if self.eat('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Assign
                }
            }
            '!' if self.eat('=') => TokenKind::NotEqual,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Dot,
            other => {
                return Err(EvalError::syntax(format!(
                    "invalid character '{other}' at position {position}"
                )))
            }
        };
        Ok(kind)
    }

    fn with_aug(&mut self, plain: TokenKind, op: AugOp) -> TokenKind {
        if self.eat('=') {
            TokenKind::AugAssign(op)
        } else {
            plain
        }
    }
}

pub fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}
