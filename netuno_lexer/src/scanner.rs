//! The Netuno scanner.
//!
//! Whitespace separates tokens; `;` starts a line comment. Identifiers are
//! ASCII words. Number literals default to `i32`, take the suffixes `i`, `u`,
//! `ul`, `l`, or a fractional part (`f` suffix selects `f32`, otherwise
//! `f64`). String lexemes keep their surrounding quotes.

use crate::error::LexError;
use crate::token::{KeywordId, Token, TokenType};
use hashbrown::HashMap;

pub struct Scanner<'src> {
    source: Vec<char>,
    source_name: &'src str,
    keywords: HashMap<&'static str, KeywordId>,
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &str, source_name: &'src str) -> Self {
        let mut keywords = HashMap::new();
        for &id in KeywordId::named_keywords() {
            keywords.insert(id.lexeme(), id);
        }

        Self {
            source: source.chars().collect(),
            source_name,
            keywords,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source_name
    }

    pub fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    /// Scan the entire source, failing on the first error token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan_token();
            match token.token_type {
                TokenType::Error => {
                    return Err(LexError::InvalidToken {
                        line: token.line,
                        message: token.lexeme,
                    })
                }
                TokenType::Eof => {
                    tokens.push(token);
                    return Ok(tokens);
                }
                _ => tokens.push(token),
            }
        }
    }

    pub fn scan_token(&mut self) -> Token {
        self.skip_whitespace();
        self.start = self.current;

        if self.is_at_end() {
            return self.make_token(TokenType::Eof);
        }

        let c = self.advance();

        if c.is_ascii_alphabetic() || c == '_' {
            return self.identifier();
        }
        if c.is_ascii_digit() {
            return self.number();
        }

        match c {
            '+' => {
                let id = if self.matches('+') {
                    KeywordId::Inc
                } else if self.matches('=') {
                    KeywordId::AddAssign
                } else {
                    KeywordId::Plus
                };
                self.make_keyword(id)
            }
            '-' => {
                let id = if self.matches('-') {
                    KeywordId::Dec
                } else if self.matches('=') {
                    KeywordId::SubAssign
                } else {
                    KeywordId::Minus
                };
                self.make_keyword(id)
            }
            '*' => {
                let id = if self.matches('=') {
                    KeywordId::MulAssign
                } else {
                    KeywordId::Star
                };
                self.make_keyword(id)
            }
            '/' => {
                let id = if self.matches('=') {
                    KeywordId::DivAssign
                } else {
                    KeywordId::Slash
                };
                self.make_keyword(id)
            }
            '%' => {
                let id = if self.matches('=') {
                    KeywordId::ModAssign
                } else {
                    KeywordId::Percent
                };
                self.make_keyword(id)
            }
            '^' => {
                let id = if self.matches('=') {
                    KeywordId::XorAssign
                } else {
                    KeywordId::Caret
                };
                self.make_keyword(id)
            }
            '=' => {
                let id = if self.matches('=') {
                    KeywordId::Eq
                } else if self.matches('>') {
                    KeywordId::Arrow
                } else {
                    KeywordId::Assign
                };
                self.make_keyword(id)
            }
            '!' => {
                let id = if self.matches('=') {
                    KeywordId::Ne
                } else {
                    KeywordId::Bang
                };
                self.make_keyword(id)
            }
            '&' => {
                let id = if self.matches('&') {
                    KeywordId::LogAnd
                } else {
                    KeywordId::Amp
                };
                self.make_keyword(id)
            }
            '|' => {
                let id = if self.matches('|') {
                    KeywordId::LogOr
                } else {
                    KeywordId::Pipe
                };
                self.make_keyword(id)
            }
            '<' => {
                let id = if self.matches('<') {
                    if self.matches('=') {
                        KeywordId::ShlAssign
                    } else {
                        KeywordId::Shl
                    }
                } else if self.matches('=') {
                    KeywordId::Le
                } else {
                    KeywordId::Less
                };
                self.make_keyword(id)
            }
            '>' => {
                let id = if self.matches('>') {
                    if self.matches('=') {
                        KeywordId::ShrAssign
                    } else {
                        KeywordId::Shr
                    }
                } else if self.matches('=') {
                    KeywordId::Ge
                } else {
                    KeywordId::Greater
                };
                self.make_keyword(id)
            }
            '.' => self.make_keyword(KeywordId::Dot),
            '(' => self.make_keyword(KeywordId::LeftParen),
            ')' => self.make_keyword(KeywordId::RightParen),
            '[' => self.make_keyword(KeywordId::LeftBracket),
            ']' => self.make_keyword(KeywordId::RightBracket),
            '{' => self.make_keyword(KeywordId::LeftBrace),
            '}' => self.make_keyword(KeywordId::RightBrace),
            '?' => self.make_keyword(KeywordId::Question),
            '~' => self.make_keyword(KeywordId::Tilde),
            ',' => self.make_keyword(KeywordId::Comma),
            ':' => self.make_keyword(KeywordId::Colon),
            '\'' => self.character(),
            '"' => self.string(),
            _ => self.error_token(format!("Unexpected character '{}'.", c)),
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some('\n') => {
                    self.line += 1;
                    self.current += 1;
                }
                Some(' ') | Some('\r') | Some('\t') => {
                    self.current += 1;
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.current += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.current += 1;
            } else {
                break;
            }
        }

        let lexeme: String = self.source[self.start..self.current].iter().collect();
        if let Some(&id) = self.keywords.get(lexeme.as_str()) {
            return Token::new(TokenType::Keyword(id), lexeme, self.line);
        }
        Token::new(TokenType::Identifier, lexeme, self.line)
    }

    fn number(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.current += 1;
        }

        let mut token_type = TokenType::I32;
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit()) {
            token_type = TokenType::F64;

            // consume '.'
            self.current += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.current += 1;
            }

            if self.matches('f') {
                token_type = TokenType::F32;
            }
        } else {
            match self.peek() {
                Some('i') => {
                    token_type = TokenType::I32;
                    self.current += 1;
                }
                Some('u') => {
                    if self.peek_next() == Some('l') {
                        token_type = TokenType::U64;
                        self.current += 1;
                    } else {
                        token_type = TokenType::U32;
                    }
                    self.current += 1;
                }
                Some('l') => {
                    token_type = TokenType::I64;
                    self.current += 1;
                }
                _ => {}
            }
        }

        self.make_token(token_type)
    }

    fn string(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            if c == '\\' {
                // skip the escaped character; decoding happens downstream
                self.current += 1;
            }
            self.current += 1;
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string.");
        }

        // the closing quote
        self.current += 1;
        self.make_token(TokenType::String)
    }

    fn character(&mut self) -> Token {
        if self.matches('\\') {
            // escaped character
            self.current += 1;
        } else {
            self.current += 1;
        }

        if !self.matches('\'') {
            return self.error_token("Unterminated char.");
        }
        self.make_token(TokenType::Char)
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        Token::new(token_type, lexeme, self.line)
    }

    fn make_keyword(&self, id: KeywordId) -> Token {
        self.make_token(TokenType::Keyword(id))
    }

    fn error_token(&self, message: impl Into<String>) -> Token {
        Token::new(TokenType::Error, message, self.line)
    }
}

/// Decode the escape sequences of a string literal body (quotes already
/// stripped). Unknown escapes keep the escaped character as written.
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('e') => out.push('\x1B'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}
