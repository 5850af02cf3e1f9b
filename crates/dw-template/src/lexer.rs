//! Split-delimiter template lexer.
//!
//! Tokenizes a model body into `TEXT`, `EXPR` (`{{ … }}`), `STMT`
//! (`{* … *}`), and a final `EOF`. Brace depth is tracked inside delimited
//! regions so dict literals like `{{ {"k": "v"} }}` lex as one expression.
//! Delimiters are recognized everywhere, including inside SQL comments.

use crate::error::{TemplateError, TemplateResult, UnclosedKind};

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Expr,
    Stmt,
    Eof,
}

/// One lexed token. Values of `EXPR`/`STMT` tokens are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub pos: Position,
}

/// The template lexer. Produces tokens once, in one pass.
pub struct Lexer {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
    file: String,
}

impl Lexer {
    pub fn new(input: &str, file: &str) -> Self {
        Self::with_start_line(input, file, 1)
    }

    /// Lex with positions starting at `start_line`, for template bodies that
    /// sit below a frontmatter header in their source file.
    pub fn with_start_line(input: &str, file: &str, start_line: usize) -> Self {
        Self {
            chars: input.chars().collect(),
            index: 0,
            line: start_line.max(1),
            column: 1,
            file: file.to_string(),
        }
    }

    /// Tokenize the whole input, ending with an `EOF` token.
    pub fn tokenize(mut self) -> TemplateResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut text = String::new();
        let mut text_pos = self.position();

        loop {
            if self.at_end() {
                if !text.is_empty() {
                    tokens.push(Token {
                        kind: TokenKind::Text,
                        value: std::mem::take(&mut text),
                        pos: text_pos,
                    });
                }
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    value: String::new(),
                    pos: self.position(),
                });
                return Ok(tokens);
            }

            if self.looking_at('{', '{') || self.looking_at('{', '*') {
                if !text.is_empty() {
                    tokens.push(Token {
                        kind: TokenKind::Text,
                        value: std::mem::take(&mut text),
                        pos: text_pos,
                    });
                }
                let token = if self.looking_at('{', '{') {
                    self.lex_delimited(TokenKind::Expr)?
                } else {
                    self.lex_delimited(TokenKind::Stmt)?
                };
                tokens.push(token);
                text_pos = self.position();
            } else {
                if text.is_empty() {
                    text_pos = self.position();
                }
                text.push(self.advance());
            }
        }
    }

    /// Lex one `{{ … }}` or `{* … *}` region, the opener already sighted.
    fn lex_delimited(&mut self, kind: TokenKind) -> TemplateResult<Token> {
        let open_pos = self.position();
        let unclosed_kind = match kind {
            TokenKind::Expr => UnclosedKind::Expr,
            _ => UnclosedKind::Stmt,
        };
        self.advance();
        self.advance();

        let mut value = String::new();
        let mut depth: usize = 0;

        loop {
            if self.at_end() {
                return Err(TemplateError::unclosed(&self.file, open_pos, unclosed_kind));
            }
            let c = self.peek();
            match (kind, c) {
                (TokenKind::Expr, '}') => {
                    if depth > 0 {
                        depth -= 1;
                        value.push(self.advance());
                    } else if self.peek_next() == Some('}') {
                        self.advance();
                        self.advance();
                        break;
                    } else {
                        value.push(self.advance());
                    }
                }
                (TokenKind::Stmt, '*') if depth == 0 && self.peek_next() == Some('}') => {
                    self.advance();
                    self.advance();
                    break;
                }
                (TokenKind::Stmt, '}') if depth > 0 => {
                    depth -= 1;
                    value.push(self.advance());
                }
                (_, '{') => {
                    depth += 1;
                    value.push(self.advance());
                }
                _ => value.push(self.advance()),
            }
        }

        Ok(Token {
            kind,
            value: value.trim().to_string(),
            pos: open_pos,
        })
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn at_end(&self) -> bool {
        self.index >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.chars[self.index]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn looking_at(&self, a: char, b: char) -> bool {
        self.chars.get(self.index) == Some(&a) && self.chars.get(self.index + 1) == Some(&b)
    }

    fn advance(&mut self) -> char {
        let c = self.chars[self.index];
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }
}

/// Convenience: lex a template string.
pub fn tokenize(input: &str, file: &str) -> TemplateResult<Vec<Token>> {
    Lexer::new(input, file).tokenize()
}

#[cfg(test)]
#[path = "lexer_test.rs"]
mod tests;
