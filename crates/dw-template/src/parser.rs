//! Template parser: builds a block AST from the token stream.
//!
//! Recognized statement forms (trailing colon optional in all of them):
//! `for <ident> in <expr>`, `endfor`, `if <expr>`, `elif <expr>`, `else`,
//! `endif`. Anything else is an invalid statement.

use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{tokenize, Position, Token, TokenKind};
use once_cell::sync::Lazy;
use regex::Regex;

static FOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^for\s+(\w+)\s+in\s+(.+?)\s*:?\s*$").expect("for regex"));
static IF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^if\s+(.+?)\s*:?\s*$").expect("if regex"));
static ELIF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^elif\s+(.+?)\s*:?\s*$").expect("elif regex"));

/// One branch of an `if` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: String,
    pub body: Vec<Node>,
    pub pos: Position,
}

/// A template AST node. Every node carries its source position.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim
    Text { text: String, pos: Position },
    /// `{{ … }}` — verbatim expression source
    Expr { expr: String, pos: Position },
    /// `{* for var in iter *} … {* endfor *}`
    For {
        var: String,
        iter: String,
        body: Vec<Node>,
        pos: Position,
    },
    /// `{* if c *} … {* elif c *} … {* else *} … {* endif *}`
    If {
        branches: Vec<Branch>,
        else_body: Option<Vec<Node>>,
        pos: Position,
    },
}

impl Node {
    pub fn pos(&self) -> Position {
        match self {
            Node::Text { pos, .. }
            | Node::Expr { pos, .. }
            | Node::For { pos, .. }
            | Node::If { pos, .. } => *pos,
        }
    }
}

/// A parsed template, immutable after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub nodes: Vec<Node>,
    pub file: String,
}

/// Statement classification, used both to parse and to decide when an
/// enclosing block parser should stop.
#[derive(Debug, Clone, PartialEq)]
enum Stmt {
    For { var: String, iter: String },
    EndFor,
    If { condition: String },
    Elif { condition: String },
    Else,
    EndIf,
    Unknown,
}

impl Stmt {
    fn classify(value: &str) -> Stmt {
        let value = value.trim();
        match value {
            "endfor" => return Stmt::EndFor,
            "endif" => return Stmt::EndIf,
            "else" | "else:" => return Stmt::Else,
            _ => {}
        }
        if let Some(caps) = FOR_PATTERN.captures(value) {
            return Stmt::For {
                var: caps[1].to_string(),
                iter: caps[2].to_string(),
            };
        }
        if let Some(caps) = IF_PATTERN.captures(value) {
            return Stmt::If {
                condition: caps[1].to_string(),
            };
        }
        if let Some(caps) = ELIF_PATTERN.captures(value) {
            return Stmt::Elif {
                condition: caps[1].to_string(),
            };
        }
        Stmt::Unknown
    }

    /// Discriminant-only comparison for stop sets.
    fn is_kind(&self, other: &Stmt) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// The template parser: recursive descent over the token stream.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: &str) -> Self {
        Self {
            tokens,
            pos: 0,
            file: file.to_string(),
        }
    }

    /// Parse the tokens into a template AST.
    pub fn parse(mut self) -> TemplateResult<Template> {
        let nodes = self.parse_nodes(&[])?;
        Ok(Template {
            nodes,
            file: self.file,
        })
    }

    /// Parse nodes until EOF or a statement whose kind is in `stop_on`
    /// (which is left unconsumed for the caller).
    fn parse_nodes(&mut self, stop_on: &[Stmt]) -> TemplateResult<Vec<Node>> {
        let mut nodes = Vec::new();

        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos].clone();

            match token.kind {
                TokenKind::Eof => return Ok(nodes),

                TokenKind::Text => {
                    nodes.push(Node::Text {
                        text: token.value,
                        pos: token.pos,
                    });
                    self.pos += 1;
                }

                TokenKind::Expr => {
                    nodes.push(Node::Expr {
                        expr: token.value,
                        pos: token.pos,
                    });
                    self.pos += 1;
                }

                TokenKind::Stmt => {
                    let stmt = Stmt::classify(&token.value);

                    // a stopping statement is left for the caller
                    if stop_on.iter().any(|s| stmt.is_kind(s)) {
                        return Ok(nodes);
                    }

                    match stmt {
                        Stmt::For { var, iter } => {
                            self.pos += 1;
                            let block = self.parse_for_block(var, iter, token.pos)?;
                            nodes.push(block);
                        }
                        Stmt::If { condition } => {
                            self.pos += 1;
                            let block = self.parse_if_block(condition, token.pos)?;
                            nodes.push(block);
                        }
                        Stmt::EndFor | Stmt::EndIf | Stmt::Else | Stmt::Elif { .. } => {
                            return Err(TemplateError::unmatched(
                                &self.file,
                                token.pos,
                                stmt_kind_name(&stmt),
                            ));
                        }
                        Stmt::Unknown => {
                            return Err(TemplateError::invalid_statement(
                                &self.file,
                                token.pos,
                                &token.value,
                            ));
                        }
                    }
                }
            }
        }

        Ok(nodes)
    }

    /// Parse a `for` body up to its matching `endfor`.
    fn parse_for_block(&mut self, var: String, iter: String, pos: Position) -> TemplateResult<Node> {
        let body = self.parse_nodes(&[Stmt::EndFor])?;

        match self.current_stmt() {
            Some(Stmt::EndFor) => {
                self.pos += 1;
                Ok(Node::For { var, iter, body, pos })
            }
            _ => Err(TemplateError::unmatched(&self.file, pos, "for")),
        }
    }

    /// Parse an `if` chain: primary branch, `elif`s, optional final `else`,
    /// terminated by `endif`.
    fn parse_if_block(&mut self, condition: String, pos: Position) -> TemplateResult<Node> {
        let stop: [Stmt; 3] = [
            Stmt::Elif { condition: String::new() },
            Stmt::Else,
            Stmt::EndIf,
        ];

        let body = self.parse_nodes(&stop)?;
        let mut branches = vec![Branch {
            condition,
            body,
            pos,
        }];
        let mut else_body = None;

        loop {
            let token = match self.tokens.get(self.pos) {
                Some(t) if t.kind == TokenKind::Stmt => t.clone(),
                _ => return Err(TemplateError::unmatched(&self.file, pos, "if")),
            };

            match Stmt::classify(&token.value) {
                Stmt::EndIf => {
                    self.pos += 1;
                    return Ok(Node::If {
                        branches,
                        else_body,
                        pos,
                    });
                }
                Stmt::Elif { condition } => {
                    self.pos += 1;
                    let elif_body = self.parse_nodes(&stop)?;
                    branches.push(Branch {
                        condition,
                        body: elif_body,
                        pos: token.pos,
                    });
                }
                Stmt::Else => {
                    self.pos += 1;
                    else_body = Some(self.parse_nodes(&[Stmt::EndIf])?);
                    match self.current_stmt() {
                        Some(Stmt::EndIf) => {
                            self.pos += 1;
                            return Ok(Node::If {
                                branches,
                                else_body,
                                pos,
                            });
                        }
                        _ => return Err(TemplateError::unmatched(&self.file, pos, "if")),
                    }
                }
                _ => return Err(TemplateError::unmatched(&self.file, pos, "if")),
            }
        }
    }

    fn current_stmt(&self) -> Option<Stmt> {
        let token = self.tokens.get(self.pos)?;
        if token.kind != TokenKind::Stmt {
            return None;
        }
        Some(Stmt::classify(&token.value))
    }
}

fn stmt_kind_name(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::For { .. } => "for",
        Stmt::EndFor => "endfor",
        Stmt::If { .. } => "if",
        Stmt::Elif { .. } => "elif",
        Stmt::Else => "else",
        Stmt::EndIf => "endif",
        Stmt::Unknown => "statement",
    }
}

/// Convenience: lex and parse a template string.
pub fn parse_string(input: &str, file: &str) -> TemplateResult<Template> {
    let tokens = tokenize(input, file)?;
    Parser::new(tokens, file).parse()
}

/// Parse a template body whose first line is `start_line` of its source
/// file (it sits below a frontmatter header).
pub fn parse_string_from_line(
    input: &str,
    file: &str,
    start_line: usize,
) -> TemplateResult<Template> {
    let tokens = crate::lexer::Lexer::with_start_line(input, file, start_line).tokenize()?;
    Parser::new(tokens, file).parse()
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
