//! dw-template - the Driftwood template language
//!
//! A split-delimiter template engine for SQL bodies: `{{ … }}` interpolates
//! an expression, `{* … *}` carries control flow (`for`, `if`/`elif`/`else`).
//! Expression bodies are evaluated by the embedded Starlark runtime
//! (`dw-star`); this crate owns the lexer, the block parser, and the
//! renderer.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod renderer;

pub use error::{TemplateError, TemplateResult, UnclosedKind};
pub use lexer::{tokenize, Lexer, Position, Token, TokenKind};
pub use parser::{parse_string, parse_string_from_line, Branch, Node, Parser, Template};
pub use renderer::{render_string, Renderer};
