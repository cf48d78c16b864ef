//! A tokenizer for HP-41 MCODE assembly source.
//!
//! The output is a lossless, ordered partition of the input into
//! classified tokens, intended for syntax highlighting.

#[macro_use] extern crate log;

pub mod lexer;

pub use lexer::{Lexer, LexError, Token, TokenKind};

/// Tokenizes `source` with the process-wide lexer.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::shared()?.tokenize_all(source)
}
