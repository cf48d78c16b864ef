//! The lexer module turns MCODE source text into a stream of
//! classified tokens.
//!
//! It is a table-driven state machine: each state holds an ordered
//! list of rules, the first rule that matches at the cursor wins, and
//! its transition may push an operand mode or pop back to the caller.
//! Operand modes last until the end of the current line.

pub mod driver;
pub mod mnemonics;
pub mod rules;
pub mod token;

pub use driver::{Lexer, Tokens};
pub use rules::{LexError, State};
pub use token::{Token, TokenKind};
