//! Lexical analysis module for the compiler.
//!
//! Converts source text into a stream of tokens for the parser. It handles:
//!
//! - Recognition of keywords, identifiers, literals, and operators via a
//!   table of anchored regex patterns
//! - The off-side rule: `Indent`/`Dedent`/`Newline` tokens derived from
//!   leading whitespace, with newlines ignored inside brackets
//! - Comments, blank lines and `\` continuations
//! - Byte-offset spans on every token

pub mod lexer;
pub mod tokens;

#[cfg(test)]
mod tests;
