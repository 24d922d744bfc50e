//! Parser module for building an Abstract Syntax Tree (AST).
//!
//! This module contains the parser that transforms the token stream into an
//! arena-allocated AST. It uses a Pratt parser for expressions with proper
//! operator precedence and handles:
//!
//! - Simple statements (assignments, `return`, `import`, ...) and `;` lists
//! - Compound statements whose suites are delimited by INDENT/DEDENT
//! - Expression parsing (binary ops, comparison chains, calls, displays)
//! - First-error reporting with the offending token's span
//!
//! The parser uses NUD (null denotation) and LED (left denotation) functions
//! for expression parsing with binding power for precedence handling.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;

#[cfg(test)]
mod tests;
