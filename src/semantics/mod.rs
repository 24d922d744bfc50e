//! Semantic analysis: turns the parsed AST into the typed ASR.
//!
//! Submodules:
//! - types: the type lattice and numeric promotion
//! - asr: ASR nodes, their arena and the translation unit
//! - symbol_table: scopes and the symbols they bind
//! - ast_to_asr: the analyzer proper
//! - fold: constant folding of operators over literal values
//! - intrinsics: typing and compile-time evaluation of builtin functions
//! - pickle: deterministic S-expression dump of a translation unit
pub mod asr;
pub mod ast_to_asr;
pub mod fold;
pub mod intrinsics;
pub mod pickle;
pub mod symbol_table;
pub mod types;

#[cfg(test)]
mod tests;
