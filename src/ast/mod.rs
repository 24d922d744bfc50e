/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the syntax tree
///
/// Submodules:
/// - ast: Arena storage, node handles and the `Module` root
/// - expressions: Expression node kinds and operators
/// - statements: Statement node kinds
/// - pickle: Deterministic S-expression dump of a module
pub mod ast;
pub mod expressions;
pub mod pickle;
pub mod statements;
