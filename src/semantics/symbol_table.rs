use std::collections::BTreeMap;

use crate::Span;

use super::{
    asr::{ScopeId, StmtId, SymbolId},
    types::{Signature, Ttype},
};

/// One lexical scope. Names are kept sorted so dumps are deterministic.
/// `parent` is only followed for lookup; scopes never own each other.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SymbolTable {
    pub parent: Option<ScopeId>,
    symbols: BTreeMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new(parent: Option<ScopeId>) -> Self {
        SymbolTable {
            parent,
            symbols: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Binds `name`, returning the symbol it replaced.
    pub fn insert(&mut self, name: impl Into<String>, symbol: SymbolId) -> Option<SymbolId> {
        self.symbols.insert(name.into(), symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.symbols.iter().map(|(name, id)| (name.as_str(), *id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Local,
    In,
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub ty: Ttype,
    pub intent: Intent,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub scope: ScopeId,
    pub params: Box<[SymbolId]>,
    pub signature: Signature,
    /// Filled in once the body has been lowered; empty after a
    /// declarations-only run.
    pub body: Box<[StmtId]>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    pub body: Box<[StmtId]>,
}

/// A name brought in by `from module import original_name`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalSymbol {
    pub name: String,
    pub module: String,
    pub original_name: String,
    pub ty: Ttype,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(Variable),
    Function(Function),
    Program(Program),
    ExternalSymbol(ExternalSymbol),
    /// A module bound by `import module`.
    ExternalModule { name: String, module: String },
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(variable) => &variable.name,
            Symbol::Function(function) => &function.name,
            Symbol::Program(program) => &program.name,
            Symbol::ExternalSymbol(external) => &external.name,
            Symbol::ExternalModule { name, .. } => name,
        }
    }

    /// Type of the symbol when used as a value or callee.
    pub fn ty(&self) -> Option<Ttype> {
        match self {
            Symbol::Variable(variable) => Some(variable.ty.clone()),
            Symbol::Function(function) => {
                Some(Ttype::Function(Box::new(function.signature.clone())))
            }
            Symbol::ExternalSymbol(external) => Some(external.ty.clone()),
            Symbol::Program(_) | Symbol::ExternalModule { .. } => None,
        }
    }

    /// Signature of anything that can be called.
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Symbol::Function(function) => Some(&function.signature),
            Symbol::ExternalSymbol(ExternalSymbol {
                ty: Ttype::Function(signature),
                ..
            }) => Some(signature),
            _ => None,
        }
    }
}
