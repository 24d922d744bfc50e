//! Lowering from the parsed AST to the typed ASR.
//!
//! Analysis runs in two passes over the module:
//!
//! 1. declarations: every top-level function signature, every annotated
//!    global and every import is entered into the global symbol table, so
//!    statements may refer to functions defined further down;
//! 2. lowering: top-level statements first, then each function body.
//!
//! Types are resolved and constants folded as nodes are built. The first
//! error aborts the unit.

use std::collections::{HashMap, HashSet};

use num_complex::Complex64;
use tracing::debug;

use crate::{
    arena::Arena,
    ast::{
        ast::{AstArena, ExprId as AstExprId, Module, StmtId as AstStmtId},
        expressions::{
            BoolOperator, CompareOperator, ExprKind as AstExprKind, Keyword, Operator,
            UnaryOperator,
        },
        statements::{Alias, Arg, StmtKind as AstStmtKind},
    },
    errors::{
        diagnostics::Diagnostics,
        errors::{Error, ErrorImpl},
    },
    Span,
};

use super::{
    asr::{
        AsrArena, CastKind, ExprId, ExprKind, ModuleInterface, ScopeId, StmtId, StmtKind,
        SymbolId, TranslationUnit,
    },
    fold::{check_width, constant_of, fold_binop, fold_compare, fold_unary, unary_symbol, Scalar},
    intrinsics::{self, Intrinsic},
    symbol_table::{ExternalSymbol, Function, Intent, Program, Symbol, Variable},
    types::{assignable, promote, Family, Signature, Ttype, COMPLEX, INTEGER, REAL},
};

/// Name of the symbol holding the top-level statements of a main module.
pub const MAIN_PROGRAM: &str = "main_program";

fn unsupported(feature: impl Into<String>, span: Span) -> Error {
    Error::new(ErrorImpl::unsupported(feature), span)
}

fn type_mismatch(expected: impl ToString, received: impl ToString, span: Span) -> Error {
    Error::new(
        ErrorImpl::TypeMatchError {
            expected: expected.to_string(),
            received: received.to_string(),
        },
        span,
    )
}

/// Source-like rendering of an annotation or callee, for diagnostics.
fn describe(ast: &AstArena, id: AstExprId) -> String {
    match &ast.expr(id).kind {
        AstExprKind::Name { id, .. } => id.clone(),
        AstExprKind::Attribute { value, attr, .. } => format!("{}.{}", describe(ast, *value), attr),
        AstExprKind::Subscript { value, slice, .. } => {
            format!("{}[{}]", describe(ast, *value), describe(ast, *slice))
        }
        AstExprKind::Tuple { elements, .. } => elements
            .iter()
            .map(|element| describe(ast, *element))
            .collect::<Vec<_>>()
            .join(", "),
        AstExprKind::NoneLiteral => "None".to_string(),
        _ => "expression".to_string(),
    }
}

/// Position of index `n` in a sequence of `len` elements, counting negative
/// indices from the end.
fn normalize_index(n: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if n < 0 { n + len } else { n };
    (0..len).contains(&index).then_some(index as usize)
}

/// Outcome of lowering a call.
enum Call {
    Value(ExprId),
    /// A function without a return type; only valid as a statement.
    Subroutine {
        function: SymbolId,
        args: Box<[ExprId]>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sequence {
    List,
    Set,
}

pub struct SemanticAnalyzer<'a> {
    ast: &'a AstArena,
    asr: &'a mut AsrArena,
    /// Modules that `import` statements may name.
    interfaces: HashMap<String, ModuleInterface>,
    global_scope: ScopeId,
    /// Scope new variables are declared in.
    scope: ScopeId,
    /// Function whose body is being lowered.
    function: Option<SymbolId>,
    loop_depth: usize,
    /// Annotated globals entered by the declarations pass and not yet
    /// reached by lowering.
    predeclared: HashSet<String>,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(arena: &'a mut Arena) -> Self {
        let Arena { ast, asr } = arena;
        let global_scope = asr.alloc_scope(None);
        SemanticAnalyzer {
            ast,
            asr,
            interfaces: HashMap::new(),
            global_scope,
            scope: global_scope,
            function: None,
            loop_depth: 0,
            predeclared: HashSet::new(),
        }
    }

    /// Makes the symbols of another unit importable.
    pub fn with_interface(mut self, interface: ModuleInterface) -> Self {
        self.interfaces.insert(interface.name.clone(), interface);
        self
    }

    pub fn analyze(
        mut self,
        module: &Module,
        main_module: bool,
        symtab_only: bool,
    ) -> Result<TranslationUnit, Diagnostics> {
        self.run(module, main_module, symtab_only)
            .map_err(Diagnostics::from)
    }

    fn run(
        &mut self,
        module: &Module,
        main_module: bool,
        symtab_only: bool,
    ) -> Result<TranslationUnit, Error> {
        self.declare_module(module)?;
        debug!(
            symbols = self.asr.scope(self.global_scope).len(),
            "collected declarations"
        );

        let body = if symtab_only {
            Vec::new()
        } else {
            self.lower_module(module)?
        };

        let body = if main_module {
            let program = Symbol::Program(Program {
                name: MAIN_PROGRAM.to_string(),
                body: body.into_boxed_slice(),
            });
            if self.asr.scope(self.global_scope).contains(MAIN_PROGRAM) {
                return Err(Error::new(
                    ErrorImpl::FunctionAlreadyDeclared {
                        function: MAIN_PROGRAM.to_string(),
                    },
                    module.span,
                ));
            }
            self.bind_global(MAIN_PROGRAM.to_string(), program, module.span)?;
            Box::default()
        } else {
            body.into_boxed_slice()
        };

        Ok(TranslationUnit {
            global_scope: self.global_scope,
            body,
            is_main: main_module,
        })
    }

    fn declare_module(&mut self, module: &Module) -> Result<(), Error> {
        let ast = self.ast;
        for &id in module.body.iter() {
            let stmt = ast.stmt(id);
            match &stmt.kind {
                AstStmtKind::FunctionDef {
                    name,
                    args,
                    returns,
                    ..
                } => self.declare_function(name, args, *returns, stmt.span)?,
                AstStmtKind::AnnotatedAssign {
                    target, annotation, ..
                } => {
                    if let AstExprKind::Name { id: name, .. } = &ast.expr(*target).kind {
                        let ty = self.resolve_annotation(*annotation)?;
                        self.declare_variable(name, ty, Intent::Local, stmt.span)?;
                        self.predeclared.insert(name.clone());
                    }
                }
                AstStmtKind::Import(names) => {
                    for alias in names.iter() {
                        self.import_module(alias, stmt.span)?;
                    }
                }
                AstStmtKind::ImportFrom { module, names } => {
                    for alias in names.iter() {
                        self.import_symbol(module, alias, stmt.span)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn declare_function(
        &mut self,
        name: &str,
        args: &[Arg],
        returns: Option<AstExprId>,
        span: Span,
    ) -> Result<(), Error> {
        if self.asr.scope(self.global_scope).contains(name) {
            return Err(Error::new(
                ErrorImpl::FunctionAlreadyDeclared {
                    function: name.to_string(),
                },
                span,
            ));
        }

        let scope = self.asr.alloc_scope(Some(self.global_scope));
        let mut params = Vec::with_capacity(args.len());
        let mut types = Vec::with_capacity(args.len());
        for arg in args {
            let Some(annotation) = arg.annotation else {
                return Err(Error::new(
                    ErrorImpl::MissingAnnotation {
                        parameter: arg.name.clone(),
                    },
                    arg.span,
                ));
            };
            let ty = self.resolve_annotation(annotation)?;
            if let Some(existing) = self.asr.scope(scope).get(&arg.name) {
                return Err(self.already_declared(&arg.name, existing, arg.span));
            }

            let param = self.asr.alloc_symbol(Symbol::Variable(Variable {
                name: arg.name.clone(),
                ty: ty.clone(),
                intent: Intent::In,
                span: arg.span,
            }));
            self.asr.scope_mut(scope).insert(arg.name.clone(), param);
            params.push(param);
            types.push(ty);
        }

        let returns = match returns {
            Some(id) if !matches!(self.ast.expr(id).kind, AstExprKind::NoneLiteral) => {
                Some(self.resolve_annotation(id)?)
            }
            _ => None,
        };

        let function = Symbol::Function(Function {
            name: name.to_string(),
            scope,
            params: params.into_boxed_slice(),
            signature: Signature {
                params: types.into_boxed_slice(),
                returns,
            },
            body: Box::default(),
            span,
        });
        self.bind_global(name.to_string(), function, span)?;
        debug!(function = name, "declared function");
        Ok(())
    }

    fn resolve_annotation(&self, id: AstExprId) -> Result<Ttype, Error> {
        let ast = self.ast;
        let expr = ast.expr(id);
        let unknown = || {
            Error::new(
                ErrorImpl::UnknownType {
                    type_: describe(ast, id),
                },
                expr.span,
            )
        };

        match &expr.kind {
            AstExprKind::Name { id: name, .. } => {
                let ty = match name.as_str() {
                    "int" | "i64" => INTEGER,
                    "i8" => Ttype::Integer { bits: 8 },
                    "i16" => Ttype::Integer { bits: 16 },
                    "i32" => Ttype::Integer { bits: 32 },
                    "float" | "f64" => REAL,
                    "f32" => Ttype::Real { bits: 32 },
                    "complex" | "c64" => COMPLEX,
                    "c32" => Ttype::Complex { bits: 32 },
                    "bool" => Ttype::Logical,
                    "str" => Ttype::Character,
                    _ => return Err(unknown()),
                };
                Ok(ty)
            }
            AstExprKind::Subscript { value, slice, .. } => {
                let AstExprKind::Name { id: container, .. } = &ast.expr(*value).kind else {
                    return Err(unknown());
                };
                let params = match &ast.expr(*slice).kind {
                    AstExprKind::Tuple { elements, .. } => elements.to_vec(),
                    _ => vec![*slice],
                };
                let params = params
                    .into_iter()
                    .map(|param| self.resolve_annotation(param))
                    .collect::<Result<Vec<_>, _>>()?;

                match (container.as_str(), params.as_slice()) {
                    ("list", [element]) => Ok(Ttype::Array(Box::new(element.clone()))),
                    ("set", [element]) => Ok(Ttype::Set(Box::new(element.clone()))),
                    ("dict", [key, value]) => Ok(Ttype::Dict(
                        Box::new(key.clone()),
                        Box::new(value.clone()),
                    )),
                    ("tuple", elements) if !elements.is_empty() => {
                        Ok(Ttype::Tuple(elements.to_vec().into_boxed_slice()))
                    }
                    _ => Err(unknown()),
                }
            }
            _ => Err(unknown()),
        }
    }

    fn interface(&self, module: &str, span: Span) -> Result<&ModuleInterface, Error> {
        self.interfaces.get(module).ok_or_else(|| {
            Error::new(
                ErrorImpl::ModuleNotFound {
                    module: module.to_string(),
                },
                span,
            )
        })
    }

    fn exported(&self, module: &str, name: &str, span: Span) -> Result<Ttype, Error> {
        self.interface(module, span)?
            .symbols
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::SymbolNotExported {
                        name: name.to_string(),
                        module: module.to_string(),
                    },
                    span,
                )
            })
    }

    fn import_module(&mut self, alias: &Alias, span: Span) -> Result<(), Error> {
        self.interface(&alias.name, span)?;
        let name = alias.asname.clone().unwrap_or_else(|| alias.name.clone());
        let module = Symbol::ExternalModule {
            name: name.clone(),
            module: alias.name.clone(),
        };
        self.bind_global(name, module, span)?;
        Ok(())
    }

    fn import_symbol(&mut self, module: &str, alias: &Alias, span: Span) -> Result<(), Error> {
        let ty = self.exported(module, &alias.name, span)?;
        let name = alias.asname.clone().unwrap_or_else(|| alias.name.clone());
        let external = Symbol::ExternalSymbol(ExternalSymbol {
            name: name.clone(),
            module: module.to_string(),
            original_name: alias.name.clone(),
            ty,
        });
        self.bind_global(name, external, span)?;
        Ok(())
    }

    /// `module.attr` where `module` was bound by `import`. The member is
    /// entered into the global scope under its dotted name on first use.
    fn module_member(&mut self, value: AstExprId, attr: &str, span: Span) -> Result<SymbolId, Error> {
        let ast = self.ast;
        let module = match &ast.expr(value).kind {
            AstExprKind::Name { id, .. } => match self.asr.resolve(self.scope, id) {
                Some(symbol) => match self.asr.symbol(symbol) {
                    Symbol::ExternalModule { module, .. } => module.clone(),
                    _ => return Err(unsupported("attribute access", span)),
                },
                None => {
                    return Err(Error::new(
                        ErrorImpl::VariableNotDeclared {
                            variable: id.clone(),
                        },
                        ast.expr(value).span,
                    ))
                }
            },
            _ => return Err(unsupported("attribute access", span)),
        };

        let key = format!("{}.{}", module, attr);
        if let Some(symbol) = self.asr.scope(self.global_scope).get(&key) {
            return Ok(symbol);
        }
        let ty = self.exported(&module, attr, span)?;
        let external = Symbol::ExternalSymbol(ExternalSymbol {
            name: key.clone(),
            module,
            original_name: attr.to_string(),
            ty,
        });
        self.bind_global(key, external, span)
    }

    fn already_declared(&self, name: &str, existing: SymbolId, span: Span) -> Error {
        let existing = match self.asr.symbol(existing).ty() {
            Some(ty) => ty.to_string(),
            None => "module".to_string(),
        };
        Error::new(
            ErrorImpl::VariableAlreadyDeclared {
                variable: name.to_string(),
                existing,
            },
            span,
        )
    }

    fn bind_global(&mut self, name: String, symbol: Symbol, span: Span) -> Result<SymbolId, Error> {
        if let Some(existing) = self.asr.scope(self.global_scope).get(&name) {
            return Err(self.already_declared(&name, existing, span));
        }
        let id = self.asr.alloc_symbol(symbol);
        self.asr.scope_mut(self.global_scope).insert(name, id);
        Ok(id)
    }

    fn declare_variable(
        &mut self,
        name: &str,
        ty: Ttype,
        intent: Intent,
        span: Span,
    ) -> Result<SymbolId, Error> {
        if let Some(existing) = self.asr.scope(self.scope).get(name) {
            return Err(self.already_declared(name, existing, span));
        }
        let id = self.asr.alloc_symbol(Symbol::Variable(Variable {
            name: name.to_string(),
            ty,
            intent,
            span,
        }));
        self.asr.scope_mut(self.scope).insert(name, id);
        Ok(id)
    }

    fn lower_module(&mut self, module: &Module) -> Result<Vec<StmtId>, Error> {
        let ast = self.ast;
        let mut body = Vec::new();
        let mut functions = Vec::new();

        for &id in module.body.iter() {
            match &ast.stmt(id).kind {
                AstStmtKind::FunctionDef {
                    name,
                    body: function_body,
                    ..
                } => functions.push((name.as_str(), &function_body[..])),
                AstStmtKind::Import(_) | AstStmtKind::ImportFrom { .. } => {}
                _ => lower_stmt(self, id, &mut body)?,
            }
        }

        // Function bodies see every global the top level declares.
        for (name, function_body) in functions {
            self.lower_function(name, function_body)?;
        }

        debug!(statements = body.len(), "lowered module");
        Ok(body)
    }

    fn lower_function(&mut self, name: &str, body: &[AstStmtId]) -> Result<(), Error> {
        let symbol = match self.asr.scope(self.global_scope).get(name) {
            Some(symbol) => symbol,
            None => unreachable!("function {name} is declared before lowering"),
        };
        let Symbol::Function(function) = self.asr.symbol(symbol) else {
            unreachable!("{name} is bound to a function");
        };

        self.scope = function.scope;
        self.function = Some(symbol);
        let lowered = lower_block(self, body);
        self.scope = self.global_scope;
        self.function = None;

        let lowered = lowered?;
        if let Symbol::Function(function) = self.asr.symbol_mut(symbol) {
            function.body = lowered;
        }
        Ok(())
    }

    fn constant(&mut self, scalar: Scalar, ty: Ttype, span: Span) -> ExprId {
        scalar.alloc(self.asr, ty, span)
    }

    fn ty(&self, id: ExprId) -> Ttype {
        self.asr.expr(id).ty.clone()
    }

    fn span(&self, id: ExprId) -> Span {
        self.asr.expr(id).span
    }

    /// Wraps `expr` in a cast to `to`, folding constant operands.
    fn cast(&mut self, expr: ExprId, to: &Ttype) -> Result<ExprId, Error> {
        let from = self.ty(expr);
        let span = self.span(expr);
        if &from == to {
            return Ok(expr);
        }
        let Some(kind) = CastKind::between(from.family(), to.family()) else {
            return Err(type_mismatch(to, from, span));
        };

        let value = match constant_of(self.asr, expr) {
            Some(scalar) => {
                let cast = scalar
                    .cast(to.family())
                    .ok_or_else(|| type_mismatch(to, &from, span))?;
                check_width(&cast, to).map_err(|e| Error::new(e, span))?;
                Some(self.constant(cast, to.clone(), span))
            }
            None => None,
        };
        Ok(self
            .asr
            .alloc_expr(ExprKind::Cast { arg: expr, kind }, to.clone(), value, span))
    }

    /// Checks that `value` may be stored as `target` and casts it there.
    fn convert(&mut self, value: ExprId, target: &Ttype) -> Result<ExprId, Error> {
        let ty = self.ty(value);
        if !assignable(target, &ty) {
            return Err(type_mismatch(target, ty, self.span(value)));
        }
        self.cast(value, target)
    }

    fn load_name(&mut self, name: &str, span: Span) -> Result<ExprId, Error> {
        match self.asr.resolve(self.scope, name) {
            Some(symbol) => self.load_symbol(symbol, span),
            None => Err(Error::new(
                ErrorImpl::VariableNotDeclared {
                    variable: name.to_string(),
                },
                span,
            )),
        }
    }

    fn load_symbol(&mut self, symbol: SymbolId, span: Span) -> Result<ExprId, Error> {
        let ty = match self.asr.symbol(symbol) {
            Symbol::Variable(variable) => variable.ty.clone(),
            Symbol::ExternalSymbol(external) if !matches!(external.ty, Ttype::Function(_)) => {
                external.ty.clone()
            }
            Symbol::Function(_) | Symbol::ExternalSymbol(_) => {
                return Err(unsupported("functions as values", span))
            }
            Symbol::Program(_) | Symbol::ExternalModule { .. } => {
                return Err(unsupported("modules as values", span))
            }
        };
        Ok(self.asr.alloc_expr(ExprKind::Var(symbol), ty, None, span))
    }

    /// Type of the variable an assignment writes through `symbol`.
    fn store_type(&self, symbol: SymbolId, span: Span) -> Result<Ttype, Error> {
        match self.asr.symbol(symbol) {
            Symbol::Variable(variable) => Ok(variable.ty.clone()),
            other => Err(unsupported(
                format!("assignment to '{}'", other.name()),
                span,
            )),
        }
    }

    /// Type an assignment target already has, used to type empty displays.
    fn store_hint(&self, target: AstExprId) -> Option<Ttype> {
        let AstExprKind::Name { id, .. } = &self.ast.expr(target).kind else {
            return None;
        };
        match self.asr.symbol(self.asr.scope(self.scope).get(id)?) {
            Symbol::Variable(variable) => Some(variable.ty.clone()),
            _ => None,
        }
    }

    /// Lowers an assignment target, declaring names on first assignment,
    /// and returns it with `value` cast to the target's type.
    fn store_target(&mut self, target: AstExprId, value: ExprId) -> Result<(ExprId, ExprId), Error> {
        let ast = self.ast;
        let expr = ast.expr(target);

        match &expr.kind {
            AstExprKind::Name { id: name, .. } => {
                let symbol = match self.asr.scope(self.scope).get(name) {
                    Some(symbol) => symbol,
                    None => self.declare_variable(name, self.ty(value), Intent::Local, expr.span)?,
                };
                let ty = self.store_type(symbol, expr.span)?;
                let value = self.convert(value, &ty)?;
                let var = self.asr.alloc_expr(ExprKind::Var(symbol), ty, None, expr.span);
                Ok((var, value))
            }
            AstExprKind::Tuple { .. } | AstExprKind::List { .. } => {
                let ty = self.ty(value);
                let target = self.store_element(target, &ty)?;
                Ok((target, value))
            }
            AstExprKind::Subscript {
                value: container,
                slice,
                ..
            } => {
                let (item, ty) = self.item_target(*container, *slice, expr.span)?;
                let value = self.convert(value, &ty)?;
                Ok((item, value))
            }
            AstExprKind::Attribute { .. } => Err(unsupported("assignment to attributes", expr.span)),
            _ => Err(Error::new(ErrorImpl::InvalidAssignmentTarget, expr.span)),
        }
    }

    /// Target receiving a value of type `ty` without a cast, as in tuple
    /// unpacking.
    fn store_element(&mut self, target: AstExprId, ty: &Ttype) -> Result<ExprId, Error> {
        let ast = self.ast;
        let expr = ast.expr(target);

        match &expr.kind {
            AstExprKind::Name { id: name, .. } => {
                let symbol = match self.asr.scope(self.scope).get(name) {
                    Some(symbol) => symbol,
                    None => self.declare_variable(name, ty.clone(), Intent::Local, expr.span)?,
                };
                let var_ty = self.store_type(symbol, expr.span)?;
                if &var_ty != ty {
                    return Err(type_mismatch(var_ty, ty, expr.span));
                }
                Ok(self.asr.alloc_expr(ExprKind::Var(symbol), var_ty, None, expr.span))
            }
            AstExprKind::Tuple { elements, .. } | AstExprKind::List { elements, .. } => {
                let element_types = match ty {
                    Ttype::Tuple(types) if types.len() == elements.len() => types.clone(),
                    _ => {
                        return Err(type_mismatch(
                            format!("tuple of {} elements", elements.len()),
                            ty,
                            expr.span,
                        ))
                    }
                };
                let mut targets = Vec::with_capacity(elements.len());
                for (element, element_ty) in elements.iter().zip(element_types.iter()) {
                    targets.push(self.store_element(*element, element_ty)?);
                }
                Ok(self.asr.alloc_expr(
                    ExprKind::TupleConstant(targets.into_boxed_slice()),
                    ty.clone(),
                    None,
                    expr.span,
                ))
            }
            _ => Err(unsupported("this unpacking target", expr.span)),
        }
    }

    /// `container[slice]` on the left of an assignment.
    fn item_target(
        &mut self,
        container: AstExprId,
        slice: AstExprId,
        span: Span,
    ) -> Result<(ExprId, Ttype), Error> {
        let container = lower_expr(self, container, None)?;
        let container_ty = self.ty(container);

        let (index, ty) = match &container_ty {
            Ttype::Array(element) => (self.integer_index(slice)?, (**element).clone()),
            Ttype::Dict(key, value) => {
                let index = lower_expr(self, slice, Some(key))?;
                (self.convert(index, key)?, (**value).clone())
            }
            Ttype::Character | Ttype::Tuple(_) => {
                return Err(unsupported(
                    format!("item assignment to '{}'", container_ty),
                    span,
                ))
            }
            _ => {
                return Err(Error::new(
                    ErrorImpl::NotSubscriptable {
                        received: container_ty.to_string(),
                    },
                    span,
                ))
            }
        };
        let item = self.asr.alloc_expr(
            ExprKind::Item {
                value: container,
                index,
            },
            ty.clone(),
            None,
            span,
        );
        Ok((item, ty))
    }

    fn integer_index(&mut self, index: AstExprId) -> Result<ExprId, Error> {
        let index = lower_expr(self, index, None)?;
        let ty = self.ty(index);
        if !ty.is_integral() {
            return Err(type_mismatch(INTEGER, ty, self.span(index)));
        }
        self.cast(index, &INTEGER)
    }

    fn lower_assign(
        &mut self,
        targets: &[AstExprId],
        value: AstExprId,
        span: Span,
        out: &mut Vec<StmtId>,
    ) -> Result<(), Error> {
        let Some((&first, rest)) = targets.split_first() else {
            unreachable!("assignment without a target");
        };

        let hint = self.store_hint(first);
        let value = lower_expr(self, value, hint.as_ref())?;
        let (target, value) = self.store_target(first, value)?;
        out.push(
            self.asr
                .alloc_stmt(StmtKind::Assignment { target, value }, span),
        );

        // `a = b = value` stores `a` into `b`.
        for &extra in rest {
            if !matches!(self.asr.expr(target).kind, ExprKind::Var(_)) {
                return Err(unsupported(
                    "chained assignment to this target",
                    self.span(target),
                ));
            }
            let (extra_target, extra_value) = self.store_target(extra, target)?;
            out.push(self.asr.alloc_stmt(
                StmtKind::Assignment {
                    target: extra_target,
                    value: extra_value,
                },
                span,
            ));
        }
        Ok(())
    }

    fn lower_annotated_assign(
        &mut self,
        target: AstExprId,
        annotation: AstExprId,
        value: Option<AstExprId>,
        span: Span,
    ) -> Result<Option<StmtId>, Error> {
        let ast = self.ast;
        let target_expr = ast.expr(target);
        let AstExprKind::Name { id: name, .. } = &target_expr.kind else {
            return Err(unsupported(
                "annotated assignment to this target",
                target_expr.span,
            ));
        };

        let ty = self.resolve_annotation(annotation)?;
        let predeclared = self.function.is_none() && self.predeclared.remove(name);
        let symbol = match self.asr.scope(self.scope).get(name) {
            Some(symbol) if predeclared => symbol,
            _ => self.declare_variable(name, ty.clone(), Intent::Local, target_expr.span)?,
        };

        let Some(value) = value else {
            return Ok(None);
        };
        let value = lower_expr(self, value, Some(&ty))?;
        let value = self.convert(value, &ty)?;
        let target = self
            .asr
            .alloc_expr(ExprKind::Var(symbol), ty, None, target_expr.span);
        Ok(Some(
            self.asr
                .alloc_stmt(StmtKind::Assignment { target, value }, span),
        ))
    }

    /// `target op= value` becomes `target = target op value`.
    fn lower_augmented_assign(
        &mut self,
        target: AstExprId,
        op: Operator,
        value: AstExprId,
        span: Span,
    ) -> Result<StmtId, Error> {
        let current = lower_expr(self, target, None)?;
        let operand = lower_expr(self, value, None)?;
        let result = self.binary(current, op, operand, span)?;
        let (target, value) = self.store_target(target, result)?;
        Ok(self
            .asr
            .alloc_stmt(StmtKind::Assignment { target, value }, span))
    }

    fn condition(&mut self, test: AstExprId) -> Result<ExprId, Error> {
        let test = lower_expr(self, test, None)?;
        let ty = self.ty(test);
        if ty != Ttype::Logical {
            return Err(Error::new(
                ErrorImpl::NonBooleanCondition {
                    received: ty.to_string(),
                },
                self.span(test),
            ));
        }
        Ok(test)
    }

    fn loop_body(&mut self, body: &[AstStmtId]) -> Result<Box<[StmtId]>, Error> {
        self.loop_depth += 1;
        let body = lower_block(self, body);
        self.loop_depth -= 1;
        body
    }

    fn in_loop(&self, keyword: &str, span: Span) -> Result<(), Error> {
        if self.loop_depth == 0 {
            return Err(Error::new(
                ErrorImpl::OutsideLoop {
                    keyword: keyword.to_string(),
                },
                span,
            ));
        }
        Ok(())
    }

    /// Whether `func` names the builtin `name` and no user symbol hides it.
    fn is_builtin(&self, func: AstExprId, name: &str) -> bool {
        match &self.ast.expr(func).kind {
            AstExprKind::Name { id, .. } => {
                id == name && self.asr.resolve(self.scope, name).is_none()
            }
            _ => false,
        }
    }

    fn loop_variable(&mut self, name: &str, ty: &Ttype, span: Span) -> Result<ExprId, Error> {
        let symbol = match self.asr.scope(self.scope).get(name) {
            Some(symbol) => symbol,
            None => self.declare_variable(name, ty.clone(), Intent::Local, span)?,
        };
        let var_ty = self.store_type(symbol, span)?;
        if !assignable(&var_ty, ty) {
            return Err(type_mismatch(&var_ty, ty, span));
        }
        Ok(self.asr.alloc_expr(ExprKind::Var(symbol), var_ty, None, span))
    }

    fn lower_for(
        &mut self,
        target: AstExprId,
        iter: AstExprId,
        body: &[AstStmtId],
        span: Span,
    ) -> Result<StmtId, Error> {
        let ast = self.ast;
        let target_expr = ast.expr(target);
        let AstExprKind::Name { id: name, .. } = &target_expr.kind else {
            return Err(unsupported("this loop target", target_expr.span));
        };

        let iter_expr = ast.expr(iter);
        if let AstExprKind::Call {
            func,
            args,
            keywords,
        } = &iter_expr.kind
        {
            if self.is_builtin(*func, "range") {
                if let Some(keyword) = keywords.first() {
                    return Err(unsupported("keyword arguments to range()", keyword.span));
                }
                let (start, end, step) = self.range_bounds(args, iter_expr.span)?;
                let var = self.loop_variable(name, &INTEGER, target_expr.span)?;
                let body = self.loop_body(body)?;
                return Ok(self.asr.alloc_stmt(
                    StmtKind::DoLoop {
                        var,
                        start,
                        end,
                        step,
                        body,
                    },
                    span,
                ));
            }
        }

        let container = lower_expr(self, iter, None)?;
        let element = match self.ty(container) {
            Ttype::Array(element) | Ttype::Set(element) => *element,
            Ttype::Dict(key, _) => *key,
            Ttype::Character => Ttype::Character,
            other => {
                return Err(Error::new(
                    ErrorImpl::NotIterable {
                        received: other.to_string(),
                    },
                    iter_expr.span,
                ))
            }
        };
        let var = self.loop_variable(name, &element, target_expr.span)?;
        let body = self.loop_body(body)?;
        Ok(self.asr.alloc_stmt(
            StmtKind::ForEach {
                var,
                container,
                body,
            },
            span,
        ))
    }

    fn range_bounds(
        &mut self,
        args: &[AstExprId],
        span: Span,
    ) -> Result<(ExprId, ExprId, ExprId), Error> {
        let mut bounds = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let bound = lower_expr(self, *arg, None)?;
            let ty = self.ty(bound);
            if !ty.is_integral() {
                return Err(Error::new(
                    ErrorImpl::ArgumentTypeMatchError {
                        function: "range".to_string(),
                        index,
                        expected: INTEGER.to_string(),
                        received: ty.to_string(),
                    },
                    self.span(bound),
                ));
            }
            bounds.push(self.cast(bound, &INTEGER)?);
        }

        let (start, end, step) = match bounds.as_slice() {
            [end] => (
                self.constant(Scalar::Integer(0), INTEGER, span),
                *end,
                self.constant(Scalar::Integer(1), INTEGER, span),
            ),
            [start, end] => (*start, *end, self.constant(Scalar::Integer(1), INTEGER, span)),
            [start, end, step] => (*start, *end, *step),
            _ => {
                return Err(Error::new(
                    ErrorImpl::ArgumentCountMismatch {
                        function: "range".to_string(),
                        expected: if args.is_empty() { 1 } else { 3 },
                        received: args.len(),
                    },
                    span,
                ))
            }
        };

        if constant_of(self.asr, step) == Some(Scalar::Integer(0)) {
            return Err(Error::new(
                ErrorImpl::intrinsic("range() arg 3 must not be zero"),
                self.span(step),
            ));
        }
        Ok((start, end, step))
    }

    fn lower_return(&mut self, value: Option<AstExprId>, span: Span) -> Result<StmtId, Error> {
        let Some(function) = self.function else {
            return Err(Error::new(ErrorImpl::ReturnOutsideFunction, span));
        };
        let symbol = self.asr.symbol(function);
        let name = symbol.name().to_string();
        let returns = symbol.signature().and_then(|sig| sig.returns.clone());

        let value = match (value, returns) {
            (None, None) => None,
            (Some(_), None) => {
                return Err(Error::new(
                    ErrorImpl::UnexpectedReturnValue { function: name },
                    span,
                ))
            }
            (None, Some(expected)) => {
                return Err(Error::new(
                    ErrorImpl::MissingReturnValue {
                        function: name,
                        expected: expected.to_string(),
                    },
                    span,
                ))
            }
            (Some(value), Some(expected)) => {
                let value = lower_expr(self, value, Some(&expected))?;
                Some(self.convert(value, &expected)?)
            }
        };
        Ok(self.asr.alloc_stmt(StmtKind::Return(value), span))
    }

    fn lower_expr_stmt(&mut self, value: AstExprId, span: Span) -> Result<StmtId, Error> {
        let ast = self.ast;
        let expr = ast.expr(value);

        if let AstExprKind::Call {
            func,
            args,
            keywords,
        } = &expr.kind
        {
            if self.is_builtin(*func, "print") {
                if let Some(keyword) = keywords.first() {
                    return Err(unsupported("keyword arguments to print()", keyword.span));
                }
                let args = args
                    .iter()
                    .map(|arg| lower_expr(self, *arg, None))
                    .collect::<Result<Vec<_>, _>>()?;
                return Ok(self
                    .asr
                    .alloc_stmt(StmtKind::Print(args.into_boxed_slice()), span));
            }

            let kind = match self.lower_call(*func, args, keywords, expr.span)? {
                Call::Value(call) => StmtKind::ExprStmt(call),
                Call::Subroutine { function, args } => StmtKind::SubroutineCall { function, args },
            };
            return Ok(self.asr.alloc_stmt(kind, span));
        }

        let value = lower_expr(self, value, None)?;
        Ok(self.asr.alloc_stmt(StmtKind::ExprStmt(value), span))
    }

    fn lower_call(
        &mut self,
        func: AstExprId,
        args: &[AstExprId],
        keywords: &[Keyword],
        span: Span,
    ) -> Result<Call, Error> {
        let ast = self.ast;
        let callee = ast.expr(func);

        let symbol = match &callee.kind {
            AstExprKind::Name { id: name, .. } => match self.asr.resolve(self.scope, name) {
                Some(symbol) => symbol,
                None => {
                    if let Some(intrinsic) = intrinsics::lookup(name) {
                        return self
                            .lower_intrinsic_call(intrinsic, args, keywords, span)
                            .map(Call::Value);
                    }
                    if name == "print" || name == "range" {
                        return Err(unsupported(format!("{}() in an expression", name), span));
                    }
                    return Err(Error::new(
                        ErrorImpl::VariableNotDeclared {
                            variable: name.clone(),
                        },
                        callee.span,
                    ));
                }
            },
            AstExprKind::Attribute { value, attr, .. } => {
                self.module_member(*value, attr, callee.span)?
            }
            _ => {
                return Err(Error::new(
                    ErrorImpl::NotCallable {
                        name: describe(ast, func),
                    },
                    callee.span,
                ))
            }
        };

        let function = self.asr.symbol(symbol).name().to_string();
        let Some(signature) = self.asr.symbol(symbol).signature().cloned() else {
            return Err(Error::new(ErrorImpl::NotCallable { name: function }, callee.span));
        };
        if let Some(keyword) = keywords.first() {
            return Err(unsupported("keyword arguments", keyword.span));
        }
        if args.len() != signature.params.len() {
            return Err(Error::new(
                ErrorImpl::ArgumentCountMismatch {
                    function,
                    expected: signature.params.len(),
                    received: args.len(),
                },
                span,
            ));
        }

        let mut lowered = Vec::with_capacity(args.len());
        for (index, (arg, param)) in args.iter().zip(signature.params.iter()).enumerate() {
            let value = lower_expr(self, *arg, Some(param))?;
            let ty = self.ty(value);
            if !assignable(param, &ty) {
                return Err(Error::new(
                    ErrorImpl::ArgumentTypeMatchError {
                        function,
                        index,
                        expected: param.to_string(),
                        received: ty.to_string(),
                    },
                    self.span(value),
                ));
            }
            lowered.push(self.cast(value, param)?);
        }

        let args = lowered.into_boxed_slice();
        match signature.returns {
            Some(returns) => Ok(Call::Value(self.asr.alloc_expr(
                ExprKind::FunctionCall {
                    function: symbol,
                    args,
                },
                returns,
                None,
                span,
            ))),
            None => Ok(Call::Subroutine {
                function: symbol,
                args,
            }),
        }
    }

    fn lower_intrinsic_call(
        &mut self,
        intrinsic: &'static Intrinsic,
        args: &[AstExprId],
        keywords: &[Keyword],
        span: Span,
    ) -> Result<ExprId, Error> {
        if let Some(keyword) = keywords.first() {
            return Err(Error::new(
                ErrorImpl::intrinsic(format!("{}() takes no keyword arguments", intrinsic.name)),
                keyword.span,
            ));
        }

        let args = args
            .iter()
            .map(|arg| lower_expr(self, *arg, None))
            .collect::<Result<Vec<_>, _>>()?;
        let mut ty = intrinsic.call_type(self.asr, &args, span)?;
        let value = intrinsic.comptime_eval(self.asr, span, &args)?;
        if let Some(value) = value {
            ty = self.ty(value);
        }
        Ok(self.asr.alloc_expr(
            ExprKind::IntrinsicCall {
                name: intrinsic.name,
                args: args.into_boxed_slice(),
            },
            ty,
            value,
            span,
        ))
    }

    /// Types a binary operator over two lowered operands, inserting casts
    /// to the promoted type and folding constant operands.
    fn binary(&mut self, left: ExprId, op: Operator, right: ExprId, span: Span) -> Result<ExprId, Error> {
        let lt = self.ty(left);
        let rt = self.ty(right);
        let unsupported_for = |operand: &Ttype| {
            Error::new(
                ErrorImpl::UnsupportedOperator {
                    operator: op.symbol().to_string(),
                    operand: operand.to_string(),
                },
                span,
            )
        };
        let mismatch = || {
            Error::new(
                ErrorImpl::BinaryTypeMismatch {
                    left: lt.to_string(),
                    right: rt.to_string(),
                },
                span,
            )
        };

        match (lt.family(), rt.family()) {
            (Family::Character, Family::Character) => {
                if op != Operator::Add {
                    return Err(unsupported_for(&lt));
                }
                let value = match (constant_of(self.asr, left), constant_of(self.asr, right)) {
                    (Some(Scalar::Str(a)), Some(Scalar::Str(b))) => {
                        Some(self.constant(Scalar::Str(a + &b), Ttype::Character, span))
                    }
                    _ => None,
                };
                return Ok(self.asr.alloc_expr(
                    ExprKind::StringConcat { left, right },
                    Ttype::Character,
                    value,
                    span,
                ));
            }
            (Family::Character, other) | (other, Family::Character) if other.is_numeric() => {
                return Err(mismatch())
            }
            (family, _) if !family.is_numeric() => return Err(unsupported_for(&lt)),
            (_, family) if !family.is_numeric() => return Err(unsupported_for(&rt)),
            _ => {}
        }

        if op == Operator::Pow {
            let left = self.cast(left, &lt.arithmetic())?;
            let right = self.cast(right, &rt.arithmetic())?;
            return self.intrinsic_binop("pow", left, op, right, span);
        }

        let joined = promote(&lt.arithmetic(), &rt.arithmetic()).ok_or_else(mismatch)?;
        let operand_ty = match op {
            Operator::MatMult => return Err(unsupported_for(&lt)),
            Operator::BitAnd | Operator::BitOr | Operator::BitXor => {
                if !lt.is_integral() {
                    return Err(unsupported_for(&lt));
                }
                if !rt.is_integral() {
                    return Err(unsupported_for(&rt));
                }
                if lt == Ttype::Logical && rt == Ttype::Logical {
                    Ttype::Logical
                } else {
                    joined
                }
            }
            Operator::LShift | Operator::RShift => {
                if !lt.is_integral() {
                    return Err(unsupported_for(&lt));
                }
                if !rt.is_integral() {
                    return Err(unsupported_for(&rt));
                }
                joined
            }
            // True division never yields an integer.
            Operator::Div => match joined.family() {
                Family::Real | Family::Complex => joined,
                _ => REAL,
            },
            Operator::FloorDiv if joined.is_complex() => return Err(unsupported_for(&joined)),
            Operator::Mod => {
                let left = self.cast(left, &joined)?;
                let right = self.cast(right, &joined)?;
                return self.intrinsic_binop("_mod", left, op, right, span);
            }
            _ => joined,
        };

        let left = self.cast(left, &operand_ty)?;
        let right = self.cast(right, &operand_ty)?;
        let value = match (constant_of(self.asr, left), constant_of(self.asr, right)) {
            (Some(a), Some(b)) => {
                let folded = fold_binop(op, a, b).map_err(|e| Error::new(e, span))?;
                check_width(&folded, &operand_ty).map_err(|e| Error::new(e, span))?;
                debug!(operator = op.symbol(), "folded binary operation");
                Some(self.constant(folded, operand_ty.clone(), span))
            }
            _ => None,
        };
        Ok(self.asr.alloc_expr(
            ExprKind::BinOp { left, op, right },
            operand_ty,
            value,
            span,
        ))
    }

    /// `**` and `%` share their typing and folding with the `pow` and
    /// `_mod` intrinsics. A folded result may change the node's type, as
    /// `2 ** -1` does.
    fn intrinsic_binop(
        &mut self,
        name: &str,
        left: ExprId,
        op: Operator,
        right: ExprId,
        span: Span,
    ) -> Result<ExprId, Error> {
        let Some(intrinsic) = intrinsics::lookup(name) else {
            unreachable!("intrinsic {name} is always registered");
        };
        let mut ty = intrinsic.call_type(self.asr, &[left, right], span)?;
        let value = intrinsic.comptime_eval(self.asr, span, &[left, right])?;
        if let Some(value) = value {
            ty = self.ty(value);
        }
        Ok(self
            .asr
            .alloc_expr(ExprKind::BinOp { left, op, right }, ty, value, span))
    }

    fn unary(&mut self, op: UnaryOperator, operand: ExprId, span: Span) -> Result<ExprId, Error> {
        let ty = self.ty(operand);
        let accepted = match op {
            UnaryOperator::Not => ty == Ttype::Logical,
            UnaryOperator::UAdd | UnaryOperator::USub => ty.is_numeric(),
            UnaryOperator::Invert => ty.is_integral(),
        };
        if !accepted {
            return Err(Error::new(
                ErrorImpl::UnsupportedOperator {
                    operator: unary_symbol(op).to_string(),
                    operand: ty.to_string(),
                },
                span,
            ));
        }

        let ty = match op {
            UnaryOperator::Not => ty,
            _ => ty.arithmetic(),
        };
        let operand = self.cast(operand, &ty)?;
        let value = match constant_of(self.asr, operand) {
            Some(scalar) => {
                let folded = fold_unary(op, scalar).map_err(|e| Error::new(e, span))?;
                check_width(&folded, &ty).map_err(|e| Error::new(e, span))?;
                Some(self.constant(folded, ty.clone(), span))
            }
            None => None,
        };
        Ok(self
            .asr
            .alloc_expr(ExprKind::UnaryOp { op, operand }, ty, value, span))
    }

    fn logical(&mut self, op: BoolOperator, left: ExprId, right: ExprId) -> ExprId {
        let span = self.span(left).merge(self.span(right));
        let value = match (constant_of(self.asr, left), constant_of(self.asr, right)) {
            (Some(Scalar::Logical(a)), Some(Scalar::Logical(b))) => {
                let result = match op {
                    BoolOperator::And => a && b,
                    BoolOperator::Or => a || b,
                };
                Some(self.constant(Scalar::Logical(result), Ttype::Logical, span))
            }
            _ => None,
        };
        self.asr.alloc_expr(
            ExprKind::LogicalBinOp { left, op, right },
            Ttype::Logical,
            value,
            span,
        )
    }

    fn lower_bool_op(&mut self, op: BoolOperator, values: &[AstExprId]) -> Result<ExprId, Error> {
        let operator = match op {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        };

        let mut result = None;
        for &value in values {
            let operand = lower_expr(self, value, None)?;
            let ty = self.ty(operand);
            if ty != Ttype::Logical {
                return Err(Error::new(
                    ErrorImpl::UnsupportedOperator {
                        operator: operator.to_string(),
                        operand: ty.to_string(),
                    },
                    self.span(operand),
                ));
            }
            result = Some(match result {
                None => operand,
                Some(left) => self.logical(op, left, operand),
            });
        }
        match result {
            Some(result) => Ok(result),
            None => unreachable!("boolean operation without operands"),
        }
    }

    /// `a < b < c` becomes `a < b and b < c`, sharing the `b` node.
    fn lower_compare(
        &mut self,
        left: AstExprId,
        ops: &[CompareOperator],
        comparators: &[AstExprId],
    ) -> Result<ExprId, Error> {
        let mut left = lower_expr(self, left, None)?;
        let mut result = None;
        for (op, &comparator) in ops.iter().zip(comparators.iter()) {
            let right = lower_expr(self, comparator, None)?;
            let compare = self.compare(left, *op, right)?;
            result = Some(match result {
                None => compare,
                Some(previous) => self.logical(BoolOperator::And, previous, compare),
            });
            left = right;
        }
        match result {
            Some(result) => Ok(result),
            None => unreachable!("comparison without operators"),
        }
    }

    fn compare(&mut self, left: ExprId, op: CompareOperator, right: ExprId) -> Result<ExprId, Error> {
        let span = self.span(left).merge(self.span(right));
        let lt = self.ty(left);
        let rt = self.ty(right);
        let unsupported_for = |operand: &Ttype| {
            Error::new(
                ErrorImpl::UnsupportedOperator {
                    operator: op.symbol().to_string(),
                    operand: operand.to_string(),
                },
                span,
            )
        };

        match op {
            CompareOperator::In => return self.membership(left, right, false, span),
            CompareOperator::NotIn => return self.membership(left, right, true, span),
            CompareOperator::Is | CompareOperator::IsNot => return Err(unsupported_for(&lt)),
            _ => {}
        }

        let operand_ty = match (lt.family(), rt.family()) {
            (Family::Character, Family::Character) => Ttype::Character,
            (l, r) if l.is_numeric() && r.is_numeric() => {
                promote(&lt, &rt).ok_or_else(|| unsupported_for(&lt))?
            }
            (Family::Character, _) | (_, Family::Character) => {
                return Err(Error::new(
                    ErrorImpl::BinaryTypeMismatch {
                        left: lt.to_string(),
                        right: rt.to_string(),
                    },
                    span,
                ))
            }
            _ => return Err(unsupported_for(&lt)),
        };
        if operand_ty.is_complex() && !matches!(op, CompareOperator::Eq | CompareOperator::NotEq) {
            return Err(unsupported_for(&operand_ty));
        }

        let left = self.cast(left, &operand_ty)?;
        let right = self.cast(right, &operand_ty)?;
        let value = match (constant_of(self.asr, left), constant_of(self.asr, right)) {
            (Some(a), Some(b)) => fold_compare(op, &a, &b)
                .map(|result| self.constant(Scalar::Logical(result), Ttype::Logical, span)),
            _ => None,
        };
        Ok(self.asr.alloc_expr(
            ExprKind::Compare { left, op, right },
            Ttype::Logical,
            value,
            span,
        ))
    }

    fn membership(
        &mut self,
        element: ExprId,
        container: ExprId,
        negated: bool,
        span: Span,
    ) -> Result<ExprId, Error> {
        let container_ty = self.ty(container);
        let expected = match &container_ty {
            Ttype::Array(element) | Ttype::Set(element) => (**element).clone(),
            Ttype::Dict(key, _) => (**key).clone(),
            Ttype::Character => Ttype::Character,
            _ => {
                return Err(Error::new(
                    ErrorImpl::UnsupportedOperator {
                        operator: if negated { "not in" } else { "in" }.to_string(),
                        operand: container_ty.to_string(),
                    },
                    span,
                ))
            }
        };
        let element = self.convert(element, &expected)?;

        let value = self
            .fold_membership(element, container)
            .map(|found| self.constant(Scalar::Logical(found != negated), Ttype::Logical, span));
        Ok(self.asr.alloc_expr(
            ExprKind::Membership {
                element,
                container,
                negated,
            },
            Ttype::Logical,
            value,
            span,
        ))
    }

    fn fold_membership(&self, element: ExprId, container: ExprId) -> Option<bool> {
        let needle = constant_of(self.asr, element)?;
        let haystack = self.asr.value_of(container)?;
        match &self.asr.expr(haystack).kind {
            ExprKind::StringConstant(s) => match &needle {
                Scalar::Str(n) => Some(s.contains(n.as_str())),
                _ => None,
            },
            ExprKind::ListConstant(items)
            | ExprKind::SetConstant(items)
            | ExprKind::DictConstant { keys: items, .. } => {
                for item in items.iter() {
                    let item = Scalar::read(self.asr, *item)?;
                    if fold_compare(CompareOperator::Eq, &item, &needle) == Some(true) {
                        return Some(true);
                    }
                }
                Some(false)
            }
            _ => None,
        }
    }

    fn lower_subscript(&mut self, value: AstExprId, slice: AstExprId, span: Span) -> Result<ExprId, Error> {
        let ast = self.ast;
        let container = lower_expr(self, value, None)?;
        let container_ty = self.ty(container);

        if let AstExprKind::Slice { lower, upper, step } = &ast.expr(slice).kind {
            if !matches!(container_ty, Ttype::Array(_) | Ttype::Character) {
                return Err(unsupported(format!("slicing '{}'", container_ty), span));
            }
            let lower = lower.map(|id| self.integer_index(id)).transpose()?;
            let upper = upper.map(|id| self.integer_index(id)).transpose()?;
            let step = step.map(|id| self.integer_index(id)).transpose()?;
            return Ok(self.asr.alloc_expr(
                ExprKind::Section {
                    value: container,
                    lower,
                    upper,
                    step,
                },
                container_ty,
                None,
                span,
            ));
        }

        let (index, ty) = match &container_ty {
            Ttype::Array(element) => (self.integer_index(slice)?, (**element).clone()),
            Ttype::Character => (self.integer_index(slice)?, Ttype::Character),
            Ttype::Tuple(elements) => {
                let index = self.integer_index(slice)?;
                let Some(Scalar::Integer(n)) = constant_of(self.asr, index) else {
                    return Err(unsupported("non-constant tuple index", self.span(index)));
                };
                let position = normalize_index(n, elements.len()).ok_or_else(|| {
                    Error::new(
                        ErrorImpl::IndexOutOfRange {
                            index: n,
                            received: container_ty.to_string(),
                        },
                        span,
                    )
                })?;
                (index, elements[position].clone())
            }
            Ttype::Dict(key, value) => {
                let index = lower_expr(self, slice, Some(key))?;
                (self.convert(index, key)?, (**value).clone())
            }
            _ => {
                return Err(Error::new(
                    ErrorImpl::NotSubscriptable {
                        received: container_ty.to_string(),
                    },
                    span,
                ))
            }
        };

        let value = self.fold_item(container, index, span)?;
        Ok(self.asr.alloc_expr(
            ExprKind::Item {
                value: container,
                index,
            },
            ty,
            value,
            span,
        ))
    }

    fn fold_item(&mut self, container: ExprId, index: ExprId, span: Span) -> Result<Option<ExprId>, Error> {
        let (Some(key), Some(haystack)) = (constant_of(self.asr, index), self.asr.value_of(container))
        else {
            return Ok(None);
        };
        let out_of_range = |n: i64, received: &Ttype| {
            Error::new(
                ErrorImpl::IndexOutOfRange {
                    index: n,
                    received: received.to_string(),
                },
                span,
            )
        };
        let container_ty = self.ty(container);

        match (&self.asr.expr(haystack).kind, &key) {
            (ExprKind::StringConstant(s), Scalar::Integer(n)) => {
                let chars: Vec<char> = s.chars().collect();
                let position =
                    normalize_index(*n, chars.len()).ok_or_else(|| out_of_range(*n, &container_ty))?;
                let ch = chars[position].to_string();
                Ok(Some(self.constant(Scalar::Str(ch), Ttype::Character, span)))
            }
            (ExprKind::ListConstant(items) | ExprKind::TupleConstant(items), Scalar::Integer(n)) => {
                let position =
                    normalize_index(*n, items.len()).ok_or_else(|| out_of_range(*n, &container_ty))?;
                Ok(self.asr.value_of(items[position]))
            }
            (ExprKind::DictConstant { keys, values }, key) => {
                for (k, v) in keys.iter().zip(values.iter()) {
                    let matches = Scalar::read(self.asr, *k)
                        .is_some_and(|k| fold_compare(CompareOperator::Eq, &k, key) == Some(true));
                    if matches {
                        return Ok(self.asr.value_of(*v));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Allocates a display. When its elements are not all literals but all
    /// have values, the value is a second display built from those values.
    fn collection(
        &mut self,
        make: fn(Box<[ExprId]>) -> ExprKind,
        elements: Vec<ExprId>,
        ty: Ttype,
        span: Span,
    ) -> ExprId {
        let all_literal = elements.iter().all(|e| self.asr.is_literal(*e));
        let value = if all_literal {
            None
        } else {
            elements
                .iter()
                .map(|e| self.asr.value_of(*e))
                .collect::<Option<Vec<_>>>()
                .map(|values| {
                    self.asr
                        .alloc_expr(make(values.into_boxed_slice()), ty.clone(), None, span)
                })
        };
        self.asr
            .alloc_expr(make(elements.into_boxed_slice()), ty, value, span)
    }

    /// Common element type of `values`, preferring `hint` when every value
    /// fits it.
    fn join(&self, values: &[ExprId], hint: Option<&Ttype>) -> Result<Ttype, Error> {
        let mut joined = self.ty(values[0]);
        for &value in &values[1..] {
            let ty = self.ty(value);
            joined = promote(&joined, &ty)
                .ok_or_else(|| type_mismatch(&joined, &ty, self.span(value)))?;
        }
        match hint {
            Some(hint) if assignable(hint, &joined) => Ok(hint.clone()),
            _ => Ok(joined),
        }
    }

    fn lower_elements(
        &mut self,
        elements: &[AstExprId],
        hint: Option<&Ttype>,
    ) -> Result<(Vec<ExprId>, Ttype), Error> {
        let mut values = elements
            .iter()
            .map(|element| lower_expr(self, *element, hint))
            .collect::<Result<Vec<_>, _>>()?;
        let ty = self.join(&values, hint)?;
        for value in values.iter_mut() {
            *value = self.cast(*value, &ty)?;
        }
        Ok((values, ty))
    }

    fn lower_sequence(
        &mut self,
        kind: Sequence,
        elements: &[AstExprId],
        hint: Option<&Ttype>,
        span: Span,
    ) -> Result<ExprId, Error> {
        let (name, hinted, make, wrap): (_, _, fn(Box<[ExprId]>) -> ExprKind, fn(Box<Ttype>) -> Ttype) =
            match (kind, hint) {
                (Sequence::List, Some(Ttype::Array(element))) => (
                    "list",
                    Some((**element).clone()),
                    ExprKind::ListConstant,
                    Ttype::Array,
                ),
                (Sequence::List, _) => ("list", None, ExprKind::ListConstant, Ttype::Array),
                (Sequence::Set, Some(Ttype::Set(element))) => (
                    "set",
                    Some((**element).clone()),
                    ExprKind::SetConstant,
                    Ttype::Set,
                ),
                (Sequence::Set, _) => ("set", None, ExprKind::SetConstant, Ttype::Set),
            };

        if elements.is_empty() {
            let Some(element) = hinted else {
                return Err(Error::new(
                    ErrorImpl::EmptyCollection {
                        collection: name.to_string(),
                    },
                    span,
                ));
            };
            return Ok(self.collection(make, Vec::new(), wrap(Box::new(element)), span));
        }

        let (values, element) = self.lower_elements(elements, hinted.as_ref())?;
        Ok(self.collection(make, values, wrap(Box::new(element)), span))
    }

    fn lower_tuple(
        &mut self,
        elements: &[AstExprId],
        hint: Option<&Ttype>,
        span: Span,
    ) -> Result<ExprId, Error> {
        let hints = match hint {
            Some(Ttype::Tuple(types)) if types.len() == elements.len() => Some(types),
            _ => None,
        };

        let mut values = Vec::with_capacity(elements.len());
        let mut types = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let element_hint = hints.map(|types| &types[i]);
            let mut value = lower_expr(self, *element, element_hint)?;
            if let Some(element_hint) = element_hint {
                if assignable(element_hint, &self.ty(value)) {
                    value = self.cast(value, element_hint)?;
                }
            }
            types.push(self.ty(value));
            values.push(value);
        }

        let ty = Ttype::Tuple(types.into_boxed_slice());
        Ok(self.collection(ExprKind::TupleConstant, values, ty, span))
    }

    fn lower_dict(
        &mut self,
        keys: &[AstExprId],
        values: &[AstExprId],
        hint: Option<&Ttype>,
        span: Span,
    ) -> Result<ExprId, Error> {
        let (key_hint, value_hint) = match hint {
            Some(Ttype::Dict(key, value)) => (Some((**key).clone()), Some((**value).clone())),
            _ => (None, None),
        };

        let (keys, values, ty) = if keys.is_empty() {
            let (Some(key), Some(value)) = (key_hint, value_hint) else {
                return Err(Error::new(
                    ErrorImpl::EmptyCollection {
                        collection: "dict".to_string(),
                    },
                    span,
                ));
            };
            (Vec::new(), Vec::new(), Ttype::Dict(Box::new(key), Box::new(value)))
        } else {
            let (keys, key) = self.lower_elements(keys, key_hint.as_ref())?;
            let (values, value) = self.lower_elements(values, value_hint.as_ref())?;
            (keys, values, Ttype::Dict(Box::new(key), Box::new(value)))
        };

        let all_literal = keys
            .iter()
            .chain(values.iter())
            .all(|e| self.asr.is_literal(*e));
        let value = if all_literal {
            None
        } else {
            let folded_keys = keys.iter().map(|e| self.asr.value_of(*e)).collect::<Option<Vec<_>>>();
            let folded_values = values.iter().map(|e| self.asr.value_of(*e)).collect::<Option<Vec<_>>>();
            match (folded_keys, folded_values) {
                (Some(k), Some(v)) => Some(self.asr.alloc_expr(
                    ExprKind::DictConstant {
                        keys: k.into_boxed_slice(),
                        values: v.into_boxed_slice(),
                    },
                    ty.clone(),
                    None,
                    span,
                )),
                _ => None,
            }
        };

        Ok(self.asr.alloc_expr(
            ExprKind::DictConstant {
                keys: keys.into_boxed_slice(),
                values: values.into_boxed_slice(),
            },
            ty,
            value,
            span,
        ))
    }
}

fn reject_loop_else(orelse: &[AstStmtId], span: Span) -> Result<(), Error> {
    if orelse.is_empty() {
        Ok(())
    } else {
        Err(unsupported("else clause on loops", span))
    }
}

pub fn lower_block(analyzer: &mut SemanticAnalyzer, body: &[AstStmtId]) -> Result<Box<[StmtId]>, Error> {
    let mut lowered = Vec::with_capacity(body.len());
    for &id in body {
        lower_stmt(analyzer, id, &mut lowered)?;
    }
    Ok(lowered.into_boxed_slice())
}

/// Lowers one statement into `out`. Declarations such as `pass` or a bare
/// annotation produce nothing; chained assignments produce several.
pub fn lower_stmt(
    analyzer: &mut SemanticAnalyzer,
    id: AstStmtId,
    out: &mut Vec<StmtId>,
) -> Result<(), Error> {
    let ast = analyzer.ast;
    let stmt = ast.stmt(id);
    let span = stmt.span;

    match &stmt.kind {
        AstStmtKind::Assign { targets, value } => {
            analyzer.lower_assign(targets, *value, span, out)?;
        }
        AstStmtKind::AnnotatedAssign {
            target,
            annotation,
            value,
        } => {
            if let Some(stmt) = analyzer.lower_annotated_assign(*target, *annotation, *value, span)? {
                out.push(stmt);
            }
        }
        AstStmtKind::AugmentedAssign { target, op, value } => {
            out.push(analyzer.lower_augmented_assign(*target, *op, *value, span)?);
        }
        AstStmtKind::If { test, body, orelse } => {
            let test = analyzer.condition(*test)?;
            let body = lower_block(analyzer, body)?;
            let orelse = lower_block(analyzer, orelse)?;
            out.push(
                analyzer
                    .asr
                    .alloc_stmt(StmtKind::If { test, body, orelse }, span),
            );
        }
        AstStmtKind::While { test, body, orelse } => {
            reject_loop_else(orelse, span)?;
            let test = analyzer.condition(*test)?;
            let body = analyzer.loop_body(body)?;
            out.push(
                analyzer
                    .asr
                    .alloc_stmt(StmtKind::WhileLoop { test, body }, span),
            );
        }
        AstStmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            reject_loop_else(orelse, span)?;
            out.push(analyzer.lower_for(*target, *iter, body, span)?);
        }
        AstStmtKind::FunctionDef { .. } => {
            return Err(unsupported("nested function definitions", span));
        }
        AstStmtKind::Return(value) => out.push(analyzer.lower_return(*value, span)?),
        AstStmtKind::Import(_) | AstStmtKind::ImportFrom { .. } => {
            return Err(unsupported("imports outside the top level", span));
        }
        AstStmtKind::Raise(_) => out.push(analyzer.asr.alloc_stmt(StmtKind::ErrorStop, span)),
        AstStmtKind::Pass => {}
        AstStmtKind::Break => {
            analyzer.in_loop("break", span)?;
            out.push(analyzer.asr.alloc_stmt(StmtKind::Break, span));
        }
        AstStmtKind::Continue => {
            analyzer.in_loop("continue", span)?;
            out.push(analyzer.asr.alloc_stmt(StmtKind::Continue, span));
        }
        AstStmtKind::Expr(value) => out.push(analyzer.lower_expr_stmt(*value, span)?),
    }
    Ok(())
}

/// Lowers one expression. `hint` is the type the context expects; it only
/// decides the element type of empty displays and the preferred element
/// type of non-empty ones.
pub fn lower_expr(
    analyzer: &mut SemanticAnalyzer,
    id: AstExprId,
    hint: Option<&Ttype>,
) -> Result<ExprId, Error> {
    let ast = analyzer.ast;
    let expr = ast.expr(id);
    let span = expr.span;

    match &expr.kind {
        AstExprKind::IntegerLiteral(n) => Ok(analyzer.constant(Scalar::Integer(*n), INTEGER, span)),
        AstExprKind::FloatLiteral(r) => Ok(analyzer.constant(Scalar::Real(*r), REAL, span)),
        AstExprKind::ComplexLiteral(im) => Ok(analyzer.constant(
            Scalar::Complex(Complex64::new(0.0, *im)),
            COMPLEX,
            span,
        )),
        AstExprKind::StringLiteral(s) => {
            Ok(analyzer.constant(Scalar::Str(s.clone()), Ttype::Character, span))
        }
        AstExprKind::BoolLiteral(b) => Ok(analyzer.constant(Scalar::Logical(*b), Ttype::Logical, span)),
        AstExprKind::NoneLiteral => Err(unsupported("None", span)),
        AstExprKind::Name { id: name, .. } => analyzer.load_name(name, span),
        AstExprKind::BinaryOp { left, op, right } => {
            let left = lower_expr(analyzer, *left, None)?;
            let right = lower_expr(analyzer, *right, None)?;
            analyzer.binary(left, *op, right, span)
        }
        AstExprKind::UnaryOp { op, operand } => {
            let operand = lower_expr(analyzer, *operand, None)?;
            analyzer.unary(*op, operand, span)
        }
        AstExprKind::BoolOp { op, values } => analyzer.lower_bool_op(*op, values),
        AstExprKind::Compare {
            left,
            ops,
            comparators,
        } => analyzer.lower_compare(*left, ops, comparators),
        AstExprKind::Call {
            func,
            args,
            keywords,
        } => match analyzer.lower_call(*func, args, keywords, span)? {
            Call::Value(call) => Ok(call),
            Call::Subroutine { function, .. } => Err(Error::new(
                ErrorImpl::NoReturnValue {
                    function: analyzer.asr.symbol(function).name().to_string(),
                },
                span,
            )),
        },
        AstExprKind::Attribute { value, attr, .. } => {
            let symbol = analyzer.module_member(*value, attr, span)?;
            analyzer.load_symbol(symbol, span)
        }
        AstExprKind::Subscript { value, slice, .. } => analyzer.lower_subscript(*value, *slice, span),
        AstExprKind::Slice { .. } => Err(unsupported("slices outside a subscript", span)),
        AstExprKind::Tuple { elements, .. } => analyzer.lower_tuple(elements, hint, span),
        AstExprKind::List { elements, .. } => {
            analyzer.lower_sequence(Sequence::List, elements, hint, span)
        }
        AstExprKind::Set { elements } => analyzer.lower_sequence(Sequence::Set, elements, hint, span),
        AstExprKind::Dict { keys, values } => analyzer.lower_dict(keys, values, hint, span),
    }
}

/// Analyses a parsed module into a [`TranslationUnit`], allocating the ASR
/// in `arena`.
///
/// With `main_module` the top-level statements form the `main_program`
/// symbol; otherwise they are returned as the unit's body. With
/// `symtab_only` only declarations are collected.
#[tracing::instrument(level = "debug", skip(arena, module))]
pub fn ast_to_asr(
    arena: &mut Arena,
    module: &Module,
    main_module: bool,
    symtab_only: bool,
) -> Result<TranslationUnit, Diagnostics> {
    SemanticAnalyzer::new(arena).analyze(module, main_module, symtab_only)
}
