//! Parser implementation for building the Abstract Syntax Tree.
//!
//! This module contains the Parser struct and the `parse` entry points.
//! The parser pulls tokens from the incremental lexer one at a time and uses
//! a Pratt approach with NUD/LED handlers for expressions; statements are
//! dispatched on their leading keyword.
//!
//! It maintains lookup tables for:
//! - Compound statement handlers (`if`, `while`, `for`, `def`)
//! - Simple statement handlers (`pass`, `return`, `import`, ...)
//! - NUD (null denotation) handlers for prefix expressions
//! - LED (left denotation) handlers for infix expressions
//! - Binding powers for operator precedence

use std::{collections::HashMap, path::Path};

use tracing::debug;

use crate::{
    arena::Arena,
    ast::ast::{AstArena, Module, StmtId},
    errors::{
        diagnostics::Diagnostic,
        errors::{Error, ErrorImpl},
    },
    lexer::{
        lexer::Lexer,
        tokens::{Token, TokenKind, TokenValue},
    },
    source::{ensure_trailing_newline, SourceReader},
    Span,
};

use super::{
    lookups::{
        create_token_lookups, BPLookup, BindingPower, LEDHandler, LEDLookup, NUDHandler,
        NUDLookup, StmtHandler, StmtLookup,
    },
    stmt::parse_stmt,
};

/// The main parser structure that maintains parsing state.
///
/// Holds the lexer, one token of lookahead, and the arena every node is
/// allocated into.
pub struct Parser<'src, 'a> {
    lexer: Lexer<'src>,
    /// The token about to be consumed
    current: Token,
    /// Last byte of the most recently consumed token
    previous_last: u32,
    arena: &'a mut AstArena,
    /// Lookup table for compound statement handlers
    stmt_lookup: StmtLookup,
    /// Lookup table for simple statement handlers
    simple_stmt_lookup: StmtLookup,
    /// Lookup table for null denotation (prefix) expression handlers
    nud_lookup: NUDLookup,
    /// Lookup table for left denotation (infix) expression handlers
    led_lookup: LEDLookup,
    /// Lookup table for expression binding powers (precedence)
    binding_power_lookup: BPLookup,
    /// First token registered twice, if any
    ambiguity: Option<TokenKind>,
}

impl<'src, 'a> Parser<'src, 'a> {
    /// Creates a parser positioned on the first token of `source`.
    ///
    /// # Errors
    ///
    /// Fails if the grammar tables are ambiguous or the first token cannot be
    /// lexed.
    pub fn new(source: &'src str, arena: &'a mut AstArena) -> Result<Self, Error> {
        let mut parser = Parser {
            lexer: Lexer::new(source),
            current: Token {
                kind: TokenKind::EndOfFile,
                value: TokenValue::None,
                span: Span::default(),
            },
            previous_last: 0,
            arena,
            stmt_lookup: HashMap::new(),
            simple_stmt_lookup: HashMap::new(),
            nud_lookup: HashMap::new(),
            led_lookup: HashMap::new(),
            binding_power_lookup: HashMap::new(),
            ambiguity: None,
        };

        create_token_lookups(&mut parser);
        parser.check_grammar()?;

        parser.current = parser.lexer.lex()?;
        Ok(parser)
    }

    /// Fails if any token was registered with two handlers of the same
    /// family, which would make the grammar ambiguous.
    pub fn check_grammar(&self) -> Result<(), Error> {
        match self.ambiguity {
            Some(kind) => Err(Error::without_span(ErrorImpl::AmbiguousSyntax {
                token: kind.to_string(),
            })),
            None => Ok(()),
        }
    }

    pub fn arena(&mut self) -> &mut AstArena {
        &mut *self.arena
    }

    pub fn arena_ref(&self) -> &AstArena {
        &*self.arena
    }

    /// Returns the current token without advancing.
    pub fn current_token(&self) -> &Token {
        &self.current
    }

    /// Returns the kind of the current token.
    pub fn current_token_kind(&self) -> TokenKind {
        self.current.kind
    }

    /// Advances to the next token and returns the one just consumed.
    pub fn advance(&mut self) -> Result<Token, Error> {
        let next = self.lexer.lex()?;
        let token = std::mem::replace(&mut self.current, next);
        // Layout tokens never extend a node's span.
        if !token.kind.is_structural() {
            self.previous_last = token.span.last;
        }
        Ok(token)
    }

    /// Consumes the current token if it has the expected kind.
    pub fn expect(&mut self, expected_kind: TokenKind) -> Result<Token, Error> {
        if self.current.kind != expected_kind {
            return Err(self.unexpected());
        }
        self.advance()
    }

    /// Consumes the current token only if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> Result<bool, Error> {
        if self.current.kind == kind {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Error for the current token appearing where the grammar forbids it.
    pub fn unexpected(&self) -> Error {
        let token = &self.current;
        let kind = match token.kind {
            TokenKind::EndOfFile => ErrorImpl::UnexpectedEndOfFile,
            TokenKind::Newline => ErrorImpl::UnexpectedNewline,
            TokenKind::Indent | TokenKind::Dedent => ErrorImpl::UnexpectedToken {
                token: token.kind.to_string(),
            },
            kind if kind.is_literal() => ErrorImpl::UnexpectedTokenOfType {
                token: token.text(self.lexer.source()).to_string(),
                kind: kind.to_string(),
            },
            _ => ErrorImpl::UnexpectedToken {
                token: token.text(self.lexer.source()).to_string(),
            },
        };
        Error::new(kind, token.span)
    }

    /// Span from `first` through the last consumed token.
    pub fn span_from(&self, first: u32) -> Span {
        Span::new(first, self.previous_last.max(first))
    }

    pub fn stmt(&mut self, kind: TokenKind, handler: StmtHandler) {
        let clash = self.simple_stmt_lookup.contains_key(&kind);
        if self.stmt_lookup.insert(kind, handler).is_some() || clash {
            self.ambiguity.get_or_insert(kind);
        }
    }

    pub fn simple_stmt(&mut self, kind: TokenKind, handler: StmtHandler) {
        let clash = self.stmt_lookup.contains_key(&kind);
        if self.simple_stmt_lookup.insert(kind, handler).is_some() || clash {
            self.ambiguity.get_or_insert(kind);
        }
    }

    pub fn nud(&mut self, kind: TokenKind, handler: NUDHandler) {
        if self.nud_lookup.insert(kind, handler).is_some() {
            self.ambiguity.get_or_insert(kind);
        }
    }

    pub fn led(&mut self, kind: TokenKind, bp: BindingPower, handler: LEDHandler) {
        self.binding_power_lookup.insert(kind, bp);
        if self.led_lookup.insert(kind, handler).is_some() {
            self.ambiguity.get_or_insert(kind);
        }
    }

    pub fn stmt_handler(&self, kind: TokenKind) -> Option<StmtHandler> {
        self.stmt_lookup.get(&kind).copied()
    }

    pub fn simple_stmt_handler(&self, kind: TokenKind) -> Option<StmtHandler> {
        self.simple_stmt_lookup.get(&kind).copied()
    }

    pub fn nud_handler(&self, kind: TokenKind) -> Option<NUDHandler> {
        self.nud_lookup.get(&kind).copied()
    }

    pub fn led_handler(&self, kind: TokenKind) -> Option<LEDHandler> {
        self.led_lookup.get(&kind).copied()
    }

    /// Whether the current token can begin an expression.
    pub fn at_expr_start(&self) -> bool {
        self.nud_lookup.contains_key(&self.current.kind)
    }

    /// Binding power of the current token, `Default` when it is not an
    /// infix operator.
    pub fn current_binding_power(&self) -> BindingPower {
        self.binding_power_lookup
            .get(&self.current.kind)
            .copied()
            .unwrap_or(BindingPower::Default)
    }
}

/// Parses one compilation unit into `arena`.
///
/// A missing final newline is supplied before tokenizing. The module span
/// runs from the first to the last top-level statement (`0:0` when there are
/// none).
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn parse(arena: &mut Arena, source: &str) -> Result<Module, Diagnostic> {
    let source = ensure_trailing_newline(source);
    parse_module(&mut arena.ast, &source).map_err(Diagnostic::from)
}

/// Reads `path` through `reader`, then parses it like [`parse`].
pub fn parse_file(
    arena: &mut Arena,
    path: &Path,
    reader: &dyn SourceReader,
) -> Result<Module, Diagnostic> {
    let source = reader.read_source(path).map_err(|e| {
        Diagnostic::from(Error::without_span(ErrorImpl::FileRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        }))
    })?;
    parse(arena, &source)
}

fn parse_module(arena: &mut AstArena, source: &str) -> Result<Module, Error> {
    let mut parser = Parser::new(source, arena)?;
    let mut body: Vec<StmtId> = Vec::new();

    while parser.current_token_kind() != TokenKind::EndOfFile {
        if parser.eat(TokenKind::Newline)? {
            continue;
        }
        body.extend(parse_stmt(&mut parser)?);
    }

    let span = match (body.first(), body.last()) {
        (Some(first), Some(last)) => parser
            .arena_ref()
            .stmt(*first)
            .span
            .merge(parser.arena_ref().stmt(*last).span),
        _ => Span::new(0, 0),
    };
    debug!(statements = body.len(), "parsed module");

    Ok(Module {
        body: body.into_boxed_slice(),
        span,
    })
}
