use std::fmt::Display;

use thiserror::Error;

use crate::Span;

/// Front-end stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Tokenizer,
    Parser,
    Semantic,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Tokenizer => write!(f, "tokenizer error"),
            Stage::Parser => write!(f, "syntax error"),
            Stage::Semantic => write!(f, "semantic error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    span: Option<Span>,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, span: Span) -> Self {
        Error {
            internal_error: error_impl,
            span: Some(span),
        }
    }

    /// An error that cannot be pinned to source text (unreadable file,
    /// broken grammar tables).
    pub fn without_span(error_impl: ErrorImpl) -> Self {
        Error {
            internal_error: error_impl,
            span: None,
        }
    }

    pub fn get_span(&self) -> Option<Span> {
        self.span
    }

    pub fn get_kind(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn stage(&self) -> Stage {
        self.internal_error.stage()
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::InconsistentIndentation => "InconsistentIndentation",
            ErrorImpl::UnterminatedString => "UnterminatedString",
            ErrorImpl::MalformedNumber { .. } => "MalformedNumber",
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnmatchedBracket { .. } => "UnmatchedBracket",
            ErrorImpl::UnexpectedEndOfFile => "UnexpectedEndOfFile",
            ErrorImpl::UnexpectedNewline => "UnexpectedNewline",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenOfType { .. } => "UnexpectedTokenOfType",
            ErrorImpl::IntegerTooLarge { .. } => "IntegerTooLarge",
            ErrorImpl::InvalidAssignmentTarget => "InvalidAssignmentTarget",
            ErrorImpl::PositionalAfterKeyword => "PositionalAfterKeyword",
            ErrorImpl::AmbiguousSyntax { .. } => "AmbiguousSyntax",
            ErrorImpl::FileRead { .. } => "FileRead",
            ErrorImpl::VariableAlreadyDeclared { .. } => "VariableAlreadyDeclared",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::MissingAnnotation { .. } => "MissingAnnotation",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::BinaryTypeMismatch { .. } => "BinaryTypeMismatch",
            ErrorImpl::ArgumentTypeMatchError { .. } => "ArgumentTypeMatchError",
            ErrorImpl::ArgumentCountMismatch { .. } => "ArgumentCountMismatch",
            ErrorImpl::UnsupportedOperator { .. } => "UnsupportedOperator",
            ErrorImpl::NonBooleanCondition { .. } => "NonBooleanCondition",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::NotSubscriptable { .. } => "NotSubscriptable",
            ErrorImpl::NotIterable { .. } => "NotIterable",
            ErrorImpl::IndexOutOfRange { .. } => "IndexOutOfRange",
            ErrorImpl::EmptyCollection { .. } => "EmptyCollection",
            ErrorImpl::OutsideLoop { .. } => "OutsideLoop",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::NoReturnValue { .. } => "NoReturnValue",
            ErrorImpl::MissingReturnValue { .. } => "MissingReturnValue",
            ErrorImpl::UnexpectedReturnValue { .. } => "UnexpectedReturnValue",
            ErrorImpl::ModuleNotFound { .. } => "ModuleNotFound",
            ErrorImpl::SymbolNotExported { .. } => "SymbolNotExported",
            ErrorImpl::ConstantOverflow => "ConstantOverflow",
            ErrorImpl::DivisionByZero => "DivisionByZero",
            ErrorImpl::NegativeShiftCount => "NegativeShiftCount",
            ErrorImpl::Intrinsic { .. } => "Intrinsic",
            ErrorImpl::Unsupported { .. } => "Unsupported",
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{}: {} ({})", self.stage(), self.internal_error, span),
            None => write!(f, "{}: {}", self.stage(), self.internal_error),
        }
    }
}

impl std::error::Error for Error {}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    // tokenizer
    #[error("inconsistent indentation")]
    InconsistentIndentation,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("malformed numeric literal {literal:?}")]
    MalformedNumber { literal: String },
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unmatched closing bracket {bracket:?}")]
    UnmatchedBracket { bracket: char },

    // parser
    #[error("end of file is unexpected here")]
    UnexpectedEndOfFile,
    #[error("newline is unexpected here")]
    UnexpectedNewline,
    #[error("token '{token}' is unexpected here")]
    UnexpectedToken { token: String },
    #[error("token '{token}' (of type '{kind}') is unexpected here")]
    UnexpectedTokenOfType { token: String, kind: String },
    #[error("integer literal {literal} does not fit in 64 bits")]
    IntegerTooLarge { literal: String },
    #[error("cannot assign to this expression")]
    InvalidAssignmentTarget,
    #[error("positional argument follows keyword argument")]
    PositionalAfterKeyword,
    #[error("internal compiler error: syntax is ambiguous in the parser (token '{token}')")]
    AmbiguousSyntax { token: String },
    #[error("unable to read {path:?}: {reason}")]
    FileRead { path: String, reason: String },

    // semantic
    #[error("variable {variable:?} already declared with type '{existing}'")]
    VariableAlreadyDeclared { variable: String, existing: String },
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
    #[error("parameter {parameter:?} needs a type annotation")]
    MissingAnnotation { parameter: String },
    #[error("types do not match: expected '{expected}', received '{received}'")]
    TypeMatchError { expected: String, received: String },
    #[error("type mismatch in binary operation: '{left}' and '{right}'")]
    BinaryTypeMismatch { left: String, right: String },
    #[error("argument {index} of {function:?} expects '{expected}', received '{received}'")]
    ArgumentTypeMatchError {
        function: String,
        index: usize,
        expected: String,
        received: String,
    },
    #[error("{function:?} takes {expected} arguments, received {received}")]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("operator '{operator}' is not supported for '{operand}'")]
    UnsupportedOperator { operator: String, operand: String },
    #[error("condition must be 'bool', received '{received}'")]
    NonBooleanCondition { received: String },
    #[error("{name:?} is not callable")]
    NotCallable { name: String },
    #[error("'{received}' is not subscriptable")]
    NotSubscriptable { received: String },
    #[error("'{received}' is not iterable")]
    NotIterable { received: String },
    #[error("index {index} is out of range for '{received}'")]
    IndexOutOfRange { index: i64, received: String },
    #[error("cannot infer the element type of an empty {collection} without an annotation")]
    EmptyCollection { collection: String },
    #[error("'{keyword}' outside loop")]
    OutsideLoop { keyword: String },
    #[error("'return' outside function")]
    ReturnOutsideFunction,
    #[error("function {function:?} does not return a value")]
    NoReturnValue { function: String },
    #[error("function {function:?} must return a value of type '{expected}'")]
    MissingReturnValue { function: String, expected: String },
    #[error("function {function:?} does not declare a return type")]
    UnexpectedReturnValue { function: String },
    #[error("module {module:?} not found")]
    ModuleNotFound { module: String },
    #[error("{name:?} is not exported by module {module:?}")]
    SymbolNotExported { name: String, module: String },
    #[error("integer overflow in constant expression")]
    ConstantOverflow,
    #[error("division by zero in constant expression")]
    DivisionByZero,
    #[error("negative shift count")]
    NegativeShiftCount,
    #[error("{message}")]
    Intrinsic { message: String },
    #[error("{feature} is not supported")]
    Unsupported { feature: String },
}

impl ErrorImpl {
    pub fn stage(&self) -> Stage {
        match self {
            ErrorImpl::InconsistentIndentation
            | ErrorImpl::UnterminatedString
            | ErrorImpl::MalformedNumber { .. }
            | ErrorImpl::UnrecognisedToken { .. }
            | ErrorImpl::UnmatchedBracket { .. } => Stage::Tokenizer,
            ErrorImpl::UnexpectedEndOfFile
            | ErrorImpl::UnexpectedNewline
            | ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenOfType { .. }
            | ErrorImpl::IntegerTooLarge { .. }
            | ErrorImpl::InvalidAssignmentTarget
            | ErrorImpl::PositionalAfterKeyword
            | ErrorImpl::AmbiguousSyntax { .. }
            | ErrorImpl::FileRead { .. } => Stage::Parser,
            _ => Stage::Semantic,
        }
    }

    /// Shorthand for the message-carrying intrinsic failure.
    pub fn intrinsic(message: impl Into<String>) -> Self {
        ErrorImpl::Intrinsic {
            message: message.into(),
        }
    }

    pub fn unsupported(feature: impl Into<String>) -> Self {
        ErrorImpl::Unsupported {
            feature: feature.into(),
        }
    }
}
