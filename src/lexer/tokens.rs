use lazy_static::lazy_static;
use num_bigint::BigInt;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("and", TokenKind::And);
        map.insert("as", TokenKind::As);
        map.insert("break", TokenKind::Break);
        map.insert("continue", TokenKind::Continue);
        map.insert("def", TokenKind::Def);
        map.insert("elif", TokenKind::Elif);
        map.insert("else", TokenKind::Else);
        map.insert("False", TokenKind::False);
        map.insert("for", TokenKind::For);
        map.insert("from", TokenKind::From);
        map.insert("if", TokenKind::If);
        map.insert("import", TokenKind::Import);
        map.insert("in", TokenKind::In);
        map.insert("is", TokenKind::Is);
        map.insert("None", TokenKind::None);
        map.insert("not", TokenKind::Not);
        map.insert("or", TokenKind::Or);
        map.insert("pass", TokenKind::Pass);
        map.insert("raise", TokenKind::Raise);
        map.insert("return", TokenKind::Return);
        map.insert("True", TokenKind::True);
        map.insert("while", TokenKind::While);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EndOfFile,
    Newline,
    Indent,
    Dedent,

    Name,
    Integer,
    Real,
    Imaginary,
    String,

    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,

    Comma,
    Colon,
    Semicolon,
    Dot,
    Arrow,
    Assignment, // =

    Plus,
    Dash,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    At,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    LeftShift,
    RightShift,

    Equals,    // ==
    NotEquals, // !=
    Less,
    LessEquals,
    Greater,
    GreaterEquals,

    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    DoubleSlashEquals,
    PercentEquals,
    DoubleStarEquals,
    AmpersandEquals,
    PipeEquals,
    CaretEquals,
    LeftShiftEquals,
    RightShiftEquals,

    // Reserved
    And,
    As,
    Break,
    Continue,
    Def,
    Elif,
    Else,
    False,
    For,
    From,
    If,
    Import,
    In,
    Is,
    None,
    Not,
    Or,
    Pass,
    Raise,
    Return,
    True,
    While,
}

impl TokenKind {
    /// Human-readable name, as used in diagnostics.
    pub fn text(&self) -> &'static str {
        match self {
            TokenKind::EndOfFile => "end of file",
            TokenKind::Newline => "newline",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Name => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::Real => "real",
            TokenKind::Imaginary => "imaginary",
            TokenKind::String => "string",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::OpenCurly => "{",
            TokenKind::CloseCurly => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Assignment => "=",
            TokenKind::Plus => "+",
            TokenKind::Dash => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::DoubleStar => "**",
            TokenKind::At => "@",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::LeftShift => "<<",
            TokenKind::RightShift => ">>",
            TokenKind::Equals => "==",
            TokenKind::NotEquals => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEquals => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEquals => ">=",
            TokenKind::PlusEquals => "+=",
            TokenKind::MinusEquals => "-=",
            TokenKind::StarEquals => "*=",
            TokenKind::SlashEquals => "/=",
            TokenKind::DoubleSlashEquals => "//=",
            TokenKind::PercentEquals => "%=",
            TokenKind::DoubleStarEquals => "**=",
            TokenKind::AmpersandEquals => "&=",
            TokenKind::PipeEquals => "|=",
            TokenKind::CaretEquals => "^=",
            TokenKind::LeftShiftEquals => "<<=",
            TokenKind::RightShiftEquals => ">>=",
            TokenKind::And => "and",
            TokenKind::As => "as",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Def => "def",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::False => "False",
            TokenKind::For => "for",
            TokenKind::From => "from",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::None => "None",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Pass => "pass",
            TokenKind::Raise => "raise",
            TokenKind::Return => "return",
            TokenKind::True => "True",
            TokenKind::While => "while",
        }
    }

    /// Name used in token dumps.
    pub fn pickle_name(&self) -> &'static str {
        match self {
            TokenKind::EndOfFile => "EOF",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Indent => "INDENT",
            TokenKind::Dedent => "DEDENT",
            TokenKind::Name => "NAME",
            TokenKind::Integer => "INTEGER",
            TokenKind::Real => "REAL",
            TokenKind::Imaginary => "IMAGINARY",
            TokenKind::String => "STRING",
            other => other.text(),
        }
    }

    /// Layout tokens synthesised by the indentation tracker.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            TokenKind::EndOfFile | TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Name
                | TokenKind::Integer
                | TokenKind::Real
                | TokenKind::Imaginary
                | TokenKind::String
        )
    }

    pub fn is_open_bracket(&self) -> bool {
        matches!(
            self,
            TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenCurly
        )
    }

    pub fn is_close_bracket(&self) -> bool {
        matches!(
            self,
            TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseCurly
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Payload carried by literal-bearing tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Integer(BigInt),
    Real(f64),
    /// Imaginary part of a `2j`-style literal.
    Imaginary(f64),
    /// Identifier text, or the unescaped contents of a string literal.
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub span: Span,
}

impl Token {
    /// The exact source text the token was read from.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let first = self.span.first as usize;
        let last = (self.span.last as usize + 1).min(source.len());
        source.get(first..last).unwrap_or("")
    }

    fn value_text(&self) -> Option<String> {
        match (&self.value, self.kind) {
            (TokenValue::None, _) => None,
            (TokenValue::Integer(n), _) => Some(n.to_string()),
            (TokenValue::Real(r), _) => Some(format!("{:?}", r)),
            (TokenValue::Imaginary(r), _) => Some(format!("{:?}j", r)),
            (TokenValue::Str(s), TokenKind::String) => Some(format!("{:?}", s)),
            (TokenValue::Str(s), _) => Some(s.clone()),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value_text() {
            Some(value) => write!(f, "{} {}", self.kind.pickle_name(), value),
            None => write!(f, "{}", self.kind.pickle_name()),
        }
    }
}

/// Renders one token as `KIND [VALUE] [FIRST:LAST]`.
pub fn pickle_token(token: &Token, show_spans: bool) -> String {
    if show_spans {
        format!("{} {}", token, token.span)
    } else {
        token.to_string()
    }
}

/// One token per line, in stream order.
pub fn pickle_tokens(tokens: &[Token], show_spans: bool) -> String {
    let mut out = String::with_capacity(tokens.len() * 12);
    for token in tokens {
        out.push_str(&pickle_token(token, show_spans));
        out.push('\n');
    }
    out
}
