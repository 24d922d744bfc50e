//! Utility macros for the lexer.
//!
//! - `MK_TOKEN!` - Creates a Token instance
//! - `MK_DEFAULT_HANDLER!` - Creates a pattern handler for fixed-text tokens

/// Creates a Token instance.
///
/// # Example
///
/// ```ignore
/// let token = MK_TOKEN!(TokenKind::Name, TokenValue::Str("x".into()), span);
/// ```
#[macro_export]
macro_rules! MK_TOKEN {
    ($kind:expr, $value:expr, $span:expr) => {
        Token {
            kind: $kind,
            value: $value,
            span: $span,
        }
    };
}

/// Creates a lexer pattern handler for operators and punctuation.
///
/// The generated handler emits a payload-free token of the given kind that
/// covers exactly `$text` and moves the cursor past it.
///
/// # Example
///
/// ```ignore
/// operator("**=", MK_DEFAULT_HANDLER!(TokenKind::DoubleStarEquals, "**="))
/// ```
#[macro_export]
macro_rules! MK_DEFAULT_HANDLER {
    ($kind:expr, $text:literal) => {{
        fn handler(lexer: &mut Lexer<'_>, len: usize) -> Result<Token, Error> {
            debug_assert_eq!(len, $text.len());
            Ok(lexer.emit($kind, TokenValue::None, len))
        }
        handler as PatternHandler
    }};
}
