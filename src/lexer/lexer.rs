use lazy_static::lazy_static;
use num_bigint::BigInt;
use regex::Regex;
use tracing::trace;

use crate::{
    errors::errors::{Error, ErrorImpl},
    source::ensure_trailing_newline,
    Span, MK_DEFAULT_HANDLER, MK_TOKEN,
};

use super::tokens::{Token, TokenKind, TokenValue, RESERVED_LOOKUP};

/// Called with the length of the regex match starting at the token start.
pub type PatternHandler = fn(&mut Lexer<'_>, usize) -> Result<Token, Error>;

pub struct Pattern {
    regex: Regex,
    handler: PatternHandler,
}

const TAB_WIDTH: u32 = 8;

const REAL_PATTERN: &str = concat!(
    r"^(?:(?:[0-9](?:_?[0-9])*)?\.[0-9](?:_?[0-9])*|[0-9](?:_?[0-9])*\.)",
    r"(?:[eE][+-]?[0-9](?:_?[0-9])*)?[jJ]?",
    r"|^[0-9](?:_?[0-9])*[eE][+-]?[0-9](?:_?[0-9])*[jJ]?",
);

fn pattern(regex: &str, handler: PatternHandler) -> Pattern {
    Pattern {
        regex: Regex::new(regex)
            .unwrap_or_else(|e| panic!("invalid token pattern {regex:?}: {e}")),
        handler,
    }
}

fn operator(text: &str, handler: PatternHandler) -> Pattern {
    pattern(&format!("^{}", regex::escape(text)), handler)
}

lazy_static! {
    // Longer operators precede their prefixes.
    static ref PATTERNS: Vec<Pattern> = vec![
        pattern(r"^[A-Za-z_][A-Za-z0-9_]*", symbol_handler),
        pattern(r"^0[xXoObB][0-9A-Za-z_]*", radix_handler),
        pattern(REAL_PATTERN, real_handler),
        pattern(r"^[0-9](?:_?[0-9])*[jJ]?", integer_handler),
        pattern(r#"^(?:"""|'''|"|')"#, string_handler),
        operator("**=", MK_DEFAULT_HANDLER!(TokenKind::DoubleStarEquals, "**=")),
        operator("//=", MK_DEFAULT_HANDLER!(TokenKind::DoubleSlashEquals, "//=")),
        operator("<<=", MK_DEFAULT_HANDLER!(TokenKind::LeftShiftEquals, "<<=")),
        operator(">>=", MK_DEFAULT_HANDLER!(TokenKind::RightShiftEquals, ">>=")),
        operator("**", MK_DEFAULT_HANDLER!(TokenKind::DoubleStar, "**")),
        operator("//", MK_DEFAULT_HANDLER!(TokenKind::DoubleSlash, "//")),
        operator("<<", MK_DEFAULT_HANDLER!(TokenKind::LeftShift, "<<")),
        operator(">>", MK_DEFAULT_HANDLER!(TokenKind::RightShift, ">>")),
        operator("+=", MK_DEFAULT_HANDLER!(TokenKind::PlusEquals, "+=")),
        operator("-=", MK_DEFAULT_HANDLER!(TokenKind::MinusEquals, "-=")),
        operator("*=", MK_DEFAULT_HANDLER!(TokenKind::StarEquals, "*=")),
        operator("/=", MK_DEFAULT_HANDLER!(TokenKind::SlashEquals, "/=")),
        operator("%=", MK_DEFAULT_HANDLER!(TokenKind::PercentEquals, "%=")),
        operator("&=", MK_DEFAULT_HANDLER!(TokenKind::AmpersandEquals, "&=")),
        operator("|=", MK_DEFAULT_HANDLER!(TokenKind::PipeEquals, "|=")),
        operator("^=", MK_DEFAULT_HANDLER!(TokenKind::CaretEquals, "^=")),
        operator("==", MK_DEFAULT_HANDLER!(TokenKind::Equals, "==")),
        operator("!=", MK_DEFAULT_HANDLER!(TokenKind::NotEquals, "!=")),
        operator("<=", MK_DEFAULT_HANDLER!(TokenKind::LessEquals, "<=")),
        operator(">=", MK_DEFAULT_HANDLER!(TokenKind::GreaterEquals, ">=")),
        operator("->", MK_DEFAULT_HANDLER!(TokenKind::Arrow, "->")),
        operator("+", MK_DEFAULT_HANDLER!(TokenKind::Plus, "+")),
        operator("-", MK_DEFAULT_HANDLER!(TokenKind::Dash, "-")),
        operator("*", MK_DEFAULT_HANDLER!(TokenKind::Star, "*")),
        operator("/", MK_DEFAULT_HANDLER!(TokenKind::Slash, "/")),
        operator("%", MK_DEFAULT_HANDLER!(TokenKind::Percent, "%")),
        operator("@", MK_DEFAULT_HANDLER!(TokenKind::At, "@")),
        operator("&", MK_DEFAULT_HANDLER!(TokenKind::Ampersand, "&")),
        operator("|", MK_DEFAULT_HANDLER!(TokenKind::Pipe, "|")),
        operator("^", MK_DEFAULT_HANDLER!(TokenKind::Caret, "^")),
        operator("~", MK_DEFAULT_HANDLER!(TokenKind::Tilde, "~")),
        operator("<", MK_DEFAULT_HANDLER!(TokenKind::Less, "<")),
        operator(">", MK_DEFAULT_HANDLER!(TokenKind::Greater, ">")),
        operator("=", MK_DEFAULT_HANDLER!(TokenKind::Assignment, "=")),
        operator("(", MK_DEFAULT_HANDLER!(TokenKind::OpenParen, "(")),
        operator(")", MK_DEFAULT_HANDLER!(TokenKind::CloseParen, ")")),
        operator("[", MK_DEFAULT_HANDLER!(TokenKind::OpenBracket, "[")),
        operator("]", MK_DEFAULT_HANDLER!(TokenKind::CloseBracket, "]")),
        operator("{", MK_DEFAULT_HANDLER!(TokenKind::OpenCurly, "{")),
        operator("}", MK_DEFAULT_HANDLER!(TokenKind::CloseCurly, "}")),
        operator(",", MK_DEFAULT_HANDLER!(TokenKind::Comma, ",")),
        operator(":", MK_DEFAULT_HANDLER!(TokenKind::Colon, ":")),
        operator(";", MK_DEFAULT_HANDLER!(TokenKind::Semicolon, ";")),
        operator(".", MK_DEFAULT_HANDLER!(TokenKind::Dot, ".")),
    ];
}

/// Incremental tokenizer implementing the off-side rule.
///
/// Each call to [`Lexer::lex`] yields the next token; once the input is
/// exhausted every further call yields `EndOfFile`. Leading whitespace of
/// each logical line is compared against a stack of open indentation widths
/// (bottom is always 0) to produce `Indent`/`Dedent` tokens. Newlines inside
/// brackets and after a `\` continuation are not significant.
pub struct Lexer<'src> {
    source: &'src str,
    /// Next unread byte.
    cur: usize,
    /// Start of the token being produced.
    tok: usize,
    indent_stack: Vec<u32>,
    pending_dedents: usize,
    at_line_start: bool,
    bracket_depth: u32,
    last: Option<TokenKind>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Lexer<'src> {
        Lexer {
            source,
            cur: 0,
            tok: 0,
            indent_stack: vec![0],
            pending_dedents: 0,
            at_line_start: true,
            bracket_depth: 0,
            last: None,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn lex(&mut self) -> Result<Token, Error> {
        let token = self.next_token()?;

        if token.kind.is_open_bracket() {
            self.bracket_depth += 1;
        } else if token.kind.is_close_bracket() {
            if self.bracket_depth == 0 {
                let bracket = token.kind.text().chars().next().unwrap_or(')');
                return Err(Error::new(
                    ErrorImpl::UnmatchedBracket { bracket },
                    token.span,
                ));
            }
            self.bracket_depth -= 1;
        }

        trace!(
            kind = token.kind.pickle_name(),
            first = token.span.first,
            last = token.span.last,
            "lex"
        );
        self.last = Some(token.kind);
        Ok(token)
    }

    /// Builds a token covering `len` bytes from the token start and moves the
    /// cursor past it.
    pub fn emit(&mut self, kind: TokenKind, value: TokenValue, len: usize) -> Token {
        let end = self.tok + len;
        self.cur = end;
        MK_TOKEN!(kind, value, Span::from_range(self.tok, end))
    }

    fn matched(&self, len: usize) -> &'src str {
        &self.source[self.tok..self.tok + len]
    }

    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.source.as_bytes().get(offset).copied()
    }

    fn structural(&self, kind: TokenKind, span: Span) -> Token {
        MK_TOKEN!(kind, TokenValue::None, span)
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        if self.pending_dedents > 0 {
            self.pending_dedents -= 1;
            return Ok(self.structural(TokenKind::Dedent, Span::point(self.cur)));
        }

        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                if let Some(token) = self.line_start()? {
                    return Ok(token);
                }
            }

            self.skip_trivia();
            self.tok = self.cur;

            match self.byte_at(self.cur) {
                None => return Ok(self.end_of_input()),
                Some(b'\n') => {
                    let span = Span::point(self.cur);
                    self.cur += 1;
                    if self.bracket_depth > 0 {
                        continue;
                    }
                    self.at_line_start = true;
                    return Ok(self.structural(TokenKind::Newline, span));
                }
                Some(_) => return self.match_pattern(),
            }
        }
    }

    /// Measures the indentation of the next non-blank line and compares it
    /// with the stack. Blank and comment-only lines are skipped entirely.
    fn line_start(&mut self) -> Result<Option<Token>, Error> {
        loop {
            let line = self.cur;
            let mut width: u32 = 0;
            while let Some(byte) = self.byte_at(self.cur) {
                match byte {
                    b' ' => width += 1,
                    b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    b'\x0c' => width = 0,
                    _ => break,
                }
                self.cur += 1;
            }

            match self.byte_at(self.cur) {
                None => {
                    self.at_line_start = false;
                    return Ok(None);
                }
                Some(b'\n') => {
                    self.cur += 1;
                    continue;
                }
                Some(b'\r') if self.byte_at(self.cur + 1) == Some(b'\n') => {
                    self.cur += 2;
                    continue;
                }
                Some(b'#') => {
                    self.skip_comment();
                    if self.byte_at(self.cur) == Some(b'\n') {
                        self.cur += 1;
                    }
                    continue;
                }
                Some(_) => {}
            }

            self.at_line_start = false;
            let top = self.indent_stack.last().copied().unwrap_or(0);

            if width == top {
                return Ok(None);
            }

            if width > top {
                self.indent_stack.push(width);
                return Ok(Some(
                    self.structural(TokenKind::Indent, Span::from_range(line, self.cur)),
                ));
            }

            let mut pops = 0;
            while self.indent_stack.len() > 1
                && self.indent_stack.last().is_some_and(|&open| width < open)
            {
                self.indent_stack.pop();
                pops += 1;
            }
            if self.indent_stack.last().copied() != Some(width) {
                return Err(Error::new(
                    ErrorImpl::InconsistentIndentation,
                    Span::from_range(line, self.cur),
                ));
            }

            self.pending_dedents = pops - 1;
            return Ok(Some(self.structural(TokenKind::Dedent, Span::point(self.cur))));
        }
    }

    fn skip_comment(&mut self) {
        while let Some(byte) = self.byte_at(self.cur) {
            if byte == b'\n' {
                break;
            }
            self.cur += 1;
        }
    }

    /// Skips intra-line whitespace, comments and `\` line continuations.
    fn skip_trivia(&mut self) {
        while let Some(byte) = self.byte_at(self.cur) {
            match byte {
                b' ' | b'\t' | b'\x0c' | b'\r' => self.cur += 1,
                b'#' => self.skip_comment(),
                b'\\' => match (self.byte_at(self.cur + 1), self.byte_at(self.cur + 2)) {
                    (Some(b'\n'), _) => self.cur += 2,
                    (Some(b'\r'), Some(b'\n')) => self.cur += 3,
                    _ => break,
                },
                _ => break,
            }
        }
    }

    fn end_of_input(&mut self) -> Token {
        let span = Span::point(self.source.len().saturating_sub(1));

        let needs_newline = self.bracket_depth == 0
            && !matches!(
                self.last,
                None | Some(TokenKind::Newline) | Some(TokenKind::Dedent)
            );
        if needs_newline {
            return self.structural(TokenKind::Newline, span);
        }

        if self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            return self.structural(TokenKind::Dedent, span);
        }

        self.structural(TokenKind::EndOfFile, span)
    }

    fn match_pattern(&mut self) -> Result<Token, Error> {
        let remaining = &self.source[self.cur..];

        for pattern in PATTERNS.iter() {
            if let Some(found) = pattern.regex.find(remaining) {
                return (pattern.handler)(self, found.end());
            }
        }

        let ch = remaining.chars().next().unwrap_or('\0');
        Err(Error::new(
            ErrorImpl::UnrecognisedToken {
                token: ch.to_string(),
            },
            Span::from_range(self.cur, self.cur + ch.len_utf8()),
        ))
    }

    /// Numeric literals may not run straight into an identifier (`12abc`).
    fn reject_trailing_identifier(&self, len: usize) -> Result<(), Error> {
        let end = self.tok + len;
        let mut stop = end;
        while let Some(byte) = self.byte_at(stop) {
            if byte.is_ascii_alphanumeric() || byte == b'_' {
                stop += 1;
            } else {
                break;
            }
        }

        if stop == end {
            return Ok(());
        }
        Err(self.malformed(stop - self.tok))
    }

    fn malformed(&self, len: usize) -> Error {
        Error::new(
            ErrorImpl::MalformedNumber {
                literal: self.matched(len).to_string(),
            },
            Span::from_range(self.tok, self.tok + len),
        )
    }
}

/// Tokenizes a whole buffer, ending with (and including) `EndOfFile`.
///
/// A missing trailing newline is supplied first, exactly as the parser does,
/// so the result matches the stream the parser consumes.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let source = ensure_trailing_newline(source);
    let mut lexer = Lexer::new(&source);
    let mut tokens = Vec::with_capacity(source.len() / 3 + 1);

    loop {
        let token = lexer.lex()?;
        let done = token.kind == TokenKind::EndOfFile;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

fn symbol_handler(lexer: &mut Lexer<'_>, len: usize) -> Result<Token, Error> {
    let text = lexer.matched(len);

    match RESERVED_LOOKUP.get(text) {
        Some(kind) => Ok(lexer.emit(*kind, TokenValue::None, len)),
        None => Ok(lexer.emit(TokenKind::Name, TokenValue::Str(text.to_string()), len)),
    }
}

fn integer_handler(lexer: &mut Lexer<'_>, len: usize) -> Result<Token, Error> {
    lexer.reject_trailing_identifier(len)?;
    let digits: String = lexer.matched(len).chars().filter(|c| *c != '_').collect();

    if let Some(imaginary) = digits.strip_suffix(['j', 'J']) {
        let value = imaginary.parse::<f64>().map_err(|_| lexer.malformed(len))?;
        return Ok(lexer.emit(TokenKind::Imaginary, TokenValue::Imaginary(value), len));
    }

    let value = BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(|| lexer.malformed(len))?;
    Ok(lexer.emit(TokenKind::Integer, TokenValue::Integer(value), len))
}

fn radix_handler(lexer: &mut Lexer<'_>, len: usize) -> Result<Token, Error> {
    let text = lexer.matched(len);
    let radix = match text.as_bytes().get(1) {
        Some(b'x' | b'X') => 16,
        Some(b'o' | b'O') => 8,
        _ => 2,
    };
    let digits: String = text[2..].chars().filter(|c| *c != '_').collect();

    if digits.is_empty() {
        return Err(lexer.malformed(len));
    }
    let value = BigInt::parse_bytes(digits.as_bytes(), radix).ok_or_else(|| lexer.malformed(len))?;
    Ok(lexer.emit(TokenKind::Integer, TokenValue::Integer(value), len))
}

fn real_handler(lexer: &mut Lexer<'_>, len: usize) -> Result<Token, Error> {
    lexer.reject_trailing_identifier(len)?;
    let digits: String = lexer.matched(len).chars().filter(|c| *c != '_').collect();

    if let Some(imaginary) = digits.strip_suffix(['j', 'J']) {
        let value = imaginary.parse::<f64>().map_err(|_| lexer.malformed(len))?;
        return Ok(lexer.emit(TokenKind::Imaginary, TokenValue::Imaginary(value), len));
    }

    let value = digits.parse::<f64>().map_err(|_| lexer.malformed(len))?;
    Ok(lexer.emit(TokenKind::Real, TokenValue::Real(value), len))
}

fn string_handler(lexer: &mut Lexer<'_>, len: usize) -> Result<Token, Error> {
    let source = lexer.source;
    let start = lexer.tok;
    let quote = &source[start..start + len];
    let triple = len == 3;
    let body = start + len;

    let mut value = String::new();
    let mut chars = source[body..].char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let at = body + offset;

        if source[at..].starts_with(quote) {
            let end = at + len;
            return Ok(lexer.emit(TokenKind::String, TokenValue::Str(value), end - start));
        }

        match ch {
            '\n' if !triple => break,
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, '0')) => value.push('\0'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, '\'')) => value.push('\''),
                Some((_, '"')) => value.push('"'),
                Some((_, '\n')) => {}
                Some((_, 'x')) => {
                    let mut hex = String::new();
                    while hex.len() < 2 {
                        match chars.peek() {
                            Some((_, c)) if c.is_ascii_hexdigit() => {
                                hex.push(*c);
                                chars.next();
                            }
                            _ => break,
                        }
                    }
                    match u8::from_str_radix(&hex, 16) {
                        Ok(byte) if hex.len() == 2 => value.push(byte as char),
                        _ => {
                            value.push_str("\\x");
                            value.push_str(&hex);
                        }
                    }
                }
                Some((_, other)) => {
                    // Unknown escapes are kept verbatim.
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            _ => value.push(ch),
        }
    }

    let end = source[body..]
        .find('\n')
        .filter(|_| !triple)
        .map_or(source.len(), |offset| body + offset);
    Err(Error::new(
        ErrorImpl::UnterminatedString,
        Span::from_range(start, end),
    ))
}
