//! Structured diagnostics handed back to the driver.
//!
//! Rendering (source snippets, colours) belongs to whoever consumes these;
//! the front end only records what went wrong and where.

use std::fmt::Display;

use crate::{
    errors::errors::{Error, Stage},
    Span,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
    Style,
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Note => "note",
            Level::Help => "help",
            Level::Style => "style",
        };
        write!(f, "{}", name)
    }
}

/// A message attached to one or more source spans.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub message: String,
    pub spans: Vec<Span>,
    pub primary: bool,
}

impl Label {
    pub fn primary(message: impl Into<String>, spans: Vec<Span>) -> Self {
        Label {
            message: message.into(),
            spans,
            primary: true,
        }
    }

    pub fn secondary(message: impl Into<String>, spans: Vec<Span>) -> Self {
        Label {
            message: message.into(),
            spans,
            primary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub level: Level,
    pub stage: Stage,
    pub message: String,
    pub labels: Vec<Label>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, level: Level, stage: Stage) -> Self {
        Diagnostic {
            level,
            stage,
            message: message.into(),
            labels: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// First span of the first primary label.
    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|label| label.primary)
            .and_then(|label| label.spans.first().copied())
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

impl From<Error> for Diagnostic {
    fn from(error: Error) -> Self {
        let diagnostic = Diagnostic::new(error.get_kind().to_string(), Level::Error, error.stage());
        match error.get_span() {
            Some(span) => diagnostic.with_label(Label::primary("", vec![span])),
            None => diagnostic,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.level, self.stage, self.message)?;
        for label in &self.labels {
            for span in &label.spans {
                write!(f, "\n  --> {}", span)?;
                if !label.message.is_empty() {
                    write!(f, " {}", label.message)?;
                }
            }
        }
        Ok(())
    }
}

/// Ordered collection of diagnostics for one compilation unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Diagnostics {
            diagnostics: vec![diagnostic],
        }
    }
}

impl From<Error> for Diagnostics {
    fn from(error: Error) -> Self {
        Diagnostics::from(Diagnostic::from(error))
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}
