//! S-expression writer shared by the AST and ASR dumps.
//!
//! Output is `(Node child child ...)` with lists as `[a b]`. With `indent`
//! every child after the node name starts its own line, two spaces per
//! nesting level. With `colors` node names and literals get ANSI escapes.

use std::fmt::{Display, Write};

const NODE_COLOR: &str = "\x1b[1;34m";
const LITERAL_COLOR: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickleOptions {
    pub indent: bool,
    pub colors: bool,
}

pub struct Pickler {
    out: String,
    options: PickleOptions,
    depth: usize,
    needs_separator: bool,
}

impl Pickler {
    pub fn new(options: PickleOptions) -> Self {
        Pickler {
            out: String::with_capacity(256),
            options,
            depth: 0,
            needs_separator: false,
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn separate(&mut self) {
        if self.needs_separator {
            if self.options.indent {
                self.out.push('\n');
                for _ in 0..self.depth {
                    self.out.push_str("  ");
                }
            } else {
                self.out.push(' ');
            }
        }
        self.needs_separator = true;
    }

    fn colored(&mut self, color: &str, text: impl Display) {
        if self.options.colors {
            let _ = write!(self.out, "{color}{text}{RESET}");
        } else {
            let _ = write!(self.out, "{text}");
        }
    }

    pub fn open(&mut self, name: &str) {
        self.separate();
        self.out.push('(');
        self.colored(NODE_COLOR, name);
        self.depth += 1;
    }

    pub fn close(&mut self) {
        self.out.push(')');
        self.depth = self.depth.saturating_sub(1);
        self.needs_separator = true;
    }

    /// Operator names, contexts and other bare words.
    pub fn atom(&mut self, text: impl Display) {
        self.separate();
        let _ = write!(self.out, "{text}");
    }

    pub fn literal(&mut self, text: impl Display) {
        self.separate();
        self.colored(LITERAL_COLOR, text);
    }

    /// Placeholder for an absent optional child.
    pub fn none(&mut self) {
        self.atom("()");
    }

    pub fn open_list(&mut self) {
        self.separate();
        self.out.push('[');
        self.depth += 1;
        self.needs_separator = false;
    }

    pub fn close_list(&mut self) {
        self.out.push(']');
        self.depth = self.depth.saturating_sub(1);
        self.needs_separator = true;
    }
}

#[cfg(test)]
mod tests {
    use super::{PickleOptions, Pickler};

    fn sample(options: PickleOptions) -> String {
        let mut pickler = Pickler::new(options);
        pickler.open("Call");
        pickler.atom("f");
        pickler.open_list();
        pickler.literal(1);
        pickler.literal(2);
        pickler.close_list();
        pickler.none();
        pickler.close();
        pickler.finish()
    }

    #[test]
    fn test_flat_layout() {
        assert_eq!(sample(PickleOptions::default()), "(Call f [1 2] ())");
    }

    #[test]
    fn test_indented_layout() {
        let options = PickleOptions {
            indent: true,
            colors: false,
        };
        assert_eq!(sample(options), "(Call\n  f\n  [1\n    2]\n  ())");
    }

    #[test]
    fn test_colors_wrap_names_and_literals() {
        let options = PickleOptions {
            indent: false,
            colors: true,
        };
        let out = sample(options);
        assert!(out.starts_with("(\x1b[1;34mCall\x1b[0m f [\x1b[32m1\x1b[0m"));
    }
}
