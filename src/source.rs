//! Source acquisition for the front end.

use std::{borrow::Cow, fs, io, path::Path};

/// Provides the bytes of a compilation unit.
///
/// The parser only ever sees a `&str`; this trait exists so callers can feed
/// sources from somewhere other than the filesystem (tests, editors, build
/// caches).
pub trait SourceReader {
    fn read_source(&self, path: &Path) -> io::Result<String>;
}

/// Reads sources straight from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }
}

/// Appends a newline when the text does not already end in one.
///
/// Both the tokenizer dump and the parser go through here so they see the
/// same token stream.
pub fn ensure_trailing_newline(source: &str) -> Cow<'_, str> {
    if source.ends_with('\n') {
        Cow::Borrowed(source)
    } else {
        let mut owned = String::with_capacity(source.len() + 1);
        owned.push_str(source);
        owned.push('\n');
        Cow::Owned(owned)
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::ensure_trailing_newline;

    #[test]
    fn test_trailing_newline_is_added_once() {
        assert!(matches!(ensure_trailing_newline("x = 1\n"), Cow::Borrowed(_)));
        assert_eq!(ensure_trailing_newline("x = 1"), "x = 1\n");
        assert_eq!(ensure_trailing_newline(""), "\n");
    }
}
