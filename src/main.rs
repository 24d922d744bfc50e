use std::{
    fmt::Write,
    io::{stdout, IsTerminal},
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Once,
    time::Instant,
};

use clap::Parser;
use compy::{
    arena::Arena,
    ast::pickle::pickle_ast,
    errors::diagnostics::{Diagnostic, Diagnostics},
    lexer::{lexer::tokenize, tokens::pickle_tokens},
    parser::parser::parse,
    pickle::PickleOptions,
    semantics::{ast_to_asr::ast_to_asr, pickle::pickle_asr},
    source::{ensure_trailing_newline, FsReader, SourceReader},
    CompilerOptions, Span,
};

/// Front end for a typed Python subset: tokenizes, parses and type checks
/// a source file, optionally dumping each stage.
#[derive(Parser, Debug)]
#[command(name = "compy", version, about, long_about = None)]
struct Cli {
    /// Source file to compile
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Print the token stream
    #[arg(long)]
    show_tokens: bool,

    /// Print the AST
    #[arg(long)]
    show_ast: bool,

    /// Print the ASR
    #[arg(long)]
    show_asr: bool,

    /// Only collect top-level declarations during semantic analysis
    #[arg(long)]
    symtab_only: bool,

    /// Treat the file as an importable module rather than a program
    #[arg(long)]
    module: bool,

    /// Put every nested node of the AST/ASR dumps on its own line
    #[arg(long)]
    indent: bool,

    /// Disable ANSI colors in dumps
    #[arg(long)]
    no_color: bool,

    /// Suffix tokens with their byte offsets
    #[arg(long)]
    show_spans: bool,
}

impl Cli {
    fn options(&self) -> CompilerOptions {
        CompilerOptions {
            main_module: !self.module,
            symtab_only: self.symtab_only,
            pickle: PickleOptions {
                indent: self.indent,
                colors: !self.no_color && stdout().is_terminal(),
            },
            show_spans: self.show_spans,
        }
    }

    fn dumps_anything(&self) -> bool {
        self.show_tokens || self.show_ast || self.show_asr
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs a stderr subscriber filtered by `RUST_LOG`; silent otherwise.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let options = cli.options();

    let source = match FsReader.read_source(&cli.file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: unable to read {}: {}", cli.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cli, &options, &source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                eprint!("{}", render_diagnostic(diagnostic, &cli.file, &source));
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, options: &CompilerOptions, source: &str) -> Result<(), Diagnostics> {
    let start = Instant::now();

    if cli.show_tokens {
        let tokens = tokenize(&ensure_trailing_newline(source))
            .map_err(|e| Diagnostics::from(Diagnostic::from(e)))?;
        print!("{}", pickle_tokens(&tokens, options.show_spans));
    }

    let mut arena = Arena::for_source(source);
    let module = parse(&mut arena, source)?;
    if cli.show_ast {
        println!("{}", pickle_ast(&arena.ast, &module, options.pickle));
    }
    let parsed = start.elapsed();

    let unit = ast_to_asr(&mut arena, &module, options.main_module, options.symtab_only)?;
    if cli.show_asr {
        println!("{}", pickle_asr(&arena.asr, &unit, options.pickle));
    }

    if !cli.dumps_anything() {
        println!("Parsed in {:?}", parsed);
        println!("Analyzed in {:?}", start.elapsed() - parsed);
        println!("Total time: {:?}", start.elapsed());
    }
    Ok(())
}

/// Line number (1-based), line text and column of byte `offset`.
fn line_at(source: &str, offset: usize) -> (usize, &str, usize) {
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    let line = source[..line_start].matches('\n').count() + 1;
    (line, &source[line_start..line_end], offset - line_start)
}

fn render_diagnostic(diagnostic: &Diagnostic, file: &Path, source: &str) -> String {
    /*
        Error (semantic error): message
        -> file.py
           |
        20 | y = x + 'a'
           | ----^
    */

    let mut out = String::new();
    let _ = writeln!(out, "Error ({}): {}", diagnostic.stage, diagnostic.message);
    let _ = writeln!(out, "-> {}", file.display());

    let Some(Span { first, .. }) = diagnostic.primary_span() else {
        return out;
    };
    let (line, line_text, column) = line_at(source, first as usize);

    let line_str = line.to_string();
    let padding = line_str.len() + 2;
    let trimmed = line_text.trim_start();
    let removed_whitespace = line_text.len() - trimmed.len();

    let _ = writeln!(out, "{:>padding$}", "|");
    let _ = writeln!(out, "{} | {}", line_str, trimmed.trim_end());

    let arrows = column.saturating_sub(removed_whitespace) + 1;
    let _ = writeln!(out, "{:>padding$} {:->arrows$}", "|", "^");
    out
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use compy::{arena::Arena, compile_source, CompilerOptions};

    use super::{line_at, render_diagnostic};

    #[test]
    fn test_line_at_locates_offsets() {
        let source = "x = 1\n    y = 2\n";
        assert_eq!(line_at(source, 0), (1, "x = 1", 0));
        assert_eq!(line_at(source, 10), (2, "    y = 2", 4));
    }

    #[test]
    fn test_render_diagnostic_points_at_the_span() {
        let source = "x = 1\ny = x + 'a'\n";
        let mut arena = Arena::new();
        let diagnostics = compile_source(&mut arena, source, &CompilerOptions::default()).unwrap_err();
        let rendered = render_diagnostic(diagnostics.first().unwrap(), Path::new("main.py"), source);

        assert_eq!(
            rendered,
            "Error (semantic error): type mismatch in binary operation: 'i64' and 'str'\n\
             -> main.py\n  |\n2 | y = x + 'a'\n  | ----^\n"
        );
    }
}
