use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use html::snapshot::{SnapshotOptions, TreeSnapshot};
use html::{HtmlDialect, LexerConfig, ParserConfig, SyntaxTree, XhtmlDialect, parse_with};
use mimalloc::MiMalloc;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum Dialect {
    #[default]
    Html,
    Xhtml,
}

/// Parse HTML/XHTML into a lossless syntax tree and report diagnostics.
#[derive(Parser, Debug)]
#[command(name = "tagstack", version)]
struct Cli {
    /// Input files; standard input when none are given.
    inputs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Dialect::Html)]
    dialect: Dialect,

    /// Include token leaves in the tree dump.
    #[arg(long)]
    tokens: bool,

    /// Append byte spans to every dumped line.
    #[arg(long)]
    spans: bool,

    /// Print tree statistics after each input.
    #[arg(long)]
    stats: bool,

    /// Only report diagnostics; exit with status 1 if there are any.
    #[arg(long)]
    check: bool,

    /// Interpolation delimiters, e.g. `{{,}}`.
    #[arg(long, value_name = "OPEN,CLOSE", value_parser = parse_interpolation)]
    interpolation: Option<(String, String)>,
}

fn parse_interpolation(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(',') {
        Some((open, close)) if !open.is_empty() && !close.is_empty() => {
            Ok((open.to_string(), close.to_string()))
        }
        _ => Err(format!("expected OPEN,CLOSE, got '{raw}'")),
    }
}

struct Input {
    label: String,
    source: String,
}

fn read_inputs(paths: &[PathBuf]) -> Result<Vec<Input>> {
    if paths.is_empty() {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read standard input")?;
        return Ok(vec![Input {
            label: "<stdin>".to_string(),
            source,
        }]);
    }
    paths
        .iter()
        .map(|path| {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(Input {
                label: path.display().to_string(),
                source,
            })
        })
        .collect()
}

fn parse(cli: &Cli, source: &str) -> Result<SyntaxTree> {
    let mut lexer = LexerConfig {
        interpolation: cli.interpolation.clone(),
        ..LexerConfig::default()
    };
    let tree = match cli.dialect {
        Dialect::Html => parse_with(source, &lexer, &ParserConfig::default(), &HtmlDialect),
        Dialect::Xhtml => {
            lexer.raw_text_elements.clear();
            parse_with(
                source,
                &lexer,
                &ParserConfig::case_sensitive(),
                &XhtmlDialect,
            )
        }
    };
    Ok(tree?)
}

fn report(cli: &Cli, input: &Input, tree: &SyntaxTree, out: &mut impl Write) -> Result<usize> {
    if !cli.check {
        let options = SnapshotOptions {
            spans: cli.spans,
            tokens: cli.tokens,
        };
        writeln!(out, "{}", TreeSnapshot::new(tree, options))?;
    }
    let diagnostics = tree.diagnostics();
    for diagnostic in &diagnostics {
        let (line, column) = tree.line_col(diagnostic.span.start);
        writeln!(
            out,
            "{}:{line}:{column}: {} [{}]",
            input.label,
            diagnostic.error,
            diagnostic.error.code.as_str()
        )?;
    }
    if cli.stats {
        let stats = tree.stats();
        writeln!(
            out,
            "{}: {} tokens, {} nodes, {} diagnostics, depth {}",
            input.label, stats.tokens, stats.nodes, stats.errors, stats.max_depth
        )?;
    }
    Ok(diagnostics.len())
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let inputs = read_inputs(&cli.inputs)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut total = 0usize;
    for input in &inputs {
        let tree = parse(&cli, &input.source)
            .with_context(|| format!("parser engine failure on {}", input.label))?;
        log::debug!(
            "{}: {} bytes, {} nodes",
            input.label,
            input.source.len(),
            tree.node_count()
        );
        total += report(&cli, input, &tree, &mut out)?;
    }
    out.flush()?;

    if cli.check && total > 0 {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
