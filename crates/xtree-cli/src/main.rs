use std::fmt::{self, Write as _};
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xtree::{Config, Document, EventSource, NodeId, Reader, Recorder};

#[derive(Debug, Parser)]
#[command(
    name = "xtree",
    version,
    about = "Parse XML into a tree and print its outline"
)]
struct Args {
    /// Input file (defaults to stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,
    /// Keep surrounding whitespace in element values
    #[arg(long)]
    no_trim: bool,
    /// Report local names and drop xmlns declarations
    #[arg(long)]
    namespaces: bool,
    /// Report namespace prefix mappings (with --namespaces)
    #[arg(long)]
    report_prefixes: bool,
    /// Load SYSTEM entities from the file system
    #[arg(long)]
    resolve_entities: bool,
    /// Maximum element nesting depth (0 means unlimited)
    #[arg(long, value_name = "N")]
    max_depth: Option<u16>,
    /// Print the tree as JSON
    #[arg(long, conflicts_with = "events")]
    json: bool,
    /// Print the raw parse events instead of the tree
    #[arg(long)]
    events: bool,
    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> Config {
        let config = Config::default()
            .with_trim_whitespace(!self.no_trim)
            .with_process_namespaces(self.namespaces)
            .with_report_namespace_prefixes(self.report_prefixes)
            .with_resolve_external_entities(self.resolve_entities);
        match self.max_depth {
            Some(depth) => config.with_max_depth(depth),
            None => config,
        }
    }
}

fn main() {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(&args) {
        error!("{err:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let input = read_input(&args.input)?;
    let config = args.config();

    let output = if args.events {
        render_events(&input, config)?
    } else {
        let doc = xtree::parse(&input, config).context("failed to parse XML")?;
        info!(nodes = doc.len(), "parsed document");
        if args.json {
            let mut json = serde_json::to_string_pretty(&doc)?;
            json.push('\n');
            json
        } else {
            render_outline(&doc)?
        }
    };

    write_output(&args.output, output.as_bytes())
}

fn read_input(path: &Option<PathBuf>) -> Result<Vec<u8>> {
    match path {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("failed to read input file {}", path.display())),
        None => {
            let mut buffer = Vec::new();
            io::stdin()
                .read_to_end(&mut buffer)
                .context("failed to read stdin")?;
            if buffer.iter().all(u8::is_ascii_whitespace) {
                bail!("no input provided on stdin");
            }
            Ok(buffer)
        }
    }
}

fn write_output(path: &Option<PathBuf>, data: &[u8]) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, data)
            .with_context(|| format!("failed to write output file {}", path.display())),
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(data).context("failed to write stdout")?;
            Ok(())
        }
    }
}

fn render_events(input: &[u8], config: Config) -> Result<String> {
    let mut recorder = Recorder::default();
    let ok = Reader::with_config(input, config).run(&mut recorder);
    let mut out = String::new();
    for event in &recorder.events {
        writeln!(out, "{event:?}")?;
    }
    if !ok {
        bail!("{out}event source reported failure");
    }
    Ok(out)
}

fn render_outline(doc: &Document) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for (id, _) in doc.children(NodeId::ROOT) {
        write_outline(doc, id, 0, &mut out)?;
    }
    Ok(out)
}

fn write_outline(doc: &Document, id: NodeId, depth: usize, out: &mut String) -> fmt::Result {
    let Some(element) = doc.get(id) else {
        return Ok(());
    };
    write!(out, "{}{}", "  ".repeat(depth), element.name())?;
    for (key, value) in element.attributes() {
        write!(out, " {key}={value:?}")?;
    }
    if let Some(value) = element.value() {
        if element.is_cdata() == Some(true) {
            out.push_str(" [cdata]");
        }
        write!(out, " = {value:?}")?;
    }
    out.push('\n');
    for (child, _) in doc.children(id) {
        write_outline(doc, child, depth + 1, out)?;
    }
    Ok(())
}
