//! `gxl`: command-line interface for GXL graph exchange documents.
//!
//! Subcommands:
//!
//! - **`validate`**: parse a document and report structural errors or
//!   dangling references.
//! - **`render`**: print a human-readable outline of the graphs.
//! - **`fmt`**: re-emit the document in canonical layout.
//! - **`inspect`**: print a JSON summary of the document.
//! - **`new`**: print a fresh document holding one empty graph.
//!
//! Every subcommand that takes FILE reads from stdin when FILE is `-`.

mod config;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use gxl::{render, Document, EdgeMode, WriteOptions};
use tracing::debug;

use config::CliConfig;

/// gxl: GXL document CLI
///
/// Validate, format, and inspect GXL graph documents.
#[derive(Parser)]
#[command(name = "gxl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that a document is well-formed and fully resolved.
    ///
    /// Exits 0 if the document parses and every edge and relation end
    /// resolves, 1 otherwise.
    Validate {
        /// Path to a GXL file, or `-` for stdin.
        file: PathBuf,
    },

    /// Render a document as a human-readable outline.
    Render {
        /// Path to a GXL file, or `-` for stdin.
        file: PathBuf,
    },

    /// Re-emit a document in canonical layout.
    ///
    /// Attributes are written in a fixed order per element kind and
    /// children are indented by `--indent` spaces per level.
    Fmt {
        /// Path to a GXL file, or `-` for stdin.
        file: PathBuf,

        /// Spaces per nesting level.
        #[arg(long, env = "GXL_INDENT", value_name = "N")]
        indent: Option<usize>,
    },

    /// Print a JSON summary: doctype, per-graph counts, dangling references.
    Inspect {
        /// Path to a GXL file, or `-` for stdin.
        file: PathBuf,
    },

    /// Print a new document with a single empty graph.
    ///
    /// Examples:
    ///   gxl new --graph G
    ///   gxl new --graph H --edgemode undirected --hypergraph
    New {
        /// Id of the graph.
        #[arg(short = 'g', long, value_name = "ID")]
        graph: String,

        /// directed | undirected | defaultdirected | defaultundirected
        #[arg(short = 'm', long, value_name = "MODE")]
        edgemode: Option<EdgeMode>,

        /// Allow n-ary relations in the graph.
        #[arg(long)]
        hypergraph: bool,

        /// Document type identifier to declare.
        #[arg(long, env = "GXL_DOCTYPE", value_name = "URI")]
        doctype: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = CliConfig::from_env();

    match cli.command {
        Command::Validate { file } => {
            let text = read_input(&file);
            let doc = match Document::parse(&text) {
                Ok(doc) => doc,
                Err(e) => {
                    eprintln!("error ({}): {}", e.category(), e);
                    process::exit(1);
                }
            };
            let summary = render::summarize(&doc);
            if !summary.dangling.is_empty() {
                for d in &summary.dangling {
                    eprintln!(
                        "dangling: {} {} -> {:?}",
                        d.connection.as_deref().unwrap_or("(no id)"),
                        tentacle_end(d.tentacle),
                        d.target
                    );
                }
                eprintln!("error: {} unresolved reference(s)", summary.dangling.len());
                process::exit(1);
            }
            let graphs = summary.graphs.len();
            println!("valid ({} graph{})", graphs, if graphs == 1 { "" } else { "s" });
        }

        Command::Render { file } => {
            let doc = load(&file);
            print!("{}", render::render_document(&doc));
        }

        Command::Fmt { file, indent } => {
            let doc = load(&file);
            print!("{}", write(&doc, &config.write_options(indent)));
        }

        Command::Inspect { file } => {
            let doc = load(&file);
            let summary = render::summarize(&doc);
            let json = serde_json::to_string_pretty(&summary)
                .unwrap_or_else(|e| fatal(&format!("failed to encode summary: {}", e)));
            println!("{}", json);
        }

        Command::New {
            graph,
            edgemode,
            hypergraph,
            doctype,
        } => {
            let doc = new_document(&graph, edgemode, hypergraph, &doctype.unwrap_or(config.doctype.clone()))
                .unwrap_or_else(|e| fatal(&format!("cannot create document: {}", e)));
            print!("{}", write(&doc, &config.write_options(None)));
        }
    }
}

fn new_document(id: &str, edgemode: Option<EdgeMode>, hypergraph: bool, doctype: &str) -> gxl::Result<Document> {
    let mut doc = Document::new();
    doc.set_doctype(doctype)?;
    let graph = doc.new_graph(id);
    if let Some(mode) = edgemode {
        doc.set_attribute(graph, "edgemode", Some(&mode.to_string()))?;
    }
    if hypergraph {
        doc.set_attribute(graph, "hypergraph", Some("true"))?;
    }
    let root = doc.root();
    doc.append(root, graph)?;
    Ok(doc)
}

fn tentacle_end(t: gxl::Tentacle) -> &'static str {
    match t {
        gxl::Tentacle::From(_) => "from",
        gxl::Tentacle::To(_) => "to",
        gxl::Tentacle::Relend(_) => "target",
    }
}

/// Parse the document at `path`, exiting on any error.
fn load(path: &PathBuf) -> Document {
    let text = read_input(path);
    Document::parse(&text).unwrap_or_else(|e| fatal(&format!("{}: {}", path.display(), e)))
}

fn write(doc: &Document, options: &WriteOptions) -> String {
    doc.write_with(options)
        .unwrap_or_else(|e| fatal(&format!("cannot write document: {}", e)))
}

/// Read the full contents of a file, or stdin when the path is `"-"`.
fn read_input(path: &PathBuf) -> String {
    let text = if path.to_str() == Some("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .unwrap_or_else(|e| fatal(&format!("failed to read stdin: {}", e)));
        buf
    } else {
        fs::read_to_string(path)
            .unwrap_or_else(|e| fatal(&format!("failed to read {}: {}", path.display(), e)))
    };
    debug!(bytes = text.len(), path = %path.display(), "input read");
    text
}

/// Print an error message to stderr and exit with code 2.
fn fatal(msg: &str) -> ! {
    eprintln!("gxl: {}", msg);
    process::exit(2);
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_document_writes_requested_flags() {
        let doc = new_document("G", Some(EdgeMode::Undirected), true, gxl::DEFAULT_DOCTYPE).unwrap();
        let text = doc.write().unwrap();
        assert!(text.contains("<graph id=\"G\" hypergraph=\"true\" edgemode=\"undirected\"/>"));
    }

    #[test]
    fn new_document_rejects_unknown_doctype() {
        assert!(new_document("G", None, false, "gxl-9.dtd").is_err());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["gxl", "new", "--graph", "G", "-m", "defaultundirected"]).unwrap();
        let Command::New { graph, edgemode, .. } = cli.command else {
            panic!("expected the new subcommand");
        };
        assert_eq!(graph, "G");
        assert_eq!(edgemode, Some(EdgeMode::DefaultUndirected));
        assert!(Cli::try_parse_from(["gxl", "new", "--graph", "G", "-m", "sideways"]).is_err());
    }
}
