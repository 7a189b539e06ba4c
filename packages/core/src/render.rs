//! Human-readable summaries of a [`Document`].
//!
//! The text form is meant for terminals and logs; it is not a canonical
//! format and is never read back. Only the XML wire syntax is normative.
//! [`summarize`] produces the same information as serializable data.

use serde::Serialize;

use crate::document::Document;
use crate::rules::{FROM, ID, NAME, TARGET, TO};
use crate::tentacle::Tentacle;
use crate::types::{Direction, ElementId, ElementKind};
use crate::value::Value;

/// Render the whole document as an indented outline, one block per
/// top-level graph.
///
/// ```text
/// GXL document  1 graph
/// ─────────────────────
///
/// graph g  [directed]  2 nodes, 1 edge
///   node a
///     @label = "first"
///   node b  (1 incidence)
///   edge a -> b
///
/// doctype: http://www.gupro.de/GXL/gxl-1.0.dtd
/// ```
pub fn render_document(doc: &Document) -> String {
    let graphs = doc.graphs(doc.root());
    let header = format!(
        "GXL document  {} graph{}",
        graphs.len(),
        if graphs.len() == 1 { "" } else { "s" }
    );
    let rule = "─".repeat(header.chars().count());
    let mut out = format!("{}\n{}\n", header, rule);

    for g in graphs {
        out.push('\n');
        render_graph(doc, g, 0, &mut out);
    }

    let dangling: Vec<Tentacle> = doc.dangling_tentacles().collect();
    if !dangling.is_empty() {
        out.push_str(&format!("\nDangling ({}):\n", dangling.len()));
        for t in dangling {
            out.push_str(&format!("  {}\n", describe_tentacle(doc, t)));
        }
    }

    out.push_str(&format!("\ndoctype: {}\n", doc.doctype()));
    out
}

/// Render one graph and everything nested in it.
pub fn render_graph(doc: &Document, graph: ElementId, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    let elements = doc.graph_elements(graph);
    let count = |kind: ElementKind| elements.iter().filter(|&&e| doc.kind(e) == Some(kind)).count();

    let mut flags = vec![doc.edge_mode(graph).to_string()];
    if doc.is_hypergraph(graph) {
        flags.push("hypergraph".into());
    }
    if doc.has_edge_ids(graph) {
        flags.push("edgeids".into());
    }
    let mut counts = vec![plural(count(ElementKind::Node), "node"), plural(count(ElementKind::Edge), "edge")];
    let rels = count(ElementKind::Rel);
    if rels > 0 {
        counts.push(plural(rels, "rel"));
    }
    out.push_str(&format!(
        "{}graph {}  [{}]  {}\n",
        pad,
        doc.attribute(graph, ID).unwrap_or("?"),
        flags.join(", "),
        counts.join(", ")
    ));
    render_annotations(doc, graph, depth + 1, out);

    for e in elements {
        let line = match doc.kind(e) {
            Some(ElementKind::Node) => format!("node {}", doc.attribute(e, ID).unwrap_or("?")),
            Some(ElementKind::Edge) => format!(
                "edge {}{} {} {}",
                label(doc, e),
                doc.attribute(e, FROM).unwrap_or("?"),
                if doc.is_directed(e) { "->" } else { "--" },
                doc.attribute(e, TO).unwrap_or("?")
            ),
            Some(ElementKind::Rel) => {
                let ends: Vec<String> = doc
                    .tentacles(e)
                    .into_iter()
                    .map(|t| {
                        let target = t.target_id(doc).unwrap_or("?");
                        match t.direction(doc) {
                            Direction::None => target.to_string(),
                            d => format!("{target} {d}"),
                        }
                    })
                    .collect();
                format!("rel {}({})", label(doc, e), ends.join(", "))
            }
            _ => continue,
        };
        let incidences = doc.connection_count(e);
        let suffix = if incidences > 0 {
            format!("  ({})", plural(incidences, "incidence"))
        } else {
            String::new()
        };
        out.push_str(&format!("{}  {}{}\n", pad, line, suffix));
        render_annotations(doc, e, depth + 2, out);
        for nested in doc.graphs(e) {
            render_graph(doc, nested, depth + 2, out);
        }
    }
}

/// `type` and `attr` children of an attributed element.
fn render_annotations(doc: &Document, element: ElementId, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    if let Some(ty) = doc.type_of(element) {
        out.push_str(&format!(
            "{}type {}\n",
            pad,
            doc.attribute(ty, crate::rules::HREF).unwrap_or("?")
        ));
    }
    for attr in doc.attrs(element) {
        let value = doc
            .value_of(attr)
            .and_then(|v| doc.value(v))
            .map(|v| format_value(&v))
            .unwrap_or_default();
        out.push_str(&format!(
            "{}@{} = {}\n",
            pad,
            doc.attribute(attr, NAME).unwrap_or("?"),
            value
        ));
    }
}

/// Compact single-line form of a value.
///
/// ```text
/// true  42  2.5  "text"  red  <http://example.org>  bag{1, 1}  set{1}  seq[1, 2]  tup(1, "a")
/// ```
pub fn format_value(value: &Value) -> String {
    let list = |members: &[Value]| {
        members
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", ")
    };
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::String(s) => format!("\"{}\"", truncate(s, 60)),
        Value::Enum(e) => e.clone(),
        Value::Locator(href) => format!("<{}>", href),
        Value::Bag(m) => format!("bag{{{}}}", list(m)),
        Value::Set(m) => format!("set{{{}}}", list(m)),
        Value::Seq(m) => format!("seq[{}]", list(m)),
        Value::Tup(m) => format!("tup({})", list(m)),
    }
}

// --- summaries -----------------------------------------------------------------

/// Machine-readable overview of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub doctype: String,
    pub elements: usize,
    pub graphs: Vec<GraphSummary>,
    pub dangling: Vec<DanglingSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSummary {
    pub id: String,
    pub edgemode: String,
    pub hypergraph: bool,
    pub nodes: usize,
    pub edges: usize,
    pub rels: usize,
    /// Graphs nested anywhere below this one.
    pub subgraphs: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DanglingSummary {
    /// The `id` of the owning edge or relation, when it has one.
    pub connection: Option<String>,
    pub tentacle: Tentacle,
    pub target: String,
}

pub fn summarize(doc: &Document) -> DocumentSummary {
    let graphs = doc
        .graphs(doc.root())
        .into_iter()
        .map(|g| {
            let all = doc.descendants(g);
            let count = |kind: ElementKind| all.iter().filter(|&&e| doc.kind(e) == Some(kind)).count();
            GraphSummary {
                id: doc.attribute(g, ID).unwrap_or_default().to_string(),
                edgemode: doc.edge_mode(g).to_string(),
                hypergraph: doc.is_hypergraph(g),
                nodes: count(ElementKind::Node),
                edges: count(ElementKind::Edge),
                rels: count(ElementKind::Rel),
                subgraphs: count(ElementKind::Graph),
            }
        })
        .collect();

    let dangling = doc
        .dangling_tentacles()
        .map(|t| DanglingSummary {
            connection: t
                .connection(doc)
                .and_then(|c| doc.attribute(c, ID))
                .map(str::to_string),
            tentacle: t,
            target: t.target_id(doc).unwrap_or_default().to_string(),
        })
        .collect();

    DocumentSummary {
        doctype: doc.doctype().to_string(),
        elements: doc.descendants(doc.root()).len() + 1,
        graphs,
        dangling,
    }
}

// --- helpers -----------------------------------------------------------------

fn describe_tentacle(doc: &Document, t: Tentacle) -> String {
    let owner = match t.connection(doc) {
        Some(c) => format!(
            "{} {}",
            doc.kind(c).map(|k| k.tag()).unwrap_or("?"),
            doc.attribute(c, ID).unwrap_or("(no id)")
        ),
        None => "relend".to_string(),
    };
    let end = match t {
        Tentacle::From(_) => FROM,
        Tentacle::To(_) => TO,
        Tentacle::Relend(_) => TARGET,
    };
    format!("{} {} -> {}", owner, end, t.target_id(doc).unwrap_or("?"))
}

/// `id ` for connections that carry one, empty otherwise.
fn label(doc: &Document, connection: ElementId) -> String {
    doc.attribute(connection, ID)
        .map(|id| format!("{id} "))
        .unwrap_or_default()
}

fn plural(n: usize, word: &str) -> String {
    format!("{} {}{}", n, word, if n == 1 { "" } else { "s" })
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

// --- tests -------------------------------------------------------------------
