//! In-memory document model for GXL, the Graph eXchange Language.
//!
//! A [`Document`] owns a tree of typed elements (graphs, nodes, edges, n-ary
//! relations, typed attributes, and a small value algebra) and keeps it
//! valid at all times: every mutation is checked before it is applied, ids
//! are unique document-wide, and every edge end or relation end (a
//! [`Tentacle`]) is either resolved into its target's incidence list or
//! tracked as dangling. Committed changes are reversible through
//! [`Document::undo`]/[`Document::redo`] and reported to listeners.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Handles and enums: [`ElementId`], [`ElementKind`], [`EdgeMode`], [`Direction`] |
//! | [`rules`] | Per-kind attribute and child tables consulted by the validator |
//! | [`value`] | Detached [`Value`] trees and value equality |
//! | [`tentacle`] | [`Tentacle`] views over edge and relation ends |
//! | [`document`] | The [`Document`]: arena, id index, queries, and mutations |
//! | [`command`] | Reversible [`Change`] records and the undo/redo [`History`] |
//! | [`listener`] | [`DocumentListener`] change notification |
//! | [`writer`] | XML output and [`WriteOptions`] |
//! | [`render`] | Plain-text outlines and serializable summaries |
//! | [`error`] | [`GxlError`] and its [`ErrorCategory`] |
//!
//! # Quick start
//!
//! ```rust
//! use gxl::Document;
//!
//! let mut doc = Document::new();
//! let graph = doc.new_graph("g");
//! let a = doc.new_node("a");
//! let b = doc.new_node("b");
//! let e = doc.new_edge("a", "b");
//! for child in [a, b, e] {
//!     doc.append(graph, child)?;
//! }
//! let root = doc.root();
//! doc.append(root, graph)?;
//! assert_eq!(doc.connection_count(b), 1);
//!
//! // Write and read back.
//! let text = doc.write()?;
//! assert_eq!(Document::parse(&text)?, doc);
//!
//! // Detach the graph again.
//! doc.undo()?;
//! assert!(doc.element_by_id("a").is_none());
//! # Ok::<(), gxl::GxlError>(())
//! ```

pub mod command;
pub mod document;
mod element;
pub mod error;
pub mod listener;
mod reader;
pub mod render;
pub mod rules;
pub mod tentacle;
pub mod types;
mod validation;
pub mod value;
pub mod writer;

pub use command::{AttrValueReplace, AttributeChange, Change, History, TreeChange, ValueChange};
pub use document::{Document, DEFAULT_DOCTYPE};
pub use error::{ErrorCategory, GxlError, Result};
pub use listener::{DocumentListener, ListenerId};
pub use render::{render_document, summarize, DocumentSummary};
pub use tentacle::Tentacle;
pub use types::{Direction, EdgeMode, ElementId, ElementKind};
pub use value::Value;
pub use writer::{WriteOptions, XLINK_NAMESPACE};
