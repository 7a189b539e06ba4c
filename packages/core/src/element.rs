use std::collections::BTreeMap;

use crate::tentacle::Tentacle;
use crate::types::{ElementId, ElementKind};
use crate::value::Value;

/// One slot of the document arena.
///
/// `children` is owned structure. `incidences` and `declared` are derived
/// state, maintained by the command layer and never authored directly.
#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub kind: ElementKind,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<ElementId>,
    pub parent: Option<ElementId>,
    /// Reachable from the document root.
    pub attached: bool,
    /// Textual payload of an atomic value, verbatim.
    pub text: String,
    /// Typed payload of an atomic value, kept in sync with `text`.
    pub scalar: Option<Value>,
    /// Graph elements: tentacles resolving here, in incidence order.
    pub incidences: Vec<Tentacle>,
    /// Relations: relend children, in declaration (`startorder`) order.
    pub declared: Vec<ElementId>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Self {
        let text = match kind {
            ElementKind::Bool => "false",
            ElementKind::Int => "0",
            ElementKind::Float => "0.0",
            _ => "",
        }
        .to_string();
        let scalar = Value::parse_atomic(kind, &text).ok();
        Self {
            kind,
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            attached: false,
            text,
            scalar,
            incidences: Vec::new(),
            declared: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attribute(&mut self, name: &str, value: Option<&str>) {
        match value {
            Some(v) => {
                self.attributes.insert(name.to_string(), v.to_string());
            }
            None => {
                self.attributes.remove(name);
            }
        }
    }

    pub fn position(&self, child: ElementId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }
}

// --- tests -------------------------------------------------------------------
