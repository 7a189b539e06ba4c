//! Writing the XML wire syntax.

use std::io::Write;

use tracing::warn;

use crate::document::Document;
use crate::error::{GxlError, Result};
use crate::rules;
use crate::types::ElementId;

/// Namespace declared on the root for the `xlink:` attributes.
pub const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";

/// Output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level. `0` writes one element per line, unindented.
    pub indent: usize,
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` first.
    pub xml_declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            xml_declaration: true,
        }
    }
}

impl Document {
    /// Serialize with default formatting.
    ///
    /// Fails with [`GxlError::DanglingTentacles`], producing no output, while
    /// any tentacle is unresolved.
    pub fn write(&self) -> Result<String> {
        self.write_with(&WriteOptions::default())
    }

    pub fn write_with(&self, options: &WriteOptions) -> Result<String> {
        let dangling = self.dangling_count();
        if dangling > 0 {
            warn!(dangling, "write refused: document has dangling tentacles");
            return Err(GxlError::DanglingTentacles(dangling));
        }

        let mut out = String::new();
        if options.xml_declaration {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        }
        match self.public_id() {
            Some(public) => out.push_str(&format!(
                "<!DOCTYPE gxl PUBLIC \"{}\" \"{}\">\n",
                escape_attribute(public),
                escape_attribute(self.doctype())
            )),
            None => out.push_str(&format!("<!DOCTYPE gxl SYSTEM \"{}\">\n", escape_attribute(self.doctype()))),
        }
        self.write_element(&mut out, self.root(), 0, options);
        Ok(out)
    }

    /// Serialize into a byte sink.
    pub fn write_to(&self, mut sink: impl Write, options: &WriteOptions) -> Result<()> {
        let text = self.write_with(options)?;
        sink.write_all(text.as_bytes())?;
        sink.flush()?;
        Ok(())
    }

    fn write_element(&self, out: &mut String, id: ElementId, depth: usize, options: &WriteOptions) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        let pad = " ".repeat(depth * options.indent);
        out.push_str(&pad);
        out.push('<');
        out.push_str(kind.tag());

        if id == self.root() {
            out.push_str(&format!(" xmlns:xlink=\"{XLINK_NAMESPACE}\""));
        }
        for rule in rules::attributes(kind) {
            if let Some(value) = self.attribute(id, rule.name) {
                out.push_str(&format!(" {}=\"{}\"", rule.name, escape_attribute(value)));
            }
        }

        if kind.is_atomic() {
            let text = self.text(id).unwrap_or_default();
            out.push_str(&format!(">{}</{}>\n", escape_text(text), kind.tag()));
            return;
        }

        let children = self.children(id);
        if children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for &child in children {
            self.write_element(out, child, depth + 1, options);
        }
        out.push_str(&pad);
        out.push_str(&format!("</{}>\n", kind.tag()));
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

// --- tests -------------------------------------------------------------------
