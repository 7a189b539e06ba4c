//! Reading the XML wire syntax.
//!
//! Parsing happens in two passes. The tokenizer turns the text into a raw
//! element tree, rejecting malformed markup and unknown element names with a
//! [`GxlError::Syntax`] carrying line and column. Only a well-formed tree is
//! then built into a [`Document`], bottom-up, through the same validated
//! `set_attribute`/`insert` calls a program would use: every subtree is
//! complete and detached before it is inserted into its parent, and each
//! top-level graph is inserted into the root last. A structurally invalid
//! input therefore fails with the same error a programmatic edit would get.

use std::io::Read;

use tracing::debug;

use crate::document::Document;
use crate::error::{GxlError, Result};
use crate::types::{ElementId, ElementKind};

impl Document {
    /// Parse a document from its XML text.
    pub fn parse(text: &str) -> Result<Document> {
        let raw = Tokenizer::new(text).document()?;
        let mut doc = Document::new();

        if let Some(doctype) = &raw.doctype {
            if doctype.root != "gxl" {
                return Err(GxlError::UnsupportedDoctype(doctype.root.clone()));
            }
            if let Some(system) = &doctype.system {
                doc.set_doctype(system)?;
            }
            doc.set_public_id(doctype.public.as_deref());
        }

        let root = doc.root();
        build_into(&mut doc, root, &raw.root)?;
        doc.clear_history();

        debug!(
            elements = doc.element_count(),
            graphs = doc.graphs(root).len(),
            dangling = doc.dangling_count(),
            "document parsed"
        );
        Ok(doc)
    }

    /// Read and parse a whole document from a byte stream.
    pub fn read_from(mut reader: impl Read) -> Result<Document> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Document::parse(&text)
    }
}

// --- building -------------------------------------------------------------------

/// Apply `raw`'s attributes and content to the existing element `target`.
fn build_into(doc: &mut Document, target: ElementId, raw: &RawElement) -> Result<()> {
    for (name, value) in &raw.attributes {
        doc.set_attribute(target, name, Some(value.as_str()))?;
    }

    let mut text = String::new();
    for content in &raw.content {
        match content {
            RawContent::Text(t) => text.push_str(t),
            RawContent::Element(child) => {
                let id = build(doc, child)?;
                doc.insert(target, id, usize::MAX)?;
            }
        }
    }

    if raw.kind.is_atomic() {
        doc.set_value(target, &text)?;
    } else if !text.trim().is_empty() {
        return Err(GxlError::UnexpectedText(raw.kind));
    }
    Ok(())
}

fn build(doc: &mut Document, raw: &RawElement) -> Result<ElementId> {
    let id = doc.create(raw.kind);
    build_into(doc, id, raw)?;
    Ok(id)
}

// --- tokenizing -----------------------------------------------------------------

struct RawDocument {
    doctype: Option<RawDoctype>,
    root: RawElement,
}

struct RawDoctype {
    root: String,
    public: Option<String>,
    system: Option<String>,
}

struct RawElement {
    kind: ElementKind,
    attributes: Vec<(String, String)>,
    content: Vec<RawContent>,
}

enum RawContent {
    Element(RawElement),
    Text(String),
}

struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a str) -> Self {
        let pos = if src.starts_with('\u{feff}') { 3 } else { 0 };
        Self { src, pos }
    }

    fn document(mut self) -> Result<RawDocument> {
        if self.rest().starts_with("<?xml") {
            self.processing_instruction()?;
        }
        self.misc()?;
        let doctype = if self.rest().starts_with("<!DOCTYPE") {
            let d = self.doctype()?;
            self.misc()?;
            Some(d)
        } else {
            None
        };

        if !self.rest().starts_with('<') {
            return Err(self.error("expected the <gxl> root element"));
        }
        let root = self.element()?;
        if root.kind != ElementKind::Gxl {
            return Err(self.error("root element must be <gxl>"));
        }
        self.misc()?;
        if self.pos < self.src.len() {
            return Err(self.error("unexpected content after the root element"));
        }
        Ok(RawDocument { doctype, root })
    }

    // --- cursor ---

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {token:?}")))
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
        self.pos > start
    }

    /// Consume up to and including `delimiter`, returning what preceded it.
    fn until(&mut self, delimiter: &str, what: &str) -> Result<&'a str> {
        match self.rest().find(delimiter) {
            Some(i) => {
                let s = &self.rest()[..i];
                self.pos += i + delimiter.len();
                Ok(s)
            }
            None => Err(self.error(&format!("unterminated {what}"))),
        }
    }

    fn name(&mut self) -> Result<&'a str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            let ok = b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'-' | b'.') || b >= 0x80;
            if !ok {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a name"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn error(&self, message: &str) -> GxlError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: &str) -> GxlError {
        let before = &self.src[..pos.min(self.src.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        GxlError::Syntax {
            line,
            column,
            message: message.to_string(),
        }
    }

    // --- markup ---

    /// Whitespace, comments, and processing instructions.
    fn misc(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.rest().starts_with("<!--") {
                self.comment()?;
            } else if self.rest().starts_with("<?") {
                self.processing_instruction()?;
            } else {
                return Ok(());
            }
        }
    }

    fn comment(&mut self) -> Result<()> {
        self.expect("<!--")?;
        self.until("-->", "comment").map(|_| ())
    }

    fn processing_instruction(&mut self) -> Result<()> {
        self.expect("<?")?;
        self.until("?>", "processing instruction").map(|_| ())
    }

    fn doctype(&mut self) -> Result<RawDoctype> {
        self.expect("<!DOCTYPE")?;
        if !self.skip_whitespace() {
            return Err(self.error("expected whitespace after <!DOCTYPE"));
        }
        let root = self.name()?.to_string();
        self.skip_whitespace();

        let mut public = None;
        let mut system = None;
        if self.eat("SYSTEM") {
            self.skip_whitespace();
            system = Some(self.quoted()?.to_string());
        } else if self.eat("PUBLIC") {
            self.skip_whitespace();
            public = Some(self.quoted()?.to_string());
            self.skip_whitespace();
            system = Some(self.quoted()?.to_string());
        }
        self.skip_whitespace();
        if self.eat("[") {
            self.until("]", "internal subset")?;
            self.skip_whitespace();
        }
        self.expect(">")?;
        Ok(RawDoctype {
            root,
            public,
            system,
        })
    }

    fn quoted(&mut self) -> Result<&'a str> {
        match self.peek() {
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 1;
                let delimiter = if q == b'"' { "\"" } else { "'" };
                self.until(delimiter, "quoted literal")
            }
            _ => Err(self.error("expected a quoted literal")),
        }
    }

    fn element(&mut self) -> Result<RawElement> {
        self.expect("<")?;
        let tag_start = self.pos;
        let tag = self.name()?;
        let kind = tag
            .parse::<ElementKind>()
            .map_err(|_| self.error_at(tag_start, &format!("unknown element <{tag}>")))?;

        let mut attributes: Vec<(String, String)> = Vec::new();
        loop {
            let spaced = self.skip_whitespace();
            if self.eat("/>") {
                return Ok(RawElement {
                    kind,
                    attributes,
                    content: Vec::new(),
                });
            }
            if self.eat(">") {
                break;
            }
            if !spaced {
                return Err(self.error("expected whitespace between attributes"));
            }
            let name = self.name()?;
            self.skip_whitespace();
            self.expect("=")?;
            self.skip_whitespace();
            let raw = self.quoted()?;
            if raw.contains('<') {
                return Err(self.error("'<' is not allowed in attribute values"));
            }
            if name == "xmlns" || name.starts_with("xmlns:") {
                continue;
            }
            if attributes.iter().any(|(n, _)| n == name) {
                return Err(self.error(&format!("duplicate attribute {name:?}")));
            }
            let value = self.decode(raw)?;
            attributes.push((name.to_string(), value));
        }

        let mut content = Vec::new();
        loop {
            if self.eat("</") {
                let close = self.name()?;
                if close != tag {
                    return Err(self.error(&format!("expected </{tag}>, found </{close}>")));
                }
                self.skip_whitespace();
                self.expect(">")?;
                break;
            }
            if self.rest().starts_with("<!--") {
                self.comment()?;
            } else if self.eat("<![CDATA[") {
                let text = self.until("]]>", "CDATA section")?;
                content.push(RawContent::Text(text.to_string()));
            } else if self.rest().starts_with("<?") {
                self.processing_instruction()?;
            } else if self.rest().starts_with('<') {
                content.push(RawContent::Element(self.element()?));
            } else if self.pos >= self.src.len() {
                return Err(self.error(&format!("unterminated <{tag}>")));
            } else {
                let end = self.rest().find('<').unwrap_or(self.rest().len());
                let raw = &self.rest()[..end];
                let text = self.decode(raw)?;
                self.pos += end;
                content.push(RawContent::Text(text));
            }
        }

        Ok(RawElement {
            kind,
            attributes,
            content,
        })
    }

    /// Decode entity and character references.
    fn decode(&self, raw: &str) -> Result<String> {
        if !raw.contains('&') {
            return Ok(raw.to_string());
        }
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(i) = rest.find('&') {
            out.push_str(&rest[..i]);
            rest = &rest[i + 1..];
            let end = rest
                .find(';')
                .ok_or_else(|| self.error("unterminated entity reference"))?;
            let entity = &rest[..end];
            let c = match entity {
                "lt" => '<',
                "gt" => '>',
                "amp" => '&',
                "quot" => '"',
                "apos" => '\'',
                _ => {
                    let code = if let Some(hex) = entity.strip_prefix("#x") {
                        u32::from_str_radix(hex, 16).ok()
                    } else if let Some(dec) = entity.strip_prefix('#') {
                        dec.parse().ok()
                    } else {
                        None
                    };
                    code.and_then(char::from_u32)
                        .ok_or_else(|| self.error(&format!("unknown entity &{entity};")))?
                }
            };
            out.push(c);
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

// --- tests -------------------------------------------------------------------
