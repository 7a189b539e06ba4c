//! Per-kind structural rules.
//!
//! Each [`ElementKind`] is described by two static tables: the attributes it
//! may carry ([`attributes`]) and the children it may contain, each child
//! kind paired with an ordering rank ([`child_rank`]). Children of a lower
//! rank must precede children of a higher rank. The validator consults these
//! tables generically; there is no per-kind validation code.

use crate::types::ElementKind;

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const FROM: &str = "from";
pub const TO: &str = "to";
pub const TARGET: &str = "target";
pub const FROM_ORDER: &str = "fromorder";
pub const TO_ORDER: &str = "toorder";
pub const START_ORDER: &str = "startorder";
pub const END_ORDER: &str = "endorder";
pub const IS_DIRECTED: &str = "isdirected";
pub const DIRECTION: &str = "direction";
pub const EDGE_MODE: &str = "edgemode";
pub const HYPERGRAPH: &str = "hypergraph";
pub const EDGE_IDS: &str = "edgeids";
pub const HREF: &str = "xlink:href";
pub const LINK_TYPE: &str = "xlink:type";

const BOOLEAN: &[&str] = &["true", "false"];
const EDGE_MODES: &[&str] = &[
    "directed",
    "undirected",
    "defaultdirected",
    "defaultundirected",
];
const DIRECTIONS: &[&str] = &["in", "out", "none"];
const LINK_TYPES: &[&str] = &["simple"];

/// One attribute a kind may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRule {
    pub name: &'static str,
    pub required: bool,
    /// The allowed values, when the attribute is enumerated.
    pub domain: Option<&'static [&'static str]>,
}

impl AttributeRule {
    const fn required(name: &'static str) -> Self {
        Self { name, required: true, domain: None }
    }

    const fn optional(name: &'static str) -> Self {
        Self { name, required: false, domain: None }
    }

    const fn enumerated(name: &'static str, domain: &'static [&'static str]) -> Self {
        Self { name, required: false, domain: Some(domain) }
    }
}

const GRAPH: &[AttributeRule] = &[
    AttributeRule::required(ID),
    AttributeRule::optional("role"),
    AttributeRule::enumerated(EDGE_IDS, BOOLEAN),
    AttributeRule::enumerated(HYPERGRAPH, BOOLEAN),
    AttributeRule::enumerated(EDGE_MODE, EDGE_MODES),
];

const NODE: &[AttributeRule] = &[AttributeRule::required(ID)];

const EDGE: &[AttributeRule] = &[
    AttributeRule::optional(ID),
    AttributeRule::required(FROM),
    AttributeRule::required(TO),
    AttributeRule::optional(FROM_ORDER),
    AttributeRule::optional(TO_ORDER),
    AttributeRule::enumerated(IS_DIRECTED, BOOLEAN),
];

const REL: &[AttributeRule] = &[
    AttributeRule::optional(ID),
    AttributeRule::enumerated(IS_DIRECTED, BOOLEAN),
];

const RELEND: &[AttributeRule] = &[
    AttributeRule::required(TARGET),
    AttributeRule::optional("role"),
    AttributeRule::enumerated(DIRECTION, DIRECTIONS),
    AttributeRule::optional(START_ORDER),
    AttributeRule::optional(END_ORDER),
];

const ATTR: &[AttributeRule] = &[
    AttributeRule::optional(ID),
    AttributeRule::required(NAME),
    AttributeRule::optional("kind"),
];

const LINK: &[AttributeRule] = &[
    AttributeRule::required(HREF),
    AttributeRule::enumerated(LINK_TYPE, LINK_TYPES),
];

/// The attributes `kind` may carry, in canonical (write) order.
pub fn attributes(kind: ElementKind) -> &'static [AttributeRule] {
    match kind {
        ElementKind::Graph => GRAPH,
        ElementKind::Node => NODE,
        ElementKind::Edge => EDGE,
        ElementKind::Rel => REL,
        ElementKind::Relend => RELEND,
        ElementKind::Attr => ATTR,
        ElementKind::Type | ElementKind::Locator => LINK,
        _ => &[],
    }
}

pub fn attribute_rule(kind: ElementKind, name: &str) -> Option<&'static AttributeRule> {
    attributes(kind).iter().find(|r| r.name == name)
}

/// Whether elements of `kind` are keyed in the document's id index.
pub fn has_id(kind: ElementKind) -> bool {
    attribute_rule(kind, ID).is_some()
}

/// Incidence and declaration order attributes.
pub fn is_order_attribute(name: &str) -> bool {
    matches!(name, FROM_ORDER | TO_ORDER | START_ORDER | END_ORDER)
}

/// Rank of `child` inside `parent`, or `None` if it may not appear there.
pub fn child_rank(parent: ElementKind, child: ElementKind) -> Option<u8> {
    use ElementKind::*;
    match (parent, child) {
        (Gxl, Graph) => Some(0),
        (Graph, Type) => Some(0),
        (Graph, Attr) => Some(1),
        (Graph, Node | Edge | Rel) => Some(2),
        (Node | Edge | Rel, Type) => Some(0),
        (Node | Edge | Rel, Attr) => Some(1),
        (Node | Edge | Rel, Graph) => Some(2),
        (Rel, Relend) => Some(3),
        (Relend, Attr) => Some(0),
        (Attr, Type) => Some(0),
        (Attr, Attr) => Some(1),
        (Attr, c) if c.is_value() => Some(2),
        (p, c) if p.is_composite() && c.is_value() => Some(0),
        _ => None,
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relend_never_carries_id() {
        assert!(attribute_rule(ElementKind::Relend, ID).is_none());
        assert!(!has_id(ElementKind::Relend));
        assert!(has_id(ElementKind::Attr));
    }

    #[test]
    fn required_attributes() {
        let required: Vec<_> = attributes(ElementKind::Edge)
            .iter()
            .filter(|r| r.required)
            .map(|r| r.name)
            .collect();
        assert_eq!(required, vec![FROM, TO]);
    }

    #[test]
    fn enumerated_domains() {
        let rule = attribute_rule(ElementKind::Graph, EDGE_MODE).unwrap();
        assert!(rule.domain.unwrap().contains(&"defaultundirected"));
        assert!(attribute_rule(ElementKind::Node, "role").is_none());
    }

    #[test]
    fn child_ranks_follow_type_attr_content() {
        use ElementKind::*;
        assert!(child_rank(Graph, Type) < child_rank(Graph, Attr));
        assert!(child_rank(Graph, Attr) < child_rank(Graph, Rel));
        assert!(child_rank(Rel, Graph) < child_rank(Rel, Relend));
        assert_eq!(child_rank(Attr, Locator), Some(2));
        assert_eq!(child_rank(Tup, Bag), Some(0));
        assert_eq!(child_rank(Node, Node), None);
        assert_eq!(child_rank(Gxl, Node), None);
        assert_eq!(child_rank(Int, Int), None);
    }
}
