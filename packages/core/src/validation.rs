//! Pre-mutation validation.
//!
//! One stateless function per mutation category. Each inspects the document
//! as it is, decides whether the mutation would leave it valid, and returns
//! the first violation found. Nothing here mutates; [`Document`] only applies
//! a change after its validator has returned `Ok`.
//!
//! Insertion is checked in two tiers: shallow rules on the child and its
//! subtree (kinds, attributes, value arity, homogeneity), then, when the
//! parent is attached, document-wide rules evaluated against the union of
//! existing and prospective state (ids, orders, cross-graph connections, and
//! dangling tentacles the insertion would resolve).

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::document::Document;
use crate::error::{GxlError, Result};
use crate::rules::{self, DIRECTION, EDGE_MODE, HREF, HYPERGRAPH, ID, IS_DIRECTED, NAME, START_ORDER};
use crate::tentacle::{parse_order, Tentacle};
use crate::types::{Direction, EdgeMode, ElementId, ElementKind};
use crate::value::Value;

/// Check that `child` may be inserted below `parent`, returning the index
/// corrected into the range the child's kind may occupy.
pub(crate) fn validate_insert(
    doc: &Document,
    parent: ElementId,
    child: ElementId,
    index: usize,
) -> Result<usize> {
    let p = doc.element(parent)?;
    let c = doc.element(child)?;
    if child == doc.root() || c.parent.is_some() {
        return Err(GxlError::AlreadyAttached(child));
    }
    if doc.is_ancestor_or_self(child, parent) {
        return Err(GxlError::Cycle);
    }
    let rank = rules::child_rank(p.kind, c.kind).ok_or(GxlError::InvalidChild {
        parent: p.kind,
        child: c.kind,
    })?;

    check_siblings(doc, parent, child)?;
    check_complete(doc, child)?;
    check_composite(doc, parent, child)?;
    check_connectivity(doc, parent, child)?;
    if p.attached {
        check_attach(doc, parent, child)?;
    }

    let rank_of = |e: ElementId| {
        doc.kind(e)
            .and_then(|k| rules::child_rank(p.kind, k))
            .unwrap_or(u8::MAX)
    };
    let lower = p.children.iter().filter(|&&s| rank_of(s) < rank).count();
    let upper = p.children.iter().filter(|&&s| rank_of(s) <= rank).count();
    Ok(index.clamp(lower, upper))
}

/// Check that `child` may be detached from `parent`.
pub(crate) fn validate_remove(doc: &Document, parent: ElementId, child: ElementId) -> Result<()> {
    let p = doc.element(parent)?;
    let c = doc.element(child)?;
    if c.parent != Some(parent) {
        return Err(GxlError::NotAChild { child, parent });
    }
    if p.kind == ElementKind::Attr && c.kind.is_value() {
        return Err(GxlError::MissingValue);
    }
    Ok(())
}

/// Check setting (`Some`) or clearing (`None`) one attribute.
pub(crate) fn validate_attribute(
    doc: &Document,
    element: ElementId,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    let e = doc.element(element)?;
    let kind = e.kind;
    let rule = rules::attribute_rule(kind, name).ok_or_else(|| GxlError::DisallowedAttribute {
        kind,
        name: name.to_string(),
    })?;

    match value {
        None if rule.required => {
            return Err(GxlError::MissingAttribute {
                kind,
                name: name.to_string(),
            })
        }
        None => {}
        Some(v) => {
            if let Some(domain) = rule.domain {
                if !domain.contains(&v) {
                    return Err(GxlError::InvalidAttributeValue {
                        name: name.to_string(),
                        value: v.to_string(),
                        expected: domain.join("|"),
                    });
                }
            }
            if rules::is_order_attribute(name) && parse_order(Some(v)).is_none() {
                return Err(GxlError::InvalidOrder {
                    name: name.to_string(),
                    value: v.to_string(),
                });
            }
            if name == HREF {
                check_uri(v)?;
            }
        }
    }

    check_self_reference(doc, element, kind, name, value)?;
    check_flags(doc, element, kind, name, value)?;
    check_attr_rename(doc, element, kind, name, value)?;
    if e.attached {
        check_attached_attribute(doc, element, kind, name, value)?;
    }
    Ok(())
}

/// Sibling `<attr>`s keep pairwise-distinct names.
fn check_attr_rename(
    doc: &Document,
    element: ElementId,
    kind: ElementKind,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    if kind != ElementKind::Attr || name != NAME {
        return Ok(());
    }
    let (Some(parent), Some(v)) = (doc.parent(element), value) else {
        return Ok(());
    };
    match doc.attr(parent, v) {
        Some(other) if other != element => Err(GxlError::DuplicateAttrName(v.to_string())),
        _ => Ok(()),
    }
}

/// Check a new textual payload for an atomic value.
pub(crate) fn validate_value(doc: &Document, element: ElementId, text: &str) -> Result<()> {
    let kind = doc.element(element)?.kind;
    if !kind.is_atomic() {
        return Err(GxlError::WrongKind {
            expected: "an atomic value",
            found: kind,
        });
    }
    Value::parse_atomic(kind, text).map(|_| ())
}

/// Check swapping the value held by `attr` for `new_value`.
pub(crate) fn validate_replace_value(doc: &Document, attr: ElementId, new_value: ElementId) -> Result<()> {
    let a = doc.element(attr)?;
    if a.kind != ElementKind::Attr {
        return Err(GxlError::WrongKind {
            expected: "an <attr>",
            found: a.kind,
        });
    }
    let v = doc.element(new_value)?;
    if !v.kind.is_value() {
        return Err(GxlError::InvalidChild {
            parent: ElementKind::Attr,
            child: v.kind,
        });
    }
    if new_value == doc.root() || v.parent.is_some() {
        return Err(GxlError::AlreadyAttached(new_value));
    }
    if doc.value_of(attr).is_none() {
        return Err(GxlError::MissingValue);
    }
    check_complete(doc, new_value)
}

/// Check a document type identifier: the last path segment must name a
/// GXL 1.0 definition (`gxl-1.0.dtd`, `gxl-1.0.1.dtd`, ...).
pub(crate) fn validate_doctype(identifier: &str) -> Result<()> {
    let file = identifier.rsplit('/').next().unwrap_or(identifier);
    if DOCTYPE_RE.is_match(file) {
        Ok(())
    } else {
        Err(GxlError::UnsupportedDoctype(identifier.to_string()))
    }
}

/// Check that `href` is a URI reference (absolute or relative).
pub(crate) fn check_uri(href: &str) -> Result<()> {
    if URI_RE.is_match(href) {
        Ok(())
    } else {
        Err(GxlError::InvalidUri(href.to_string()))
    }
}

// --- insertion: shallow tier ---------------------------------------------------

/// At most one `<type>`, at most one value per `<attr>`, unique attr names.
fn check_siblings(doc: &Document, parent: ElementId, child: ElementId) -> Result<()> {
    let parent_kind = doc.element(parent)?.kind;
    let child_kind = doc.element(child)?.kind;
    let siblings = doc.children(parent);

    if child_kind == ElementKind::Type
        && siblings.iter().any(|&s| doc.kind(s) == Some(ElementKind::Type))
    {
        return Err(GxlError::DuplicateType(parent_kind));
    }
    if parent_kind == ElementKind::Attr
        && child_kind.is_value()
        && doc.value_of(parent).is_some()
    {
        return Err(GxlError::DuplicateValue);
    }
    if child_kind == ElementKind::Attr {
        if let Some(name) = doc.attribute(child, NAME) {
            if doc.attr(parent, name).is_some() {
                return Err(GxlError::DuplicateAttrName(name.to_string()));
            }
        }
    }
    Ok(())
}

/// Every element of the subtree carries its required attributes, every
/// `<attr>` holds a value, and no connection targets itself.
fn check_complete(doc: &Document, root: ElementId) -> Result<()> {
    for e in doc.subtree(root) {
        let el = doc.element(e)?;
        for rule in rules::attributes(el.kind).iter().filter(|r| r.required) {
            if el.attribute(rule.name).is_none() {
                return Err(GxlError::MissingAttribute {
                    kind: el.kind,
                    name: rule.name.to_string(),
                });
            }
        }
        match el.kind {
            ElementKind::Attr if doc.value_of(e).is_none() => return Err(GxlError::MissingValue),
            ElementKind::Edge => {
                if let Some(id) = el.attribute(ID) {
                    if el.attribute(rules::FROM) == Some(id) || el.attribute(rules::TO) == Some(id) {
                        return Err(GxlError::SelfReference(id.to_string()));
                    }
                }
            }
            ElementKind::Rel => {
                if let Some(id) = el.attribute(ID) {
                    if doc.relends(e).iter().any(|&r| doc.attribute(r, rules::TARGET) == Some(id)) {
                        return Err(GxlError::SelfReference(id.to_string()));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Members of a bag, set, or seq share one kind.
fn check_composite(doc: &Document, parent: ElementId, child: ElementId) -> Result<()> {
    let composite = doc.element(parent)?.kind;
    if !composite.is_composite() || composite == ElementKind::Tup {
        return Ok(());
    }
    let found = doc.element(child)?.kind;
    match doc.children(parent).first().and_then(|&m| doc.kind(m)) {
        Some(expected) if expected != found => Err(GxlError::HeterogeneousComposite {
            composite,
            expected,
            found,
        }),
        _ => Ok(()),
    }
}

/// Hypergraph flag, edge mode, relation-end directions, and relation-end
/// declaration orders.
fn check_connectivity(doc: &Document, parent: ElementId, child: ElementId) -> Result<()> {
    let parent_kind = doc.element(parent)?.kind;
    let child_kind = doc.element(child)?.kind;

    if parent_kind == ElementKind::Graph && child_kind.is_local_connection() {
        if child_kind == ElementKind::Rel && !doc.is_hypergraph(parent) {
            return Err(GxlError::HypergraphRequired);
        }
        if let Some(v) = doc.attribute(child, IS_DIRECTED) {
            check_mode(doc.edge_mode(parent), v == "true")?;
        }
        if child_kind == ElementKind::Rel && doc.directed_under(child, Some(parent)) {
            check_directions(doc, doc.relends(child).into_iter())?;
        }
    }

    if parent_kind == ElementKind::Rel && child_kind == ElementKind::Relend {
        let target = doc.attribute(child, rules::TARGET);
        if let Some(id) = doc.attribute(parent, ID) {
            if target == Some(id) {
                return Err(GxlError::SelfReference(id.to_string()));
            }
        }
        if let Some(order) = parse_order(doc.attribute(child, START_ORDER)) {
            check_start_order(doc, parent, child, order)?;
        }
        if doc.is_directed(parent) {
            check_directions(doc, std::iter::once(child))?;
        }
    }
    Ok(())
}

// --- insertion: document-wide tier -----------------------------------------------

/// Ids, orders, and connectivity of the subtree against the attached document.
fn check_attach(doc: &Document, parent: ElementId, child: ElementId) -> Result<()> {
    let subtree = doc.subtree(child);

    let mut new_ids: HashMap<&str, ElementId> = HashMap::new();
    for &e in &subtree {
        let el = doc.element(e)?;
        if !rules::has_id(el.kind) {
            continue;
        }
        if let Some(id) = el.attribute(ID) {
            if doc.element_by_id(id).is_some() || new_ids.insert(id, e).is_some() {
                return Err(GxlError::DuplicateId(id.to_string()));
            }
        }
    }

    let mut introduced = doc.owned_tentacles(&subtree);
    if doc.kind(child) == Some(ElementKind::Relend) && doc.kind(parent) == Some(ElementKind::Rel) {
        introduced.push(Tentacle::Relend(child));
    }
    let woken = doc
        .dangling_tentacles()
        .filter(|t| t.target_id(doc).is_some_and(|id| new_ids.contains_key(id)));

    let graft = Some((child, parent));
    let mut added: HashMap<ElementId, Vec<Tentacle>> = HashMap::new();
    for t in introduced.into_iter().chain(woken) {
        let Some(id) = t.target_id(doc) else {
            continue;
        };
        let Some(target) = new_ids.get(id).copied().or_else(|| doc.element_by_id(id)) else {
            continue;
        };
        check_target(doc, t, id, target, graft)?;
        added.entry(target).or_default().push(t);
    }
    for (target, tentacles) in added {
        check_orders(
            doc,
            target,
            doc.incidences(target)
                .iter()
                .map(|&t| (t, t.order(doc)))
                .chain(tentacles.into_iter().map(|t| (t, t.order(doc)))),
        )?;
    }
    Ok(())
}

// --- attributes ----------------------------------------------------------------

fn check_self_reference(
    doc: &Document,
    element: ElementId,
    kind: ElementKind,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    let Some(v) = value else {
        return Ok(());
    };
    let clash = match (kind, name) {
        (ElementKind::Edge, ID) => {
            doc.attribute(element, rules::FROM) == Some(v) || doc.attribute(element, rules::TO) == Some(v)
        }
        (ElementKind::Edge, rules::FROM | rules::TO) => doc.attribute(element, ID) == Some(v),
        (ElementKind::Rel, ID) => doc
            .relends(element)
            .iter()
            .any(|&r| doc.attribute(r, rules::TARGET) == Some(v)),
        (ElementKind::Relend, rules::TARGET) => doc
            .parent(element)
            .filter(|&p| doc.kind(p) == Some(ElementKind::Rel))
            .is_some_and(|rel| doc.attribute(rel, ID) == Some(v)),
        _ => false,
    };
    if clash {
        return Err(GxlError::SelfReference(v.to_string()));
    }
    Ok(())
}

/// Consistency between a graph's flags and the connections it contains.
fn check_flags(
    doc: &Document,
    element: ElementId,
    kind: ElementKind,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    let parent_graph = doc
        .parent(element)
        .filter(|&p| doc.kind(p) == Some(ElementKind::Graph));

    match (kind, name) {
        (ElementKind::Graph, HYPERGRAPH) if value != Some("true") => {
            if doc.children_of_kind(element, ElementKind::Rel).next().is_some() {
                let id = doc.attribute(element, ID).unwrap_or_default();
                return Err(GxlError::HypergraphInUse(id.to_string()));
            }
        }
        (ElementKind::Graph, EDGE_MODE) => {
            let mode: EdgeMode = value.and_then(|m| m.parse().ok()).unwrap_or_default();
            for c in doc.graph_elements(element) {
                if doc.kind(c) == Some(ElementKind::Node) {
                    continue;
                }
                let explicit = doc.attribute(c, IS_DIRECTED).map(|v| v == "true");
                if let Some(isdirected) = explicit {
                    check_mode(mode, isdirected)?;
                }
                if doc.kind(c) == Some(ElementKind::Rel)
                    && explicit.unwrap_or(mode.directed_by_default())
                {
                    check_directions(doc, doc.relends(c).into_iter())?;
                }
            }
        }
        (ElementKind::Edge | ElementKind::Rel, IS_DIRECTED) => {
            let explicit = value.map(|v| v == "true");
            if let (Some(g), Some(isdirected)) = (parent_graph, explicit) {
                check_mode(doc.edge_mode(g), isdirected)?;
            }
            let directed = explicit.unwrap_or_else(|| {
                parent_graph.is_some_and(|g| doc.edge_mode(g).directed_by_default())
            });
            if kind == ElementKind::Rel && directed {
                check_directions(doc, doc.relends(element).into_iter())?;
            }
        }
        (ElementKind::Relend, DIRECTION) => {
            let in_directed_rel = doc
                .parent(element)
                .filter(|&p| doc.kind(p) == Some(ElementKind::Rel))
                .is_some_and(|rel| doc.is_directed(rel));
            let direction: Direction = value.and_then(|d| d.parse().ok()).unwrap_or_default();
            if in_directed_rel && direction == Direction::None {
                let target = doc.attribute(element, rules::TARGET).unwrap_or_default();
                return Err(GxlError::MissingDirection(target.to_string()));
            }
        }
        (ElementKind::Relend, START_ORDER) => {
            let rel = doc
                .parent(element)
                .filter(|&p| doc.kind(p) == Some(ElementKind::Rel));
            if let (Some(rel), Some(order)) = (rel, parse_order(value)) {
                check_start_order(doc, rel, element, order)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Document-wide consequences of an attribute change on an attached element.
fn check_attached_attribute(
    doc: &Document,
    element: ElementId,
    kind: ElementKind,
    name: &str,
    value: Option<&str>,
) -> Result<()> {
    if name == ID && rules::has_id(kind) {
        if let Some(v) = value {
            if doc.element_by_id(v).is_some_and(|other| other != element) {
                return Err(GxlError::DuplicateId(v.to_string()));
            }
            let woken: Vec<Tentacle> = doc
                .dangling_tentacles()
                .filter(|t| t.target_id(doc) == Some(v))
                .collect();
            if !woken.is_empty() {
                for &t in &woken {
                    check_target(doc, t, v, element, None)?;
                }
                check_orders(
                    doc,
                    element,
                    doc.incidences(element)
                        .iter()
                        .chain(&woken)
                        .map(|&t| (t, t.order(doc))),
                )?;
            }
        }
    }

    let Some(t) = Tentacle::for_attribute(kind, element, name) else {
        return Ok(());
    };
    if t.connection(doc).is_none() {
        return Ok(());
    }
    let target_id = if name == t.target_attribute() {
        value
    } else {
        t.target_id(doc)
    };
    let order = if name == t.order_attribute() {
        parse_order(value)
    } else {
        t.order(doc)
    };
    let Some(id) = target_id else {
        return Ok(());
    };
    let Some(target) = doc.element_by_id(id) else {
        return Ok(());
    };
    check_target(doc, t, id, target, None)?;
    if let Some(o) = order {
        let others = doc
            .incidences(target)
            .iter()
            .filter(|&&other| other != t)
            .map(|&other| (other, other.order(doc)));
        check_orders(doc, target, others.chain(std::iter::once((t, Some(o)))))?;
    }
    Ok(())
}

// --- helpers -------------------------------------------------------------------

fn check_mode(mode: EdgeMode, isdirected: bool) -> Result<()> {
    if mode.permits(isdirected) {
        Ok(())
    } else {
        Err(GxlError::DirectionConflict {
            mode: mode.to_string(),
            isdirected,
        })
    }
}

/// Every relation end of a directed relation declares `in` or `out`.
fn check_directions(doc: &Document, relends: impl Iterator<Item = ElementId>) -> Result<()> {
    for r in relends {
        if doc.direction(r) == Direction::None {
            let target = doc.attribute(r, rules::TARGET).unwrap_or_default();
            return Err(GxlError::MissingDirection(target.to_string()));
        }
    }
    Ok(())
}

fn check_start_order(doc: &Document, rel: ElementId, relend: ElementId, order: i64) -> Result<()> {
    let taken = doc
        .relends(rel)
        .into_iter()
        .filter(|&r| r != relend)
        .any(|r| parse_order(doc.attribute(r, START_ORDER)) == Some(order));
    if taken {
        return Err(GxlError::DuplicateOrder {
            name: START_ORDER.to_string(),
            value: order,
            target: doc.attribute(rel, ID).unwrap_or("<rel>").to_string(),
        });
    }
    Ok(())
}

/// A tentacle's target is a graph element in the connection's top-level
/// graph. `graft` describes a pending insertion, if any.
fn check_target(
    doc: &Document,
    t: Tentacle,
    id: &str,
    target: ElementId,
    graft: Option<(ElementId, ElementId)>,
) -> Result<()> {
    if !doc.kind(target).is_some_and(ElementKind::is_graph_element) {
        return Err(GxlError::NotAGraphElement(id.to_string()));
    }
    let connection = match t {
        Tentacle::From(e) | Tentacle::To(e) => Some(e),
        Tentacle::Relend(r) => match graft {
            Some((child, parent)) if child == r => Some(parent),
            _ => doc.parent(r),
        },
    };
    let Some(connection) = connection else {
        return Ok(());
    };
    if doc.top_graph_with(connection, graft) != doc.top_graph_with(target, graft) {
        return Err(GxlError::CrossGraph(id.to_string()));
    }
    Ok(())
}

/// Incidence orders at one target are pairwise distinct.
fn check_orders(
    doc: &Document,
    target: ElementId,
    tentacles: impl Iterator<Item = (Tentacle, Option<i64>)>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for (t, order) in tentacles {
        let Some(o) = order else {
            continue;
        };
        if !seen.insert(o) {
            return Err(GxlError::DuplicateOrder {
                name: t.order_attribute().to_string(),
                value: o,
                target: doc.attribute(target, ID).unwrap_or_default().to_string(),
            });
        }
    }
    Ok(())
}

/// `gxl-1.0.dtd` or `gxl-1.0.<n>.dtd`
static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gxl-1\.0(\.[0-9]+)?\.dtd$").expect("invalid doctype regex"));

/// RFC 3986 URI reference: optional scheme, then unreserved, reserved, or
/// percent-encoded characters.
static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*:)?(?:[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=]|%[0-9A-Fa-f]{2})+$")
        .expect("invalid uri regex")
});

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn doc_with_graph() -> (Document, ElementId) {
        let mut doc = Document::new();
        let g = doc.new_graph("g");
        let root = doc.root();
        doc.append(root, g).unwrap();
        (doc, g)
    }

    fn add_node(doc: &mut Document, graph: ElementId, id: &str) -> ElementId {
        let n = doc.new_node(id);
        doc.append(graph, n).unwrap();
        n
    }

    #[test]
    fn invalid_child_kind() {
        let (mut doc, g) = doc_with_graph();
        let n = add_node(&mut doc, g, "a");
        let other = doc.new_node("b");
        let err = doc.insert(n, other, 0).unwrap_err();
        assert_eq!(
            err,
            GxlError::InvalidChild {
                parent: ElementKind::Node,
                child: ElementKind::Node
            }
        );
        assert_eq!(err.category(), ErrorCategory::Structure);
    }

    #[test]
    fn index_is_corrected_into_rank_group() {
        let (mut doc, g) = doc_with_graph();
        add_node(&mut doc, g, "a");
        let ty = doc.new_type("schema.gxl#Graph").unwrap();
        assert_eq!(doc.insert(g, ty, 5).unwrap(), 0);
        let v = doc.new_int(1);
        let attr = doc.new_attr("weight", v).unwrap();
        assert_eq!(doc.insert(g, attr, 0).unwrap(), 1);
        let n = doc.new_node("b");
        assert_eq!(doc.insert(g, n, 0).unwrap(), 2);
    }

    #[test]
    fn second_type_and_second_value_rejected() {
        let (mut doc, g) = doc_with_graph();
        let t1 = doc.new_type("a.gxl").unwrap();
        let t2 = doc.new_type("b.gxl").unwrap();
        doc.append(g, t1).unwrap();
        assert_eq!(doc.append(g, t2), Err(GxlError::DuplicateType(ElementKind::Graph)));

        let v = doc.new_int(1);
        let attr = doc.new_attr("x", v).unwrap();
        let w = doc.new_int(2);
        assert_eq!(doc.append(attr, w), Err(GxlError::DuplicateValue));
    }

    #[test]
    fn attr_without_value_rejected() {
        let (mut doc, g) = doc_with_graph();
        let attr = doc.create(ElementKind::Attr);
        doc.set_attribute(attr, "name", Some("x")).unwrap();
        assert_eq!(doc.append(g, attr), Err(GxlError::MissingValue));
    }

    #[test]
    fn cycle_rejected() {
        let mut doc = Document::new();
        let g = doc.new_graph("g");
        let n = doc.new_node("n");
        doc.append(g, n).unwrap();
        let inner = doc.new_graph("inner");
        doc.append(n, inner).unwrap();
        assert_eq!(doc.append(inner, g), Err(GxlError::Cycle));
    }

    #[test]
    fn attribute_rules() {
        let (mut doc, g) = doc_with_graph();
        let n = add_node(&mut doc, g, "a");
        assert!(matches!(
            doc.set_attribute(n, "from", Some("x")),
            Err(GxlError::DisallowedAttribute { .. })
        ));
        assert!(matches!(
            doc.set_attribute(n, "id", None),
            Err(GxlError::MissingAttribute { .. })
        ));
        assert!(matches!(
            doc.set_attribute(g, "edgemode", Some("sideways")),
            Err(GxlError::InvalidAttributeValue { .. })
        ));
    }

    #[test]
    fn attr_rename_keeps_names_distinct() {
        let (mut doc, g) = doc_with_graph();
        let n = add_node(&mut doc, g, "n");
        let v1 = doc.new_int(1);
        let x = doc.new_attr("x", v1).unwrap();
        let v2 = doc.new_int(2);
        let y = doc.new_attr("y", v2).unwrap();
        doc.append(n, x).unwrap();
        doc.append(n, y).unwrap();

        assert_eq!(
            doc.set_attribute(y, "name", Some("x")),
            Err(GxlError::DuplicateAttrName("x".into()))
        );
        assert_eq!(doc.attribute(y, "name"), Some("y"));
        doc.set_attribute(y, "name", Some("z")).unwrap();
        doc.set_attribute(x, "name", Some("x")).unwrap();

        let text = doc.write().unwrap();
        assert!(Document::parse(&text).is_ok());
    }

    #[test]
    fn order_must_be_integer() {
        let mut doc = Document::new();
        let e = doc.new_edge("a", "b");
        let err = doc.set_attribute(e, "fromorder", Some("first")).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Ordering);
    }

    #[test]
    fn uri_format() {
        assert!(check_uri("http://www.gupro.de/GXL/gxl-1.0.dtd").is_ok());
        assert!(check_uri("schema.gxl#Node").is_ok());
        assert!(check_uri("#local").is_ok());
        assert!(check_uri("a%20b").is_ok());
        assert!(check_uri("has space").is_err());
        assert!(check_uri("bad%zz").is_err());
        assert!(check_uri("").is_err());
    }

    #[test]
    fn doctype_versions() {
        assert!(validate_doctype("http://www.gupro.de/GXL/gxl-1.0.dtd").is_ok());
        assert!(validate_doctype("gxl-1.0.1.dtd").is_ok());
        assert!(validate_doctype("http://example.org/gxl-2.0.dtd").is_err());
        assert!(validate_doctype("gxl.dtd").is_err());
    }

    #[test]
    fn duplicate_id_rejected_on_attach() {
        let (mut doc, g) = doc_with_graph();
        add_node(&mut doc, g, "a");
        let dup = doc.new_node("a");
        assert_eq!(doc.append(g, dup), Err(GxlError::DuplicateId("a".into())));
    }

    #[test]
    fn duplicate_id_within_subtree_rejected() {
        let (mut doc, _) = doc_with_graph();
        let g2 = doc.new_graph("g2");
        let n1 = doc.new_node("x");
        let n2 = doc.new_node("x");
        doc.append(g2, n1).unwrap();
        doc.append(g2, n2).unwrap();
        let root = doc.root();
        assert_eq!(doc.append(root, g2), Err(GxlError::DuplicateId("x".into())));
    }

    #[test]
    fn edge_to_attr_is_not_a_graph_element() {
        let (mut doc, g) = doc_with_graph();
        let n = add_node(&mut doc, g, "a");
        let v = doc.new_int(1);
        let attr = doc.new_attr("w", v).unwrap();
        doc.set_attribute(attr, "id", Some("w1")).unwrap();
        doc.append(n, attr).unwrap();
        let e = doc.new_edge("a", "w1");
        assert_eq!(doc.append(g, e), Err(GxlError::NotAGraphElement("w1".into())));
    }

    #[test]
    fn cross_graph_edge_rejected() {
        let (mut doc, g) = doc_with_graph();
        add_node(&mut doc, g, "a");
        let h = doc.new_graph("h");
        let root = doc.root();
        doc.append(root, h).unwrap();
        add_node(&mut doc, h, "b");
        let e = doc.new_edge("a", "b");
        assert_eq!(doc.append(g, e), Err(GxlError::CrossGraph("b".into())));
    }

    #[test]
    fn rel_requires_hypergraph() {
        let (mut doc, g) = doc_with_graph();
        let rel = doc.new_rel();
        assert_eq!(doc.append(g, rel), Err(GxlError::HypergraphRequired));
        doc.set_attribute(g, "hypergraph", Some("true")).unwrap();
        doc.append(g, rel).unwrap();
        assert_eq!(
            doc.set_attribute(g, "hypergraph", Some("false")),
            Err(GxlError::HypergraphInUse("g".into()))
        );
    }

    #[test]
    fn edgemode_conflicts() {
        let (mut doc, g) = doc_with_graph();
        doc.set_attribute(g, "edgemode", Some("undirected")).unwrap();
        let e = doc.new_edge("a", "b");
        doc.set_attribute(e, "isdirected", Some("true")).unwrap();
        assert!(matches!(doc.append(g, e), Err(GxlError::DirectionConflict { .. })));
        doc.set_attribute(e, "isdirected", None).unwrap();
        doc.append(g, e).unwrap();
        assert!(matches!(
            doc.set_attribute(e, "isdirected", Some("true")),
            Err(GxlError::DirectionConflict { .. })
        ));
    }

    #[test]
    fn directed_rel_needs_relend_directions() {
        let (mut doc, g) = doc_with_graph();
        doc.set_attribute(g, "hypergraph", Some("true")).unwrap();
        doc.set_attribute(g, "edgemode", Some("undirected")).unwrap();
        add_node(&mut doc, g, "a");
        let rel = doc.new_rel();
        let end = doc.new_relend("a");
        doc.append(rel, end).unwrap();
        doc.append(g, rel).unwrap();
        assert_eq!(
            doc.set_attribute(g, "edgemode", Some("directed")),
            Err(GxlError::MissingDirection("a".into()))
        );
        doc.set_attribute(end, "direction", Some("in")).unwrap();
        doc.set_attribute(g, "edgemode", Some("directed")).unwrap();
        assert_eq!(
            doc.set_attribute(end, "direction", Some("none")),
            Err(GxlError::MissingDirection("a".into()))
        );
    }

    #[test]
    fn duplicate_start_order_rejected() {
        let mut doc = Document::new();
        let rel = doc.new_rel();
        let r1 = doc.new_relend("a");
        let r2 = doc.new_relend("b");
        doc.set_attribute(r1, "startorder", Some("1")).unwrap();
        doc.set_attribute(r2, "startorder", Some("1")).unwrap();
        doc.append(rel, r1).unwrap();
        assert!(matches!(doc.append(rel, r2), Err(GxlError::DuplicateOrder { .. })));
    }

    #[test]
    fn duplicate_incidence_order_rejected() {
        let (mut doc, g) = doc_with_graph();
        add_node(&mut doc, g, "a");
        add_node(&mut doc, g, "b");
        let e1 = doc.new_edge("a", "b");
        doc.set_attribute(e1, "toorder", Some("1")).unwrap();
        doc.append(g, e1).unwrap();
        let e2 = doc.new_edge("a", "b");
        doc.set_attribute(e2, "toorder", Some("1")).unwrap();
        assert!(matches!(doc.append(g, e2), Err(GxlError::DuplicateOrder { .. })));
        doc.set_attribute(e2, "toorder", Some("2")).unwrap();
        doc.append(g, e2).unwrap();
        assert!(matches!(
            doc.set_attribute(e2, "toorder", Some("1")),
            Err(GxlError::DuplicateOrder { .. })
        ));
    }

    #[test]
    fn removing_attr_value_rejected() {
        let mut doc = Document::new();
        let v = doc.new_int(1);
        let attr = doc.new_attr("w", v).unwrap();
        assert_eq!(doc.remove(attr, v), Err(GxlError::MissingValue));
    }

    #[test]
    fn failed_mutation_changes_nothing() {
        let (mut doc, g) = doc_with_graph();
        add_node(&mut doc, g, "a");
        let before = doc.history().entries().len();
        let dup = doc.new_node("a");
        assert!(doc.append(g, dup).is_err());
        assert_eq!(doc.children(g).len(), 1);
        assert_eq!(doc.parent(dup), None);
        assert_eq!(doc.history().entries().len(), before);
    }
}
