//! Tentacles: by-id references from a connection to a graph element.
//!
//! A tentacle is not stored anywhere; it is a view over the attributes of an
//! edge (`from`/`to` plus `fromorder`/`toorder`) or of a relation end
//! (`target` plus `endorder`). The [`Document`] keeps two derived structures
//! over them: each graph element's incidence list, and the set of tentacles
//! whose target does not currently resolve.

use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::rules;
use crate::types::{Direction, ElementId, ElementKind};

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tentacle {
    /// The `from` end of the edge.
    From(ElementId),
    /// The `to` end of the edge.
    To(ElementId),
    /// A relation end; the handle is the `<relend>` element itself.
    Relend(ElementId),
}

impl Tentacle {
    /// The element carrying this tentacle's attributes (edge or relend).
    pub fn holder(self) -> ElementId {
        match self {
            Tentacle::From(e) | Tentacle::To(e) | Tentacle::Relend(e) => e,
        }
    }

    /// Attribute naming the target id.
    pub fn target_attribute(self) -> &'static str {
        match self {
            Tentacle::From(_) => rules::FROM,
            Tentacle::To(_) => rules::TO,
            Tentacle::Relend(_) => rules::TARGET,
        }
    }

    /// Attribute holding the incidence order at the target.
    pub fn order_attribute(self) -> &'static str {
        match self {
            Tentacle::From(_) => rules::FROM_ORDER,
            Tentacle::To(_) => rules::TO_ORDER,
            Tentacle::Relend(_) => rules::END_ORDER,
        }
    }

    /// The tentacle a target or incidence-order attribute belongs to, if any.
    pub(crate) fn for_attribute(kind: ElementKind, holder: ElementId, name: &str) -> Option<Self> {
        match (kind, name) {
            (ElementKind::Edge, rules::FROM | rules::FROM_ORDER) => Some(Tentacle::From(holder)),
            (ElementKind::Edge, rules::TO | rules::TO_ORDER) => Some(Tentacle::To(holder)),
            (ElementKind::Relend, rules::TARGET | rules::END_ORDER) => Some(Tentacle::Relend(holder)),
            _ => None,
        }
    }

    /// The edge or relation owning this tentacle. `None` for a relation end
    /// that is not inside a relation.
    pub fn connection(self, doc: &Document) -> Option<ElementId> {
        match self {
            Tentacle::From(e) | Tentacle::To(e) => Some(e),
            Tentacle::Relend(r) => doc
                .parent(r)
                .filter(|p| doc.kind(*p) == Some(ElementKind::Rel)),
        }
    }

    /// The id this tentacle points at.
    pub fn target_id(self, doc: &Document) -> Option<&str> {
        doc.attribute(self.holder(), self.target_attribute())
    }

    /// Incidence order at the target, if one is declared.
    pub fn order(self, doc: &Document) -> Option<i64> {
        parse_order(doc.attribute(self.holder(), self.order_attribute()))
    }

    /// Direction relative to the connection. Edge ends follow the edge's
    /// effective direction (`from` is `out`, `to` is `in`); relation ends
    /// report their own `direction` attribute.
    pub fn direction(self, doc: &Document) -> Direction {
        match self {
            Tentacle::From(e) if doc.is_directed(e) => Direction::Out,
            Tentacle::To(e) if doc.is_directed(e) => Direction::In,
            Tentacle::From(_) | Tentacle::To(_) => Direction::None,
            Tentacle::Relend(r) => doc.direction(r),
        }
    }
}

pub(crate) fn parse_order(text: Option<&str>) -> Option<i64> {
    text.and_then(|t| t.trim().parse().ok())
}

/// Stable ordered insertion shared by incidence lists and relation-end
/// declaration lists.
///
/// An item with an order goes before the first existing item whose order is
/// absent or greater; unordered items, and items with no such successor, are
/// appended. Returns the position used.
pub(crate) fn insert_ordered<T: Copy>(
    list: &mut Vec<T>,
    item: T,
    order_of: impl Fn(T) -> Option<i64>,
) -> usize {
    let position = match order_of(item) {
        Some(order) => list
            .iter()
            .position(|&existing| order_of(existing).map_or(true, |o| o > order))
            .unwrap_or(list.len()),
        None => list.len(),
    };
    list.insert(position, item);
    position
}

// --- tests -------------------------------------------------------------------
