use std::collections::{BTreeSet, HashMap};

use tracing::{debug, trace};

use crate::command::{AttrValueReplace, AttributeChange, Change, History, TreeChange, ValueChange};
use crate::element::Element;
use crate::error::{GxlError, Result};
use crate::listener::{DocumentListener, ListenerId};
use crate::rules::{self, HREF, ID, IS_DIRECTED, NAME, START_ORDER};
use crate::tentacle::{insert_ordered, parse_order, Tentacle};
use crate::types::{Direction, EdgeMode, ElementId, ElementKind};
use crate::validation;
use crate::value::Value;

/// Identifier written when a document does not declare its own.
pub const DEFAULT_DOCTYPE: &str = "http://www.gupro.de/GXL/gxl-1.0.dtd";

/// A GXL document: one `<gxl>` root and every element created for it.
///
/// Elements live in an arena owned by the document and are addressed by
/// [`ElementId`]. New elements start detached; [`insert`](Self::insert)
/// attaches a subtree below a parent. While attached, elements with an `id`
/// are indexed document-wide and every tentacle is either resolved into its
/// target's incidence list or recorded as dangling.
///
/// Every mutating call validates first and changes nothing on error. A
/// successful call on an attached element is recorded for
/// [`undo`](Self::undo)/[`redo`](Self::redo) and reported to listeners;
/// edits of detached subtrees are neither recorded nor reported.
///
/// The document is a single-writer structure with no internal locking.
/// Share it across threads only behind your own synchronisation.
pub struct Document {
    elements: Vec<Element>,
    root: ElementId,
    ids: HashMap<String, ElementId>,
    resolved: HashMap<Tentacle, ElementId>,
    dangling: BTreeSet<Tentacle>,
    history: History,
    listeners: Vec<(ListenerId, Box<dyn DocumentListener>)>,
    next_listener: u64,
    doctype: String,
    public_id: Option<String>,
}

impl Document {
    /// An empty document: a bare `<gxl>` root and the default doctype.
    pub fn new() -> Self {
        let mut root = Element::new(ElementKind::Gxl);
        root.attached = true;
        Self {
            elements: vec![root],
            root: ElementId(0),
            ids: HashMap::new(),
            resolved: HashMap::new(),
            dangling: BTreeSet::new(),
            history: History::new(),
            listeners: Vec::new(),
            next_listener: 0,
            doctype: DEFAULT_DOCTYPE.to_string(),
            public_id: None,
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    /// The external-definition identifier declared by the document.
    pub fn doctype(&self) -> &str {
        &self.doctype
    }

    pub fn set_doctype(&mut self, identifier: &str) -> Result<()> {
        validation::validate_doctype(identifier)?;
        self.doctype = identifier.to_string();
        Ok(())
    }

    /// Public identifier of the DOCTYPE declaration, if one was given.
    pub fn public_id(&self) -> Option<&str> {
        self.public_id.as_deref()
    }

    pub fn set_public_id(&mut self, identifier: Option<&str>) {
        self.public_id = identifier.map(str::to_string);
    }

    /// Number of elements ever created for this document, attached or not.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    // --- element access ------------------------------------------------------

    pub(crate) fn slot(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.index())
    }

    pub(crate) fn element(&self, id: ElementId) -> Result<&Element> {
        self.slot(id).ok_or(GxlError::UnknownElement(id))
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.slot(id).is_some()
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.slot(id).map(|e| e.kind)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.slot(id).and_then(|e| e.parent)
    }

    /// Children in document order.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.slot(id).map_or(&[], |e| e.children.as_slice())
    }

    /// Whether the element is reachable from the root.
    pub fn is_attached(&self, id: ElementId) -> bool {
        self.slot(id).is_some_and(|e| e.attached)
    }

    /// Look up an attached element by its `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        self.ids.get(id).copied()
    }

    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        self.slot(id).and_then(|e| e.attribute(name))
    }

    /// All attributes of an element, ordered by name.
    pub fn attributes(&self, id: ElementId) -> impl Iterator<Item = (&str, &str)> {
        self.slot(id)
            .into_iter()
            .flat_map(|e| e.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// The element and everything below it, in document (pre-)order.
    pub(crate) fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Everything below an element, in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut all = self.subtree(id);
        all.remove(0);
        all
    }

    /// Children of one kind, in document order.
    pub fn children_of_kind(
        &self,
        id: ElementId,
        kind: ElementKind,
    ) -> impl Iterator<Item = ElementId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.kind(c) == Some(kind))
    }

    /// Graph children of the root, a graph element, or nothing else.
    pub fn graphs(&self, id: ElementId) -> Vec<ElementId> {
        self.children_of_kind(id, ElementKind::Graph).collect()
    }

    /// Nodes, edges, and relations directly inside a graph.
    pub fn graph_elements(&self, graph: ElementId) -> Vec<ElementId> {
        self.children(graph)
            .iter()
            .copied()
            .filter(|&c| self.kind(c).is_some_and(ElementKind::is_graph_element))
            .collect()
    }

    /// Relation ends of a relation, in document order. See
    /// [`tentacle_at`](Self::tentacle_at) for declaration order.
    pub fn relends(&self, rel: ElementId) -> Vec<ElementId> {
        self.children_of_kind(rel, ElementKind::Relend).collect()
    }

    /// The `<type>` child, if any.
    pub fn type_of(&self, id: ElementId) -> Option<ElementId> {
        self.children_of_kind(id, ElementKind::Type).next()
    }

    /// The `<attr>` children of an attributed element.
    pub fn attrs(&self, id: ElementId) -> Vec<ElementId> {
        self.children_of_kind(id, ElementKind::Attr).collect()
    }

    /// The `<attr>` child with the given `name`.
    pub fn attr(&self, id: ElementId, name: &str) -> Option<ElementId> {
        self.children_of_kind(id, ElementKind::Attr)
            .find(|&a| self.attribute(a, NAME) == Some(name))
    }

    /// The value held by an `<attr>`.
    pub fn value_of(&self, attr: ElementId) -> Option<ElementId> {
        if self.kind(attr) != Some(ElementKind::Attr) {
            return None;
        }
        self.children(attr)
            .iter()
            .copied()
            .find(|&c| self.kind(c).is_some_and(ElementKind::is_value))
    }

    /// The graph directly below the root that contains this element.
    pub fn top_level_graph(&self, id: ElementId) -> Option<ElementId> {
        self.top_graph_with(id, None)
    }

    /// [`top_level_graph`](Self::top_level_graph) as it would be if `graft`
    /// = `(child, parent)` were already inserted.
    pub(crate) fn top_graph_with(
        &self,
        start: ElementId,
        graft: Option<(ElementId, ElementId)>,
    ) -> Option<ElementId> {
        let mut current = start;
        loop {
            let parent = match graft {
                Some((child, parent)) if child == current => Some(parent),
                _ => self.parent(current),
            };
            match parent {
                None => return None,
                Some(p) if p == self.root => {
                    return (self.kind(current) == Some(ElementKind::Graph)).then_some(current)
                }
                Some(p) => current = p,
            }
        }
    }

    pub(crate) fn is_ancestor_or_self(&self, ancestor: ElementId, id: ElementId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    // --- graph and connection flags ------------------------------------------

    pub fn edge_mode(&self, graph: ElementId) -> EdgeMode {
        self.attribute(graph, rules::EDGE_MODE)
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    pub fn is_hypergraph(&self, graph: ElementId) -> bool {
        self.attribute(graph, rules::HYPERGRAPH) == Some("true")
    }

    pub fn has_edge_ids(&self, graph: ElementId) -> bool {
        self.attribute(graph, rules::EDGE_IDS) == Some("true")
    }

    /// Effective direction of an edge or relation: its own `isdirected`, or
    /// the default of its graph's edge mode.
    pub fn is_directed(&self, connection: ElementId) -> bool {
        self.directed_under(connection, self.parent(connection))
    }

    /// [`is_directed`](Self::is_directed) as it would be under `parent`.
    /// A connection outside any graph is undirected unless it says otherwise.
    pub(crate) fn directed_under(&self, connection: ElementId, parent: Option<ElementId>) -> bool {
        match self.attribute(connection, IS_DIRECTED) {
            Some(v) => v == "true",
            None => parent
                .filter(|&p| self.kind(p) == Some(ElementKind::Graph))
                .is_some_and(|g| self.edge_mode(g).directed_by_default()),
        }
    }

    /// Direction declared by a relation end.
    pub fn direction(&self, relend: ElementId) -> Direction {
        self.attribute(relend, rules::DIRECTION)
            .and_then(|d| d.parse().ok())
            .unwrap_or_default()
    }

    // --- tentacles -----------------------------------------------------------

    /// Tentacles of an edge or relation in declaration order: `from` then `to`
    /// for an edge, relation ends by `startorder` for a relation.
    pub fn tentacles(&self, connection: ElementId) -> Vec<Tentacle> {
        match self.slot(connection) {
            Some(e) if e.kind == ElementKind::Edge => {
                vec![Tentacle::From(connection), Tentacle::To(connection)]
            }
            Some(e) if e.kind == ElementKind::Rel => {
                e.declared.iter().map(|&r| Tentacle::Relend(r)).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn tentacle_count(&self, connection: ElementId) -> usize {
        match self.slot(connection) {
            Some(e) if e.kind == ElementKind::Edge => 2,
            Some(e) => e.declared.len(),
            None => 0,
        }
    }

    pub fn tentacle_at(&self, connection: ElementId, index: usize) -> Option<Tentacle> {
        self.tentacles(connection).get(index).copied()
    }

    /// Tentacles resolving to a graph element, in incidence order: ordered
    /// ones by ascending order, then unordered ones.
    pub fn incidences(&self, element: ElementId) -> &[Tentacle] {
        self.slot(element).map_or(&[], |e| e.incidences.as_slice())
    }

    pub fn connection_count(&self, element: ElementId) -> usize {
        self.incidences(element).len()
    }

    pub fn connection_at(&self, element: ElementId, index: usize) -> Option<Tentacle> {
        self.incidences(element).get(index).copied()
    }

    /// The graph element a tentacle currently resolves to.
    pub fn resolve(&self, tentacle: Tentacle) -> Option<ElementId> {
        self.resolved.get(&tentacle).copied()
    }

    /// A tentacle is dangling unless its connection is attached and its
    /// target id resolves.
    pub fn is_dangling(&self, tentacle: Tentacle) -> bool {
        self.resolve(tentacle).is_none()
    }

    /// Attached tentacles whose target does not resolve.
    pub fn dangling_tentacles(&self) -> impl Iterator<Item = Tentacle> + '_ {
        self.dangling.iter().copied()
    }

    pub fn dangling_count(&self) -> usize {
        self.dangling.len()
    }

    /// Tentacles owned by the connections in `elements`.
    pub(crate) fn owned_tentacles(&self, elements: &[ElementId]) -> Vec<Tentacle> {
        let mut out = Vec::new();
        for &e in elements {
            match self.kind(e) {
                Some(ElementKind::Edge) => {
                    out.push(Tentacle::From(e));
                    out.push(Tentacle::To(e));
                }
                Some(ElementKind::Relend)
                    if self.parent(e).and_then(|p| self.kind(p)) == Some(ElementKind::Rel) =>
                {
                    out.push(Tentacle::Relend(e))
                }
                _ => {}
            }
        }
        out
    }

    // --- values --------------------------------------------------------------

    /// Textual payload of an atomic value.
    pub fn text(&self, value: ElementId) -> Option<&str> {
        self.slot(value)
            .filter(|e| e.kind.is_atomic())
            .map(|e| e.text.as_str())
    }

    pub fn bool_value(&self, value: ElementId) -> Option<bool> {
        self.slot(value).and_then(|e| e.scalar.as_ref()?.as_bool())
    }

    pub fn int_value(&self, value: ElementId) -> Option<i64> {
        self.slot(value).and_then(|e| e.scalar.as_ref()?.as_int())
    }

    pub fn float_value(&self, value: ElementId) -> Option<f64> {
        self.slot(value).and_then(|e| e.scalar.as_ref()?.as_float())
    }

    /// Detached snapshot of a value element.
    pub fn value(&self, id: ElementId) -> Option<Value> {
        let e = self.slot(id)?;
        let members = || {
            e.children
                .iter()
                .filter_map(|&c| self.value(c))
                .collect::<Vec<_>>()
        };
        match e.kind {
            k if k.is_atomic() => e.scalar.clone(),
            ElementKind::Locator => Some(Value::Locator(e.attribute(HREF)?.to_string())),
            ElementKind::Bag => Some(Value::Bag(members())),
            ElementKind::Set => Some(Value::Set(members())),
            ElementKind::Seq => Some(Value::Seq(members())),
            ElementKind::Tup => Some(Value::Tup(members())),
            _ => None,
        }
    }

    /// Number of members of a composite value.
    pub fn value_len(&self, composite: ElementId) -> usize {
        match self.kind(composite) {
            Some(k) if k.is_composite() => self.children(composite).len(),
            _ => 0,
        }
    }

    pub fn value_at(&self, composite: ElementId, index: usize) -> Option<ElementId> {
        match self.kind(composite) {
            Some(k) if k.is_composite() => self.children(composite).get(index).copied(),
            _ => None,
        }
    }

    /// Multiplicity of `member` in a bag. `None` if `bag` is not a bag.
    pub fn cardinal(&self, bag: ElementId, member: ElementId) -> Option<usize> {
        if self.kind(bag) != Some(ElementKind::Bag) {
            return None;
        }
        let bag = self.value(bag)?;
        let member = self.value(member)?;
        Some(bag.cardinal(&member))
    }

    /// Value equality with bag, set, and sequence semantics.
    pub fn values_equal(&self, a: ElementId, b: ElementId) -> bool {
        match (self.value(a), self.value(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    // --- construction --------------------------------------------------------

    /// Create a detached, empty element.
    pub fn create(&mut self, kind: ElementKind) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(Element::new(kind));
        id
    }

    fn create_with(&mut self, kind: ElementKind, attributes: &[(&str, &str)]) -> ElementId {
        let id = self.create(kind);
        for (name, value) in attributes {
            self.elements[id.index()].set_attribute(name, Some(value));
        }
        id
    }

    pub fn new_graph(&mut self, id: &str) -> ElementId {
        self.create_with(ElementKind::Graph, &[(ID, id)])
    }

    pub fn new_node(&mut self, id: &str) -> ElementId {
        self.create_with(ElementKind::Node, &[(ID, id)])
    }

    pub fn new_edge(&mut self, from: &str, to: &str) -> ElementId {
        self.create_with(ElementKind::Edge, &[(rules::FROM, from), (rules::TO, to)])
    }

    pub fn new_rel(&mut self) -> ElementId {
        self.create(ElementKind::Rel)
    }

    pub fn new_relend(&mut self, target: &str) -> ElementId {
        self.create_with(ElementKind::Relend, &[(rules::TARGET, target)])
    }

    /// A named attribute holding `value` (a detached value element).
    pub fn new_attr(&mut self, name: &str, value: ElementId) -> Result<ElementId> {
        let attr = self.create_with(ElementKind::Attr, &[(NAME, name)]);
        self.insert(attr, value, usize::MAX)?;
        Ok(attr)
    }

    pub fn new_type(&mut self, href: &str) -> Result<ElementId> {
        validation::check_uri(href)?;
        Ok(self.create_with(ElementKind::Type, &[(HREF, href)]))
    }

    pub fn new_locator(&mut self, href: &str) -> Result<ElementId> {
        validation::check_uri(href)?;
        Ok(self.create_with(ElementKind::Locator, &[(HREF, href)]))
    }

    fn create_atomic(&mut self, value: Value) -> ElementId {
        let id = self.create(value.kind());
        let e = &mut self.elements[id.index()];
        e.text = value.text().unwrap_or_default();
        e.scalar = Some(value);
        id
    }

    pub fn new_bool(&mut self, value: bool) -> ElementId {
        self.create_atomic(Value::Bool(value))
    }

    pub fn new_int(&mut self, value: i64) -> ElementId {
        self.create_atomic(Value::Int(value))
    }

    pub fn new_float(&mut self, value: f64) -> ElementId {
        self.create_atomic(Value::Float(value))
    }

    pub fn new_string(&mut self, value: &str) -> ElementId {
        self.create_atomic(Value::String(value.to_string()))
    }

    pub fn new_enum(&mut self, value: &str) -> ElementId {
        self.create_atomic(Value::Enum(value.to_string()))
    }

    /// Build a detached element tree for a [`Value`].
    pub fn new_value(&mut self, value: &Value) -> Result<ElementId> {
        match value {
            Value::Locator(href) => self.new_locator(href),
            Value::Bag(m) | Value::Set(m) | Value::Seq(m) | Value::Tup(m) => {
                let members = m
                    .iter()
                    .map(|v| self.new_value(v))
                    .collect::<Result<Vec<_>>>()?;
                self.new_composite(value.kind(), &members)
            }
            atomic => Ok(self.create_atomic(atomic.clone())),
        }
    }

    /// A composite of the given kind holding the detached `members`.
    pub fn new_composite(&mut self, kind: ElementKind, members: &[ElementId]) -> Result<ElementId> {
        if !kind.is_composite() {
            return Err(GxlError::WrongKind {
                expected: "a composite value kind",
                found: kind,
            });
        }
        let composite = self.create(kind);
        for &m in members {
            self.insert(composite, m, usize::MAX)?;
        }
        Ok(composite)
    }

    // --- mutation ------------------------------------------------------------

    /// Attach the detached `child` below `parent`.
    ///
    /// `index` is corrected into the range its kind may occupy (a `type`
    /// before `attr`s, `attr`s before content); the index actually used is
    /// returned.
    pub fn insert(&mut self, parent: ElementId, child: ElementId, index: usize) -> Result<usize> {
        let index = validation::validate_insert(self, parent, child, index)?;
        self.execute(Change::Tree(TreeChange::insert(parent, child, index)));
        Ok(index)
    }

    /// Insert as the last child the ordering rules allow.
    pub fn append(&mut self, parent: ElementId, child: ElementId) -> Result<usize> {
        self.insert(parent, child, usize::MAX)
    }

    /// Detach `child` from `parent`; returns the index it occupied.
    pub fn remove(&mut self, parent: ElementId, child: ElementId) -> Result<usize> {
        validation::validate_remove(self, parent, child)?;
        let index = self
            .element(parent)?
            .position(child)
            .ok_or(GxlError::NotAChild { child, parent })?;
        self.execute(Change::Tree(TreeChange::remove(parent, child, index)));
        Ok(index)
    }

    /// Set (`Some`) or clear (`None`) an attribute.
    ///
    /// Renaming the id of an attached graph element rewrites the target of
    /// every tentacle currently incident on it, so connections follow.
    pub fn set_attribute(&mut self, element: ElementId, name: &str, value: Option<&str>) -> Result<()> {
        validation::validate_attribute(self, element, name, value)?;
        let e = self.element(element)?;
        let old = e.attribute(name).map(str::to_string);
        if old.as_deref() == value {
            return Ok(());
        }
        let retargeted = if name == ID && value.is_some() && e.attached && e.kind.is_graph_element() {
            e.incidences.clone()
        } else {
            Vec::new()
        };
        self.execute(Change::Attribute(AttributeChange {
            element,
            name: name.to_string(),
            old,
            new: value.map(str::to_string),
            retargeted,
        }));
        Ok(())
    }

    /// Replace the payload of an atomic value.
    pub fn set_value(&mut self, element: ElementId, text: &str) -> Result<()> {
        validation::validate_value(self, element, text)?;
        let old = self.element(element)?.text.clone();
        if old == text {
            return Ok(());
        }
        self.execute(Change::Value(ValueChange {
            element,
            old,
            new: text.to_string(),
        }));
        Ok(())
    }

    /// Swap the value held by an `<attr>` for the detached `new_value`,
    /// possibly of another kind. Returns the now-detached old value.
    pub fn replace_value(&mut self, attr: ElementId, new_value: ElementId) -> Result<ElementId> {
        validation::validate_replace_value(self, attr, new_value)?;
        let old_value = self.value_of(attr).ok_or(GxlError::MissingValue)?;
        self.execute(Change::AttrValue(AttrValueReplace {
            attr,
            old_value,
            new_value,
        }));
        Ok(old_value)
    }

    // --- history -------------------------------------------------------------

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Revert the most recent applied change. Returns `false` if there is
    /// nothing to undo.
    ///
    /// The inverse is validated like any other mutation, so an undo that
    /// conflicts with untracked edits made since is rejected.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(change) = self.history.peek_undo() else {
            return Ok(false);
        };
        self.check(&change)?;
        self.history.step_back();
        debug!(?change, "undo");
        self.apply(&change);
        self.notify(&change);
        Ok(true)
    }

    /// Re-apply the most recently undone change.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(change) = self.history.peek_redo() else {
            return Ok(false);
        };
        self.check(&change)?;
        self.history.step_forward();
        debug!(?change, "redo");
        self.apply(&change);
        self.notify(&change);
        Ok(true)
    }

    fn check(&self, change: &Change) -> Result<()> {
        match change {
            Change::Tree(t) => match (t.old_parent, t.new_parent) {
                (None, Some(parent)) => validation::validate_insert(
                    self,
                    parent,
                    t.child,
                    t.new_index.unwrap_or(usize::MAX),
                )
                .map(|_| ()),
                (Some(parent), None) => validation::validate_remove(self, parent, t.child),
                _ => Err(GxlError::NotAChild {
                    child: t.child,
                    parent: self.root,
                }),
            },
            Change::Attribute(a) => {
                if self.attribute(a.element, &a.name) != a.old.as_deref() {
                    return Err(GxlError::StaleChange(a.element));
                }
                validation::validate_attribute(self, a.element, &a.name, a.new.as_deref())
            }
            Change::Value(v) => {
                if self.element(v.element)?.text != v.old {
                    return Err(GxlError::StaleChange(v.element));
                }
                validation::validate_value(self, v.element, &v.new)
            }
            Change::AttrValue(r) => {
                if self.value_of(r.attr) != Some(r.old_value) {
                    return Err(GxlError::StaleChange(r.attr));
                }
                validation::validate_replace_value(self, r.attr, r.new_value)
            }
        }
    }

    // --- listeners -----------------------------------------------------------

    /// Register a listener; it is called after every recorded change.
    pub fn add_listener(&mut self, listener: impl DocumentListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    fn notify(&mut self, change: &Change) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener.changed(self, change);
        }
        self.listeners = listeners;
    }

    // --- applying changes ----------------------------------------------------

    fn execute(&mut self, change: Change) {
        let tracked = change.subject().is_some_and(|s| self.is_attached(s));
        self.apply(&change);
        if tracked {
            debug!(?change, "change committed");
            self.history.record(change.clone());
            self.notify(&change);
        }
    }

    fn apply(&mut self, change: &Change) {
        match change {
            Change::Tree(t) => match (t.old_parent, t.new_parent) {
                (None, Some(parent)) => {
                    self.attach_child(parent, t.child, t.new_index.unwrap_or(usize::MAX))
                }
                (Some(parent), None) => self.detach_child(parent, t.child),
                _ => {}
            },
            Change::Attribute(a) => self.apply_attribute(a),
            Change::Value(v) => {
                let e = &mut self.elements[v.element.index()];
                e.scalar = Value::parse_atomic(e.kind, &v.new).ok();
                e.text = v.new.clone();
            }
            Change::AttrValue(r) => self.swap_value(r),
        }
    }

    fn attach_child(&mut self, parent: ElementId, child: ElementId, index: usize) {
        let siblings = &mut self.elements[parent.index()].children;
        siblings.insert(index.min(siblings.len()), child);
        self.elements[child.index()].parent = Some(parent);
        if self.kind(parent) == Some(ElementKind::Rel) && self.kind(child) == Some(ElementKind::Relend) {
            self.declare_relend(parent, child);
        }
        if !self.is_attached(parent) {
            return;
        }

        let subtree = self.subtree(child);
        for &id in &subtree {
            let e = &mut self.elements[id.index()];
            e.attached = true;
            if rules::has_id(e.kind) {
                if let Some(key) = e.attribute(ID) {
                    self.ids.insert(key.to_string(), id);
                }
            }
        }
        self.resolve_dangling();
        for t in self.owned_tentacles(&subtree) {
            self.link(t);
        }
    }

    fn detach_child(&mut self, parent: ElementId, child: ElementId) {
        if self.is_attached(parent) {
            let subtree = self.subtree(child);
            for t in self.owned_tentacles(&subtree) {
                self.unlink(t);
            }
            for &id in &subtree {
                let incoming = std::mem::take(&mut self.elements[id.index()].incidences);
                for t in incoming {
                    trace!(?t, "tentacle target detached");
                    self.resolved.remove(&t);
                    self.dangling.insert(t);
                }
            }
            for &id in &subtree {
                let e = &mut self.elements[id.index()];
                e.attached = false;
                if let Some(key) = e.attribute(ID) {
                    if self.ids.get(key) == Some(&id) {
                        self.ids.remove(key);
                    }
                }
            }
        }

        let p = &mut self.elements[parent.index()];
        p.children.retain(|&c| c != child);
        p.declared.retain(|&r| r != child);
        self.elements[child.index()].parent = None;
    }

    fn apply_attribute(&mut self, a: &AttributeChange) {
        let el = a.element;
        let kind = self.elements[el.index()].kind;
        let attached = self.is_attached(el);
        let keyed = attached && a.name == ID && rules::has_id(kind);

        let tentacle = Tentacle::for_attribute(kind, el, &a.name)
            .filter(|t| attached && t.connection(self).is_some());
        if let Some(t) = tentacle {
            self.unlink(t);
        }
        if keyed {
            if let Some(current) = self.elements[el.index()].attribute(ID) {
                if self.ids.get(current) == Some(&el) {
                    self.ids.remove(current);
                }
            }
        }

        self.elements[el.index()].set_attribute(&a.name, a.new.as_deref());

        if a.name == START_ORDER && kind == ElementKind::Relend {
            if let Some(rel) = self.parent(el).filter(|&p| self.kind(p) == Some(ElementKind::Rel)) {
                self.elements[rel.index()].declared.retain(|&r| r != el);
                self.declare_relend(rel, el);
            }
        }

        if keyed {
            if let Some(new) = &a.new {
                self.ids.insert(new.clone(), el);
                for &t in &a.retargeted {
                    self.elements[t.holder().index()].set_attribute(t.target_attribute(), Some(new.as_str()));
                }
            }
            if kind.is_graph_element() {
                let stale: Vec<Tentacle> = self.elements[el.index()]
                    .incidences
                    .iter()
                    .copied()
                    .filter(|t| t.target_id(self) != a.new.as_deref())
                    .collect();
                for t in stale {
                    self.unlink(t);
                    self.link(t);
                }
            }
            self.resolve_dangling();
        }

        if let Some(t) = tentacle {
            self.link(t);
        }
    }

    fn swap_value(&mut self, r: &AttrValueReplace) {
        let attr = &mut self.elements[r.attr.index()];
        match attr.position(r.old_value) {
            Some(i) => attr.children[i] = r.new_value,
            None => attr.children.push(r.new_value),
        }
        let attached = attr.attached;
        self.elements[r.old_value.index()].parent = None;
        self.elements[r.new_value.index()].parent = Some(r.attr);
        for id in self.subtree(r.old_value) {
            self.elements[id.index()].attached = false;
        }
        for id in self.subtree(r.new_value) {
            self.elements[id.index()].attached = attached;
        }
    }

    // --- derived-state maintenance ---------------------------------------------

    fn declare_relend(&mut self, rel: ElementId, relend: ElementId) {
        let mut declared = std::mem::take(&mut self.elements[rel.index()].declared);
        insert_ordered(&mut declared, relend, |r| {
            parse_order(self.elements[r.index()].attribute(START_ORDER))
        });
        self.elements[rel.index()].declared = declared;
    }

    /// Resolve a tentacle of an attached connection into its target's
    /// incidence list, or record it as dangling.
    fn link(&mut self, t: Tentacle) {
        let target = t
            .target_id(self)
            .and_then(|id| self.ids.get(id))
            .copied()
            .filter(|&e| self.elements[e.index()].kind.is_graph_element());
        match target {
            Some(target) => {
                let mut incidences = std::mem::take(&mut self.elements[target.index()].incidences);
                insert_ordered(&mut incidences, t, |x| x.order(self));
                self.elements[target.index()].incidences = incidences;
                self.resolved.insert(t, target);
                trace!(?t, %target, "tentacle resolved");
            }
            None => {
                trace!(?t, "tentacle dangling");
                self.dangling.insert(t);
            }
        }
    }

    fn unlink(&mut self, t: Tentacle) {
        match self.resolved.remove(&t) {
            Some(target) => self.elements[target.index()].incidences.retain(|&x| x != t),
            None => {
                self.dangling.remove(&t);
            }
        }
    }

    fn resolve_dangling(&mut self) {
        let ready: Vec<Tentacle> = self
            .dangling
            .iter()
            .copied()
            .filter(|t| {
                t.target_id(self)
                    .and_then(|id| self.ids.get(id))
                    .is_some_and(|e| self.elements[e.index()].kind.is_graph_element())
            })
            .collect();
        for t in ready {
            self.dangling.remove(&t);
            self.link(t);
        }
    }

    // --- comparison ----------------------------------------------------------

    fn same_tree(&self, a: ElementId, other: &Document, b: ElementId) -> bool {
        let (Some(x), Some(y)) = (self.slot(a), other.slot(b)) else {
            return false;
        };
        x.kind == y.kind
            && x.attributes == y.attributes
            && (!x.kind.is_atomic() || x.text == y.text)
            && x.children.len() == y.children.len()
            && x.children
                .iter()
                .zip(&y.children)
                .all(|(&c, &d)| self.same_tree(c, other, d))
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Documents are equal when their DOCTYPE identifiers match and their attached trees
/// have the same shape, attributes, and payloads.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.doctype == other.doctype
            && self.public_id == other.public_id
            && self.same_tree(self.root, other, other.root)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("doctype", &self.doctype)
            .field("public_id", &self.public_id)
            .field("elements", &self.elements.len())
            .field("ids", &self.ids.len())
            .field("dangling", &self.dangling)
            .field("history", &self.history.applied_len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// --- tests -------------------------------------------------------------------
