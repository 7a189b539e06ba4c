//! Reversible modifications.
//!
//! Every committed mutation is reified as a [`Change`]: a plain data value
//! recording the old and new state. The document applies a change and its
//! inverse with the same code path, so undo is "apply the inverse" and redo
//! is "apply the change again". The history is just a vector of changes
//! with a cursor.

use serde::{Deserialize, Serialize};

use crate::tentacle::Tentacle;
use crate::types::ElementId;

/// Attaching a child to, or detaching it from, a parent.
///
/// Exactly one of `old_parent`/`new_parent` is set: a move is a remove
/// followed by an insert, never a single change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeChange {
    pub child: ElementId,
    pub old_parent: Option<ElementId>,
    pub old_index: Option<usize>,
    pub new_parent: Option<ElementId>,
    pub new_index: Option<usize>,
}

impl TreeChange {
    pub fn insert(parent: ElementId, child: ElementId, index: usize) -> Self {
        Self {
            child,
            old_parent: None,
            old_index: None,
            new_parent: Some(parent),
            new_index: Some(index),
        }
    }

    pub fn remove(parent: ElementId, child: ElementId, index: usize) -> Self {
        Self {
            child,
            old_parent: Some(parent),
            old_index: Some(index),
            new_parent: None,
            new_index: None,
        }
    }

    /// The parent involved, whichever direction this change goes.
    pub fn parent(&self) -> Option<ElementId> {
        self.new_parent.or(self.old_parent)
    }

    pub fn is_insert(&self) -> bool {
        self.new_parent.is_some()
    }
}

/// Setting, replacing, or clearing one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub element: ElementId,
    pub name: String,
    pub old: Option<String>,
    pub new: Option<String>,
    /// Tentacles whose target was rewritten to follow an id rename.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retargeted: Vec<Tentacle>,
}

/// Changing the textual payload of an atomic value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueChange {
    pub element: ElementId,
    pub old: String,
    pub new: String,
}

/// Swapping the value held by an `<attr>`; may change the value's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrValueReplace {
    pub attr: ElementId,
    pub old_value: ElementId,
    pub new_value: ElementId,
}

/// One committed, reversible modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum Change {
    Tree(TreeChange),
    Attribute(AttributeChange),
    Value(ValueChange),
    AttrValue(AttrValueReplace),
}

impl Change {
    /// The change that undoes this one.
    pub fn inverse(&self) -> Change {
        match self {
            Change::Tree(t) => Change::Tree(TreeChange {
                child: t.child,
                old_parent: t.new_parent,
                old_index: t.new_index,
                new_parent: t.old_parent,
                new_index: t.old_index,
            }),
            Change::Attribute(a) => Change::Attribute(AttributeChange {
                element: a.element,
                name: a.name.clone(),
                old: a.new.clone(),
                new: a.old.clone(),
                retargeted: a.retargeted.clone(),
            }),
            Change::Value(v) => Change::Value(ValueChange {
                element: v.element,
                old: v.new.clone(),
                new: v.old.clone(),
            }),
            Change::AttrValue(r) => Change::AttrValue(AttrValueReplace {
                attr: r.attr,
                old_value: r.new_value,
                new_value: r.old_value,
            }),
        }
    }

    /// The element whose document membership decides whether the change is
    /// recorded: the parent for tree changes, the edited element otherwise.
    pub fn subject(&self) -> Option<ElementId> {
        match self {
            Change::Tree(t) => t.parent(),
            Change::Attribute(a) => Some(a.element),
            Change::Value(v) => Some(v.element),
            Change::AttrValue(r) => Some(r.attr),
        }
    }
}

/// Undo/redo log. Entries before `cursor` are applied; entries after it
/// are available for redo until a new change is recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<Change>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly executed change, discarding any redo tail.
    pub fn record(&mut self, change: Change) {
        self.entries.truncate(self.cursor);
        self.entries.push(change);
        self.cursor = self.entries.len();
    }

    /// The change an undo must apply, without moving the cursor.
    pub fn peek_undo(&self) -> Option<Change> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(Change::inverse)
    }

    /// The change a redo must apply, without moving the cursor.
    pub fn peek_redo(&self) -> Option<Change> {
        self.entries.get(self.cursor).cloned()
    }

    pub(crate) fn step_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub(crate) fn step_forward(&mut self) {
        self.cursor = (self.cursor + 1).min(self.entries.len());
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Every recorded change, applied or not.
    pub fn entries(&self) -> &[Change] {
        &self.entries
    }

    /// Number of currently applied changes.
    pub fn applied_len(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn attr_change(old: Option<&str>, new: Option<&str>) -> Change {
        Change::Attribute(AttributeChange {
            element: ElementId(1),
            name: "id".into(),
            old: old.map(Into::into),
            new: new.map(Into::into),
            retargeted: vec![Tentacle::To(ElementId(4))],
        })
    }

    #[test]
    fn tree_inverse_swaps_sides() {
        let ins = Change::Tree(TreeChange::insert(ElementId(0), ElementId(3), 2));
        let Change::Tree(inv) = ins.inverse() else {
            panic!("inverse of a tree change must be a tree change");
        };
        assert_eq!(inv, TreeChange::remove(ElementId(0), ElementId(3), 2));
        assert!(!inv.is_insert());
        assert_eq!(ins.inverse().inverse(), ins);
    }

    #[test]
    fn attribute_inverse_keeps_retargeted() {
        let c = attr_change(Some("a"), Some("b"));
        let Change::Attribute(inv) = c.inverse() else {
            panic!("inverse of an attribute change must be an attribute change");
        };
        assert_eq!(inv.old.as_deref(), Some("b"));
        assert_eq!(inv.new.as_deref(), Some("a"));
        assert_eq!(inv.retargeted, vec![Tentacle::To(ElementId(4))]);
    }

    #[test]
    fn history_cursor() {
        let mut h = History::new();
        assert!(!h.can_undo());
        h.record(attr_change(None, Some("a")));
        h.record(attr_change(Some("a"), Some("b")));
        assert_eq!(h.peek_undo(), Some(attr_change(Some("b"), Some("a"))));
        h.step_back();
        assert!(h.can_redo());
        assert_eq!(h.peek_redo(), Some(attr_change(Some("a"), Some("b"))));
        // recording after an undo drops the redo tail
        h.record(attr_change(Some("a"), Some("c")));
        assert!(!h.can_redo());
        assert_eq!(h.entries().len(), 2);
        assert_eq!(h.applied_len(), 2);
    }

    #[test]
    fn changes_serialize_as_plain_data() {
        let c = Change::Tree(TreeChange::insert(ElementId(0), ElementId(3), 1));
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"change\":\"tree\""));
        let back: Change = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
