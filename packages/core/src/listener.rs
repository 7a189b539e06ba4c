//! Change notification.
//!
//! Listeners run synchronously, in registration order, after every committed
//! insertion, removal, attribute change, value change, and value replacement
//! (including the ones applied by undo and redo). A listener receives the
//! document by shared reference only, so it cannot start a nested mutation
//! of the document that is notifying it.

use crate::command::Change;
use crate::document::Document;

/// Observer of committed changes.
pub trait DocumentListener {
    fn changed(&mut self, doc: &Document, change: &Change);
}

impl<F> DocumentListener for F
where
    F: FnMut(&Document, &Change),
{
    fn changed(&mut self, doc: &Document, change: &Change) {
        self(doc, change)
    }
}

/// Handle returned by [`Document::add_listener`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
