//! End-to-end behaviour of the GXL document model.
//!
//! Documents are built either from XML text or through the public mutation
//! API, then checked through the public query API only.
//!
//! # Coverage
//!
//! | Test | Behaviour |
//! |------|-----------|
//! | `round_trip_preserves_tree_and_doctype` | write(parse(text)) == text |
//! | `round_trip_all_value_kinds` | every value kind survives a round trip |
//! | `ids_are_unique_document_wide` | duplicate id across graphs rejected |
//! | `dangling_lifecycle` | dangling edge resolves when its target arrives |
//! | `incidence_order_is_stable` | orders 3, none, 1 read back as 1, 3, none |
//! | `relation_declaration_order` | relends listed by `startorder` |
//! | `undo_restores_exact_state` | execute + undo is the identity |
//! | `redo_reapplies` | undo + redo is the identity |
//! | `new_change_discards_redo_tail` | recording after undo drops redo |
//! | `undo_of_id_rename_restores_targets` | renamed targets follow and come back |
//! | `undo_rejected_after_conflicting_edit` | undo is validated like any edit |
//! | `undo_rejected_when_attribute_edited_while_detached` | stale attribute undo refused, id index intact |
//! | `undo_rejected_when_value_edited_while_detached` | stale value undo refused |
//! | `replace_value_changes_kind_and_undoes` | attr value replacement |
//! | `composite_homogeneity` | bag/set/seq homogeneous, tup exempt |
//! | `self_reference_rejected` | edge `to` equal to its own id |
//! | `hypergraph_and_edgemode` | flag and mode interplay |
//! | `listeners_in_registration_order` | notification order and removal |
//! | `listener_sees_committed_state` | listeners run after apply |
//! | `parse_applies_structural_validation` | invalid structure on read |
//! | `unsupported_version_rejected` | doctype version check |
//! | `nested_graphs_share_top_level_graph` | cross-graph rule across nesting |

use std::cell::RefCell;
use std::rc::Rc;

use gxl::{
    Change, Direction, Document, ElementKind, ErrorCategory, GxlError, Tentacle, Value,
};

const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE gxl SYSTEM "http://www.gupro.de/GXL/gxl-1.0.dtd">
<gxl xmlns:xlink="http://www.w3.org/1999/xlink">
  <graph id="g" hypergraph="true" edgemode="directed">
    <type xlink:href="schema.gxl#Program"/>
    <node id="a">
      <attr name="label">
        <string>main</string>
      </attr>
    </node>
    <node id="b"/>
    <edge id="e1" from="a" to="b" toorder="1"/>
    <rel id="r">
      <relend target="a" direction="out" startorder="2"/>
      <relend target="b" direction="in" startorder="1"/>
    </rel>
  </graph>
</gxl>
"#;

fn graph_doc() -> Document {
    let mut doc = Document::new();
    let g = doc.new_graph("g");
    let root = doc.root();
    doc.append(root, g).unwrap();
    doc
}

fn add_node(doc: &mut Document, id: &str) -> gxl::ElementId {
    let g = doc.element_by_id("g").unwrap();
    let n = doc.new_node(id);
    doc.append(g, n).unwrap();
    n
}

fn add_edge(doc: &mut Document, from: &str, to: &str) -> gxl::ElementId {
    let g = doc.element_by_id("g").unwrap();
    let e = doc.new_edge(from, to);
    doc.append(g, e).unwrap();
    e
}

#[test]
fn round_trip_preserves_tree_and_doctype() {
    let doc = Document::parse(SAMPLE).unwrap();
    assert_eq!(doc.write().unwrap(), SAMPLE);

    let custom = SAMPLE.replace(
        "http://www.gupro.de/GXL/gxl-1.0.dtd",
        "file:///opt/gxl/gxl-1.0.2.dtd",
    );
    let doc = Document::parse(&custom).unwrap();
    assert_eq!(doc.doctype(), "file:///opt/gxl/gxl-1.0.2.dtd");
    assert_eq!(doc.write().unwrap(), custom);
}

#[test]
fn round_trip_all_value_kinds() {
    let mut doc = graph_doc();
    let n = add_node(&mut doc, "n");
    let values = [
        Value::Bool(true),
        Value::Int(-7),
        Value::Float(2.5),
        Value::String("a < b".into()),
        Value::Enum("red".into()),
        Value::Locator("http://example.org/x#y".into()),
        Value::Bag(vec![Value::Int(1), Value::Int(1)]),
        Value::Set(vec![Value::String("s".into())]),
        Value::Seq(vec![Value::Float(0.5), Value::Float(1.5)]),
        Value::Tup(vec![Value::Int(1), Value::Bool(false)]),
    ];
    for (i, v) in values.iter().enumerate() {
        let value = doc.new_value(v).unwrap();
        let attr = doc.new_attr(&format!("v{i}"), value).unwrap();
        doc.append(n, attr).unwrap();
    }

    let back = Document::parse(&doc.write().unwrap()).unwrap();
    assert_eq!(back, doc);
    let n = back.element_by_id("n").unwrap();
    for (i, v) in values.iter().enumerate() {
        let attr = back.attr(n, &format!("v{i}")).unwrap();
        let held = back.value_of(attr).unwrap();
        assert_eq!(back.value(held).as_ref(), Some(v), "value v{i}");
    }
}

#[test]
fn ids_are_unique_document_wide() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    let h = doc.new_graph("h");
    let dup = doc.new_node("a");
    doc.append(h, dup).unwrap();
    let root = doc.root();
    let err = doc.append(root, h).unwrap_err();
    assert_eq!(err, GxlError::DuplicateId("a".into()));
    assert_eq!(err.category(), ErrorCategory::Identity);
    assert_eq!(doc.graphs(root).len(), 1);

    let g = doc.element_by_id("g").unwrap();
    assert_eq!(doc.set_attribute(g, "id", Some("a")), Err(GxlError::DuplicateId("a".into())));
}

#[test]
fn dangling_lifecycle() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    let e = add_edge(&mut doc, "a", "b");
    assert_eq!(doc.dangling_tentacles().collect::<Vec<_>>(), vec![Tentacle::To(e)]);
    assert!(doc.is_dangling(Tentacle::To(e)));
    assert!(matches!(doc.write(), Err(GxlError::DanglingTentacles(1))));

    let b = add_node(&mut doc, "b");
    assert_eq!(doc.dangling_count(), 0);
    assert_eq!(doc.connection_at(b, 0), Some(Tentacle::To(e)));
    assert_eq!(doc.resolve(Tentacle::To(e)), Some(b));
    assert!(doc.write().is_ok());
}

#[test]
fn incidence_order_is_stable() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    let n = add_node(&mut doc, "n");
    let g = doc.element_by_id("g").unwrap();
    let mut edges = Vec::new();
    for order in [Some("3"), None, Some("1")] {
        let e = doc.new_edge("a", "n");
        if let Some(o) = order {
            doc.set_attribute(e, "toorder", Some(o)).unwrap();
        }
        doc.append(g, e).unwrap();
        edges.push(e);
    }
    let seen: Vec<Option<i64>> = doc.incidences(n).iter().map(|t| t.order(&doc)).collect();
    assert_eq!(seen, vec![Some(1), Some(3), None]);
    assert_eq!(doc.connection_at(n, 0), Some(Tentacle::To(edges[2])));
    assert_eq!(doc.connection_at(n, 2), Some(Tentacle::To(edges[1])));
}

#[test]
fn relation_declaration_order() {
    let doc = Document::parse(SAMPLE).unwrap();
    let r = doc.element_by_id("r").unwrap();
    let targets: Vec<&str> = doc
        .tentacles(r)
        .into_iter()
        .map(|t| t.target_id(&doc).unwrap())
        .collect();
    assert_eq!(targets, vec!["b", "a"]);
    assert_eq!(doc.tentacle_count(r), 2);
    let first = doc.tentacle_at(r, 0).unwrap();
    assert_eq!(first.direction(&doc), Direction::In);

    let e1 = doc.element_by_id("e1").unwrap();
    assert_eq!(Tentacle::From(e1).direction(&doc), Direction::Out);
    assert_eq!(doc.tentacles(e1), vec![Tentacle::From(e1), Tentacle::To(e1)]);
}

#[test]
fn undo_restores_exact_state() {
    let mut doc = Document::parse(SAMPLE).unwrap();
    let before = doc.write().unwrap();
    let g = doc.element_by_id("g").unwrap();
    let a = doc.element_by_id("a").unwrap();

    let c = doc.new_node("c");
    doc.append(g, c).unwrap();
    let e = doc.new_edge("c", "a");
    doc.append(g, e).unwrap();
    doc.set_attribute(a, "id", Some("a2")).unwrap();
    doc.remove(g, c).unwrap();
    assert_eq!(doc.dangling_count(), 1);

    while doc.undo().unwrap() {}
    assert_eq!(doc.write().unwrap(), before);
    assert_eq!(doc.element_by_id("a"), Some(a));
    assert_eq!(doc.element_by_id("c"), None);
    assert_eq!(doc.dangling_count(), 0);
    assert_eq!(doc.connection_count(a), 2);
}

#[test]
fn redo_reapplies() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    let e = add_edge(&mut doc, "a", "a");
    let after = doc.write().unwrap();

    assert!(doc.undo().unwrap());
    assert_eq!(doc.dangling_count(), 0);
    assert!(doc.can_redo());
    assert!(doc.redo().unwrap());
    assert_eq!(doc.write().unwrap(), after);
    assert_eq!(doc.resolve(Tentacle::From(e)), doc.element_by_id("a"));
    assert!(!doc.redo().unwrap());
}

#[test]
fn new_change_discards_redo_tail() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    doc.undo().unwrap();
    assert!(doc.can_redo());
    add_node(&mut doc, "b");
    assert!(!doc.can_redo());
}

#[test]
fn undo_of_id_rename_restores_targets() {
    let mut doc = Document::parse(SAMPLE).unwrap();
    let b = doc.element_by_id("b").unwrap();
    let e1 = doc.element_by_id("e1").unwrap();

    doc.set_attribute(b, "id", Some("beta")).unwrap();
    assert_eq!(doc.attribute(e1, "to"), Some("beta"));
    assert_eq!(doc.connection_count(b), 2);
    let Some(Change::Attribute(change)) = doc.history().entries().last() else {
        panic!("expected an attribute change");
    };
    assert_eq!(change.retargeted.len(), 2);

    doc.undo().unwrap();
    assert_eq!(doc.attribute(e1, "to"), Some("b"));
    assert_eq!(doc.element_by_id("b"), Some(b));
    assert_eq!(doc.element_by_id("beta"), None);
    assert_eq!(doc.connection_count(b), 2);
    assert_eq!(doc.dangling_count(), 0);
}

#[test]
fn undo_rejected_after_conflicting_edit() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    let n = add_node(&mut doc, "n");
    let g = doc.element_by_id("g").unwrap();
    doc.remove(g, n).unwrap();
    // n is detached, so this edit is not recorded
    doc.set_attribute(n, "id", Some("a")).unwrap();

    let applied = doc.history().applied_len();
    assert_eq!(doc.undo(), Err(GxlError::DuplicateId("a".into())));
    assert_eq!(doc.history().applied_len(), applied);
    assert_eq!(doc.parent(n), None);
}

#[test]
fn undo_rejected_when_attribute_edited_while_detached() {
    let mut doc = graph_doc();
    let n = add_node(&mut doc, "a");
    let g = doc.element_by_id("g").unwrap();
    doc.set_attribute(n, "id", Some("b")).unwrap();
    doc.remove(g, n).unwrap();
    // n is detached, so this rename is not recorded
    doc.set_attribute(n, "id", Some("c")).unwrap();

    assert_eq!(doc.undo(), Ok(true));
    assert_eq!(doc.element_by_id("c"), Some(n));
    assert_eq!(doc.undo(), Err(GxlError::StaleChange(n)));
    assert_eq!(doc.attribute(n, "id"), Some("c"));
    assert_eq!(doc.element_by_id("c"), Some(n));
    assert_eq!(doc.element_by_id("a"), None);
    assert_eq!(doc.element_by_id("b"), None);

    // the id index still matches the tree
    doc.remove(g, n).unwrap();
    assert_eq!(doc.element_by_id("c"), None);
    let fresh = add_node(&mut doc, "c");
    assert_eq!(doc.element_by_id("c"), Some(fresh));
}

#[test]
fn undo_rejected_when_value_edited_while_detached() {
    let mut doc = Document::parse(SAMPLE).unwrap();
    let a = doc.element_by_id("a").unwrap();
    let attr = doc.attr(a, "label").unwrap();
    let value = doc.value_of(attr).unwrap();
    doc.set_value(value, "entry").unwrap();

    let new = doc.new_int(1);
    doc.replace_value(attr, new).unwrap();
    // the old value is detached now; edits to it are not recorded
    doc.set_value(value, "elsewhere").unwrap();
    doc.undo().unwrap();
    assert_eq!(doc.value_of(attr), Some(value));

    assert_eq!(doc.undo(), Err(GxlError::StaleChange(value)));
    assert_eq!(doc.text(value), Some("elsewhere"));
}

#[test]
fn replace_value_changes_kind_and_undoes() {
    let mut doc = Document::parse(SAMPLE).unwrap();
    let a = doc.element_by_id("a").unwrap();
    let attr = doc.attr(a, "label").unwrap();
    let old = doc.value_of(attr).unwrap();

    let new = doc.new_int(99);
    assert_eq!(doc.replace_value(attr, new).unwrap(), old);
    assert_eq!(doc.kind(doc.value_of(attr).unwrap()), Some(ElementKind::Int));
    assert!(!doc.is_attached(old));
    assert!(doc.is_attached(new));

    doc.undo().unwrap();
    assert_eq!(doc.value_of(attr), Some(old));
    assert_eq!(doc.text(old), Some("main"));
    assert!(!doc.is_attached(new));

    assert!(matches!(doc.replace_value(a, new), Err(GxlError::WrongKind { .. })));
    let g = doc.element_by_id("g").unwrap();
    assert!(matches!(doc.replace_value(attr, g), Err(GxlError::InvalidChild { .. })));
}

#[test]
fn composite_homogeneity() {
    let mut doc = Document::new();
    let set = doc.create(ElementKind::Set);
    let i = doc.new_int(1);
    let s = doc.new_string("x");
    doc.append(set, i).unwrap();
    let err = doc.append(set, s).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Value);

    let tup = doc.create(ElementKind::Tup);
    doc.append(tup, s).unwrap();
    let j = doc.new_int(2);
    doc.append(tup, j).unwrap();
    assert_eq!(doc.value_len(tup), 2);

    assert!(doc
        .new_value(&Value::Seq(vec![Value::Int(1), Value::Bool(true)]))
        .is_err());
}

#[test]
fn self_reference_rejected() {
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    let e = add_edge(&mut doc, "a", "a");
    doc.set_attribute(e, "id", Some("e")).unwrap();
    let err = doc.set_attribute(e, "to", Some("e")).unwrap_err();
    assert_eq!(err, GxlError::SelfReference("e".into()));
    assert_eq!(err.category(), ErrorCategory::Identity);
    assert_eq!(doc.attribute(e, "to"), Some("a"));
}

#[test]
fn hypergraph_and_edgemode() {
    let mut doc = graph_doc();
    let g = doc.element_by_id("g").unwrap();
    let rel = doc.new_rel();
    assert_eq!(doc.append(g, rel), Err(GxlError::HypergraphRequired));

    doc.set_attribute(g, "hypergraph", Some("true")).unwrap();
    doc.set_attribute(g, "edgemode", Some("defaultundirected")).unwrap();
    doc.append(g, rel).unwrap();
    assert!(!doc.is_directed(rel));
    assert!(doc.set_attribute(g, "hypergraph", None).is_err());

    let e = add_edge(&mut doc, "x", "y");
    doc.set_attribute(e, "isdirected", Some("true")).unwrap();
    assert!(doc.is_directed(e));
    let err = doc.set_attribute(g, "edgemode", Some("undirected")).unwrap_err();
    assert!(matches!(err, GxlError::DirectionConflict { isdirected: true, .. }));
}

#[test]
fn listeners_in_registration_order() {
    let log: Rc<RefCell<Vec<String>>> = Rc::default();
    let mut doc = graph_doc();

    let first = {
        let log = Rc::clone(&log);
        doc.add_listener(move |_: &Document, _: &Change| log.borrow_mut().push("first".into()))
    };
    {
        let log = Rc::clone(&log);
        doc.add_listener(move |_: &Document, change: &Change| {
            let what = match change {
                Change::Tree(t) if t.is_insert() => "insert",
                Change::Tree(_) => "remove",
                Change::Attribute(_) => "attribute",
                Change::Value(_) => "value",
                Change::AttrValue(_) => "replace",
            };
            log.borrow_mut().push(what.into());
        });
    }

    let n = add_node(&mut doc, "a");
    doc.set_attribute(n, "id", Some("b")).unwrap();
    assert_eq!(*log.borrow(), vec!["first", "insert", "first", "attribute"]);

    assert!(doc.remove_listener(first));
    assert!(!doc.remove_listener(first));
    doc.undo().unwrap();
    assert_eq!(log.borrow().last().map(String::as_str), Some("attribute"));
    assert_eq!(log.borrow().len(), 5);

    // detached edits are not reported
    let loose = doc.new_node("loose");
    doc.set_attribute(loose, "id", Some("free")).unwrap();
    assert_eq!(log.borrow().len(), 5);
}

#[test]
fn listener_sees_committed_state() {
    let seen: Rc<RefCell<Vec<usize>>> = Rc::default();
    let mut doc = graph_doc();
    add_node(&mut doc, "a");
    {
        let seen = Rc::clone(&seen);
        doc.add_listener(move |doc: &Document, _: &Change| {
            let a = doc.element_by_id("a").unwrap();
            seen.borrow_mut().push(doc.connection_count(a));
        });
    }
    add_edge(&mut doc, "a", "a");
    assert_eq!(*seen.borrow(), vec![2]);
}

#[test]
fn parse_applies_structural_validation() {
    let cases = [
        (
            r#"<gxl><graph id="g"><node id="a"/><node id="a"/></graph></gxl>"#,
            ErrorCategory::Identity,
        ),
        (
            r#"<gxl><graph id="g"><rel/></graph></gxl>"#,
            ErrorCategory::Structure,
        ),
        (
            r#"<gxl><graph id="g"><node/></graph></gxl>"#,
            ErrorCategory::Structure,
        ),
        (
            r#"<gxl><graph id="g"><node id="a"><attr name="x"><int>seven</int></attr></node></graph></gxl>"#,
            ErrorCategory::Value,
        ),
        (
            r#"<gxl><graph id="g"><type xlink:href="not a uri"/></graph></gxl>"#,
            ErrorCategory::Format,
        ),
        (
            r#"<gxl><graph id="g"><node id="a"/><edge from="a" to="a" fromorder="x"/></graph></gxl>"#,
            ErrorCategory::Ordering,
        ),
        (
            r#"<gxl><graph id="g" hypergraph="true"><node id="a"/><rel><relend target="a"/></rel></graph></gxl>"#,
            ErrorCategory::Connectivity,
        ),
        (r#"<gxl><graph id="g"></gxl>"#, ErrorCategory::Syntax),
    ];
    for (text, category) in cases {
        let err = Document::parse(text).unwrap_err();
        assert_eq!(err.category(), category, "{text}: {err}");
    }
}

#[test]
fn unsupported_version_rejected() {
    let text = SAMPLE.replace("gxl-1.0.dtd", "gxl-1.1.dtd");
    let err = Document::parse(&text).unwrap_err();
    assert_eq!(err, GxlError::UnsupportedDoctype("http://www.gupro.de/GXL/gxl-1.1.dtd".into()));
    let mut doc = Document::new();
    assert!(doc.set_doctype("gxl-1.1.dtd").is_err());
    assert!(doc.set_doctype("gxl-1.0.3.dtd").is_ok());
}

#[test]
fn nested_graphs_share_top_level_graph() {
    let mut doc = graph_doc();
    let a = add_node(&mut doc, "a");
    let inner = doc.new_graph("inner");
    let deep = doc.new_node("deep");
    doc.append(inner, deep).unwrap();
    doc.append(a, inner).unwrap();

    let g = doc.element_by_id("g").unwrap();
    assert_eq!(doc.top_level_graph(deep), Some(g));
    let e = add_edge(&mut doc, "a", "deep");
    assert_eq!(doc.resolve(Tentacle::To(e)), Some(deep));

    let h = doc.new_graph("h");
    let other = doc.new_node("other");
    doc.append(h, other).unwrap();
    let root = doc.root();
    doc.append(root, h).unwrap();
    let cross = doc.new_edge("deep", "other");
    assert_eq!(doc.append(g, cross), Err(GxlError::CrossGraph("other".into())));
}
