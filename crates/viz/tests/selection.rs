//! The selection and join layer on its own.

use dom::{DOMUpdate, KeySpace, NodeKey};
use html::DOM;
use viz::{Batch, Selection, Selector};

fn document() -> DOM {
    let mut keys = KeySpace::with_epoch(3);
    DOM::from_html(
        "<html><body><svg id=\"viz\"><rect></rect><g><rect></rect></g></svg></body></html>",
        &mut keys,
    )
    .unwrap()
}

#[test]
fn selector_grammar() {
    assert_eq!(
        Selector::parse("svg#viz").unwrap(),
        Selector { tag: Some("svg".into()), id: Some("viz".into()) }
    );
    assert_eq!(Selector::parse("#viz").unwrap(), Selector { tag: None, id: Some("viz".into()) });
    assert_eq!(Selector::parse("rect").unwrap(), Selector { tag: Some("rect".into()), id: None });
    assert_eq!(Selector::parse("*").unwrap(), Selector { tag: None, id: None });
    assert!(Selector::parse("").is_err());
    assert!(Selector::parse("svg#").is_err());
    assert!(Selector::parse("svg.viz").is_err());
    assert!("div > p".parse::<Selector>().is_err());
}

#[test]
fn select_all_finds_nested_descendants() {
    let document = document();
    let surface = Selection::select(&document, "svg#viz").unwrap();
    let rects = surface.select_all(&document, "rect");
    assert_eq!(rects.len(), 2);
    assert_eq!(rects.parent(), surface.nodes()[0]);
}

#[test]
fn join_partitions_by_position() {
    let document = document();
    let rects = Selection::select(&document, "svg#viz").unwrap().select_all(&document, "rect");

    let grow = rects.data(&[1, 2, 3, 4]);
    assert_eq!(grow.update().len(), 2);
    assert_eq!(grow.enter_indices(), vec![2, 3]);
    assert!(grow.exit().is_empty());

    let shrink = rects.data(&[9]);
    assert_eq!(shrink.update().keys(), vec![rects.nodes()[0]]);
    assert!(shrink.enter_indices().is_empty());
    assert_eq!(shrink.exit(), &rects.nodes()[1..]);
}

#[test]
fn batch_records_inserts_then_attributes_then_removals() {
    let document = document();
    let rects = Selection::select(&document, "#viz").unwrap().select_all(&document, "rect");
    let mut space = KeySpace::with_epoch(3);
    let _parser_shard = space.register_manager::<u64>();
    let mut keys = space.register_manager::<u64>();

    let join = rects.data(&["a", "b", "c"]);
    let mut batch = Batch::new(&mut keys);
    let entered = join.append_enter("rect", &mut batch);
    let merged = entered.merge(join.update());
    merged.attr("label", &mut batch, |datum, index| format!("{datum}{index}"));
    assert_eq!(join.remove_exit(&mut batch), 0);

    let updates = batch.into_updates();
    assert_eq!(updates.len(), 4);
    let DOMUpdate::InsertElement { parent, node: new_key, tag, .. } = &updates[0] else {
        panic!("expected insert first, got {:?}", updates[0]);
    };
    assert_eq!(*parent, rects.parent());
    assert_eq!(tag, "rect");
    assert_ne!(*new_key, NodeKey::ROOT);

    let labels: Vec<(NodeKey, String)> = updates[1..]
        .iter()
        .map(|update| match update {
            DOMUpdate::SetAttr { node, value, .. } => (*node, value.clone()),
            other => panic!("unexpected update {other:?}"),
        })
        .collect();
    assert_eq!(
        labels,
        vec![
            (rects.nodes()[0], "a0".to_owned()),
            (rects.nodes()[1], "b1".to_owned()),
            (*new_key, "c2".to_owned()),
        ]
    );
}

#[test]
fn missing_element_is_an_error() {
    let document = document();
    assert!(Selection::select(&document, "svg#nope").is_err());
    assert!(Selection::select(&document, "div#viz").is_err());
}
