use dom::KeySpace;
use html::DOM;

const PAGE: &str = "<!DOCTYPE html><html><head></head><body>\
    <svg id=\"viz\" width=\"600\" height=\"100\"><rect x=\"1\"></rect></svg>\
    <p>a &amp; b</p></body></html>";

fn parse(source: &str) -> DOM {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut keys = KeySpace::with_epoch(1);
    DOM::from_html(source, &mut keys).unwrap()
}

#[test]
fn parsed_page_has_the_surface() {
    let dom = parse(PAGE);
    let svg = dom.element_by_id("viz").unwrap();
    assert_eq!(dom.tag_of(svg), Some("svg"));
    assert_eq!(dom.attr(svg, "width"), Some("600"));
    assert_eq!(dom.attr(svg, "height"), Some("100"));

    let rects = dom.descendants_by_tag(svg, "rect");
    assert_eq!(rects.len(), 1);
    assert_eq!(dom.parent(rects[0]), Some(svg));

    let body = dom.descendants_by_tag(dom::NodeKey::ROOT, "body");
    assert_eq!(dom.parent(svg), body.first().copied());
}

#[test]
fn markup_round_trips_the_body() {
    let dom = parse(PAGE);
    assert_eq!(
        dom.to_markup(),
        "<html><head></head><body>\
         <svg id=\"viz\" width=\"600\" height=\"100\"><rect x=\"1\"></rect></svg>\
         <p>a &amp; b</p></body></html>"
    );
    let svg = dom.element_by_id("viz").unwrap();
    assert_eq!(
        dom.to_markup_of(svg),
        "<svg id=\"viz\" width=\"600\" height=\"100\"><rect x=\"1\"></rect></svg>"
    );
}

#[test]
fn json_snapshot_sorts_attributes() {
    let dom = parse(PAGE);
    let json = dom.to_json_value();
    assert_eq!(json["type"], "document");
    let html = &json["children"][0];
    assert_eq!(html["tag"], "html");
    let body = &html["children"][1];
    let svg = &body["children"][0];
    let keys: Vec<&String> = svg["attrs"].as_object().unwrap().keys().collect();
    assert_eq!(keys, ["height", "id", "width"]);
    assert_eq!(body["children"][1]["children"][0]["text"], "a & b");
    assert!(dom.to_json_string().contains("\"tag\": \"svg\""));
}

#[test]
fn debug_dump_is_indented() {
    let dom = parse("<html><body><p>hi</p></body></html>");
    let dump = format!("{dom:?}");
    assert!(dump.starts_with("DOM\n#document\n"), "{dump}");
    assert!(dump.contains("\n      <p>\n        \"hi\"\n      </p>\n"), "{dump}");
}

#[test]
fn comments_are_dropped() {
    let dom = parse("<html><body><!-- note --><svg id=\"viz\"></svg></body></html>");
    let svg = dom.element_by_id("viz").unwrap();
    let body = dom.parent(svg).unwrap();
    assert_eq!(dom.children(body), vec![svg]);
}

#[test]
fn misnested_nodes_stay_where_first_inserted() {
    let dom = parse("<html><body><b><p><svg id=\"viz\"></svg></b></p></body></html>");
    let svg = dom.element_by_id("viz").unwrap();
    let p = dom.parent(svg).unwrap();
    assert_eq!(dom.tag_of(p), Some("p"));
    let b = dom.parent(p).unwrap();
    assert_eq!(dom.tag_of(b), Some("b"));
}
