//! Rendering into parsed host pages.

use viz::{Page, RectRecord, VizConfig};

const HOST: &str = r#"<!DOCTYPE html>
<html>
  <head><title>bars</title></head>
  <body>
    <h1>Bars</h1>
    <svg id="viz" width="300" height="200">
      <rect width="1" height="1" x="0" y="0"></rect>
      <rect width="1" height="1" x="0" y="0"></rect>
      <rect width="1" height="1" x="0" y="0"></rect>
      <text x="5" y="5">label</text>
    </svg>
    <svg id="legend"><rect id="swatch"></rect></svg>
  </body>
</html>"#;

fn config() -> VizConfig {
    VizConfig::new(300.0, 200.0)
}

#[test]
fn existing_rects_are_reused_and_excess_removed() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut page = Page::from_html(HOST, config()).unwrap();
    let before = page.rect_keys().unwrap();
    assert_eq!(before.len(), 3);

    let summary = page.render(&[6.0, 1.0]).unwrap();
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.exited, 1);
    assert_eq!(summary.entered, 0);

    assert_eq!(page.rect_keys().unwrap(), before[..2].to_vec());
    assert_eq!(
        page.records().unwrap(),
        vec![RectRecord::for_datum(6.0, 0, 200.0), RectRecord::for_datum(1.0, 1, 200.0)]
    );
}

#[test]
fn unrelated_nodes_are_left_alone() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut page = Page::from_html(HOST, config()).unwrap();
    page.render(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

    let document = page.document();
    let legend = document.element_by_id("legend").unwrap();
    let swatch = document.element_by_id("swatch").unwrap();
    assert_eq!(document.parent(swatch), Some(legend));
    assert_eq!(document.attrs(swatch).unwrap().len(), 1);

    let markup = page.surface_markup().unwrap();
    assert!(markup.contains("<text x=\"5\" y=\"5\">label</text>"), "{markup}");
    assert!(page.to_markup().contains("<h1>Bars</h1>"));
    // Entered bars go to the end of the surface, after the label
    let surface = document.element_by_id("viz").unwrap();
    let last = *document.element_children(surface).last().unwrap();
    assert_eq!(document.tag_of(last), Some("rect"));
    assert_eq!(page.records().unwrap().len(), 5);
}

#[test]
fn missing_surface_is_an_error() {
    let _ = env_logger::builder().is_test(true).try_init();
    let source = r#"<html><body><svg id="other"></svg></body></html>"#;
    let mut page = Page::from_html(source, config()).unwrap();
    let err = page.render(&[1.0]).unwrap_err();
    assert!(err.to_string().contains("svg#viz"), "{err}");
}

#[test]
fn surface_must_have_the_right_tag() {
    let _ = env_logger::builder().is_test(true).try_init();
    let source = r#"<html><body><div id="viz"></div></body></html>"#;
    let mut page = Page::from_html(source, config()).unwrap();
    assert!(page.render(&[1.0]).is_err());
}

#[test]
fn custom_surface_selector() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = config().with_surface("svg#legend");
    let mut page = Page::from_html(HOST, config).unwrap();
    let swatch = page.document().element_by_id("swatch").unwrap();

    page.render(&[2.0, 2.0]).unwrap();
    let keys = page.rect_keys().unwrap();
    assert_eq!(keys[0], swatch);
    assert_eq!(page.document().attr(swatch, "id"), Some("swatch"));
    assert_eq!(page.document().attr(swatch, "fill"), Some("steelblue "));
    // The main surface is untouched
    let viz = page.document().element_by_id("viz").unwrap();
    assert_eq!(page.document().descendants_by_tag(viz, "rect").len(), 3);
}

#[test]
fn surface_is_found_past_other_elements_sharing_its_id() {
    let _ = env_logger::builder().is_test(true).try_init();
    for source in [
        r#"<html><body><svg id="viz"></svg><div id="viz"></div></body></html>"#,
        r#"<html><body><div id="viz"></div><svg id="viz"></svg></body></html>"#,
    ] {
        let mut page = Page::from_html(source, config()).unwrap();
        let summary = page.render(&[2.0]).unwrap();
        assert_eq!(summary.entered, 1, "{source}");

        let document = page.document();
        let rect = page.rect_keys().unwrap()[0];
        let surface = document.parent(rect).unwrap();
        assert_eq!(document.tag_of(surface), Some("svg"), "{source}");
        assert_eq!(document.elements_by_id("viz").len(), 2);
    }
}

#[test]
fn misnested_markup_still_renders_into_the_surface() {
    let _ = env_logger::builder().is_test(true).try_init();
    let source = r#"<html><body><b><p><svg id="viz"></svg></b></p></body></html>"#;
    let mut page = Page::from_html(source, config()).unwrap();
    page.render(&[2.0, 5.0]).unwrap();
    assert_eq!(
        page.records().unwrap(),
        vec![RectRecord::for_datum(2.0, 0, 200.0), RectRecord::for_datum(5.0, 1, 200.0)]
    );
    assert!(page.surface_markup().unwrap().starts_with("<svg id=\"viz\"><rect "));
}
