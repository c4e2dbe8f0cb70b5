//! WASM browser tests for dollar-eq-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use dollar_eq_browser::{
    AckProbe, ContentTree, DomDocument, EditorHost, Granularity, HostSelectors, LocationHint,
    Overlay, collect_display_blocks, collect_inline, collect_inline_equation_blocks, live_span,
};
use web_sys::{Element, HtmlElement, Node};

const ROOTS: [&str; 1] = ["#fixture"];

/// Replace the test fixture with `html` and return a host over it.
fn fixture(html: &str) -> DomDocument {
    let document = web_sys::window().unwrap().document().unwrap();
    if let Some(old) = document.get_element_by_id("fixture") {
        old.remove();
    }
    let root = document.create_element("div").unwrap();
    root.set_id("fixture");
    root.set_inner_html(html);
    document.body().unwrap().append_child(&root).unwrap();
    DomDocument::new(HostSelectors::default()).unwrap()
}

fn by_id(id: &str) -> Element {
    web_sys::window()
        .unwrap()
        .document()
        .unwrap()
        .get_element_by_id(id)
        .unwrap()
}

// === Collection ===

#[wasm_bindgen_test]
fn test_collect_skips_code_math_and_readonly() {
    let host = fixture(
        r#"<div contenteditable="true" id="a">price $x$</div>
           <pre contenteditable="true">$code$</pre>
           <div class="notion-equation" contenteditable="true">$math$</div>
           <div>$readonly$</div>
           <div contenteditable="true" id="b">$y$ and $z$</div>"#,
    );

    let list = collect_inline(&host, &ROOTS, Granularity::PerBlock);
    let containers: Vec<Node> = list.iter().map(|l| l.container.clone()).collect();
    let expected: Vec<Node> = vec![by_id("a").into(), by_id("b").into()];
    assert_eq!(containers, expected);

    let spans = collect_inline(&host, &ROOTS, Granularity::PerSpan);
    assert_eq!(spans.len(), 3);
    assert!(matches!(&spans.get(2).unwrap().hint, LocationHint::Span { inner } if inner == "z"));
}

#[wasm_bindgen_test]
fn test_display_blocks() {
    let host = fixture(
        r#"<div contenteditable="true" id="eq"> $$\int f$$ </div>
           <div contenteditable="true">text $$x$$</div>"#,
    );
    let items = collect_display_blocks(&host, &ROOTS);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].block, Node::from(by_id("eq")));
    assert_eq!(items[0].equation, "\\int f");
}

#[wasm_bindgen_test]
fn test_inline_equation_blocks_read_annotation() {
    let host = fixture(
        r#"<div contenteditable="true" id="only"><span class="notion-text-equation-token"><span class="katex"><annotation>a^2</annotation>a2</span></span></div>
           <div contenteditable="true">see <span class="notion-text-equation-token"><annotation>b</annotation></span></div>"#,
    );
    let only = Node::from(by_id("only"));
    assert_eq!(host.text_outside_equations(&only).trim(), "");

    let items = collect_inline_equation_blocks(&host, &ROOTS);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].equation, "a^2");
}

// === Editing ===

#[wasm_bindgen_test]
fn test_select_uses_utf16_offsets() {
    let mut host = fixture(r#"<div contenteditable="true" id="u">é $x$</div>"#);
    let list = collect_inline(&host, &ROOTS, Granularity::PerBlock);
    let live = live_span(&host, list.get(0).unwrap()).unwrap();
    assert_eq!(live.span.open_offset, 3);

    host.select(&live.leaf, live.span.inner_range()).unwrap();
    let selection = web_sys::window().unwrap().get_selection().unwrap().unwrap();
    let range = selection.get_range_at(0).unwrap();
    assert_eq!(range.start_offset().unwrap(), 3);
    assert_eq!(range.end_offset().unwrap(), 4);
    assert_eq!(String::from(range.to_string()), "x");
}

#[wasm_bindgen_test]
fn test_select_rejects_bad_ranges() {
    let mut host = fixture(r#"<div contenteditable="true">é</div>"#);
    let leaf = host.text_leaves(&Node::from(by_id("fixture")))[0].clone();
    assert!(host.select(&leaf, 0..5).is_err());
    assert!(host.select(&leaf, 1..2).is_err());
    assert!(host.select(&leaf, 0..2).is_ok());
}

#[wasm_bindgen_test]
fn test_focus_editable_walks_up() {
    let mut host = fixture(r#"<div contenteditable="true" id="ed"><b>$x$</b></div>"#);
    let leaf = host.text_leaves(&Node::from(by_id("ed")))[0].clone();
    assert!(host.focus_editable(&leaf));

    let mut host = fixture(r#"<div><b>$x$</b></div>"#);
    let leaf = host.text_leaves(&Node::from(by_id("fixture")))[0].clone();
    assert!(!host.focus_editable(&leaf));
}

// === Acknowledgment probes ===

#[wasm_bindgen_test]
fn test_dialog_confirmed_by_label() {
    let mut host = fixture(
        r#"<div role="dialog">
             <div contenteditable="true" data-content-editable-leaf="true">x</div>
             <div role="button" id="cancel">Cancel</div>
             <div role="button" id="done"> Done </div>
           </div>"#,
    );
    let clicked = std::rc::Rc::new(std::cell::Cell::new(false));
    let flag = clicked.clone();
    let listener = gloo_events::EventListener::new(&by_id("done"), "click", move |_| flag.set(true));

    assert!(host.equation_dialog_open());
    assert_eq!(
        host.confirm_equation_dialog().unwrap(),
        Some(dollar_eq_browser::ConfirmVia::Label)
    );
    assert!(clicked.get());
    drop(listener);
}

#[wasm_bindgen_test]
fn test_dialog_structural_fallback() {
    let mut host = fixture(
        r#"<div role="dialog">
             <div contenteditable="true" data-content-editable-leaf="true">x</div>
             <div role="button">Close</div>
             <div role="button">OK <span class="enter">↵</span></div>
           </div>"#,
    );
    assert_eq!(
        host.confirm_equation_dialog().unwrap(),
        Some(dollar_eq_browser::ConfirmVia::Structural)
    );
}

#[wasm_bindgen_test]
fn test_no_dialog() {
    let mut host = fixture(r#"<div contenteditable="true">x</div>"#);
    assert!(!host.equation_dialog_open());
    assert_eq!(host.confirm_equation_dialog().unwrap(), None);
}

#[wasm_bindgen_test]
fn test_selection_in_equation() {
    let mut host = fixture(
        r#"<div contenteditable="true"><span class="notion-equation" id="eq">x</span> y</div>"#,
    );
    let eq = Node::from(by_id("eq"));
    let inside = host.text_leaves(&eq)[0].clone();
    host.select(&inside, 0..1).unwrap();
    assert!(host.selection_in_equation());

    let fixture_root = Node::from(by_id("fixture"));
    let outside = host.text_leaves(&fixture_root)[1].clone();
    host.select(&outside, 0..1).unwrap();
    assert!(!host.selection_in_equation());
}

// === Overlay ===

#[wasm_bindgen_test]
fn test_status_indicator() {
    let mut host = fixture("");
    host.show_status(dollar_eq_browser::Mode::Block);
    let hud: HtmlElement = by_id("eq-hud").dyn_into().unwrap();
    assert!(hud.inner_html().contains("Block Conversion"));
    assert_eq!(hud.style().get_property_value("display").unwrap(), "block");

    host.hide_overlays();
    assert_eq!(hud.style().get_property_value("display").unwrap(), "none");
}
