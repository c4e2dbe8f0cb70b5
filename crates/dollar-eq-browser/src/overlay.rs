//! Status indicator and selection outline.
//!
//! Both are fixed-position elements appended to the document element,
//! created on first use and hidden rather than removed.

use wasm_bindgen::JsCast;
use web_sys::{DomRect, HtmlElement};

use dollar_eq_core::{Mode, Overlay};

use crate::dom::DomDocument;

const HUD_ID: &str = "eq-hud";
const BOX_ID: &str = "eq-box";
const Z_INDEX: &str = "2147483646";

const HUD_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("top", "8px"),
    ("right", "8px"),
    ("background", "rgba(20,20,20,0.9)"),
    ("color", "#fff"),
    ("font", "12px system-ui, sans-serif"),
    ("padding", "8px 10px"),
    ("border-radius", "8px"),
    ("z-index", Z_INDEX),
    ("pointer-events", "none"),
    ("box-shadow", "0 2px 12px rgba(0,0,0,0.3)"),
    ("max-width", "360px"),
    ("line-height", "1.4"),
];

const BOX_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("border", "2px solid #3fb950"),
    ("border-radius", "4px"),
    ("background", "transparent"),
    ("z-index", Z_INDEX),
    ("pointer-events", "none"),
];

impl DomDocument {
    /// The overlay element with `id`, created with `style` if missing.
    fn overlay_element(&self, id: &str, style: &[(&str, &str)]) -> Option<HtmlElement> {
        if let Some(existing) = self.document.get_element_by_id(id) {
            return existing.dyn_into().ok();
        }

        let element: HtmlElement = self.document.create_element("div").ok()?.dyn_into().ok()?;
        element.set_id(id);
        let css = element.style();
        for (name, value) in style {
            let _ = css.set_property(name, value);
        }
        self.document.document_element()?.append_child(&element).ok()?;
        Some(element)
    }

    fn hide(&self, id: &str) {
        if let Some(element) = self
            .document
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            let _ = element.style().set_property("display", "none");
        }
    }

    /// Bounding box of the first client rect of the current selection.
    fn selection_rect(&self) -> Option<DomRect> {
        let selection = self.window.get_selection().ok()??;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?;
        let rects = range.get_client_rects()?;
        rects.get(0)
    }
}

impl Overlay for DomDocument {
    fn show_status(&mut self, mode: Mode) {
        let Some(hud) = self.overlay_element(HUD_ID, HUD_STYLE) else {
            tracing::debug!(target: "dollar_eq::overlay", "could not create status indicator");
            return;
        };
        hud.set_inner_html(mode.status_text());
        let _ = hud.style().set_property("display", "block");
    }

    fn highlight_selection(&mut self) {
        let Some(outline) = self.overlay_element(BOX_ID, BOX_STYLE) else {
            return;
        };
        let css = outline.style();
        let Some(rect) = self.selection_rect() else {
            let _ = css.set_property("display", "none");
            return;
        };
        let _ = css.set_property("left", &format!("{}px", rect.left() - 2.0));
        let _ = css.set_property("top", &format!("{}px", rect.top() - 2.0));
        let _ = css.set_property("width", &format!("{}px", rect.width() + 4.0));
        let _ = css.set_property("height", &format!("{}px", rect.height() + 4.0));
        let _ = css.set_property("display", "block");
    }

    fn hide_highlight(&mut self) {
        self.hide(BOX_ID);
    }

    fn hide_overlays(&mut self) {
        self.hide(HUD_ID);
        self.hide(BOX_ID);
    }
}
