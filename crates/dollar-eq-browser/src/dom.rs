//! The live page as a content tree.

use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlDocument, HtmlElement, Node, Window};

use dollar_eq_core::{AckProbe, ConfirmVia, ContentTree, HostError, NodeContext, label_matches};

use crate::observer::MutationWatch;
use crate::selectors::HostSelectors;
use crate::EventSink;

/// `NodeFilter.SHOW_TEXT`
const SHOW_TEXT: u32 = 0x4;

/// Handle on the page document, implementing every host trait the core
/// needs.
///
/// Timers and mutations are reported through the event sink. Without a
/// sink, scheduled timers are dropped; batch runs don't need one.
pub struct DomDocument {
    pub(crate) window: Window,
    pub(crate) document: Document,
    pub(crate) selectors: HostSelectors,
    pub(crate) confirm_label: String,
    pub(crate) sink: Option<EventSink>,
    pub(crate) watch: Option<MutationWatch>,
}

impl DomDocument {
    pub fn new(selectors: HostSelectors) -> Result<Self, HostError> {
        let window = web_sys::window().ok_or_else(|| HostError::from("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| HostError::from("no document"))?;
        Ok(Self {
            window,
            document,
            selectors,
            confirm_label: "done".to_string(),
            sink: None,
            watch: None,
        })
    }

    pub fn selectors(&self) -> &HostSelectors {
        &self.selectors
    }

    pub fn set_selectors(&mut self, selectors: HostSelectors) {
        self.selectors = selectors;
    }

    /// Label of the equation dialog's confirmation control.
    pub fn set_confirm_label(&mut self, label: impl Into<String>) {
        self.confirm_label = label.into();
    }

    pub fn set_event_sink(&mut self, sink: EventSink) {
        self.sink = Some(sink);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn html_document(&self) -> Result<&HtmlDocument, HostError> {
        self.document
            .dyn_ref::<HtmlDocument>()
            .ok_or_else(|| HostError::from("document is not an HTML document"))
    }

    /// Elements matching `selector` under `scope`. Invalid selectors are
    /// logged and match nothing.
    pub(crate) fn select_all(&self, scope: &Node, selector: &str) -> Vec<Node> {
        let list = if let Some(element) = scope.dyn_ref::<Element>() {
            element.query_selector_all(selector)
        } else if let Some(document) = scope.dyn_ref::<Document>() {
            document.query_selector_all(selector)
        } else {
            return Vec::new();
        };
        match list {
            Ok(list) => (0..list.length()).filter_map(|i| list.get(i)).collect(),
            Err(e) => {
                tracing::warn!(target: "dollar_eq::dom", selector, "querySelectorAll failed: {:?}", e);
                Vec::new()
            }
        }
    }

    pub(crate) fn select_one(&self, selector: &str) -> Option<Element> {
        self.document.query_selector(selector).ok().flatten()
    }

    /// The open equation dialog, found through its input.
    pub(crate) fn equation_dialog(&self) -> Option<Element> {
        self.select_one(&self.selectors.dialog_input)?
            .closest(&self.selectors.dialog)
            .ok()
            .flatten()
    }

    /// The dialog's confirmation control: label match first, then the
    /// button carrying the enter marker, then the first button.
    pub(crate) fn confirm_control(&self, dialog: &Element) -> Option<(HtmlElement, ConfirmVia)> {
        let buttons = self.select_all(dialog, &self.selectors.button);

        if let Some(button) = buttons.iter().find(|b| {
            label_matches(&b.text_content().unwrap_or_default(), &self.confirm_label)
        }) {
            return Some((button.clone().dyn_into().ok()?, ConfirmVia::Label));
        }

        let marked = format!("{} {}", self.selectors.button, self.selectors.enter_marker);
        let structural = dialog
            .query_selector(&marked)
            .ok()
            .flatten()
            .and_then(|marker| marker.closest(&self.selectors.button).ok().flatten())
            .map(Node::from)
            .or_else(|| buttons.into_iter().next())?;
        Some((structural.dyn_into().ok()?, ConfirmVia::Structural))
    }

    pub(crate) fn is_editable(element: &Element) -> bool {
        element.get_attribute("contenteditable").as_deref() == Some("true")
            || element
                .dyn_ref::<HtmlElement>()
                .is_some_and(|el| el.is_content_editable())
    }

    fn within(&self, element: &Element, selector: &str) -> bool {
        element.closest(selector).ok().flatten().is_some()
    }
}

impl ContentTree for DomDocument {
    type Node = Node;

    fn query_all(&self, selector: &str) -> Vec<Node> {
        self.select_all(&self.document, selector)
    }

    fn document_root(&self) -> Option<Node> {
        self.document.body().map(Node::from)
    }

    fn contains(&self, ancestor: &Node, node: &Node) -> bool {
        ancestor.contains(Some(node))
    }

    fn text_leaves(&self, root: &Node) -> Vec<Node> {
        let walker = match self.document.create_tree_walker_with_what_to_show(root, SHOW_TEXT) {
            Ok(walker) => walker,
            Err(e) => {
                tracing::warn!(target: "dollar_eq::dom", "create_tree_walker failed: {:?}", e);
                return Vec::new();
            }
        };
        let mut leaves = Vec::new();
        while let Ok(Some(node)) = walker.next_node() {
            leaves.push(node);
        }
        leaves
    }

    fn editable_blocks(&self, root: &Node) -> Vec<Node> {
        self.select_all(root, &self.selectors.editable)
    }

    fn text(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn parent_element(&self, node: &Node) -> Option<Node> {
        node.parent_element().map(Node::from)
    }

    fn context(&self, element: &Node) -> NodeContext {
        let Some(element) = element.dyn_ref::<Element>() else {
            return NodeContext::default();
        };
        NodeContext {
            editable: Self::is_editable(element),
            code: self.within(element, &self.selectors.code),
            math: self.within(element, &self.selectors.math),
        }
    }

    fn inline_equations(&self, block: &Node) -> Vec<Node> {
        self.select_all(block, &self.selectors.inline_equation)
    }

    fn text_outside_equations(&self, block: &Node) -> String {
        let Ok(copy) = block.clone_node_with_deep(true) else {
            return String::new();
        };
        for token in self.select_all(&copy, &self.selectors.inline_equation) {
            if let Some(token) = token.dyn_ref::<Element>() {
                token.remove();
            }
        }
        copy.text_content().unwrap_or_default()
    }

    fn equation_source(&self, token: &Node) -> Option<String> {
        let token = token.dyn_ref::<Element>()?;
        token
            .query_selector(&self.selectors.annotation)
            .ok()
            .flatten()?
            .text_content()
    }
}

impl AckProbe for DomDocument {
    fn equation_dialog_open(&self) -> bool {
        self.equation_dialog().is_some()
    }

    fn confirm_equation_dialog(&mut self) -> Result<Option<ConfirmVia>, HostError> {
        let Some(dialog) = self.equation_dialog() else {
            return Ok(None);
        };
        let Some((control, via)) = self.confirm_control(&dialog) else {
            return Ok(None);
        };
        control.click();
        Ok(Some(via))
    }

    fn selection_in_equation(&self) -> bool {
        let Some(anchor) = self
            .window
            .get_selection()
            .ok()
            .flatten()
            .and_then(|s| s.anchor_node())
        else {
            return false;
        };
        let element = if anchor.node_type() == Node::TEXT_NODE {
            anchor.parent_element()
        } else {
            anchor.dyn_into::<Element>().ok()
        };
        element.is_some_and(|el| self.within(&el, &self.selectors.math))
    }
}

impl Drop for DomDocument {
    fn drop(&mut self) {
        if let Some(watch) = self.watch.take() {
            watch.disconnect();
        }
    }
}
