//! Editing the page the way a user would.
//!
//! Deletions and insertions go through `execCommand` so the host editor sees
//! real input; conversion requests are synthetic key presses of the host's
//! own shortcut. Scanner offsets are UTF-8 bytes, DOM offsets are UTF-16
//! code units, so every range is converted on the way in.

use std::future::Future;
use std::ops::Range;
use std::time::Duration;

use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, EventTarget, HtmlElement, InputEvent, InputEventInit, Node};

use dollar_eq_core::{BlockHost, EditorHost, HostError, Timer, utf16_offset};

use crate::dom::DomDocument;
use crate::keys::{convert_hotkey_event, enter_event, is_mac};
use crate::observer::MutationWatch;
use crate::{HostEvent, js_err};

fn millis(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis()).unwrap_or(u32::MAX)
}

impl DomDocument {
    /// Replace the selection with `range`.
    fn set_selection(&self, range: &web_sys::Range) -> Result<(), HostError> {
        let selection = self
            .window
            .get_selection()
            .map_err(|e| js_err("getSelection failed", e))?
            .ok_or(HostError::NoSelection)?;
        selection
            .remove_all_ranges()
            .map_err(|e| js_err("remove_all_ranges failed", e))?;
        selection
            .add_range(range)
            .map_err(|e| js_err("add_range failed", e))
    }

    fn current_range(&self) -> Result<web_sys::Range, HostError> {
        let selection = self
            .window
            .get_selection()
            .map_err(|e| js_err("getSelection failed", e))?
            .ok_or(HostError::NoSelection)?;
        if selection.range_count() == 0 {
            return Err(HostError::NoSelection);
        }
        selection
            .get_range_at(0)
            .map_err(|e| js_err("get_range_at failed", e))
    }

    /// The element that should receive synthetic key presses.
    ///
    /// The active element, looking through an open shadow root, or the
    /// first editable element when focus is elsewhere.
    fn key_target(&self) -> Option<Element> {
        let mut focused = self.document.active_element();
        if let Some(inner) = focused
            .as_ref()
            .and_then(|el| el.shadow_root())
            .and_then(|root| root.active_element())
        {
            focused = Some(inner);
        }
        if focused.as_ref().is_some_and(Self::is_editable) {
            return focused;
        }
        self.select_one(&self.selectors.editable).or(focused)
    }

    fn dispatch(&self, target: &EventTarget, event: &web_sys::Event) -> Result<(), HostError> {
        target
            .dispatch_event(event)
            .map(|_| ())
            .map_err(|e| js_err("dispatchEvent failed", e))
    }

    fn focus_element(node: &Node) -> Result<(), HostError> {
        node.dyn_ref::<HtmlElement>()
            .ok_or(HostError::Unfocusable)?
            .focus()
            .map_err(|e| js_err("focus failed", e))
    }
}

impl EditorHost for DomDocument {
    fn focus_editable(&mut self, leaf: &Node) -> bool {
        let mut current = leaf.parent_element();
        while let Some(element) = current {
            if Self::is_editable(&element) {
                return match Self::focus_element(&element) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!(target: "dollar_eq::editor", "{e}");
                        false
                    }
                };
            }
            current = element.parent_element();
        }
        false
    }

    fn select(&mut self, leaf: &Node, range: Range<usize>) -> Result<(), HostError> {
        if leaf.node_type() != Node::TEXT_NODE || !leaf.is_connected() {
            return Err(HostError::Detached);
        }
        let text = leaf.text_content().unwrap_or_default();
        if range.start > range.end
            || range.end > text.len()
            || !text.is_char_boundary(range.start)
            || !text.is_char_boundary(range.end)
        {
            return Err(HostError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: text.len(),
            });
        }

        let start = utf16_offset(&text, range.start) as u32;
        let end = utf16_offset(&text, range.end) as u32;
        let dom_range = self
            .document
            .create_range()
            .map_err(|e| js_err("create_range failed", e))?;
        dom_range
            .set_start(leaf, start)
            .map_err(|e| js_err("set_start failed", e))?;
        dom_range
            .set_end(leaf, end)
            .map_err(|e| js_err("set_end failed", e))?;
        self.set_selection(&dom_range)?;

        tracing::trace!(target: "dollar_eq::editor", start, end, "selected");
        Ok(())
    }

    fn delete_selection(&mut self) -> Result<(), HostError> {
        self.html_document()?
            .exec_command("delete")
            .map_err(|e| js_err("execCommand(delete) failed", e))?;

        // Editors that ignore execCommand still listen for input events.
        if let Some(active) = self.document.active_element() {
            let init = InputEventInit::new();
            init.set_bubbles(true);
            init.set_cancelable(true);
            init.set_input_type("deleteContent");
            let event = InputEvent::new_with_event_init_dict("input", &init)
                .map_err(|e| js_err("InputEvent failed", e))?;
            self.dispatch(&active, &event)?;
        }
        Ok(())
    }

    fn request_native_conversion(&mut self) -> Result<(), HostError> {
        let target = self
            .key_target()
            .ok_or_else(|| HostError::from("nothing to send the shortcut to"))?;
        let event = convert_hotkey_event(is_mac(&self.window.navigator()))
            .map_err(|e| js_err("KeyboardEvent failed", e))?;
        tracing::debug!(target: "dollar_eq::editor", tag = %target.tag_name(), "dispatching convert shortcut");
        self.dispatch(&target, &event)
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        let Some(sink) = self.sink.clone() else {
            tracing::trace!(target: "dollar_eq::editor", ?timer, "no event sink, timer dropped");
            return;
        };
        Timeout::new(millis(delay), move || sink(HostEvent::Timer(timer))).forget();
    }

    fn schedule_frame(&mut self, timer: Timer) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        let closure = Closure::once(move || sink(HostEvent::Timer(timer)));
        if let Err(e) = self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            tracing::warn!(target: "dollar_eq::editor", "request_animation_frame failed: {:?}", e);
            return;
        }
        closure.forget();
    }

    fn watch_mutations(&mut self, enabled: bool) {
        if !enabled {
            if let Some(watch) = self.watch.take() {
                watch.disconnect();
            }
            return;
        }
        if self.watch.is_some() {
            return;
        }
        let (Some(sink), Some(root)) = (self.sink.clone(), self.document.document_element()) else {
            return;
        };
        match MutationWatch::observe(&root, sink) {
            Ok(watch) => self.watch = Some(watch),
            Err(e) => tracing::warn!(target: "dollar_eq::editor", "MutationObserver failed: {:?}", e),
        }
    }
}

impl BlockHost for DomDocument {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> {
        TimeoutFuture::new(millis(delay))
    }

    fn focus_block(&mut self, block: &Node) -> Result<(), HostError> {
        Self::focus_element(block)
    }

    fn select_block_contents(&mut self, block: &Node) -> Result<(), HostError> {
        let range = self
            .document
            .create_range()
            .map_err(|e| js_err("create_range failed", e))?;
        range
            .select_node_contents(block)
            .map_err(|e| js_err("select_node_contents failed", e))?;
        self.set_selection(&range)
    }

    fn delete_contents(&mut self) -> Result<(), HostError> {
        self.current_range()?
            .delete_contents()
            .map_err(|e| js_err("delete_contents failed", e))
    }

    fn insert_text(&mut self, text: &str) -> Result<(), HostError> {
        self.html_document()?
            .exec_command_with_show_ui_and_value("insertText", false, text)
            .map(|_| ())
            .map_err(|e| js_err("execCommand(insertText) failed", e))
    }

    fn press_enter(&mut self, target: &Node) -> Result<(), HostError> {
        let event = enter_event().map_err(|e| js_err("KeyboardEvent failed", e))?;
        self.dispatch(target, &event)
    }

    fn equation_input(&self) -> Option<Node> {
        self.select_one(&self.selectors.dialog_input).map(Node::from)
    }

    fn focus_node(&mut self, node: &Node) -> Result<(), HostError> {
        Self::focus_element(node)
    }
}
