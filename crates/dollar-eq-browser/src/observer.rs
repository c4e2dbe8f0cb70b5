//! Forwarding document mutations to the event sink.

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MutationObserver, MutationObserverInit, Node};

use crate::{EventSink, HostEvent};

/// A connected `MutationObserver` plus the closure it calls.
///
/// The closure must outlive the observer, so both are kept together and
/// dropped after `disconnect`.
pub struct MutationWatch {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut()>,
}

impl MutationWatch {
    /// Observe every change under `target`: child lists, character data and
    /// attributes.
    pub fn observe(target: &Node, sink: EventSink) -> Result<Self, JsValue> {
        let callback = Closure::<dyn FnMut()>::new(move || sink(HostEvent::Mutation));
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;

        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        options.set_character_data(true);
        options.set_attributes(true);
        observer.observe_with_options(target, &options)?;

        tracing::trace!(target: "dollar_eq::observer", "mutation observer connected");
        Ok(Self {
            observer,
            _callback: callback,
        })
    }

    pub fn disconnect(self) {
        self.observer.disconnect();
        tracing::trace!(target: "dollar_eq::observer", "mutation observer disconnected");
    }
}
