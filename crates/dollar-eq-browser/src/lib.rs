//! Browser DOM host for dollar-eq.
//!
//! This crate implements the host traits of `dollar-eq-core` on top of the
//! live page through `web-sys`. It assumes a `wasm32-unknown-unknown`
//! target environment.
//!
//! # Architecture
//!
//! - `dom`: `DomDocument`, tree access and acknowledgment probes
//! - `editor`: selection edits, synthetic input and timers (`EditorHost`,
//!   `BlockHost`)
//! - `observer`: document mutation forwarding
//! - `overlay`: status indicator and selection outline
//! - `keys`: keyboard classification and synthetic key events
//! - `selectors`: CSS selectors for the host editor's markup
//!
//! # Re-exports
//!
//! This crate re-exports `dollar-eq-core` for convenience, so consumers
//! only need to depend on `dollar-eq-browser`.

use std::rc::Rc;

use wasm_bindgen::JsValue;

// Re-export core crate
pub use dollar_eq_core;
pub use dollar_eq_core::*;

pub mod dom;
pub mod editor;
pub mod keys;
pub mod observer;
pub mod overlay;
pub mod selectors;

pub use dom::DomDocument;
pub use keys::{KeyAction, KeyPress, is_mac, listen_keys};
pub use selectors::HostSelectors;

/// Something the page reported back to whoever drives the stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// A timer scheduled through `EditorHost::schedule` fired.
    Timer(Timer),
    /// The document changed while mutations were being watched.
    Mutation,
}

/// Callback receiving [`HostEvent`]s.
pub type EventSink = Rc<dyn Fn(HostEvent)>;

/// Wrap a JS exception as a host error.
pub(crate) fn js_err(context: &str, err: JsValue) -> HostError {
    HostError::Other(format!("{context}: {err:?}"))
}
