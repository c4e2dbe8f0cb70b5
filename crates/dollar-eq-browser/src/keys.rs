//! Keyboard handling: classifying user keys and synthesizing host ones.

use gloo_events::{EventListener, EventListenerOptions, EventListenerPhase};
use smol_str::SmolStr;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, EventTarget, KeyboardEvent, KeyboardEventInit, Navigator};

/// What a key press asks the controller to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Stop the current run.
    Cancel,
    /// Go back to the previous location.
    Retreat,
}

/// The parts of a `keydown` the controller looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyPress {
    pub key: SmolStr,
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
    /// The event target is a plain text input.
    pub in_text_field: bool,
}

impl KeyPress {
    pub fn from_event(event: &KeyboardEvent) -> Self {
        let in_text_field = event
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .is_some_and(|el| matches!(el.tag_name().as_str(), "INPUT" | "TEXTAREA"));
        Self {
            key: SmolStr::new(event.key()),
            shift: event.shift_key(),
            ctrl: event.ctrl_key(),
            meta: event.meta_key(),
            alt: event.alt_key(),
            in_text_field,
        }
    }

    /// The host's own "convert to inline equation" shortcut:
    /// Cmd+Shift+E on Apple platforms, Ctrl+Shift+E elsewhere.
    pub fn is_convert_hotkey(&self, mac: bool) -> bool {
        let primary = if mac { self.meta } else { self.ctrl };
        self.key.as_str() == "E" && self.shift && primary && !self.alt
    }

    /// Map a key press to a controller action.
    ///
    /// The convert shortcut, including the one we dispatch ourselves, and
    /// keys typed into text fields are left alone.
    pub fn action(&self, mac: bool) -> Option<KeyAction> {
        if self.is_convert_hotkey(mac) || self.in_text_field {
            return None;
        }
        match self.key.as_str() {
            "Escape" => Some(KeyAction::Cancel),
            "b" | "B" if !self.ctrl && !self.meta && !self.alt => Some(KeyAction::Retreat),
            _ => None,
        }
    }
}

/// Whether the browser reports an Apple platform.
pub fn is_mac(navigator: &Navigator) -> bool {
    navigator
        .platform()
        .map(|p| ["Mac", "iPhone", "iPad"].iter().any(|m| p.contains(m)))
        .unwrap_or(false)
}

/// Listen for `keydown` on `target` in the capture phase.
///
/// The listener is removed when the returned handle is dropped.
pub fn listen_keys(
    target: &EventTarget,
    mut callback: impl FnMut(&KeyboardEvent) + 'static,
) -> EventListener {
    let options = EventListenerOptions {
        phase: EventListenerPhase::Capture,
        passive: false,
    };
    EventListener::new_with_options(target, "keydown", options, move |event| {
        if let Some(event) = event.dyn_ref::<KeyboardEvent>() {
            callback(event);
        }
    })
}

/// A bubbling, cancelable, composed `keydown`.
fn keydown(key: &str, code: &str, shift: bool, ctrl: bool, meta: bool) -> Result<KeyboardEvent, JsValue> {
    let init = KeyboardEventInit::new();
    init.set_key(key);
    init.set_code(code);
    init.set_shift_key(shift);
    init.set_ctrl_key(ctrl);
    init.set_meta_key(meta);
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_composed(true);
    KeyboardEvent::new_with_keyboard_event_init_dict("keydown", &init)
}

/// The host's convert shortcut for this platform.
pub fn convert_hotkey_event(mac: bool) -> Result<KeyboardEvent, JsValue> {
    keydown("E", "KeyE", true, !mac, mac)
}

pub fn enter_event() -> Result<KeyboardEvent, JsValue> {
    keydown("Enter", "Enter", false, false, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(key: &str) -> KeyPress {
        KeyPress {
            key: SmolStr::new(key),
            ..Default::default()
        }
    }

    #[test]
    fn test_convert_hotkey_per_platform() {
        let mac = KeyPress {
            shift: true,
            meta: true,
            ..press("E")
        };
        assert!(mac.is_convert_hotkey(true));
        assert!(!mac.is_convert_hotkey(false));

        let other = KeyPress {
            shift: true,
            ctrl: true,
            ..press("E")
        };
        assert!(other.is_convert_hotkey(false));
        assert!(!KeyPress { alt: true, ..other }.is_convert_hotkey(false));
    }

    #[test]
    fn test_key_actions() {
        assert_eq!(press("Escape").action(false), Some(KeyAction::Cancel));
        assert_eq!(press("b").action(false), Some(KeyAction::Retreat));
        assert_eq!(press("B").action(true), Some(KeyAction::Retreat));
        assert_eq!(
            KeyPress {
                ctrl: true,
                ..press("b")
            }
            .action(false),
            None
        );
        assert_eq!(press("n").action(false), None);
    }

    #[test]
    fn test_text_fields_ignored() {
        let typed = KeyPress {
            in_text_field: true,
            ..press("b")
        };
        assert_eq!(typed.action(false), None);
        let escape = KeyPress {
            in_text_field: true,
            ..press("Escape")
        };
        assert_eq!(escape.action(false), None);
    }
}
