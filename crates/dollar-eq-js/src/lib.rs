//! WASM entry points for the dollar-eq page script.
//!
//! The extension's content script loads this module and calls one of the
//! `run*` functions (or `dispatchMessage` with the message tag it received).
//! Everything else happens inside the page: see `controller`.

mod controller;
mod settings;

pub use settings::Settings;

use std::cell::RefCell;
use std::rc::Rc;

use gloo_storage::{LocalStorage, Storage};
use wasm_bindgen::prelude::*;

use dollar_eq_browser::Mode;

use crate::controller::Controller;

/// Storage key of the last mode the user picked.
const LAST_MODE_KEY: &str = "lastMode";

thread_local! {
    static CONTROLLER: RefCell<Option<Rc<RefCell<Controller>>>> = const { RefCell::new(None) };
}

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
    {
        use tracing::Level;
        use tracing::subscriber::set_global_default;
        use tracing_subscriber::Registry;
        use tracing_subscriber::layer::SubscriberExt;

        let console_level = if cfg!(debug_assertions) {
            Level::DEBUG
        } else {
            Level::INFO
        };

        let wasm_layer = tracing_wasm::WASMLayer::new(
            tracing_wasm::WASMLayerConfigBuilder::new()
                .set_max_level(console_level)
                .build(),
        );

        let _ = set_global_default(Registry::default().with(wasm_layer));
    }
}

/// The page's controller, created on first use.
fn controller() -> Result<Rc<RefCell<Controller>>, JsError> {
    CONTROLLER.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(existing) = slot.as_ref() {
            return Ok(existing.clone());
        }
        let created = Controller::new(Settings::default())?;
        *slot = Some(created.clone());
        Ok(created)
    })
}

fn with_controller<T>(f: impl FnOnce(&mut Controller) -> T) -> Result<T, JsError> {
    let controller = controller()?;
    let mut controller = controller
        .try_borrow_mut()
        .map_err(|_| JsError::new("controller is busy"))?;
    Ok(f(&mut controller))
}

fn run(mode: Mode) -> Result<(), JsError> {
    with_controller(|c| c.run(mode))??;
    Ok(())
}

/// Mode 1: step through `$...$` spans and convert each to an inline
/// equation.
#[wasm_bindgen(js_name = runInlineMode)]
pub fn run_inline_mode() -> Result<(), JsError> {
    run(Mode::Inline)
}

/// Mode 2: turn blocks holding a single `$$...$$` into block equations.
#[wasm_bindgen(js_name = runBlockMode)]
pub fn run_block_mode() -> Result<(), JsError> {
    run(Mode::Block)
}

/// Mode 3: turn blocks holding a single inline equation into block
/// equations.
#[wasm_bindgen(js_name = runInlineToBlockMode)]
pub fn run_inline_to_block_mode() -> Result<(), JsError> {
    run(Mode::InlineToBlock)
}

/// Run the mode a runtime message tag names, e.g. `RUN_BLOCK_CONVERT`.
#[wasm_bindgen(js_name = dispatchMessage)]
pub fn dispatch_message(tag: &str) -> Result<(), JsError> {
    run(Mode::from_message_tag(tag)?)
}

/// Stop whatever is running.
#[wasm_bindgen]
pub fn cancel() -> Result<(), JsError> {
    with_controller(Controller::cancel)
}

/// The last mode the user picked, `"inline"` when none was stored.
#[wasm_bindgen(js_name = lastMode)]
pub fn last_mode() -> String {
    LocalStorage::get::<Mode>(LAST_MODE_KEY)
        .unwrap_or_default()
        .as_str()
        .to_string()
}

/// Remember `mode` (`"inline"`, `"block"` or `"inline_to_block"`) for the
/// next toolbar click.
#[wasm_bindgen(js_name = rememberMode)]
pub fn remember_mode(mode: &str) -> Result<(), JsError> {
    let mode: Mode = mode.parse()?;
    LocalStorage::set(LAST_MODE_KEY, mode)?;
    Ok(())
}

/// Replace the settings. Missing fields take their defaults.
#[wasm_bindgen]
pub fn configure(settings: JsValue) -> Result<(), JsError> {
    let settings: Settings = if settings.is_undefined() || settings.is_null() {
        Settings::default()
    } else {
        serde_wasm_bindgen::from_value(settings)
            .map_err(|e| JsError::new(&format!("Invalid settings: {}", e)))?
    };
    with_controller(|c| c.configure(settings))
}
