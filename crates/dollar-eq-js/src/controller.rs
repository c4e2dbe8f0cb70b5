//! The page-side controller: one per page, owning the stepper, the running
//! batch and the keyboard listener.
//!
//! Browser callbacks (timers, mutations, keys) hold a `Weak` to the
//! controller and borrow it with `try_borrow_mut`. An event arriving while
//! the controller is already borrowed, such as the keydown we dispatch
//! ourselves, is dropped.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use gloo_events::EventListener;
use wasm_bindgen_futures::spawn_local;

use dollar_eq_browser::{
    BlockItem, CancelToken, DomDocument, EventSink, Granularity, HostError, HostEvent, KeyAction,
    KeyPress, Mode, Overlay, Stepper, collect_display_blocks, collect_inline,
    collect_inline_equation_blocks, is_mac, listen_keys, run_batch,
};
use web_sys::Node;

use crate::settings::Settings;

pub(crate) struct Controller {
    this: Weak<RefCell<Controller>>,
    host: DomDocument,
    stepper: Stepper<Node>,
    settings: Settings,
    /// Cancellation handle and generation of the running batch.
    batch: Option<(CancelToken, u64)>,
    batches: u64,
    keys: Option<EventListener>,
    mac: bool,
}

impl Controller {
    pub(crate) fn new(settings: Settings) -> Result<Rc<RefCell<Self>>, HostError> {
        let mut host = DomDocument::new(settings.selectors.clone())?;
        host.set_confirm_label(settings.config.batch.confirm_label.clone());
        let mac = is_mac(&host_window()?.navigator());

        Ok(Rc::new_cyclic(|this: &Weak<RefCell<Self>>| {
            host.set_event_sink(event_sink(this.clone()));
            RefCell::new(Self {
                this: this.clone(),
                host,
                stepper: Stepper::new(settings.config.stepper.clone()),
                settings,
                batch: None,
                batches: 0,
                keys: None,
                mac,
            })
        }))
    }

    pub(crate) fn configure(&mut self, settings: Settings) {
        self.host.set_selectors(settings.selectors.clone());
        self.host
            .set_confirm_label(settings.config.batch.confirm_label.clone());
        self.stepper.set_config(settings.config.stepper.clone());
        self.settings = settings;
        tracing::debug!(target: "dollar_eq::js", "settings updated");
    }

    /// Start `mode`, replacing whatever is running.
    pub(crate) fn run(&mut self, mode: Mode) -> Result<(), HostError> {
        self.cancel();
        tracing::info!(target: "dollar_eq::js", mode = %mode, "starting");
        match mode {
            Mode::Inline => self.run_inline(),
            Mode::Block => {
                let roots = self.settings.config.root_selectors();
                let items = collect_display_blocks(&self.host, &roots);
                self.run_batch(mode, items)
            }
            Mode::InlineToBlock => {
                let roots = self.settings.config.root_selectors();
                let items = collect_inline_equation_blocks(&self.host, &roots);
                self.run_batch(mode, items)
            }
        }
    }

    fn run_inline(&mut self) -> Result<(), HostError> {
        let roots = self.settings.config.root_selectors();
        let worklist = collect_inline(&self.host, &roots, Granularity::PerBlock);
        self.listen_keys()?;
        self.stepper
            .start(&mut self.host, worklist, Granularity::PerBlock);
        self.release_keys();
        Ok(())
    }

    fn run_batch(&mut self, mode: Mode, items: Vec<BlockItem<Node>>) -> Result<(), HostError> {
        if items.is_empty() {
            tracing::info!(target: "dollar_eq::js", "[{}] No matching blocks found", mode.label());
            return Ok(());
        }

        // The batch owns its own handle so it can hold it across awaits.
        let mut host = DomDocument::new(self.settings.selectors.clone())?;
        host.set_confirm_label(self.settings.config.batch.confirm_label.clone());
        let config = self.settings.config.batch.clone();
        let token = CancelToken::new();
        self.batches += 1;
        let generation = self.batches;
        self.batch = Some((token.clone(), generation));
        self.listen_keys()?;

        let this = self.this.clone();
        spawn_local(async move {
            let report = run_batch(&mut host, &items, mode, &config, &token).await;
            tracing::debug!(target: "dollar_eq::js", ?report, "batch finished");

            let Some(this) = this.upgrade() else {
                return;
            };
            let Ok(mut controller) = this.try_borrow_mut() else {
                return;
            };
            if controller
                .batch
                .as_ref()
                .is_some_and(|(_, g)| *g == generation)
            {
                controller.batch = None;
                controller.release_keys();
            }
        });
        Ok(())
    }

    /// Stop the stepper and any running batch.
    pub(crate) fn cancel(&mut self) {
        self.stepper.cancel(&mut self.host);
        if let Some((token, _)) = self.batch.take() {
            token.cancel();
            self.host.hide_overlays();
            tracing::info!(target: "dollar_eq::js", "batch cancelled");
        }
        self.release_keys();
    }

    fn handle(&mut self, event: HostEvent) {
        match event {
            HostEvent::Timer(timer) => self.stepper.on_timer(&mut self.host, timer),
            HostEvent::Mutation => self.stepper.on_mutation(&mut self.host),
        }
        self.release_keys();
    }

    fn handle_key(&mut self, press: &KeyPress) -> bool {
        match press.action(self.mac) {
            Some(KeyAction::Cancel) => {
                self.cancel();
                true
            }
            Some(KeyAction::Retreat) if self.stepper.is_active() => {
                self.stepper.retreat(&mut self.host);
                self.release_keys();
                true
            }
            _ => false,
        }
    }

    fn listen_keys(&mut self) -> Result<(), HostError> {
        if self.keys.is_some() {
            return Ok(());
        }
        let window = host_window()?;
        let this = self.this.clone();
        self.keys = Some(listen_keys(&window, move |event| {
            let Some(this) = this.upgrade() else {
                return;
            };
            let Ok(mut controller) = this.try_borrow_mut() else {
                return;
            };
            if controller.handle_key(&KeyPress::from_event(event)) {
                event.prevent_default();
            }
        }));
        Ok(())
    }

    /// Drop the keyboard listener once nothing is running.
    fn release_keys(&mut self) {
        if !self.stepper.is_active() && self.batch.is_none() {
            self.keys = None;
        }
    }
}

fn event_sink(this: Weak<RefCell<Controller>>) -> EventSink {
    Rc::new(move |event| {
        let Some(this) = this.upgrade() else {
            return;
        };
        match this.try_borrow_mut() {
            Ok(mut controller) => controller.handle(event),
            Err(_) => {
                tracing::trace!(target: "dollar_eq::js", ?event, "controller busy, event dropped");
            }
        }
    })
}

fn host_window() -> Result<web_sys::Window, HostError> {
    web_sys::window().ok_or_else(|| HostError::from("no window"))
}
