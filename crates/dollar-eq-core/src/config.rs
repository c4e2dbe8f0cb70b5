//! Timing and behaviour settings.
//!
//! All delays are in milliseconds so the structs deserialize from plain
//! JSON handed over by the extension. Missing fields take their defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What to do when the host never acknowledges a conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutAction {
    /// End the run and leave the inner text selected for the user.
    #[default]
    Abort,
    /// Treat the attempt as settled and move on.
    Skip,
}

/// Settings for the per-span stepper and its acknowledgment watcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// Pause after each delimiter deletion so the host processes the input.
    pub step_delay_ms: u32,
    /// Delay between arming the watcher and issuing the native conversion
    /// request.
    pub nudge_delay_ms: u32,
    /// Settle delay after confirming the equation dialog.
    pub dialog_settle_ms: u32,
    /// Settle delay after seeing the selection inside a rendered equation.
    pub equation_settle_ms: u32,
    /// Upper bound on a single acknowledgment wait. `None` waits forever.
    pub ack_timeout_ms: Option<u32>,
    pub timeout_action: TimeoutAction,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            step_delay_ms: 20,
            nudge_delay_ms: 150,
            dialog_settle_ms: 60,
            equation_settle_ms: 40,
            ack_timeout_ms: Some(30_000),
            timeout_action: TimeoutAction::Abort,
        }
    }
}

impl StepperConfig {
    pub fn step_delay(&self) -> Duration {
        ms(self.step_delay_ms)
    }

    pub fn nudge_delay(&self) -> Duration {
        ms(self.nudge_delay_ms)
    }

    pub fn dialog_settle(&self) -> Duration {
        ms(self.dialog_settle_ms)
    }

    pub fn equation_settle(&self) -> Duration {
        ms(self.equation_settle_ms)
    }

    pub fn ack_timeout(&self) -> Option<Duration> {
        self.ack_timeout_ms.map(ms)
    }
}

/// Settings for whole-block batch conversion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Text typed into the emptied block to open the host's block menu.
    pub command_token: String,
    /// Label of the dialog's confirmation control.
    pub confirm_label: String,
    pub focus_delay_ms: u32,
    pub select_delay_ms: u32,
    pub delete_delay_ms: u32,
    pub command_delay_ms: u32,
    /// Wait after pressing Enter before looking for the equation input.
    pub create_delay_ms: u32,
    /// Poll interval while waiting for the equation input.
    pub poll_interval_ms: u32,
    /// Give up on the equation input after this long (on top of
    /// `create_delay_ms`).
    pub input_timeout_ms: u32,
    pub input_focus_delay_ms: u32,
    pub typing_delay_ms: u32,
    /// Pause between finished items.
    pub item_settle_ms: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            command_token: "/equation".to_string(),
            confirm_label: "done".to_string(),
            focus_delay_ms: 50,
            select_delay_ms: 60,
            delete_delay_ms: 60,
            command_delay_ms: 250,
            create_delay_ms: 400,
            poll_interval_ms: 50,
            input_timeout_ms: 2_000,
            input_focus_delay_ms: 60,
            typing_delay_ms: 120,
            item_settle_ms: 600,
        }
    }
}

/// Everything the page-side controller can be configured with.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stepper: StepperConfig,
    pub batch: BatchConfig,
    /// Root container selectors, searched in order.
    pub roots: Vec<String>,
}

impl Config {
    /// Root selectors, falling back to the defaults when none are set.
    pub fn root_selectors(&self) -> Vec<&str> {
        if self.roots.is_empty() {
            DEFAULT_ROOTS.to_vec()
        } else {
            self.roots.iter().map(String::as_str).collect()
        }
    }
}

/// Containers searched for convertible text, most specific first.
pub const DEFAULT_ROOTS: [&str; 4] = [".notion-page-content", ".notion-frame", "main", "body"];

pub(crate) fn ms(millis: u32) -> Duration {
    Duration::from_millis(u64::from(millis))
}
