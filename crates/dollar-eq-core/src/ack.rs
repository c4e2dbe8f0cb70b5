//! Inferring that the host finished a conversion we asked it for.
//!
//! The host never tells us it is done. What we can see is its document
//! changing. The watcher is fed those changes as a stream of
//! "something mutated" events, coalesces them into at most one pending
//! evaluation at a time, and on each evaluation asks an [`AckProbe`] about
//! the visible side effects:
//!
//! 1. An equation entry dialog is open and hasn't been confirmed during
//!    this attempt: confirm it, once.
//! 2. Otherwise, the selection now sits inside a rendered equation: the
//!    host converted it without a dialog.
//!
//! Either outcome settles the attempt. The watcher then stays quiet until it
//! is re-armed for the next attempt.

use std::time::Duration;

use crate::config::StepperConfig;
use crate::error::HostError;

/// Observable host state the watcher reasons about.
pub trait AckProbe {
    /// An equation entry dialog is currently open.
    fn equation_dialog_open(&self) -> bool;

    /// Activate the open dialog's confirmation control.
    ///
    /// Returns how the control was located, or `None` when the dialog has no
    /// recognisable control.
    fn confirm_equation_dialog(&mut self) -> Result<Option<ConfirmVia>, HostError>;

    /// The current selection is inside a rendered equation.
    fn selection_in_equation(&self) -> bool;
}

/// How the dialog's confirmation control was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmVia {
    /// Exact label match.
    Label,
    /// Structural fallback when no label matched.
    Structural,
}

/// Result of evaluating one attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Nothing conclusive yet.
    Pending,
    /// The equation dialog was confirmed.
    Confirmed(ConfirmVia),
    /// The selection ended up inside a rendered equation.
    InsideEquation,
}

impl Settlement {
    pub fn is_settled(&self) -> bool {
        !matches!(self, Settlement::Pending)
    }

    /// How long to let the host finish its own update before moving on.
    pub fn settle_delay(&self, config: &StepperConfig) -> Duration {
        match self {
            Settlement::Pending => Duration::ZERO,
            Settlement::Confirmed(_) => config.dialog_settle(),
            Settlement::InsideEquation => config.equation_settle(),
        }
    }
}

/// Per-attempt acknowledgment state.
#[derive(Clone, Debug, Default)]
pub struct AckWatcher {
    frame_pending: bool,
    dialog_confirmed: bool,
    settled: Option<Settlement>,
}

impl AckWatcher {
    /// Fresh state for a new attempt.
    pub fn arm() -> Self {
        Self::default()
    }

    /// Record a mutation. Returns `true` when the caller should schedule an
    /// evaluation; `false` when one is already pending or the attempt is
    /// settled.
    pub fn on_mutation(&mut self) -> bool {
        if self.frame_pending || self.settled.is_some() {
            return false;
        }
        self.frame_pending = true;
        true
    }

    pub fn is_settled(&self) -> bool {
        self.settled.is_some()
    }

    /// Evaluate the attempt. Called when a scheduled evaluation fires.
    ///
    /// Returns a settled result at most once per attempt; later calls
    /// report `Pending`.
    pub fn settle<P: AckProbe + ?Sized>(&mut self, probe: &mut P) -> Settlement {
        self.frame_pending = false;
        if self.settled.is_some() {
            return Settlement::Pending;
        }

        if !self.dialog_confirmed && probe.equation_dialog_open() {
            match probe.confirm_equation_dialog() {
                Ok(Some(via)) => {
                    self.dialog_confirmed = true;
                    tracing::debug!(target: "dollar_eq::ack", ?via, "confirmed equation dialog");
                    return self.resolve(Settlement::Confirmed(via));
                }
                Ok(None) => {
                    tracing::trace!(target: "dollar_eq::ack", "dialog has no confirm control yet");
                }
                Err(e) => {
                    tracing::warn!(target: "dollar_eq::ack", "confirming dialog failed: {e}");
                }
            }
        }

        if probe.selection_in_equation() {
            return self.resolve(Settlement::InsideEquation);
        }

        Settlement::Pending
    }

    fn resolve(&mut self, settlement: Settlement) -> Settlement {
        self.settled = Some(settlement);
        settlement
    }
}

/// Label comparison used to find confirmation controls: trimmed,
/// case-insensitive equality.
pub fn label_matches(label: &str, wanted: &str) -> bool {
    label.trim().to_lowercase() == wanted.trim().to_lowercase()
}
