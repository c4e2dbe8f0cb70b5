//! Whole-block batch conversion.
//!
//! Unlike the stepper, batch mode doesn't watch the host for completion. It
//! walks its items in order and drives the host's block menu with fixed
//! pauses in between, on the assumption that each pause is long enough. The
//! one place where a fixed pause is known to be flaky, waiting for the
//! equation input to appear, is a bounded poll instead.
//!
//! A failing item is logged and counted; the batch carries on with the next
//! one. Cancellation is checked around every pause. A cancelled batch leaves
//! the overlays alone, since the canceller hides them.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::ack::AckProbe;
use crate::collect::{BlockItem, ContentTree};
use crate::config::{BatchConfig, ms};
use crate::error::{BatchError, HostError};
use crate::mode::Mode;
use crate::overlay::Overlay;

/// Host operations batch mode drives.
pub trait BlockHost: ContentTree + AckProbe + Overlay {
    /// Wait for `delay`.
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()>;

    fn focus_block(&mut self, block: &Self::Node) -> Result<(), HostError>;

    /// Select everything inside `block`.
    fn select_block_contents(&mut self, block: &Self::Node) -> Result<(), HostError>;

    /// Delete what the current selection covers.
    fn delete_contents(&mut self) -> Result<(), HostError>;

    /// Type `text` at the current caret, as user input.
    fn insert_text(&mut self, text: &str) -> Result<(), HostError>;

    /// Send an Enter keypress to `target`.
    fn press_enter(&mut self, target: &Self::Node) -> Result<(), HostError>;

    /// The input field of the open equation dialog, if there is one.
    fn equation_input(&self) -> Option<Self::Node>;

    fn focus_node(&mut self, node: &Self::Node) -> Result<(), HostError>;
}

/// Cooperative cancellation flag shared between a batch and whoever may
/// stop it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Outcome of a batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Convert every item in order.
pub async fn run_batch<H: BlockHost>(
    host: &mut H,
    items: &[BlockItem<H::Node>],
    mode: Mode,
    config: &BatchConfig,
    cancel: &CancelToken,
) -> BatchReport {
    let mut report = BatchReport {
        total: items.len(),
        ..Default::default()
    };

    if items.is_empty() {
        tracing::info!(target: "dollar_eq::batch", "[{}] No matching blocks found", mode.label());
        return report;
    }

    if cancel.is_cancelled() {
        report.cancelled = true;
        return report;
    }

    tracing::info!(
        target: "dollar_eq::batch",
        "[{}] Found {} blocks to convert",
        mode.label(),
        items.len()
    );
    host.show_status(mode);

    for (index, item) in items.iter().enumerate() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }

        match convert_block(host, item, config, cancel).await {
            Ok(()) => report.converted += 1,
            Err(BatchError::Cancelled) => {
                report.cancelled = true;
                break;
            }
            Err(e) => {
                tracing::error!(
                    target: "dollar_eq::batch",
                    index,
                    original = %item.original,
                    "[{}] Error converting item: {e}",
                    mode.label()
                );
                report.failed += 1;
                host.hide_highlight();
            }
        }

        if pause(&*host, cancel, config.item_settle_ms).await.is_err() {
            report.cancelled = true;
            break;
        }
    }

    // Whoever cancelled owns the overlays now; a newer run may be showing them.
    if !report.cancelled {
        host.hide_overlays();
    }
    tracing::info!(
        target: "dollar_eq::batch",
        converted = report.converted,
        failed = report.failed,
        cancelled = report.cancelled,
        "[{}] Conversion complete",
        mode.label()
    );
    report
}

/// Replace one block with a block equation holding `item.equation`.
pub async fn convert_block<H: BlockHost>(
    host: &mut H,
    item: &BlockItem<H::Node>,
    config: &BatchConfig,
    cancel: &CancelToken,
) -> Result<(), BatchError> {
    host.focus_block(&item.block)?;
    pause(&*host, cancel, config.focus_delay_ms).await?;

    host.select_block_contents(&item.block)?;
    host.highlight_selection();
    pause(&*host, cancel, config.select_delay_ms).await?;

    host.delete_contents()?;
    pause(&*host, cancel, config.delete_delay_ms).await?;

    host.insert_text(&config.command_token)?;
    pause(&*host, cancel, config.command_delay_ms).await?;

    host.press_enter(&item.block)?;
    pause(&*host, cancel, config.create_delay_ms).await?;

    let input = wait_for_input(&*host, config, cancel).await?;
    host.focus_node(&input)?;
    pause(&*host, cancel, config.input_focus_delay_ms).await?;

    host.insert_text(&item.equation)?;
    pause(&*host, cancel, config.typing_delay_ms).await?;

    match host.confirm_equation_dialog()? {
        Some(via) => {
            tracing::debug!(target: "dollar_eq::batch", ?via, "confirmed equation dialog");
        }
        None => host.press_enter(&input)?,
    }

    host.hide_highlight();
    tracing::debug!(target: "dollar_eq::batch", equation = %item.equation, "converted block");
    Ok(())
}

/// Poll for the equation input until it shows up or the timeout passes.
async fn wait_for_input<H: BlockHost>(
    host: &H,
    config: &BatchConfig,
    cancel: &CancelToken,
) -> Result<H::Node, BatchError> {
    let interval = config.poll_interval_ms.max(1);
    let mut waited = 0;
    loop {
        if let Some(input) = host.equation_input() {
            return Ok(input);
        }
        if waited >= config.input_timeout_ms {
            return Err(BatchError::EquationInputMissing(ms(config
                .create_delay_ms
                .saturating_add(config.input_timeout_ms))));
        }
        pause(host, cancel, interval).await?;
        waited += interval;
    }
}

async fn pause<H: BlockHost>(host: &H, cancel: &CancelToken, millis: u32) -> Result<(), BatchError> {
    if cancel.is_cancelled() {
        return Err(BatchError::Cancelled);
    }
    host.sleep(ms(millis)).await;
    if cancel.is_cancelled() {
        return Err(BatchError::Cancelled);
    }
    Ok(())
}
