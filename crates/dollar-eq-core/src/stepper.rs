//! The sequential conversion stepper.
//!
//! A [`Stepper`] owns at most one [`Session`]: the worklist of a run, a
//! cursor into it and the current step. It converts one span at a time:
//!
//! ```text
//! Idle -> Seeking -> Editing -> AwaitingAck -> Seeking -> ... -> Done
//! ```
//!
//! Everything that takes time goes through the host. The stepper asks the
//! host to [`schedule`](EditorHost::schedule) a [`Timer`] and the host hands
//! it back through [`Stepper::on_timer`]. Host document mutations arrive
//! through [`Stepper::on_mutation`]. Timers carry the run and attempt they
//! were created for, so a timer that outlives its session or its attempt is
//! dropped on arrival. That is the whole cancellation story: cancelling just
//! discards the session.

use std::ops::Range;
use std::time::Duration;

use crate::ack::{AckProbe, AckWatcher};
use crate::collect::{ContentTree, Granularity, LiveSpan, Worklist, live_span};
use crate::config::{StepperConfig, TimeoutAction};
use crate::error::HostError;
use crate::mode::Mode;
use crate::overlay::Overlay;

/// Everything the stepper needs from the host editor.
pub trait EditorHost: ContentTree + AckProbe + Overlay {
    /// Focus the nearest editable ancestor of `leaf`. `false` when there is
    /// none.
    fn focus_editable(&mut self, leaf: &Self::Node) -> bool;

    /// Select `range` (byte offsets into `self.text(leaf)`) inside a text
    /// leaf.
    fn select(&mut self, leaf: &Self::Node, range: Range<usize>) -> Result<(), HostError>;

    /// Delete the current selection the way user input would.
    fn delete_selection(&mut self) -> Result<(), HostError>;

    /// Ask the host to turn the current selection into an equation, through
    /// the same input its own UI uses.
    fn request_native_conversion(&mut self) -> Result<(), HostError>;

    /// Deliver `timer` back to [`Stepper::on_timer`] after `delay`.
    fn schedule(&mut self, delay: Duration, timer: Timer);

    /// Deliver `timer` on the next frame.
    fn schedule_frame(&mut self, timer: Timer) {
        self.schedule(Duration::ZERO, timer);
    }

    /// Start or stop forwarding document mutations to
    /// [`Stepper::on_mutation`].
    fn watch_mutations(&mut self, enabled: bool);
}

/// Externally visible state of the stepper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No run, or the last run was cancelled.
    Idle,
    /// Looking for the next location with a live span.
    Seeking,
    /// Removing delimiters around the span at the cursor.
    Editing,
    /// Waiting for the host to acknowledge the conversion.
    AwaitingAck,
    /// The last run ran off the end of its worklist.
    Done,
}

/// Travel direction through the worklist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> isize {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// What a scheduled timer is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Continue the delimiter edit after the host processed the last delete.
    EditStep,
    /// Issue the native conversion request.
    Nudge,
    /// Evaluate the acknowledgment watcher.
    Frame,
    /// Move on after an acknowledged conversion.
    Settle,
    /// Give up waiting for an acknowledgment.
    AckTimeout,
}

/// Opaque token a host schedules and hands back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timer {
    run: u64,
    attempt: u32,
    kind: TimerKind,
}

impl Timer {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EditStage {
    CloserRemoved,
    OpenerRemoved,
}

#[derive(Debug)]
enum Step<N> {
    Seeking,
    Editing { live: LiveSpan<N>, stage: EditStage },
    AwaitingAck { watcher: AckWatcher },
}

impl<N> Step<N> {
    fn phase(&self) -> Phase {
        match self {
            Step::Seeking => Phase::Seeking,
            Step::Editing { .. } => Phase::Editing,
            Step::AwaitingAck { .. } => Phase::AwaitingAck,
        }
    }
}

/// Live state of one run. Only the stepper touches it.
#[derive(Debug)]
pub struct Session<N> {
    worklist: Worklist<N>,
    granularity: Granularity,
    /// -1 before the first location is reached.
    cursor: isize,
    run: u64,
    attempt: u32,
    step: Step<N>,
    /// Direction the current search is travelling in.
    travel: Direction,
    /// Navigation requested while an attempt was in flight.
    requested: Option<Direction>,
}

impl<N> Session<N> {
    fn timer(&self, kind: TimerKind) -> Timer {
        Timer {
            run: self.run,
            attempt: self.attempt,
            kind,
        }
    }
}

/// Drives inline conversion one span at a time.
#[derive(Debug)]
pub struct Stepper<N> {
    config: StepperConfig,
    session: Option<Session<N>>,
    /// Phase reported while there is no session.
    resting: Phase,
    runs: u64,
}

impl<N: Clone + PartialEq + std::fmt::Debug> Default for Stepper<N> {
    fn default() -> Self {
        Self::new(StepperConfig::default())
    }
}

impl<N: Clone + PartialEq + std::fmt::Debug> Stepper<N> {
    pub fn new(config: StepperConfig) -> Self {
        Self {
            config,
            session: None,
            resting: Phase::Idle,
            runs: 0,
        }
    }

    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: StepperConfig) {
        self.config = config;
    }

    pub fn phase(&self) -> Phase {
        match &self.session {
            Some(session) => session.step.phase(),
            None => self.resting,
        }
    }

    /// Index of the current location, once one has been reached.
    pub fn cursor(&self) -> Option<usize> {
        self.session
            .as_ref()
            .and_then(|s| usize::try_from(s.cursor).ok())
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Start a run over `worklist`, replacing any run in progress.
    pub fn start<H>(&mut self, host: &mut H, worklist: Worklist<N>, granularity: Granularity)
    where
        H: EditorHost<Node = N>,
    {
        self.cancel(host);

        if worklist.is_empty() {
            tracing::info!(target: "dollar_eq::stepper", "no $...$ spans found");
            self.resting = Phase::Done;
            return;
        }

        self.runs += 1;
        tracing::info!(
            target: "dollar_eq::stepper",
            run = self.runs,
            items = worklist.len(),
            "starting inline conversion"
        );
        self.session = Some(Session {
            worklist,
            granularity,
            cursor: -1,
            run: self.runs,
            attempt: 0,
            step: Step::Seeking,
            travel: Direction::Forward,
            requested: None,
        });
        self.seek(host, 0, Direction::Forward);
    }

    /// Move forward. Deferred until the attempt in flight resolves.
    pub fn advance<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        self.navigate(host, Direction::Forward);
    }

    /// Step back one location. Deferred until the attempt in flight
    /// resolves; clamps at the first location.
    pub fn retreat<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        self.navigate(host, Direction::Backward);
    }

    /// Abort the run. Safe to call at any time, any number of times.
    pub fn cancel<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        if let Some(session) = self.session.take() {
            host.watch_mutations(false);
            host.hide_overlays();
            tracing::info!(
                target: "dollar_eq::stepper",
                run = session.run,
                cursor = session.cursor,
                "inline conversion cancelled"
            );
        }
        self.resting = Phase::Idle;
    }

    /// The host document changed.
    pub fn on_mutation<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let timer = session.timer(TimerKind::Frame);
        if let Step::AwaitingAck { watcher } = &mut session.step {
            if watcher.on_mutation() {
                host.schedule_frame(timer);
            }
        }
    }

    /// A timer scheduled through the host fired.
    pub fn on_timer<H>(&mut self, host: &mut H, timer: Timer)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_ref() else {
            tracing::trace!(target: "dollar_eq::stepper", kind = ?timer.kind, "timer after teardown");
            return;
        };
        if timer.run != session.run || timer.attempt != session.attempt {
            tracing::trace!(target: "dollar_eq::stepper", kind = ?timer.kind, "stale timer");
            return;
        }

        match timer.kind {
            TimerKind::EditStep => self.continue_edit(host),
            TimerKind::Nudge => self.nudge(host),
            TimerKind::Frame => self.evaluate(host),
            TimerKind::Settle => self.resolve(host),
            TimerKind::AckTimeout => self.timed_out(host),
        }
    }

    fn navigate<H>(&mut self, host: &mut H, direction: Direction)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.step {
            Step::Editing { .. } | Step::AwaitingAck { .. } => {
                tracing::debug!(
                    target: "dollar_eq::stepper",
                    ?direction,
                    "navigation deferred until the current conversion resolves"
                );
                session.requested = Some(direction);
            }
            Step::Seeking => {
                let from = (session.cursor + direction.step()).max(0);
                self.seek(host, from, direction);
            }
        }
    }

    /// Find the next location with a live span, starting at `from`, and
    /// begin editing it. Running off the end finishes the run; running off
    /// the start clamps to the first item and searches forward from there.
    fn seek<H>(&mut self, host: &mut H, from: isize, direction: Direction)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.step = Step::Seeking;
        session.travel = direction;
        let step = direction.step();
        let mut index = from.max(0);

        while let Some(location) = usize::try_from(index)
            .ok()
            .and_then(|i| session.worklist.get(i))
        {
            let Some(live) = live_span(&*host, location) else {
                tracing::trace!(target: "dollar_eq::stepper", index, "no live span, skipping");
                index += step;
                continue;
            };

            session.cursor = index;
            if !host.focus_editable(&live.leaf) {
                tracing::debug!(target: "dollar_eq::stepper", index, "no focusable editor, skipping");
                index += step;
                continue;
            }

            match begin_edit(host, &self.config, session, live) {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(target: "dollar_eq::stepper", index, "edit failed, skipping: {e}");
                    index += step;
                }
            }
        }

        if direction == Direction::Backward {
            tracing::debug!(target: "dollar_eq::stepper", "nothing left behind, clamping at the first item");
            self.seek(host, 0, Direction::Forward);
            return;
        }
        self.finish(host);
    }

    fn continue_edit<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Step::Editing { live, stage } = &mut session.step else {
            return;
        };

        let result = match *stage {
            EditStage::CloserRemoved => remove_opener(host, live).map(|()| {
                *stage = EditStage::OpenerRemoved;
                false
            }),
            EditStage::OpenerRemoved => select_inner(host, live).map(|()| true),
        };

        match result {
            Ok(false) => {
                host.schedule(self.config.step_delay(), session.timer(TimerKind::EditStep));
            }
            Ok(true) => {
                host.highlight_selection();
                host.show_status(Mode::Inline);
                session.step = Step::AwaitingAck {
                    watcher: AckWatcher::arm(),
                };
                host.watch_mutations(true);
                host.schedule(self.config.nudge_delay(), session.timer(TimerKind::Nudge));
                if let Some(timeout) = self.config.ack_timeout() {
                    host.schedule(timeout, session.timer(TimerKind::AckTimeout));
                }
                tracing::debug!(
                    target: "dollar_eq::stepper",
                    cursor = session.cursor,
                    "awaiting acknowledgment"
                );
            }
            Err(e) => {
                tracing::warn!(
                    target: "dollar_eq::stepper",
                    cursor = session.cursor,
                    "location changed during edit, skipping: {e}"
                );
                let direction = session.travel;
                let from = session.cursor + direction.step();
                self.seek(host, from, direction);
            }
        }
    }

    fn nudge<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        let Some(Session {
            step: Step::AwaitingAck { watcher },
            ..
        }) = &self.session
        else {
            return;
        };
        if watcher.is_settled() {
            return;
        }
        if let Err(e) = host.request_native_conversion() {
            tracing::warn!(target: "dollar_eq::stepper", "native conversion request failed: {e}");
        }
    }

    fn evaluate<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let timer = session.timer(TimerKind::Settle);
        let Step::AwaitingAck { watcher } = &mut session.step else {
            return;
        };

        let settlement = watcher.settle(host);
        if settlement.is_settled() {
            tracing::debug!(
                target: "dollar_eq::stepper",
                cursor = session.cursor,
                ?settlement,
                "conversion acknowledged"
            );
            host.schedule(settlement.settle_delay(&self.config), timer);
        }
    }

    /// The attempt at the cursor is over; travel on.
    fn resolve<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !matches!(session.step, Step::AwaitingAck { .. }) {
            return;
        }
        host.watch_mutations(false);

        let direction = session.requested.take().unwrap_or(Direction::Forward);
        let from = match (direction, session.granularity) {
            (Direction::Forward, Granularity::PerSpan) => session.cursor + 1,
            // The block may hold more spans; re-scan it first.
            (Direction::Forward, Granularity::PerBlock) => session.cursor,
            (Direction::Backward, _) => (session.cursor - 1).max(0),
        };
        self.seek(host, from, direction);
    }

    fn timed_out<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        let Some(Session {
            step: Step::AwaitingAck { watcher },
            cursor,
            ..
        }) = &self.session
        else {
            return;
        };
        if watcher.is_settled() {
            return;
        }

        tracing::warn!(
            target: "dollar_eq::stepper",
            cursor = *cursor,
            action = ?self.config.timeout_action,
            "no acknowledgment from host"
        );
        match self.config.timeout_action {
            TimeoutAction::Abort => self.cancel(host),
            TimeoutAction::Skip => self.resolve(host),
        }
    }

    fn finish<H>(&mut self, host: &mut H)
    where
        H: EditorHost<Node = N>,
    {
        if let Some(session) = self.session.take() {
            host.watch_mutations(false);
            host.hide_overlays();
            tracing::info!(target: "dollar_eq::stepper", run = session.run, "inline conversion finished");
        }
        self.resting = Phase::Done;
    }
}

/// Remove the closing delimiter and arm the next edit step.
fn begin_edit<H: EditorHost>(
    host: &mut H,
    config: &StepperConfig,
    session: &mut Session<H::Node>,
    live: LiveSpan<H::Node>,
) -> Result<(), HostError> {
    host.select(&live.leaf, live.span.closer_range())?;
    host.delete_selection()?;

    session.attempt += 1;
    host.schedule(config.step_delay(), session.timer(TimerKind::EditStep));
    tracing::trace!(
        target: "dollar_eq::stepper",
        cursor = session.cursor,
        inner = live.inner(),
        display = live.span.is_display(),
        "removed closing delimiter"
    );
    session.step = Step::Editing {
        live,
        stage: EditStage::CloserRemoved,
    };
    Ok(())
}

/// Remove the opening delimiter, provided the text still looks the way it
/// did when the span was found.
fn remove_opener<H: EditorHost>(host: &mut H, live: &LiveSpan<H::Node>) -> Result<(), HostError> {
    let text = host.text(&live.leaf);
    let span = &live.span;
    if text.get(span.opener_range()) != Some(span.form.delimiter())
        || text.get(span.inner_range()) != Some(live.inner())
    {
        return Err(HostError::Stale);
    }
    host.select(&live.leaf, span.opener_range())?;
    host.delete_selection()
}

/// Select the inner content, now sitting where the opener was.
fn select_inner<H: EditorHost>(host: &mut H, live: &LiveSpan<H::Node>) -> Result<(), HostError> {
    let start = live.span.open_offset;
    let range = start..start + live.span.inner_len();
    if host.text(&live.leaf).get(range.clone()) != Some(live.inner()) {
        return Err(HostError::Stale);
    }
    host.select(&live.leaf, range)
}
