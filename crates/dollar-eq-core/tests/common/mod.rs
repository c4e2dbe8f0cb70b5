//! In-memory host for exercising the core without a browser.
//!
//! `FakeDoc` is a tiny element/text tree plus the bits of host behaviour the
//! stepper and batch runner rely on: a selection, a virtual clock with a
//! timer queue, a mutation flag and an optional simulated equation dialog.

#![allow(dead_code)]

use std::cell::Cell;
use std::future::Future;
use std::ops::Range;
use std::time::Duration;

use dollar_eq_core::{
    AckProbe, BlockHost, CancelToken, ConfirmVia, ContentTree, EditorHost, HostError, Mode, NodeContext,
    Overlay, Stepper, Timer,
};

pub type Id = usize;

#[derive(Debug)]
enum Kind {
    Element {
        classes: Vec<&'static str>,
        editable: bool,
        /// Source annotation for rendered equation tokens.
        source: Option<String>,
    },
    Text(String),
}

#[derive(Debug)]
struct FakeNode {
    parent: Option<Id>,
    children: Vec<Id>,
    kind: Kind,
}

/// How the fake editor reacts to a native conversion request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostBehaviour {
    /// Convert the selection right away.
    Immediate,
    /// Open an equation dialog; confirming it converts.
    Dialog,
    /// Do nothing.
    Ignore,
}

#[derive(Debug)]
pub struct FakeDoc {
    nodes: Vec<FakeNode>,
    pub behaviour: HostBehaviour,
    pub selection: Option<(Id, Range<usize>)>,
    pub focused: Option<Id>,
    pub unfocusable: Vec<Id>,
    pub in_equation: bool,
    pub dialog_open: bool,
    /// Whether the dialog has a control to click. Without one, confirming
    /// falls to an Enter press.
    pub confirm_control: bool,
    /// Inner texts the host turned into equations, in order.
    pub converted: Vec<String>,
    pub native_requests: usize,
    pub watching: bool,
    mutated: bool,
    pub now: Duration,
    timers: Vec<(Duration, u64, Timer)>,
    seq: u64,
    pub status_shown: Vec<Mode>,
    pub overlays_hidden: usize,
    pub highlights: usize,
    // batch side
    pub typed: Vec<String>,
    pub enters: usize,
    pub input_present: bool,
    pub input_appears_after: Option<Duration>,
    pub slept: Cell<Duration>,
    pub fail_focus_on: Vec<Id>,
    /// Cancel this token once total sleep time reaches the duration.
    pub cancel_at: Option<(Duration, CancelToken)>,
}

impl FakeDoc {
    /// A document with a single `body` root (id 0).
    pub fn new() -> Self {
        Self {
            nodes: vec![FakeNode {
                parent: None,
                children: Vec::new(),
                kind: Kind::Element {
                    classes: vec!["body"],
                    editable: false,
                    source: None,
                },
            }],
            behaviour: HostBehaviour::Immediate,
            selection: None,
            focused: None,
            unfocusable: Vec::new(),
            in_equation: false,
            dialog_open: false,
            confirm_control: true,
            converted: Vec::new(),
            native_requests: 0,
            watching: false,
            mutated: false,
            now: Duration::ZERO,
            timers: Vec::new(),
            seq: 0,
            status_shown: Vec::new(),
            overlays_hidden: 0,
            highlights: 0,
            typed: Vec::new(),
            enters: 0,
            input_present: false,
            input_appears_after: None,
            slept: Cell::new(Duration::ZERO),
            fail_focus_on: Vec::new(),
            cancel_at: None,
        }
    }

    pub const BODY: Id = 0;

    fn push(&mut self, parent: Id, kind: Kind) -> Id {
        let id = self.nodes.len();
        self.nodes.push(FakeNode {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn element(&mut self, parent: Id, classes: &[&'static str], editable: bool) -> Id {
        self.push(
            parent,
            Kind::Element {
                classes: classes.to_vec(),
                editable,
                source: None,
            },
        )
    }

    /// An editable block holding one text leaf. Returns `(block, leaf)`.
    pub fn block(&mut self, parent: Id, text: &str) -> (Id, Id) {
        let block = self.element(parent, &["block"], true);
        let leaf = self.text(block, text);
        (block, leaf)
    }

    pub fn text(&mut self, parent: Id, text: &str) -> Id {
        self.push(parent, Kind::Text(text.to_string()))
    }

    /// A rendered inline equation token with `source` inside `parent`.
    pub fn inline_equation(&mut self, parent: Id, source: &str) -> Id {
        let token = self.push(
            parent,
            Kind::Element {
                classes: vec!["inline-eq"],
                editable: false,
                source: Some(source.to_string()),
            },
        );
        self.text(token, source);
        token
    }

    pub fn leaf_text(&self, leaf: Id) -> &str {
        match &self.nodes[leaf].kind {
            Kind::Text(t) => t,
            Kind::Element { .. } => "",
        }
    }

    pub fn set_leaf_text(&mut self, leaf: Id, text: &str) {
        if let Kind::Text(t) = &mut self.nodes[leaf].kind {
            *t = text.to_string();
        }
    }

    fn has_class(&self, id: Id, class: &str) -> bool {
        matches!(&self.nodes[id].kind, Kind::Element { classes, .. } if classes.contains(&class))
    }

    fn ancestors(&self, id: Id) -> impl Iterator<Item = Id> + '_ {
        std::iter::successors(Some(id), move |&n| self.nodes[n].parent)
    }

    fn descendants(&self, root: Id, out: &mut Vec<Id>) {
        for &child in &self.nodes[root].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn all_under(&self, root: Id) -> Vec<Id> {
        let mut out = Vec::new();
        self.descendants(root, &mut out);
        out
    }

    fn is_editable(&self, id: Id) -> bool {
        matches!(self.nodes[id].kind, Kind::Element { editable: true, .. })
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn take_mutation(&mut self) -> bool {
        std::mem::take(&mut self.mutated)
    }

    /// Pop the earliest timer due at or before `deadline`.
    pub fn next_timer(&mut self, deadline: Duration) -> Option<Timer> {
        let (pos, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, (due, _, _))| *due <= deadline)
            .min_by_key(|(_, (due, seq, _))| (*due, *seq))?;
        let (due, _, timer) = self.timers.remove(pos);
        self.now = due;
        Some(timer)
    }

    /// Simulate the host turning the selection into an equation.
    fn convert_selection(&mut self) {
        let Some((leaf, range)) = self.selection.clone() else {
            return;
        };
        let mut text = self.leaf_text(leaf).to_string();
        let inner: String = text.drain(range.clone()).collect();
        self.set_leaf_text(leaf, &text);
        self.converted.push(inner);
        self.selection = Some((leaf, range.start..range.start));
        self.in_equation = true;
        self.mutated = true;
    }
}

/// Deliver mutations and due timers to the stepper for `span` of virtual
/// time.
pub fn pump(stepper: &mut Stepper<Id>, doc: &mut FakeDoc, span: Duration) {
    let deadline = doc.now + span;
    loop {
        if doc.take_mutation() {
            if doc.watching {
                stepper.on_mutation(doc);
            }
            continue;
        }
        match doc.next_timer(deadline) {
            Some(timer) => stepper.on_timer(doc, timer),
            None => break,
        }
    }
    doc.now = deadline;
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

impl ContentTree for FakeDoc {
    type Node = Id;

    fn query_all(&self, selector: &str) -> Vec<Id> {
        let class = selector.trim_start_matches('.');
        std::iter::once(Self::BODY)
            .chain(self.all_under(Self::BODY))
            .filter(|&id| self.has_class(id, class))
            .collect()
    }

    fn document_root(&self) -> Option<Id> {
        Some(Self::BODY)
    }

    fn contains(&self, ancestor: &Id, node: &Id) -> bool {
        self.ancestors(*node).any(|a| a == *ancestor)
    }

    fn text_leaves(&self, root: &Id) -> Vec<Id> {
        self.all_under(*root)
            .into_iter()
            .filter(|&id| matches!(self.nodes[id].kind, Kind::Text(_)))
            .collect()
    }

    fn editable_blocks(&self, root: &Id) -> Vec<Id> {
        self.all_under(*root)
            .into_iter()
            .filter(|&id| self.is_editable(id))
            .collect()
    }

    fn text(&self, node: &Id) -> String {
        match &self.nodes[*node].kind {
            Kind::Text(t) => t.clone(),
            Kind::Element { .. } => self
                .text_leaves(node)
                .iter()
                .map(|leaf| self.leaf_text(*leaf))
                .collect(),
        }
    }

    fn parent_element(&self, node: &Id) -> Option<Id> {
        self.nodes[*node].parent
    }

    fn context(&self, element: &Id) -> NodeContext {
        NodeContext {
            editable: self.is_editable(*element),
            code: self.ancestors(*element).any(|a| self.has_class(a, "code")),
            math: self.ancestors(*element).any(|a| self.has_class(a, "equation")),
        }
    }

    fn inline_equations(&self, block: &Id) -> Vec<Id> {
        self.all_under(*block)
            .into_iter()
            .filter(|&id| self.has_class(id, "inline-eq"))
            .collect()
    }

    fn text_outside_equations(&self, block: &Id) -> String {
        self.text_leaves(block)
            .into_iter()
            .filter(|&leaf| !self.ancestors(leaf).any(|a| self.has_class(a, "inline-eq")))
            .map(|leaf| self.leaf_text(leaf).to_string())
            .collect()
    }

    fn equation_source(&self, token: &Id) -> Option<String> {
        match &self.nodes[*token].kind {
            Kind::Element { source, .. } => source.clone(),
            Kind::Text(_) => None,
        }
    }
}

impl AckProbe for FakeDoc {
    fn equation_dialog_open(&self) -> bool {
        self.dialog_open
    }

    fn confirm_equation_dialog(&mut self) -> Result<Option<ConfirmVia>, HostError> {
        if !self.dialog_open || !self.confirm_control {
            return Ok(None);
        }
        self.dialog_open = false;
        if self.selection.is_some() && !self.input_present {
            self.convert_selection();
        }
        self.input_present = false;
        self.mutated = true;
        Ok(Some(ConfirmVia::Label))
    }

    fn selection_in_equation(&self) -> bool {
        self.in_equation
    }
}

impl Overlay for FakeDoc {
    fn show_status(&mut self, mode: Mode) {
        self.status_shown.push(mode);
    }

    fn highlight_selection(&mut self) {
        self.highlights += 1;
    }

    fn hide_highlight(&mut self) {}

    fn hide_overlays(&mut self) {
        self.overlays_hidden += 1;
    }
}

impl EditorHost for FakeDoc {
    fn focus_editable(&mut self, leaf: &Id) -> bool {
        if self.unfocusable.contains(leaf) {
            return false;
        }
        let target = self.ancestors(*leaf).find(|&a| self.is_editable(a));
        self.focused = target;
        target.is_some()
    }

    fn select(&mut self, leaf: &Id, range: Range<usize>) -> Result<(), HostError> {
        let len = self.leaf_text(*leaf).len();
        if range.start > range.end || range.end > len {
            return Err(HostError::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        self.in_equation = false;
        self.selection = Some((*leaf, range));
        Ok(())
    }

    fn delete_selection(&mut self) -> Result<(), HostError> {
        let (leaf, range) = self.selection.clone().ok_or(HostError::NoSelection)?;
        let mut text = self.leaf_text(leaf).to_string();
        text.replace_range(range.clone(), "");
        self.set_leaf_text(leaf, &text);
        self.selection = Some((leaf, range.start..range.start));
        Ok(())
    }

    fn request_native_conversion(&mut self) -> Result<(), HostError> {
        self.native_requests += 1;
        match self.behaviour {
            HostBehaviour::Immediate => self.convert_selection(),
            HostBehaviour::Dialog => {
                self.dialog_open = true;
                self.mutated = true;
            }
            HostBehaviour::Ignore => {}
        }
        Ok(())
    }

    fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.seq += 1;
        self.timers.push((self.now + delay, self.seq, timer));
    }

    fn watch_mutations(&mut self, enabled: bool) {
        self.watching = enabled;
    }
}

impl BlockHost for FakeDoc {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> {
        self.slept.set(self.slept.get() + delay);
        if let Some((at, token)) = &self.cancel_at {
            if self.slept.get() >= *at {
                token.cancel();
            }
        }
        std::future::ready(())
    }

    fn focus_block(&mut self, block: &Id) -> Result<(), HostError> {
        if self.fail_focus_on.contains(block) {
            return Err(HostError::Unfocusable);
        }
        self.focused = Some(*block);
        Ok(())
    }

    fn select_block_contents(&mut self, block: &Id) -> Result<(), HostError> {
        self.focused = Some(*block);
        Ok(())
    }

    fn delete_contents(&mut self) -> Result<(), HostError> {
        let block = self.focused.ok_or(HostError::NoSelection)?;
        for leaf in self.text_leaves(&block) {
            self.set_leaf_text(leaf, "");
        }
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<(), HostError> {
        self.typed.push(text.to_string());
        Ok(())
    }

    fn press_enter(&mut self, _target: &Id) -> Result<(), HostError> {
        self.enters += 1;
        if self.typed.last().map(String::as_str) == Some("/equation") {
            self.dialog_open = true;
            self.input_present = self.input_appears_after.is_none();
        } else if self.dialog_open {
            self.dialog_open = false;
            self.input_present = false;
        }
        Ok(())
    }

    fn equation_input(&self) -> Option<Id> {
        if self.input_present {
            return Some(Self::BODY);
        }
        match self.input_appears_after {
            Some(after) if self.dialog_open && self.slept.get() >= after => Some(Self::BODY),
            _ => None,
        }
    }

    fn focus_node(&mut self, node: &Id) -> Result<(), HostError> {
        self.focused = Some(*node);
        Ok(())
    }
}
