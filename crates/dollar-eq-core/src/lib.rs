//! dollar-eq-core: host-independent logic for turning `$...$` text into
//! native equations.
//!
//! This crate provides:
//! - `scan`: the delimiter scanner
//! - `collect`: worklist construction over a `ContentTree`
//! - `stepper`: the one-span-at-a-time conversion state machine
//! - `ack`: acknowledgment inference from host side effects
//! - `batch`: fixed-timing whole-block conversion
//!
//! Nothing here touches a real document. Hosts implement `ContentTree`,
//! `AckProbe`, `Overlay` and then `EditorHost` and/or `BlockHost`; the
//! browser implementation lives in `dollar-eq-browser`.

pub mod ack;
pub mod batch;
pub mod collect;
pub mod config;
pub mod error;
pub mod mode;
pub mod overlay;
pub mod scan;
pub mod stepper;

pub use ack::{AckProbe, AckWatcher, ConfirmVia, Settlement, label_matches};
pub use batch::{BatchReport, BlockHost, CancelToken, convert_block, run_batch};
pub use collect::{
    BlockItem, ContentTree, Granularity, LiveSpan, Location, LocationHint, NodeContext, Worklist,
    collect_display_blocks, collect_inline, collect_inline_equation_blocks, display_equation,
    eligible_parent, live_span, resolve_roots,
};
pub use config::{BatchConfig, Config, DEFAULT_ROOTS, StepperConfig, TimeoutAction};
pub use error::{BatchError, HostError, ModeError};
pub use mode::Mode;
pub use overlay::Overlay;
pub use scan::{DelimiterForm, Span, Spans, Utf16Span, find_spans, first_span, scan, utf16_offset};
pub use smol_str::SmolStr;
pub use stepper::{Direction, EditorHost, Phase, Session, Stepper, Timer, TimerKind};
