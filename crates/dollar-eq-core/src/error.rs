//! Error types for host interaction and batch conversion.

use std::time::Duration;

/// A host primitive (selection, focus, DOM edit, ...) failed.
///
/// Hosts report failures as text; the core only needs to log them and
/// decide whether to skip the current item.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The node a location referred to is gone or was never a text leaf.
    #[error("node is no longer attached")]
    Detached,

    /// Nothing could take focus for the edit.
    #[error("no focusable editor for target")]
    Unfocusable,

    /// Offsets did not fit the node's current text.
    #[error("range {start}..{end} out of bounds for text of length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    /// The text under a location changed between scanning and editing.
    #[error("text changed while the edit was in progress")]
    Stale,

    /// The host has no usable selection object.
    #[error("no selection available")]
    NoSelection,

    /// Anything else the host wants to report, typically a stringified
    /// exception.
    #[error("host error: {0}")]
    Other(String),
}

impl From<&str> for HostError {
    fn from(s: &str) -> Self {
        HostError::Other(s.to_string())
    }
}

impl From<String> for HostError {
    fn from(s: String) -> Self {
        HostError::Other(s)
    }
}

/// Why a single block in a batch run failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error(transparent)]
    Host(#[from] HostError),

    /// The equation entry surface never appeared after creating the block.
    #[error("equation input did not appear within {0:?}")]
    EquationInputMissing(Duration),

    /// The run was cancelled while this item was in progress.
    #[error("cancelled")]
    Cancelled,
}

/// A mode name or message tag was not recognised.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("unknown conversion mode: {0:?}")]
    UnknownMode(String),

    #[error("unknown message tag: {0:?}")]
    UnknownMessage(String),
}
