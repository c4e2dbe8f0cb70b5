//! Conversion modes and the message tags that select them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModeError;

/// One of the three ways a run can convert the page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Step through `$...$` / `$$...$$` spans and turn each into an inline
    /// equation.
    #[default]
    Inline,
    /// Replace blocks consisting of a single `$$...$$` with block equations.
    Block,
    /// Replace blocks holding only one rendered inline equation with a block
    /// equation.
    InlineToBlock,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Inline, Mode::Block, Mode::InlineToBlock];

    /// Persisted name, as stored under the last-mode key.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Inline => "inline",
            Mode::Block => "block",
            Mode::InlineToBlock => "inline_to_block",
        }
    }

    /// Tag of the run message dispatched to the page for this mode.
    pub fn message_tag(self) -> &'static str {
        match self {
            Mode::Inline => "RUN_INLINE_CONVERT",
            Mode::Block => "RUN_BLOCK_CONVERT",
            Mode::InlineToBlock => "RUN_INLINE_TO_BLOCK_CONVERT",
        }
    }

    pub fn from_message_tag(tag: &str) -> Result<Self, ModeError> {
        Mode::ALL
            .into_iter()
            .find(|m| m.message_tag() == tag)
            .ok_or_else(|| ModeError::UnknownMessage(tag.to_string()))
    }

    /// Human-readable label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Mode::Inline => "Inline Mode",
            Mode::Block => "Block Mode",
            Mode::InlineToBlock => "Inline-to-Block Mode",
        }
    }

    /// HUD copy for the status overlay, as HTML.
    pub fn status_text(self) -> &'static str {
        match self {
            Mode::Inline => {
                "<b>Inline Equation Mode</b><br/>\
                 Press <b>Cmd/Ctrl+Shift+E</b> to convert. Auto-advances.<br/>\
                 Stops if a span isn't converted within 30s.<br/>\
                 <b>B</b> back &bull; <b>ESC</b> exit"
            }
            Mode::Block => {
                "<b>Block Conversion (Mode 2)</b><br/>\
                 Converting `$$...$$` blocks to block equations...<br/>\
                 <b>ESC</b> to stop"
            }
            Mode::InlineToBlock => {
                "<b>Inline-to-Block (Mode 3)</b><br/>\
                 Converting single inline equations to block equations...<br/>\
                 <b>ESC</b> to stop"
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ModeError::UnknownMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StepperConfig;

    #[test]
    fn test_default_is_first_mode() {
        assert_eq!(Mode::default(), Mode::ALL[0]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("inline_to_block".parse::<Mode>(), Ok(Mode::InlineToBlock));
        assert!(matches!("inline-to-block".parse::<Mode>(), Err(ModeError::UnknownMode(_))));
    }

    #[test]
    fn test_message_tags() {
        assert_eq!(Mode::from_message_tag("RUN_BLOCK_CONVERT"), Ok(Mode::Block));
        assert!(Mode::from_message_tag("RUN_NOTHING").is_err());
    }

    #[test]
    fn test_inline_status_names_default_timeout() {
        let timeout = StepperConfig::default()
            .ack_timeout()
            .expect("default has a timeout");
        let wanted = format!("within {}s", timeout.as_secs());
        assert!(Mode::Inline.status_text().contains(&wanted));
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for mode in Mode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
    }
}
