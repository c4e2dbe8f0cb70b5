//! CSS selectors describing the host editor's markup.
//!
//! The defaults target Notion. Every field can be overridden from the
//! extension's settings object; missing fields keep their defaults.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSelectors {
    /// Elements accepting user edits.
    pub editable: String,
    /// Code and verbatim contexts. Text inside these is never converted.
    pub code: String,
    /// Rendered equations, block or inline.
    pub math: String,
    /// Rendered inline equation tokens.
    pub inline_equation: String,
    /// Element holding an equation's source inside a rendered token.
    pub annotation: String,
    /// The host's modal dialog.
    pub dialog: String,
    /// Equation input inside the dialog.
    pub dialog_input: String,
    /// Clickable controls inside the dialog.
    pub button: String,
    /// Marker the confirm control carries when its label can't be matched.
    pub enter_marker: String,
}

impl Default for HostSelectors {
    fn default() -> Self {
        Self {
            editable: r#"[contenteditable="true"]"#.to_string(),
            code: ".notion-code-block, pre, code".to_string(),
            math: ".notion-equation, .katex".to_string(),
            inline_equation: ".notion-text-equation-token, .notion-equation-inline".to_string(),
            annotation: "annotation".to_string(),
            dialog: r#"div[role="dialog"]"#.to_string(),
            dialog_input: r#"div[role="dialog"] [contenteditable="true"][data-content-editable-leaf="true"]"#
                .to_string(),
            button: r#"div[role="button"]"#.to_string(),
            enter_marker: ".enter".to_string(),
        }
    }
}
