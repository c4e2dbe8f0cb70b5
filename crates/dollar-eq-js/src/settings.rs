//! Settings object accepted by `configure`.

use serde::{Deserialize, Serialize};

use dollar_eq_browser::{Config, HostSelectors};

/// Core timing configuration plus the host's selectors, as one JSON object.
///
/// ```json
/// { "stepper": { "ack_timeout_ms": 10000 }, "selectors": { "math": ".katex" } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(flatten)]
    pub config: Config,
    pub selectors: HostSelectors,
}
