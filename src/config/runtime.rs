//! `[runtime]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[runtime]` section - the JavaScript runtime pages are evaluated in.
///
/// # Example
/// ```toml
/// [runtime]
/// command = ["node", "--no-warnings"]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Node invocation; the bootstrap script is appended with `-e`.
    #[serde(default = "defaults::runtime::command")]
    #[educe(Default = defaults::runtime::command())]
    pub command: Vec<String>,
}
