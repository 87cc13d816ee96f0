//! `[bundler]` section configuration.
//!
//! Settings of the standalone host: which client entries to bundle for the
//! browser and where the finished assets go.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[bundler]` section - esbuild settings of the standalone build.
///
/// # Example
/// ```toml
/// [bundler]
/// command = ["npx", "esbuild"]
/// entries = ["src/client.tsx"]   # Browser entry points
/// output = "dist"                # Asset output directory
/// public_path = "/"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BundlerConfig {
    /// esbuild invocation.
    #[serde(default = "defaults::bundler::command")]
    #[educe(Default = defaults::bundler::command())]
    pub command: Vec<String>,

    /// Client entry points, one initial chunk group each.
    #[serde(default)]
    pub entries: Vec<PathBuf>,

    /// Asset output directory.
    #[serde(default = "defaults::bundler::output")]
    #[educe(Default = defaults::bundler::output())]
    pub output: PathBuf,

    /// URL prefix of emitted client assets.
    #[serde(default = "defaults::bundler::public_path")]
    #[educe(Default = defaults::bundler::public_path())]
    pub public_path: String,

    /// Remove the output directory before building.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,
}
