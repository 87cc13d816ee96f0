//! Host build interface.
//!
//! The pre-renderer runs inside somebody else's build. This module describes
//! the small surface it needs from that build:
//!
//! - **Compilation**: the in-progress host compilation (context, assets,
//!   chunk groups, file dependencies) and a factory for child compilers
//! - **ChildCompiler**: a nested compiler pass sharing the host's context
//! - **Plugin**: the two hooks a host calls once per build
//!
//! # Hook Order
//!
//! ```text
//! host build ──► make(compilation) ──► ...modules sealed... ──► emit(compilation) ──► write assets
//! ```
//!
//! `standalone` implements the traits on top of the `esbuild` CLI so the
//! crate can run as its own build tool.

pub mod standalone;

#[cfg(test)]
pub mod memory;

use anyhow::Result;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

// ============================================================================
// Assets
// ============================================================================

/// Raw asset content, as stored in a host asset map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSource(Vec<u8>);

impl RawSource {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self(content.into())
    }

    /// Textual view of the content (lossy for non UTF-8 data).
    pub fn source(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Output filename -> content, ordered for deterministic writes.
pub type AssetMap = BTreeMap<String, RawSource>;

// ============================================================================
// Chunks
// ============================================================================

/// A chunk and the output files it produced.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub name: Option<String>,
    pub files: Vec<String>,
}

/// A group of chunks loaded together.
///
/// Initial groups are reachable from an entry point without async loading;
/// their scripts must be present on every page.
#[derive(Debug, Clone, Default)]
pub struct ChunkGroup {
    pub initial: bool,
    pub chunks: Vec<Chunk>,
}

// ============================================================================
// Compiler Configuration
// ============================================================================

/// Output naming for a (child) compilation.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Filename template, may contain `[name]` and `[hash]`
    pub filename: String,
    pub public_path: Option<String>,
}

impl OutputOptions {
    /// Resolve the filename template for a chunk.
    pub fn asset_path(&self, name: &str, hash: &str) -> String {
        self.filename.replace("[name]", name).replace("[hash]", hash)
    }
}

/// Runtime the compiled output is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    Web,
    Node,
}

/// How externals are loaded at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalsType {
    /// `require("<module>")`
    CommonJs,
}

/// A single entry point of a child compilation.
#[derive(Debug, Clone)]
pub struct EntryOptions {
    pub context: PathBuf,
    /// Module request (usually an absolute path)
    pub request: PathBuf,
    /// Chunk name, substituted for `[name]` in the output template
    pub name: String,
}

// ============================================================================
// Child Compilation Result
// ============================================================================

/// An error recorded by a compilation.
#[derive(Debug, Clone)]
pub struct CompilationError {
    pub message: String,
    /// Nested cause, if the compiler wrapped another error
    pub cause: Option<String>,
}

impl CompilationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }
}

/// Everything a finished child compilation hands back.
#[derive(Debug, Clone, Default)]
pub struct ChildCompilation {
    pub hash: String,
    pub assets: AssetMap,
    pub file_dependencies: BTreeSet<PathBuf>,
    pub errors: Vec<CompilationError>,
}

// ============================================================================
// Traits
// ============================================================================

/// The in-progress host compilation.
pub trait Compilation {
    /// Project directory all relative paths resolve against.
    fn context(&self) -> &Path;

    fn output_options(&self) -> &OutputOptions;

    fn chunk_groups(&self) -> &[ChunkGroup];

    fn assets(&self) -> &AssetMap;

    fn assets_mut(&mut self) -> &mut AssetMap;

    /// Register files the host should watch for this build.
    fn add_file_dependencies(&mut self, deps: &mut dyn Iterator<Item = PathBuf>);

    /// Create a child compiler sharing this compilation's context and file
    /// systems. Its outputs land in `output` naming, never in the host's.
    fn create_child_compiler(
        &mut self,
        name: &str,
        output: OutputOptions,
    ) -> Result<Box<dyn ChildCompiler>>;
}

/// A nested compiler pass.
pub trait ChildCompiler {
    fn set_target(&mut self, target: Target);

    fn add_externals(&mut self, kind: ExternalsType, modules: &[String]);

    fn add_entry(&mut self, entry: EntryOptions);

    /// Run to completion as part of the parent compilation.
    ///
    /// `Err` is a failure of the pass itself; errors inside the compiled
    /// modules are recorded in [`ChildCompilation::errors`].
    fn run_as_child(self: Box<Self>) -> Result<ChildCompilation>;
}

/// A build plugin, called by the host once per build for each hook.
pub trait Plugin {
    fn name(&self) -> &'static str;

    /// Module-resolution phase; the plugin may add work to the build.
    fn make(&mut self, compilation: &mut dyn Compilation) -> Result<()>;

    /// Asset-emission phase; assets written here are persisted by the host.
    fn emit(&mut self, compilation: &mut dyn Compilation) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_path() {
        let output = OutputOptions {
            filename: "__child-[name]".into(),
            public_path: None,
        };
        assert_eq!(output.asset_path("static-0", "abc"), "__child-static-0");

        let output = OutputOptions {
            filename: "[name].[hash].js".into(),
            public_path: None,
        };
        assert_eq!(output.asset_path("app", "abc"), "app.abc.js");
    }

    #[test]
    fn test_raw_source_lossy() {
        let source = RawSource::new(b"hello \xff".to_vec());
        assert_eq!(source.source(), "hello \u{fffd}");
        assert_eq!(source.as_bytes().len(), 7);
    }
}
