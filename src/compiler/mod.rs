//! Child compilation of page entries.
//!
//! Every page is compiled into a standalone, node-runnable module by a single
//! nested pass of the host compiler:
//!
//! ```text
//! entries ──► create_child_compiler("StaticPages") ──► run_as_child()
//!                 │ target: node                            │
//!                 │ externals: package.json deps            ▼
//!                 │ entry "static-<i>" per page      child assets
//!                 ▼                                         │
//!           "__child-[name]" ◄── extract + drop from host ──┘
//! ```
//!
//! The intermediate `__child-*` files are build artifacts, never deliverables:
//! they are removed from the host's asset map as soon as they are read.

pub mod manifest;

use crate::error::Error;
use crate::host::{
    ChildCompilation, Compilation, CompilationError, EntryOptions, ExternalsType, OutputOptions,
    Target,
};
use crate::log;
use crate::scan::PageEntries;
use anyhow::{Result, bail};
use std::collections::BTreeMap;

/// Name of the child compiler, as shown in host diagnostics.
pub const CHILD_COMPILER_NAME: &str = "StaticPages";

/// Output template of the child compilation. Private prefix so the
/// intermediate files never collide with host outputs.
pub const CHILD_FILENAME: &str = "__child-[name]";

/// A page compiled into a server-side module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPage {
    pub name: String,
    /// Child entry id (`static-<i>`)
    pub entry: String,
    /// Compiled module text
    pub source: String,
    /// Hash of the child compilation that produced it
    pub hash: String,
}

/// Page name -> compiled page.
pub type CompiledPages = BTreeMap<String, CompiledPage>;

/// Chunk name of the i-th page entry.
///
/// Numbered rather than named after the page, so two pages resolving to the
/// same module graph still get distinct entries.
pub fn entry_id(index: usize) -> String {
    format!("static-{index}")
}

/// Compile `entries` in a child compilation of `compilation`.
///
/// Returns exactly one [`CompiledPage`] per entry, or an error. Nothing is
/// extracted from a failed child pass.
pub fn compile_pages(
    compilation: &mut dyn Compilation,
    entries: &PageEntries,
    externals: &[String],
) -> Result<CompiledPages> {
    let output = OutputOptions {
        filename: CHILD_FILENAME.to_owned(),
        public_path: compilation.output_options().public_path.clone(),
    };
    let context = compilation.context().to_path_buf();

    let mut child = compilation.create_child_compiler(CHILD_COMPILER_NAME, output.clone())?;
    child.set_target(Target::Node);
    child.add_externals(ExternalsType::CommonJs, externals);
    for (index, (_, request)) in entries.iter().enumerate() {
        child.add_entry(EntryOptions {
            context: context.clone(),
            request: request.clone(),
            name: entry_id(index),
        });
    }

    let result = child.run_as_child()?;
    if !result.errors.is_empty() {
        bail!(Error::ChildCompilation(error_details(&result.errors)));
    }

    let pages = extract(compilation, &output, entries, &result)?;
    compilation.add_file_dependencies(&mut result.file_dependencies.into_iter());

    log!("compile"; "{} pages compiled", pages.len());
    Ok(pages)
}

/// Pull each page's module out of the child assets, then drop the
/// intermediate files from the host. The host is left untouched if any page
/// is missing.
fn extract(
    compilation: &mut dyn Compilation,
    output: &OutputOptions,
    entries: &PageEntries,
    result: &ChildCompilation,
) -> Result<CompiledPages> {
    let mut pages = CompiledPages::new();
    let mut files = Vec::with_capacity(entries.len());

    for (index, (name, _)) in entries.iter().enumerate() {
        let entry = entry_id(index);
        let file = output.asset_path(&entry, &result.hash);

        let Some(asset) = result.assets.get(&file) else {
            bail!(Error::MissingAsset {
                page: name.clone(),
                file,
            });
        };

        pages.insert(
            name.clone(),
            CompiledPage {
                name: name.clone(),
                entry,
                source: asset.source().into_owned(),
                hash: result.hash.clone(),
            },
        );
        files.push(file);
    }

    let assets = compilation.assets_mut();
    for file in &files {
        assets.remove(file);
    }

    Ok(pages)
}

/// One line per recorded error, with its nested cause when present.
fn error_details(errors: &[CompilationError]) -> String {
    errors
        .iter()
        .map(|e| match &e.cause {
            Some(cause) => format!("{}:\n{cause}", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================
