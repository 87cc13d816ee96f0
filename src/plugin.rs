//! The static pages plugin.
//!
//! # Build Flow
//!
//! ```text
//! make(compilation)
//!     ├── scan(<context>/<input_dir>)           ──► PageEntries
//!     └── compile_pages(compilation, entries)   ──► BuildState::Compiled(pages)
//!
//! emit(compilation)
//!     ├── client_files(compilation)             ──► initial .js files
//!     ├── per page (parallel):
//!     │       evaluate(source) ──► render(props) ──► "<name>.html"
//!     │       "_error" ──► one render per status ──► "<code>.html"
//!     └── write all assets                      ──► BuildState::Idle
//! ```
//!
//! Nothing is written unless every page rendered.

use crate::compiler::{self, CompiledPage, CompiledPages};
use crate::config::defaults;
use crate::host::{Compilation, Plugin, RawSource};
use crate::render::{PageProps, RenderOptions, render};
use crate::sandbox::{Sandbox, evaluate};
use crate::scan;
use crate::{error::Error, log};
use anyhow::{Context, Result, bail};
use educe::Educe;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const PLUGIN_NAME: &str = "StaticPages";

// ============================================================================
// Options
// ============================================================================

/// Plugin options, also the `[pages]` section of `static-pages.toml`.
///
/// # Example
/// ```toml
/// [pages]
/// input_dir = "src/pages"
/// errors = [400, 404, 500]
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Status codes the error page is rendered for.
    #[serde(default = "defaults::pages::errors")]
    #[educe(Default = defaults::pages::errors())]
    pub errors: Vec<u16>,

    /// Pages root, relative to the build context.
    #[serde(default = "defaults::pages::input_dir")]
    #[educe(Default = defaults::pages::input_dir())]
    pub input_dir: PathBuf,

    /// Accepted but unused: emitted files always land in the host's output.
    pub output_dir: Option<PathBuf>,

    /// Recognized page source extensions.
    #[serde(default = "defaults::pages::extensions")]
    #[educe(Default = defaults::pages::extensions())]
    pub extensions: Vec<String>,

    /// Name of the page rendered once per error status.
    #[serde(default = "defaults::pages::error_page")]
    #[educe(Default = defaults::pages::error_page())]
    pub error_page: String,

    /// Document options, filled from the `[render]` section.
    #[serde(skip)]
    pub render: RenderOptions,
}

/// Status label passed to the error page.
///
/// Codes without a dedicated label fall back to their HTTP reason phrase.
pub fn status_label(code: u16) -> String {
    let label = match code {
        400 => "Bad Request",
        404 => "This page could not be found",
        500 => "Internal Server Error",
        401 => "Unauthorized",
        403 => "Forbidden",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        410 => "Gone",
        429 => "Too Many Requests",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => return format!("Error {code}"),
    };
    label.to_owned()
}

// ============================================================================
// Plugin
// ============================================================================

/// Where the plugin is within one host build.
#[derive(Debug, Default)]
pub enum BuildState {
    /// Waiting for `make`
    #[default]
    Idle,
    /// Pages compiled, waiting for `emit`
    Compiled(CompiledPages),
}

/// Pre-renders every page under the pages root into the host's assets.
pub struct StaticPages<S> {
    options: Options,
    sandbox: S,
    state: BuildState,
}

impl<S: Sandbox> StaticPages<S> {
    pub fn new(options: Options, sandbox: S) -> Self {
        Self {
            options,
            sandbox,
            state: BuildState::Idle,
        }
    }

    pub const fn options(&self) -> &Options {
        &self.options
    }

    pub const fn state(&self) -> &BuildState {
        &self.state
    }

    /// Render one compiled page into its output assets.
    fn render_page(
        &self,
        page: &CompiledPage,
        client_files: &[String],
    ) -> Result<Vec<(String, String)>> {
        let key = page.name.trim_start_matches('/');
        let mut factory = evaluate(&self.sandbox, &page.name, &page.source)?;

        if key == self.options.error_page {
            return self
                .options
                .errors
                .iter()
                .map(|&code| {
                    let props = PageProps::error(code, &status_label(code));
                    let html = render(&mut factory, client_files, &props, &self.options.render)?;
                    Ok((format!("{code}.html"), html))
                })
                .collect();
        }

        let props = PageProps::page(&page.name);
        let html = render(&mut factory, client_files, &props, &self.options.render)?;
        Ok(vec![(format!("{key}.html"), html)])
    }
}

impl<S: Sandbox> Plugin for StaticPages<S> {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn make(&mut self, compilation: &mut dyn Compilation) -> Result<()> {
        let root = compilation.context().join(&self.options.input_dir);

        let pages = scan::scan(&root, &self.options.extensions)
            .with_context(|| format!("Failed to collect pages from `{}`", root.display()))?;
        let entries = scan::entries(&pages)?;
        log!("pages"; "found {} pages in {}", entries.len(), root.display());

        let cwd = std::env::current_dir().unwrap_or_else(|_| compilation.context().to_path_buf());
        let externals = compiler::manifest::runtime_dependencies(&cwd);

        let compiled = compiler::compile_pages(compilation, &entries, &externals)?;
        self.state = BuildState::Compiled(compiled);
        Ok(())
    }

    fn emit(&mut self, compilation: &mut dyn Compilation) -> Result<()> {
        let BuildState::Compiled(pages) = std::mem::take(&mut self.state) else {
            bail!(Error::PhaseOrder);
        };

        let files = client_files(compilation);
        let rendered: Vec<Vec<(String, String)>> = pages
            .par_iter()
            .map(|(name, page)| {
                self.render_page(page, &files)
                    .with_context(|| format!("Failed to render page `{name}`"))
            })
            .collect::<Result<_>>()?;

        let assets = compilation.assets_mut();
        for (key, html) in rendered.into_iter().flatten() {
            log!("emit"; "{key}");
            assets.insert(key, RawSource::new(html));
        }
        Ok(())
    }
}

/// JavaScript files of named chunks in initial chunk groups, in order.
pub fn client_files(compilation: &dyn Compilation) -> Vec<String> {
    compilation
        .chunk_groups()
        .iter()
        .filter(|group| group.initial)
        .flat_map(|group| &group.chunks)
        .filter(|chunk| chunk.name.is_some())
        .flat_map(|chunk| &chunk.files)
        .filter(|file| file.ends_with(".js"))
        .cloned()
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
