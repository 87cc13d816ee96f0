//! Standalone host built on the `esbuild` CLI.
//!
//! ```text
//! StandaloneCompilation::new(root, bundler)
//!     │
//!     ├── bundle_client(entries)
//!     │       esbuild --platform=browser ──► client assets + one initial
//!     │                                      chunk group per entry
//!     │
//!     └── create_child_compiler()
//!             esbuild --platform=node --format=cjs --external:<dep>
//!                 ──► "__child-static-<i>" assets, file dependencies
//! ```
//!
//! Both passes write into a scratch directory under
//! `node_modules/.cache/static-pages`; outputs are read back into the asset
//! map and never written to the output directory by esbuild itself. Input
//! files are taken from the esbuild metafile.

use super::{
    AssetMap, ChildCompilation, ChildCompiler, Chunk, ChunkGroup, Compilation, CompilationError,
    EntryOptions, ExternalsType, OutputOptions, RawSource, Target,
};
use crate::config::BundlerConfig;
use crate::log;
use crate::utils::exec::{self, ESBUILD_FILTER};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Scratch directory, relative to the project root.
const CACHE_DIR: &str = "node_modules/.cache/static-pages";

/// Length of the hex compilation hash.
const HASH_LEN: usize = 20;

// ============================================================================
// Metafile
// ============================================================================

/// The parts of esbuild's `--metafile` output used here.
#[derive(Debug, Default, Deserialize)]
struct Metafile {
    #[serde(default)]
    inputs: BTreeMap<String, serde::de::IgnoredAny>,
    #[serde(default)]
    outputs: BTreeMap<String, MetaOutput>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaOutput {
    entry_point: Option<String>,
    css_bundle: Option<String>,
}

impl Metafile {
    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read esbuild metafile `{}`", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid esbuild metafile `{}`", path.display()))
    }

    /// Source files that went into the build, as absolute paths.
    fn file_dependencies(&self, root: &Path) -> BTreeSet<PathBuf> {
        self.inputs
            .keys()
            // Virtual modules are namespaced (`<ns>:<path>`)
            .filter(|input| !input.contains(':') || Path::new(input).is_absolute())
            .map(|input| root.join(input))
            .collect()
    }
}

/// Name of an output file relative to the scratch directory.
fn asset_name(root: &Path, dir: &Path, output: &str) -> Option<String> {
    let path = root.join(output);
    let relative = path.strip_prefix(dir).ok()?;
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(name)
}

/// Hash of all outputs of one pass, in key order.
fn content_hash(assets: &AssetMap) -> String {
    let mut hasher = blake3::Hasher::new();
    for (name, source) in assets {
        hasher.update(name.as_bytes());
        hasher.update(source.as_bytes());
    }
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..HASH_LEN].to_owned()
}

/// Remove and recreate a scratch directory.
fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to clear `{}`", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("Failed to create `{}`", dir.display()))
}

/// Run esbuild in `root`, returning the failure as text.
fn run_esbuild(root: &Path, command: &[String], args: &[OsString]) -> Result<(), String> {
    exec::exec(Some(root), command, args, &ESBUILD_FILTER)
        .map(|_| ())
        .map_err(|e| format!("{e:#}"))
}

// ============================================================================
// Compilation
// ============================================================================

/// A host compilation driven by esbuild.
pub struct StandaloneCompilation {
    context: PathBuf,
    command: Vec<String>,
    cache: PathBuf,
    output: OutputOptions,
    chunk_groups: Vec<ChunkGroup>,
    assets: AssetMap,
    inbox: Rc<RefCell<AssetMap>>,
    file_dependencies: BTreeSet<PathBuf>,
}

impl StandaloneCompilation {
    pub fn new(root: &Path, bundler: &BundlerConfig) -> Self {
        Self {
            context: root.to_path_buf(),
            command: bundler.command.clone(),
            cache: root.join(CACHE_DIR),
            output: OutputOptions {
                filename: "[name]-[hash].js".into(),
                public_path: Some(bundler.public_path.clone()),
            },
            chunk_groups: Vec::new(),
            assets: AssetMap::new(),
            inbox: Rc::default(),
            file_dependencies: BTreeSet::new(),
        }
    }

    pub const fn file_dependencies(&self) -> &BTreeSet<PathBuf> {
        &self.file_dependencies
    }

    /// Bundle the client entries for the browser.
    ///
    /// Each entry becomes one initial chunk group whose chunk carries the
    /// entry's file stem as name.
    pub fn bundle_client(&mut self, entries: &[PathBuf]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let dir = self.cache.join("client");
        let metafile = self.cache.join("client.json");
        reset_dir(&dir)?;

        let args = client_args(entries, &dir, &metafile, self.output.public_path.as_deref());
        run_esbuild(&self.context, &self.command, &args)
            .map_err(anyhow::Error::msg)
            .context("Failed to bundle client entries")?;

        let meta = Metafile::read(&metafile)?;
        for (output, info) in &meta.outputs {
            let Some(name) = asset_name(&self.context, &dir, output) else {
                continue;
            };
            let content = fs::read(self.context.join(output))
                .with_context(|| format!("Failed to read client output `{output}`"))?;
            self.assets.insert(name, RawSource::new(content));

            if let Some(entry_point) = &info.entry_point {
                let group = self.chunk_group(&dir, entries, output, entry_point, info);
                self.chunk_groups.extend(group);
            }
        }
        self.chunk_groups.sort_by_key(|group| group_index(entries, group));
        self.file_dependencies
            .extend(meta.file_dependencies(&self.context));

        log!("bundle"; "{} client entries bundled", self.chunk_groups.len());
        Ok(())
    }

    fn chunk_group(
        &self,
        dir: &Path,
        entries: &[PathBuf],
        output: &str,
        entry_point: &str,
        info: &MetaOutput,
    ) -> Option<ChunkGroup> {
        let entry_path = self.context.join(entry_point);
        let entry = entries.iter().find(|e| self.context.join(e) == entry_path)?;

        let mut files: Vec<String> = asset_name(&self.context, dir, output).into_iter().collect();
        if let Some(css) = &info.css_bundle {
            files.extend(asset_name(&self.context, dir, css));
        }

        Some(ChunkGroup {
            initial: true,
            chunks: vec![Chunk {
                name: entry.file_stem().map(|s| s.to_string_lossy().into_owned()),
                files,
            }],
        })
    }
}

/// Position of the entry a client chunk group was built from.
fn group_index(entries: &[PathBuf], group: &ChunkGroup) -> usize {
    let name = group.chunks.first().and_then(|c| c.name.as_deref());
    entries
        .iter()
        .position(|e| e.file_stem().map(|s| s.to_string_lossy()).as_deref() == name)
        .unwrap_or(usize::MAX)
}

fn client_args(
    entries: &[PathBuf],
    dir: &Path,
    metafile: &Path,
    public_path: Option<&str>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = entries.iter().map(OsString::from).collect();
    args.extend(
        [
            "--bundle",
            "--platform=browser",
            "--format=iife",
            "--jsx=automatic",
            "--entry-names=[name]-[hash]",
            "--log-level=warning",
        ]
        .map(OsString::from),
    );
    args.push(format!("--outdir={}", dir.display()).into());
    args.push(format!("--metafile={}", metafile.display()).into());
    if let Some(public_path) = public_path {
        args.push(format!("--public-path={public_path}").into());
    }
    args
}

impl Compilation for StandaloneCompilation {
    fn context(&self) -> &Path {
        &self.context
    }

    fn output_options(&self) -> &OutputOptions {
        &self.output
    }

    fn chunk_groups(&self) -> &[ChunkGroup] {
        &self.chunk_groups
    }

    fn assets(&self) -> &AssetMap {
        &self.assets
    }

    fn assets_mut(&mut self) -> &mut AssetMap {
        self.assets.append(&mut self.inbox.borrow_mut());
        &mut self.assets
    }

    fn add_file_dependencies(&mut self, deps: &mut dyn Iterator<Item = PathBuf>) {
        self.file_dependencies.extend(deps);
    }

    fn create_child_compiler(
        &mut self,
        name: &str,
        output: OutputOptions,
    ) -> Result<Box<dyn ChildCompiler>> {
        Ok(Box::new(StandaloneChild {
            name: name.to_owned(),
            context: self.context.clone(),
            command: self.command.clone(),
            dir: self.cache.join(name),
            output,
            target: Target::default(),
            externals: Vec::new(),
            entries: Vec::new(),
            inbox: Rc::clone(&self.inbox),
        }))
    }
}

// ============================================================================
// Child Compiler
// ============================================================================

struct StandaloneChild {
    name: String,
    context: PathBuf,
    command: Vec<String>,
    dir: PathBuf,
    output: OutputOptions,
    target: Target,
    externals: Vec<String>,
    entries: Vec<EntryOptions>,
    inbox: Rc<RefCell<AssetMap>>,
}

impl StandaloneChild {
    fn metafile(&self) -> PathBuf {
        self.dir.with_extension("json")
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self
            .entries
            .iter()
            .map(|entry| {
                let mut arg = OsString::from(format!("{}=", entry.name));
                arg.push(entry.request.as_os_str());
                arg
            })
            .collect();

        let (platform, format) = match self.target {
            Target::Node => ("--platform=node", "--format=cjs"),
            Target::Web => ("--platform=browser", "--format=iife"),
        };
        args.extend(
            ["--bundle", platform, format, "--jsx=automatic", "--log-level=warning"]
                .map(OsString::from),
        );
        // Bare module and its subpaths (`react`, `react/jsx-runtime`)
        for module in &self.externals {
            args.push(format!("--external:{module}").into());
            args.push(format!("--external:{module}/*").into());
        }
        args.push(format!("--outdir={}", self.dir.display()).into());
        args.push(format!("--metafile={}", self.metafile().display()).into());
        args
    }

    /// Read the per-entry outputs and name them with the output template.
    fn collect(&self) -> Result<(String, AssetMap)> {
        let mut modules = AssetMap::new();
        for entry in &self.entries {
            let file = self.dir.join(format!("{}.js", entry.name));
            let content = fs::read(&file)
                .with_context(|| format!("Failed to read child output `{}`", file.display()))?;
            modules.insert(entry.name.clone(), RawSource::new(content));
        }

        let hash = content_hash(&modules);
        let assets = modules
            .into_iter()
            .map(|(name, source)| (self.output.asset_path(&name, &hash), source))
            .collect();
        Ok((hash, assets))
    }
}

impl ChildCompiler for StandaloneChild {
    fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    fn add_externals(&mut self, kind: ExternalsType, modules: &[String]) {
        match kind {
            ExternalsType::CommonJs => self.externals.extend(modules.iter().cloned()),
        }
    }

    fn add_entry(&mut self, entry: EntryOptions) {
        self.entries.push(entry);
    }

    fn run_as_child(self: Box<Self>) -> Result<ChildCompilation> {
        let mut result = ChildCompilation::default();
        if self.entries.is_empty() {
            result.hash = content_hash(&AssetMap::new());
            return Ok(result);
        }

        reset_dir(&self.dir)?;
        if let Err(message) = run_esbuild(&self.context, &self.command, &self.args()) {
            result.errors.push(CompilationError {
                message: format!("{} compilation failed", self.name),
                cause: Some(message),
            });
            return Ok(result);
        }

        let meta = Metafile::read(&self.metafile())?;
        result.file_dependencies = meta.file_dependencies(&self.context);
        (result.hash, result.assets) = self.collect()?;

        self.inbox.borrow_mut().extend(result.assets.clone());
        Ok(result)
    }
}

// ============================================================================
// Tests
// ============================================================================
