//! In-memory host used by tests.
//!
//! The child compiler "compiles" an entry by looking its request up in a
//! prepared map. Like a real host, child outputs are merged into the parent
//! asset map when the child pass finishes.

use super::{
    AssetMap, ChildCompilation, ChildCompiler, ChunkGroup, Compilation, CompilationError,
    EntryOptions, ExternalsType, OutputOptions, RawSource, Target,
};
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// What the child compiler was asked to do.
#[derive(Debug, Default)]
pub struct ChildRecord {
    pub name: String,
    pub output: OutputOptions,
    pub target: Target,
    pub externals: Vec<String>,
    pub entries: Vec<EntryOptions>,
    pub runs: usize,
}

/// Prepared behavior of the child compiler.
#[derive(Debug, Default, Clone)]
pub struct ChildScript {
    /// Entry request -> compiled module text
    pub sources: BTreeMap<PathBuf, String>,
    pub errors: Vec<CompilationError>,
    /// Fail the pass itself instead of recording errors
    pub crash: Option<String>,
    pub hash: String,
}

pub struct MemoryCompilation {
    context: PathBuf,
    output: OutputOptions,
    chunk_groups: Vec<ChunkGroup>,
    assets: AssetMap,
    inbox: Rc<RefCell<AssetMap>>,
    pub file_dependencies: BTreeSet<PathBuf>,
    pub script: ChildScript,
    pub record: Rc<RefCell<ChildRecord>>,
}

impl MemoryCompilation {
    pub fn new(context: &Path) -> Self {
        Self {
            context: context.to_path_buf(),
            output: OutputOptions {
                filename: "[name].js".into(),
                public_path: Some("/".into()),
            },
            chunk_groups: Vec::new(),
            assets: AssetMap::new(),
            inbox: Rc::default(),
            file_dependencies: BTreeSet::new(),
            script: ChildScript {
                hash: "0123abcd".into(),
                ..Default::default()
            },
            record: Rc::default(),
        }
    }

    pub fn with_chunk_groups(mut self, groups: Vec<ChunkGroup>) -> Self {
        for chunk in groups.iter().flat_map(|g| &g.chunks) {
            for file in &chunk.files {
                self.assets
                    .insert(file.clone(), RawSource::new(format!("/* {file} */")));
            }
        }
        self.chunk_groups = groups;
        self
    }

    /// Asset map including child outputs merged since the last access.
    pub fn all_assets(&mut self) -> &AssetMap {
        self.assets_mut()
    }

    pub fn html_keys(&mut self) -> Vec<String> {
        self.all_assets()
            .keys()
            .filter(|k| k.ends_with(".html"))
            .cloned()
            .collect()
    }

    pub fn html(&mut self, key: &str) -> String {
        self.all_assets()
            .get(key)
            .map(|s| s.source().into_owned())
            .unwrap_or_default()
    }
}

impl Compilation for MemoryCompilation {
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
        {
            let mut record = self.record.borrow_mut();
            record.name = name.to_owned();
            record.output = output.clone();
        }
        Ok(Box::new(MemoryChild {
            output,
            script: self.script.clone(),
            record: Rc::clone(&self.record),
            inbox: Rc::clone(&self.inbox),
        }))
    }
}

struct MemoryChild {
    output: OutputOptions,
    script: ChildScript,
    record: Rc<RefCell<ChildRecord>>,
    inbox: Rc<RefCell<AssetMap>>,
}

impl ChildCompiler for MemoryChild {
    fn set_target(&mut self, target: Target) {
        self.record.borrow_mut().target = target;
    }

    fn add_externals(&mut self, _kind: ExternalsType, modules: &[String]) {
        self.record
            .borrow_mut()
            .externals
            .extend(modules.iter().cloned());
    }

    fn add_entry(&mut self, entry: EntryOptions) {
        self.record.borrow_mut().entries.push(entry);
    }

    fn run_as_child(self: Box<Self>) -> Result<ChildCompilation> {
        let mut record = self.record.borrow_mut();
        record.runs += 1;

        if let Some(message) = &self.script.crash {
            bail!("{message}");
        }

        let mut result = ChildCompilation {
            hash: self.script.hash.clone(),
            errors: self.script.errors.clone(),
            ..Default::default()
        };
        if !result.errors.is_empty() {
            return Ok(result);
        }

        for entry in &record.entries {
            result.file_dependencies.insert(entry.request.clone());
            if let Some(source) = self.script.sources.get(&entry.request) {
                let file = self.output.asset_path(&entry.name, &result.hash);
                result
                    .assets
                    .insert(file, RawSource::new(source.as_bytes()));
            }
        }

        self.inbox.borrow_mut().extend(result.assets.clone());
        Ok(result)
    }
}
