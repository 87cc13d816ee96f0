//! Standalone build orchestration.
//!
//! # Architecture
//!
//! ```text
//! build()
//!     │
//!     ├── prepare_output()          ──► clean / create output directory
//!     │
//!     ├── bundle_client()           ──► client assets + initial chunk groups
//!     │
//!     ├── run_plugins()
//!     │       ├── make()            ──► scan + child compilation
//!     │       └── emit()            ──► "<page>.html", "<code>.html"
//!     │
//!     └── write_assets()            ──► output directory
//! ```

use crate::{
    config::StaticPagesConfig,
    host::{AssetMap, Compilation, Plugin, standalone::StandaloneCompilation},
    log,
    plugin::StaticPages,
    sandbox::node::NodeSandbox,
};
use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Build the project described by `config` into its output directory.
///
/// Returns the number of files written.
pub fn build(config: &StaticPagesConfig) -> Result<usize> {
    let root = config.get_root();
    let output = &config.bundler.output;

    prepare_output(output, config.bundler.clean)?;

    let mut compilation = StandaloneCompilation::new(root, &config.bundler);
    compilation.bundle_client(&config.bundler.entries)?;

    let sandbox = NodeSandbox::new(config.runtime.command.clone(), root);
    let mut plugin = StaticPages::new(config.plugin_options(), sandbox);
    run_plugins(&mut [&mut plugin], &mut compilation)?;

    let count = write_assets(compilation.assets_mut(), output)?;
    log!("build"; "{count} files written to {}", output.display());
    Ok(count)
}

/// Call each plugin's hooks in host order: every `make`, then every `emit`.
pub fn run_plugins(
    plugins: &mut [&mut dyn Plugin],
    compilation: &mut dyn Compilation,
) -> Result<()> {
    for plugin in plugins.iter_mut() {
        let name = plugin.name();
        plugin
            .make(compilation)
            .with_context(|| format!("{name}: make failed"))?;
    }
    for plugin in plugins.iter_mut() {
        let name = plugin.name();
        plugin
            .emit(compilation)
            .with_context(|| format!("{name}: emit failed"))?;
    }
    Ok(())
}

/// Create the output directory, removing old content first when `clean`.
fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output).with_context(|| {
            format!("Failed to clear output directory: {}", output.display())
        })?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

/// Write every asset below `output`, creating parent directories.
fn write_assets(assets: &AssetMap, output: &Path) -> Result<usize> {
    for (name, source) in assets {
        let path = output.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&path, source.as_bytes())
            .with_context(|| format!("Failed to write asset: {}", path.display()))?;
    }
    Ok(assets.len())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RawSource;
    use crate::host::memory::MemoryCompilation;
    use tempfile::TempDir;

    /// Records hook calls into a shared log.
    struct Recorder<'a> {
        name: &'static str,
        calls: &'a std::cell::RefCell<Vec<String>>,
        fail_make: bool,
    }

    impl<'a> Recorder<'a> {
        fn new(name: &'static str, calls: &'a std::cell::RefCell<Vec<String>>) -> Self {
            Self {
                name,
                calls,
                fail_make: false,
            }
        }
    }

    impl Plugin for Recorder<'_> {
        fn name(&self) -> &'static str {
            self.name
        }

        fn make(&mut self, _: &mut dyn Compilation) -> Result<()> {
            self.calls.borrow_mut().push(format!("{}:make", self.name));
            if self.fail_make {
                anyhow::bail!("boom");
            }
            Ok(())
        }

        fn emit(&mut self, _: &mut dyn Compilation) -> Result<()> {
            self.calls.borrow_mut().push(format!("{}:emit", self.name));
            Ok(())
        }
    }

    #[test]
    fn test_hook_order() {
        let dir = TempDir::new().unwrap();
        let calls = std::cell::RefCell::new(Vec::new());
        let mut a = Recorder::new("a", &calls);
        let mut b = Recorder::new("b", &calls);
        let mut compilation = MemoryCompilation::new(dir.path());

        run_plugins(&mut [&mut a, &mut b], &mut compilation).unwrap();

        assert_eq!(*calls.borrow(), ["a:make", "b:make", "a:emit", "b:emit"]);
    }

    #[test]
    fn test_make_failure_skips_emit() {
        let dir = TempDir::new().unwrap();
        let calls = std::cell::RefCell::new(Vec::new());
        let mut a = Recorder::new("a", &calls);
        a.fail_make = true;
        let mut compilation = MemoryCompilation::new(dir.path());

        let err = run_plugins(&mut [&mut a], &mut compilation).unwrap_err();

        assert_eq!(format!("{err}"), "a: make failed");
        assert_eq!(*calls.borrow(), ["a:make"]);
    }

    #[test]
    fn test_write_assets() {
        let dir = TempDir::new().unwrap();
        let mut assets = AssetMap::new();
        assets.insert("index.html".into(), RawSource::new("<p>home</p>"));
        assets.insert("blog/post.html".into(), RawSource::new("<p>post</p>"));

        let count = write_assets(&assets, dir.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(dir.path().join("index.html")).unwrap(), "<p>home</p>");
        assert_eq!(fs::read_to_string(dir.path().join("blog/post.html")).unwrap(), "<p>post</p>");
    }

    #[test]
    fn test_prepare_output_clean() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("dist");
        fs::create_dir_all(&output).unwrap();
        fs::write(output.join("stale.html"), "old").unwrap();

        prepare_output(&output, false).unwrap();
        assert!(output.join("stale.html").exists());

        prepare_output(&output, true).unwrap();
        assert!(output.is_dir());
        assert!(!output.join("stale.html").exists());
    }
}
