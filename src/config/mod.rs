//! Build configuration from `static-pages.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                         |
//! |--------------|-------------------------------------------------|
//! | `[pages]`    | Pages root, extensions, error page and statuses |
//! | `[render]`   | Document shell (nonce, root id, asset host)     |
//! | `[runtime]`  | Node command pages are evaluated with           |
//! | `[bundler]`  | esbuild command, client entries, output dir     |
//!
//! # Example
//!
//! ```toml
//! [pages]
//! input_dir = "src/pages"
//! errors = [404, 500]
//!
//! [render]
//! root_id = "app"
//!
//! [bundler]
//! entries = ["src/client.tsx"]
//! output = "dist"
//! ```

mod bundler;
pub mod defaults;
mod error;
mod runtime;

pub use bundler::BundlerConfig;
pub use error::ConfigError;
pub use runtime::RuntimeConfig;

use crate::cli::{Cli, Commands};
use crate::plugin::Options;
use crate::render::RenderOptions;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name.
pub const CONFIG_FILE: &str = "static-pages.toml";

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing `static-pages.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticPagesConfig {
    /// Project root (set from CLI `--root`)
    #[serde(skip)]
    pub root: Option<PathBuf>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Plugin options
    #[serde(default)]
    pub pages: Options,

    /// Document options
    #[serde(default)]
    pub render: RenderOptions,

    /// Page evaluation runtime
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Standalone bundler settings
    #[serde(default)]
    pub bundler: BundlerConfig,
}

impl StaticPagesConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: StaticPagesConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the project root directory
    pub fn get_root(&self) -> &Path {
        self.root.as_deref().unwrap_or(Path::new("./"))
    }

    pub fn set_root(&mut self, path: &Path) {
        self.root = Some(path.to_path_buf())
    }

    /// Plugin options with the `[render]` section applied.
    pub fn plugin_options(&self) -> Options {
        Options {
            render: self.render.clone(),
            ..self.pages.clone()
        }
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());
        let root = Self::normalize_path(&root);

        self.set_root(&root);
        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.bundler.output = Self::normalize_path(&root.join(&self.bundler.output));

        match &cli.command {
            Commands::Build { build_args } => {
                Self::update_option(&mut self.render.minify, build_args.minify.as_ref());
                if build_args.clean {
                    self.bundler.clean = true;
                }
            }
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before a build
    pub fn validate(&self) -> Result<()> {
        if self.pages.errors.iter().any(|code| !(100..=599).contains(code)) {
            bail!(ConfigError::Validation(
                "[pages.errors] must contain HTTP status codes (100-599)".into()
            ));
        }

        if self.pages.extensions.iter().any(|ext| ext.is_empty() || ext.starts_with('.')) {
            bail!(ConfigError::Validation(
                "[pages.extensions] must be non-empty and without leading dot".into()
            ));
        }

        if self.pages.error_page.is_empty() {
            bail!(ConfigError::Validation("[pages.error_page] must not be empty".into()));
        }

        let pages_root = self.get_root().join(&self.pages.input_dir);
        if !pages_root.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[pages.input_dir] `{}` is not a directory",
                pages_root.display()
            )));
        }

        for entry in &self.bundler.entries {
            if !self.get_root().join(entry).is_file() {
                bail!(ConfigError::Validation(format!(
                    "[bundler.entries] `{}` not found",
                    entry.display()
                )));
            }
        }

        Self::check_command_installed("[runtime.command]", &self.runtime.command)?;
        Self::check_command_installed("[bundler.command]", &self.bundler.command)?;

        Ok(())
    }

    /// Check if a command is installed and available
    fn check_command_installed(field: &str, command: &[String]) -> Result<()> {
        let Some(cmd) = command.first() else {
            bail!(ConfigError::Validation(format!(
                "{field} must have at least one element"
            )));
        };

        which::which(cmd)
            .with_context(|| format!("`{cmd}` not found. Please install it first."))?;

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
