//! Pre-render page components to static HTML as part of a bundler build.
//!
//! Every file under the pages root is compiled into a node-runnable module by
//! a child compilation of the host build, evaluated in an isolated sandbox,
//! rendered to a string and wrapped in an HTML document that loads the
//! host's client bundles. The files are added to the host's output assets.
//!
//! ```text
//! make:  scan ──► compile_pages ──► CompiledPages
//! emit:  evaluate ──► render ──► "<name>.html" / "<code>.html"
//! ```
//!
//! The host is abstracted by the traits in [`host`]; [`host::standalone`]
//! implements them with esbuild so the crate also runs as a CLI.

pub mod build;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod host;
pub mod plugin;
pub mod render;
pub mod sandbox;
pub mod scan;
pub mod utils;

pub use error::Error;
pub use plugin::{Options, StaticPages};
