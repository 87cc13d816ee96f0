//! Build error types.
//!
//! Everything raised inside the `make` and `emit` hooks is fatal for the
//! current build. Functions return `anyhow::Result`; callers that need to
//! react to a specific failure can `downcast_ref::<Error>()`.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the pre-rendering pipeline
#[derive(Debug, Error)]
pub enum Error {
    #[error("Child compilation failed:\n{0}")]
    ChildCompilation(String),

    #[error("Child compilation produced no asset `{file}` for page `{page}`")]
    MissingAsset { page: String, file: String },

    #[error("The child compilation didn't provide a result for page `{page}`")]
    MissingSource { page: String },

    #[error("Page `{name}` is defined twice: `{}` and `{}`", .first.display(), .second.display())]
    DuplicatePage {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Page evaluation failed: {0}")]
    Sandbox(String),

    #[error("`emit` was called before `make` produced any pages")]
    PhaseOrder,
}
