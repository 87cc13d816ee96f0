//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [pages] Section Defaults
// ============================================================================

pub mod pages {
    use crate::scan::DEFAULT_EXTENSIONS;
    use std::path::PathBuf;

    pub fn errors() -> Vec<u16> {
        vec![400, 404, 500]
    }

    pub fn input_dir() -> PathBuf {
        "src/pages".into()
    }

    pub fn extensions() -> Vec<String> {
        DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
    }

    pub fn error_page() -> String {
        "_error".into()
    }
}

// ============================================================================
// [runtime] Section Defaults
// ============================================================================

pub mod runtime {
    pub fn command() -> Vec<String> {
        vec!["node".into()]
    }
}

// ============================================================================
// [bundler] Section Defaults
// ============================================================================

pub mod bundler {
    use std::path::PathBuf;

    pub fn command() -> Vec<String> {
        vec!["esbuild".into()]
    }

    pub fn output() -> PathBuf {
        "dist".into()
    }

    pub fn public_path() -> String {
        "/".into()
    }
}
