//! Page rendering.
//!
//! ```text
//! PageFactory ──render_body(props)──► { html, styles } ──► document() ──► "<!DOCTYPE html>..."
//! ```
//!
//! The style-collection and routing boundaries are applied by the sandbox
//! guest while rendering the body; this module only assembles the document.

pub mod document;

use crate::sandbox::{PageFactory, Session};
use anyhow::Result;
use document::{ShellOptions, document};
use educe::Educe;
use serde::{Deserialize, Serialize};

const DOCTYPE: &str = "<!DOCTYPE html>";

/// Properties passed to a page component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageProps {
    /// Always `true` for pre-rendered pages
    #[serde(rename = "static")]
    pub is_static: bool,
    /// Page name, used as the current route
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// HTTP status code (error page only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Human readable status label (error page only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PageProps {
    /// Props of a regular page.
    pub fn page(url: &str) -> Self {
        Self {
            is_static: true,
            url: Some(url.to_owned()),
            code: None,
            status: None,
        }
    }

    /// Props of one error page instance.
    pub fn error(code: u16, status: &str) -> Self {
        Self {
            is_static: true,
            url: None,
            code: Some(code),
            status: Some(status.to_owned()),
        }
    }
}

/// Output of rendering a page body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RenderedBody {
    pub html: String,
    /// Serialized style elements collected during the render
    pub styles: String,
}

/// `[render]` options: document shell pass-through and post-processing.
///
/// # Example
/// ```toml
/// [render]
/// nonce = "r4nd0m"                      # CSP nonce on script tags
/// root_id = "app"                       # mount point id (default "root")
/// asset_host = "https://cdn.example.com" # script URL prefix (default "/")
/// minify = true
/// ```
#[derive(Debug, Clone, Educe, PartialEq, Eq, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    pub nonce: Option<String>,
    pub root_id: Option<String>,
    pub asset_host: Option<String>,

    /// Minify the emitted documents.
    #[educe(Default = false)]
    pub minify: bool,
}

impl RenderOptions {
    pub fn shell(&self) -> ShellOptions<'_> {
        ShellOptions {
            nonce: self.nonce.as_deref(),
            root_id: self.root_id.as_deref(),
            asset_host: self.asset_host.as_deref(),
        }
    }
}

/// Render a page into a complete HTML document.
pub fn render<S: Session>(
    factory: &mut PageFactory<S>,
    client_files: &[String],
    props: &PageProps,
    options: &RenderOptions,
) -> Result<String> {
    let body = factory.render_body(props)?;
    let page = document(&body.html, client_files, &body.styles, options.shell());
    let html = format!("{DOCTYPE}{page}");

    if options.minify {
        return Ok(String::from_utf8_lossy(&minify_html(html.as_bytes())).into_owned());
    }
    Ok(html)
}

/// Minify HTML using `minify_html` crate.
fn minify_html(html: &[u8]) -> Vec<u8> {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;
    minify_html::minify(html, &cfg)
}

// ============================================================================
// Tests
// ============================================================================
