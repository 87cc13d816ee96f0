//! Evaluation of compiled page modules.
//!
//! A compiled page is untrusted, freshly built code. It is executed inside a
//! [`Sandbox`]: every call to [`Sandbox::execute`] creates a new isolated
//! context, runs the module once, and hands back a [`Session`] bound to that
//! context together with the [`ExportShape`] of the module's value.
//!
//! # Default Export Convention
//!
//! Pages may be authored as ES modules and compiled to CommonJS. The compiled
//! value is then a namespace object:
//!
//! ```text
//! { __esModule: true, default: Page }   ──►  Page
//! Page                                  ──►  Page
//! { render: ... }                       ──►  { render: ... }
//! ```
//!
//! [`ExportShape::entry`] is the only place that decision is made.

pub mod node;

use crate::error::Error;
use crate::render::{PageProps, RenderedBody};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

// ============================================================================
// Export Shape
// ============================================================================

/// `typeof` class of an evaluated module value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Object,
    Function,
    Other,
}

/// What the sandbox observed about a module's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportShape {
    pub kind: ExportKind,
    /// Truthy `__esModule` marker
    pub es_module: bool,
    /// Truthy `default` property
    pub has_default: bool,
}

/// Which value of the module is the page factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKey {
    /// The module value itself
    Module,
    /// Its `default` property
    Default,
}

impl ExportShape {
    /// Unwrap marked namespace objects to their default export.
    pub const fn entry(&self) -> ExportKey {
        match self {
            Self {
                kind: ExportKind::Object,
                es_module: true,
                has_default: true,
            } => ExportKey::Default,
            _ => ExportKey::Module,
        }
    }
}

// ============================================================================
// Sandbox Interface
// ============================================================================

/// An isolated execution environment for compiled pages.
pub trait Sandbox: Sync {
    type Session: Session;

    /// Run `source` once in a fresh context.
    ///
    /// The context sees the runtime's globals plus a module loader rooted at
    /// the project, so externals resolve against installed dependencies.
    fn execute(&self, source: &str) -> Result<(Self::Session, ExportShape)>;
}

/// A live context holding one evaluated module.
pub trait Session {
    /// Render the selected export as a component with `props`.
    fn render(&mut self, export: ExportKey, props: &PageProps) -> Result<RenderedBody>;
}

/// An evaluated page, ready to render.
///
/// Never shared between pages and dropped at the end of the page's emit step.
pub struct PageFactory<S> {
    session: S,
    export: ExportKey,
}

impl<S: Session> PageFactory<S> {
    pub const fn export(&self) -> ExportKey {
        self.export
    }

    /// Render the page body with `props`.
    pub fn render_body(&mut self, props: &PageProps) -> Result<RenderedBody> {
        self.session.render(self.export, props)
    }
}

/// Evaluate the compiled module of `page`.
///
/// An empty source means the child compilation produced nothing runnable.
pub fn evaluate<X: Sandbox>(
    sandbox: &X,
    page: &str,
    source: &str,
) -> Result<PageFactory<X::Session>> {
    if source.trim().is_empty() {
        bail!(Error::MissingSource {
            page: page.to_owned(),
        });
    }

    let (session, shape) = sandbox.execute(source)?;
    Ok(PageFactory {
        session,
        export: shape.entry(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub mod testing {
    //! Scripted sandbox: understands a tiny line-based "module" format.
    //!
    //! ```text
    //! shape object esmodule default    # reported ExportShape
    //! body <p>Hello</p>                 # html template, {url} {code} {status} replaced
    //! styles <style>p{}</style>
    //! throw boom                        # execution fails with "boom"
    //! ```

    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct ScriptedSandbox {
        /// Every source executed, in order
        pub executed: Mutex<Vec<String>>,
    }

    pub struct ScriptedSession {
        body: String,
        styles: String,
        pub renders: Vec<(ExportKey, PageProps)>,
    }

    impl Sandbox for ScriptedSandbox {
        type Session = ScriptedSession;

        fn execute(&self, source: &str) -> Result<(ScriptedSession, ExportShape)> {
            if let Ok(mut executed) = self.executed.lock() {
                executed.push(source.to_owned());
            }

            let mut shape = ExportShape {
                kind: ExportKind::Function,
                es_module: false,
                has_default: false,
            };
            let mut session = ScriptedSession {
                body: String::new(),
                styles: String::new(),
                renders: Vec::new(),
            };

            for line in source.lines() {
                let (op, rest) = line.split_once(' ').unwrap_or((line, ""));
                match op {
                    "shape" => {
                        shape.kind = if rest.contains("object") {
                            ExportKind::Object
                        } else if rest.contains("function") {
                            ExportKind::Function
                        } else {
                            ExportKind::Other
                        };
                        shape.es_module = rest.contains("esmodule");
                        shape.has_default = rest.contains("default");
                    }
                    "body" => session.body = rest.to_owned(),
                    "styles" => session.styles = rest.to_owned(),
                    "throw" => bail!(Error::Sandbox(rest.to_owned())),
                    _ => {}
                }
            }

            Ok((session, shape))
        }
    }

    impl Session for ScriptedSession {
        fn render(&mut self, export: ExportKey, props: &PageProps) -> Result<RenderedBody> {
            self.renders.push((export, props.clone()));
            let html = self
                .body
                .replace("{url}", props.url.as_deref().unwrap_or(""))
                .replace("{code}", &props.code.map(|c| c.to_string()).unwrap_or_default())
                .replace("{status}", props.status.as_deref().unwrap_or(""))
                .replace("{export}", &format!("{export:?}"));
            Ok(RenderedBody {
                html,
                styles: self.styles.clone(),
            })
        }
    }
}
