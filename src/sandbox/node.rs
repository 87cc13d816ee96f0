//! Node.js sandbox.
//!
//! Each [`Sandbox::execute`] spawns a dedicated `node` worker running the
//! embedded bootstrap script. The worker evaluates the page module in a fresh
//! `vm` context (host globals plus a `require` rooted at the project) and
//! renders it on request:
//!
//! ```text
//! NodeSandbox::execute(source)
//!     │ spawn `node -e <bootstrap>` (cwd = project root)
//!     │ ──► {"op":"evaluate","source":...}
//!     │ ◄── {"type":"evaluated","shape":{...}}
//!     ▼
//! NodeSession::render(export, props)
//!       ──► {"op":"render","export":"default","props":{...}}
//!       ◄── {"type":"rendered","html":...,"styles":...}
//! ```
//!
//! Messages are single-line JSON over stdin/stdout; stderr is inherited so
//! page warnings reach the terminal. The worker is killed when its session
//! drops, so no state leaks from one page to the next.

use super::{ExportKey, ExportShape, Sandbox, Session};
use crate::error::Error;
use crate::render::{PageProps, RenderedBody};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Guest script run by every worker.
const BOOTSTRAP: &str = include_str!("bootstrap.js");

// ============================================================================
// Protocol
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum Request<'a> {
    Evaluate {
        source: &'a str,
    },
    Render {
        export: ExportKey,
        props: &'a PageProps,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Response {
    Evaluated { shape: ExportShape },
    Rendered { html: String, styles: String },
    Error { message: String },
}

// ============================================================================
// Sandbox
// ============================================================================

/// Sandbox backed by one `node` process per page.
#[derive(Debug, Clone)]
pub struct NodeSandbox {
    command: Vec<String>,
    root: PathBuf,
}

impl NodeSandbox {
    /// `command` is the node invocation (e.g. `["node"]`), `root` the project
    /// directory externals are resolved from.
    pub fn new(command: Vec<String>, root: &Path) -> Self {
        Self {
            command,
            root: root.to_path_buf(),
        }
    }
}

impl Sandbox for NodeSandbox {
    type Session = NodeSession;

    fn execute(&self, source: &str) -> Result<(NodeSession, ExportShape)> {
        let mut worker = Worker::spawn(&self.command, &self.root)?;
        worker.send(&Request::Evaluate { source })?;

        match worker.recv()? {
            Response::Evaluated { shape } => Ok((NodeSession { worker }, shape)),
            Response::Error { message } => bail!(Error::Sandbox(message)),
            other => bail!("Unexpected response from node worker: {other:?}"),
        }
    }
}

/// A worker holding one evaluated page module.
pub struct NodeSession {
    worker: Worker,
}

impl Session for NodeSession {
    fn render(&mut self, export: ExportKey, props: &PageProps) -> Result<RenderedBody> {
        self.worker.send(&Request::Render { export, props })?;

        match self.worker.recv()? {
            Response::Rendered { html, styles } => Ok(RenderedBody { html, styles }),
            Response::Error { message } => bail!(Error::Sandbox(message)),
            other => bail!("Unexpected response from node worker: {other:?}"),
        }
    }
}

// ============================================================================
// Worker Process
// ============================================================================

struct Worker {
    name: String,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl Worker {
    fn spawn(command: &[String], root: &Path) -> Result<Self> {
        let name = command.first().context("Empty node command")?.to_owned();

        let mut child = Command::new(&name)
            .args(&command[1..])
            .arg("-e")
            .arg(BOOTSTRAP)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn `{name}`"))?;

        let stdin = child.stdin.take().context("Failed to acquire worker stdin")?;
        let stdout = child
            .stdout
            .take()
            .context("Failed to acquire worker stdout")?;

        Ok(Self {
            name,
            child,
            stdin: BufWriter::new(stdin),
            stdout: BufReader::new(stdout),
        })
    }

    fn send(&mut self, request: &Request<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.stdin, request)
            .with_context(|| format!("Failed to write to `{}` worker", self.name))?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Response> {
        let mut line = String::new();
        let read = self
            .stdout
            .read_line(&mut line)
            .with_context(|| format!("Failed to read from `{}` worker", self.name))?;
        if read == 0 {
            let status = self.child.wait().ok();
            bail!(Error::Sandbox(format!(
                "`{}` worker exited unexpectedly ({})",
                self.name,
                status.map_or_else(|| "unknown status".to_owned(), |s| s.to_string())
            )));
        }

        serde_json::from_str(&line).with_context(|| {
            format!("Malformed message from `{}` worker: {}", self.name, line.trim())
        })
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ============================================================================
// Tests
// ============================================================================
