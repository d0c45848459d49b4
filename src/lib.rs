//! Render a Markdown file to a styled HTML document, then to a PDF.
//!
//! ```text
//! submission-file.md ─ load ─▶ Markdown ─ render_document ─▶ HTML ─ export ─▶ submission-file.pdf
//! ```
//!
//! Every stage runs once, in order, and the first error ends the run.

mod block;
pub mod config;
pub mod error;
pub mod exporter;
pub mod html;
pub mod loader;
mod parser;
pub mod style;
mod typst;

use std::path::PathBuf;

pub use block::{Block, Document, List, ListItem, Span};
pub use config::Config;
pub use error::{Error, Result};
pub use exporter::{export, html_to_pdf, html_to_typst};
pub use html::{markdown_to_html, render_document};
pub use loader::load;
pub use parser::parse_html;
pub use style::Theme;

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub input: PathBuf,
    pub output: PathBuf,
    pub html: Option<PathBuf>,
    pub html_bytes: usize,
    pub pdf_bytes: usize,
}

/// Convert Markdown to PDF bytes.
pub fn markdown_to_pdf(markdown: &str, config: &Config) -> Result<Vec<u8>> {
    html_to_pdf(&render_document(markdown), config)
}

/// Run the whole pipeline with the files named in `config`.
pub fn run(config: &Config) -> Result<Summary> {
    let files = &config.files;

    let markdown = load(&files.input)?;
    tracing::info!(input = %files.input.display(), "loaded markdown");

    let html = render_document(&markdown);
    tracing::info!(bytes = html.len(), "rendered html");

    if let Some(path) = &files.html {
        exporter::write_atomic(path, html.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote html");
    }

    let pdf_bytes = export(&html, &files.output, config)?;
    tracing::info!(output = %files.output.display(), bytes = pdf_bytes, "wrote pdf");

    Ok(Summary {
        input: files.input.clone(),
        output: files.output.clone(),
        html: files.html.clone(),
        html_bytes: html.len(),
        pdf_bytes,
    })
}
