//! HTML document to paginated PDF.
//!
//! The document is read back into blocks, its stylesheet is turned into a
//! [`Theme`], and the result is laid out and paginated by Typst.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use typst_as_lib::TypstEngine;
use typst_as_lib::typst_kit_options::TypstKitFontOptions;
use typst_library::layout::PagedDocument;
use typst_pdf::PdfOptions;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::parser;
use crate::style::Theme;
use crate::typst;

/// Convert an HTML document to Typst markup.
pub fn html_to_typst(html: &str, config: &Config) -> String {
    let doc = parser::parse_html(html);
    let theme = Theme::from_css(&doc.stylesheet);
    tracing::debug!(blocks = doc.blocks.len(), "parsed html");
    typst::document_to_typst(&doc, &theme, &config.page)
}

/// Compile Typst markup to a paged document.
fn compile_document(markup: String, config: &Config) -> Result<PagedDocument> {
    let font_options = TypstKitFontOptions::new()
        .include_embedded_fonts(true)
        .include_system_fonts(config.fonts.system);

    let engine = TypstEngine::builder()
        .main_file(markup)
        .search_fonts_with(font_options)
        .build();

    let compiled = engine.compile();
    for warning in &compiled.warnings {
        tracing::warn!(message = %warning.message, "layout warning");
    }
    let doc: PagedDocument = compiled
        .output
        .map_err(|e| Error::Render(format!("Typst compilation failed: {:?}", e)))?;
    Ok(doc)
}

/// Convert an HTML document to PDF bytes.
pub fn html_to_pdf(html: &str, config: &Config) -> Result<Vec<u8>> {
    let markup = html_to_typst(html, config);
    let doc = compile_document(markup, config)?;
    tracing::debug!(pages = doc.pages.len(), "laid out document");

    typst_pdf::pdf(&doc, &PdfOptions::default()).map_err(|errors| {
        let messages: Vec<&str> = errors.iter().map(|d| d.message.as_str()).collect();
        Error::Render(format!("PDF generation failed: {}", messages.join("; ")))
    })
}

/// Render `html` to a PDF at `path`, replacing any existing file.
///
/// Returns the number of bytes written.
pub fn export(html: &str, path: &Path, config: &Config) -> Result<usize> {
    let pdf = html_to_pdf(html, config)?;
    write_atomic(path, &pdf)?;
    Ok(pdf.len())
}

/// Write `bytes` to a temporary file beside `path`, then rename it over `path`.
///
/// On failure the temporary file is removed and `path` is left untouched.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::file_access(path, e))?;
    tmp.write_all(bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| Error::file_access(path, e))?;
    tmp.persist(path)
        .map_err(|e| Error::file_access(path, e.error))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote file");
    Ok(())
}
