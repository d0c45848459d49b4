//! Markdown to HTML, wrapped in the fixed document shell.

use pulldown_cmark::{Options, Parser, html};

/// Stylesheet embedded in every rendered document.
pub const STYLESHEET: &str = r#"
        body {
            font-family: Arial, sans-serif;
            line-height: 1.6;
            margin: 40px;
        }
        h1 {
            color: #333;
            border-bottom: 2px solid #eee;
            padding-bottom: 10px;
        }
        h2 {
            color: #444;
            margin-top: 30px;
        }
        a {
            color: #0066cc;
            text-decoration: none;
        }
        a:hover {
            text-decoration: underline;
        }
"#;

const HEAD: &str = "<!DOCTYPE html>\n<html>\n<head>\n    <meta charset=\"utf-8\" />\n    <style>";
const BODY_OPEN: &str = "    </style>\n</head>\n<body>\n";
const TAIL: &str = "</body>\n</html>\n";

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_YAML_STYLE_METADATA_BLOCKS);
    options
}

/// Convert Markdown to an HTML fragment (no `html`/`head`/`body`).
pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Wrap an HTML fragment in the document shell.
pub fn wrap_fragment(fragment: &str) -> String {
    let mut out = String::with_capacity(
        HEAD.len() + STYLESHEET.len() + BODY_OPEN.len() + fragment.len() + TAIL.len(),
    );
    out.push_str(HEAD);
    out.push_str(STYLESHEET);
    out.push_str(BODY_OPEN);
    out.push_str(fragment);
    out.push_str(TAIL);
    out
}

/// Convert Markdown to a complete, styled HTML document.
pub fn render_document(markdown: &str) -> String {
    let fragment = markdown_to_html(markdown);
    tracing::debug!(fragment_bytes = fragment.len(), "converted markdown");
    wrap_fragment(&fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_block(doc: &str) -> &str {
        let start = doc.find("<style>").unwrap();
        let end = doc.find("</style>").unwrap();
        &doc[start..end]
    }

    #[test]
    fn heading_bold_and_link() {
        let html =
            markdown_to_html("# Title\n\nSome **bold** text with a [link](http://example.com).");
        assert!(html.contains("<h1>Title</h1>"), "got: {html}");
        assert!(html.contains("<p>Some <strong>bold</strong> text"), "got: {html}");
        assert!(html.contains(r#"<a href="http://example.com">link</a>"#), "got: {html}");
    }

    #[test]
    fn document_has_single_shell() {
        let doc = render_document("# One\n\n## Two\n\ntext");
        assert_eq!(doc.matches("<html>").count(), 1);
        assert_eq!(doc.matches("<head>").count(), 1);
        assert_eq!(doc.matches("<body>").count(), 1);
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains(r#"<meta charset="utf-8" />"#));
    }

    #[test]
    fn style_block_is_identical_for_any_input() {
        let a = render_document("");
        let b = render_document("# Heading\n\n* list\n* items\n\n```\ncode\n```");
        assert_eq!(style_block(&a), style_block(&b));
        assert!(style_block(&a).contains("padding-bottom: 10px;"));
    }

    #[test]
    fn empty_input_gives_empty_body() {
        let doc = render_document("");
        assert!(doc.contains("<body>\n</body>"), "got: {doc}");
    }

    #[test]
    fn body_holds_fragment_verbatim() {
        let md = "text with <em>raw</em> html & ampersand";
        let doc = render_document(md);
        let fragment = markdown_to_html(md);
        assert!(doc.contains(&format!("<body>\n{fragment}</body>")));
    }

    #[test]
    fn rendering_is_idempotent() {
        let md = "# A\n\n1. one\n2. two\n\n> quote";
        assert_eq!(render_document(md), render_document(md));
    }

    #[test]
    fn front_matter_is_dropped() {
        let html = markdown_to_html("---\ntitle: x\n---\n\nBody");
        assert_eq!(html, "<p>Body</p>\n");
    }

    #[test]
    fn unknown_syntax_passes_through_as_text() {
        let html = markdown_to_html("{{ not markdown }} ~");
        assert_eq!(html, "<p>{{ not markdown }} ~</p>\n");
    }

    #[test]
    fn extensions_are_enabled() {
        let html = markdown_to_html("| a |\n|---|\n| 1 |\n\n~~gone~~\n\n- [x] done");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains(r#"type="checkbox""#), "got: {html}");
        assert!(html.contains(r#"checked="""#), "got: {html}");
    }
}
