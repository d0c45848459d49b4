use crate::block::{Block, Document, List, Span};
use crate::config::PageConfig;
use crate::style::{Border, Color, HeadingStyle, LineStyle, Theme};

/// Lists with at most this many items are kept on one page.
const SMALL_LIST_ITEMS: usize = 5;
/// Code blocks with at most this many lines are kept on one page.
const SMALL_CODE_LINES: usize = 20;
/// Typst measures leading from a baseline to the next line's cap height.
const CAP_HEIGHT_EM: f64 = 0.7;

/// Convert a parsed HTML document to Typst markup styled by `theme`.
pub fn document_to_typst(doc: &Document, theme: &Theme, page: &PageConfig) -> String {
    let mut out = preamble(theme, page, doc.title().as_deref());
    out.push('\n');
    out.push_str(&blocks_to_typst(&doc.blocks));
    out
}

fn preamble(theme: &Theme, page: &PageConfig, title: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("#set document(title: {})\n", string_literal(title.trim())));
    }

    let [top, right, bottom, left] = theme.page_margin_pt();
    out.push_str(&format!(
        "#set page(paper: {}, margin: (top: {}pt, right: {}pt, bottom: {}pt, left: {}pt){})\n",
        string_literal(&page.paper),
        num(top),
        num(right),
        num(bottom),
        num(left),
        if page.numbers { ", numbering: \"1\"" } else { "" },
    ));

    let fonts: Vec<String> = font_stack(&theme.font_families)
        .iter()
        .map(|f| string_literal(f))
        .collect();
    out.push_str(&format!(
        "#set text(font: ({},), size: {}pt{})\n",
        fonts.join(", "),
        num(theme.font_size_pt),
        fill(theme.text_color),
    ));

    let leading = (theme.line_height - CAP_HEIGHT_EM).max(0.0);
    out.push_str(&format!(
        "#set par(leading: {}em, spacing: {}em, linebreaks: \"optimized\")\n",
        num(leading),
        num(leading + 1.0),
    ));

    for (i, heading) in theme.headings.iter().enumerate() {
        heading_rule(i + 1, heading, &mut out);
    }

    if let Some(color) = theme.link.color {
        out.push_str(&format!("#show link: set text(fill: {})\n", rgb(color)));
    }
    if theme.link.underline {
        out.push_str("#show link: underline\n");
    }

    out
}

fn heading_rule(level: usize, style: &HeadingStyle, out: &mut String) {
    out.push_str(&format!(
        "#show heading.where(level: {level}): it => block(width: 100%, above: {}pt, below: {}pt, sticky: true",
        num(style.margin_top_pt),
        num(style.margin_bottom_pt),
    ));
    if style.padding_bottom_pt > 0.0 {
        out.push_str(&format!(", inset: (bottom: {}pt)", num(style.padding_bottom_pt)));
    }
    if let Some(border) = style.border_bottom {
        out.push_str(&format!(", stroke: (bottom: {})", stroke(border)));
    }
    out.push_str(&format!(
        ", text(size: {}pt, weight: \"bold\"{}, it.body))\n",
        num(style.size_pt),
        fill(style.color),
    ));
}

/// Expand generic CSS families to concrete font names.
fn font_stack(families: &[String]) -> Vec<String> {
    let mut stack: Vec<String> = Vec::new();
    for family in families {
        let expanded: &[&str] = match family.to_ascii_lowercase().as_str() {
            "sans-serif" | "system-ui" => &["Liberation Sans", "DejaVu Sans", "Helvetica", "Arial"],
            "serif" => &["Libertinus Serif", "Liberation Serif", "Times New Roman"],
            "monospace" => &["DejaVu Sans Mono", "Liberation Mono", "Courier New"],
            _ => &[],
        };
        let names: Vec<&str> = if expanded.is_empty() {
            vec![family.as_str()]
        } else {
            expanded.to_vec()
        };
        for name in names {
            if !stack.iter().any(|s| s.eq_ignore_ascii_case(name)) {
                stack.push(name.to_string());
            }
        }
    }
    stack
}

fn stroke(border: Border) -> String {
    let dash = match border.style {
        LineStyle::Solid => "solid",
        LineStyle::Dashed => "dashed",
        LineStyle::Dotted => "dotted",
    };
    format!(
        "(paint: {}, thickness: {}pt, dash: \"{dash}\")",
        rgb(border.color),
        num(border.width_pt),
    )
}

fn fill(color: Option<Color>) -> String {
    color
        .map(|c| format!(", fill: {}", rgb(c)))
        .unwrap_or_default()
}

fn rgb(color: Color) -> String {
    format!("rgb(\"{}\")", color.to_hex())
}

/// Format a number without trailing zeros.
fn num(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Quote a Typst string literal.
fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Convert blocks to Typst markup
pub fn blocks_to_typst(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        emit_block(block, &mut out);
    }
    out
}

fn emit_block(block: &Block, out: &mut String) {
    match block {
        Block::Heading { level, content } => {
            // A line break ends `=` heading syntax, so those headings use the call form
            if content.is_empty() || has_line_break(content) {
                out.push_str(&format!("#heading(level: {level})["));
                spans_to_typst(content, out);
                out.push_str("]\n\n");
            } else {
                for _ in 0..*level {
                    out.push('=');
                }
                out.push(' ');
                spans_to_typst(content, out);
                out.push_str("\n\n");
            }
        }
        Block::Paragraph { content } => {
            spans_to_typst(content, out);
            out.push_str("\n\n");
        }
        Block::CodeBlock { language, content } => {
            let code = content.strip_suffix('\n').unwrap_or(content);
            let small = code.lines().count() <= SMALL_CODE_LINES;
            if small {
                out.push_str("#block(breakable: false)[");
            }
            out.push_str("#raw(block: true, ");
            if let Some(lang) = language {
                out.push_str(&format!("lang: {}, ", string_literal(lang)));
            }
            out.push_str(&string_literal(code));
            out.push(')');
            if small {
                out.push(']');
            }
            out.push_str("\n\n");
        }
        Block::List(list) => {
            // Keep small lists together, let large ones break
            if count_list_items(list) <= SMALL_LIST_ITEMS {
                out.push_str("#block(breakable: false)[");
                list_to_typst(list, out);
                out.push(']');
            } else {
                list_to_typst(list, out);
            }
            out.push_str("\n\n");
        }
        Block::Table { headers, rows } => {
            out.push_str("#block(breakable: false)[\n");
            table_to_typst(headers, rows, out);
            out.push_str("]\n\n");
        }
        Block::Quote(blocks) => {
            out.push_str("#quote(block: true)[");
            out.push_str(blocks_to_typst(blocks).trim_end());
            out.push_str("]\n\n");
        }
        Block::Rule => {
            out.push_str("#line(length: 100%)\n\n");
        }
    }
}

fn count_list_items(list: &List) -> usize {
    let mut count = list.items.len();
    for item in &list.items {
        for block in &item.blocks {
            if let Block::List(nested) = block {
                count += count_list_items(nested);
            }
        }
    }
    count
}

fn spans_to_typst(spans: &[Span], out: &mut String) {
    for span in spans {
        span_to_typst(span, out);
    }
}

fn span_to_typst(span: &Span, out: &mut String) {
    match span {
        Span::Text(text) => escape_text(text, out),
        Span::Bold(inner) => {
            out.push_str("#strong[");
            spans_to_typst(inner, out);
            out.push(']');
        }
        Span::Italic(inner) => {
            out.push_str("#emph[");
            spans_to_typst(inner, out);
            out.push(']');
        }
        Span::Strike(inner) => {
            out.push_str("#strike[");
            spans_to_typst(inner, out);
            out.push(']');
        }
        Span::Code(text) => {
            out.push_str("#raw(");
            out.push_str(&string_literal(text));
            out.push(')');
        }
        Span::Link { url, content } => {
            if url.is_empty() {
                spans_to_typst(content, out);
                return;
            }
            out.push_str("#link(");
            out.push_str(&string_literal(url));
            out.push(')');
            if !content.is_empty() {
                out.push('[');
                spans_to_typst(content, out);
                out.push(']');
            }
        }
        Span::Image { alt } => escape_text(alt, out),
        Span::LineBreak => {
            out.push_str(" \\\n");
        }
    }
}

fn has_line_break(spans: &[Span]) -> bool {
    spans.iter().any(|span| match span {
        Span::LineBreak => true,
        Span::Bold(inner) | Span::Italic(inner) | Span::Strike(inner) => has_line_break(inner),
        Span::Link { content, .. } => has_line_break(content),
        Span::Text(_) | Span::Code(_) | Span::Image { .. } => false,
    })
}

fn escape_text(text: &str, out: &mut String) {
    // A `.` or `(` right after an embedded call would extend the call
    let after_call = out.ends_with(']') || out.ends_with(')');
    let mut prev: Option<char> = None;
    for (i, ch) in text.chars().enumerate() {
        let escape = match ch {
            '#' | '*' | '_' | '@' | '$' | '\\' | '`' | '<' | '>' | '[' | ']' | '~' | '/'
            | '=' | '-' | '+' => true,
            '.' => prev.is_some_and(|p| p.is_ascii_digit()) || (i == 0 && after_call),
            '(' => i == 0 && after_call,
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
        prev = Some(ch);
    }
}

fn list_to_typst(list: &List, out: &mut String) {
    out.push_str(if list.ordered { "#enum(" } else { "#list(" });
    out.push_str(if list.tight { "tight: true" } else { "tight: false" });
    if let Some(start) = list.start {
        out.push_str(&format!(", start: {start}"));
    }
    for item in &list.items {
        out.push_str(", [");
        match item.checked {
            Some(true) => out.push_str("☒ "),
            Some(false) => out.push_str("☐ "),
            None => {}
        }
        out.push_str(blocks_to_typst(&item.blocks).trim_end());
        out.push(']');
    }
    out.push(')');
}

fn table_to_typst(headers: &[Vec<Span>], rows: &[Vec<Vec<Span>>], out: &mut String) {
    let col_count = headers
        .len()
        .max(rows.iter().map(Vec::len).max().unwrap_or(0));
    if col_count == 0 {
        return;
    }

    out.push_str("#table(\n");
    out.push_str(&format!("  columns: {},\n", col_count));

    // Header cells (bold)
    if !headers.is_empty() {
        for i in 0..col_count {
            out.push_str("  [");
            if let Some(cell) = headers.get(i).filter(|c| !c.is_empty()) {
                out.push_str("#strong[");
                spans_to_typst(cell, out);
                out.push(']');
            }
            out.push_str("],\n");
        }
    }

    // Data rows, padded to full width
    for row in rows {
        for i in 0..col_count {
            out.push_str("  [");
            if let Some(cell) = row.get(i) {
                spans_to_typst(cell, out);
            }
            out.push_str("],\n");
        }
    }

    out.push_str(")\n");
}
