use std::borrow::Cow;

use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::block::{Block, Document, List, ListItem, Span};

/// Elements whose text never reaches the page.
const HIDDEN_ELEMENTS: &[&str] = &["script", "noscript", "template", "title"];

/// Parse an HTML document into blocks, keeping the text of its `<style>` elements.
///
/// Parsing follows the HTML5 rules, so malformed markup is repaired the way
/// a browser would repair it rather than rejected.
pub fn parse_html(html: &str) -> Document {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    for error in &dom.errors {
        tracing::debug!(%error, "repaired malformed html");
    }

    let mut state = ParseState::new();
    let mut steps = vec![Step::Enter(dom.document.clone())];

    while let Some(step) = steps.pop() {
        let node = match step {
            Step::Leave(name) => {
                state.end_element(&name);
                continue;
            }
            Step::Enter(node) => node,
        };
        match &node.data {
            NodeData::Document => push_children(&mut steps, &node),
            NodeData::Element { name, attrs, .. } => {
                let tag: &str = &name.local;
                if HIDDEN_ELEMENTS.contains(&tag) {
                    continue;
                }
                state.start_element(tag, &attrs.borrow());
                steps.push(Step::Leave(name.local.clone()));
                push_children(&mut steps, &node);
            }
            NodeData::Text { contents } => state.text(&contents.borrow()),
            // Doctype, comments, processing instructions
            _ => {}
        }
    }

    state.finish()
}

/// Pending work of the document walk, which runs on an explicit stack.
enum Step {
    Enter(Handle),
    Leave(LocalName),
}

fn push_children(steps: &mut Vec<Step>, node: &Handle) {
    for child in node.children.borrow().iter().rev() {
        steps.push(Step::Enter(child.clone()));
    }
}

fn attribute(attrs: &[Attribute], key: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| &*attr.name.local == key)
        .map(|attr| attr.value.to_string())
}

fn has_attribute(attrs: &[Attribute], key: &str) -> bool {
    attrs.iter().any(|attr| &*attr.name.local == key)
}

struct ParseState {
    // Nested block containers; the first one is the document body
    frames: Vec<Frame>,

    // Current inline content being built
    spans: Vec<Span>,
    // Enclosing inline elements with the spans collected before them
    span_stack: Vec<(InlineKind, Vec<Span>)>,
    // Block element that owns `spans`, if any
    text_block: Option<TextBlock>,

    // Raw text targets
    in_style: usize,
    stylesheet: String,
    in_pre: bool,
    code_language: Option<String>,
    code_content: String,
    in_code: bool,
    inline_code: String,
}

enum Frame {
    Blocks {
        kind: BlocksKind,
        blocks: Vec<Block>,
        checked: Option<bool>,
    },
    List {
        list: List,
    },
    Table {
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
        current_row: Vec<Vec<Span>>,
        in_head: bool,
    },
}

#[derive(Clone, Copy, PartialEq)]
enum BlocksKind {
    Body,
    Item,
    Quote,
}

#[derive(Clone, Copy)]
enum TextBlock {
    Heading(u8),
    Paragraph,
    Cell,
}

enum InlineKind {
    Bold,
    Italic,
    Strike,
    Link(String),
}

impl ParseState {
    fn new() -> Self {
        Self {
            frames: vec![Frame::Blocks {
                kind: BlocksKind::Body,
                blocks: Vec::new(),
                checked: None,
            }],
            spans: Vec::new(),
            span_stack: Vec::new(),
            text_block: None,
            in_style: 0,
            stylesheet: String::new(),
            in_pre: false,
            code_language: None,
            code_content: String::new(),
            in_code: false,
            inline_code: String::new(),
        }
    }

    fn start_element(&mut self, name: &str, attrs: &[Attribute]) {
        match name {
            "style" => self.in_style += 1,

            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_inline();
                let level = name.as_bytes()[1] - b'0';
                self.text_block = Some(TextBlock::Heading(level));
            }
            "p" => {
                self.flush_inline();
                if let Some(Frame::Blocks {
                    kind: BlocksKind::Item,
                    ..
                }) = self.frames.last()
                {
                    self.mark_list_loose();
                }
                self.text_block = Some(TextBlock::Paragraph);
            }

            "pre" => {
                self.flush_inline();
                self.in_pre = true;
                self.code_language = None;
                self.code_content.clear();
            }
            "code" if self.in_pre => {
                self.code_language = attribute(attrs, "class").and_then(|class| {
                    class
                        .split_whitespace()
                        .find_map(|c| c.strip_prefix("language-"))
                        .map(str::to_string)
                });
            }
            "code" => {
                self.in_code = true;
                self.inline_code.clear();
            }

            "strong" | "b" => self.open_inline(InlineKind::Bold),
            "em" | "i" => self.open_inline(InlineKind::Italic),
            "del" | "s" | "strike" => self.open_inline(InlineKind::Strike),
            "a" => {
                let url = attribute(attrs, "href").unwrap_or_default();
                self.open_inline(InlineKind::Link(url));
            }

            "br" => self.spans.push(Span::LineBreak),
            "img" => {
                let alt = attribute(attrs, "alt").unwrap_or_default();
                self.spans.push(Span::Image { alt });
            }
            "input" => {
                let is_checkbox = attribute(attrs, "type")
                    .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"));
                if is_checkbox {
                    let is_checked = has_attribute(attrs, "checked");
                    if let Some(Frame::Blocks { checked, .. }) = self.frames.last_mut() {
                        *checked = Some(is_checked);
                    }
                }
            }
            "hr" => {
                self.flush_inline();
                self.push_block(Block::Rule);
            }

            "ul" | "ol" => {
                self.flush_inline();
                let ordered = name == "ol";
                let start = if ordered {
                    attribute(attrs, "start")
                        .and_then(|s| s.trim().parse::<u64>().ok())
                        .filter(|&n| n != 1)
                } else {
                    None
                };
                self.frames.push(Frame::List {
                    list: List {
                        ordered,
                        start,
                        tight: true,
                        items: Vec::new(),
                    },
                });
            }
            "li" => {
                self.flush_inline();
                self.frames.push(Frame::Blocks {
                    kind: BlocksKind::Item,
                    blocks: Vec::new(),
                    checked: None,
                });
            }
            "blockquote" => {
                self.flush_inline();
                self.frames.push(Frame::Blocks {
                    kind: BlocksKind::Quote,
                    blocks: Vec::new(),
                    checked: None,
                });
            }

            "table" => {
                self.flush_inline();
                self.frames.push(Frame::Table {
                    headers: Vec::new(),
                    rows: Vec::new(),
                    current_row: Vec::new(),
                    in_head: false,
                });
            }
            "thead" => self.set_table_head(true),
            "tbody" => self.set_table_head(false),
            "tr" => {
                if let Some(Frame::Table { current_row, .. }) = self.frames.last_mut() {
                    current_row.clear();
                }
            }
            "th" | "td" => {
                self.spans.clear();
                self.text_block = Some(TextBlock::Cell);
            }

            // html, head, body, div, span and unknown elements are transparent
            _ => {}
        }
    }

    fn end_element(&mut self, name: &str) {
        match name {
            "style" => self.in_style = self.in_style.saturating_sub(1),

            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" => self.flush_inline(),

            "pre" => {
                self.in_pre = false;
                let content = std::mem::take(&mut self.code_content);
                let language = self.code_language.take();
                self.push_block(Block::CodeBlock { language, content });
            }
            "code" if self.in_code => {
                self.in_code = false;
                let code = std::mem::take(&mut self.inline_code);
                self.spans.push(Span::Code(code));
            }

            "strong" | "b" | "em" | "i" | "del" | "s" | "strike" | "a" => self.close_inline(),

            "li" => {
                self.flush_inline();
                if let Some(Frame::Blocks {
                    kind: BlocksKind::Item,
                    blocks,
                    checked,
                }) = self.frames.pop()
                {
                    let item = ListItem { blocks, checked };
                    match self.frames.last_mut() {
                        Some(Frame::List { list }) => list.items.push(item),
                        // A stray <li> outside a list keeps its content in place
                        _ => {
                            for block in item.blocks {
                                self.push_block(block);
                            }
                        }
                    }
                }
            }
            "ul" | "ol" => {
                self.flush_inline();
                if let Some(Frame::List { list }) = self.frames.pop() {
                    self.push_block(Block::List(list));
                }
            }
            "blockquote" => {
                self.flush_inline();
                if let Some(Frame::Blocks {
                    kind: BlocksKind::Quote,
                    blocks,
                    ..
                }) = self.frames.pop()
                {
                    self.push_block(Block::Quote(blocks));
                }
            }

            "th" | "td" => {
                self.text_block = None;
                let mut cell = std::mem::take(&mut self.spans);
                trim_spans(&mut cell);
                if let Some(Frame::Table { current_row, .. }) = self.frames.last_mut() {
                    current_row.push(cell);
                }
            }
            "tr" => {
                if let Some(Frame::Table {
                    headers,
                    rows,
                    current_row,
                    in_head,
                }) = self.frames.last_mut()
                {
                    let row = std::mem::take(current_row);
                    if *in_head {
                        *headers = row;
                    } else {
                        rows.push(row);
                    }
                }
            }
            "thead" => self.set_table_head(false),
            "table" => {
                if let Some(Frame::Table { headers, rows, .. }) = self.frames.pop() {
                    self.push_block(Block::Table { headers, rows });
                }
            }

            "body" | "div" | "section" | "article" | "main" => self.flush_inline(),

            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_style > 0 {
            self.stylesheet.push_str(text);
        } else if self.in_pre {
            self.code_content.push_str(text);
        } else if self.in_code {
            self.inline_code.push_str(text);
        } else {
            let collapsed = collapse_whitespace(text);
            // Whitespace between block elements carries no content
            if collapsed == " " && self.spans.is_empty() && self.span_stack.is_empty() {
                return;
            }
            push_text(&mut self.spans, &collapsed);
        }
    }

    fn open_inline(&mut self, kind: InlineKind) {
        let outer = std::mem::take(&mut self.spans);
        self.span_stack.push((kind, outer));
    }

    fn close_inline(&mut self) {
        if let Some((kind, mut parent)) = self.span_stack.pop() {
            let content = std::mem::take(&mut self.spans);
            parent.push(match kind {
                InlineKind::Bold => Span::Bold(content),
                InlineKind::Italic => Span::Italic(content),
                InlineKind::Strike => Span::Strike(content),
                InlineKind::Link(url) => Span::Link { url, content },
            });
            self.spans = parent;
        }
    }

    /// Turn pending inline content into a block of the current container.
    fn flush_inline(&mut self) {
        // Close inline elements left open across a block boundary
        while !self.span_stack.is_empty() {
            self.close_inline();
        }
        let mut content = std::mem::take(&mut self.spans);
        trim_spans(&mut content);
        match self.text_block.take() {
            Some(TextBlock::Heading(level)) => self.push_block(Block::Heading { level, content }),
            Some(TextBlock::Cell) => {
                if let Some(Frame::Table { current_row, .. }) = self.frames.last_mut() {
                    current_row.push(content);
                }
            }
            Some(TextBlock::Paragraph) | None => {
                if !content.is_empty() {
                    self.push_block(Block::Paragraph { content });
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.frames.last_mut() {
            Some(Frame::Blocks { blocks, .. }) => blocks.push(block),
            _ => tracing::debug!(?block, "dropping content outside a list item or table cell"),
        }
    }

    fn mark_list_loose(&mut self) {
        if let Some(Frame::List { list }) = self.frames.iter_mut().rev().nth(1) {
            list.tight = false;
        }
    }

    fn set_table_head(&mut self, head: bool) {
        if let Some(Frame::Table { in_head, .. }) = self.frames.last_mut() {
            *in_head = head;
        }
    }

    fn finish(mut self) -> Document {
        self.flush_inline();
        // Unwind containers left open by lenient markup
        while self.frames.len() > 1 {
            match self.frames.pop() {
                Some(Frame::Blocks { blocks, .. }) => {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
                Some(Frame::List { list }) => self.push_block(Block::List(list)),
                Some(Frame::Table { headers, rows, .. }) => {
                    self.push_block(Block::Table { headers, rows })
                }
                None => {}
            }
        }
        let blocks = match self.frames.pop() {
            Some(Frame::Blocks { blocks, .. }) => blocks,
            _ => Vec::new(),
        };
        Document {
            stylesheet: self.stylesheet,
            blocks,
        }
    }
}

fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    if !text.contains(|c: char| c.is_ascii_whitespace() && c != ' ') && !text.contains("  ") {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    Cow::Owned(out)
}

fn push_text(spans: &mut Vec<Span>, text: &str) {
    match spans.last_mut() {
        Some(Span::Text(last)) => {
            if last.ends_with(' ') && text.starts_with(' ') {
                last.push_str(&text[1..]);
            } else {
                last.push_str(text);
            }
        }
        // A new line starts after a break
        Some(Span::LineBreak) => {
            let text = text.trim_start();
            if !text.is_empty() {
                spans.push(Span::Text(text.to_string()));
            }
        }
        _ => spans.push(Span::Text(text.to_string())),
    }
}

/// Drop leading and trailing whitespace of a run of spans.
fn trim_spans(spans: &mut Vec<Span>) {
    if let Some(Span::Text(first)) = spans.first_mut() {
        let trimmed = first.trim_start_matches(' ');
        if trimmed.len() != first.len() {
            *first = trimmed.to_string();
        }
    }
    if let Some(Span::Text(last)) = spans.last_mut() {
        let trimmed = last.trim_end_matches(' ');
        if trimmed.len() != last.len() {
            *last = trimmed.to_string();
        }
    }
    spans.retain(|span| !matches!(span, Span::Text(t) if t.is_empty()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::render_document;

    fn body(html: &str) -> Vec<Block> {
        parse_html(html).blocks
    }

    fn text(s: &str) -> Span {
        Span::Text(s.to_string())
    }

    #[test]
    fn reads_rendered_document() {
        let doc = parse_html(&render_document(
            "# Title\n\nSome **bold** text with a [link](http://example.com).",
        ));

        assert!(doc.stylesheet.contains("border-bottom: 2px solid #eee;"));
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading {
                    level: 1,
                    content: vec![text("Title")],
                },
                Block::Paragraph {
                    content: vec![
                        text("Some "),
                        Span::Bold(vec![text("bold")]),
                        text(" text with a "),
                        Span::Link {
                            url: "http://example.com".into(),
                            content: vec![text("link")],
                        },
                        text("."),
                    ],
                },
            ]
        );
        assert_eq!(doc.title().as_deref(), Some("Title"));
    }

    #[test]
    fn empty_body() {
        let doc = parse_html(&render_document(""));
        assert!(doc.blocks.is_empty());
        assert!(!doc.stylesheet.is_empty());
    }

    #[test]
    fn entities_are_resolved() {
        assert_eq!(
            body("<p>a &amp; b &lt;c&gt; &nbsp;&#169;</p>"),
            vec![Block::Paragraph {
                content: vec![text("a & b <c> \u{a0}\u{a9}")],
            }]
        );
    }

    #[test]
    fn soft_breaks_collapse_to_spaces() {
        assert_eq!(
            body("<p>line one\nline two</p>"),
            vec![Block::Paragraph {
                content: vec![text("line one line two")],
            }]
        );
    }

    #[test]
    fn void_elements_need_no_closing_tag() {
        assert_eq!(
            body("<p>a<br>b</p><hr>"),
            vec![
                Block::Paragraph {
                    content: vec![text("a"), Span::LineBreak, text("b")],
                },
                Block::Rule,
            ]
        );
    }

    #[test]
    fn code_block_keeps_whitespace_and_language() {
        assert_eq!(
            body("<pre><code class=\"language-rust\">fn main() {\n    x &lt; 1;\n}\n</code></pre>"),
            vec![Block::CodeBlock {
                language: Some("rust".into()),
                content: "fn main() {\n    x < 1;\n}\n".into(),
            }]
        );
    }

    #[test]
    fn inline_code() {
        assert_eq!(
            body("<p>use <code>a  *b*</code></p>"),
            vec![Block::Paragraph {
                content: vec![text("use "), Span::Code("a  *b*".into())],
            }]
        );
    }

    #[test]
    fn tight_nested_list() {
        let blocks = body("<ul>\n<li>one\n<ol start=\"3\">\n<li>inner</li>\n</ol>\n</li>\n<li>two</li>\n</ul>");
        let Block::List(list) = &blocks[0] else {
            panic!("expected list, got {blocks:?}");
        };
        assert!(!list.ordered);
        assert!(list.tight);
        assert_eq!(list.items.len(), 2);
        assert_eq!(
            list.items[0].blocks[0],
            Block::Paragraph {
                content: vec![text("one")],
            }
        );
        let Block::List(inner) = &list.items[0].blocks[1] else {
            panic!("expected nested list");
        };
        assert!(inner.ordered);
        assert_eq!(inner.start, Some(3));
    }

    #[test]
    fn loose_list() {
        let blocks = body("<ol>\n<li>\n<p>one</p>\n</li>\n<li>\n<p>two</p>\n</li>\n</ol>");
        let Block::List(list) = &blocks[0] else {
            panic!("expected list");
        };
        assert!(!list.tight);
        assert_eq!(list.start, None);
    }

    #[test]
    fn task_items() {
        let html = render_document("- [x] done\n- [ ] todo");
        let blocks = parse_html(&html).blocks;
        let Block::List(list) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.items[0].checked, Some(true));
        assert_eq!(list.items[1].checked, Some(false));
    }

    #[test]
    fn blockquote_and_table() {
        let html = render_document("> quoted\n\n| A | B |\n|---|---|\n| 1 | 2 |");
        let blocks = parse_html(&html).blocks;
        assert_eq!(
            blocks[0],
            Block::Quote(vec![Block::Paragraph {
                content: vec![text("quoted")],
            }])
        );
        assert_eq!(
            blocks[1],
            Block::Table {
                headers: vec![vec![text("A")], vec![text("B")]],
                rows: vec![vec![vec![text("1")], vec![text("2")]]],
            }
        );
    }

    #[test]
    fn unknown_elements_are_transparent() {
        assert_eq!(
            body("<div><p>in <span class=\"x\">span</span></p></div>"),
            vec![Block::Paragraph {
                content: vec![text("in span")],
            }]
        );
    }

    #[test]
    fn image_keeps_alt_text() {
        assert_eq!(
            body("<p><img src=\"a.png\" alt=\"diagram\" /></p>"),
            vec![Block::Paragraph {
                content: vec![Span::Image {
                    alt: "diagram".into(),
                }],
            }]
        );
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        assert_eq!(
            body("<div>kept</span></div><p>a</p></p>"),
            vec![
                Block::Paragraph {
                    content: vec![text("kept")],
                },
                Block::Paragraph {
                    content: vec![text("a")],
                },
            ]
        );
    }

    #[test]
    fn unclosed_elements_end_with_the_document() {
        assert_eq!(
            body("<body><blockquote><p>text"),
            vec![Block::Quote(vec![Block::Paragraph {
                content: vec![text("text")],
            }])]
        );
    }

    #[test]
    fn bare_ampersand_in_raw_html_block() {
        let doc = parse_html(&render_document("<div>\nA & B\n</div>"));
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph {
                content: vec![text("A & B")],
            }]
        );
    }

    #[test]
    fn bare_ampersand_in_href() {
        let doc = parse_html(&render_document("<a href=\"/q?a=1&b=2\">x</a>"));
        assert_eq!(
            doc.blocks,
            vec![Block::Paragraph {
                content: vec![Span::Link {
                    url: "/q?a=1&b=2".into(),
                    content: vec![text("x")],
                }],
            }]
        );
    }

    #[test]
    fn script_text_is_not_laid_out() {
        let doc = parse_html(&render_document(
            "before\n\n<script>\nif (a < b) { x(); }\n</script>\n\nafter",
        ));
        assert_eq!(
            doc.blocks,
            vec![
                Block::Paragraph {
                    content: vec![text("before")],
                },
                Block::Paragraph {
                    content: vec![text("after")],
                },
            ]
        );
    }

    #[test]
    fn implied_paragraph_end() {
        let doc = parse_html(&render_document("<p>first\n<p>second"));
        assert_eq!(
            doc.blocks,
            vec![
                Block::Paragraph {
                    content: vec![text("first")],
                },
                Block::Paragraph {
                    content: vec![text("second")],
                },
            ]
        );
    }
}
