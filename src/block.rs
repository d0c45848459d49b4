/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq)]
pub enum Span {
    Text(String),
    Bold(Vec<Span>),
    Italic(Vec<Span>),
    Strike(Vec<Span>),
    Code(String),
    Link { url: String, content: Vec<Span> },
    /// Images are not fetched; only their alternative text is laid out.
    Image { alt: String },
    LineBreak,
}

/// A single list item, which can hold any block content
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListItem {
    pub blocks: Vec<Block>,
    /// For task lists: None = not a task, Some(false) = unchecked, Some(true) = checked
    pub checked: Option<bool>,
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub ordered: bool,
    /// First number of an ordered list, when it is not 1
    pub start: Option<u64>,
    /// Items written without paragraph wrappers
    pub tight: bool,
    pub items: Vec<ListItem>,
}

/// Block-level elements read from the HTML body
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Span>,
    },
    Paragraph {
        content: Vec<Span>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    List(List),
    Table {
        headers: Vec<Vec<Span>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Quote(Vec<Block>),
    Rule,
}

/// An HTML document reduced to what the page layout needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Concatenated text of every `<style>` element.
    pub stylesheet: String,
    pub blocks: Vec<Block>,
}

impl Document {
    /// Plain text of the first level-1 heading, if any.
    pub fn title(&self) -> Option<String> {
        self.blocks.iter().find_map(|block| match block {
            Block::Heading { level: 1, content } => Some(spans_text(content)),
            _ => None,
        })
    }
}

/// Flatten spans to their visible text.
pub fn spans_text(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        match span {
            Span::Text(t) | Span::Code(t) => out.push_str(t),
            Span::Bold(inner) | Span::Italic(inner) | Span::Strike(inner) => {
                out.push_str(&spans_text(inner))
            }
            Span::Link { content, .. } => out.push_str(&spans_text(content)),
            Span::Image { alt } => out.push_str(alt),
            Span::LineBreak => out.push(' '),
        }
    }
    out
}
