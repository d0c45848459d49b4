//! Reading the embedded stylesheet into print settings.
//!
//! Only the handful of selectors and properties a document stylesheet uses
//! for typography are understood: `body`, `h1`-`h6` and `a`, with fonts,
//! colours, spacing, borders and link decoration. Everything else is logged
//! at debug level and skipped. Lengths are resolved to points using the
//! usual screen-to-print ratio of 1px = 0.75pt.

/// Points per CSS pixel.
const PT_PER_PX: f64 = 0.75;
/// Browser default font size (16px).
const DEFAULT_FONT_SIZE_PT: f64 = 12.0;
/// Page margin a print engine applies before the body margin (75px).
pub const DEFAULT_PAGE_MARGIN_PT: f64 = 56.25;
/// Browser default `line-height: normal`.
const DEFAULT_LINE_HEIGHT: f64 = 1.2;

/// User-agent heading sizes, relative to the body font size.
const HEADING_SIZES_EM: [f64; 6] = [2.0, 1.5, 1.17, 1.0, 0.83, 0.67];
/// User-agent heading margins, relative to the heading's own font size.
const HEADING_MARGINS_EM: [f64; 6] = [0.67, 0.83, 1.0, 1.33, 1.67, 2.33];

/// A single `selector { property: value; }` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<String>,
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

/// Split a stylesheet into rules. At-rules are skipped with their bodies.
pub fn parse_stylesheet(css: &str) -> Vec<Rule> {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    let mut rest = css.as_str();

    while let Some(open) = rest.find('{') {
        let prelude = rest[..open].trim();
        let (body, after) = match matching_brace(&rest[open + 1..]) {
            Some(close) => (&rest[open + 1..open + 1 + close], &rest[open + 2 + close..]),
            None => (&rest[open + 1..], ""),
        };
        rest = after;

        if prelude.starts_with('@') {
            tracing::debug!(rule = prelude, "skipping at-rule");
            continue;
        }

        let selectors = prelude
            .split(',')
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let declarations = body
            .split(';')
            .filter_map(|decl| {
                let (property, value) = decl.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim();
                let value = value
                    .strip_suffix("!important")
                    .map_or(value, str::trim_end)
                    .to_string();
                (!property.is_empty()).then_some(Declaration { property, value })
            })
            .collect();
        rules.push(Rule {
            selectors,
            declarations,
        });
    }
    rules
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => rest = "",
        }
    }
    out.push_str(rest);
    out
}

/// Byte offset of the `}` closing a block whose `{` precedes `s`.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb`, `#rrggbb` or a basic colour keyword.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
            let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                3 => Some(Self::rgb(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
                6 => Some(Self::rgb(pair(0)?, pair(2)?, pair(4)?)),
                _ => None,
            };
        }
        let named = match value.to_ascii_lowercase().as_str() {
            "black" => Self::rgb(0, 0, 0),
            "white" => Self::rgb(255, 255, 255),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "silver" => Self::rgb(192, 192, 192),
            "red" => Self::rgb(255, 0, 0),
            "maroon" => Self::rgb(128, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "navy" => Self::rgb(0, 0, 128),
            "teal" => Self::rgb(0, 128, 128),
            "purple" => Self::rgb(128, 0, 128),
            "orange" => Self::rgb(255, 165, 0),
            _ => return None,
        };
        Some(named)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Border {
    pub width_pt: f64,
    pub style: LineStyle,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingStyle {
    pub size_pt: f64,
    pub color: Option<Color>,
    pub margin_top_pt: f64,
    pub margin_bottom_pt: f64,
    pub padding_bottom_pt: f64,
    pub border_bottom: Option<Border>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkStyle {
    pub color: Option<Color>,
    pub underline: bool,
}

/// Print settings derived from a stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub font_families: Vec<String>,
    pub font_size_pt: f64,
    pub line_height: f64,
    pub text_color: Option<Color>,
    /// Body margin as top, right, bottom, left.
    pub body_margin_pt: [f64; 4],
    pub headings: [HeadingStyle; 6],
    pub link: LinkStyle,
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_rules(&[])
    }
}

impl Theme {
    /// Interpret stylesheet text.
    pub fn from_css(css: &str) -> Self {
        Self::from_rules(&parse_stylesheet(css))
    }

    pub fn from_rules(rules: &[Rule]) -> Self {
        for rule in rules {
            for selector in &rule.selectors {
                if selector_target(selector).is_none() {
                    tracing::debug!(selector = %selector, "selector has no print equivalent");
                }
            }
        }

        let body = declarations_for(rules, Target::Body);
        let font_size_pt = body
            .iter()
            .rev()
            .find(|d| d.property == "font-size")
            .and_then(|d| resolve_length(&d.value, DEFAULT_FONT_SIZE_PT))
            .unwrap_or(DEFAULT_FONT_SIZE_PT);

        let mut theme = Theme {
            font_families: vec!["serif".to_string()],
            font_size_pt,
            line_height: DEFAULT_LINE_HEIGHT,
            text_color: None,
            // 8px user-agent body margin
            body_margin_pt: [6.0; 4],
            headings: std::array::from_fn(|i| {
                let size_pt = HEADING_SIZES_EM[i] * font_size_pt;
                HeadingStyle {
                    size_pt,
                    color: None,
                    margin_top_pt: HEADING_MARGINS_EM[i] * size_pt,
                    margin_bottom_pt: HEADING_MARGINS_EM[i] * size_pt,
                    padding_bottom_pt: 0.0,
                    border_bottom: None,
                }
            }),
            link: LinkStyle {
                color: Some(Color::rgb(0, 0, 238)),
                underline: true,
            },
        };

        for decl in body {
            theme.apply_body(decl);
        }
        for level in 1..=6u8 {
            let decls = declarations_for(rules, Target::Heading(level));
            let heading = &mut theme.headings[usize::from(level - 1)];
            if let Some(size) = decls
                .iter()
                .rev()
                .find(|d| d.property == "font-size")
                .and_then(|d| resolve_length(&d.value, font_size_pt))
            {
                heading.size_pt = size;
                let margin = HEADING_MARGINS_EM[usize::from(level - 1)] * size;
                heading.margin_top_pt = margin;
                heading.margin_bottom_pt = margin;
            }
            for decl in decls {
                apply_heading(heading, decl);
            }
        }
        for decl in declarations_for(rules, Target::Link) {
            theme.apply_link(decl);
        }
        theme
    }

    /// Total page margin (print default plus body margin) as top, right, bottom, left.
    pub fn page_margin_pt(&self) -> [f64; 4] {
        self.body_margin_pt.map(|m| DEFAULT_PAGE_MARGIN_PT + m)
    }

    fn apply_body(&mut self, decl: &Declaration) {
        let value = decl.value.as_str();
        match decl.property.as_str() {
            "font-family" => {
                let families: Vec<String> = value
                    .split(',')
                    .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
                    .filter(|f| !f.is_empty())
                    .collect();
                if !families.is_empty() {
                    self.font_families = families;
                }
            }
            "font-size" => {}
            "line-height" => match resolve_line_height(value, self.font_size_pt) {
                Some(lh) => self.line_height = lh,
                None => unsupported(decl),
            },
            "color" => set_color(&mut self.text_color, decl),
            "margin" => match resolve_box(value, self.font_size_pt) {
                Some(sides) => self.body_margin_pt = sides,
                None => unsupported(decl),
            },
            "margin-top" => set_side(&mut self.body_margin_pt[0], decl, self.font_size_pt),
            "margin-right" => set_side(&mut self.body_margin_pt[1], decl, self.font_size_pt),
            "margin-bottom" => set_side(&mut self.body_margin_pt[2], decl, self.font_size_pt),
            "margin-left" => set_side(&mut self.body_margin_pt[3], decl, self.font_size_pt),
            _ => unsupported(decl),
        }
    }

    fn apply_link(&mut self, decl: &Declaration) {
        match decl.property.as_str() {
            "color" => set_color(&mut self.link.color, decl),
            "text-decoration" | "text-decoration-line" => {
                let value = decl.value.to_ascii_lowercase();
                if value.contains("underline") {
                    self.link.underline = true;
                } else if value.split_whitespace().any(|v| v == "none") {
                    self.link.underline = false;
                } else {
                    unsupported(decl);
                }
            }
            _ => unsupported(decl),
        }
    }
}

fn apply_heading(heading: &mut HeadingStyle, decl: &Declaration) {
    let em = heading.size_pt;
    match decl.property.as_str() {
        "font-size" => {}
        "color" => set_color(&mut heading.color, decl),
        "margin-top" => set_side(&mut heading.margin_top_pt, decl, em),
        "margin-bottom" => set_side(&mut heading.margin_bottom_pt, decl, em),
        "padding-bottom" => set_side(&mut heading.padding_bottom_pt, decl, em),
        "border-bottom" => match resolve_border(&decl.value, em) {
            Some(border) => heading.border_bottom = border,
            None => unsupported(decl),
        },
        _ => unsupported(decl),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Target {
    Body,
    Heading(u8),
    Link,
}

fn selector_target(selector: &str) -> Option<Target> {
    match selector {
        "body" | "html" => Some(Target::Body),
        "a" | "a:link" | "a:visited" => Some(Target::Link),
        "h1" => Some(Target::Heading(1)),
        "h2" => Some(Target::Heading(2)),
        "h3" => Some(Target::Heading(3)),
        "h4" => Some(Target::Heading(4)),
        "h5" => Some(Target::Heading(5)),
        "h6" => Some(Target::Heading(6)),
        _ => None,
    }
}

/// Declarations of every rule matching `target`, in source order.
fn declarations_for(rules: &[Rule], target: Target) -> Vec<&Declaration> {
    rules
        .iter()
        .filter(|rule| {
            rule.selectors
                .iter()
                .any(|s| selector_target(s) == Some(target))
        })
        .flat_map(|rule| rule.declarations.iter())
        .collect()
}

fn unsupported(decl: &Declaration) {
    tracing::debug!(
        property = %decl.property,
        value = %decl.value,
        "ignoring unsupported declaration"
    );
}

fn set_color(slot: &mut Option<Color>, decl: &Declaration) {
    match Color::parse(&decl.value) {
        Some(color) => *slot = Some(color),
        None => unsupported(decl),
    }
}

fn set_side(slot: &mut f64, decl: &Declaration, em_pt: f64) {
    match resolve_length(&decl.value, em_pt) {
        Some(pt) => *slot = pt,
        None => unsupported(decl),
    }
}

/// Resolve a CSS length to points. `em_pt` is the size of 1em in points.
pub fn resolve_length(value: &str, em_pt: f64) -> Option<f64> {
    let value = value.trim().to_ascii_lowercase();
    let number = |suffix: &str| value.strip_suffix(suffix)?.trim().parse::<f64>().ok();
    if let Some(px) = number("px") {
        Some(px * PT_PER_PX)
    } else if let Some(pt) = number("pt") {
        Some(pt)
    } else if let Some(rem) = number("rem") {
        Some(rem * DEFAULT_FONT_SIZE_PT)
    } else if let Some(em) = number("em") {
        Some(em * em_pt)
    } else if value == "0" {
        Some(0.0)
    } else {
        None
    }
}

/// Resolve `line-height` to a multiple of the font size.
fn resolve_line_height(value: &str, font_size_pt: f64) -> Option<f64> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("normal") {
        return Some(DEFAULT_LINE_HEIGHT);
    }
    if let Some(pct) = value.strip_suffix('%') {
        return pct.trim().parse::<f64>().ok().map(|p| p / 100.0);
    }
    if let Ok(factor) = value.parse::<f64>() {
        return Some(factor);
    }
    resolve_length(value, font_size_pt).map(|pt| pt / font_size_pt)
}

/// Resolve the 1-4 value box shorthand to top, right, bottom, left.
fn resolve_box(value: &str, em_pt: f64) -> Option<[f64; 4]> {
    let sides = value
        .split_whitespace()
        .map(|v| resolve_length(v, em_pt))
        .collect::<Option<Vec<_>>>()?;
    match sides.as_slice() {
        [all] => Some([*all; 4]),
        [v, h] => Some([*v, *h, *v, *h]),
        [t, h, b] => Some([*t, *h, *b, *h]),
        [t, r, b, l] => Some([*t, *r, *b, *l]),
        _ => None,
    }
}

/// Resolve the `border-*` shorthand. `Some(None)` means the border is removed.
fn resolve_border(value: &str, em_pt: f64) -> Option<Option<Border>> {
    let mut width_pt = 3.0 * PT_PER_PX;
    let mut style = None;
    let mut color = Color::rgb(0, 0, 0);
    for token in value.split_whitespace() {
        match token.to_ascii_lowercase().as_str() {
            "none" | "hidden" => return Some(None),
            "solid" => style = Some(LineStyle::Solid),
            "dashed" => style = Some(LineStyle::Dashed),
            "dotted" => style = Some(LineStyle::Dotted),
            "thin" => width_pt = PT_PER_PX,
            "medium" => width_pt = 3.0 * PT_PER_PX,
            "thick" => width_pt = 5.0 * PT_PER_PX,
            _ => {
                if let Some(w) = resolve_length(token, em_pt) {
                    width_pt = w;
                } else {
                    color = Color::parse(token)?;
                }
            }
        }
    }
    // Without a style the border is not drawn
    Some(style.map(|style| Border {
        width_pt,
        style,
        color,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::STYLESHEET;

    #[test]
    fn parses_rules_and_comments() {
        let rules = parse_stylesheet(
            "/* header */ h1, h2 { color: red; margin-top: 0 !important }\n@media print { p { x: y } }\na{color:#fff}",
        );
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].selectors, vec!["h1", "h2"]);
        assert_eq!(
            rules[0].declarations[1],
            Declaration {
                property: "margin-top".into(),
                value: "0".into(),
            }
        );
        assert_eq!(rules[1].selectors, vec!["a"]);
    }

    #[test]
    fn embedded_stylesheet() {
        let theme = Theme::from_css(STYLESHEET);

        assert_eq!(theme.font_families, vec!["Arial", "sans-serif"]);
        assert_eq!(theme.line_height, 1.6);
        assert_eq!(theme.body_margin_pt, [30.0; 4]);
        assert_eq!(theme.page_margin_pt(), [86.25; 4]);

        let h1 = &theme.headings[0];
        assert_eq!(h1.color, Some(Color::rgb(0x33, 0x33, 0x33)));
        assert_eq!(h1.padding_bottom_pt, 7.5);
        assert_eq!(
            h1.border_bottom,
            Some(Border {
                width_pt: 1.5,
                style: LineStyle::Solid,
                color: Color::rgb(0xee, 0xee, 0xee),
            })
        );

        let h2 = &theme.headings[1];
        assert_eq!(h2.color, Some(Color::rgb(0x44, 0x44, 0x44)));
        assert_eq!(h2.margin_top_pt, 22.5);
        assert_eq!(h2.border_bottom, None);

        // a:hover has no effect on paper
        assert_eq!(theme.link.color, Some(Color::rgb(0x00, 0x66, 0xcc)));
        assert!(!theme.link.underline);
    }

    #[test]
    fn defaults_without_stylesheet() {
        let theme = Theme::default();
        assert_eq!(theme.font_size_pt, 12.0);
        assert_eq!(theme.headings[0].size_pt, 24.0);
        assert!(theme.link.underline);
    }

    #[test]
    fn colors() {
        assert_eq!(Color::parse("#333"), Some(Color::rgb(0x33, 0x33, 0x33)));
        assert_eq!(Color::parse("#0066CC"), Some(Color::rgb(0x00, 0x66, 0xcc)));
        assert_eq!(Color::parse("Navy"), Some(Color::rgb(0, 0, 128)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("rebeccapurple"), None);
        assert_eq!(Color::rgb(0x0a, 0xbc, 0xff).to_hex(), "#0abcff");
    }

    #[test]
    fn lengths() {
        assert_eq!(resolve_length("40px", 12.0), Some(30.0));
        assert_eq!(resolve_length("10pt", 12.0), Some(10.0));
        assert_eq!(resolve_length("1.5em", 24.0), Some(36.0));
        assert_eq!(resolve_length("0", 12.0), Some(0.0));
        assert_eq!(resolve_length("auto", 12.0), None);
    }

    #[test]
    fn margin_shorthand() {
        let theme = Theme::from_css("body { margin: 8px 16px }");
        assert_eq!(theme.body_margin_pt, [6.0, 12.0, 6.0, 12.0]);
    }

    #[test]
    fn heading_font_size_scales_margins() {
        let theme = Theme::from_css("h3 { margin-bottom: 1em; font-size: 20px }");
        let h3 = &theme.headings[2];
        assert_eq!(h3.size_pt, 15.0);
        assert_eq!(h3.margin_bottom_pt, 15.0);
    }

    #[test]
    fn unknown_properties_are_ignored() {
        let theme = Theme::from_css("body { display: grid; } p { color: red }");
        assert_eq!(theme, Theme::default());
    }
}
