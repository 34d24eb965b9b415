//! Line classification: every input line becomes exactly one [`LineKind`].
//!
//! Matchers are tried in a fixed priority order and the first hit wins. The
//! list ends with catch-alls (paragraph, blank), so classification is total:
//! unknown constructs degrade to paragraphs rather than errors.
//!
//! Fences and code lines depend on block state, so [`classify`] takes the
//! `in_code` flag; every other matcher looks at the line alone.

use once_cell::sync::Lazy;
use regex::Regex;

/// What a single line is, with its display text already extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// ```` ``` ```` delimiter; `label` is lowercased and trimmed.
    Fence { label: String },
    /// Raw line inside a fenced block.
    Code(String),
    /// Table row with trimmed cells.
    TableRow(Vec<String>),
    /// Table line made only of `-`, `:` and empty cells.
    TableSeparator,
    Heading { level: u8, text: String },
    /// `N. text`; `text` may be empty, which draws nothing.
    Numbered { number: String, text: String },
    Checkbox { checked: bool, text: String },
    Bullet { indent: u8, text: String },
    Rule,
    Paragraph(String),
    Blank,
}

impl LineKind {
    pub fn is_table(&self) -> bool {
        matches!(self, LineKind::TableRow(_) | LineKind::TableSeparator)
    }
}

type Matcher = fn(&str) -> Option<LineKind>;

/// Context-free matchers in priority order.
const MATCHERS: &[Matcher] = &[
    match_table,
    match_heading,
    match_numbered,
    match_checkbox,
    match_bullet,
    match_nested_bullet,
    match_rule,
    match_paragraph,
];

/// Classify `line`. Inside a fenced block everything but a fence is code.
pub fn classify(line: &str, in_code: bool) -> LineKind {
    if let Some(fence) = match_fence(line) {
        return fence;
    }
    if in_code {
        return LineKind::Code(line.to_string());
    }
    MATCHERS
        .iter()
        .find_map(|m| m(line))
        .unwrap_or(LineKind::Blank)
}

// ── Matchers ─────────────────────────────────────────────────────────────

fn match_fence(line: &str) -> Option<LineKind> {
    line.strip_prefix("```").map(|rest| LineKind::Fence {
        label: rest.trim().to_lowercase(),
    })
}

fn match_table(line: &str) -> Option<LineKind> {
    let inner = line.strip_prefix('|')?;
    if !inner.contains('|') {
        return None;
    }
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let cells: Vec<String> = inner.split('|').map(|c| c.trim().to_string()).collect();
    let separator = cells
        .iter()
        .all(|c| c.chars().all(|ch| ch == '-' || ch == ':'));
    if separator {
        Some(LineKind::TableSeparator)
    } else {
        Some(LineKind::TableRow(
            cells.iter().map(|c| strip_inline(c)).collect(),
        ))
    }
}

fn match_heading(line: &str) -> Option<LineKind> {
    const PREFIXES: [(&str, u8); 4] = [("# ", 1), ("## ", 2), ("### ", 3), ("#### ", 4)];
    PREFIXES.iter().find_map(|(prefix, level)| {
        line.strip_prefix(prefix).map(|text| LineKind::Heading {
            level: *level,
            text: strip_inline(text),
        })
    })
}

static RE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\.\s(.*)$").unwrap());

fn match_numbered(line: &str) -> Option<LineKind> {
    let caps = RE_NUMBERED.captures(line)?;
    Some(LineKind::Numbered {
        number: caps[1].to_string(),
        text: strip_inline(caps[2].trim()),
    })
}

fn match_checkbox(line: &str) -> Option<LineKind> {
    let checked = if line.starts_with("- [ ]") {
        false
    } else if line.starts_with("- [x]") || line.starts_with("- [X]") {
        true
    } else {
        return None;
    };
    Some(LineKind::Checkbox {
        checked,
        text: strip_inline(line[5..].trim()),
    })
}

fn match_bullet(line: &str) -> Option<LineKind> {
    let text = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))?;
    Some(LineKind::Bullet {
        indent: 0,
        text: strip_inline(text),
    })
}

fn match_nested_bullet(line: &str) -> Option<LineKind> {
    let text = line
        .strip_prefix("  - ")
        .or_else(|| line.strip_prefix("  * "))?;
    Some(LineKind::Bullet {
        indent: 1,
        text: strip_inline(text),
    })
}

fn match_rule(line: &str) -> Option<LineKind> {
    (line.trim() == "---").then_some(LineKind::Rule)
}

fn match_paragraph(line: &str) -> Option<LineKind> {
    if line.trim().is_empty() {
        None
    } else {
        Some(LineKind::Paragraph(strip_inline(line)))
    }
}

// ── Inline markup ────────────────────────────────────────────────────────

static RE_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static RE_ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static RE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`(.+?)`").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.+?)\]\(.+?\)").unwrap());

/// Replace `**x**`, `*x*`, `` `x` `` and `[text](url)` with their inner text.
///
/// Bold runs before italic so `**x**` is not read as two italic markers.
pub fn strip_inline(text: &str) -> String {
    let s = RE_BOLD.replace_all(text, "$1");
    let s = RE_ITALIC.replace_all(&s, "$1");
    let s = RE_CODE.replace_all(&s, "$1");
    RE_LINK.replace_all(&s, "$1").into_owned()
}
