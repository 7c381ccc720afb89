//! CSS selector tokenizer and the rewrites variants need.
//!
//! Compound selectors are split into simple selectors (`.a`, `:hover`,
//! `[x=y]`, `&`), so classes can be renamed and pseudo-elements moved
//! without string surgery. Only `:not`, `:where`, `:has` and `:is` are
//! parsed recursively; every other functional pseudo-class keeps its
//! argument as one opaque [`SelectorNode::Value`].

use super::walk::{walk, WalkAction, Walkable};

/// A node in a parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorNode {
    /// A simple selector: `.class`, `#id`, `div`, `*`, `:hover`, `::before`,
    /// `[attr]` or the nesting selector `&`.
    Selector(String),
    /// A functional pseudo-class such as `:not(...)` or `:nth-child(...)`.
    Function {
        name: String,
        nodes: Vec<SelectorNode>,
    },
    /// An opaque function argument.
    Value(String),
    /// A combinator including its surrounding whitespace (` `, ` > `, `+`).
    Combinator(String),
    /// A selector-list comma including its surrounding whitespace.
    Separator(String),
}

impl Walkable for SelectorNode {
    fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            SelectorNode::Function { nodes, .. } => Some(nodes),
            _ => None,
        }
    }
}

impl SelectorNode {
    /// The class name (still CSS-escaped) if this is a class selector.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            SelectorNode::Selector(s) => s.strip_prefix('.'),
            _ => None,
        }
    }

    /// Whether this node is a pseudo-element (`::before`, or the legacy
    /// single-colon forms).
    pub fn is_pseudo_element(&self) -> bool {
        match self {
            SelectorNode::Selector(s) => {
                s.starts_with("::")
                    || matches!(
                        s.as_str(),
                        ":before" | ":after" | ":first-line" | ":first-letter"
                    )
            }
            SelectorNode::Function { name, .. } => name.starts_with("::"),
            _ => false,
        }
    }

    fn is_compound_part(&self) -> bool {
        matches!(self, SelectorNode::Selector(_) | SelectorNode::Function { .. })
    }
}

const RECURSIVE_FUNCTIONS: [&str; 4] = [":not", ":where", ":has", ":is"];

/// Parse a selector list.
pub fn parse(input: &str) -> Vec<SelectorNode> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    parse_nodes(&chars, &mut pos, false)
}

fn parse_nodes(chars: &[char], pos: &mut usize, nested: bool) -> Vec<SelectorNode> {
    let mut nodes = Vec::new();
    let mut buffer = String::new();

    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '\\' => {
                buffer.push(c);
                *pos += 1;
                let hex = chars[*pos..]
                    .iter()
                    .take(6)
                    .take_while(|c| c.is_ascii_hexdigit())
                    .count();
                if hex > 0 {
                    buffer.extend(&chars[*pos..*pos + hex]);
                    *pos += hex;
                    // A hex escape swallows one trailing space.
                    if chars.get(*pos) == Some(&' ') {
                        buffer.push(' ');
                        *pos += 1;
                    }
                } else if let Some(&next) = chars.get(*pos) {
                    buffer.push(next);
                    *pos += 1;
                }
            }
            '"' | '\'' => {
                *pos = read_quoted(chars, *pos, &mut buffer);
            }
            '[' => {
                flush(&mut buffer, &mut nodes);
                *pos = read_attribute(chars, *pos, &mut buffer);
                flush(&mut buffer, &mut nodes);
            }
            '.' | '#' | '&' | '*' => {
                flush(&mut buffer, &mut nodes);
                buffer.push(c);
                *pos += 1;
            }
            ':' => {
                if buffer != ":" {
                    flush(&mut buffer, &mut nodes);
                }
                buffer.push(c);
                *pos += 1;
            }
            '(' => {
                let name = std::mem::take(&mut buffer);
                *pos += 1;
                let children = if RECURSIVE_FUNCTIONS.contains(&name.as_str()) {
                    parse_nodes(chars, pos, true)
                } else {
                    vec![SelectorNode::Value(read_raw_until_close(chars, pos))]
                };
                nodes.push(SelectorNode::Function {
                    name,
                    nodes: children,
                });
            }
            ')' if nested => {
                flush(&mut buffer, &mut nodes);
                *pos += 1;
                return nodes;
            }
            c if c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',') => {
                flush(&mut buffer, &mut nodes);
                let start = *pos;
                let mut has_comma = false;
                while *pos < chars.len() {
                    let c = chars[*pos];
                    if c == ',' {
                        has_comma = true;
                    } else if !(c.is_whitespace() || matches!(c, '>' | '+' | '~')) {
                        break;
                    }
                    *pos += 1;
                }
                let run: String = chars[start..*pos].iter().collect();
                let at_end = *pos >= chars.len() || (nested && chars[*pos] == ')');
                if has_comma || at_end || nodes.is_empty() {
                    nodes.push(SelectorNode::Separator(run));
                } else {
                    nodes.push(SelectorNode::Combinator(run));
                }
            }
            _ => {
                buffer.push(c);
                *pos += 1;
            }
        }
    }

    flush(&mut buffer, &mut nodes);
    nodes
}

fn flush(buffer: &mut String, nodes: &mut Vec<SelectorNode>) {
    if !buffer.is_empty() {
        nodes.push(SelectorNode::Selector(std::mem::take(buffer)));
    }
}

fn read_quoted(chars: &[char], start: usize, buffer: &mut String) -> usize {
    let quote = chars[start];
    buffer.push(quote);
    let mut pos = start + 1;
    while pos < chars.len() {
        let c = chars[pos];
        buffer.push(c);
        if c == '\\' {
            if let Some(&next) = chars.get(pos + 1) {
                buffer.push(next);
                pos += 1;
            }
        } else if c == quote {
            return pos + 1;
        }
        pos += 1;
    }
    pos
}

fn read_attribute(chars: &[char], start: usize, buffer: &mut String) -> usize {
    let mut pos = start;
    while pos < chars.len() {
        let c = chars[pos];
        match c {
            '"' | '\'' => {
                pos = read_quoted(chars, pos, buffer);
                continue;
            }
            '\\' => {
                buffer.push(c);
                if let Some(&next) = chars.get(pos + 1) {
                    buffer.push(next);
                    pos += 1;
                }
            }
            ']' => {
                buffer.push(c);
                return pos + 1;
            }
            _ => buffer.push(c),
        }
        pos += 1;
    }
    pos
}

fn read_raw_until_close(chars: &[char], pos: &mut usize) -> String {
    let mut raw = String::new();
    let mut depth = 0usize;
    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '"' | '\'' => {
                *pos = read_quoted(chars, *pos, &mut raw);
                continue;
            }
            '\\' => {
                raw.push(c);
                if let Some(&next) = chars.get(*pos + 1) {
                    raw.push(next);
                    *pos += 1;
                }
            }
            '(' => {
                depth += 1;
                raw.push(c);
            }
            ')' if depth == 0 => {
                *pos += 1;
                return raw;
            }
            ')' => {
                depth -= 1;
                raw.push(c);
            }
            _ => raw.push(c),
        }
        *pos += 1;
    }
    raw
}

/// Serialize selector nodes back to text.
pub fn to_css(nodes: &[SelectorNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[SelectorNode], out: &mut String) {
    for node in nodes {
        match node {
            SelectorNode::Selector(s)
            | SelectorNode::Value(s)
            | SelectorNode::Combinator(s)
            | SelectorNode::Separator(s) => out.push_str(s),
            SelectorNode::Function { name, nodes } => {
                out.push_str(name);
                out.push('(');
                write_nodes(nodes, out);
                out.push(')');
            }
        }
    }
}

/// Split a selector list at its top-level commas.
pub fn split_list(nodes: Vec<SelectorNode>) -> Vec<Vec<SelectorNode>> {
    let mut list = vec![Vec::new()];
    for node in nodes {
        match node {
            SelectorNode::Separator(ref s) if s.contains(',') => list.push(Vec::new()),
            SelectorNode::Separator(_) => {}
            other => {
                if let Some(current) = list.last_mut() {
                    current.push(other);
                }
            }
        }
    }
    list.retain(|selector| !selector.is_empty());
    list
}

/// Collect class names (unescaped), optionally skipping those that only
/// appear inside `:not(...)` guards.
pub fn classes(nodes: &[SelectorNode], include_negated: bool) -> Vec<String> {
    let mut out = Vec::new();
    collect_classes(nodes, include_negated, &mut out);
    out
}

fn collect_classes(nodes: &[SelectorNode], include_negated: bool, out: &mut Vec<String>) {
    for node in nodes {
        match node {
            SelectorNode::Selector(_) => {
                if let Some(class) = node.class_name() {
                    let class = unescape(class);
                    if !out.contains(&class) {
                        out.push(class);
                    }
                }
            }
            SelectorNode::Function { name, nodes } => {
                if include_negated || name != ":not" {
                    collect_classes(nodes, include_negated, out);
                }
            }
            _ => {}
        }
    }
}

/// Rename every occurrence of class `from` (unescaped) to `to` (already
/// escaped).
pub fn rename_class(nodes: &mut Vec<SelectorNode>, from: &str, to: &str) {
    walk(nodes, &mut |node| {
        if let Some(class) = node.class_name() {
            if unescape(class) == from {
                *node = SelectorNode::Selector(format!(".{to}"));
            }
        }
        WalkAction::Continue
    });
}

/// Apply a variant selector format (containing `&`) to `selector`.
///
/// `&` stands for the selector up to and including the compound that
/// carries `class` (escaped); anything after that compound is re-attached
/// after the formatted part. Pseudo-elements on that compound move to the
/// end of the compound that replaced `&`, since a pseudo-element must come
/// last.
pub fn format_variant(selector: &str, class: &str, format: &str) -> String {
    let formats = split_list(parse(format));
    let mut results = Vec::new();

    for complex in split_list(parse(selector)) {
        let (head, pseudo_elements, tail) = split_at_class(complex, class);
        for format in &formats {
            let mut out: Vec<SelectorNode> = Vec::new();
            let mut pending_pseudo = false;
            for node in format {
                if matches!(node, SelectorNode::Selector(s) if s == "&") {
                    out.extend(head.iter().cloned());
                    pending_pseudo = true;
                    continue;
                }
                if pending_pseudo && !node.is_compound_part() {
                    out.extend(pseudo_elements.iter().cloned());
                    pending_pseudo = false;
                }
                out.push(node.clone());
            }
            if pending_pseudo {
                out.extend(pseudo_elements.iter().cloned());
            }
            out.extend(tail.iter().cloned());
            results.push(to_css(&out));
        }
    }

    results.join(", ")
}

type SplitSelector = (Vec<SelectorNode>, Vec<SelectorNode>, Vec<SelectorNode>);

fn split_at_class(complex: Vec<SelectorNode>, class: &str) -> SplitSelector {
    let position = complex
        .iter()
        .position(|node| node.class_name() == Some(class));

    let Some(position) = position else {
        let mut head = complex;
        let pseudo = take_trailing_pseudo_elements(&mut head);
        return (head, pseudo, Vec::new());
    };

    let mut end = position;
    while end < complex.len() && complex[end].is_compound_part() {
        end += 1;
    }

    let mut head = complex;
    let tail = head.split_off(end);
    let pseudo = take_trailing_pseudo_elements(&mut head);
    (head, pseudo, tail)
}

fn take_trailing_pseudo_elements(compound: &mut Vec<SelectorNode>) -> Vec<SelectorNode> {
    let mut start = compound.len();
    while start > 0 && compound[start - 1].is_pseudo_element() {
        start -= 1;
    }
    compound.split_off(start)
}

/// Escape a string for use as a CSS class name (`CSS.escape` semantics).
pub fn escape_class_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 8);
    let chars: Vec<char> = input.chars().collect();

    for (index, &c) in chars.iter().enumerate() {
        let leading_digit =
            c.is_ascii_digit() && (index == 0 || (index == 1 && chars[0] == '-'));
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if c.is_control() || leading_digit {
            out.push_str(&format!("\\{:x} ", c as u32));
        } else if index == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }

    out
}

/// Undo CSS escapes in an identifier.
pub fn unescape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while let Some(&next) = chars.peek() {
            if hex.len() < 6 && next.is_ascii_hexdigit() {
                hex.push(next);
                chars.next();
            } else {
                break;
            }
        }
        if hex.is_empty() {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            if chars.peek() == Some(&' ') {
                chars.next();
            }
            let decoded = u32::from_str_radix(&hex, 16)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or('\u{FFFD}');
            out.push(decoded);
        }
    }
    out
}
