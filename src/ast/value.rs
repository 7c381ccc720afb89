//! CSS value tokenizer.
//!
//! Splits a declaration value into words, functions and separators while
//! keeping every byte of the input, so `to_css(&parse(x)) == x` for any
//! balanced input. Whitespace, commas and slashes are grouped into
//! separator runs; quoted strings and escapes stay inside the surrounding
//! word.

use super::walk::Walkable;

/// A node in a parsed CSS value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueNode {
    /// A bare token such as `10px`, `red` or `"quoted text"`.
    Word(String),
    /// `name(children)`. The name is empty for a plain parenthesized group.
    Function { name: String, nodes: Vec<ValueNode> },
    /// A run of whitespace, `,` and `/`, kept verbatim.
    Separator(String),
}

impl ValueNode {
    pub fn word(value: impl Into<String>) -> Self {
        ValueNode::Word(value.into())
    }

    /// The function name, if this node is a function.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            ValueNode::Function { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl Walkable for ValueNode {
    fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            ValueNode::Function { nodes, .. } => Some(nodes),
            _ => None,
        }
    }
}

fn is_separator(c: char) -> bool {
    c == ',' || c == '/' || c.is_whitespace()
}

/// Parse a CSS value into nodes.
pub fn parse(input: &str) -> Vec<ValueNode> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    parse_nodes(&chars, &mut pos, false)
}

fn parse_nodes(chars: &[char], pos: &mut usize, nested: bool) -> Vec<ValueNode> {
    let mut nodes = Vec::new();
    let mut buffer = String::new();

    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '\\' => {
                buffer.push(c);
                if let Some(&next) = chars.get(*pos + 1) {
                    buffer.push(next);
                    *pos += 1;
                }
                *pos += 1;
            }
            '"' | '\'' => {
                *pos = read_quoted(chars, *pos, &mut buffer);
            }
            '(' => {
                let name = std::mem::take(&mut buffer);
                *pos += 1;
                if name.eq_ignore_ascii_case("url") {
                    let raw = read_raw_until_close(chars, pos);
                    nodes.push(ValueNode::Function {
                        name,
                        nodes: vec![ValueNode::Word(raw)],
                    });
                } else {
                    let children = parse_nodes(chars, pos, true);
                    nodes.push(ValueNode::Function {
                        name,
                        nodes: children,
                    });
                }
            }
            ')' if nested => {
                flush_word(&mut buffer, &mut nodes);
                *pos += 1;
                return nodes;
            }
            c if is_separator(c) => {
                flush_word(&mut buffer, &mut nodes);
                let mut run = String::new();
                while *pos < chars.len() && is_separator(chars[*pos]) {
                    run.push(chars[*pos]);
                    *pos += 1;
                }
                nodes.push(ValueNode::Separator(run));
            }
            _ => {
                buffer.push(c);
                *pos += 1;
            }
        }
    }

    flush_word(&mut buffer, &mut nodes);
    nodes
}

fn flush_word(buffer: &mut String, nodes: &mut Vec<ValueNode>) {
    if !buffer.is_empty() {
        nodes.push(ValueNode::Word(std::mem::take(buffer)));
    }
}

/// Copy a quoted string starting at `start` into `buffer`, returning the
/// position after the closing quote (or the end of input).
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

/// Read raw text up to the matching `)`, consuming it.
fn read_raw_until_close(chars: &[char], pos: &mut usize) -> String {
    let mut raw = String::new();
    let mut depth = 0usize;
    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '\\' => {
                raw.push(c);
                if let Some(&next) = chars.get(*pos + 1) {
                    raw.push(next);
                    *pos += 1;
                }
            }
            '"' | '\'' => {
                *pos = read_quoted(chars, *pos, &mut raw);
                continue;
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

/// Serialize nodes back to CSS text.
pub fn to_css(nodes: &[ValueNode]) -> String {
    let mut out = String::new();
    write_nodes(nodes, &mut out);
    out
}

fn write_nodes(nodes: &[ValueNode], out: &mut String) {
    for node in nodes {
        match node {
            ValueNode::Word(word) => out.push_str(word),
            ValueNode::Separator(sep) => out.push_str(sep),
            ValueNode::Function { name, nodes } => {
                out.push_str(name);
                out.push('(');
                write_nodes(nodes, out);
                out.push(')');
            }
        }
    }
}

/// Check that brackets, parens, braces and quotes in `input` are balanced.
pub fn is_balanced(input: &str) -> bool {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && quote.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_words_and_separators() {
        let nodes = parse("1px solid red");
        assert_eq!(
            nodes,
            vec![
                ValueNode::word("1px"),
                ValueNode::Separator(" ".into()),
                ValueNode::word("solid"),
                ValueNode::Separator(" ".into()),
                ValueNode::word("red"),
            ]
        );
    }

    #[test]
    fn test_parse_nested_functions() {
        let nodes = parse("calc(100% - theme(spacing.4))");
        assert_eq!(nodes.len(), 1);
        let ValueNode::Function { name, nodes } = &nodes[0] else {
            panic!("expected function");
        };
        assert_eq!(name, "calc");
        assert_eq!(nodes.last().and_then(|n| n.function_name()), Some("theme"));
    }

    #[test]
    fn test_round_trip_preserves_whitespace() {
        for input in [
            "foo(   bar  )",
            "rgb(0 0 0 / 0.5)",
            "a ,  b,c",
            "url(https://example.com/a.png) no-repeat",
            "\"a (b) , c\" d",
            "var(--x, calc( 1px  +  2px ))",
            "foo\\(bar\\)",
        ] {
            assert_eq!(to_css(&parse(input)), input, "round trip of {input:?}");
        }
    }

    #[test]
    fn test_quotes_swallow_parens_and_commas() {
        let nodes = parse("'a(b,c)'");
        assert_eq!(nodes, vec![ValueNode::word("'a(b,c)'")]);
    }

    #[test]
    fn test_url_is_opaque() {
        let nodes = parse("url(a b/c)");
        assert_eq!(
            nodes,
            vec![ValueNode::Function {
                name: "url".into(),
                nodes: vec![ValueNode::word("a b/c")],
            }]
        );
    }

    #[test]
    fn test_is_balanced() {
        assert!(is_balanced("calc(1px + [a])"));
        assert!(is_balanced("'('"));
        assert!(!is_balanced("calc(1px"));
        assert!(!is_balanced("a)"));
        assert!(!is_balanced("'open"));
        assert!(!is_balanced("(]"));
    }
}
