//! Stylesheet AST: rules, at-rules, declarations and comments.
//!
//! This is the output format handed to serializers, and the format the
//! input stylesheet (the document holding the `@tailwind` layer markers) is
//! parsed into. [`to_css`] writes a plain two-space-indented rendering.

use std::fmt;

use crate::error::{Result, TailorError};

use super::walk::Walkable;

/// A style rule: `selector { nodes }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<CssNode>,
}

/// An at-rule. Statement at-rules (`@tailwind base;`) have no block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    pub nodes: Option<Vec<CssNode>>,
}

/// A `property: value` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssNode {
    Rule(Rule),
    AtRule(AtRule),
    Declaration(Declaration),
    Comment(String),
}

impl CssNode {
    pub fn rule(selector: impl Into<String>, nodes: Vec<CssNode>) -> Self {
        CssNode::Rule(Rule {
            selector: selector.into(),
            nodes,
        })
    }

    pub fn at_rule(name: impl Into<String>, params: impl Into<String>, nodes: Vec<CssNode>) -> Self {
        CssNode::AtRule(AtRule {
            name: name.into(),
            params: params.into(),
            nodes: Some(nodes),
        })
    }

    pub fn decl(property: impl Into<String>, value: impl Into<String>) -> Self {
        CssNode::Declaration(Declaration {
            property: property.into(),
            value: value.into(),
            important: false,
        })
    }

    /// Mark every declaration in this subtree `!important`.
    pub fn make_important(&mut self) {
        match self {
            CssNode::Declaration(decl) => decl.important = true,
            CssNode::Rule(rule) => rule.nodes.iter_mut().for_each(CssNode::make_important),
            CssNode::AtRule(at) => {
                if let Some(nodes) = &mut at.nodes {
                    nodes.iter_mut().for_each(CssNode::make_important);
                }
            }
            CssNode::Comment(_) => {}
        }
    }

    /// Visit every rule in this subtree.
    pub fn for_each_rule_mut(&mut self, f: &mut impl FnMut(&mut Rule)) {
        match self {
            CssNode::Rule(rule) => {
                f(rule);
                for child in &mut rule.nodes {
                    child.for_each_rule_mut(f);
                }
            }
            CssNode::AtRule(at) => {
                if let Some(nodes) = &mut at.nodes {
                    for child in nodes {
                        child.for_each_rule_mut(f);
                    }
                }
            }
            _ => {}
        }
    }

    /// Visit every declaration in this subtree.
    pub fn declarations(&self) -> Vec<&Declaration> {
        let mut out = Vec::new();
        self.collect_declarations(&mut out);
        out
    }

    fn collect_declarations<'a>(&'a self, out: &mut Vec<&'a Declaration>) {
        match self {
            CssNode::Declaration(decl) => out.push(decl),
            CssNode::Rule(rule) => rule.nodes.iter().for_each(|n| n.collect_declarations(out)),
            CssNode::AtRule(at) => {
                if let Some(nodes) = &at.nodes {
                    nodes.iter().for_each(|n| n.collect_declarations(out));
                }
            }
            CssNode::Comment(_) => {}
        }
    }
}

impl Walkable for CssNode {
    fn children_mut(&mut self) -> Option<&mut Vec<Self>> {
        match self {
            CssNode::Rule(rule) => Some(&mut rule.nodes),
            CssNode::AtRule(at) => at.nodes.as_mut(),
            _ => None,
        }
    }
}

/// Parse a stylesheet.
pub fn parse(input: &str) -> Result<Vec<CssNode>> {
    let chars: Vec<char> = input.chars().collect();
    let mut pos = 0;
    let nodes = parse_block(&chars, &mut pos, false)?;
    Ok(nodes)
}

fn css_error(message: impl Into<String>) -> TailorError {
    TailorError::Css {
        message: message.into(),
        help: None,
    }
}

fn parse_block(chars: &[char], pos: &mut usize, nested: bool) -> Result<Vec<CssNode>> {
    let mut nodes = Vec::new();
    let mut buffer = String::new();

    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            '/' if chars.get(*pos + 1) == Some(&'*') => {
                let start = *pos + 2;
                let mut end = start;
                while end + 1 < chars.len() && !(chars[end] == '*' && chars[end + 1] == '/') {
                    end += 1;
                }
                if end + 1 >= chars.len() {
                    return Err(css_error("Unterminated comment"));
                }
                if buffer.trim().is_empty() {
                    nodes.push(CssNode::Comment(chars[start..end].iter().collect()));
                }
                *pos = end + 2;
            }
            '"' | '\'' => {
                let quote = c;
                buffer.push(c);
                *pos += 1;
                while *pos < chars.len() && chars[*pos] != quote {
                    if chars[*pos] == '\\' {
                        buffer.push(chars[*pos]);
                        *pos += 1;
                    }
                    if let Some(&ch) = chars.get(*pos) {
                        buffer.push(ch);
                    }
                    *pos += 1;
                }
                if *pos >= chars.len() {
                    return Err(css_error("Unterminated string"));
                }
                buffer.push(quote);
                *pos += 1;
            }
            '(' => {
                let mut depth = 0usize;
                while *pos < chars.len() {
                    let ch = chars[*pos];
                    buffer.push(ch);
                    *pos += 1;
                    match ch {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                if depth != 0 {
                    return Err(css_error("Unclosed parenthesis"));
                }
            }
            '{' => {
                *pos += 1;
                let header = std::mem::take(&mut buffer);
                let header = header.trim();
                let children = parse_block(chars, pos, true)?;
                if let Some(at) = header.strip_prefix('@') {
                    let (name, params) = split_at_rule(at);
                    nodes.push(CssNode::at_rule(name, params, children));
                } else {
                    nodes.push(CssNode::rule(header, children));
                }
            }
            ';' => {
                *pos += 1;
                let statement = std::mem::take(&mut buffer);
                if let Some(node) = parse_statement(statement.trim())? {
                    nodes.push(node);
                }
            }
            '}' => {
                if !nested {
                    return Err(css_error("Unexpected `}`"));
                }
                *pos += 1;
                let statement = std::mem::take(&mut buffer);
                if let Some(node) = parse_statement(statement.trim())? {
                    nodes.push(node);
                }
                return Ok(nodes);
            }
            _ => {
                buffer.push(c);
                *pos += 1;
            }
        }
    }

    if nested {
        return Err(TailorError::Css {
            message: "Unclosed block".to_string(),
            help: Some("Add the missing `}`".to_string()),
        });
    }
    if let Some(node) = parse_statement(buffer.trim())? {
        nodes.push(node);
    }
    Ok(nodes)
}

fn split_at_rule(at: &str) -> (String, String) {
    match at.find(|c: char| c.is_whitespace() || c == '(') {
        Some(idx) => (at[..idx].to_string(), at[idx..].trim().to_string()),
        None => (at.to_string(), String::new()),
    }
}

fn parse_statement(statement: &str) -> Result<Option<CssNode>> {
    if statement.is_empty() {
        return Ok(None);
    }
    if let Some(at) = statement.strip_prefix('@') {
        let (name, params) = split_at_rule(at);
        return Ok(Some(CssNode::AtRule(AtRule {
            name,
            params,
            nodes: None,
        })));
    }
    let Some((property, value)) = statement.split_once(':') else {
        return Err(css_error(format!("Expected a declaration, found `{statement}`")));
    };
    let mut value = value.trim();
    let mut important = false;
    if let Some(stripped) = value.strip_suffix("!important") {
        value = stripped.trim_end();
        important = true;
    }
    Ok(Some(CssNode::Declaration(Declaration {
        property: property.trim().to_string(),
        value: value.to_string(),
        important,
    })))
}

/// Serialize nodes as indented CSS.
pub fn to_css(nodes: &[CssNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, 0, &mut out);
    }
    out
}

fn write_node(node: &CssNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        CssNode::Rule(rule) => {
            out.push_str(&format!("{indent}{} {{\n", rule.selector));
            for child in &rule.nodes {
                write_node(child, depth + 1, out);
            }
            out.push_str(&format!("{indent}}}\n"));
        }
        CssNode::AtRule(at) => {
            let head = if at.params.is_empty() {
                format!("@{}", at.name)
            } else {
                format!("@{} {}", at.name, at.params)
            };
            match &at.nodes {
                Some(children) => {
                    out.push_str(&format!("{indent}{head} {{\n"));
                    for child in children {
                        write_node(child, depth + 1, out);
                    }
                    out.push_str(&format!("{indent}}}\n"));
                }
                None => out.push_str(&format!("{indent}{head};\n")),
            }
        }
        CssNode::Declaration(decl) => {
            let important = if decl.important { " !important" } else { "" };
            out.push_str(&format!(
                "{indent}{}: {}{important};\n",
                decl.property, decl.value
            ));
        }
        CssNode::Comment(text) => out.push_str(&format!("{indent}/*{text}*/\n")),
    }
}

impl fmt::Display for CssNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_node(self, 0, &mut out);
        f.write_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_markers_and_rules() {
        let nodes = parse("@tailwind base;\n.btn { color: red; padding: 1px 2px !important }\n")
            .unwrap();
        assert_eq!(
            nodes,
            vec![
                CssNode::AtRule(AtRule {
                    name: "tailwind".into(),
                    params: "base".into(),
                    nodes: None,
                }),
                CssNode::rule(
                    ".btn",
                    vec![
                        CssNode::decl("color", "red"),
                        CssNode::Declaration(Declaration {
                            property: "padding".into(),
                            value: "1px 2px".into(),
                            important: true,
                        }),
                    ]
                ),
            ]
        );
    }

    #[test]
    fn test_parse_nested_at_rule_and_strings() {
        let nodes = parse("@media (min-width: 640px) { .a { content: \"}\"; } }").unwrap();
        let CssNode::AtRule(at) = &nodes[0] else {
            panic!("expected at-rule");
        };
        assert_eq!(at.name, "media");
        assert_eq!(at.params, "(min-width: 640px)");
        let children = at.nodes.as_ref().unwrap();
        assert_eq!(children[0], CssNode::rule(".a", vec![CssNode::decl("content", "\"}\"")]));
    }

    #[test]
    fn test_parse_comment() {
        let nodes = parse("/* hi */ .a { color: red }").unwrap();
        assert_eq!(nodes[0], CssNode::Comment(" hi ".into()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(".a { color: red").is_err());
        assert!(parse(".a { color: red } }").is_err());
        assert!(parse(".a { nonsense }").is_err());
    }

    #[test]
    fn test_to_css() {
        let nodes = vec![CssNode::at_rule(
            "media",
            "(min-width: 640px)",
            vec![CssNode::rule(".a", vec![CssNode::decl("color", "red")])],
        )];
        assert_eq!(
            to_css(&nodes),
            "@media (min-width: 640px) {\n  .a {\n    color: red;\n  }\n}\n"
        );
    }

    #[test]
    fn test_make_important() {
        let mut node = CssNode::rule(".a", vec![CssNode::decl("color", "red")]);
        node.make_important();
        assert_eq!(node.to_string(), ".a {\n  color: red !important;\n}\n");
    }
}
