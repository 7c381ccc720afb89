//! Merging adjacent rules that share a selector or at-rule head.

use crate::ast::css::CssNode;

/// Merge each node into the previous one when both are rules with the same
/// selector, or both are block at-rules with the same name and params.
/// `@font-face` blocks are never merged. Merged at-rule bodies are
/// collapsed again, so `@media` blocks from separate utilities end up as one
/// block holding every rule.
pub fn collapse_adjacent(nodes: Vec<CssNode>) -> Vec<CssNode> {
    let mut out: Vec<CssNode> = Vec::with_capacity(nodes.len());

    for node in nodes {
        match out.last_mut() {
            Some(previous) if can_merge(previous, &node) => merge(previous, node),
            _ => out.push(node),
        }
    }

    out
}

fn can_merge(previous: &CssNode, next: &CssNode) -> bool {
    match (previous, next) {
        (CssNode::Rule(a), CssNode::Rule(b)) => a.selector == b.selector,
        (CssNode::AtRule(a), CssNode::AtRule(b)) => {
            a.name == b.name
                && a.params == b.params
                && a.name != "font-face"
                && a.nodes.is_some()
                && b.nodes.is_some()
        }
        _ => false,
    }
}

fn merge(previous: &mut CssNode, next: CssNode) {
    match (previous, next) {
        (CssNode::Rule(previous), CssNode::Rule(rule)) => previous.nodes.extend(rule.nodes),
        (CssNode::AtRule(previous), CssNode::AtRule(at_rule)) => {
            let mut children = previous.nodes.take().unwrap_or_default();
            children.extend(at_rule.nodes.unwrap_or_default());
            previous.nodes = Some(collapse_adjacent(children));
        }
        _ => {}
    }
}
