//! Cursor-based traversal shared by every tree in this module.
//!
//! The walker holds an explicit index into the current sibling list rather
//! than an iterator, so a visitor can splice nodes in place. A replacement
//! is visited again at the same index, which lets substitutions reach a
//! fixed point (a `theme()` call that expands to another `theme()` call is
//! expanded again before the walk moves on).

/// What the walker should do after visiting a node.
#[derive(Debug, Clone, PartialEq)]
pub enum WalkAction<N> {
    /// Descend into the node's children, then continue with its next sibling.
    Continue,
    /// Do not descend into this node's children.
    Skip,
    /// Abort the whole walk.
    Stop,
    /// Replace the node with these nodes and re-visit at the same index.
    /// An empty list removes the node.
    Replace(Vec<N>),
}

/// A tree node with an optional list of child nodes.
pub trait Walkable: Sized {
    fn children_mut(&mut self) -> Option<&mut Vec<Self>>;
}

/// Walk `nodes` depth-first, pre-order.
///
/// Returns `true` if a visitor returned [`WalkAction::Stop`].
pub fn walk<N, F>(nodes: &mut Vec<N>, visit: &mut F) -> bool
where
    N: Walkable,
    F: FnMut(&mut N) -> WalkAction<N>,
{
    let mut index = 0;
    while index < nodes.len() {
        match visit(&mut nodes[index]) {
            WalkAction::Continue => {
                if let Some(children) = nodes[index].children_mut() {
                    if walk(children, visit) {
                        return true;
                    }
                }
                index += 1;
            }
            WalkAction::Skip => index += 1,
            WalkAction::Stop => return true,
            WalkAction::Replace(replacement) => {
                nodes.splice(index..index + 1, replacement);
            }
        }
    }
    false
}
