//! Indented plain-text list parsing.
//!
//! Each non-blank line becomes one [`Node`]. Nesting is expressed with two
//! spaces per level:
//!
//! ```text
//! Toiletries
//!   Toothbrush
//!   Shaving kit
//!     Razor
//! ```
//!
//! Lines whose leading whitespace has odd length are dropped without error.

use crate::models::Node;

/// Spaces per nesting level.
pub const INDENT_WIDTH: usize = 2;

/// Parse indented text into nodes in document order.
///
/// Ids are `n:1`, `n:2`, ... and restart at 1 on every call. An input with no
/// valid lines yields an empty vector; whether that blocks an import is the
/// caller's decision.
pub fn parse(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    // Open node ids, one per depth level.
    let mut stack: Vec<String> = Vec::new();
    let mut seq = 0usize;

    for raw in text.split('\n') {
        let line = raw.replace('\r', "");
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        if indent % INDENT_WIDTH != 0 {
            tracing::debug!(line = %line.trim(), indent, "Skipping line with odd indentation");
            continue;
        }

        let depth = indent / INDENT_WIDTH;
        stack.truncate(depth);
        let parent_id = if depth == 0 { None } else { stack.last().cloned() };

        seq += 1;
        let id = format!("n:{}", seq);
        nodes.push(Node::new(id.clone(), line.trim(), parent_id));
        stack.push(id);
    }

    nodes
}
