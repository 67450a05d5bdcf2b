//! ASCII rendering of checklist views.

use crate::models::{Status, View, ViewEntry};

const TO_PACK: char = '○';
const PACKED: char = '●';
const NOT_NEEDED: char = '✗';

fn status_symbol(status: Status) -> char {
    match status {
        Status::ToPack => TO_PACK,
        Status::Packed => PACKED,
        Status::NotNeeded => NOT_NEEDED,
    }
}

/// Render a view's entries as a tree with status symbols.
///
/// Example output:
/// ```text
/// Clothes
/// ├── ● Socks
/// ├── ○ Shoes
/// │   └── ● Sandals
/// └── ✗ Swimwear
/// ```
///
/// Entries must be in view order (depth-first, as produced by the engine).
pub fn render_tree(entries: &[ViewEntry]) -> String {
    let mut output = String::new();
    // Whether each open ancestor level still has siblings to come.
    let mut open: Vec<bool> = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        open.truncate(entry.depth);
        let is_last = is_last_sibling(entries, i);

        if entry.depth == 0 {
            output.push_str(&entry.name);
            output.push('\n');
        } else {
            // Level 1 hangs directly under the root title with no prefix.
            for &more in open.iter().skip(1) {
                output.push_str(if more { "│   " } else { "    " });
            }
            output.push_str(if is_last { "└── " } else { "├── " });
            output.push(status_symbol(entry.status));
            output.push(' ');
            output.push_str(&entry.name);
            output.push('\n');
        }

        open.push(!is_last);
    }

    output
}

/// Render one view with a heading and its count.
pub fn render_view(view: View, entries: &[ViewEntry]) -> String {
    let mut output = format!("{} ({})\n", view.title(), entries.len());
    if entries.is_empty() {
        output.push_str(match view {
            View::ToPack => "  Nothing left to pack.\n",
            View::Packed => "  No items packed yet.\n",
            View::NotNeeded => "  No items marked as not needed.\n",
        });
    } else {
        output.push_str(&render_tree(entries));
    }
    output
}

/// Whether no later entry at the same depth shares this entry's parent.
fn is_last_sibling(entries: &[ViewEntry], index: usize) -> bool {
    let depth = entries[index].depth;
    for next in &entries[index + 1..] {
        if next.depth < depth {
            return true;
        }
        if next.depth == depth {
            return false;
        }
    }
    true
}
