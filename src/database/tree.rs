//! Tree rendering
//!
//! Turns a [`SchemaTree`] into box-drawing display lines, lazily and in
//! depth-first pre-order. Rendering borrows the tree and can be repeated.

use crate::database::schema::SchemaTree;

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const SPACE: &str = "    ";

/// Render a tree into display lines
pub fn render(tree: &SchemaTree) -> TreeLines<'_> {
    TreeLines {
        stack: vec![Frame {
            node: tree,
            prefix: String::new(),
            connector: "",
        }],
    }
}

struct Frame<'a> {
    node: &'a SchemaTree,
    /// Continuation glyphs inherited from ancestors
    prefix: String,
    /// Glyph joining this node to its parent (empty for the root)
    connector: &'static str,
}

/// Iterator over rendered tree lines
pub struct TreeLines<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for TreeLines<'a> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let frame = self.stack.pop()?;
        let line = format!("{}{}{}", frame.prefix, frame.connector, frame.node.label);

        let child_prefix = match frame.connector {
            "" => String::new(),
            LAST_BRANCH => format!("{}{}", frame.prefix, SPACE),
            _ => format!("{}{}", frame.prefix, PIPE),
        };

        let count = frame.node.children.len();
        // Reverse push so the first child pops first
        for (i, child) in frame.node.children.iter().enumerate().rev() {
            self.stack.push(Frame {
                node: child,
                prefix: child_prefix.clone(),
                connector: if i + 1 == count { LAST_BRANCH } else { BRANCH },
            });
        }

        Some(line)
    }
}
