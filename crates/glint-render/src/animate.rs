//! Wraps visible words of a content tree so hosts can fade them in.
//!
//! Text nodes outside verbatim regions are split on whitespace runs into plain
//! whitespace text and one [`Tag::Word`] wrapper per word. Word wrappers are
//! never entered again, so animating an already animated tree is a no-op.

use crate::tree::{Element, Node, Tag};

/// What the rewrite does with one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    /// Recurse into the element's children.
    Descend,
    /// Leave the node and its subtree as is.
    Skip,
    /// Replace the node with these nodes and continue after them.
    Replace(Vec<Node>),
}

/// Rewrites `nodes` in place, asking `visit` what to do with each node in
/// document order.
pub fn rewrite<F>(nodes: &mut Vec<Node>, visit: &mut F)
where
    F: FnMut(&Node) -> Visit,
{
    let mut cursor = 0;
    while cursor < nodes.len() {
        match visit(&nodes[cursor]) {
            Visit::Descend => {
                if let Node::Element(element) = &mut nodes[cursor] {
                    rewrite(&mut element.children, visit);
                }
                cursor += 1;
            }
            Visit::Skip => cursor += 1,
            Visit::Replace(replacement) => {
                let inserted = replacement.len();
                nodes.splice(cursor..=cursor, replacement);
                cursor += inserted;
            }
        }
    }
}

/// Wraps every unwrapped word in `nodes`.
///
/// New ordinals continue after the largest one already present. Returns the
/// number of ordinals in use afterwards.
pub fn animate(nodes: &mut Vec<Node>) -> usize {
    let mut next = max_word_index(nodes).map_or(0, |index| index + 1);
    rewrite(nodes, &mut |node: &Node| match node {
        Node::Text(text) if text.trim().is_empty() => Visit::Skip,
        Node::Text(text) => Visit::Replace(split_words(text, &mut next)),
        Node::Element(element) if element.tag.is_verbatim() => Visit::Skip,
        Node::Element(Element {
            tag: Tag::Word { .. },
            ..
        }) => Visit::Skip,
        Node::Element(_) => Visit::Descend,
    });
    next
}

/// Flags words with an ordinal of at least `from` as fresh, clearing the rest.
pub fn mark_fresh(nodes: &mut [Node], from: usize) {
    for node in nodes {
        if let Node::Element(element) = node {
            if let Tag::Word { index, fresh } = &mut element.tag {
                *fresh = *index >= from;
            } else {
                mark_fresh(&mut element.children, from);
            }
        }
    }
}

fn max_word_index(nodes: &[Node]) -> Option<usize> {
    nodes
        .iter()
        .filter_map(Node::as_element)
        .filter_map(|element| match element.tag {
            Tag::Word { index, .. } => Some(index),
            _ => max_word_index(&element.children),
        })
        .max()
}

fn split_words(text: &str, next: &mut usize) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut start = 0;
    let mut in_space = text.starts_with(char::is_whitespace);

    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() != in_space {
            nodes.push(piece(&text[start..offset], in_space, next));
            start = offset;
            in_space = !in_space;
        }
    }
    nodes.push(piece(&text[start..], in_space, next));
    nodes
}

fn piece(text: &str, space: bool, next: &mut usize) -> Node {
    if space {
        return Node::text(text);
    }
    let index = *next;
    *next += 1;
    Node::element(
        Tag::Word {
            index,
            fresh: false,
        },
        vec![Node::text(text)],
    )
}
