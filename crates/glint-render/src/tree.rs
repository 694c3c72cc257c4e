//! Owned content tree produced by the compiler and rewritten by the animator.
//!
//! The tree is the render output: hosts either walk it, serialize it to JSON
//! through serde, or turn it into HTML with [`to_html`].

use std::fmt::Write;

use serde::Serialize;

/// A node of the content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(Element),
}

/// An element with its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    #[serde(flatten)]
    pub tag: Tag,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

/// Element kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Tag {
    Paragraph,
    Heading {
        level: u8,
    },
    BlockQuote,
    /// Preformatted block; holds a single [`Tag::Code`].
    Pre,
    Code {
        #[serde(skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },
    List {
        /// `None` for bullet lists.
        #[serde(skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
    },
    Item,
    TaskMarker {
        checked: bool,
    },
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        href: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Image {
        src: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Table,
    TableHead,
    TableRow,
    TableCell {
        header: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        align: Option<&'static str>,
    },
    Rule,
    SoftBreak,
    HardBreak,
    /// Raw HTML from the source, kept as text.
    Html,
    Math {
        display: bool,
    },
    Details,
    Summary,
    /// Word wrapper inserted by the animator.
    Word {
        index: usize,
        fresh: bool,
    },
}

impl Tag {
    /// Tags whose subtree is shown exactly as written.
    pub fn is_verbatim(&self) -> bool {
        matches!(
            self,
            Tag::Pre | Tag::Code { .. } | Tag::Html | Tag::Math { .. }
        )
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn element(tag: Tag, children: Vec<Node>) -> Self {
        Node::Element(Element { tag, children })
    }

    /// Element with no children.
    pub fn void(tag: Tag) -> Self {
        Self::element(tag, Vec::new())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }
}

/// Concatenates the text of `nodes`, ignoring markup.
pub fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    collect_text(nodes, &mut out);
    out
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(Element {
                tag: Tag::SoftBreak | Tag::HardBreak,
                ..
            }) => out.push('\n'),
            Node::Element(element) => collect_text(&element.children, out),
        }
    }
}

/// Serializes `nodes` to HTML.
pub fn to_html(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_nodes(&mut out, nodes);
    out
}

fn write_nodes(out: &mut String, nodes: &[Node]) {
    for node in nodes {
        match node {
            Node::Text(text) => escape_into(out, text),
            Node::Element(element) => write_element(out, element),
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    let children = &element.children;
    match &element.tag {
        Tag::Paragraph => wrap(out, "p", children),
        Tag::Heading { level } => wrap(out, &format!("h{level}"), children),
        Tag::BlockQuote => wrap(out, "blockquote", children),
        Tag::Pre => wrap(out, "pre", children),
        Tag::Code { lang: Some(lang) } => {
            out.push_str("<code class=\"language-");
            escape_into(out, lang);
            out.push_str("\">");
            write_nodes(out, children);
            out.push_str("</code>");
        }
        Tag::Code { lang: None } => wrap(out, "code", children),
        Tag::List { start: None } => wrap(out, "ul", children),
        Tag::List { start: Some(1) } => wrap(out, "ol", children),
        Tag::List { start: Some(start) } => {
            let _ = write!(out, "<ol start=\"{start}\">");
            write_nodes(out, children);
            out.push_str("</ol>");
        }
        Tag::Item => wrap(out, "li", children),
        Tag::TaskMarker { checked } => {
            out.push_str("<input type=\"checkbox\" disabled");
            if *checked {
                out.push_str(" checked");
            }
            out.push_str(" />");
        }
        Tag::Emphasis => wrap(out, "em", children),
        Tag::Strong => wrap(out, "strong", children),
        Tag::Strikethrough => wrap(out, "del", children),
        Tag::Link { href, title } => {
            out.push_str("<a href=\"");
            escape_into(out, href);
            out.push('"');
            write_title(out, title.as_deref());
            out.push('>');
            write_nodes(out, children);
            out.push_str("</a>");
        }
        Tag::Image { src, title } => {
            out.push_str("<img src=\"");
            escape_into(out, src);
            out.push_str("\" alt=\"");
            escape_into(out, &plain_text(children));
            out.push('"');
            write_title(out, title.as_deref());
            out.push_str(" />");
        }
        Tag::Table => wrap(out, "table", children),
        Tag::TableHead => {
            out.push_str("<thead><tr>");
            write_nodes(out, children);
            out.push_str("</tr></thead>");
        }
        Tag::TableRow => wrap(out, "tr", children),
        Tag::TableCell { header, align } => {
            let name = if *header { "th" } else { "td" };
            match align {
                Some(align) => {
                    let _ = write!(out, "<{name} style=\"text-align: {align}\">");
                }
                None => {
                    let _ = write!(out, "<{name}>");
                }
            }
            write_nodes(out, children);
            let _ = write!(out, "</{name}>");
        }
        Tag::Rule => out.push_str("<hr />"),
        Tag::SoftBreak => out.push('\n'),
        Tag::HardBreak => out.push_str("<br />"),
        Tag::Html => write_nodes(out, children),
        Tag::Math { display } => {
            let class = if *display {
                "math math-display"
            } else {
                "math math-inline"
            };
            let _ = write!(out, "<span class=\"{class}\">");
            write_nodes(out, children);
            out.push_str("</span>");
        }
        Tag::Details => wrap(out, "details", children),
        Tag::Summary => wrap(out, "summary", children),
        Tag::Word { index, fresh } => {
            let class = if *fresh { "word fresh" } else { "word" };
            let _ = write!(out, "<span class=\"{class}\" data-word=\"{index}\">");
            write_nodes(out, children);
            out.push_str("</span>");
        }
    }
}

fn wrap(out: &mut String, name: &str, children: &[Node]) {
    let _ = write!(out, "<{name}>");
    write_nodes(out, children);
    let _ = write!(out, "</{name}>");
}

fn write_title(out: &mut String, title: Option<&str>) {
    if let Some(title) = title {
        out.push_str(" title=\"");
        escape_into(out, title);
        out.push('"');
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_html_escapes_text_and_attributes() {
        let nodes = vec![Node::element(
            Tag::Link {
                href: "https://x.test/?a=1&b=\"2\"".to_string(),
                title: None,
            },
            vec![Node::text("<b> & co")],
        )];
        assert_eq!(
            to_html(&nodes),
            "<a href=\"https://x.test/?a=1&amp;b=&quot;2&quot;\">&lt;b&gt; &amp; co</a>"
        );
    }

    #[test]
    fn test_word_wrappers_carry_ordinal_and_fresh_class() {
        let nodes = vec![
            Node::element(
                Tag::Word {
                    index: 0,
                    fresh: false,
                },
                vec![Node::text("old")],
            ),
            Node::text(" "),
            Node::element(
                Tag::Word {
                    index: 1,
                    fresh: true,
                },
                vec![Node::text("new")],
            ),
        ];
        assert_eq!(
            to_html(&nodes),
            "<span class=\"word\" data-word=\"0\">old</span> \
             <span class=\"word fresh\" data-word=\"1\">new</span>"
        );
    }

    #[test]
    fn test_ordered_list_start_attribute() {
        let item = Node::element(Tag::Item, vec![Node::text("x")]);
        let first = Node::element(Tag::List { start: Some(1) }, vec![item.clone()]);
        let third = Node::element(Tag::List { start: Some(3) }, vec![item]);
        assert_eq!(to_html(&[first]), "<ol><li>x</li></ol>");
        assert_eq!(to_html(&[third]), "<ol start=\"3\"><li>x</li></ol>");
    }

    #[test]
    fn test_json_shape() {
        let nodes = vec![Node::element(
            Tag::Heading { level: 2 },
            vec![Node::text("Title")],
        )];
        assert_eq!(
            serde_json::to_value(&nodes).unwrap(),
            json!([{"tag": "heading", "level": 2, "children": ["Title"]}])
        );
    }

    #[test]
    fn test_plain_text_flattens_markup() {
        let nodes = vec![Node::element(
            Tag::Paragraph,
            vec![
                Node::element(Tag::Strong, vec![Node::text("a")]),
                Node::void(Tag::SoftBreak),
                Node::text("b"),
            ],
        )];
        assert_eq!(plain_text(&nodes), "a\nb");
    }
}
