//! Markdown to content tree.
//!
//! Folds pulldown-cmark events into an owned [`Node`] tree. Tags we do not
//! model (footnote definitions, definition lists, metadata) are transparent:
//! their children are kept, the wrapper is dropped.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, Options, Parser, Tag as MdTag, TagEnd};

use crate::tree::{Element, Node, Tag};

/// Compiles markdown into a content tree.
pub fn compile(markdown: &str) -> Vec<Node> {
    if markdown.is_empty() {
        return Vec::new();
    }

    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(markdown, options()) {
        builder.process_event(event);
    }
    builder.finish()
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    options
}

/// An element under construction. `tag == None` marks a transparent wrapper.
struct Frame {
    tag: Option<Tag>,
    children: Vec<Node>,
}

struct TreeBuilder {
    /// Open frames; the bottom frame is the document root.
    stack: Vec<Frame>,
    /// Column alignments of the current table.
    alignments: Vec<Alignment>,
    /// Cell index within the current row.
    cell: usize,
    in_table_head: bool,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame {
                tag: None,
                children: Vec::new(),
            }],
            alignments: Vec::new(),
            cell: 0,
            in_table_head: false,
        }
    }

    fn process_event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_leaf(Tag::Code { lang: None }, &code),
            Event::Html(html) | Event::InlineHtml(html) => self.push_leaf(Tag::Html, &html),
            Event::InlineMath(math) => self.push_leaf(Tag::Math { display: false }, &math),
            Event::DisplayMath(math) => self.push_leaf(Tag::Math { display: true }, &math),
            Event::FootnoteReference(label) => self.push_text(&format!("[^{label}]")),
            Event::SoftBreak => self.push_node(Node::void(Tag::SoftBreak)),
            Event::HardBreak => self.push_node(Node::void(Tag::HardBreak)),
            Event::Rule => self.push_node(Node::void(Tag::Rule)),
            Event::TaskListMarker(checked) => {
                self.push_node(Node::void(Tag::TaskMarker { checked }));
            }
        }
    }

    fn start_tag(&mut self, tag: MdTag<'_>) {
        let tag = match tag {
            MdTag::Paragraph => Some(Tag::Paragraph),
            MdTag::Heading { level, .. } => Some(Tag::Heading { level: level as u8 }),
            MdTag::BlockQuote(_) => Some(Tag::BlockQuote),
            MdTag::CodeBlock(kind) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.open(Some(Tag::Pre));
                Some(Tag::Code { lang })
            }
            MdTag::List(start) => Some(Tag::List { start }),
            MdTag::Item => Some(Tag::Item),
            MdTag::Emphasis => Some(Tag::Emphasis),
            MdTag::Strong => Some(Tag::Strong),
            MdTag::Strikethrough => Some(Tag::Strikethrough),
            MdTag::Link {
                dest_url, title, ..
            } => Some(Tag::Link {
                href: dest_url.to_string(),
                title: non_empty(&title),
            }),
            MdTag::Image {
                dest_url, title, ..
            } => Some(Tag::Image {
                src: dest_url.to_string(),
                title: non_empty(&title),
            }),
            MdTag::Table(alignments) => {
                self.alignments = alignments;
                Some(Tag::Table)
            }
            MdTag::TableHead => {
                self.in_table_head = true;
                self.cell = 0;
                Some(Tag::TableHead)
            }
            MdTag::TableRow => {
                self.cell = 0;
                Some(Tag::TableRow)
            }
            MdTag::TableCell => Some(Tag::TableCell {
                header: self.in_table_head,
                align: self.alignments.get(self.cell).and_then(align_name),
            }),
            _ => None,
        };
        self.open(tag);
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::CodeBlock => {
                // Code, then its enclosing Pre.
                self.close();
            }
            TagEnd::TableHead => self.in_table_head = false,
            TagEnd::TableCell => self.cell += 1,
            TagEnd::Table => self.alignments.clear(),
            _ => {}
        }
        self.close();
    }

    fn open(&mut self, tag: Option<Tag>) {
        self.stack.push(Frame {
            tag,
            children: Vec::new(),
        });
    }

    fn close(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame.tag {
            Some(tag) => self.push_node(Node::Element(Element {
                tag,
                children: frame.children,
            })),
            None => {
                for child in frame.children {
                    self.push_node(child);
                }
            }
        }
    }

    fn children(&mut self) -> &mut Vec<Node> {
        // The root frame is never popped.
        let last = self.stack.len() - 1;
        &mut self.stack[last].children
    }

    /// Appends text, merging with a preceding text node so words are not split.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.children();
        if let Some(Node::Text(previous)) = children.last_mut() {
            previous.push_str(text);
        } else {
            children.push(Node::text(text));
        }
    }

    fn push_node(&mut self, node: Node) {
        match node {
            Node::Text(text) => self.push_text(&text),
            element @ Node::Element(_) => self.children().push(element),
        }
    }

    fn push_leaf(&mut self, tag: Tag, text: &str) {
        self.push_node(Node::element(tag, vec![Node::text(text)]));
    }

    fn finish(mut self) -> Vec<Node> {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .map(|root| root.children)
            .unwrap_or_default()
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn align_name(alignment: &Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::to_html;

    #[test]
    fn test_empty_input() {
        assert!(compile("").is_empty());
    }

    #[test]
    fn test_paragraph_with_inline_styles() {
        assert_eq!(
            to_html(&compile("Hello **bold** and *em* and ~~gone~~ `code`")),
            "<p>Hello <strong>bold</strong> and <em>em</em> and <del>gone</del> <code>code</code></p>"
        );
    }

    #[test]
    fn test_fenced_code_block_keeps_language() {
        let nodes = compile("```rust title\nfn main() {}\n```\n");
        assert_eq!(
            nodes,
            vec![Node::element(
                Tag::Pre,
                vec![Node::element(
                    Tag::Code {
                        lang: Some("rust".to_string())
                    },
                    vec![Node::text("fn main() {}\n")]
                )]
            )]
        );
    }

    #[test]
    fn test_unclosed_fence_is_still_a_code_block() {
        let nodes = compile("```js\nlet x=1");
        assert_eq!(nodes[0].as_element().map(|e| &e.tag), Some(&Tag::Pre));
    }

    #[test]
    fn test_table_with_alignment() {
        let html = to_html(&compile("| a | b |\n|:--|--:|\n| 1 | 2 |\n"));
        assert_eq!(
            html,
            "<table><thead><tr><th style=\"text-align: left\">a</th>\
             <th style=\"text-align: right\">b</th></tr></thead>\
             <tr><td style=\"text-align: left\">1</td>\
             <td style=\"text-align: right\">2</td></tr></table>"
        );
    }

    #[test]
    fn test_task_list_and_ordered_start() {
        let html = to_html(&compile("3. three\n4. four\n\n- [x] done\n- [ ] open\n"));
        assert!(html.starts_with("<ol start=\"3\"><li>three</li><li>four</li></ol>"));
        assert!(html.contains("<input type=\"checkbox\" disabled checked />"));
        assert!(html.contains("<input type=\"checkbox\" disabled />"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = to_html(&compile("hi <script>alert(1)</script>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_adjacent_text_events_are_merged() {
        // pulldown-cmark can emit "a", "[", "b" as separate text events.
        let nodes = compile("a[b");
        let paragraph = nodes[0].as_element().unwrap();
        assert_eq!(paragraph.children, vec![Node::text("a[b")]);
    }

    #[test]
    fn test_link_and_heading() {
        assert_eq!(
            to_html(&compile("## See [docs](https://x.test \"Docs\")")),
            "<h2>See <a href=\"https://x.test\" title=\"Docs\">docs</a></h2>"
        );
    }
}
