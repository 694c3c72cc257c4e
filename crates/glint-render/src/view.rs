//! Per-message render cache driven by transcript snapshots.
//!
//! Frozen messages are compiled once and never touched again. The open message
//! keeps a [`RenderBuffer`] per text field and is recompiled from its committed
//! text on every sync, with word wrappers for the host to fade in.

use glint_core::config::RenderConfig;
use glint_core::transcript::{Message, MessageContent, Role, TranscriptSnapshot};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::animate::{animate, mark_fresh};
use crate::buffer::RenderBuffer;
use crate::compile::compile;
use crate::tree::{Node, Tag};

/// Rendering of one transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedMessage {
    pub index: usize,
    pub role: Role,
    /// Still receiving deltas; only open messages carry word wrappers.
    pub open: bool,
    /// Source `nodes` was built from: the committed markdown while open, the
    /// full text once frozen, pretty JSON for structured content.
    pub text: String,
    pub nodes: Vec<Node>,
}

#[derive(Debug)]
struct LiveMessage {
    index: usize,
    content: RenderBuffer,
    reasoning: RenderBuffer,
    /// Word ordinals already shown, per field.
    content_words: usize,
    reasoning_words: usize,
}

impl LiveMessage {
    fn new(index: usize, word_window: usize) -> Self {
        Self {
            index,
            content: RenderBuffer::new(word_window),
            reasoning: RenderBuffer::new(word_window),
            content_words: 0,
            reasoning_words: 0,
        }
    }
}

/// Renders a transcript incrementally.
#[derive(Debug)]
pub struct TranscriptView {
    word_window: usize,
    animate_words: bool,
    messages: Vec<RenderedMessage>,
    live: Option<LiveMessage>,
}

impl TranscriptView {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            word_window: config.word_window,
            animate_words: config.animate,
            messages: Vec::new(),
            live: None,
        }
    }

    pub fn messages(&self) -> &[RenderedMessage] {
        &self.messages
    }

    pub fn get(&self, index: usize) -> Option<&RenderedMessage> {
        self.messages.get(index)
    }

    /// Brings the view up to date with `snapshot`.
    ///
    /// Returns the indices of messages whose rendering changed.
    pub fn sync(&mut self, snapshot: &TranscriptSnapshot) -> Vec<usize> {
        if snapshot.len() < self.messages.len() {
            debug!(
                cached = self.messages.len(),
                messages = snapshot.len(),
                "transcript shrank, rebuilding view"
            );
            self.messages.clear();
            self.live = None;
        }

        let mut changed = Vec::new();
        for (index, message) in snapshot.messages.iter().enumerate() {
            if self.messages.get(index).is_some_and(|cached| !cached.open) {
                continue;
            }

            let rendered = if snapshot.is_open(index) {
                self.render_live(index, message)
            } else {
                Some(self.render_frozen(index, message))
            };
            let Some(rendered) = rendered else {
                continue;
            };

            if index < self.messages.len() {
                self.messages[index] = rendered;
            } else {
                self.messages.push(rendered);
            }
            changed.push(index);
        }

        changed
    }

    /// Renders the open message. Returns `None` when nothing new was committed.
    fn render_live(&mut self, index: usize, message: &Message) -> Option<RenderedMessage> {
        let started = self.live.as_ref().is_none_or(|live| live.index != index);
        if started {
            self.live = Some(LiveMessage::new(index, self.word_window));
        }
        let live = self.live.as_mut()?;

        let content_grew = live.content.update(message.text());
        let reasoning_grew = live
            .reasoning
            .update(message.reasoning.as_deref().unwrap_or_default());
        if !started && !content_grew && !reasoning_grew && index < self.messages.len() {
            return None;
        }

        let mut nodes = Vec::new();
        if !live.reasoning.committed().is_empty() {
            let mut body = compile(live.reasoning.committed());
            if self.animate_words {
                live.reasoning_words = reveal(&mut body, live.reasoning_words);
            }
            nodes.push(reasoning_section(body));
        }
        let mut content = compile(live.content.committed());
        if self.animate_words {
            live.content_words = reveal(&mut content, live.content_words);
        }
        nodes.extend(content);

        Some(RenderedMessage {
            index,
            role: message.role,
            open: true,
            text: live.content.committed().to_string(),
            nodes,
        })
    }

    /// Renders a message that no longer changes.
    ///
    /// A message that was streaming has its buffers flushed, so the text held
    /// back as unsafe is rendered now.
    fn render_frozen(&mut self, index: usize, message: &Message) -> RenderedMessage {
        let live = self.live.take_if(|live| live.index == index);

        let (text, nodes) = match &message.content {
            MessageContent::Text(text) => {
                let reasoning = message.reasoning.as_deref().unwrap_or_default();
                let (text, reasoning) = match live {
                    Some(mut live) => {
                        live.content.update(text);
                        live.reasoning.update(reasoning);
                        live.content.finish();
                        live.reasoning.finish();
                        debug!(index, len = live.content.text().len(), "message frozen");
                        (
                            live.content.committed().to_string(),
                            live.reasoning.committed().to_string(),
                        )
                    }
                    None => (text.clone(), reasoning.to_string()),
                };

                let mut nodes = Vec::new();
                if !reasoning.is_empty() {
                    nodes.push(reasoning_section(compile(&reasoning)));
                }
                nodes.extend(compile(&text));
                (text, nodes)
            }
            MessageContent::Structured(value) => structured_block(message.role, value),
        };

        RenderedMessage {
            index,
            role: message.role,
            open: false,
            text,
            nodes,
        }
    }
}

/// Wraps words and flags those past `shown` as fresh. Returns the new count.
fn reveal(nodes: &mut Vec<Node>, shown: usize) -> usize {
    let total = animate(nodes);
    mark_fresh(nodes, shown);
    total
}

fn reasoning_section(body: Vec<Node>) -> Node {
    let mut children = vec![Node::element(Tag::Summary, vec![Node::text("Reasoning")])];
    children.extend(body);
    Node::element(Tag::Details, children)
}

/// Labelled code block for tool calls, tool results and other JSON content.
fn structured_block(role: Role, value: &Value) -> (String, Vec<Node>) {
    let name = value.get("name").and_then(Value::as_str).unwrap_or("tool");
    let (label, payload) = match role {
        Role::ToolCall => (format!("Tool call: {name}"), value.get("args")),
        Role::ToolResult => (format!("Tool result: {name}"), value.get("result")),
        Role::User | Role::Assistant => (role.to_string(), Some(value)),
    };

    let mut nodes = vec![Node::element(
        Tag::Paragraph,
        vec![Node::element(Tag::Strong, vec![Node::text(label.clone())])],
    )];
    let mut text = label;
    if let Some(payload) = payload {
        let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        nodes.push(Node::element(
            Tag::Pre,
            vec![Node::element(
                Tag::Code {
                    lang: Some("json".to_string()),
                },
                vec![Node::text(pretty.clone())],
            )],
        ));
        text.push('\n');
        text.push_str(&pretty);
    }
    (text, nodes)
}

#[cfg(test)]
mod tests {
    use glint_core::protocol::{PartKind, StreamEvent};
    use glint_core::transcript::TranscriptReducer;
    use serde_json::json;

    use super::*;
    use crate::tree::to_html;

    fn view() -> TranscriptView {
        TranscriptView::new(&RenderConfig::default())
    }

    fn start(kind: PartKind, payload: &str) -> StreamEvent {
        StreamEvent::PartStart {
            kind,
            payload: payload.to_string(),
        }
    }

    fn delta(kind: PartKind, payload: &str) -> StreamEvent {
        StreamEvent::PartDelta {
            kind,
            payload: payload.to_string(),
        }
    }

    fn html(view: &TranscriptView, index: usize) -> String {
        to_html(&view.get(index).unwrap().nodes)
    }

    #[test]
    fn test_open_message_reveals_words_incrementally() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();

        reducer.apply(start(PartKind::Text, "Hello wor"));
        assert_eq!(view.sync(&reducer.snapshot()), vec![0]);
        let rendered = view.get(0).unwrap();
        assert!(rendered.open);
        assert_eq!(rendered.text, "Hello ");
        assert_eq!(
            html(&view, 0),
            "<p><span class=\"word fresh\" data-word=\"0\">Hello</span></p>"
        );

        reducer.apply(delta(PartKind::Text, "ld and more"));
        view.sync(&reducer.snapshot());
        let html = html(&view, 0);
        assert!(html.contains("<span class=\"word\" data-word=\"0\">Hello</span>"));
        assert!(html.contains("<span class=\"word fresh\" data-word=\"1\">world</span>"));
        assert!(html.contains("<span class=\"word fresh\" data-word=\"2\">and</span>"));
        assert!(!html.contains("more"));
    }

    #[test]
    fn test_unchanged_open_message_is_not_reported() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();
        reducer.apply(start(PartKind::Text, "Hello wor"));
        view.sync(&reducer.snapshot());

        reducer.apply(delta(PartKind::Text, "l"));
        assert!(view.sync(&reducer.snapshot()).is_empty());
    }

    #[test]
    fn test_completion_freezes_without_markers() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();
        reducer.apply(start(PartKind::Text, "Here is code: ```js\nlet x=1"));
        view.sync(&reducer.snapshot());
        assert!(view.get(0).unwrap().nodes.is_empty());

        reducer.complete();
        assert_eq!(view.sync(&reducer.snapshot()), vec![0]);
        let rendered = view.get(0).unwrap();
        assert!(!rendered.open);
        assert_eq!(rendered.text, "Here is code: ```js\nlet x=1");
        assert!(!html(&view, 0).contains("class=\"word"));
    }

    #[test]
    fn test_freezing_flushes_held_back_reasoning() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();
        reducer.apply(start(PartKind::Reasoning, "Let me th"));
        reducer.apply(delta(PartKind::Text, "Answer in `co"));
        view.sync(&reducer.snapshot());
        assert_eq!(view.get(0).unwrap().text, "Answer in ");

        reducer.cancel();
        assert_eq!(view.sync(&reducer.snapshot()), vec![0]);
        let rendered = view.get(0).unwrap();
        assert_eq!(rendered.text, "Answer in `co");
        assert_eq!(
            html(&view, 0),
            "<details><summary>Reasoning</summary><p>Let me th</p></details>\
             <p>Answer in `co</p>"
        );
    }

    #[test]
    fn test_frozen_messages_render_once() {
        let mut reducer = TranscriptReducer::with_history(vec![Message::user("hi *there*")]);
        let mut view = view();
        assert_eq!(view.sync(&reducer.snapshot()), vec![0]);
        assert_eq!(html(&view, 0), "<p>hi <em>there</em></p>");

        reducer.apply(start(PartKind::Text, "reply "));
        assert_eq!(view.sync(&reducer.snapshot()), vec![1]);
    }

    #[test]
    fn test_reasoning_renders_in_details_before_content() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();
        reducer.apply(start(PartKind::Reasoning, "Let me think. "));
        reducer.apply(delta(PartKind::Text, "Answer: 42 "));
        reducer.complete();
        view.sync(&reducer.snapshot());

        assert_eq!(
            html(&view, 0),
            "<details><summary>Reasoning</summary><p>Let me think.</p></details>\
             <p>Answer: 42</p>"
        );
    }

    #[test]
    fn test_tool_messages_render_as_labelled_json() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();
        reducer.apply(StreamEvent::ToolCall {
            name: "search".to_string(),
            args: Some(json!({"q": "rust"})),
        });
        reducer.apply(StreamEvent::ToolResult {
            name: "search".to_string(),
            result: None,
        });
        view.sync(&reducer.snapshot());

        assert_eq!(
            html(&view, 0),
            "<p><strong>Tool call: search</strong></p>\
             <pre><code class=\"language-json\">{\n  &quot;q&quot;: &quot;rust&quot;\n}</code></pre>"
        );
        assert_eq!(
            html(&view, 1),
            "<p><strong>Tool result: search</strong></p>"
        );
    }

    #[test]
    fn test_new_part_start_freezes_previous_message() {
        let mut reducer = TranscriptReducer::new();
        let mut view = view();
        reducer.apply(start(PartKind::Text, "first "));
        view.sync(&reducer.snapshot());
        reducer.apply(start(PartKind::Text, "second "));
        assert_eq!(view.sync(&reducer.snapshot()), vec![0, 1]);

        assert!(!view.get(0).unwrap().open);
        assert_eq!(html(&view, 0), "<p>first</p>");
        assert!(view.get(1).unwrap().open);
    }

    #[test]
    fn test_animation_can_be_disabled() {
        let mut reducer = TranscriptReducer::new();
        let mut view = TranscriptView::new(&RenderConfig {
            animate: false,
            ..RenderConfig::default()
        });
        reducer.apply(start(PartKind::Text, "plain words "));
        view.sync(&reducer.snapshot());
        assert_eq!(html(&view, 0), "<p>plain words</p>");
    }
}
