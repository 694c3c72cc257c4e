//! Incremental markdown rendering for streaming transcripts.
//!
//! - [`buffer`]: render-safe split of a growing text
//! - [`compile`]: markdown to content tree
//! - [`animate`]: word wrappers for fade-in
//! - [`view`]: per-message render cache fed by transcript snapshots
//! - [`tree`]: the content tree and its HTML serializer

pub mod animate;
pub mod buffer;
pub mod compile;
pub mod tree;
pub mod view;

pub use buffer::RenderBuffer;
pub use compile::compile;
pub use tree::{Element, Node, Tag, to_html};
pub use view::{RenderedMessage, TranscriptView};
