//! Recorded event-stream fixtures for integration tests.
//!
//! Load `.sse` recordings from `tests/fixtures/`.

#![allow(dead_code)]

use std::path::PathBuf;

use wiremock::ResponseTemplate;

// Load fixtures at compile time
pub const TEXT_REPLY: &str = include_str!("fixtures/text_reply.sse");
pub const TOOL_USE: &str = include_str!("fixtures/tool_use.sse");

/// Path of a fixture on disk, for commands that read files.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Wraps a recorded stream in an event-stream response.
pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}
