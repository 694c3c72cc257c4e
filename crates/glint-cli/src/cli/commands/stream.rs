//! Stream command handler.

use anyhow::{Context, Result};
use glint_core::config::Config;
use glint_core::stream::StreamClient;
use glint_core::transcript::TranscriptReducer;

use super::pump;
use crate::cli::output::OutputFormat;

pub struct StreamOptions<'a> {
    pub prompt: &'a str,
    pub endpoint: Option<&'a str>,
    pub format: OutputFormat,
    pub config: &'a Config,
}

pub async fn run(options: StreamOptions<'_>) -> Result<()> {
    let endpoint = options.config.resolve_endpoint(options.endpoint)?;
    let client = StreamClient::new(&endpoint, options.config.stream.connect_timeout())?;

    let mut reducer = TranscriptReducer::new();
    reducer.push_user(options.prompt);

    let body = client
        .open(reducer.messages())
        .await
        .with_context(|| format!("open stream at {endpoint}"))?;

    pump(body, reducer, options.format, &options.config.render).await
}
