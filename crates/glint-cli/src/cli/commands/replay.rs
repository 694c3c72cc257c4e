//! Replay command handler: feeds a recorded event stream through the pipeline.

use std::fs;
use std::io::{self, Read};
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::stream;
use glint_core::config::Config;
use glint_core::transcript::TranscriptReducer;
use tracing::debug;

use super::pump;
use crate::cli::output::OutputFormat;

pub struct ReplayOptions<'a> {
    pub file: &'a Path,
    pub chunk_size: NonZeroUsize,
    pub format: OutputFormat,
    pub config: &'a Config,
}

pub async fn run(options: ReplayOptions<'_>) -> Result<()> {
    let data = Bytes::from(read_input(options.file)?);
    let chunks = split_chunks(&data, options.chunk_size);
    debug!(bytes = data.len(), chunks = chunks.len(), "replaying recorded stream");

    let body = stream::iter(chunks.into_iter().map(Ok::<_, io::Error>));
    pump(body, TranscriptReducer::new(), options.format, &options.config.render).await
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("read stream from stdin")?;
        return Ok(buf);
    }
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

/// Cuts `data` into fixed-size chunks without copying.
fn split_chunks(data: &Bytes, size: NonZeroUsize) -> Vec<Bytes> {
    let size = size.get();
    (0..data.len())
        .step_by(size)
        .map(|start| data.slice(start..data.len().min(start + size)))
        .collect()
}
