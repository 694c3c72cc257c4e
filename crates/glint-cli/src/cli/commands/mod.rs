//! Command handlers.

pub mod config;
pub mod replay;
pub mod stream;

use anyhow::{Context, Result};
use futures_util::Stream;
use glint_core::config::RenderConfig;
use glint_core::interrupt;
use glint_core::stream::{StreamOutcome, drive};
use glint_core::transcript::TranscriptReducer;
use tracing::debug;

use super::output::{OutputFormat, Printer};

/// Drives `body` into `reducer` on a background task while the printer
/// follows the published snapshots.
///
/// Cancellation (Ctrl+C) is reported as [`interrupt::InterruptedError`] after
/// the partial transcript has been printed.
async fn pump<S, B, E>(
    body: S,
    mut reducer: TranscriptReducer,
    format: OutputFormat,
    render: &RenderConfig,
) -> Result<()>
where
    S: Stream<Item = Result<B, E>> + Unpin + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let rx = reducer.subscribe();
    let cancel = interrupt::token();

    // The reducer is dropped with the task, which ends the printer's follow loop.
    let task = tokio::spawn(async move {
        let report = drive(body, &mut reducer, &cancel).await;
        (reducer.snapshot(), report)
    });

    let mut printer = Printer::stdout(format, render);
    printer.follow(rx).await?;
    let (snapshot, report) = task.await.context("stream task failed")?;
    printer.finish(&snapshot)?;

    let report = report?;
    debug!(
        frames = report.frames,
        applied = report.applied,
        dropped = report.dropped,
        outcome = ?report.outcome,
        "stream finished"
    );
    match report.outcome {
        StreamOutcome::Completed => Ok(()),
        StreamOutcome::Cancelled => Err(interrupt::InterruptedError.into()),
    }
}
