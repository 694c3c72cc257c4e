//! The pull loop feeding network chunks through the splitter, decoder and reducer.

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{StreamError, StreamResult};
use crate::protocol::{FrameSplitter, decode_frame};
use crate::transcript::{Applied, TranscriptReducer};

/// How a stream ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The body ended normally.
    Completed,
    /// The cancellation token fired; the body was released early.
    Cancelled,
}

/// Counters collected while driving one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamReport {
    pub outcome: StreamOutcome,
    /// Complete frames cut from the body.
    pub frames: usize,
    /// Events that changed the transcript.
    pub applied: usize,
    /// Events rejected by the reducer (e.g. deltas with nothing open).
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct Counters {
    frames: usize,
    applied: usize,
    dropped: usize,
}

impl Counters {
    fn finish(self, outcome: StreamOutcome) -> StreamReport {
        StreamReport {
            outcome,
            frames: self.frames,
            applied: self.applied,
            dropped: self.dropped,
        }
    }
}

/// Drives a response body to completion, applying every event in arrival order.
///
/// Each chunk is processed completely before the next read is requested. The
/// token is checked before every read and raced against the pending read; on
/// cancellation the body is dropped and the open message frozen. A body error
/// freezes the open message and is returned; whatever was assembled stays in
/// the transcript.
///
/// # Errors
/// Returns a [`StreamError`] of kind `Body` if reading the body fails.
pub async fn drive<S, B, E>(
    body: S,
    reducer: &mut TranscriptReducer,
    cancel: &CancellationToken,
) -> StreamResult<StreamReport>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::error::Error + 'static,
{
    let mut body = body;
    let mut splitter = FrameSplitter::new();
    let mut counters = Counters::default();

    loop {
        if cancel.is_cancelled() {
            return Ok(cancelled(body, &mut splitter, reducer, counters));
        }

        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            chunk = body.next() => Some(chunk),
        };
        let Some(chunk) = next else {
            return Ok(cancelled(body, &mut splitter, reducer, counters));
        };

        match chunk {
            Some(Ok(bytes)) => {
                for frame in splitter.push(bytes.as_ref()) {
                    counters.frames += 1;
                    match reducer.apply(decode_frame(&frame)) {
                        Applied::Mutated => counters.applied += 1,
                        Applied::Dropped(_) => counters.dropped += 1,
                        Applied::Ignored => {}
                    }
                }
            }
            Some(Err(err)) => {
                drop(body);
                splitter.finish();
                reducer.fail();
                return Err(StreamError::body(&err));
            }
            None => {
                splitter.finish();
                reducer.complete();
                debug!(frames = counters.frames, "stream completed");
                return Ok(counters.finish(StreamOutcome::Completed));
            }
        }
    }
}

fn cancelled<S>(
    body: S,
    splitter: &mut FrameSplitter,
    reducer: &mut TranscriptReducer,
    counters: Counters,
) -> StreamReport {
    // Release the network reader before touching the transcript.
    drop(body);
    splitter.finish();
    reducer.cancel();
    debug!(frames = counters.frames, "stream cancelled");
    counters.finish(StreamOutcome::Cancelled)
}
