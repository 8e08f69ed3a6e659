// src/output/buffer.rs

//! Merge/flush buffering for one output stream.
//!
//! Subprocess output tends to arrive in bursts of tiny chunks. An
//! [`OutputBuffer`] accumulates those chunks and emits them as one formatted
//! emission when either:
//!
//! - the stream has been silent for the merge threshold (M), or
//! - the flush ticker fires (every F), regardless of activity.
//!
//! The ticker bounds latency to F even when a stream writes more often than
//! every M and the silence timer never gets a chance to fire.
//!
//! The input queue is bounded (about `100 × F` chunks per second of F), so a
//! stalled worker pushes back on the pipe reader, and from there on the OS
//! pipe and the child process.

use std::time::Duration;

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, trace};

use crate::errors::{KeepaliveError, Result};
use crate::exec::Scope;

use super::{Emitter, StreamDecoder};

pub const DEFAULT_MERGE_THRESHOLD: Duration = Duration::from_millis(100);
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

const QUEUED_CHUNKS_PER_SECOND: f64 = 100.0;
const READ_CHUNK_SIZE: usize = 4096;

/// Merge threshold and flush period of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTiming {
    pub merge_threshold: Duration,
    pub flush_timeout: Duration,
}

impl BufferTiming {
    /// Zero durations select the defaults.
    pub fn new(merge_threshold: Duration, flush_timeout: Duration) -> Self {
        Self {
            merge_threshold: non_zero_or(merge_threshold, DEFAULT_MERGE_THRESHOLD),
            flush_timeout: non_zero_or(flush_timeout, DEFAULT_FLUSH_TIMEOUT),
        }
    }

    pub fn queue_capacity(&self) -> usize {
        let capacity = (self.flush_timeout.as_secs_f64() * QUEUED_CHUNKS_PER_SECOND).ceil();
        (capacity as usize).max(1)
    }

    /// How long a buffer may keep draining after its run has ended.
    pub fn grace(&self) -> Duration {
        self.flush_timeout * 2
    }
}

impl Default for BufferTiming {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

fn non_zero_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() { default } else { value }
}

/// Writer side of a running merge/flush worker.
#[derive(Debug)]
pub struct OutputBuffer {
    tx: mpsc::Sender<Vec<u8>>,
    scope: Scope,
    worker: JoinHandle<()>,
    timing: BufferTiming,
}

impl OutputBuffer {
    /// Start a worker emitting through `emitter`.
    ///
    /// The worker is tracked by `scope`'s tracker but has its own
    /// cancellation signal: cancelling `scope` does not stop it.
    pub fn spawn(emitter: Emitter, timing: BufferTiming, scope: &Scope) -> Self {
        let scope = scope.detached();
        let (tx, rx) = mpsc::channel(timing.queue_capacity());
        let worker = scope.spawn(merge_loop(rx, emitter, timing, scope.clone()));
        Self {
            tx,
            scope,
            worker,
            timing,
        }
    }

    /// Queue one chunk, waiting while the queue is full.
    pub async fn write(&self, chunk: impl Into<Vec<u8>>) -> Result<()> {
        self.tx
            .send(chunk.into())
            .await
            .map_err(|_| KeepaliveError::Other(anyhow!("output buffer worker has stopped")))
    }

    /// Feed everything read from `reader` into this buffer in the
    /// background, until EOF or until the buffer is cancelled.
    pub fn pipe_from<R>(&self, reader: R)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.scope
            .spawn(pump(reader, self.tx.clone(), self.scope.clone()));
    }

    /// Stop accepting chunks and let the worker flush what is left.
    ///
    /// If the worker has not finished within the grace period (typically
    /// because a pipe is still held open by a grandchild process), it is
    /// cancelled, drains its queue, flushes once more and stops.
    pub async fn close(self) {
        let Self {
            tx,
            scope,
            mut worker,
            timing,
        } = self;
        drop(tx);

        if tokio::time::timeout(timing.grace(), &mut worker).await.is_err() {
            debug!(grace = ?timing.grace(), "output buffer still open after grace period; cancelling");
            scope.cancel();
            let _ = worker.await;
        }
    }
}

async fn pump<R>(mut reader: R, tx: mpsc::Sender<Vec<u8>>, scope: Scope)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = tokio::select! {
            () = scope.cancelled() => break,
            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "pipe read failed");
                    break;
                }
            },
        };

        let sent = tokio::select! {
            () = scope.cancelled() => break,
            sent = tx.send(buf[..n].to_vec()) => sent,
        };
        if sent.is_err() {
            break;
        }
    }
    trace!("pipe pump finished");
}

async fn merge_loop(
    mut rx: mpsc::Receiver<Vec<u8>>,
    emitter: Emitter,
    timing: BufferTiming,
    scope: Scope,
) {
    let mut pending: Vec<u8> = Vec::new();
    let mut decoder = emitter.stream_decoder();

    let silence = sleep(timing.merge_threshold);
    tokio::pin!(silence);
    let mut silence_armed = false;

    let mut ticker = interval_at(Instant::now() + timing.flush_timeout, timing.flush_timeout);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            () = scope.cancelled() => {
                while let Ok(chunk) = rx.try_recv() {
                    pending.extend_from_slice(&chunk);
                }
                flush(&emitter, &mut decoder, &mut pending, true);
                break;
            }

            _ = ticker.tick() => flush(&emitter, &mut decoder, &mut pending, false),

            () = &mut silence, if silence_armed => {
                silence_armed = false;
                flush(&emitter, &mut decoder, &mut pending, false);
            }

            chunk = rx.recv() => match chunk {
                Some(chunk) => {
                    pending.extend_from_slice(&chunk);
                    silence.as_mut().reset(Instant::now() + timing.merge_threshold);
                    silence_armed = true;
                }
                None => {
                    flush(&emitter, &mut decoder, &mut pending, true);
                    break;
                }
            },
        }
    }
    trace!("output buffer worker finished");
}

/// Decode and emit `pending`. A partial character at the end stays in
/// `decoder` until the next flush; `last` releases it.
fn flush(emitter: &Emitter, decoder: &mut StreamDecoder, pending: &mut Vec<u8>, last: bool) {
    if pending.is_empty() && !last {
        return;
    }
    let text = decoder.decode(pending, last);
    pending.clear();
    if !text.is_empty() {
        emitter.emit_text(&text);
    }
}
