use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::LLMError;
use crate::http::HttpBodyStream;
use crate::provider::ChatStream;
use crate::types::StreamChunk;

/// Result of decoding a single line of a vendor stream.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// The line carried a normalized chunk.
    Chunk(StreamChunk),
    /// Comment, keep-alive, or an event type with nothing to report.
    Skip,
    /// End-of-stream sentinel such as `[DONE]`.
    Done,
    /// The payload could not be parsed; the reason is kept for diagnostics.
    Malformed(String),
}

impl LineOutcome {
    /// Collapses the outcome into the optional chunk a line parser returns.
    pub fn into_chunk(self) -> Option<StreamChunk> {
        match self {
            LineOutcome::Chunk(chunk) => Some(chunk),
            LineOutcome::Skip | LineOutcome::Done | LineOutcome::Malformed(_) => None,
        }
    }
}

/// A stream line that was dropped because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub provider: &'static str,
    pub line: String,
    pub reason: String,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: dropped stream line ({})", self.provider, self.reason)
    }
}

/// Callback invoked for each dropped stream line.
///
/// Dropping stays the default; the hook only observes.
pub type ParseFailureHook = Arc<dyn Fn(&ParseFailure) + Send + Sync>;

/// Pure per-vendor line decoder.
pub(crate) type DecodeLine = fn(&str) -> LineOutcome;

pub(crate) fn create_stream(
    body: HttpBodyStream,
    provider: &'static str,
    decode: DecodeLine,
    hook: Option<ParseFailureHook>,
) -> ChatStream {
    Box::pin(LineStream::new(body, provider, decode, hook))
}

/// Drains a streaming body so that an error status can be reported with its text.
pub(crate) async fn collect_stream_text(
    mut body: HttpBodyStream,
    provider: &'static str,
) -> Result<String, LLMError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    if let Err(err) = std::str::from_utf8(&bytes) {
        tracing::debug!(provider, %err, "stream error body is not valid UTF-8");
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Splits a byte stream into lines and feeds each one to a vendor decoder.
///
/// The stream finishes after the first terminal chunk, the vendor sentinel,
/// a body error, or the end of the body, whichever comes first.
struct LineStream {
    body: HttpBodyStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<StreamChunk, LLMError>>,
    provider: &'static str,
    decode: DecodeLine,
    hook: Option<ParseFailureHook>,
    stream_closed: bool,
    finished: bool,
}

impl LineStream {
    fn new(
        body: HttpBodyStream,
        provider: &'static str,
        decode: DecodeLine,
        hook: Option<ParseFailureHook>,
    ) -> Self {
        Self {
            body,
            buffer: Vec::new(),
            pending: VecDeque::new(),
            provider,
            decode,
            hook,
            stream_closed: false,
            finished: false,
        }
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        if self.finished {
            return;
        }
        let line = match String::from_utf8(line) {
            Ok(line) => line,
            Err(err) => {
                self.finished = true;
                self.pending.push_back(Err(LLMError::Provider {
                    provider: self.provider,
                    message: format!("invalid UTF-8 in stream chunk: {err}"),
                }));
                return;
            }
        };
        if line.trim().is_empty() {
            return;
        }

        match (self.decode)(&line) {
            LineOutcome::Chunk(chunk) => {
                if chunk.is_terminal() {
                    self.finished = true;
                }
                self.pending.push_back(Ok(chunk));
            }
            LineOutcome::Skip => {}
            LineOutcome::Done => self.finished = true,
            LineOutcome::Malformed(reason) => self.report(line, reason),
        }
    }

    fn report(&self, line: String, reason: String) {
        tracing::debug!(provider = self.provider, %reason, "dropping malformed stream line");
        if let Some(hook) = &self.hook {
            hook(&ParseFailure {
                provider: self.provider,
                line,
                reason,
            });
        }
    }

    fn drain_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
        buffer.iter().position(|b| *b == b'\n').map(|pos| {
            let mut line: Vec<u8> = buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            line
        })
    }
}

impl Stream for LineStream {
    type Item = Result<StreamChunk, LLMError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(item) = this.pending.pop_front() {
                return Poll::Ready(Some(item));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            if this.stream_closed {
                // A final line without a trailing newline still counts.
                if !this.buffer.is_empty() {
                    let mut line = std::mem::take(&mut this.buffer);
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    this.handle_line(line);
                }
                this.finished = true;
                continue;
            }

            match this.body.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.buffer.extend_from_slice(&bytes);
                    while let Some(line) = Self::drain_line(&mut this.buffer) {
                        this.handle_line(line);
                        if this.finished {
                            this.buffer.clear();
                            break;
                        }
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => this.stream_closed = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
