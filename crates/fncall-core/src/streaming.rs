//! Streaming extraction: text and invocation events from model output as it
//! arrives, chunk by chunk.
//!
//! The session alternates between two states:
//!
//! - **Outside a fence**: text is emitted as soon as it cannot be the start of
//!   a fence. When the unconsumed tail of the buffer matches a prefix of the
//!   start fence, that tail is held back until the next chunk decides it.
//! - **Inside a fence**: nothing is emitted until the end fence arrives; the
//!   whole fenced block (both fences included) then goes to the formatter and
//!   each parsed invocation is emitted in order.
//!
//! Each chunk is processed in a loop until no further progress is possible, so
//! one chunk can close a payload, emit text, and open the next payload.
//!
//! # Key design decisions
//!
//! - **Explicit state**: [`StreamState`] is a plain value threaded through
//!   [`StreamState::feed`]; [`ToolCallStream`] only adds the formatter, the
//!   callback and the failure policy on top.
//! - **End fence after start fence**: the end fence is searched for after the
//!   start fence, so identical fences (```` ``` ````) work.
//! - **Failure policy**: a payload that fails to translate is always skipped
//!   and its error returned. Under [`FailurePolicy::Poison`] the session then
//!   refuses further input; under [`FailurePolicy::Resume`] it carries on.
//! - **Chunking independence**: any split of the same output yields the same
//!   events once adjacent text events are joined.

use crate::error::{Result, ToolCallError};
use crate::formatter::{FencedFormatter, ModelFormatter};
use crate::response::{ResponseFormat, Syntax};
use crate::types::Invocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One event emitted by a streaming session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEvent {
    Text(String),
    Invocation(Invocation),
}

/// What a session does after a payload fails to translate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Every later `feed`/`finish` fails with [`ToolCallError::StreamPoisoned`].
    #[default]
    Poison,
    /// Skip the failed payload and keep consuming chunks.
    Resume,
}

/// Streaming configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    #[serde(default)]
    pub on_error: FailurePolicy,
}

/// Buffered output plus the fence state of one stream.
///
/// `cursor` never exceeds the buffer length, and while `inside_fence` is set
/// the unconsumed buffer starts with the start fence. Consumed text is dropped
/// after every `feed`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    buffer: String,
    cursor: usize,
    inside_fence: bool,
}

impl StreamState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn inside_fence(&self) -> bool {
        self.inside_fence
    }

    /// Text received but not yet emitted or translated.
    pub fn pending(&self) -> &str {
        &self.buffer[self.cursor..]
    }

    /// Append `chunk` and emit every event it makes unambiguous.
    ///
    /// A payload that fails to translate is skipped and its error returned;
    /// events emitted before the failure stand.
    pub fn feed<F, E>(&mut self, chunk: &str, formatter: &F, emit: &mut E) -> Result<()>
    where
        F: ModelFormatter + ?Sized,
        E: FnMut(StreamEvent),
    {
        self.buffer.push_str(chunk);
        let result = self.process(formatter, emit);
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        result
    }

    /// Flush whatever is left at the end of the stream.
    ///
    /// Held-back text is emitted as text. An unterminated payload is handed to
    /// the formatter as is; if it does not translate it is emitted as text.
    pub fn finish<F, E>(&mut self, formatter: &F, emit: &mut E)
    where
        F: ModelFormatter + ?Sized,
        E: FnMut(StreamEvent),
    {
        let rest = &self.buffer[self.cursor..];
        if self.inside_fence {
            match formatter.parse_response(rest) {
                Ok(response) => {
                    for invocation in response.into_invocations() {
                        emit(StreamEvent::Invocation(invocation));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "unterminated tool call payload kept as text");
                    emit_text(rest, emit);
                }
            }
        } else {
            emit_text(rest, emit);
        }
        self.buffer.clear();
        self.cursor = 0;
        self.inside_fence = false;
    }

    fn process<F, E>(&mut self, formatter: &F, emit: &mut E) -> Result<()>
    where
        F: ModelFormatter + ?Sized,
        E: FnMut(StreamEvent),
    {
        let start = formatter.code_fence_start();
        let end = formatter.code_fence_end();
        if start.is_empty() {
            // Nothing can open a fence.
            emit_text(&self.buffer[self.cursor..], emit);
            self.cursor = self.buffer.len();
            return Ok(());
        }

        while self.cursor < self.buffer.len() {
            if !self.inside_fence {
                let pending = &self.buffer[self.cursor..];
                if let Some(found) = pending.find(start) {
                    emit_text(&pending[..found], emit);
                    self.cursor += found;
                    self.inside_fence = true;
                    debug!(offset = self.cursor, "tool call fence opened");
                } else {
                    let overlap = suffix_matches_prefix(pending, start);
                    let held = pending.len() - overlap;
                    emit_text(&pending[..held], emit);
                    self.cursor += held;
                    if overlap > 0 {
                        break;
                    }
                }
            }

            if self.inside_fence {
                let search_from = self.cursor + start.len();
                let Some(found) = self.buffer[search_from..].find(end) else {
                    break;
                };
                let payload_end = search_from + found + end.len();
                let parsed = formatter.parse_response(&self.buffer[self.cursor..payload_end]);
                self.cursor = payload_end;
                self.inside_fence = false;

                let invocations = parsed?.into_invocations();
                debug!(invocations = invocations.len(), "tool call fence closed");
                for invocation in invocations {
                    emit(StreamEvent::Invocation(invocation));
                }
            }
        }
        Ok(())
    }
}

fn emit_text<E: FnMut(StreamEvent)>(text: &str, emit: &mut E) {
    if !text.is_empty() {
        emit(StreamEvent::Text(text.to_string()));
    }
}

/// Length of the longest suffix of `a` that is also a prefix of `b`.
///
/// # Examples
///
/// ```
/// use fncall_core::suffix_matches_prefix;
///
/// assert_eq!(suffix_matches_prefix("text ``", "```tool_code"), 2);
/// assert_eq!(suffix_matches_prefix("text", "```"), 0);
/// ```
pub fn suffix_matches_prefix(a: &str, b: &str) -> usize {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    let max_overlap = a.len().min(b.len());
    (1..=max_overlap)
        .rev()
        .find(|&len| a[a.len() - len..] == b[..len])
        .unwrap_or(0)
}

/// A streaming session: a formatter, an event callback and a failure policy
/// around a [`StreamState`].
///
/// # Examples
///
/// ```
/// use fncall_core::{GemmaFormatter, StreamEvent, ToolCallStream};
///
/// let mut events = Vec::new();
/// let mut stream = ToolCallStream::new(GemmaFormatter, |event| events.push(event));
/// for chunk in ["Sure.\n``", "`tool_code\nget_", "time()\n```"] {
///     stream.feed(chunk).unwrap();
/// }
/// stream.finish().unwrap();
///
/// assert_eq!(events[0], StreamEvent::Text("Sure.\n".to_string()));
/// assert!(matches!(&events[1], StreamEvent::Invocation(call) if call.name == "get_time"));
/// ```
pub struct ToolCallStream<F, C> {
    formatter: F,
    callback: C,
    state: StreamState,
    policy: FailurePolicy,
    poisoned: bool,
}

impl<F, C> ToolCallStream<F, C>
where
    F: ModelFormatter,
    C: FnMut(StreamEvent),
{
    pub fn new(formatter: F, callback: C) -> Self {
        Self {
            formatter,
            callback,
            state: StreamState::new(),
            policy: FailurePolicy::default(),
            poisoned: false,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(self, options: &StreamOptions) -> Self {
        self.with_policy(options.on_error)
    }

    pub fn formatter(&self) -> &F {
        &self.formatter
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Feed the next chunk of model output.
    pub fn feed(&mut self, chunk: &str) -> Result<()> {
        if self.poisoned {
            return Err(ToolCallError::StreamPoisoned);
        }
        let result = self
            .state
            .feed(chunk, &self.formatter, &mut self.callback);
        if let Err(err) = &result {
            warn!(error = %err, policy = ?self.policy, "tool call payload failed to translate");
            if self.policy == FailurePolicy::Poison {
                self.poisoned = true;
            }
        }
        result
    }

    /// End the stream, flushing held-back text and any unterminated payload.
    pub fn finish(mut self) -> Result<StreamState> {
        if self.poisoned {
            return Err(ToolCallError::StreamPoisoned);
        }
        self.state.finish(&self.formatter, &mut self.callback);
        Ok(self.state)
    }
}

impl<C> ToolCallStream<FencedFormatter, C>
where
    C: FnMut(StreamEvent),
{
    /// A session for literal fences around payloads in `syntax`.
    pub fn with_fences(
        syntax: Syntax,
        fence_start: impl Into<String>,
        fence_end: impl Into<String>,
        callback: C,
    ) -> Self {
        let format = ResponseFormat::new(syntax, fence_start, fence_end);
        Self::new(FencedFormatter::new(format), callback)
    }
}

impl<'a, F> ToolCallStream<F, Box<dyn FnMut(StreamEvent) + 'a>>
where
    F: ModelFormatter,
{
    /// A session with separate text and invocation handlers.
    pub fn with_handlers<T, I>(formatter: F, mut on_text: T, mut on_invocation: I) -> Self
    where
        T: FnMut(String) + 'a,
        I: FnMut(Invocation) + 'a,
    {
        Self::new(
            formatter,
            Box::new(move |event| match event {
                StreamEvent::Text(text) => on_text(text),
                StreamEvent::Invocation(invocation) => on_invocation(invocation),
            }),
        )
    }
}
