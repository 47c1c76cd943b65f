//! Input and output channels of a machine.
//!
//! A machine reads through an [`InputSource`] and writes through an
//! [`OutputSink`]. Both are attached once, at construction, and the machine
//! never knows what backs them:
//!
//! - [`VecDeque<i64>`] / [`Vec<i64>`]: in-memory queues for cooperative driving
//! - [`FnInput`] / [`FnOutput`]: host callbacks
//! - [`ChannelInput`] / [`ChannelOutput`]: bounded inter-thread queues, see [`channel`]
//! - [`LineInput`]: interactive line-based input (e.g. stdin)
//! - [`AsciiInput`]: text encoded as character codes
//! - [`Chain`] and `(A, B)`: composites for priming inputs and fanning out outputs

use crate::warn;
use std::collections::VecDeque;
use std::io::{self, BufRead, StdinLock};
use tokio::sync::mpsc;

/// Source of input values.
pub trait InputSource {
    /// Returns the next value, or `None` if none is available right now.
    ///
    /// `None` suspends the machine; the same input instruction is retried on
    /// the next resume. Implementations may block before answering.
    fn next(&mut self) -> Option<i64>;
}

/// Sink for output values.
pub trait OutputSink {
    /// Accepts one value. Implementations may block until a consumer makes room.
    fn send(&mut self, value: i64);
}

impl InputSource for VecDeque<i64> {
    fn next(&mut self) -> Option<i64> {
        self.pop_front()
    }
}

/// No input is ever available.
impl InputSource for () {
    fn next(&mut self) -> Option<i64> {
        None
    }
}

impl<T: InputSource + ?Sized> InputSource for &mut T {
    fn next(&mut self) -> Option<i64> {
        (**self).next()
    }
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn next(&mut self) -> Option<i64> {
        (**self).next()
    }
}

/// A detached source (`None`) never yields a value.
impl<T: InputSource> InputSource for Option<T> {
    fn next(&mut self) -> Option<i64> {
        self.as_mut().and_then(T::next)
    }
}

impl OutputSink for Vec<i64> {
    fn send(&mut self, value: i64) {
        self.push(value);
    }
}

impl OutputSink for VecDeque<i64> {
    fn send(&mut self, value: i64) {
        self.push_back(value);
    }
}

/// Discards every value.
impl OutputSink for () {
    fn send(&mut self, _value: i64) {}
}

impl<T: OutputSink + ?Sized> OutputSink for &mut T {
    fn send(&mut self, value: i64) {
        (**self).send(value)
    }
}

impl<T: OutputSink + ?Sized> OutputSink for Box<T> {
    fn send(&mut self, value: i64) {
        (**self).send(value)
    }
}

/// A detached sink (`None`) discards every value.
impl<T: OutputSink> OutputSink for Option<T> {
    fn send(&mut self, value: i64) {
        if let Some(sink) = self {
            sink.send(value);
        }
    }
}

/// Fan-out: every value goes to both sinks, first `A` then `B`.
impl<A: OutputSink, B: OutputSink> OutputSink for (A, B) {
    fn send(&mut self, value: i64) {
        self.0.send(value);
        self.1.send(value);
    }
}

/// Input backed by a host callback.
pub struct FnInput<F>(pub F);

impl<F: FnMut() -> Option<i64>> InputSource for FnInput<F> {
    fn next(&mut self) -> Option<i64> {
        (self.0)()
    }
}

/// Output backed by a host callback.
pub struct FnOutput<F>(pub F);

impl<F: FnMut(i64)> OutputSink for FnOutput<F> {
    fn send(&mut self, value: i64) {
        (self.0)(value)
    }
}

/// Drains `first`, then falls back to `second`.
///
/// Used to prime a machine with fixed values (a phase setting, a seed)
/// ahead of a live source.
pub struct Chain<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: InputSource, B: InputSource> InputSource for Chain<A, B> {
    fn next(&mut self) -> Option<i64> {
        self.first.next().or_else(|| self.second.next())
    }
}

/// Creates a bounded single-producer single-consumer channel between two machines.
///
/// Both ends block: the sender while the buffer holds `capacity` values, the
/// receiver while it is empty. A capacity of zero is treated as one. The
/// blocking calls must not be made from inside an async runtime; machines
/// sharing a channel are driven on plain OS threads.
pub fn channel(capacity: usize) -> (ChannelOutput, ChannelInput) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelOutput { tx, dropped: 0 }, ChannelInput { rx })
}

/// Receiving end of [`channel`].
#[derive(Debug)]
pub struct ChannelInput {
    rx: mpsc::Receiver<i64>,
}

impl InputSource for ChannelInput {
    /// Blocks until a value arrives. Returns `None` once every sender is gone
    /// and the buffer is empty.
    fn next(&mut self) -> Option<i64> {
        self.rx.blocking_recv()
    }
}

impl ChannelInput {
    /// Returns a buffered value without blocking.
    pub fn try_next(&mut self) -> Option<i64> {
        self.rx.try_recv().ok()
    }
}

/// Sending end of [`channel`].
#[derive(Debug)]
pub struct ChannelOutput {
    tx: mpsc::Sender<i64>,
    dropped: usize,
}

impl OutputSink for ChannelOutput {
    /// Blocks while the buffer is full. Values sent after the receiver is gone
    /// are counted in [`ChannelOutput::dropped`] and discarded.
    fn send(&mut self, value: i64) {
        if self.tx.blocking_send(value).is_err() {
            self.dropped += 1;
        }
    }
}

impl ChannelOutput {
    /// Number of values discarded because the receiving end was closed.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Text input encoded as character codes.
///
/// Each queued line is followed by a newline (`10`).
#[derive(Clone, Debug, Default)]
pub struct AsciiInput {
    pending: VecDeque<i64>,
}

impl AsciiInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `line` followed by a newline.
    pub fn push_line(&mut self, line: &str) {
        self.pending.extend(line.bytes().map(i64::from));
        self.pending.push_back(10);
    }

    /// Number of codes still queued.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl From<&str> for AsciiInput {
    /// Queues every line of `text`.
    fn from(text: &str) -> Self {
        let mut input = Self::new();
        for line in text.lines() {
            input.push_line(line);
        }
        input
    }
}

impl InputSource for AsciiInput {
    fn next(&mut self) -> Option<i64> {
        self.pending.pop_front()
    }
}

/// Returns `value` as a character if it is 7-bit ASCII.
pub fn ascii_char(value: i64) -> Option<char> {
    u8::try_from(value)
        .ok()
        .filter(u8::is_ascii)
        .map(char::from)
}

/// Interactive input read one line at a time.
///
/// In numeric mode each line holds one integer; malformed lines are reported
/// and skipped. In ASCII mode each line is fed as character codes followed by
/// a newline. End of input yields `None`.
pub struct LineInput<R> {
    reader: R,
    ascii: bool,
    pending: VecDeque<i64>,
}

impl<R: BufRead> LineInput<R> {
    pub fn new(reader: R, ascii: bool) -> Self {
        Self {
            reader,
            ascii,
            pending: VecDeque::new(),
        }
    }

    fn fill(&mut self) -> bool {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return false,
                Ok(_) => {}
                Err(e) => {
                    warn!("failed to read input: {e}");
                    return false;
                }
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if self.ascii {
                self.pending.extend(line.bytes().map(i64::from));
                self.pending.push_back(10);
                return true;
            }
            match line.trim().parse::<i64>() {
                Ok(value) => {
                    self.pending.push_back(value);
                    return true;
                }
                Err(_) => warn!("ignoring input {line:?}: expected an integer"),
            }
        }
    }
}

impl LineInput<StdinLock<'static>> {
    /// Reads from the process's standard input.
    pub fn stdin(ascii: bool) -> Self {
        Self::new(io::stdin().lock(), ascii)
    }
}

impl<R: BufRead> InputSource for LineInput<R> {
    fn next(&mut self) -> Option<i64> {
        if self.pending.is_empty() && !self.fill() {
            return None;
        }
        self.pending.pop_front()
    }
}
