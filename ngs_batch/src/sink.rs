use std::{
    io::{self, Write},
    sync::Mutex,
};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Destination for job output and progress text.  Appends are
/// fire-and-forget: implementations must not fail or block the caller.
pub trait OutputSink: Send + Sync {
    fn append(&self, text: &str);
}

/// Sends text over an unbounded channel to whoever drains it.  The
/// foreground side polls the receiver on its own schedule, so the worker
/// never waits on display code.
pub struct ChannelSink {
    tx: Sender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, Receiver<String>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl OutputSink for ChannelSink {
    fn append(&self, text: &str) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.tx.send(text.to_owned());
    }
}

/// Writes directly to stdout; used by the command line front end
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn append(&self, text: &str) {
        let mut out = io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Accumulates appended text for later inspection
#[derive(Default)]
pub struct MemorySink {
    buf: Mutex<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buf.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

impl OutputSink for MemorySink {
    fn append(&self, text: &str) {
        if let Ok(mut b) = self.buf.lock() {
            b.push_str(text)
        }
    }
}

/// Adapter that prefixes every chunk with a job label before forwarding
pub struct PrefixSink<'a> {
    inner: &'a dyn OutputSink,
    prefix: String,
}

impl<'a> PrefixSink<'a> {
    pub fn new(inner: &'a dyn OutputSink, prefix: String) -> Self {
        Self { inner, prefix }
    }
}

impl OutputSink for PrefixSink<'_> {
    fn append(&self, text: &str) {
        self.inner.append(&format!("{}{}", self.prefix, text))
    }
}
