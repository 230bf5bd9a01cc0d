use std::collections::{HashMap, VecDeque};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory stand-in for the serial port.
///
/// Replies are scripted per command line. A read with nothing queued
/// returns zero bytes, which the framer counts as an empty read.
/// Clones share state, so a test can keep one to inspect traffic.
#[derive(Clone, Default)]
pub(crate) struct FakeChannel {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    once: HashMap<String, VecDeque<Vec<u8>>>,
    always: HashMap<String, Vec<u8>>,
    partial: Vec<u8>,
    rx: VecDeque<u8>,
    chunk: Option<usize>,
    fail_writes: bool,
    fail_reads: Option<std::io::ErrorKind>,
    writes: Vec<String>,
    reads: usize,
    empty_reads: usize,
    shutdowns: usize,
}

impl FakeChannel {
    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake channel poisoned")
    }

    /// Queue a reply for the next time `cmd` is written. An empty reply
    /// means the meter stays silent for that attempt.
    pub(crate) fn reply(self, cmd: &str, bytes: &[u8]) -> Self {
        self.state()
            .once
            .entry(cmd.to_string())
            .or_default()
            .push_back(bytes.to_vec());
        self
    }

    /// Reply used once the queued replies for `cmd` are exhausted.
    pub(crate) fn reply_always(self, cmd: &str, bytes: &[u8]) -> Self {
        self.state().always.insert(cmd.to_string(), bytes.to_vec());
        self
    }

    /// Bytes available to read without any command being sent.
    pub(crate) fn preload(self, bytes: &[u8]) -> Self {
        self.state().rx.extend(bytes);
        self
    }

    /// Hand out at most `n` bytes per read.
    pub(crate) fn chunked(self, n: usize) -> Self {
        self.state().chunk = Some(n);
        self
    }

    pub(crate) fn fail_writes(self) -> Self {
        self.state().fail_writes = true;
        self
    }

    /// Every read fails with `kind`.
    pub(crate) fn fail_reads(self, kind: std::io::ErrorKind) -> Self {
        self.state().fail_reads = Some(kind);
        self
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    pub(crate) fn reads(&self) -> usize {
        self.state().reads
    }

    pub(crate) fn empty_reads(&self) -> usize {
        self.state().empty_reads
    }

    pub(crate) fn shutdowns(&self) -> usize {
        self.state().shutdowns
    }
}

impl FakeState {
    fn on_line(&mut self, line: String) {
        let reply = match self.once.get_mut(&line).and_then(|q| q.pop_front()) {
            Some(reply) => Some(reply),
            None => self.always.get(&line).cloned(),
        };
        if let Some(reply) = reply {
            self.rx.extend(reply);
        }
        self.writes.push(line);
    }
}

impl tokio::io::AsyncRead for FakeChannel {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        let mut state = self.state();
        state.reads += 1;
        if let Some(kind) = state.fail_reads {
            return std::task::Poll::Ready(Err(kind.into()));
        }
        if state.rx.is_empty() {
            state.empty_reads += 1;
        } else {
            let mut c = buf.remaining().min(state.rx.len());
            if let Some(chunk) = state.chunk {
                c = c.min(chunk);
            }
            let data: Vec<u8> = state.rx.drain(0..c).collect();
            buf.put_slice(&data);
        }
        std::task::Poll::Ready(Ok(()))
    }
}

impl tokio::io::AsyncWrite for FakeChannel {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::result::Result<usize, std::io::Error>> {
        let mut state = self.state();
        if state.fail_writes {
            return std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        for b in buf {
            if *b == b'\n' {
                let line = String::from_utf8_lossy(&state.partial).to_string();
                state.partial.clear();
                state.on_line(line);
            } else {
                state.partial.push(*b);
            }
        }
        std::task::Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_shutdown(
        self: Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), std::io::Error>> {
        self.state().shutdowns += 1;
        std::task::Poll::Ready(Ok(()))
    }
}
