use bytes::BytesMut;
use futures::SinkExt;
use std::{io, pin::Pin};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf, WriteHalf};
use tokio::time::timeout;
use tokio_util::codec::{Decoder, FramedWrite};
use tracing::{debug, trace};

use super::codec::{Frame, ScpiCodec};
use super::command::Command;
use super::Result;
use crate::config::MeterConfig;

pub trait AsyncChannel: AsyncRead + AsyncWrite + Send {}

impl<T> AsyncChannel for T where T: AsyncRead + AsyncWrite + Send {}

/// Duplex byte stream to the meter: a serial port, or anything else that
/// reads and writes bytes.
pub type Channel = Pin<Box<dyn AsyncChannel>>;

/// Turns the raw byte stream into CR LF terminated frames.
pub struct Framer {
    reader: ReadHalf<Channel>,
    writer: FramedWrite<WriteHalf<Channel>, ScpiCodec>,
    decoder: ScpiCodec,
    rx: BytesMut,
    config: MeterConfig,
}

fn is_idle(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

impl Framer {
    pub fn new(channel: impl AsyncChannel + 'static, config: MeterConfig) -> Self {
        let channel: Channel = Box::pin(channel);
        let (reader, writer) = tokio::io::split(channel);
        Self {
            reader,
            writer: FramedWrite::new(writer, ScpiCodec::default()),
            decoder: ScpiCodec::default(),
            rx: BytesMut::with_capacity(config.chunk_size),
            config,
        }
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    /// Read until a complete frame arrives or the port stays silent for
    /// `idle_read_limit` consecutive reads.
    ///
    /// Silence yields an empty frame, not an error. Only hard read
    /// failures are returned as `Err`.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        self.rx.clear();
        let mut chunk = vec![0u8; self.config.chunk_size.max(1)];
        let mut idle = 0;

        loop {
            let n = match timeout(self.config.read_timeout, self.reader.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(err)) if is_idle(&err) => 0,
                Ok(Err(err)) => return Err(err.into()),
                Err(_elapsed) => 0,
            };

            if n == 0 {
                idle += 1;
                if idle >= self.config.idle_read_limit {
                    if !self.rx.is_empty() {
                        trace!(bytes = self.rx.len(), "dropping unterminated input");
                        self.rx.clear();
                    }
                    return Ok(Frame::empty());
                }
                continue;
            }

            idle = 0;
            self.rx.extend_from_slice(&chunk[..n]);
            let frame = match self.decoder.decode(&mut self.rx)? {
                Some(frame) => frame,
                None if self.rx.len() > self.config.max_frame_len => {
                    trace!(bytes = self.rx.len(), "no terminator, dropping input");
                    self.rx.clear();
                    return Ok(Frame::empty());
                }
                None => continue,
            };

            if !self.rx.is_empty() {
                trace!(
                    bytes = self.rx.len(),
                    command = ?self.writer.encoder().last_command(),
                    "discarding bytes after terminator"
                );
                self.rx.clear();
            }
            trace!(frame = ?frame.as_bytes(), "frame complete");
            return Ok(frame);
        }
    }

    /// Write a command without waiting for a reply.
    pub async fn send(&mut self, command: Command) -> Result<()> {
        debug!(%command, "send");
        self.writer.send(command).await?;
        Ok(())
    }

    /// Write a command and decode the reply line, if a usable one arrives.
    pub async fn send_and_read(&mut self, command: Command) -> Result<Option<String>> {
        self.send(command).await?;
        let line = self.read_frame().await?.decode();
        debug!(?line, "received");
        Ok(line)
    }

    /// Flush and shut down the channel. Errors are only logged.
    pub async fn close(mut self) {
        if let Err(err) = self.writer.close().await {
            debug!(%err, "error while closing channel");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::fake::FakeChannel;
    use crate::proto::MeterError;
    use std::time::Duration;

    fn framer(fake: &FakeChannel) -> Framer {
        Framer::new(fake.clone(), MeterConfig::default())
    }

    #[tokio::test]
    async fn accumulates_chunks_until_terminator() {
        let fake = FakeChannel::default()
            .preload(b"+1.2345E+00\r\n")
            .chunked(3);
        let mut framer = framer(&fake);
        let frame = framer.read_frame().await.expect("read");
        assert_eq!(frame.as_bytes(), b"+1.2345E+00\r\n");
        assert_eq!(fake.reads(), 5);
    }

    #[tokio::test]
    async fn trailing_noise_is_dropped() {
        let fake = FakeChannel::default().preload(b"VOLT\r\nVOLT\r\nxx");
        let mut framer = framer(&fake);
        let frame = framer.read_frame().await.expect("read");
        assert_eq!(frame.as_bytes(), b"VOLT\r\n");

        let next = framer.read_frame().await.expect("read");
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn silent_channel_gives_up_after_three_reads() {
        let fake = FakeChannel::default();
        let mut framer = framer(&fake);
        let frame = framer.read_frame().await.expect("read");
        assert!(frame.is_empty());
        assert_eq!(fake.reads(), 3);
        assert_eq!(fake.empty_reads(), 3);
    }

    #[tokio::test]
    async fn partial_reply_is_abandoned() {
        let fake = FakeChannel::default().preload(b"1.23");
        let mut framer = framer(&fake);
        let frame = framer.read_frame().await.expect("read");
        assert!(frame.is_empty());
        assert_eq!(fake.reads(), 4);
    }

    #[tokio::test]
    async fn idle_read_errors_count_as_empty_reads() {
        for kind in [
            io::ErrorKind::TimedOut,
            io::ErrorKind::WouldBlock,
            io::ErrorKind::Interrupted,
        ] {
            let fake = FakeChannel::default().fail_reads(kind);
            let mut framer = framer(&fake);
            let frame = framer.read_frame().await.expect("read");
            assert!(frame.is_empty(), "{:?}", kind);
            assert_eq!(fake.reads(), 3, "{:?}", kind);
        }
    }

    #[tokio::test]
    async fn hard_read_error_is_escalated() {
        let fake = FakeChannel::default().fail_reads(io::ErrorKind::BrokenPipe);
        let mut framer = framer(&fake);
        let err = framer.read_frame().await.unwrap_err();
        assert!(matches!(err, MeterError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert_eq!(fake.reads(), 1);
    }

    #[tokio::test]
    async fn endless_line_is_abandoned() {
        let fake = FakeChannel::default().preload(&[b'7'; 4096]);
        let mut framer = framer(&fake);
        let frame = framer.read_frame().await.expect("read");
        assert!(frame.is_empty());
        // 17 chunks of 64 bytes are the first to exceed 1024 buffered bytes.
        assert_eq!(fake.reads(), 17);
    }

    #[tokio::test(start_paused = true)]
    async fn read_timeout_bounds_the_wait() {
        // The far end never writes, so every read runs into the timeout.
        let (port, _meter) = tokio::io::duplex(64);
        let mut framer = Framer::new(port, MeterConfig::default());
        let start = tokio::time::Instant::now();
        let frame = framer.read_frame().await.expect("read");
        assert!(frame.is_empty());
        let budget = MeterConfig::default().frame_budget();
        assert!(start.elapsed() >= budget);
        assert!(start.elapsed() < budget + Duration::from_millis(10));
    }

    #[tokio::test]
    async fn send_and_read_returns_decoded_line() {
        let fake = FakeChannel::default().reply("FUNC?", b"\"VOLT\"\r\n");
        let mut framer = framer(&fake);
        let line = framer.send_and_read(Command::Function).await.expect("io");
        assert_eq!(line.as_deref(), Some("\"VOLT\""));
        assert_eq!(fake.writes(), vec!["FUNC?".to_string()]);
    }

    #[tokio::test]
    async fn send_and_read_without_reply() {
        let fake = FakeChannel::default();
        let mut framer = framer(&fake);
        let line = framer.send_and_read(Command::Measure).await.expect("io");
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn write_failure_is_escalated() {
        let fake = FakeChannel::default().fail_writes();
        let mut framer = framer(&fake);
        let err = framer.send_and_read(Command::Identify).await.unwrap_err();
        assert!(matches!(err, MeterError::Io(_)));
        assert_eq!(fake.reads(), 0);
    }

    #[tokio::test]
    async fn close_shuts_down_channel() {
        let fake = FakeChannel::default();
        framer(&fake).close().await;
        assert_eq!(fake.shutdowns(), 1);
    }

    #[test]
    fn frame_budget() {
        assert_eq!(
            MeterConfig::default().frame_budget(),
            Duration::from_millis(300)
        );
    }
}
