use bytes::BytesMut;
use std::{
    fmt::{self, Write},
    io, str,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::proto::command::Command;

/// Every reply from the meter ends with CR LF.
pub const TERMINATOR: &[u8; 2] = b"\r\n";

/// Commands are terminated by a single LF.
const COMMAND_TERMINATOR: &str = "\n";

/// One complete device response including its terminator, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame(BytesMut);

impl Frame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decode the frame into a trimmed text line.
    ///
    /// Returns `None` for an empty frame, for a frame whose terminator is
    /// not at the tail and for a line that is blank once trimmed.
    pub fn decode(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let text = backslash_replace(&self.0);
        match text.find("\r\n") {
            Some(pos) if pos + 2 == text.len() => {
                let line = text.trim();
                if line.is_empty() {
                    None
                } else {
                    Some(line.to_string())
                }
            }
            _ => None,
        }
    }
}

/// Decode UTF-8, replacing every byte of an invalid sequence with `\xNN`.
///
/// The meter sends its unit glyphs as raw bytes (`A6 B8` for Ω), so the
/// escaped form is what the reply repair matches against.
pub fn backslash_replace(mut input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len());
    loop {
        match str::from_utf8(input) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(err) => {
                let (valid, rest) = input.split_at(err.valid_up_to());
                out.push_str(str::from_utf8(valid).unwrap_or_default());
                let bad = err.error_len().unwrap_or(rest.len());
                for b in &rest[..bad] {
                    let _ = write!(out, "\\x{:02x}", b);
                }
                input = &rest[bad..];
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ScpiCodec {
    last_cmd: Option<Command>,
}

impl ScpiCodec {
    pub fn last_command(&self) -> Option<&Command> {
        self.last_cmd.as_ref()
    }
}

impl Decoder for ScpiCodec {
    type Item = Frame;
    type Error = io::Error;

    /// Split off everything up to and including the first CR LF.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let end = src
            .windows(TERMINATOR.len())
            .position(|w| w == TERMINATOR)
            .map(|pos| pos + TERMINATOR.len());
        match end {
            Some(n) => Ok(Some(Frame(src.split_to(n)))),
            None => Ok(None),
        }
    }
}

fn write_fmt_guarded(dst: &mut BytesMut, args: fmt::Arguments<'_>) -> Result<(), io::Error> {
    dst.write_fmt(args)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

impl Encoder<Command> for ScpiCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        write_fmt_guarded(dst, format_args!("{}{}", item, COMMAND_TERMINATOR))?;
        self.last_cmd = Some(item);
        Ok(())
    }
}
