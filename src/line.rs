//! Line-based codec for tokio.
//!
//! Incoming bytes are split on `\n`, stripped of the line ending and
//! decoded as UTF-8, with invalid sequences replaced rather than failing
//! the connection. Outgoing lines get `\r\n` appended.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::ProtocolError;

/// Longest accepted line: 8191 bytes of tags plus a 512-byte message.
pub const MAX_LINE_LEN: usize = 8191 + 512;

/// Codec that reads and writes IRC lines as `String`s.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }
}

impl LineCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }

    fn validate_outgoing(line: &str) -> Result<(), ProtocolError> {
        match line.chars().find(|c| matches!(c, '\0' | '\r' | '\n')) {
            Some(ch) => Err(ProtocolError::IllegalControlChar(ch)),
            None => Ok(()),
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::LineTooLong(line.len()));
            }

            let data = match String::from_utf8(line.to_vec()) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        byte_pos = e.utf8_error().valid_up_to(),
                        "invalid UTF-8 in line, replacing"
                    );
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            };

            Ok(Some(data.trim_end_matches(['\r', '\n']).to_owned()))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::LineTooLong(src.len()));
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        Self::validate_outgoing(&line)?;
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
