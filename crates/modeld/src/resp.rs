//! RESP2 frames
//!
//! Requests arrive as arrays of bulk strings; replies use every frame type.
//! Decoding is incremental: an incomplete buffer yields `Ok(None)` and is
//! left untouched until more bytes arrive.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Largest bulk string accepted from a client
const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Largest array accepted from a client
const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Deepest array nesting accepted from a client
const MAX_DEPTH: usize = 32;

/// Malformed input; the connection buffer should be discarded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// First byte is not a RESP type marker
    #[error("unknown frame type byte 0x{0:02x}")]
    UnknownType(u8),
    /// Length or integer field is not a number
    #[error("invalid number in frame header")]
    InvalidNumber,
    /// Declared length exceeds the server limit
    #[error("{kind} too large: {len} (max {max})")]
    TooLarge {
        /// `bulk string` or `array`
        kind: &'static str,
        /// Declared length
        len: usize,
        /// Limit
        max: usize,
    },
    /// Arrays nested deeper than the server limit
    #[error("array nesting exceeds {max} levels")]
    TooDeep {
        /// Limit
        max: usize,
    },
    /// Bulk string not followed by CRLF
    #[error("missing CRLF after bulk string")]
    MissingTerminator,
    /// Simple string or error is not UTF-8
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
}

/// A RESP2 value
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `+OK\r\n`
    Simple(String),
    /// `-ERR message\r\n`
    Error(String),
    /// `:42\r\n`
    Integer(i64),
    /// `$3\r\nfoo\r\n`, or `$-1\r\n` for null
    Bulk(Option<Vec<u8>>),
    /// `*2\r\n...`, or `*-1\r\n` for null
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// `+OK`
    pub fn ok() -> Self {
        Frame::Simple("OK".to_string())
    }

    /// Bulk string from anything byte-like
    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Frame::Bulk(Some(data.into()))
    }

    /// Array of bulk strings
    pub fn bulk_array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        Frame::Array(Some(items.into_iter().map(Frame::bulk).collect()))
    }

    /// `-ERR <message>`
    pub fn err(message: impl std::fmt::Display) -> Self {
        Frame::Error(format!("ERR {}", message))
    }

    /// The bytes of a non-null bulk string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Frame::Bulk(Some(data)) => Some(data),
            _ => None,
        }
    }

    /// Append the wire form of this frame to `dst`
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => put_line(dst, b'+', s.as_bytes()),
            Frame::Error(e) => put_line(dst, b'-', e.as_bytes()),
            Frame::Integer(i) => put_line(dst, b':', i.to_string().as_bytes()),
            Frame::Bulk(None) => dst.put_slice(b"$-1\r\n"),
            Frame::Bulk(Some(data)) => {
                put_line(dst, b'$', data.len().to_string().as_bytes());
                dst.put_slice(data);
                dst.put_slice(b"\r\n");
            }
            Frame::Array(None) => dst.put_slice(b"*-1\r\n"),
            Frame::Array(Some(items)) => {
                put_line(dst, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.encode(dst);
                }
            }
        }
    }

    /// Wire form as an owned buffer
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf
    }

    /// Take one complete frame off the front of `src`
    pub fn decode(src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let mut pos = 0;
        match parse(&src[..], &mut pos, 0)? {
            Some(frame) => {
                src.advance(pos);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

fn put_line(dst: &mut BytesMut, marker: u8, body: &[u8]) {
    dst.put_u8(marker);
    dst.put_slice(body);
    dst.put_slice(b"\r\n");
}

fn parse(buf: &[u8], pos: &mut usize, depth: usize) -> Result<Option<Frame>, FrameError> {
    let Some(&marker) = buf.get(*pos) else {
        return Ok(None);
    };
    *pos += 1;

    let Some(line) = line(buf, pos) else {
        return Ok(None);
    };

    match marker {
        b'+' => Ok(Some(Frame::Simple(utf8(line)?))),
        b'-' => Ok(Some(Frame::Error(utf8(line)?))),
        b':' => Ok(Some(Frame::Integer(number(line)?))),
        b'$' => {
            let len = number(line)?;
            if len < 0 {
                return Ok(Some(Frame::Bulk(None)));
            }
            let len = checked_len(len, MAX_BULK_LEN, "bulk string")?;
            if buf.len() < *pos + len + 2 {
                return Ok(None);
            }
            let data = buf[*pos..*pos + len].to_vec();
            if &buf[*pos + len..*pos + len + 2] != b"\r\n" {
                return Err(FrameError::MissingTerminator);
            }
            *pos += len + 2;
            Ok(Some(Frame::Bulk(Some(data))))
        }
        b'*' => {
            let len = number(line)?;
            if len < 0 {
                return Ok(Some(Frame::Array(None)));
            }
            let len = checked_len(len, MAX_ARRAY_LEN, "array")?;
            if depth >= MAX_DEPTH {
                return Err(FrameError::TooDeep { max: MAX_DEPTH });
            }
            let mut items = Vec::with_capacity(len.min(64));
            for _ in 0..len {
                match parse(buf, pos, depth + 1)? {
                    Some(item) => items.push(item),
                    None => return Ok(None),
                }
            }
            Ok(Some(Frame::Array(Some(items))))
        }
        other => Err(FrameError::UnknownType(other)),
    }
}

/// Bytes up to the next CRLF, advancing past it
fn line<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    let start = *pos;
    let end = buf[start..].windows(2).position(|w| w == b"\r\n")? + start;
    *pos = end + 2;
    Some(&buf[start..end])
}

fn utf8(line: &[u8]) -> Result<String, FrameError> {
    String::from_utf8(line.to_vec()).map_err(|_| FrameError::InvalidUtf8)
}

fn number(line: &[u8]) -> Result<i64, FrameError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(FrameError::InvalidNumber)
}

fn checked_len(len: i64, max: usize, kind: &'static str) -> Result<usize, FrameError> {
    let len = len as usize;
    if len > max {
        return Err(FrameError::TooLarge { kind, len, max });
    }
    Ok(len)
}
