// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Low-level wire primitives.
//!
//! ```text
//! varint   : unsigned LEB128, at most 10 bytes
//! svarint  : zigzag(i64) as varint
//! bool     : 1 byte (0 | 1)
//! f32/f64  : little-endian IEEE-754 bits
//! string   : varint byte length | UTF-8 bytes
//! ```
//!
//! Read errors are reported as [`CodecError::CorruptStream`] with the byte
//! offset where the failing read started; an unexpected end of input is a
//! truncated payload, never a plain I/O error.

use crate::error::{CodecError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Longest valid varint encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Encoder over any byte sink, tracking the number of bytes written.
pub struct Encoder<W: Write> {
    sink: W,
    written: u64,
}

impl<W: Write> Encoder<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn write_varint(&mut self, mut value: u64) -> Result<()> {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let mut len = 0;
        loop {
            let byte = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }
            buf[len] = byte | 0x80;
            len += 1;
        }
        self.write_raw(&buf[..len])
    }

    pub fn write_svarint(&mut self, value: i64) -> Result<()> {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.sink.write_u8(value)?;
        self.written += 1;
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.sink.write_f32::<LittleEndian>(value)?;
        self.written += 4;
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.sink.write_f64::<LittleEndian>(value)?;
        self.written += 8;
        Ok(())
    }

    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.write_raw(value.as_bytes())
    }

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.sink.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}

/// Decoder over any byte source, tracking the number of bytes consumed.
pub struct Decoder<R: Read> {
    source: R,
    consumed: u64,
}

impl<R: Read> Decoder<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            consumed: 0,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.consumed
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Build a corruption error at the current offset.
    pub fn corrupt(&self, reason: impl Into<String>) -> CodecError {
        CodecError::CorruptStream {
            offset: self.consumed,
            reason: reason.into(),
        }
    }

    fn map_io(offset: u64, err: io::Error) -> CodecError {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::CorruptStream {
                offset,
                reason: "truncated payload".into(),
            }
        } else {
            CodecError::Io(err)
        }
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let start = self.consumed;
        let mut value: u64 = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            let bits = u64::from(byte & 0x7f);
            if i == MAX_VARINT_LEN - 1 && bits > 1 {
                break;
            }
            value |= bits << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(CodecError::CorruptStream {
            offset: start,
            reason: "varint overflows 64 bits".into(),
        })
    }

    /// Read a varint that must fit in `u32` (tags, counts, ids).
    pub fn read_varint_u32(&mut self) -> Result<u32> {
        let start = self.consumed;
        let value = self.read_varint()?;
        u32::try_from(value).map_err(|_| CodecError::CorruptStream {
            offset: start,
            reason: format!("value {value} out of range"),
        })
    }

    pub fn read_svarint(&mut self) -> Result<i64> {
        let raw = self.read_varint()?;
        Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let start = self.consumed;
        let byte = self.source.read_u8().map_err(|e| Self::map_io(start, e))?;
        self.consumed += 1;
        Ok(byte)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::CorruptStream {
                offset: self.consumed - 1,
                reason: format!("invalid bool byte {other:#04x}"),
            }),
        }
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let start = self.consumed;
        let value = self
            .source
            .read_f32::<LittleEndian>()
            .map_err(|e| Self::map_io(start, e))?;
        self.consumed += 4;
        Ok(value)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let start = self.consumed;
        let value = self
            .source
            .read_f64::<LittleEndian>()
            .map_err(|e| Self::map_io(start, e))?;
        self.consumed += 8;
        Ok(value)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let start = self.consumed;
        let bytes = self.read_raw_vec()?;
        String::from_utf8(bytes).map_err(|_| CodecError::CorruptStream {
            offset: start,
            reason: "invalid UTF-8 in string".into(),
        })
    }

    /// Read a varint length followed by that many bytes.
    pub fn read_raw_vec(&mut self) -> Result<Vec<u8>> {
        let len = self.read_varint()?;
        let start = self.consumed;
        let mut bytes = Vec::new();
        // `take` keeps a corrupt length from allocating up front.
        (&mut self.source)
            .take(len)
            .read_to_end(&mut bytes)
            .map_err(|e| Self::map_io(start, e))?;
        self.consumed += bytes.len() as u64;
        if (bytes.len() as u64) < len {
            return Err(CodecError::CorruptStream {
                offset: start,
                reason: format!("truncated payload: expected {len} bytes, got {}", bytes.len()),
            });
        }
        Ok(bytes)
    }
}
