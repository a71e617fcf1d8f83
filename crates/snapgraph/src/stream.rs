// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot stream framing
//!
//! # Format Overview
//!
//! ```text
//! +---------------------------------------------------------+
//! |                    Header (32 bytes)                     |
//! |  Magic (8) | Version (4) | Signature (16) | Reserved (4) |
//! +---------------------------------------------------------+
//! |                    Body                                  |
//! |  root_count (varint) | [tag][payload] per root           |
//! +---------------------------------------------------------+
//! |                    CRC32 of body (4, LE)                 |
//! +---------------------------------------------------------+
//! ```
//!
//! All roots share one session, so an object reachable from two roots is
//! written once. The signature is the writing registry's
//! [`signature`](CodecRegistry::signature); a reader with a different
//! binding table treats the stream as a cache miss rather than an error.
//! Corruption offsets are relative to the start of the body.

use crate::context::{ReadContext, SessionStats, WriteContext};
use crate::error::{CodecError, Result};
use crate::model::Value;
use crate::registry::CodecRegistry;
use crate::services::ServiceLocator;
use crate::wire::Decoder;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Magic bytes: "SNAPGRPH"
pub const MAGIC: [u8; 8] = *b"SNAPGRPH";

/// Current wire format version.
pub const FORMAT_VERSION: u32 = 1;

/// Stream header (32 bytes, fixed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Format version (4).
    pub version: u32,
    /// Registry signature (16).
    pub signature: [u8; 16],
    /// Reserved (4).
    pub reserved: u32,
}

impl StreamHeader {
    pub const SIZE: usize = 32;

    pub fn new(signature: [u8; 16]) -> Self {
        Self {
            version: FORMAT_VERSION,
            signature,
            reserved: 0,
        }
    }

    pub fn write<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(&MAGIC)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_all(&self.signature)?;
        w.write_u32::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    pub fn read<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let mut raw = [0u8; Self::SIZE];
        r.read_exact(&mut raw).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => CodecError::CorruptStream {
                offset: 0,
                reason: "truncated header".into(),
            },
            _ => CodecError::Io(e),
        })?;
        if raw[..8] != MAGIC {
            return Err(CodecError::CorruptStream {
                offset: 0,
                reason: "invalid snapshot magic".into(),
            });
        }

        let mut rest = &raw[8..];
        let version = rest.read_u32::<LittleEndian>()?;
        let mut signature = [0u8; 16];
        rest.read_exact(&mut signature)?;
        let reserved = rest.read_u32::<LittleEndian>()?;
        Ok(Self {
            version,
            signature,
            reserved,
        })
    }
}

/// Summary returned by [`verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub header: StreamHeader,
    pub body_len: u64,
    pub checksum: u32,
    pub roots: u64,
}

struct CrcWriter<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
}

impl<W: Write> Write for CrcWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Write `roots` as one snapshot stream.
///
/// On error the trailer is never written, so the partial stream cannot
/// pass [`verify`] or [`read_snapshot`].
pub fn write_snapshot(
    registry: &CodecRegistry,
    sink: &mut dyn Write,
    roots: &[Value],
) -> Result<SessionStats> {
    StreamHeader::new(registry.signature()).write(sink)?;

    let mut body = CrcWriter {
        inner: &mut *sink,
        hasher: crc32fast::Hasher::new(),
    };
    let stats = {
        let mut ctx = WriteContext::new(registry, &mut body);
        ctx.write_varint(roots.len() as u64)?;
        for root in roots {
            ctx.write(root)?;
        }
        ctx.finish()?
    };
    let checksum = body.hasher.finalize();

    sink.write_u32::<LittleEndian>(checksum)?;
    sink.flush()?;
    tracing::debug!(roots = roots.len(), bytes = stats.bytes, checksum, "snapshot written");
    Ok(stats)
}

/// Split the remainder of a stream into body and checked trailer.
fn read_body(source: &mut dyn Read) -> Result<Vec<u8>> {
    let mut rest = Vec::new();
    source.read_to_end(&mut rest)?;
    if rest.len() < 4 {
        return Err(CodecError::CorruptStream {
            offset: 0,
            reason: "truncated payload: missing checksum trailer".into(),
        });
    }
    let split = rest.len() - 4;
    let stored = (&rest[split..]).read_u32::<LittleEndian>()?;
    rest.truncate(split);

    let computed = crc32fast::hash(&rest);
    if stored != computed {
        return Err(CodecError::CorruptStream {
            offset: split as u64,
            reason: format!("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"),
        });
    }
    Ok(rest)
}

/// Read a snapshot stream written by [`write_snapshot`].
///
/// Returns `Ok(None)` when the stream was written by a different format
/// version or binding table.
pub fn read_snapshot(
    registry: &CodecRegistry,
    source: &mut dyn Read,
    services: &dyn ServiceLocator,
) -> Result<Option<Vec<Value>>> {
    let header = StreamHeader::read(source)?;
    if header.version != FORMAT_VERSION {
        tracing::info!(
            found = header.version,
            expected = FORMAT_VERSION,
            "snapshot format version mismatch, treating as cache miss"
        );
        return Ok(None);
    }
    if header.signature != registry.signature() {
        tracing::info!("snapshot written with a different binding table, treating as cache miss");
        return Ok(None);
    }

    let body = read_body(source)?;
    let mut cursor = body.as_slice();
    let roots = {
        let mut ctx = ReadContext::new(registry, &mut cursor, services);
        let count = ctx.read_count()?;
        let mut roots = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            roots.push(ctx.read()?);
        }
        ctx.finish();
        roots
    };
    if !cursor.is_empty() {
        return Err(CodecError::CorruptStream {
            offset: (body.len() - cursor.len()) as u64,
            reason: format!("{} trailing bytes after last root", cursor.len()),
        });
    }
    Ok(Some(roots))
}

/// Check header and checksum without decoding any value.
pub fn verify(source: &mut dyn Read) -> Result<StreamSummary> {
    let header = StreamHeader::read(source)?;
    let body = read_body(source)?;
    let roots = Decoder::new(body.as_slice()).read_varint()?;
    Ok(StreamSummary {
        header,
        body_len: body.len() as u64,
        checksum: crc32fast::hash(&body),
        roots,
    })
}

/// Write a snapshot file, replacing `path` only once the stream is complete.
pub fn save(registry: &CodecRegistry, path: impl AsRef<Path>, roots: &[Value]) -> Result<SessionStats> {
    let path = path.as_ref();
    let partial = partial_path(path);
    let result = (|| -> Result<SessionStats> {
        let mut writer = BufWriter::new(File::create(&partial)?);
        let stats = write_snapshot(registry, &mut writer, roots)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(stats)
    })();
    match result {
        Ok(stats) => {
            fs::rename(&partial, path)?;
            Ok(stats)
        }
        Err(err) => {
            let _ = fs::remove_file(&partial);
            Err(err)
        }
    }
}

/// `entry.bin` is staged as `entry.bin.partial`, so files differing only in
/// extension never share a staging file.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// Load a snapshot file. A missing file is a cache miss.
pub fn load(
    registry: &CodecRegistry,
    path: impl AsRef<Path>,
    services: &dyn ServiceLocator,
) -> Result<Option<Vec<Value>>> {
    let mut file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    read_snapshot(registry, &mut file, services)
}
