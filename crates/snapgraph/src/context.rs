// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-session encoding and decoding state.
//!
//! A session is one sequential walk over one graph. The contexts own the
//! identity tables (object -> reference id), the type and string tables, the
//! current property path, and the work lists used by the reentrancy guard.
//! Nothing in a context is shared across sessions.
//!
//! Identity marker on the wire:
//!
//! ```text
//! varint 0      first occurrence, payload follows, next id is assigned
//! varint n > 0  back-reference to id n - 1, no further payload
//! ```

use crate::codec::reentrant::{DecodeFrame, EncodeFrame};
use crate::error::{CodecError, Result};
use crate::services::ServiceLocator;
use crate::model::{ObjectRef, TypeDescriptor, TypeRef, Value};
use crate::registry::CodecRegistry;
use crate::trace::{PropertyTrace, Segment};
use crate::wire::{Decoder, Encoder};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::rc::Rc;
use std::sync::Arc;

/// Counters reported when a session completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Distinct heap objects written or read.
    pub objects: usize,
    /// Distinct type descriptors in the type table.
    pub types: usize,
    /// Bytes written or consumed.
    pub bytes: u64,
}

/// Encoding session.
pub struct WriteContext<'a> {
    registry: &'a CodecRegistry,
    encoder: Encoder<&'a mut dyn Write>,
    identities: HashMap<usize, u32>,
    // Keeps every registered object alive so an address cannot be reused
    // by a different object within the session.
    retained: Vec<ObjectRef>,
    types: HashMap<TypeDescriptor, u32>,
    strings: HashMap<String, u32>,
    trace: Rc<PropertyTrace>,
    pub(crate) frames: Vec<EncodeFrame>,
    pub(crate) draining: bool,
    // Isolated codecs recurse through `write`; this bounds the nesting.
    pub(crate) isolated_depth: usize,
}

impl<'a> WriteContext<'a> {
    pub fn new(registry: &'a CodecRegistry, sink: &'a mut dyn Write) -> Self {
        Self {
            registry,
            encoder: Encoder::new(sink),
            identities: HashMap::new(),
            retained: Vec::new(),
            types: HashMap::new(),
            strings: HashMap::new(),
            trace: PropertyTrace::root(),
            frames: Vec::new(),
            draining: false,
            isolated_depth: 0,
        }
    }

    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    /// Encode `value` as `[tag][payload]`, re-entering the registry.
    pub fn write(&mut self, value: &Value) -> Result<()> {
        let registry = self.registry;
        registry.encode(value, self)
    }

    /// Encode `value` one path segment below the current one.
    pub fn write_at(&mut self, segment: Segment, value: &Value) -> Result<()> {
        let trace = PropertyTrace::child(&self.trace, segment);
        self.with_trace(trace, |ctx| ctx.write(value))
    }

    pub fn encoder(&mut self) -> &mut Encoder<&'a mut dyn Write> {
        &mut self.encoder
    }

    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        self.encoder.write_varint(value)
    }

    pub fn write_svarint(&mut self, value: i64) -> Result<()> {
        self.encoder.write_svarint(value)
    }

    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.encoder.write_str(value)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.encoder.write_bool(value)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.encoder.write_u8(value)
    }

    /// Write the identity marker for `obj`.
    ///
    /// Returns `true` if `obj` was already written in this session, in which
    /// case a back-reference was emitted and the caller must stop. Otherwise
    /// a new id is assigned and the caller writes the payload.
    pub fn write_identity(&mut self, obj: &ObjectRef) -> Result<bool> {
        let key = obj.identity();
        if let Some(&id) = self.identities.get(&key) {
            self.encoder.write_varint(u64::from(id) + 1)?;
            return Ok(true);
        }
        let id = self.retained.len() as u32;
        self.identities.insert(key, id);
        self.retained.push(obj.clone());
        self.encoder.write_varint(0)?;
        Ok(false)
    }

    /// Write a type descriptor through the session type table.
    pub fn write_type(&mut self, ty: &TypeDescriptor) -> Result<()> {
        if let Some(&id) = self.types.get(ty) {
            return self.encoder.write_varint(u64::from(id) + 1);
        }
        let id = self.types.len() as u32;
        self.types.insert(ty.clone(), id);
        self.encoder.write_varint(0)?;
        self.encoder.write_str(ty.name())?;
        self.encoder.write_varint(ty.supertypes().len() as u64)?;
        for supertype in ty.supertypes() {
            self.encoder.write_str(supertype)?;
        }
        Ok(())
    }

    /// Write a string through the session string table.
    pub fn write_interned(&mut self, value: &str) -> Result<()> {
        if let Some(&id) = self.strings.get(value) {
            return self.encoder.write_varint(u64::from(id) + 1);
        }
        let id = self.strings.len() as u32;
        self.strings.insert(value.to_string(), id);
        self.encoder.write_varint(0)?;
        self.encoder.write_str(value)
    }

    /// Current property path.
    pub fn trace(&self) -> &Rc<PropertyTrace> {
        &self.trace
    }

    /// Run `f` with `trace` as the current path, restoring it afterwards.
    pub fn with_trace<T>(
        &mut self,
        trace: Rc<PropertyTrace>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.trace, trace);
        let result = f(self);
        self.trace = saved;
        result
    }

    pub fn unsupported(&self, type_name: &str, category: &str) -> CodecError {
        CodecError::UnsupportedType {
            type_name: type_name.to_string(),
            category: category.to_string(),
            trace: self.trace.to_string(),
        }
    }

    pub fn failure(&self, message: impl Into<String>) -> CodecError {
        CodecError::Serialization {
            trace: self.trace.to_string(),
            message: message.into(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            objects: self.retained.len(),
            types: self.types.len(),
            bytes: self.encoder.position(),
        }
    }

    /// Flush the sink and end the session.
    pub fn finish(mut self) -> Result<SessionStats> {
        self.encoder.flush()?;
        let stats = self.stats();
        tracing::debug!(
            objects = stats.objects,
            types = stats.types,
            bytes = stats.bytes,
            "encode session finished"
        );
        Ok(stats)
    }
}

/// Decoding session.
pub struct ReadContext<'a> {
    registry: &'a CodecRegistry,
    decoder: Decoder<&'a mut dyn Read>,
    services: &'a dyn ServiceLocator,
    objects: Vec<ObjectRef>,
    types: Vec<TypeRef>,
    strings: Vec<String>,
    trace: Rc<PropertyTrace>,
    pub(crate) frames: Vec<DecodeFrame>,
    pub(crate) draining: bool,
    pub(crate) isolated_depth: usize,
}

impl<'a> ReadContext<'a> {
    pub fn new(
        registry: &'a CodecRegistry,
        source: &'a mut dyn Read,
        services: &'a dyn ServiceLocator,
    ) -> Self {
        Self {
            registry,
            decoder: Decoder::new(source),
            services,
            objects: Vec::new(),
            types: Vec::new(),
            strings: Vec::new(),
            trace: PropertyTrace::root(),
            frames: Vec::new(),
            draining: false,
            isolated_depth: 0,
        }
    }

    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    /// Host services available to owner-service codecs.
    pub fn services(&self) -> &'a dyn ServiceLocator {
        self.services
    }

    /// Decode the next `[tag][payload]`.
    pub fn read(&mut self) -> Result<Value> {
        let tag = self.decoder.read_varint_u32()?;
        let registry = self.registry;
        registry.decode(tag, self)
    }

    /// Decode the next value one path segment below the current one.
    pub fn read_at(&mut self, segment: Segment) -> Result<Value> {
        let trace = PropertyTrace::child(&self.trace, segment);
        self.with_trace(trace, |ctx| ctx.read())
    }

    pub fn decoder(&mut self) -> &mut Decoder<&'a mut dyn Read> {
        &mut self.decoder
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        self.decoder.read_varint()
    }

    pub fn read_svarint(&mut self) -> Result<i64> {
        self.decoder.read_svarint()
    }

    pub fn read_string(&mut self) -> Result<String> {
        self.decoder.read_string()
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.decoder.read_bool()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.decoder.read_u8()
    }

    /// Read an element/entry count.
    pub fn read_count(&mut self) -> Result<usize> {
        Ok(self.decoder.read_varint_u32()? as usize)
    }

    /// Read an identity marker.
    ///
    /// `Some(obj)` for a back-reference; `None` for a first occurrence, in
    /// which case the caller must [`register`](Self::register) its
    /// placeholder before decoding anything nested.
    pub fn read_identity(&mut self) -> Result<Option<ObjectRef>> {
        let marker = self.decoder.read_varint()?;
        if marker == 0 {
            return Ok(None);
        }
        let id = marker - 1;
        usize::try_from(id)
            .ok()
            .and_then(|i| self.objects.get(i))
            .cloned()
            .map(Some)
            .ok_or_else(|| self.corrupt(format!("reference id {id} has no matching placeholder")))
    }

    /// Register a (possibly unfilled) object under the next reference id.
    pub fn register(&mut self, obj: ObjectRef) {
        self.objects.push(obj);
    }

    pub fn read_type(&mut self) -> Result<TypeRef> {
        let marker = self.decoder.read_varint()?;
        if marker == 0 {
            let name = self.decoder.read_string()?;
            let count = self.read_count()?;
            let mut builder = TypeDescriptor::builder(name);
            for _ in 0..count {
                builder = builder.extends(self.decoder.read_string()?);
            }
            let ty: TypeRef = builder.build();
            self.types.push(Arc::clone(&ty));
            return Ok(ty);
        }
        usize::try_from(marker - 1)
            .ok()
            .and_then(|i| self.types.get(i))
            .cloned()
            .ok_or_else(|| self.corrupt(format!("unknown type id {}", marker - 1)))
    }

    pub fn read_interned(&mut self) -> Result<String> {
        let marker = self.decoder.read_varint()?;
        if marker == 0 {
            let value = self.decoder.read_string()?;
            self.strings.push(value.clone());
            return Ok(value);
        }
        usize::try_from(marker - 1)
            .ok()
            .and_then(|i| self.strings.get(i))
            .cloned()
            .ok_or_else(|| self.corrupt(format!("unknown string id {}", marker - 1)))
    }

    pub fn trace(&self) -> &Rc<PropertyTrace> {
        &self.trace
    }

    pub fn with_trace<T>(
        &mut self,
        trace: Rc<PropertyTrace>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.trace, trace);
        let result = f(self);
        self.trace = saved;
        result
    }

    pub fn corrupt(&self, reason: impl Into<String>) -> CodecError {
        self.decoder.corrupt(reason)
    }

    pub fn failure(&self, message: impl Into<String>) -> CodecError {
        CodecError::Serialization {
            trace: self.trace.to_string(),
            message: message.into(),
        }
    }

    pub fn rehydration(&self, service: &str) -> CodecError {
        CodecError::Rehydration {
            service: service.to_string(),
            trace: self.trace.to_string(),
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            objects: self.objects.len(),
            types: self.types.len(),
            bytes: self.decoder.position(),
        }
    }

    pub fn finish(self) -> SessionStats {
        let stats = self.stats();
        tracing::debug!(
            objects = stats.objects,
            types = stats.types,
            bytes = stats.bytes,
            "decode session finished"
        );
        stats
    }
}
