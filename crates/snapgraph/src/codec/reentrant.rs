// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reentrancy guard for structural codecs.
//!
//! A structural codec writes an object's header and hands back its children
//! as a frame instead of encoding them itself. The outermost guarded call in
//! a session drains the frames with a loop; guarded calls reached while
//! draining only push their frame and return. Recursion depth is therefore
//! bounded by heap, not by the native stack.
//!
//! Both directions process frames in the same LIFO order, and a frame is
//! popped as soon as its last slot is taken, so the byte order agrees:
//!
//! ```text
//! encode A { next: B { next: C } }
//!   A header, push [A.next]
//!   pop A.next -> B header, push [B.next]
//!   pop B.next -> C header, push [C.next] ...
//! ```
//!
//! On decode the placeholder for an object is registered in the identity
//! table before any of its slots is read, so back-references to an object
//! that is still being filled resolve to the same instance.

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::{ObjectData, ObjectRef, Shape, Value};
use crate::trace::{MapKeyLabel, PropertyTrace, Segment};
use std::rc::Rc;

/// Result of opening an object on decode.
pub enum Opened {
    /// Back-reference to an object already in the identity table.
    Existing(ObjectRef),
    /// New object (registered, still empty) and the frame that fills it.
    New(ObjectRef, DecodeFrame),
}

/// A codec whose children are processed through frames.
pub trait Structural: Send + Sync {
    fn describe(&self) -> String;

    /// Write the identity marker and header for `value`.
    ///
    /// Returns `None` when a back-reference was written.
    fn open_encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<Option<EncodeFrame>>;

    /// Read the identity marker and header, registering the new object.
    fn open_decode(&self, ctx: &mut ReadContext<'_>) -> Result<Opened>;
}

enum Slot {
    Field(String, Value),
    Element(usize, Value),
    Entry(usize, Value, Value),
}

/// Pending children of one object being encoded.
pub struct EncodeFrame {
    trace: Rc<PropertyTrace>,
    slots: std::vec::IntoIter<Slot>,
}

impl EncodeFrame {
    /// Frame over every child of `data`, in payload order.
    pub fn new(trace: Rc<PropertyTrace>, data: &ObjectData) -> Self {
        let slots: Vec<Slot> = match data {
            ObjectData::Fields(fields) => fields
                .iter()
                .map(|(name, value)| Slot::Field(name.clone(), value.clone()))
                .collect(),
            ObjectData::List(items) | ObjectData::Set(items) | ObjectData::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, value)| Slot::Element(i, value.clone()))
                .collect(),
            ObjectData::Map(entries) => entries
                .iter()
                .enumerate()
                .map(|(i, (k, v))| Slot::Entry(i, k.clone(), v.clone()))
                .collect(),
        };
        Self {
            trace,
            slots: slots.into_iter(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == 0
    }
}

/// Pending slots of one object being decoded.
pub struct DecodeFrame {
    target: ObjectRef,
    shape: Shape,
    next: usize,
    len: usize,
    trace: Rc<PropertyTrace>,
}

impl DecodeFrame {
    pub fn new(target: ObjectRef, shape: Shape, len: usize, trace: Rc<PropertyTrace>) -> Self {
        Self {
            target,
            shape,
            next: 0,
            len,
            trace,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.next >= self.len
    }
}

/// Wraps a [`Structural`] codec so it can be bound like any other codec.
pub struct Reentrant<S> {
    inner: S,
}

/// Guard `inner` against deep and cyclic graphs.
pub fn reentrant<S: Structural>(inner: S) -> Reentrant<S> {
    Reentrant { inner }
}

impl<S: Structural> Reentrant<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Structural> Codec for Reentrant<S> {
    fn describe(&self) -> String {
        format!("reentrant({})", self.inner.describe())
    }

    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        let Some(frame) = self.inner.open_encode(ctx, value)? else {
            return Ok(());
        };
        if !frame.is_empty() {
            ctx.frames.push(frame);
        }
        if ctx.draining {
            return Ok(());
        }

        ctx.draining = true;
        let result = drain_encode(ctx);
        ctx.draining = false;
        if result.is_err() {
            ctx.frames.clear();
        }
        result
    }

    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value> {
        let obj = match self.inner.open_decode(ctx)? {
            Opened::Existing(obj) => return Ok(Value::Object(obj)),
            Opened::New(obj, frame) => {
                if !frame.is_empty() {
                    ctx.frames.push(frame);
                }
                obj
            }
        };
        if ctx.draining {
            return Ok(Value::Object(obj));
        }

        ctx.draining = true;
        let result = drain_decode(ctx);
        ctx.draining = false;
        if result.is_err() {
            ctx.frames.clear();
        }
        result.map(|()| Value::Object(obj))
    }
}

fn drain_encode(ctx: &mut WriteContext<'_>) -> Result<()> {
    while let Some(top) = ctx.frames.last_mut() {
        let Some(slot) = top.slots.next() else {
            ctx.frames.pop();
            continue;
        };
        let trace = Rc::clone(&top.trace);
        if top.is_empty() {
            ctx.frames.pop();
        }

        match slot {
            Slot::Field(name, value) => {
                ctx.write_interned(&name)?;
                ctx.with_trace(PropertyTrace::child(&trace, Segment::Field(name)), |ctx| {
                    ctx.write(&value)
                })?;
            }
            Slot::Element(index, value) => {
                ctx.with_trace(PropertyTrace::element(&trace, index), |ctx| ctx.write(&value))?;
            }
            Slot::Entry(index, key, value) => {
                let label = key_label(&key, index);
                ctx.with_trace(PropertyTrace::child(&trace, Segment::MapKey(index)), |ctx| {
                    ctx.write(&key)
                })?;
                ctx.with_trace(PropertyTrace::child(&trace, Segment::MapValue(label)), |ctx| {
                    ctx.write(&value)
                })?;
            }
        }
    }
    Ok(())
}

fn drain_decode(ctx: &mut ReadContext<'_>) -> Result<()> {
    while let Some(top) = ctx.frames.last_mut() {
        if top.is_empty() {
            ctx.frames.pop();
            continue;
        }
        let index = top.next;
        top.next += 1;
        let target = top.target.clone();
        let shape = top.shape;
        let trace = Rc::clone(&top.trace);
        if top.is_empty() {
            ctx.frames.pop();
        }

        match shape {
            Shape::Fields => {
                let name = ctx.read_interned()?;
                let value = ctx.with_trace(PropertyTrace::field(&trace, name.as_str()), |ctx| {
                    ctx.read()
                })?;
                target.borrow_mut().set_field(name, value);
            }
            Shape::Map => {
                let key = ctx.with_trace(
                    PropertyTrace::child(&trace, Segment::MapKey(index)),
                    |ctx| ctx.read(),
                )?;
                let label = key_label(&key, index);
                let value = ctx.with_trace(
                    PropertyTrace::child(&trace, Segment::MapValue(label)),
                    |ctx| ctx.read(),
                )?;
                target.borrow_mut().insert(key, value);
            }
            Shape::List | Shape::Set | Shape::Array => {
                let value = ctx.with_trace(PropertyTrace::element(&trace, index), |ctx| ctx.read())?;
                target.borrow_mut().push(value);
            }
        }
    }
    Ok(())
}

fn key_label(key: &Value, index: usize) -> MapKeyLabel {
    match key {
        Value::String(s) => MapKeyLabel::Named(s.clone()),
        _ => MapKeyLabel::Index(index),
    }
}
