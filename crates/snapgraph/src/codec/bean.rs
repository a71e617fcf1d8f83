// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural fallback codec.
//!
//! ```text
//! identity | type | shape:u8 | count:varint | slots...
//! ```
//!
//! Handles any heap object regardless of type. Only meaningful behind
//! [`reentrant`](super::reentrant), which owns the slot traversal.

use super::reentrant::{DecodeFrame, EncodeFrame, Opened, Structural};
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::{ObjectData, ObjectRef, Shape, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct BeanCodec;

impl Structural for BeanCodec {
    fn describe(&self) -> String {
        "bean".to_string()
    }

    fn open_encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<Option<EncodeFrame>> {
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Handle(handle) => {
                return Err(ctx.failure(format!(
                    "live object of type '{}' has no binding; declare it unsupported or an owner service",
                    handle.type_ref()
                )))
            }
            other => {
                return Err(ctx.failure(format!(
                    "no codec is bound for value of type '{}'",
                    other.runtime_type()
                )))
            }
        };
        if ctx.write_identity(obj)? {
            return Ok(None);
        }

        let object = obj.borrow();
        let data = object.data();
        ctx.write_type(object.type_ref())?;
        ctx.write_u8(data.shape().to_byte())?;
        ctx.write_varint(data.len() as u64)?;
        Ok(Some(EncodeFrame::new(ctx.trace().clone(), data)))
    }

    fn open_decode(&self, ctx: &mut ReadContext<'_>) -> Result<Opened> {
        if let Some(existing) = ctx.read_identity()? {
            return Ok(Opened::Existing(existing));
        }
        let ty = ctx.read_type()?;
        let byte = ctx.read_u8()?;
        let shape = Shape::from_byte(byte)
            .ok_or_else(|| ctx.corrupt(format!("unknown object shape {byte}")))?;
        let len = ctx.read_count()?;

        let obj = ObjectRef::with_data(ty, ObjectData::empty(shape));
        ctx.register(obj.clone());
        let frame = DecodeFrame::new(obj.clone(), shape, len, ctx.trace().clone());
        Ok(Opened::New(obj, frame))
    }
}
