// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar codecs: primitives, strings, files and enum constants.
//!
//! ```text
//! null          (empty)
//! bool          u8 0 | 1
//! i8/i16/i32/i64 zigzag varint
//! char          varint scalar value
//! f32/f64       little-endian IEEE-754
//! String        varint len | UTF-8
//! File          varint len | UTF-8 path
//! Enum          type | interned constant name
//! ```

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::{builtins, names, EnumValue, Value};
use std::path::PathBuf;

/// Closed set of scalar kinds with a fixed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Null,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
    String,
    File,
}

impl Primitive {
    pub const ALL: [Primitive; 11] = [
        Self::Null,
        Self::Bool,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
        Self::Char,
        Self::Float,
        Self::Double,
        Self::String,
        Self::File,
    ];

    /// Runtime type name this kind is bound to.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Null => names::NULL,
            Self::Bool => names::BOOL,
            Self::Byte => names::BYTE,
            Self::Short => names::SHORT,
            Self::Int => names::INT,
            Self::Long => names::LONG,
            Self::Char => names::CHAR,
            Self::Float => names::FLOAT,
            Self::Double => names::DOUBLE,
            Self::String => names::STRING,
            Self::File => names::FILE,
        }
    }
}

/// Codec for one [`Primitive`] kind.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveCodec(pub Primitive);

impl Codec for PrimitiveCodec {
    fn describe(&self) -> String {
        format!("primitive {}", self.0.type_name())
    }

    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        match (self.0, value) {
            (Primitive::Null, Value::Null) => Ok(()),
            (Primitive::Bool, Value::Bool(v)) => ctx.write_bool(*v),
            (Primitive::Byte, Value::Byte(v)) => ctx.write_svarint(i64::from(*v)),
            (Primitive::Short, Value::Short(v)) => ctx.write_svarint(i64::from(*v)),
            (Primitive::Int, Value::Int(v)) => ctx.write_svarint(i64::from(*v)),
            (Primitive::Long, Value::Long(v)) => ctx.write_svarint(*v),
            (Primitive::Char, Value::Char(v)) => ctx.write_varint(u64::from(u32::from(*v))),
            (Primitive::Float, Value::Float(v)) => ctx.encoder().write_f32(*v),
            (Primitive::Double, Value::Double(v)) => ctx.encoder().write_f64(*v),
            (Primitive::String, Value::String(v)) => ctx.write_str(v),
            (Primitive::File, Value::File(path)) => match path.to_str() {
                Some(path) => ctx.write_str(path),
                None => Err(ctx.failure(format!(
                    "file path {} is not valid UTF-8",
                    path.display()
                ))),
            },
            (kind, other) => Err(ctx.failure(format!(
                "{} codec cannot encode value of type '{}'",
                kind.type_name(),
                other.runtime_type()
            ))),
        }
    }

    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value> {
        Ok(match self.0 {
            Primitive::Null => Value::Null,
            Primitive::Bool => Value::Bool(ctx.read_bool()?),
            Primitive::Byte => Value::Byte(narrow(ctx, names::BYTE)?),
            Primitive::Short => Value::Short(narrow(ctx, names::SHORT)?),
            Primitive::Int => Value::Int(narrow(ctx, names::INT)?),
            Primitive::Long => Value::Long(ctx.read_svarint()?),
            Primitive::Char => {
                let raw = ctx.read_varint()?;
                let c = u32::try_from(raw)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ctx.corrupt(format!("invalid char scalar {raw:#x}")))?;
                Value::Char(c)
            }
            Primitive::Float => Value::Float(ctx.decoder().read_f32()?),
            Primitive::Double => Value::Double(ctx.decoder().read_f64()?),
            Primitive::String => Value::String(ctx.read_string()?),
            Primitive::File => Value::File(PathBuf::from(ctx.read_string()?)),
        })
    }
}

fn narrow<T: TryFrom<i64>>(ctx: &mut ReadContext<'_>, type_name: &str) -> Result<T> {
    let raw = ctx.read_svarint()?;
    T::try_from(raw).map_err(|_| ctx.corrupt(format!("{raw} out of range for {type_name}")))
}

/// Enum constants, encoded by declaring type and constant name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumCodec;

impl Codec for EnumCodec {
    fn describe(&self) -> String {
        "enum constant".to_string()
    }

    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        let Value::Enum(constant) = value else {
            return Err(ctx.failure(format!(
                "enum codec cannot encode value of type '{}'",
                value.runtime_type()
            )));
        };
        ctx.write_type(constant.type_ref())?;
        ctx.write_interned(constant.constant())
    }

    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value> {
        let ty = ctx.read_type()?;
        if !ty.is_a(names::ENUM) {
            return Err(ctx.corrupt(format!("type '{ty}' is not an enum")));
        }
        let constant = ctx.read_interned()?;
        Ok(Value::Enum(EnumValue::new(ty, constant)))
    }
}

/// Convenience for building enum constants of a named enum type.
pub fn enum_constant(type_name: &str, constant: &str) -> Value {
    Value::Enum(EnumValue::new(builtins::enum_type(type_name), constant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CodecRegistry;
    use crate::services::NoServices;

    fn roundtrip(registry: &CodecRegistry, value: &Value) -> Value {
        let mut buf = Vec::new();
        {
            let mut ctx = WriteContext::new(registry, &mut buf);
            ctx.write(value).expect("encode");
            ctx.finish().expect("finish");
        }
        let mut source = buf.as_slice();
        let mut ctx = ReadContext::new(registry, &mut source, &NoServices);
        ctx.read().expect("decode")
    }

    fn registry() -> CodecRegistry {
        let mut builder = CodecRegistry::builder();
        for kind in Primitive::ALL {
            builder = builder.bind_exact(kind.type_name(), PrimitiveCodec(kind));
        }
        builder
            .bind_subtype(names::ENUM, EnumCodec)
            .fallback(crate::codec::reentrant(crate::codec::BeanCodec))
            .build()
            .expect("registry")
    }

    #[test]
    fn test_scalar_roundtrip() {
        let registry = registry();
        let values = [
            Value::Null,
            Value::Bool(true),
            Value::Byte(-7),
            Value::Short(i16::MIN),
            Value::Int(-42),
            Value::Long(i64::MAX),
            Value::Char('λ'),
            Value::Float(1.5),
            Value::Double(-0.25),
            Value::from("hello"),
            Value::File(PathBuf::from("/tmp/build/out.jar")),
            enum_constant("Color", "RED"),
        ];
        for value in &values {
            assert_eq!(&roundtrip(&registry, value), value);
        }
    }

    #[test]
    fn test_mismatched_value_is_serialization_failure() {
        let registry = registry();
        let mut buf = Vec::new();
        let mut ctx = WriteContext::new(&registry, &mut buf);
        let err = PrimitiveCodec(Primitive::Int)
            .encode(&mut ctx, &Value::Bool(true))
            .expect_err("mismatch");
        assert_eq!(err.kind(), crate::error::ErrorKind::Serialization);
    }

    #[test]
    fn test_out_of_range_byte_is_corrupt() {
        let registry = registry();
        let mut buf = Vec::new();
        {
            let mut ctx = WriteContext::new(&registry, &mut buf);
            ctx.write_svarint(1_000).expect("write");
        }
        let mut source = buf.as_slice();
        let mut ctx = ReadContext::new(&registry, &mut source, &NoServices);
        let err = PrimitiveCodec(Primitive::Byte)
            .decode(&mut ctx)
            .expect_err("range");
        assert_eq!(err.kind(), crate::error::ErrorKind::CorruptStream);
    }
}
