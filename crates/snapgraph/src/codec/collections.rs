// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs for well-known concrete collection types.
//!
//! ```text
//! identity | count:varint | elements or key/value pairs
//! ```
//!
//! The type and shape are implied by the binding, so unlike the bean codec
//! neither is written. Collections carry identity: a list referenced twice
//! decodes to one instance.

use super::reentrant::{DecodeFrame, EncodeFrame, Opened, Structural};
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::{builtins, ObjectData, ObjectRef, Shape, TypeRef, Value};

/// Collection codec for one concrete type with a fixed shape.
#[derive(Debug, Clone)]
pub struct CollectionCodec {
    ty: TypeRef,
    shape: Shape,
}

impl CollectionCodec {
    pub fn new(ty: TypeRef, shape: Shape) -> Self {
        Self { ty, shape }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Codecs for the built-in list, set and map types.
    pub fn standard() -> Vec<CollectionCodec> {
        let lists = [&builtins::ARRAY_LIST, &builtins::LINKED_LIST, &builtins::IMMUTABLE_LIST];
        let sets = [
            &builtins::LINKED_HASH_SET,
            &builtins::HASH_SET,
            &builtins::TREE_SET,
            &builtins::IMMUTABLE_SET,
        ];
        let maps = [
            &builtins::LINKED_HASH_MAP,
            &builtins::HASH_MAP,
            &builtins::TREE_MAP,
            &builtins::CONCURRENT_HASH_MAP,
            &builtins::IMMUTABLE_MAP,
        ];

        let mut codecs = Vec::new();
        codecs.extend(lists.iter().map(|ty| Self::new(TypeRef::clone(ty), Shape::List)));
        codecs.extend(sets.iter().map(|ty| Self::new(TypeRef::clone(ty), Shape::Set)));
        codecs.extend(maps.iter().map(|ty| Self::new(TypeRef::clone(ty), Shape::Map)));
        codecs
    }
}

impl Structural for CollectionCodec {
    fn describe(&self) -> String {
        format!("collection {}", self.ty)
    }

    fn open_encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<Option<EncodeFrame>> {
        let Some(obj) = value.as_object() else {
            return Err(ctx.failure(format!(
                "{} codec cannot encode value of type '{}'",
                self.ty,
                value.runtime_type()
            )));
        };
        let shape = obj.borrow().data().shape();
        if shape != self.shape {
            return Err(ctx.failure(format!(
                "object of type '{}' has shape {shape:?}, expected {:?}",
                self.ty, self.shape
            )));
        }
        if ctx.write_identity(obj)? {
            return Ok(None);
        }

        let object = obj.borrow();
        ctx.write_varint(object.data().len() as u64)?;
        Ok(Some(EncodeFrame::new(ctx.trace().clone(), object.data())))
    }

    fn open_decode(&self, ctx: &mut ReadContext<'_>) -> Result<Opened> {
        if let Some(existing) = ctx.read_identity()? {
            return Ok(Opened::Existing(existing));
        }
        let len = ctx.read_count()?;
        let obj = ObjectRef::with_data(self.ty.clone(), ObjectData::empty(self.shape));
        ctx.register(obj.clone());
        let frame = DecodeFrame::new(obj.clone(), self.shape, len, ctx.trace().clone());
        Ok(Opened::New(obj, frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{reentrant, BeanCodec, Primitive, PrimitiveCodec};
    use crate::model::names;
    use crate::registry::CodecRegistry;
    use crate::services::NoServices;

    fn registry() -> CodecRegistry {
        let mut builder = CodecRegistry::builder()
            .bind_exact(names::STRING, PrimitiveCodec(Primitive::String))
            .bind_exact(names::INT, PrimitiveCodec(Primitive::Int));
        for codec in CollectionCodec::standard() {
            let name = codec.type_ref().name().to_string();
            builder = builder.bind_exact(name, reentrant(codec));
        }
        builder.fallback(reentrant(BeanCodec)).build().expect("registry")
    }

    fn roundtrip(registry: &CodecRegistry, value: &Value) -> Value {
        let mut buf = Vec::new();
        {
            let mut ctx = WriteContext::new(registry, &mut buf);
            ctx.write(value).expect("encode");
        }
        let mut source = buf.as_slice();
        let mut ctx = ReadContext::new(registry, &mut source, &NoServices);
        ctx.read().expect("decode")
    }

    #[test]
    fn test_shared_list_in_map_keeps_identity() {
        let registry = registry();
        let list = ObjectRef::array_list(vec![Value::Int(1), Value::Int(2)]);
        let map = ObjectRef::linked_hash_map(vec![
            (Value::from("a"), Value::Object(list.clone())),
            (Value::from("b"), Value::Object(list)),
        ]);

        let decoded = roundtrip(&registry, &Value::Object(map));
        let decoded = decoded.as_object().expect("map");
        let object = decoded.borrow();
        let ObjectData::Map(entries) = object.data() else {
            panic!("expected map payload");
        };
        assert_eq!(entries.len(), 2);
        let a = entries[0].1.as_object().expect("list a");
        let b = entries[1].1.as_object().expect("list b");
        assert!(a.ptr_eq(b));
        assert_eq!(a.borrow().data().len(), 2);
    }

    #[test]
    fn test_nested_lists_do_not_recurse() {
        let registry = registry();
        let mut value = Value::Int(0);
        for _ in 0..50_000 {
            value = Value::Object(ObjectRef::array_list(vec![value]));
        }
        let decoded = roundtrip(&registry, &value);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let registry = registry();
        let bogus = ObjectRef::bean(builtins::ARRAY_LIST.clone());
        let mut buf = Vec::new();
        let mut ctx = WriteContext::new(&registry, &mut buf);
        let err = ctx.write(&Value::Object(bogus)).expect_err("shape");
        assert_eq!(err.kind(), crate::error::ErrorKind::Serialization);
    }
}
