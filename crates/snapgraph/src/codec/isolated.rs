// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs for isolated snapshot values, one per [`Isolated`] variant.
//!
//! ```text
//! Managed / ImmutableManaged  interned type | factory id:varint | state
//! Array                       interned component | count | elements
//! Set / List                  count | elements
//! Map                         count | (key, value)*
//! MapEntry                    key | value
//! Enum                        interned type | interned constant
//! String / File               varint len | UTF-8
//! Integer / Long              zigzag varint
//! Boolean                     u8
//! Null                        (empty)
//! ```
//!
//! Nested snapshots go back through the registry, so each child is tagged
//! with its own variant's binding. Nesting is capped at
//! [`MAX_ISOLATION_DEPTH`] in both directions: deeper values fail to encode
//! with `Serialization` and deeper streams are `CorruptStream`.

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::isolation::{Isolated, ManagedFactoryRegistry, MAX_ISOLATION_DEPTH};
use crate::model::{names, Value};
use crate::trace::{MapKeyLabel, Segment};
use std::path::PathBuf;
use std::sync::Arc;

/// Discriminant of an [`Isolated`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolatedKind {
    Managed,
    ImmutableManaged,
    Array,
    Set,
    List,
    Map,
    MapEntry,
    Enum,
    String,
    Integer,
    Long,
    File,
    Boolean,
    Null,
}

impl IsolatedKind {
    pub const ALL: [IsolatedKind; 14] = [
        Self::Managed,
        Self::ImmutableManaged,
        Self::Array,
        Self::Set,
        Self::List,
        Self::Map,
        Self::MapEntry,
        Self::Enum,
        Self::String,
        Self::Integer,
        Self::Long,
        Self::File,
        Self::Boolean,
        Self::Null,
    ];

    pub fn of(value: &Isolated) -> Self {
        match value {
            Isolated::Managed { .. } => Self::Managed,
            Isolated::ImmutableManaged { .. } => Self::ImmutableManaged,
            Isolated::Array { .. } => Self::Array,
            Isolated::Set(_) => Self::Set,
            Isolated::List(_) => Self::List,
            Isolated::Map(_) => Self::Map,
            Isolated::MapEntry { .. } => Self::MapEntry,
            Isolated::Enum { .. } => Self::Enum,
            Isolated::String(_) => Self::String,
            Isolated::Integer(_) => Self::Integer,
            Isolated::Long(_) => Self::Long,
            Isolated::File(_) => Self::File,
            Isolated::Boolean(_) => Self::Boolean,
            Isolated::Null => Self::Null,
        }
    }

    /// Runtime type name values of this kind report.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Managed => names::ISOLATED_MANAGED,
            Self::ImmutableManaged => names::ISOLATED_IMMUTABLE_MANAGED,
            Self::Array => names::ISOLATED_ARRAY,
            Self::Set => names::ISOLATED_SET,
            Self::List => names::ISOLATED_LIST,
            Self::Map => names::ISOLATED_MAP,
            Self::MapEntry => names::ISOLATED_MAP_ENTRY,
            Self::Enum => names::ISOLATED_ENUM,
            Self::String => names::ISOLATED_STRING,
            Self::Integer => names::ISOLATED_INTEGER,
            Self::Long => names::ISOLATED_LONG,
            Self::File => names::ISOLATED_FILE,
            Self::Boolean => names::ISOLATED_BOOLEAN,
            Self::Null => names::ISOLATED_NULL,
        }
    }
}

/// Codec for one isolated variant.
#[derive(Debug, Clone)]
pub struct IsolatedCodec {
    kind: IsolatedKind,
    factories: Arc<ManagedFactoryRegistry>,
}

impl IsolatedCodec {
    pub fn new(kind: IsolatedKind, factories: Arc<ManagedFactoryRegistry>) -> Self {
        Self { kind, factories }
    }

    pub fn kind(&self) -> IsolatedKind {
        self.kind
    }

    /// One codec per variant, all sharing `factories`.
    pub fn family(factories: &Arc<ManagedFactoryRegistry>) -> Vec<IsolatedCodec> {
        IsolatedKind::ALL
            .iter()
            .map(|kind| Self::new(*kind, Arc::clone(factories)))
            .collect()
    }
}

fn write_child(ctx: &mut WriteContext<'_>, segment: Segment, child: &Arc<Isolated>) -> Result<()> {
    ctx.write_at(segment, &Value::Isolated(Arc::clone(child)))
}

fn write_children(ctx: &mut WriteContext<'_>, children: &[Arc<Isolated>]) -> Result<()> {
    ctx.write_varint(children.len() as u64)?;
    children
        .iter()
        .enumerate()
        .try_for_each(|(i, child)| write_child(ctx, Segment::Element(i), child))
}

fn read_child(ctx: &mut ReadContext<'_>, segment: Segment) -> Result<Arc<Isolated>> {
    match ctx.read_at(segment)? {
        Value::Isolated(iso) => Ok(iso),
        other => Err(ctx.corrupt(format!(
            "expected isolated value, found '{}'",
            other.runtime_type()
        ))),
    }
}

fn read_children(ctx: &mut ReadContext<'_>) -> Result<Vec<Arc<Isolated>>> {
    let count = ctx.read_count()?;
    let mut children = Vec::with_capacity(count.min(1024));
    for i in 0..count {
        children.push(read_child(ctx, Segment::Element(i))?);
    }
    Ok(children)
}

fn field(name: &str) -> Segment {
    Segment::Field(name.to_string())
}

impl Codec for IsolatedCodec {
    fn describe(&self) -> String {
        format!("isolated {}", self.kind.type_name())
    }

    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        let iso = match value {
            Value::Isolated(iso) if IsolatedKind::of(iso) == self.kind => iso,
            other => {
                return Err(ctx.failure(format!(
                    "{} codec cannot encode value of type '{}'",
                    self.kind.type_name(),
                    other.runtime_type()
                )))
            }
        };

        if ctx.isolated_depth > MAX_ISOLATION_DEPTH {
            return Err(ctx.failure(format!(
                "isolated value nesting exceeds {MAX_ISOLATION_DEPTH} levels"
            )));
        }
        ctx.isolated_depth += 1;
        let result = self.encode_payload(ctx, iso);
        ctx.isolated_depth -= 1;
        result
    }

    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value> {
        if ctx.isolated_depth > MAX_ISOLATION_DEPTH {
            return Err(ctx.corrupt(format!(
                "isolated value nesting exceeds {MAX_ISOLATION_DEPTH} levels"
            )));
        }
        ctx.isolated_depth += 1;
        let result = self.decode_payload(ctx);
        ctx.isolated_depth -= 1;
        result.map(|iso| Value::Isolated(Arc::new(iso)))
    }
}

impl IsolatedCodec {
    fn encode_payload(&self, ctx: &mut WriteContext<'_>, iso: &Isolated) -> Result<()> {
        match iso {
            Isolated::Managed {
                type_name,
                factory_id,
                state,
            }
            | Isolated::ImmutableManaged {
                type_name,
                factory_id,
                state,
            } => {
                ctx.write_interned(type_name)?;
                ctx.write_varint(u64::from(*factory_id))?;
                write_child(ctx, field("state"), state)
            }
            Isolated::Array {
                component,
                elements,
            } => {
                ctx.write_interned(component)?;
                write_children(ctx, elements)
            }
            Isolated::Set(elements) | Isolated::List(elements) => write_children(ctx, elements),
            Isolated::Map(entries) => {
                ctx.write_varint(entries.len() as u64)?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    write_child(ctx, Segment::MapKey(i), key)?;
                    write_child(ctx, Segment::MapValue(MapKeyLabel::Index(i)), value)?;
                }
                Ok(())
            }
            Isolated::MapEntry { key, value } => {
                write_child(ctx, field("key"), key)?;
                write_child(ctx, field("value"), value)
            }
            Isolated::Enum {
                type_name,
                constant,
            } => {
                ctx.write_interned(type_name)?;
                ctx.write_interned(constant)
            }
            Isolated::String(s) => ctx.write_str(s),
            Isolated::Integer(v) => ctx.write_svarint(i64::from(*v)),
            Isolated::Long(v) => ctx.write_svarint(*v),
            Isolated::File(path) => match path.to_str() {
                Some(s) => ctx.write_str(s),
                None => Err(ctx.failure(format!("file path {} is not valid UTF-8", path.display()))),
            },
            Isolated::Boolean(v) => ctx.write_bool(*v),
            Isolated::Null => Ok(()),
        }
    }

    fn decode_payload(&self, ctx: &mut ReadContext<'_>) -> Result<Isolated> {
        Ok(match self.kind {
            IsolatedKind::Managed | IsolatedKind::ImmutableManaged => {
                let type_name = ctx.read_interned()?;
                let factory_id = ctx.decoder().read_varint_u32()?;
                if self.factories.lookup(factory_id).is_none() {
                    return Err(ctx.rehydration(&format!("managed factory #{factory_id} ({type_name})")));
                }
                let state = read_child(ctx, field("state"))?;
                if self.kind == IsolatedKind::Managed {
                    Isolated::Managed {
                        type_name,
                        factory_id,
                        state,
                    }
                } else {
                    Isolated::ImmutableManaged {
                        type_name,
                        factory_id,
                        state,
                    }
                }
            }
            IsolatedKind::Array => {
                let component = ctx.read_interned()?;
                Isolated::Array {
                    component,
                    elements: read_children(ctx)?,
                }
            }
            IsolatedKind::Set => Isolated::set(read_children(ctx)?),
            IsolatedKind::List => Isolated::List(read_children(ctx)?),
            IsolatedKind::Map => {
                let count = ctx.read_count()?;
                let mut entries = Vec::with_capacity(count.min(1024));
                for i in 0..count {
                    let key = read_child(ctx, Segment::MapKey(i))?;
                    let value = read_child(ctx, Segment::MapValue(MapKeyLabel::Index(i)))?;
                    entries.push((key, value));
                }
                Isolated::Map(entries)
            }
            IsolatedKind::MapEntry => {
                let key = read_child(ctx, field("key"))?;
                let value = read_child(ctx, field("value"))?;
                Isolated::MapEntry { key, value }
            }
            IsolatedKind::Enum => {
                let type_name = ctx.read_interned()?;
                let constant = ctx.read_interned()?;
                Isolated::Enum {
                    type_name,
                    constant,
                }
            }
            IsolatedKind::String => Isolated::String(ctx.read_string()?),
            IsolatedKind::Integer => {
                let raw = ctx.read_svarint()?;
                let v = i32::try_from(raw).map_err(|_| ctx.corrupt(format!("{raw} out of range for i32")))?;
                Isolated::Integer(v)
            }
            IsolatedKind::Long => Isolated::Long(ctx.read_svarint()?),
            IsolatedKind::File => Isolated::File(PathBuf::from(ctx.read_string()?)),
            IsolatedKind::Boolean => Isolated::Boolean(ctx.read_bool()?),
            IsolatedKind::Null => Isolated::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{reentrant, BeanCodec};
    use crate::error::ErrorKind;
    use crate::isolation::{isolate, FieldsFactory};
    use crate::model::{ObjectRef, TypeDescriptor};
    use crate::registry::CodecRegistry;
    use crate::services::NoServices;

    fn registry(factories: Arc<ManagedFactoryRegistry>) -> CodecRegistry {
        let mut builder = CodecRegistry::builder();
        for codec in IsolatedCodec::family(&factories) {
            builder = builder.bind_exact(codec.kind().type_name(), codec);
        }
        builder.fallback(reentrant(BeanCodec)).build().expect("registry")
    }

    fn encode(registry: &CodecRegistry, value: &Value) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut ctx = WriteContext::new(registry, &mut buf);
            ctx.write(value).expect("encode");
        }
        buf
    }

    fn nested_lists(levels: usize) -> Isolated {
        let mut iso = Isolated::Null;
        for _ in 0..levels {
            iso = Isolated::List(vec![Arc::new(iso)]);
        }
        iso
    }

    fn options_type() -> crate::model::TypeRef {
        TypeDescriptor::builder("CompileOptions").build()
    }

    #[test]
    fn test_managed_snapshot_roundtrip() {
        let factories = Arc::new(ManagedFactoryRegistry::new().with(FieldsFactory::new(2, options_type())));
        let registry = registry(Arc::clone(&factories));

        let obj = ObjectRef::bean(options_type());
        obj.set_field("args", Value::Object(ObjectRef::array_list(vec![Value::from("-g")])));
        obj.set_field("level", Value::Long(3));
        let snapshot = Value::from(isolate(&Value::Object(obj.clone()), &factories).expect("isolate"));

        obj.set_field("level", Value::Long(4));
        let bytes = encode(&registry, &snapshot);
        let mut source = bytes.as_slice();
        let mut ctx = ReadContext::new(&registry, &mut source, &NoServices);
        let decoded = ctx.read().expect("decode");
        assert_eq!(decoded, snapshot);

        let Value::Isolated(iso) = decoded else {
            panic!("expected isolated value");
        };
        let live = iso.instantiate(&factories).expect("instantiate");
        let live = live.as_object().expect("object");
        assert_eq!(live.field("level"), Some(Value::Long(3)));
    }

    #[test]
    fn test_unknown_factory_on_decode_is_rehydration() {
        let writer = Arc::new(ManagedFactoryRegistry::new().with(FieldsFactory::new(2, options_type())));
        let snapshot = Value::from(
            isolate(&Value::Object(ObjectRef::bean(options_type())), &writer).expect("isolate"),
        );
        let bytes = encode(&registry(writer), &snapshot);

        let reader = registry(Arc::new(ManagedFactoryRegistry::new()));
        let mut source = bytes.as_slice();
        let mut ctx = ReadContext::new(&reader, &mut source, &NoServices);
        let err = ctx.read().expect_err("unknown factory");
        assert_eq!(err.kind(), ErrorKind::Rehydration);
    }

    #[test]
    fn test_kind_mismatch_is_serialization_failure() {
        let factories = Arc::new(ManagedFactoryRegistry::new());
        let registry = registry(Arc::clone(&factories));
        let codec = IsolatedCodec::new(IsolatedKind::List, factories);
        let mut buf = Vec::new();
        let mut ctx = WriteContext::new(&registry, &mut buf);
        let err = codec
            .encode(&mut ctx, &Value::from(Isolated::Null))
            .expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_encode_nesting_limit() {
        let registry = registry(Arc::new(ManagedFactoryRegistry::new()));

        let deepest = Value::from(nested_lists(MAX_ISOLATION_DEPTH));
        let bytes = encode(&registry, &deepest);
        let mut source = bytes.as_slice();
        let mut ctx = ReadContext::new(&registry, &mut source, &NoServices);
        assert_eq!(ctx.read().expect("decode"), deepest);

        let mut buf = Vec::new();
        let mut ctx = WriteContext::new(&registry, &mut buf);
        let err = ctx
            .write(&Value::from(nested_lists(MAX_ISOLATION_DEPTH + 1)))
            .expect_err("too deep");
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert!(err.trace().is_some_and(|trace| trace.starts_with("$[0][0]")));
        assert_eq!(ctx.isolated_depth, 0);
    }

    #[test]
    fn test_deeply_nested_stream_is_corrupt() {
        let registry = registry(Arc::new(ManagedFactoryRegistry::new()));
        let (list_tag, _) = registry.resolve(&Value::from(Isolated::List(Vec::new())));
        let (null_tag, _) = registry.resolve(&Value::from(Isolated::Null));

        let mut bytes = Vec::new();
        {
            let mut ctx = WriteContext::new(&registry, &mut bytes);
            for _ in 0..1_000_000 {
                ctx.write_varint(u64::from(list_tag)).expect("list tag");
                ctx.write_varint(1).expect("count");
            }
            ctx.write_varint(u64::from(null_tag)).expect("null tag");
        }

        let mut source = bytes.as_slice();
        let mut ctx = ReadContext::new(&registry, &mut source, &NoServices);
        let err = ctx.read().expect_err("too deep");
        assert_eq!(err.kind(), ErrorKind::CorruptStream);
        assert_eq!(ctx.isolated_depth, 0);
    }

    #[test]
    fn test_decoded_set_is_canonical() {
        let registry = registry(Arc::new(ManagedFactoryRegistry::new()));
        let unordered = Value::from(Isolated::Set(vec![
            Arc::new(Isolated::Integer(2)),
            Arc::new(Isolated::Integer(1)),
            Arc::new(Isolated::Integer(2)),
        ]));
        let bytes = encode(&registry, &unordered);
        let mut source = bytes.as_slice();
        let mut ctx = ReadContext::new(&registry, &mut source, &NoServices);
        let decoded = ctx.read().expect("decode");
        assert_eq!(
            decoded,
            Value::from(Isolated::set(vec![
                Arc::new(Isolated::Integer(1)),
                Arc::new(Isolated::Integer(2)),
            ]))
        );
    }
}
