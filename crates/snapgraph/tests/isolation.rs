// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Isolated snapshots through the full stream.

mod common;

use common::{registry_with, roundtrip};
use snapgraph::codec::base::enum_constant;
use snapgraph::model::{Handle, ObjectRef, TypeDescriptor, TypeRef, Value};
use snapgraph::{
    isolate, CodecConfig, ErrorKind, FieldsFactory, Isolated, ManagedFactoryRegistry, NoServices,
    ReadContext, WriteContext,
};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;

fn options_type() -> TypeRef {
    TypeDescriptor::builder("CompileOptions").build()
}

fn factories() -> ManagedFactoryRegistry {
    ManagedFactoryRegistry::new().with(FieldsFactory::new(7, options_type()))
}

fn hash_of(iso: &Isolated) -> u64 {
    let mut hasher = DefaultHasher::new();
    iso.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn test_snapshot_unaffected_by_later_mutation() {
    let factories = factories();
    let registry = registry_with(&CodecConfig::default(), factories.clone());

    let list = ObjectRef::array_list(vec![Value::from("a")]);
    let snapshot = isolate(&Value::Object(list.clone()), &factories).expect("isolate");
    list.borrow_mut().push(Value::from("b"));

    let decoded = roundtrip(&registry, &Value::from(snapshot.clone()));
    let Value::Isolated(decoded) = decoded else {
        panic!("expected isolated value");
    };
    assert_eq!(*decoded, snapshot);

    let live = decoded.instantiate(&factories).expect("instantiate");
    let live = live.as_object().expect("list");
    assert_eq!(live.borrow().data().children(), vec![Value::from("a")]);
    assert!(!live.ptr_eq(&list));
}

#[test]
fn test_snapshot_hash_is_stable_across_mutation() {
    let factories = factories();
    let options = ObjectRef::bean(options_type());
    options.set_field("args", Value::Object(ObjectRef::array_list(vec![Value::from("-g")])));

    let snapshot = isolate(&Value::Object(options.clone()), &factories).expect("isolate");
    let before = hash_of(&snapshot);
    options.set_field("args", Value::Object(ObjectRef::array_list(vec![Value::from("-O")])));
    options.set_field("debug", Value::Bool(true));
    assert_eq!(hash_of(&snapshot), before);

    let retaken = isolate(&Value::Object(options), &factories).expect("isolate again");
    assert_ne!(retaken, snapshot);
}

#[test]
fn test_set_snapshot_is_order_independent() {
    let registry = registry_with(&CodecConfig::default(), factories());
    let forward = ObjectRef::linked_hash_set(vec![Value::from("a"), Value::from("b")]);
    let backward = ObjectRef::linked_hash_set(vec![Value::from("b"), Value::from("a")]);

    let forward = isolate(&Value::Object(forward), &factories()).expect("forward");
    let backward = isolate(&Value::Object(backward), &factories()).expect("backward");
    assert_eq!(forward, backward);
    assert_eq!(hash_of(&forward), hash_of(&backward));

    let decoded = roundtrip(&registry, &Value::from(backward));
    assert_eq!(decoded, Value::from(forward));
}

#[test]
fn test_overly_nested_isolated_stream_is_corrupt() {
    let registry = registry_with(&CodecConfig::default(), factories());
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
    let err = ctx.read().expect_err("nesting limit");
    assert_eq!(err.kind(), ErrorKind::CorruptStream);
}

#[test]
fn test_overly_nested_isolated_value_fails_to_encode() {
    let registry = registry_with(&CodecConfig::default(), factories());
    let mut iso = Isolated::Null;
    for _ in 0..(snapgraph::isolation::MAX_ISOLATION_DEPTH + 10) {
        iso = Isolated::List(vec![Arc::new(iso)]);
    }

    let mut buf = Vec::new();
    let err = snapgraph::write_snapshot(&registry, &mut buf, &[Value::from(iso)]).expect_err("nesting limit");
    assert_eq!(err.kind(), ErrorKind::Serialization);
}

#[test]
fn test_every_isolated_kind_roundtrips() {
    let factories = factories();
    let registry = registry_with(&CodecConfig::default(), factories.clone());

    let options = ObjectRef::bean(options_type());
    options.set_field("debug", Value::Bool(true));
    let entry = ObjectRef::bean(snapgraph::model::builtins::MAP_ENTRY.clone());
    entry.set_field("key", Value::from("k"));
    entry.set_field("value", Value::Long(9));

    let source = ObjectRef::linked_hash_map(vec![
        (Value::from("options"), Value::Object(options)),
        (Value::from("entry"), Value::Object(entry)),
        (Value::from("set"), Value::Object(ObjectRef::linked_hash_set(vec![Value::Int(1)]))),
        (Value::from("array"), Value::Object(ObjectRef::array("String", vec![Value::from("x")]))),
        (Value::from("level"), enum_constant("LogLevel", "DEBUG")),
        (Value::from("file"), Value::File(PathBuf::from("build/libs"))),
        (Value::from("none"), Value::Null),
    ]);
    let snapshot = isolate(&Value::Object(source), &factories).expect("isolate");
    let Isolated::Map(entries) = &snapshot else {
        panic!("expected isolated map");
    };
    assert!(entries[0].1.is_managed());

    let value = Value::Isolated(Arc::new(snapshot));
    assert_eq!(roundtrip(&registry, &value), value);
}

#[test]
fn test_isolating_live_handle_fails_with_path() {
    let map = ObjectRef::linked_hash_map(vec![(
        Value::from("worker"),
        Value::Handle(Handle::new(TypeDescriptor::builder("Thread").build(), ())),
    )]);
    let err = isolate(&Value::Object(map), &factories()).expect_err("live handle");
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert_eq!(err.trace(), Some("${worker}"));
}

#[test]
fn test_missing_factory_on_target_is_rehydration() {
    let writer_factories = factories();
    let writer = registry_with(&CodecConfig::default(), writer_factories.clone());
    let reader = registry_with(&CodecConfig::default(), ManagedFactoryRegistry::new());

    let snapshot = isolate(&Value::Object(ObjectRef::bean(options_type())), &writer_factories)
        .expect("isolate");
    let bytes = common::encode(&writer, &[Value::from(snapshot)]);

    // Same binding table, so the stream is accepted; the factory is not.
    assert_eq!(writer.signature(), reader.signature());
    let err = common::decode_with(&reader, &bytes, &NoServices).expect_err("no factory");
    assert_eq!(err.kind(), ErrorKind::Rehydration);
}
