// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Shared fixtures for integration tests.

#![allow(dead_code)]

use snapgraph::model::{ObjectRef, TypeDescriptor, TypeRef, Value};
use snapgraph::{
    read_snapshot, write_snapshot, CodecConfig, CodecError, CodecRegistry, ManagedFactoryRegistry,
    NoServices, ServiceLocator,
};
use std::sync::Arc;

pub fn registry() -> CodecRegistry {
    registry_with(&CodecConfig::default(), ManagedFactoryRegistry::new())
}

pub fn registry_with(config: &CodecConfig, factories: ManagedFactoryRegistry) -> CodecRegistry {
    CodecRegistry::standard(config, Arc::new(factories)).expect("standard registry")
}

pub fn node_type() -> TypeRef {
    TypeDescriptor::builder("Node").extends("Named").build()
}

pub fn node(name: &str) -> ObjectRef {
    let obj = ObjectRef::bean(node_type());
    obj.set_field("name", Value::from(name));
    obj
}

pub fn encode(registry: &CodecRegistry, roots: &[Value]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_snapshot(registry, &mut buf, roots).expect("write snapshot");
    buf
}

pub fn decode_with(
    registry: &CodecRegistry,
    bytes: &[u8],
    services: &dyn ServiceLocator,
) -> Result<Vec<Value>, CodecError> {
    let mut source = bytes;
    read_snapshot(registry, &mut source, services).map(|roots| roots.expect("same registry"))
}

/// Encode and decode a single root with the same registry and no services.
pub fn roundtrip(registry: &CodecRegistry, value: &Value) -> Value {
    let bytes = encode(registry, std::slice::from_ref(value));
    let mut roots = decode_with(registry, &bytes, &NoServices).expect("read snapshot");
    assert_eq!(roots.len(), 1);
    roots.remove(0)
}
