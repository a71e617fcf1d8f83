// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Owner services are written as nothing and resolved from the decoding host.

mod common;

use common::{decode_with, encode, node, registry};
use snapgraph::model::{Handle, TypeDescriptor, Value};
use snapgraph::{ErrorKind, NoServices, ServiceRegistry};

struct ObjectFactoryImpl {
    instance: u32,
}

fn object_factory(instance: u32) -> Handle {
    let ty = TypeDescriptor::builder("DefaultObjectFactory")
        .extends("ObjectFactory")
        .build();
    Handle::new(ty, ObjectFactoryImpl { instance })
}

#[test]
fn test_service_resolved_from_target_host() {
    let registry = registry();
    let task = node("compile");
    task.set_field("objects", Value::Handle(object_factory(1)));
    let bytes = encode(&registry, &[Value::Object(task)]);

    let host = object_factory(2);
    let services = ServiceRegistry::new().with(host.clone());
    let roots = decode_with(&registry, &bytes, &services).expect("decode");

    let decoded = roots[0].as_object().expect("task");
    let resolved = decoded.field("objects").expect("objects");
    let resolved = resolved.as_handle().expect("handle");
    assert!(resolved.ptr_eq(&host));
    let inner = resolved.downcast_ref::<ObjectFactoryImpl>().expect("factory");
    assert_eq!(inner.instance, 2);
}

#[test]
fn test_service_payload_is_empty() {
    let registry = registry();
    let with_service = encode(&registry, &[Value::Handle(object_factory(1))]);
    let with_null = encode(&registry, &[Value::Null]);
    // Both are one tag and no payload; only the tag differs.
    assert_eq!(with_service.len(), with_null.len());
}

#[test]
fn test_missing_service_is_rehydration_error() {
    let registry = registry();
    let task = node("compile");
    task.set_field("objects", Value::Handle(object_factory(1)));
    let bytes = encode(&registry, &[Value::Object(task)]);

    let err = decode_with(&registry, &bytes, &NoServices).expect_err("no services");
    assert_eq!(err.kind(), ErrorKind::Rehydration);
    assert!(err.is_environment_defect());
    assert_eq!(err.trace(), Some("$.objects"));
    assert!(err.to_string().contains("ObjectFactory"));
}
