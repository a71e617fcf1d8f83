// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Snapshot files: framing, cache-miss semantics, corruption detection.

mod common;

use common::{encode, node, registry, registry_with};
use snapgraph::model::{ObjectRef, Value};
use snapgraph::stream::{StreamHeader, FORMAT_VERSION};
use snapgraph::{
    load, read_snapshot, save, verify, CodecConfig, ErrorKind, ManagedFactoryRegistry, NoServices,
};

fn partial_of(path: &std::path::Path) -> std::path::PathBuf {
    let mut name = path.file_name().expect("file name").to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

fn sample() -> Value {
    let root = node("root");
    root.set_field(
        "children",
        Value::Object(ObjectRef::array_list(vec![
            Value::Object(node("a")),
            Value::Object(node("b")),
        ])),
    );
    root.set_field("self", Value::Object(root.clone()));
    Value::Object(root)
}

#[test]
fn test_save_and_load_file() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.snap");

    let value = sample();
    let stats = save(&registry, &path, std::slice::from_ref(&value)).expect("save");
    assert_eq!(stats.objects, 4);
    assert!(!partial_of(&path).exists());

    let roots = load(&registry, &path, &NoServices)
        .expect("load")
        .expect("cache hit");
    assert_eq!(roots, vec![value]);
}

#[test]
fn test_save_leaves_files_sharing_a_stem_alone() {
    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let snap = dir.path().join("graph.snap");
    let bin = dir.path().join("graph.bin");
    let unrelated = dir.path().join("graph.partial");
    std::fs::write(&unrelated, b"keep me").expect("seed file");

    save(&registry, &snap, &[Value::from("snap")]).expect("save snap");
    save(&registry, &bin, &[Value::from("bin")]).expect("save bin");

    assert_eq!(std::fs::read(&unrelated).expect("read"), b"keep me");
    let snap_roots = load(&registry, &snap, &NoServices).expect("load").expect("hit");
    let bin_roots = load(&registry, &bin, &NoServices).expect("load").expect("hit");
    assert_eq!(snap_roots, vec![Value::from("snap")]);
    assert_eq!(bin_roots, vec![Value::from("bin")]);
}

#[test]
fn test_missing_file_is_cache_miss() {
    let dir = tempfile::tempdir().expect("tempdir");
    let loaded = load(&registry(), dir.path().join("absent.snap"), &NoServices).expect("load");
    assert!(loaded.is_none());
}

#[test]
fn test_failed_save_leaves_no_file() {
    use snapgraph::model::{Handle, TypeDescriptor};

    let registry = registry();
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("graph.snap");
    let thread = Value::Handle(Handle::new(TypeDescriptor::builder("Thread").build(), ()));

    let err = save(&registry, &path, &[thread]).expect_err("unsupported");
    assert_eq!(err.kind(), ErrorKind::UnsupportedType);
    assert!(!path.exists());
    assert!(!partial_of(&path).exists());
}

#[test]
fn test_different_binding_table_is_cache_miss() {
    let writer = registry();
    let bytes = encode(&writer, &[sample()]);

    let config = CodecConfig::builder().add_owner_service("CacheService").build();
    let reader = registry_with(&config, ManagedFactoryRegistry::new());
    assert_ne!(writer.signature(), reader.signature());

    let mut source = bytes.as_slice();
    assert!(read_snapshot(&reader, &mut source, &NoServices).expect("read").is_none());
}

#[test]
fn test_other_format_version_is_cache_miss() {
    let registry = registry();
    let mut bytes = encode(&registry, &[Value::Int(1)]);
    bytes[8..12].copy_from_slice(&(FORMAT_VERSION + 1).to_le_bytes());

    let mut source = bytes.as_slice();
    assert!(read_snapshot(&registry, &mut source, &NoServices).expect("read").is_none());
}

#[test]
fn test_bad_magic_is_corrupt() {
    let registry = registry();
    let mut bytes = encode(&registry, &[Value::Int(1)]);
    bytes[0] = b'X';

    let mut source = bytes.as_slice();
    let err = read_snapshot(&registry, &mut source, &NoServices).expect_err("bad magic");
    assert_eq!(err.kind(), ErrorKind::CorruptStream);
}

#[test]
fn test_any_body_bit_flip_is_detected() {
    let registry = registry();
    let clean = encode(&registry, &[sample()]);
    let mut rng = fastrand::Rng::with_seed(7);

    for _ in 0..64 {
        let mut bytes = clean.clone();
        let index = rng.usize(StreamHeader::SIZE..bytes.len());
        bytes[index] ^= 1 << rng.u8(0..8);

        let mut source = bytes.as_slice();
        let err = read_snapshot(&registry, &mut source, &NoServices).expect_err("flipped bit");
        assert_eq!(err.kind(), ErrorKind::CorruptStream, "flip at byte {index}");
    }
}

#[test]
fn test_truncated_stream_is_corrupt() {
    let registry = registry();
    let bytes = encode(&registry, &[sample()]);

    for len in [0, 10, StreamHeader::SIZE, StreamHeader::SIZE + 2, bytes.len() - 1] {
        let mut source = &bytes[..len];
        let err = read_snapshot(&registry, &mut source, &NoServices).expect_err("truncated");
        assert_eq!(err.kind(), ErrorKind::CorruptStream, "length {len}");
    }
}

#[test]
fn test_verify_reports_summary() {
    let registry = registry();
    let bytes = encode(&registry, &[sample(), Value::Null]);

    let summary = verify(&mut bytes.as_slice()).expect("verify");
    assert_eq!(summary.header.version, FORMAT_VERSION);
    assert_eq!(summary.header.signature, registry.signature());
    assert_eq!(summary.roots, 2);
    assert_eq!(summary.body_len as usize, bytes.len() - StreamHeader::SIZE - 4);
}
