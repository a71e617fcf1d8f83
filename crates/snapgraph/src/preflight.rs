// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pre-flight scan for values that would make a snapshot fail.
//!
//! Encoding stops at the first refused value. A scan walks the whole graph
//! instead and reports every one of them with its property path, so a user
//! can fix them all at once.

use crate::model::{ObjectData, Value};
use crate::registry::CodecRegistry;
use crate::trace::{MapKeyLabel, PropertyTrace, Segment};
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;

/// Category reported for live handles that resolve to the structural fallback.
pub const UNBOUND_HANDLE: &str = "live object without owner-service binding";

/// A value the registry would refuse to encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Property path, e.g. `$.tasks[2].worker`.
    pub trace: String,
    pub type_name: String,
    pub category: String,
}

/// Every refused value reachable from `root`, in encounter order.
///
/// Iterative and cycle-safe; each object is visited once. The contents of
/// a refused value are not inspected.
pub fn scan(registry: &CodecRegistry, root: &Value) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut visited: HashSet<usize> = HashSet::new();
    let mut pending: Vec<(Value, Rc<PropertyTrace>)> = vec![(root.clone(), PropertyTrace::root())];

    while let Some((value, trace)) = pending.pop() {
        let ty = value.runtime_type();
        let category = match registry.rejection(&value) {
            Some(category) => Some(category.to_string()),
            None if matches!(value, Value::Handle(_))
                && registry.resolve_type(&ty) == registry.fallback_tag() =>
            {
                Some(UNBOUND_HANDLE.to_string())
            }
            None => None,
        };
        if let Some(category) = category {
            findings.push(Finding {
                trace: trace.to_string(),
                type_name: ty.name().to_string(),
                category,
            });
            continue;
        }

        let Value::Object(obj) = &value else {
            continue;
        };
        if !visited.insert(obj.identity()) {
            continue;
        }

        let object = obj.borrow();
        let mut children: Vec<(Value, Rc<PropertyTrace>)> = match object.data() {
            ObjectData::Fields(fields) => fields
                .iter()
                .map(|(name, v)| (v.clone(), PropertyTrace::field(&trace, name.as_str())))
                .collect(),
            ObjectData::Map(entries) => entries
                .iter()
                .enumerate()
                .flat_map(|(i, (k, v))| {
                    let label = match k {
                        Value::String(s) => MapKeyLabel::Named(s.clone()),
                        _ => MapKeyLabel::Index(i),
                    };
                    [
                        (k.clone(), PropertyTrace::child(&trace, Segment::MapKey(i))),
                        (v.clone(), PropertyTrace::child(&trace, Segment::MapValue(label))),
                    ]
                })
                .collect(),
            data => data
                .children()
                .into_iter()
                .enumerate()
                .map(|(i, v)| (v, PropertyTrace::element(&trace, i)))
                .collect(),
        };
        // Reverse so findings come out in payload order.
        children.reverse();
        pending.extend(children);
    }

    if !findings.is_empty() {
        tracing::debug!(findings = findings.len(), "pre-flight scan found refused values");
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecConfig;
    use crate::isolation::ManagedFactoryRegistry;
    use crate::model::{Handle, ObjectRef, TypeDescriptor};
    use std::sync::Arc;

    fn registry() -> CodecRegistry {
        CodecRegistry::standard(&CodecConfig::default(), Arc::new(ManagedFactoryRegistry::new()))
            .expect("registry")
    }

    #[test]
    fn test_reports_every_refused_value_with_path() {
        let registry = registry();
        let thread = Handle::new(TypeDescriptor::builder("Thread").build(), ());
        let project = ObjectRef::bean(TypeDescriptor::builder("DefaultProject").extends("Project").build());
        let daemon = Handle::new(TypeDescriptor::builder("Daemon").build(), ());

        let task = ObjectRef::bean(TypeDescriptor::builder("Task").build());
        task.set_field("worker", Value::Handle(thread));
        task.set_field(
            "refs",
            Value::Object(ObjectRef::array_list(vec![Value::Int(1), Value::Object(project)])),
        );
        task.set_field("daemon", Value::Handle(daemon));
        task.set_field("me", Value::Object(task.clone()));

        let findings = scan(&registry, &Value::Object(task));
        let rendered: Vec<_> = findings
            .iter()
            .map(|f| (f.trace.as_str(), f.type_name.as_str(), f.category.as_str()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("$.worker", "Thread", "live runtime state"),
                ("$.refs[1]", "DefaultProject", "build model"),
                ("$.daemon", "Daemon", UNBOUND_HANDLE),
            ]
        );
    }

    #[test]
    fn test_clean_graph_has_no_findings() {
        let registry = registry();
        let map = ObjectRef::linked_hash_map(vec![(Value::from("k"), Value::Long(1))]);
        assert!(scan(&registry, &Value::Object(map)).is_empty());
    }
}
