// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Taking isolated snapshots of live values.

use super::{Isolated, ManagedFactoryRegistry};
use crate::error::{CodecError, Result};
use crate::model::{names, ObjectData, ObjectRef, Value};
use crate::trace::{MapKeyLabel, PropertyTrace, Segment};
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

/// Deepest nesting accepted by [`isolate`].
pub const MAX_ISOLATION_DEPTH: usize = 128;

/// Take a deep snapshot of `value`.
///
/// Shared sub-values are copied once per occurrence; a value that contains
/// itself cannot be isolated. Objects of managed types are reduced through
/// their factory. Field-shaped objects without a factory, live handles and
/// floating-point values are rejected.
pub fn isolate(value: &Value, factories: &ManagedFactoryRegistry) -> Result<Isolated> {
    let mut isolator = Isolator {
        factories,
        ancestors: HashSet::new(),
    };
    isolator.isolate(value, &PropertyTrace::root(), 0)
}

struct Isolator<'a> {
    factories: &'a ManagedFactoryRegistry,
    ancestors: HashSet<usize>,
}

impl Isolator<'_> {
    fn isolate(&mut self, value: &Value, trace: &Rc<PropertyTrace>, depth: usize) -> Result<Isolated> {
        if depth > MAX_ISOLATION_DEPTH {
            return Err(failure(
                trace,
                format!("isolated value nesting exceeds {MAX_ISOLATION_DEPTH} levels"),
            ));
        }
        Ok(match value {
            Value::Null => Isolated::Null,
            Value::Bool(v) => Isolated::Boolean(*v),
            Value::Int(v) => Isolated::Integer(*v),
            Value::Long(v) => Isolated::Long(*v),
            Value::String(v) => Isolated::String(v.clone()),
            Value::File(path) => Isolated::File(path.clone()),
            Value::Enum(constant) => Isolated::Enum {
                type_name: constant.type_ref().name().to_string(),
                constant: constant.constant().to_string(),
            },
            Value::Isolated(iso) => Isolated::clone(iso),
            Value::Object(obj) => self.isolate_object(obj, trace, depth)?,
            Value::Handle(handle) => {
                return Err(failure(
                    trace,
                    format!("cannot isolate live object of type '{}'", handle.type_ref()),
                ))
            }
            other => {
                return Err(failure(
                    trace,
                    format!("cannot isolate value of type '{}'", other.runtime_type()),
                ))
            }
        })
    }

    fn isolate_object(&mut self, obj: &ObjectRef, trace: &Rc<PropertyTrace>, depth: usize) -> Result<Isolated> {
        let key = obj.identity();
        if !self.ancestors.insert(key) {
            return Err(failure(
                trace,
                format!("cannot isolate object of type '{}': it contains itself", obj.type_ref()),
            ));
        }
        let result = self.isolate_payload(obj, trace, depth);
        self.ancestors.remove(&key);
        result
    }

    fn isolate_payload(&mut self, obj: &ObjectRef, trace: &Rc<PropertyTrace>, depth: usize) -> Result<Isolated> {
        let ty = obj.type_ref();
        let factories = self.factories;
        if let Some(factory) = factories.for_type(ty.name()) {
            let state = factory.state(obj)?;
            let state = self.isolate(&state, trace, depth + 1)?;
            let (type_name, factory_id, state) = (ty.name().to_string(), factory.id(), Arc::new(state));
            return Ok(if factory.immutable() {
                Isolated::ImmutableManaged {
                    type_name,
                    factory_id,
                    state,
                }
            } else {
                Isolated::Managed {
                    type_name,
                    factory_id,
                    state,
                }
            });
        }

        let object = obj.borrow();
        match object.data() {
            ObjectData::Fields(_) if ty.is_a(names::MAP_ENTRY) => {
                let key = object.field("key").cloned().unwrap_or(Value::Null);
                let value = object.field("value").cloned().unwrap_or(Value::Null);
                Ok(Isolated::MapEntry {
                    key: Arc::new(self.isolate(&key, &PropertyTrace::field(trace, "key"), depth + 1)?),
                    value: Arc::new(self.isolate(&value, &PropertyTrace::field(trace, "value"), depth + 1)?),
                })
            }
            ObjectData::Fields(_) => Err(failure(
                trace,
                format!("cannot isolate object of type '{ty}': no managed factory is registered for it"),
            )),
            ObjectData::List(items) => Ok(Isolated::List(self.isolate_elements(items, trace, depth)?)),
            ObjectData::Set(items) => Ok(Isolated::set(self.isolate_elements(items, trace, depth)?)),
            ObjectData::Array(items) => Ok(Isolated::Array {
                component: ty.name().strip_suffix("[]").unwrap_or(ty.name()).to_string(),
                elements: self.isolate_elements(items, trace, depth)?,
            }),
            ObjectData::Map(entries) => {
                let mut isolated = Vec::with_capacity(entries.len());
                for (i, (k, v)) in entries.iter().enumerate() {
                    let key_trace = PropertyTrace::child(trace, Segment::MapKey(i));
                    let label = match k {
                        Value::String(s) => MapKeyLabel::Named(s.clone()),
                        _ => MapKeyLabel::Index(i),
                    };
                    let value_trace = PropertyTrace::child(trace, Segment::MapValue(label));
                    isolated.push((
                        Arc::new(self.isolate(k, &key_trace, depth + 1)?),
                        Arc::new(self.isolate(v, &value_trace, depth + 1)?),
                    ));
                }
                Ok(Isolated::Map(isolated))
            }
        }
    }

    fn isolate_elements(
        &mut self,
        items: &[Value],
        trace: &Rc<PropertyTrace>,
        depth: usize,
    ) -> Result<Vec<Arc<Isolated>>> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.isolate(item, &PropertyTrace::element(trace, i), depth + 1)
                    .map(Arc::new)
            })
            .collect()
    }
}

fn failure(trace: &Rc<PropertyTrace>, message: String) -> CodecError {
    CodecError::Serialization {
        trace: trace.to_string(),
        message,
    }
}
