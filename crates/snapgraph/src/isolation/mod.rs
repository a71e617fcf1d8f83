// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Isolated values
//!
//! An [`Isolated`] is a deep, immutable snapshot of a value, detached from
//! the object it was taken from. Mutating the source afterwards has no
//! effect on the snapshot, and instantiating the snapshot always produces
//! fresh objects.
//!
//! - **isolate**: live [`Value`] -> [`Isolated`]
//! - **instantiate**: [`Isolated`] -> fresh live [`Value`]
//! - **managed types**: reduced to state by a [`ManagedFactory`] and rebuilt
//!   by the factory with the same id on the other side

mod isolate;
mod managed;

pub use isolate::{isolate, MAX_ISOLATION_DEPTH};
pub use managed::{FieldsFactory, ManagedFactory, ManagedFactoryRegistry};

use crate::error::{CodecError, Result};
use crate::model::{builtins, EnumValue, ObjectData, ObjectRef, TypeRef, Value};
use std::path::PathBuf;
use std::sync::Arc;

/// Self-contained snapshot value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Isolated {
    Managed {
        type_name: String,
        factory_id: u32,
        state: Arc<Isolated>,
    },
    ImmutableManaged {
        type_name: String,
        factory_id: u32,
        state: Arc<Isolated>,
    },
    Array {
        component: String,
        elements: Vec<Arc<Isolated>>,
    },
    /// Ascending and free of duplicates when built with [`Isolated::set`].
    Set(Vec<Arc<Isolated>>),
    List(Vec<Arc<Isolated>>),
    Map(Vec<(Arc<Isolated>, Arc<Isolated>)>),
    MapEntry {
        key: Arc<Isolated>,
        value: Arc<Isolated>,
    },
    Enum {
        type_name: String,
        constant: String,
    },
    String(String),
    Integer(i32),
    Long(i64),
    File(PathBuf),
    Boolean(bool),
    Null,
}

impl Isolated {
    /// Set snapshot in canonical order, duplicates removed, so equality and
    /// hashing do not depend on the order the source iterated in.
    pub fn set(mut elements: Vec<Arc<Isolated>>) -> Self {
        elements.sort();
        elements.dedup();
        Self::Set(elements)
    }

    /// Runtime type the registry dispatches on.
    pub fn runtime_type(&self) -> TypeRef {
        let ty = match self {
            Self::Managed { .. } => &builtins::ISOLATED_MANAGED,
            Self::ImmutableManaged { .. } => &builtins::ISOLATED_IMMUTABLE_MANAGED,
            Self::Array { .. } => &builtins::ISOLATED_ARRAY,
            Self::Set(_) => &builtins::ISOLATED_SET,
            Self::List(_) => &builtins::ISOLATED_LIST,
            Self::Map(_) => &builtins::ISOLATED_MAP,
            Self::MapEntry { .. } => &builtins::ISOLATED_MAP_ENTRY,
            Self::Enum { .. } => &builtins::ISOLATED_ENUM,
            Self::String(_) => &builtins::ISOLATED_STRING,
            Self::Integer(_) => &builtins::ISOLATED_INTEGER,
            Self::Long(_) => &builtins::ISOLATED_LONG,
            Self::File(_) => &builtins::ISOLATED_FILE,
            Self::Boolean(_) => &builtins::ISOLATED_BOOLEAN,
            Self::Null => &builtins::ISOLATED_NULL,
        };
        TypeRef::clone(ty)
    }

    /// Build fresh live values from this snapshot.
    pub fn instantiate(&self, factories: &ManagedFactoryRegistry) -> Result<Value> {
        Ok(match self {
            Self::Managed {
                factory_id, state, ..
            }
            | Self::ImmutableManaged {
                factory_id, state, ..
            } => {
                let factory = factories
                    .lookup(*factory_id)
                    .ok_or_else(|| missing_factory(*factory_id))?;
                factory.create(state.instantiate(factories)?)?
            }
            Self::Array {
                component,
                elements,
            } => Value::Object(ObjectRef::array(
                component,
                instantiate_all(elements, factories)?,
            )),
            Self::Set(elements) => {
                Value::Object(ObjectRef::linked_hash_set(instantiate_all(elements, factories)?))
            }
            Self::List(elements) => {
                Value::Object(ObjectRef::array_list(instantiate_all(elements, factories)?))
            }
            Self::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| Ok((k.instantiate(factories)?, v.instantiate(factories)?)))
                    .collect::<Result<Vec<_>>>()?;
                Value::Object(ObjectRef::linked_hash_map(entries))
            }
            Self::MapEntry { key, value } => {
                let entry = ObjectRef::with_data(
                    builtins::MAP_ENTRY.clone(),
                    ObjectData::Fields(vec![
                        ("key".to_string(), key.instantiate(factories)?),
                        ("value".to_string(), value.instantiate(factories)?),
                    ]),
                );
                Value::Object(entry)
            }
            Self::Enum {
                type_name,
                constant,
            } => Value::Enum(EnumValue::new(builtins::enum_type(type_name), constant.as_str())),
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(v) => Value::Int(*v),
            Self::Long(v) => Value::Long(*v),
            Self::File(path) => Value::File(path.clone()),
            Self::Boolean(v) => Value::Bool(*v),
            Self::Null => Value::Null,
        })
    }

    /// Directly nested snapshots.
    pub fn children(&self) -> Vec<&Arc<Isolated>> {
        match self {
            Self::Managed { state, .. } | Self::ImmutableManaged { state, .. } => vec![state],
            Self::Array { elements, .. } | Self::Set(elements) | Self::List(elements) => {
                elements.iter().collect()
            }
            Self::Map(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            Self::MapEntry { key, value } => vec![key, value],
            _ => Vec::new(),
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Managed { .. } | Self::ImmutableManaged { .. })
    }
}

impl From<Isolated> for Value {
    fn from(iso: Isolated) -> Self {
        Value::Isolated(Arc::new(iso))
    }
}

fn instantiate_all(
    elements: &[Arc<Isolated>],
    factories: &ManagedFactoryRegistry,
) -> Result<Vec<Value>> {
    elements.iter().map(|e| e.instantiate(factories)).collect()
}

pub(crate) fn missing_factory(id: u32) -> CodecError {
    CodecError::Rehydration {
        service: format!("managed factory #{id}"),
        trace: "$".into(),
    }
}
