// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Factories for managed types.
//!
//! A managed type is one whose instances can be reduced to plain state and
//! rebuilt from it by a factory known to both the writing and the reading
//! process. Factories are identified by a stable numeric id.

use crate::error::{CodecError, Result};
use crate::model::{ObjectData, ObjectRef, TypeRef, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Reduces instances of one managed type to state and rebuilds them.
pub trait ManagedFactory: Send + Sync {
    /// Stable id, written to the stream.
    fn id(&self) -> u32;

    /// Name of the managed type this factory handles.
    fn type_name(&self) -> &str;

    /// `true` if instances never change after construction.
    fn immutable(&self) -> bool {
        false
    }

    /// Extract the state of a live instance.
    fn state(&self, obj: &ObjectRef) -> Result<Value>;

    /// Build a fresh instance from state produced by [`state`](Self::state).
    fn create(&self, state: Value) -> Result<Value>;
}

/// Managed factory for field-shaped objects.
///
/// State is a `LinkedHashMap` of field name to value; instantiation builds
/// a new object of the same type with those fields.
pub struct FieldsFactory {
    id: u32,
    ty: TypeRef,
    immutable: bool,
}

impl FieldsFactory {
    pub fn new(id: u32, ty: TypeRef) -> Self {
        Self {
            id,
            ty,
            immutable: false,
        }
    }

    pub fn new_immutable(id: u32, ty: TypeRef) -> Self {
        Self {
            id,
            ty,
            immutable: true,
        }
    }
}

impl ManagedFactory for FieldsFactory {
    fn id(&self) -> u32 {
        self.id
    }

    fn type_name(&self) -> &str {
        self.ty.name()
    }

    fn immutable(&self) -> bool {
        self.immutable
    }

    fn state(&self, obj: &ObjectRef) -> Result<Value> {
        let object = obj.borrow();
        let ObjectData::Fields(fields) = object.data() else {
            return Err(CodecError::Serialization {
                trace: "$".into(),
                message: format!("managed type '{}' is not field-shaped", self.ty),
            });
        };
        let entries = fields
            .iter()
            .map(|(name, value)| (Value::String(name.clone()), value.clone()))
            .collect();
        Ok(Value::Object(ObjectRef::linked_hash_map(entries)))
    }

    fn create(&self, state: Value) -> Result<Value> {
        let invalid = || CodecError::Serialization {
            trace: "$".into(),
            message: format!("invalid state for managed type '{}'", self.ty),
        };
        let map = state.as_object().ok_or_else(invalid)?;
        let map = map.borrow();
        let ObjectData::Map(entries) = map.data() else {
            return Err(invalid());
        };

        let obj = ObjectRef::bean(self.ty.clone());
        for (key, value) in entries {
            let name = key.as_str().ok_or_else(invalid)?;
            obj.set_field(name, value.clone());
        }
        Ok(Value::Object(obj))
    }
}

impl fmt::Debug for FieldsFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldsFactory")
            .field("id", &self.id)
            .field("type", &self.ty.name())
            .field("immutable", &self.immutable)
            .finish()
    }
}

/// Managed factories by id and by type name.
#[derive(Default, Clone)]
pub struct ManagedFactoryRegistry {
    by_id: HashMap<u32, Arc<dyn ManagedFactory>>,
    by_type: HashMap<String, u32>,
}

impl ManagedFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory. A later factory with the same id or type replaces
    /// the earlier one.
    pub fn register(&mut self, factory: impl ManagedFactory + 'static) -> &mut Self {
        let factory: Arc<dyn ManagedFactory> = Arc::new(factory);
        if let Some(previous) = self.by_id.get(&factory.id()) {
            self.by_type.remove(previous.type_name());
        }
        self.by_type
            .insert(factory.type_name().to_string(), factory.id());
        self.by_id.insert(factory.id(), factory);
        self
    }

    pub fn with(mut self, factory: impl ManagedFactory + 'static) -> Self {
        self.register(factory);
        self
    }

    pub fn lookup(&self, id: u32) -> Option<&dyn ManagedFactory> {
        self.by_id.get(&id).map(|f| f.as_ref())
    }

    pub fn for_type(&self, type_name: &str) -> Option<&dyn ManagedFactory> {
        self.by_type.get(type_name).and_then(|id| self.lookup(*id))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl fmt::Debug for ManagedFactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.by_type.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDescriptor;

    #[test]
    fn test_lookup_by_id_and_type() {
        let ty = TypeDescriptor::builder("CompileOptions").build();
        let registry = ManagedFactoryRegistry::new().with(FieldsFactory::new(7, ty));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup(7).map(|f| f.type_name()), Some("CompileOptions"));
        assert_eq!(registry.for_type("CompileOptions").map(|f| f.id()), Some(7));
        assert!(registry.lookup(8).is_none());
    }

    #[test]
    fn test_replacing_id_drops_old_type() {
        let mut registry = ManagedFactoryRegistry::new();
        registry.register(FieldsFactory::new(1, TypeDescriptor::builder("A").build()));
        registry.register(FieldsFactory::new(1, TypeDescriptor::builder("B").build()));

        assert!(registry.for_type("A").is_none());
        assert_eq!(registry.for_type("B").map(|f| f.id()), Some(1));
    }

    #[test]
    fn test_fields_factory_state_and_create() {
        let ty = TypeDescriptor::builder("CompileOptions").build();
        let factory = FieldsFactory::new(1, ty.clone());
        let obj = ObjectRef::bean(ty);
        obj.set_field("debug", Value::Bool(true));

        let state = factory.state(&obj).expect("state");
        let rebuilt = factory.create(state).expect("create");
        assert_eq!(rebuilt, Value::Object(obj.clone()));
        assert!(!rebuilt.as_object().expect("object").ptr_eq(&obj));
    }
}
