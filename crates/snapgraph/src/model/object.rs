// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Heap objects with reference identity.

use super::types::{builtins, TypeRef};
use super::value::Value;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Structural shape of an object's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Named fields, in declaration order.
    Fields,
    List,
    Set,
    Map,
    Array,
}

impl Shape {
    /// Wire discriminator.
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Fields => 0,
            Self::List => 1,
            Self::Set => 2,
            Self::Map => 3,
            Self::Array => 4,
        }
    }

    /// Parse a wire discriminator.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Fields),
            1 => Some(Self::List),
            2 => Some(Self::Set),
            3 => Some(Self::Map),
            4 => Some(Self::Array),
            _ => None,
        }
    }
}

/// Payload of a heap object.
#[derive(Debug, Clone)]
pub enum ObjectData {
    Fields(Vec<(String, Value)>),
    List(Vec<Value>),
    /// Insertion-ordered; uniqueness is the owner's concern.
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Array(Vec<Value>),
}

impl ObjectData {
    /// Empty payload of the given shape.
    pub fn empty(shape: Shape) -> Self {
        match shape {
            Shape::Fields => Self::Fields(Vec::new()),
            Shape::List => Self::List(Vec::new()),
            Shape::Set => Self::Set(Vec::new()),
            Shape::Map => Self::Map(Vec::new()),
            Shape::Array => Self::Array(Vec::new()),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            Self::Fields(_) => Shape::Fields,
            Self::List(_) => Shape::List,
            Self::Set(_) => Shape::Set,
            Self::Map(_) => Shape::Map,
            Self::Array(_) => Shape::Array,
        }
    }

    /// Number of fields, elements or entries.
    pub fn len(&self) -> usize {
        match self {
            Self::Fields(f) => f.len(),
            Self::List(v) | Self::Set(v) | Self::Array(v) => v.len(),
            Self::Map(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every directly referenced value (map keys before their values).
    pub fn children(&self) -> Vec<Value> {
        match self {
            Self::Fields(f) => f.iter().map(|(_, v)| v.clone()).collect(),
            Self::List(v) | Self::Set(v) | Self::Array(v) => v.clone(),
            Self::Map(m) => m
                .iter()
                .flat_map(|(k, v)| [k.clone(), v.clone()])
                .collect(),
        }
    }

    fn drain_values(&mut self) -> Vec<Value> {
        match self {
            Self::Fields(f) => std::mem::take(f).into_iter().map(|(_, v)| v).collect(),
            Self::List(v) | Self::Set(v) | Self::Array(v) => std::mem::take(v),
            Self::Map(m) => std::mem::take(m)
                .into_iter()
                .flat_map(|(k, v)| [k, v])
                .collect(),
        }
    }
}

/// A heap object: runtime type plus payload.
#[derive(Debug)]
pub struct Object {
    ty: TypeRef,
    data: ObjectData,
}

impl Object {
    pub fn new(ty: TypeRef, data: ObjectData) -> Self {
        Self { ty, data }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn data(&self) -> &ObjectData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut ObjectData {
        &mut self.data
    }

    /// Look up a field by name (field-shaped objects only).
    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.data {
            ObjectData::Fields(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Set or append a field. Returns `false` if the object is not field-shaped.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> bool {
        let ObjectData::Fields(fields) = &mut self.data else {
            return false;
        };
        let name = name.into();
        match fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => fields.push((name, value)),
        }
        true
    }

    /// Append an element to a list, set or array. Returns `false` for other shapes.
    pub fn push(&mut self, value: Value) -> bool {
        match &mut self.data {
            ObjectData::List(v) | ObjectData::Set(v) | ObjectData::Array(v) => {
                v.push(value);
                true
            }
            _ => false,
        }
    }

    /// Append a map entry. Returns `false` for non-map objects.
    pub fn insert(&mut self, key: Value, value: Value) -> bool {
        match &mut self.data {
            ObjectData::Map(m) => {
                m.push((key, value));
                true
            }
            _ => false,
        }
    }
}

// Long chains (a linked list of 200k nodes) would overflow the stack with
// the default recursive drop, so children are unlinked onto a work list.
impl Drop for Object {
    fn drop(&mut self) {
        let mut pending = self.data.drain_values();
        while let Some(value) = pending.pop() {
            if let Value::Object(obj) = value {
                if let Ok(cell) = Rc::try_unwrap(obj.0) {
                    let mut inner = cell.into_inner();
                    pending.extend(inner.data.drain_values());
                }
            }
        }
    }
}

/// Shared, mutable reference to a heap object. Identity is pointer identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    /// New field-shaped object of type `ty`.
    pub fn bean(ty: TypeRef) -> Self {
        Self::new(Object::new(ty, ObjectData::Fields(Vec::new())))
    }

    pub fn with_data(ty: TypeRef, data: ObjectData) -> Self {
        Self::new(Object::new(ty, data))
    }

    pub fn array_list(items: Vec<Value>) -> Self {
        Self::with_data(builtins::ARRAY_LIST.clone(), ObjectData::List(items))
    }

    pub fn linked_hash_set(items: Vec<Value>) -> Self {
        Self::with_data(builtins::LINKED_HASH_SET.clone(), ObjectData::Set(items))
    }

    pub fn linked_hash_map(entries: Vec<(Value, Value)>) -> Self {
        Self::with_data(builtins::LINKED_HASH_MAP.clone(), ObjectData::Map(entries))
    }

    pub fn array(component: &str, items: Vec<Value>) -> Self {
        Self::with_data(builtins::array_of(component), ObjectData::Array(items))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn type_ref(&self) -> TypeRef {
        self.0.borrow().ty.clone()
    }

    /// Address used as the identity key within a session.
    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Snapshot of a field value (field-shaped objects only).
    pub fn field(&self, name: &str) -> Option<Value> {
        self.0.borrow().field(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: Value) -> bool {
        self.0.borrow_mut().set_field(name, value)
    }
}

// Shallow on purpose: graphs may be cyclic.
impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(obj) => write!(
                f,
                "ObjectRef({}@{:#x}, {:?} x{})",
                obj.ty,
                self.identity(),
                obj.data.shape(),
                obj.data.len()
            ),
            Err(_) => write!(f, "ObjectRef(<borrowed>@{:#x})", self.identity()),
        }
    }
}
