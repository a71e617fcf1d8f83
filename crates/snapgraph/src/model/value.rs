// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic value model.

use super::object::{ObjectData, ObjectRef};
use super::types::{builtins, TypeRef};
use crate::isolation::Isolated;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Any value reachable from a snapshot root.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Char(char),
    Float(f32),
    Double(f64),
    String(String),
    File(PathBuf),
    Enum(EnumValue),
    /// Heap object with reference identity.
    Object(ObjectRef),
    /// Live host-owned object (thread, socket, service, ...).
    Handle(Handle),
    /// Detached deep snapshot.
    Isolated(Arc<Isolated>),
}

impl Value {
    /// Runtime type used for codec resolution.
    pub fn runtime_type(&self) -> TypeRef {
        match self {
            Self::Null => builtins::NULL.clone(),
            Self::Bool(_) => builtins::BOOL.clone(),
            Self::Byte(_) => builtins::BYTE.clone(),
            Self::Short(_) => builtins::SHORT.clone(),
            Self::Int(_) => builtins::INT.clone(),
            Self::Long(_) => builtins::LONG.clone(),
            Self::Char(_) => builtins::CHAR.clone(),
            Self::Float(_) => builtins::FLOAT.clone(),
            Self::Double(_) => builtins::DOUBLE.clone(),
            Self::String(_) => builtins::STRING.clone(),
            Self::File(_) => builtins::FILE.clone(),
            Self::Enum(e) => e.ty.clone(),
            Self::Object(obj) => obj.type_ref(),
            Self::Handle(h) => h.ty.clone(),
            Self::Isolated(iso) => iso.runtime_type(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            Self::Handle(h) => Some(h),
            _ => None,
        }
    }

    /// Structural equality over possibly cyclic graphs.
    ///
    /// Objects compare by type and payload; a pair of objects already under
    /// comparison is assumed equal, so cycles terminate. Handles compare by
    /// identity. Iterative, so arbitrarily deep graphs are fine.
    pub fn deep_eq(&self, other: &Value) -> bool {
        let mut visited: HashSet<(usize, usize)> = HashSet::new();
        let mut pending = vec![(self.clone(), other.clone())];

        while let Some((a, b)) = pending.pop() {
            match (&a, &b) {
                (Value::Object(x), Value::Object(y)) => {
                    if !visited.insert((x.identity(), y.identity())) {
                        continue;
                    }
                    let (x, y) = (x.borrow(), y.borrow());
                    if x.type_ref() != y.type_ref() || x.data().shape() != y.data().shape() {
                        return false;
                    }
                    match (x.data(), y.data()) {
                        (ObjectData::Fields(fx), ObjectData::Fields(fy)) => {
                            if fx.len() != fy.len() {
                                return false;
                            }
                            for ((nx, vx), (ny, vy)) in fx.iter().zip(fy) {
                                if nx != ny {
                                    return false;
                                }
                                pending.push((vx.clone(), vy.clone()));
                            }
                        }
                        (dx, dy) => {
                            let (cx, cy) = (dx.children(), dy.children());
                            if cx.len() != cy.len() {
                                return false;
                            }
                            pending.extend(cx.into_iter().zip(cy));
                        }
                    }
                }
                _ => {
                    if !a.shallow_eq(&b) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn shallow_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::File(a), Self::File(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Handle(a), Self::Handle(b)) => a.ptr_eq(b),
            (Self::Isolated(a), Self::Isolated(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Self::Object(v)
    }
}

impl From<Handle> for Value {
    fn from(v: Handle) -> Self {
        Self::Handle(v)
    }
}

/// Enum constant, identified by declaring type and constant name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    ty: TypeRef,
    constant: String,
}

impl EnumValue {
    pub fn new(ty: TypeRef, constant: impl Into<String>) -> Self {
        Self {
            ty,
            constant: constant.into(),
        }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn constant(&self) -> &str {
        &self.constant
    }
}

/// Live host object. Carries no serializable state.
#[derive(Clone)]
pub struct Handle {
    ty: TypeRef,
    instance: Arc<dyn Any + Send + Sync>,
}

impl Handle {
    pub fn new<T: Any + Send + Sync>(ty: TypeRef, instance: T) -> Self {
        Self {
            ty,
            instance: Arc::new(instance),
        }
    }

    pub fn from_arc(ty: TypeRef, instance: Arc<dyn Any + Send + Sync>) -> Self {
        Self { ty, instance }
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.instance.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.ty)
    }
}
