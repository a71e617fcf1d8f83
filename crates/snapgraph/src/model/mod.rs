// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic object model
//!
//! The in-memory graph that codecs walk. Nothing here knows about encoding.
//!
//! - **TypeDescriptor**: runtime type name + supertypes (what bindings match on)
//! - **Value**: primitives, enum constants, files, heap objects, live handles,
//!   isolated snapshots
//! - **ObjectRef**: shared heap object with pointer identity, so graphs can be
//!   shared and cyclic
//!
//! # Example
//!
//! ```rust
//! use snapgraph::model::{ObjectRef, TypeDescriptor, Value};
//!
//! let node = TypeDescriptor::builder("Node").extends("Named").build();
//! let a = ObjectRef::bean(node.clone());
//! let b = ObjectRef::bean(node);
//! a.set_field("next", Value::Object(b.clone()));
//! b.set_field("next", Value::Object(a.clone()));
//!
//! assert!(a.type_ref().is_a("Named"));
//! ```

mod object;
mod types;
mod value;

pub use object::{Object, ObjectData, ObjectRef, Shape};
pub use types::{builtins, names, TypeDescriptor, TypeDescriptorBuilder, TypeRef};
pub use value::{EnumValue, Handle, Value};
