// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs and the predicates that bind them to runtime types.
//!
//! A [`Codec`] handles one semantic category of values. Nested values are
//! never encoded inline: a codec calls back into the session
//! ([`WriteContext::write`] / [`ReadContext::read`]), which re-enters the
//! registry and dispatches the child independently.

pub mod base;
pub mod bean;
pub mod collections;
pub mod isolated;
pub mod owner;
pub mod reentrant;
pub mod unsupported;

use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::{TypeDescriptor, Value};
use std::fmt;
use std::sync::Arc;

pub use base::{EnumCodec, Primitive, PrimitiveCodec};
pub use bean::BeanCodec;
pub use collections::CollectionCodec;
pub use isolated::{IsolatedCodec, IsolatedKind};
pub use owner::OwnerServiceCodec;
pub use reentrant::{reentrant, Opened, Reentrant, Structural};
pub use unsupported::UnsupportedCodec;

/// Symmetric encoder/decoder for one category of values.
pub trait Codec: Send + Sync {
    /// Short human-readable description, part of the registry signature.
    fn describe(&self) -> String;

    /// Write the payload of `value`. The tag has already been written.
    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()>;

    /// Read a payload. The tag has already been consumed.
    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value>;

    /// Category name if this codec refuses every value it is bound to.
    fn rejection(&self) -> Option<&str> {
        None
    }
}

/// Predicate over a runtime type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeMatcher {
    /// The type's name equals the given name.
    Exact(String),
    /// The type is the given type or declares it as a supertype.
    Subtype(String),
}

impl TypeMatcher {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::Exact(name.into())
    }

    pub fn subtype(name: impl Into<String>) -> Self {
        Self::Subtype(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Exact(name) | Self::Subtype(name) => name,
        }
    }

    pub fn matches(&self, ty: &TypeDescriptor) -> bool {
        match self {
            Self::Exact(name) => ty.name() == name,
            Self::Subtype(name) => ty.is_a(name),
        }
    }

    /// `true` if every type matched by `later` is also matched by `self`,
    /// as far as can be told from names alone.
    pub fn shadows(&self, later: &TypeMatcher) -> bool {
        match (self, later) {
            (Self::Subtype(a), Self::Exact(b)) => a == b,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "= {name}"),
            Self::Subtype(name) => write!(f, "<: {name}"),
        }
    }
}

/// A predicate paired with the codec it selects.
#[derive(Clone)]
pub struct Binding {
    matcher: TypeMatcher,
    codec: Arc<dyn Codec>,
}

impl Binding {
    pub fn new(matcher: TypeMatcher, codec: Arc<dyn Codec>) -> Self {
        Self { matcher, codec }
    }

    pub fn matcher(&self) -> &TypeMatcher {
        &self.matcher
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("matcher", &self.matcher)
            .field("codec", &self.codec.describe())
            .finish()
    }
}
