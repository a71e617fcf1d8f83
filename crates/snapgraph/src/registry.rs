// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ordered codec bindings and type-directed dispatch.
//!
//! Resolution scans bindings in registration order and the first matching
//! predicate wins; the structural fallback catches everything else. Tags
//! are positions:
//!
//! ```text
//! 0            reserved
//! 1..=n        bindings, in registration order
//! n + 1        fallback
//! ```
//!
//! Binding order is therefore part of the wire format, and the registry's
//! [`signature`](CodecRegistry::signature) covers it.

use crate::codec::{
    reentrant, BeanCodec, Binding, Codec, CollectionCodec, EnumCodec, IsolatedCodec,
    OwnerServiceCodec, Primitive, PrimitiveCodec, TypeMatcher, UnsupportedCodec,
};
use crate::config::CodecConfig;
use crate::context::{ReadContext, WriteContext};
use crate::error::{RegistryError, Result};
use crate::isolation::ManagedFactoryRegistry;
use crate::model::{names, TypeDescriptor, Value};
use crate::stream::FORMAT_VERSION;
use dashmap::DashMap;
use md5::{Digest, Md5};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;

/// One row of [`CodecRegistry::describe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingInfo {
    pub tag: u32,
    /// Rendered matcher (`= T` or `<: T`), or `*` for the fallback.
    pub matcher: String,
    pub codec: String,
}

/// Collects bindings in order and freezes them into a [`CodecRegistry`].
#[derive(Default)]
pub struct BindingsBuilder {
    bindings: Vec<Binding>,
    fallback: Option<Arc<dyn Codec>>,
    error: Option<RegistryError>,
}

impl BindingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a binding. Binding an identical matcher twice is an error,
    /// reported by [`build`](Self::build).
    pub fn bind(self, matcher: TypeMatcher, codec: impl Codec + 'static) -> Self {
        self.bind_arc(matcher, Arc::new(codec))
    }

    pub fn bind_exact(self, name: impl Into<String>, codec: impl Codec + 'static) -> Self {
        self.bind(TypeMatcher::exact(name), codec)
    }

    pub fn bind_subtype(self, name: impl Into<String>, codec: impl Codec + 'static) -> Self {
        self.bind(TypeMatcher::subtype(name), codec)
    }

    pub fn bind_arc(mut self, matcher: TypeMatcher, codec: Arc<dyn Codec>) -> Self {
        if self.error.is_some() {
            return self;
        }
        // A binding that an earlier one fully covers could never be selected.
        if let Some(first) = self.bindings.iter().find(|b| b.matcher().shadows(&matcher)) {
            self.error = Some(RegistryError::DuplicateBinding {
                matcher: matcher.to_string(),
                first: first.codec().describe(),
                second: codec.describe(),
            });
            return self;
        }
        self.bindings.push(Binding::new(matcher, codec));
        self
    }

    /// Set the catch-all codec. Exactly one is required.
    pub fn fallback(mut self, codec: impl Codec + 'static) -> Self {
        if self.error.is_none() {
            match &self.fallback {
                Some(existing) => {
                    self.error = Some(RegistryError::FallbackAlreadySet(existing.describe()));
                }
                None => self.fallback = Some(Arc::new(codec)),
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn build(self) -> std::result::Result<CodecRegistry, RegistryError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let fallback = self.fallback.ok_or(RegistryError::MissingFallback)?;
        let signature = compute_signature(&self.bindings, fallback.as_ref());
        let registry = CodecRegistry {
            bindings: self.bindings,
            fallback,
            cache: DashMap::new(),
            signature,
        };
        tracing::debug!(
            bindings = registry.bindings.len(),
            signature = %registry.signature_hex(),
            "codec registry built"
        );
        Ok(registry)
    }
}

fn binding_rows(bindings: &[Binding], fallback: &dyn Codec) -> Vec<BindingInfo> {
    let mut rows: Vec<BindingInfo> = bindings
        .iter()
        .enumerate()
        .map(|(i, b)| BindingInfo {
            tag: i as u32 + 1,
            matcher: b.matcher().to_string(),
            codec: b.codec().describe(),
        })
        .collect();
    rows.push(BindingInfo {
        tag: bindings.len() as u32 + 1,
        matcher: "*".to_string(),
        codec: fallback.describe(),
    });
    rows
}

fn compute_signature(bindings: &[Binding], fallback: &dyn Codec) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(format!("snapgraph/{FORMAT_VERSION}\n").as_bytes());
    for row in binding_rows(bindings, fallback) {
        hasher.update(format!("{}\t{}\t{}\n", row.tag, row.matcher, row.codec).as_bytes());
    }
    hasher.finalize().into()
}

/// Immutable, thread-safe codec dispatch table.
pub struct CodecRegistry {
    bindings: Vec<Binding>,
    fallback: Arc<dyn Codec>,
    // Pure memo of `resolve_type`; bindings never change after build.
    cache: DashMap<TypeDescriptor, u32>,
    signature: [u8; 16],
}

impl CodecRegistry {
    pub fn builder() -> BindingsBuilder {
        BindingsBuilder::new()
    }

    /// The production binding order: unsupported types, scalars,
    /// collections, enums, owner services, isolated values, then the
    /// reentrant bean fallback.
    pub fn standard(
        config: &CodecConfig,
        factories: Arc<ManagedFactoryRegistry>,
    ) -> std::result::Result<Self, RegistryError> {
        let mut builder = Self::builder();

        for group in &config.unsupported {
            for type_name in &group.types {
                builder = builder.bind_subtype(
                    type_name.as_str(),
                    UnsupportedCodec::new(type_name.as_str(), group.category.as_str()),
                );
            }
        }
        for kind in Primitive::ALL {
            builder = builder.bind_exact(kind.type_name(), PrimitiveCodec(kind));
        }
        for codec in CollectionCodec::standard() {
            let name = codec.type_ref().name().to_string();
            builder = builder.bind_exact(name, reentrant(codec));
        }
        builder = builder.bind_subtype(names::ENUM, EnumCodec);
        for service in &config.owner_services {
            builder = builder.bind_subtype(service.as_str(), OwnerServiceCodec::new(service.as_str()));
        }
        if config.isolated_values {
            for codec in IsolatedCodec::family(&factories) {
                builder = builder.bind_exact(codec.kind().type_name(), codec);
            }
        }

        builder.fallback(reentrant(BeanCodec)).build()
    }

    /// Number of explicit bindings (the fallback excluded).
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn fallback_tag(&self) -> u32 {
        self.bindings.len() as u32 + 1
    }

    /// Tag selected for values of type `ty`.
    pub fn resolve_type(&self, ty: &TypeDescriptor) -> u32 {
        if let Some(tag) = self.cache.get(ty) {
            return *tag;
        }
        let tag = self
            .bindings
            .iter()
            .position(|b| b.matcher().matches(ty))
            .map_or(self.fallback_tag(), |i| i as u32 + 1);
        self.cache.insert(ty.clone(), tag);
        tag
    }

    /// Tag and codec selected for `value`.
    pub fn resolve(&self, value: &Value) -> (u32, &dyn Codec) {
        let tag = self.resolve_type(&value.runtime_type());
        let codec = self.codec(tag).unwrap_or(self.fallback.as_ref());
        (tag, codec)
    }

    /// Codec registered under `tag`, if any.
    pub fn codec(&self, tag: u32) -> Option<&dyn Codec> {
        match tag {
            0 => None,
            t if t == self.fallback_tag() => Some(self.fallback.as_ref()),
            t => self.bindings.get(t as usize - 1).map(Binding::codec),
        }
    }

    /// Write `[tag][payload]` for `value`.
    pub fn encode(&self, value: &Value, ctx: &mut WriteContext<'_>) -> Result<()> {
        let (tag, codec) = self.resolve(value);
        ctx.write_varint(u64::from(tag))?;
        codec.encode(ctx, value)
    }

    /// Read the payload for an already-consumed `tag`.
    pub fn decode(&self, tag: u32, ctx: &mut ReadContext<'_>) -> Result<Value> {
        let codec = self.codec(tag).ok_or_else(|| {
            ctx.corrupt(format!(
                "tag {tag} outside registry range 1..={}",
                self.fallback_tag()
            ))
        })?;
        codec.decode(ctx)
    }

    /// Category under which `value` would be refused, if any.
    pub fn rejection(&self, value: &Value) -> Option<&str> {
        self.resolve(value).1.rejection()
    }

    /// `true` if encoding `value` fails with an unsupported-type error.
    pub fn is_unsupported(&self, value: &Value) -> bool {
        self.rejection(value).is_some()
    }

    /// Binding table, fallback last.
    pub fn describe(&self) -> Vec<BindingInfo> {
        binding_rows(&self.bindings, self.fallback.as_ref())
    }

    /// MD5 over the binding table and the wire format version.
    pub fn signature(&self) -> [u8; 16] {
        self.signature
    }

    pub fn signature_hex(&self) -> String {
        self.signature.iter().fold(String::with_capacity(32), |mut s, b| {
            let _ = write!(s, "{b:02x}");
            s
        })
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("bindings", &self.bindings.len())
            .field("signature", &self.signature_hex())
            .finish()
    }
}
