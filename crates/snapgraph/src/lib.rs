// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapgraph
//!
//! Snapshot live object graphs to a byte stream and rehydrate them later,
//! choosing a codec per value from an ordered table of type bindings.
//!
//! - **Bindings**: ordered `(matcher, codec)` pairs, first match wins, one
//!   structural fallback. A binding's tag is its position.
//! - **Unsupported types**: refused with the property path that reached them
//! - **Owner services**: written as nothing, resolved from the decoding host
//! - **Deep graphs**: structural codecs run from an explicit work list, so
//!   depth is bounded by memory, not by the call stack
//! - **Isolated values**: immutable snapshots with their own codec family
//!
//! # Quick Start
//!
//! ```rust
//! use snapgraph::model::{ObjectRef, TypeDescriptor, Value};
//! use snapgraph::{CodecConfig, CodecRegistry, ManagedFactoryRegistry, NoServices};
//! use std::sync::Arc;
//!
//! let registry = CodecRegistry::standard(
//!     &CodecConfig::default(),
//!     Arc::new(ManagedFactoryRegistry::new()),
//! )?;
//!
//! let task = ObjectRef::bean(TypeDescriptor::builder("CompileTask").build());
//! task.set_field("name", Value::from("compileJava"));
//! task.set_field("self", Value::Object(task.clone()));
//!
//! let mut bytes = Vec::new();
//! snapgraph::write_snapshot(&registry, &mut bytes, &[Value::Object(task)])?;
//!
//! let roots = snapgraph::read_snapshot(&registry, &mut bytes.as_slice(), &NoServices)?
//!     .expect("same registry");
//! let copy = roots[0].as_object().expect("object");
//! assert!(copy.field("self").and_then(|v| v.as_object().cloned()).is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod config;
pub mod context;
pub mod error;
pub mod isolation;
pub mod model;
pub mod preflight;
pub mod registry;
pub mod services;
pub mod stream;
pub mod trace;
pub mod wire;

pub use codec::{Binding, Codec, TypeMatcher};
pub use config::{CodecConfig, CodecConfigBuilder, UnsupportedGroup};
pub use context::{ReadContext, SessionStats, WriteContext};
pub use error::{CodecError, ConfigError, ErrorKind, RegistryError, Result};
pub use isolation::{isolate, FieldsFactory, Isolated, ManagedFactory, ManagedFactoryRegistry};
pub use model::{ObjectRef, TypeDescriptor, Value};
pub use preflight::{scan, Finding};
pub use registry::{BindingInfo, BindingsBuilder, CodecRegistry};
pub use services::{NoServices, ServiceLocator, ServiceRegistry};
pub use stream::{load, read_snapshot, save, verify, write_snapshot, StreamHeader, StreamSummary};
