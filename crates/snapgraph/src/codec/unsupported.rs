// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sentinel codec for types that must never be snapshotted.

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::Value;

/// Rejects every value it is bound to, naming the value's runtime type.
///
/// Nothing is written before the error is raised, so a failed session never
/// contains a partial payload for the rejected value.
#[derive(Debug, Clone)]
pub struct UnsupportedCodec {
    type_name: String,
    category: String,
}

impl UnsupportedCodec {
    pub fn new(type_name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            category: category.into(),
        }
    }

    /// The type this codec is bound to.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl Codec for UnsupportedCodec {
    fn describe(&self) -> String {
        format!("unsupported {} ({})", self.type_name, self.category)
    }

    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        let actual = value.runtime_type();
        Err(ctx.unsupported(actual.name(), &self.category))
    }

    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value> {
        Err(ctx.corrupt(format!(
            "tag of unsupported type '{}' cannot appear in a valid stream",
            self.type_name
        )))
    }

    fn rejection(&self) -> Option<&str> {
        Some(&self.category)
    }
}
