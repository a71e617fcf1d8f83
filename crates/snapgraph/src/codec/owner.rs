// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Owner-service codec.
//!
//! Services belong to the hosting process, not to the snapshot. Only the tag
//! is written; the binding it selects names the service type, and decoding
//! asks the new host for an instance.

use super::Codec;
use crate::context::{ReadContext, WriteContext};
use crate::error::Result;
use crate::model::Value;

#[derive(Debug, Clone)]
pub struct OwnerServiceCodec {
    service_type: String,
}

impl OwnerServiceCodec {
    pub fn new(service_type: impl Into<String>) -> Self {
        Self {
            service_type: service_type.into(),
        }
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }
}

impl Codec for OwnerServiceCodec {
    fn describe(&self) -> String {
        format!("owner service {}", self.service_type)
    }

    fn encode(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        match value {
            Value::Handle(_) | Value::Object(_) => Ok(()),
            other => Err(ctx.failure(format!(
                "value of type '{}' cannot stand for service '{}'",
                other.runtime_type(),
                self.service_type
            ))),
        }
    }

    fn decode(&self, ctx: &mut ReadContext<'_>) -> Result<Value> {
        match ctx.services().locate(&self.service_type) {
            Some(handle) => Ok(Value::Handle(handle)),
            None => {
                tracing::warn!(
                    service = %self.service_type,
                    trace = %ctx.trace(),
                    "owner service unavailable in target context"
                );
                Err(ctx.rehydration(&self.service_type))
            }
        }
    }
}
