// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host services available while decoding.

use crate::model::Handle;

/// Resolves live service instances in the decoding process.
pub trait ServiceLocator {
    /// A service whose type is, or derives from, `service_type`.
    fn locate(&self, service_type: &str) -> Option<Handle>;
}

/// Locator that knows no services.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoServices;

impl ServiceLocator for NoServices {
    fn locate(&self, _service_type: &str) -> Option<Handle> {
        None
    }
}

/// Locator backed by a list of registered service handles.
///
/// The first registered handle whose type satisfies the request wins.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<Handle>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, service: Handle) -> &mut Self {
        self.services.push(service);
        self
    }

    pub fn with(mut self, service: Handle) -> Self {
        self.services.push(service);
        self
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLocator for ServiceRegistry {
    fn locate(&self, service_type: &str) -> Option<Handle> {
        self.services
            .iter()
            .find(|h| h.type_ref().is_a(service_type))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDescriptor;

    #[test]
    fn test_locate_by_supertype() {
        let ty = TypeDescriptor::builder("DefaultObjectFactory")
            .extends("ObjectFactory")
            .build();
        let registry = ServiceRegistry::new().with(Handle::new(ty, 1u8));

        let found = registry.locate("ObjectFactory").expect("service");
        assert_eq!(found.type_ref().name(), "DefaultObjectFactory");
        assert_eq!(found.downcast_ref::<u8>(), Some(&1));
        assert!(registry.locate("WorkerExecutor").is_none());
        assert!(NoServices.locate("ObjectFactory").is_none());
    }
}
