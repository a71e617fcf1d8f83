// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type descriptors.
//!
//! A [`TypeDescriptor`] is the only thing a binding predicate ever looks at:
//! a type name plus the transitive set of supertype names it can be
//! assigned to.

use std::fmt;
use std::sync::{Arc, LazyLock};

/// Shared handle to a type descriptor.
pub type TypeRef = Arc<TypeDescriptor>;

/// Runtime description of a type: its name and every supertype it satisfies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: String,
    supertypes: Vec<String>,
}

impl TypeDescriptor {
    /// Create a descriptor with no supertypes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
        }
    }

    /// Start a fluent builder.
    pub fn builder(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name)
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Supertype names (transitive, excluding the type itself).
    pub fn supertypes(&self) -> &[String] {
        &self.supertypes
    }

    /// Returns `true` if this type is `name` or declares it as a supertype.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.supertypes.iter().any(|s| s == name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Fluent builder for [`TypeDescriptor`].
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: String,
    supertypes: Vec<String>,
}

impl TypeDescriptorBuilder {
    /// Create a builder for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
        }
    }

    /// Declare a supertype. Duplicates are ignored.
    pub fn extends(mut self, supertype: impl Into<String>) -> Self {
        let supertype = supertype.into();
        if supertype != self.name && !self.supertypes.contains(&supertype) {
            self.supertypes.push(supertype);
        }
        self
    }

    /// Inherit every supertype of `parent`, plus `parent` itself.
    pub fn extends_type(mut self, parent: &TypeDescriptor) -> Self {
        self = self.extends(parent.name());
        for supertype in parent.supertypes() {
            self = self.extends(supertype.as_str());
        }
        self
    }

    /// Build a shared descriptor.
    pub fn build(self) -> TypeRef {
        Arc::new(TypeDescriptor {
            name: self.name,
            supertypes: self.supertypes,
        })
    }
}

/// Names of the built-in types.
pub mod names {
    pub const NULL: &str = "null";
    pub const BOOL: &str = "bool";
    pub const BYTE: &str = "i8";
    pub const SHORT: &str = "i16";
    pub const INT: &str = "i32";
    pub const LONG: &str = "i64";
    pub const CHAR: &str = "char";
    pub const FLOAT: &str = "f32";
    pub const DOUBLE: &str = "f64";
    pub const STRING: &str = "String";
    pub const FILE: &str = "File";

    pub const COLLECTION: &str = "Collection";
    pub const LIST: &str = "List";
    pub const SET: &str = "Set";
    pub const MAP: &str = "Map";
    pub const ARRAY: &str = "Array";
    pub const ENUM: &str = "Enum";
    pub const MAP_ENTRY: &str = "MapEntry";

    pub const ARRAY_LIST: &str = "ArrayList";
    pub const LINKED_LIST: &str = "LinkedList";
    pub const IMMUTABLE_LIST: &str = "ImmutableList";
    pub const LINKED_HASH_SET: &str = "LinkedHashSet";
    pub const HASH_SET: &str = "HashSet";
    pub const TREE_SET: &str = "TreeSet";
    pub const IMMUTABLE_SET: &str = "ImmutableSet";
    pub const LINKED_HASH_MAP: &str = "LinkedHashMap";
    pub const HASH_MAP: &str = "HashMap";
    pub const TREE_MAP: &str = "TreeMap";
    pub const CONCURRENT_HASH_MAP: &str = "ConcurrentHashMap";
    pub const IMMUTABLE_MAP: &str = "ImmutableMap";

    pub const ISOLATED: &str = "Isolated";
    pub const ISOLATED_MANAGED: &str = "IsolatedManagedValue";
    pub const ISOLATED_IMMUTABLE_MANAGED: &str = "IsolatedImmutableManagedValue";
    pub const ISOLATED_ARRAY: &str = "IsolatedArray";
    pub const ISOLATED_SET: &str = "IsolatedSet";
    pub const ISOLATED_LIST: &str = "IsolatedList";
    pub const ISOLATED_MAP: &str = "IsolatedMap";
    pub const ISOLATED_MAP_ENTRY: &str = "IsolatedMapEntry";
    pub const ISOLATED_ENUM: &str = "IsolatedEnumValue";
    pub const ISOLATED_STRING: &str = "StringValueSnapshot";
    pub const ISOLATED_INTEGER: &str = "IntegerValueSnapshot";
    pub const ISOLATED_LONG: &str = "LongValueSnapshot";
    pub const ISOLATED_FILE: &str = "FileValueSnapshot";
    pub const ISOLATED_BOOLEAN: &str = "BooleanValueSnapshot";
    pub const ISOLATED_NULL: &str = "NullValueSnapshot";
}

fn builtin(name: &str, supertypes: &[&str]) -> TypeRef {
    supertypes
        .iter()
        .fold(TypeDescriptor::builder(name), |b, s| b.extends(*s))
        .build()
}

macro_rules! builtin_types {
    ($($ident:ident => $name:expr, [$($sup:expr),*];)*) => {
        $(
            pub static $ident: LazyLock<TypeRef> =
                LazyLock::new(|| builtin($name, &[$($sup),*]));
        )*
    };
}

/// Shared descriptors for built-in types.
pub mod builtins {
    use super::{builtin, names, LazyLock, TypeRef};

    builtin_types! {
        NULL => names::NULL, [];
        BOOL => names::BOOL, [];
        BYTE => names::BYTE, [];
        SHORT => names::SHORT, [];
        INT => names::INT, [];
        LONG => names::LONG, [];
        CHAR => names::CHAR, [];
        FLOAT => names::FLOAT, [];
        DOUBLE => names::DOUBLE, [];
        STRING => names::STRING, [];
        FILE => names::FILE, [];

        ARRAY_LIST => names::ARRAY_LIST, [names::LIST, names::COLLECTION];
        LINKED_LIST => names::LINKED_LIST, [names::LIST, names::COLLECTION];
        IMMUTABLE_LIST => names::IMMUTABLE_LIST, [names::LIST, names::COLLECTION];
        LINKED_HASH_SET => names::LINKED_HASH_SET, [names::HASH_SET, names::SET, names::COLLECTION];
        HASH_SET => names::HASH_SET, [names::SET, names::COLLECTION];
        TREE_SET => names::TREE_SET, [names::SET, names::COLLECTION];
        IMMUTABLE_SET => names::IMMUTABLE_SET, [names::SET, names::COLLECTION];
        LINKED_HASH_MAP => names::LINKED_HASH_MAP, [names::HASH_MAP, names::MAP];
        HASH_MAP => names::HASH_MAP, [names::MAP];
        TREE_MAP => names::TREE_MAP, [names::MAP];
        CONCURRENT_HASH_MAP => names::CONCURRENT_HASH_MAP, [names::MAP];
        IMMUTABLE_MAP => names::IMMUTABLE_MAP, [names::MAP];
        MAP_ENTRY => names::MAP_ENTRY, [];

        ISOLATED_MANAGED => names::ISOLATED_MANAGED, [names::ISOLATED];
        ISOLATED_IMMUTABLE_MANAGED => names::ISOLATED_IMMUTABLE_MANAGED, [names::ISOLATED];
        ISOLATED_ARRAY => names::ISOLATED_ARRAY, [names::ISOLATED];
        ISOLATED_SET => names::ISOLATED_SET, [names::ISOLATED];
        ISOLATED_LIST => names::ISOLATED_LIST, [names::ISOLATED];
        ISOLATED_MAP => names::ISOLATED_MAP, [names::ISOLATED];
        ISOLATED_MAP_ENTRY => names::ISOLATED_MAP_ENTRY, [names::ISOLATED];
        ISOLATED_ENUM => names::ISOLATED_ENUM, [names::ISOLATED];
        ISOLATED_STRING => names::ISOLATED_STRING, [names::ISOLATED];
        ISOLATED_INTEGER => names::ISOLATED_INTEGER, [names::ISOLATED];
        ISOLATED_LONG => names::ISOLATED_LONG, [names::ISOLATED];
        ISOLATED_FILE => names::ISOLATED_FILE, [names::ISOLATED];
        ISOLATED_BOOLEAN => names::ISOLATED_BOOLEAN, [names::ISOLATED];
        ISOLATED_NULL => names::ISOLATED_NULL, [names::ISOLATED];
    }

    /// Descriptor for an array whose elements are of `component` type.
    pub fn array_of(component: &str) -> TypeRef {
        super::TypeDescriptor::builder(format!("{component}[]"))
            .extends(names::ARRAY)
            .build()
    }

    /// Descriptor for an enum declared by `name`.
    pub fn enum_type(name: &str) -> TypeRef {
        super::TypeDescriptor::builder(name)
            .extends(names::ENUM)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_a_checks_name_and_supertypes() {
        let ty = TypeDescriptor::builder("DefaultTask")
            .extends("Task")
            .extends("Named")
            .build();

        assert!(ty.is_a("DefaultTask"));
        assert!(ty.is_a("Task"));
        assert!(ty.is_a("Named"));
        assert!(!ty.is_a("Project"));
    }

    #[test]
    fn test_builder_ignores_duplicates_and_self() {
        let ty = TypeDescriptor::builder("A")
            .extends("A")
            .extends("B")
            .extends("B")
            .build();
        assert_eq!(ty.supertypes(), &["B".to_string()]);
    }

    #[test]
    fn test_extends_type_is_transitive() {
        let collection = TypeDescriptor::builder("Collection").build();
        let list = TypeDescriptor::builder("List")
            .extends_type(&collection)
            .build();
        let custom = TypeDescriptor::builder("NamedDomainObjectList")
            .extends_type(&list)
            .build();

        assert!(custom.is_a("List"));
        assert!(custom.is_a("Collection"));
    }

    #[test]
    fn test_builtin_collections() {
        assert!(builtins::ARRAY_LIST.is_a(names::LIST));
        assert!(builtins::LINKED_HASH_SET.is_a(names::HASH_SET));
        assert!(builtins::array_of("String").is_a(names::ARRAY));
        assert!(builtins::enum_type("Color").is_a(names::ENUM));
    }
}
