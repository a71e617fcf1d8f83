// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec registry configuration
//!
//! Which types are refused outright and which are rehydrated from the host
//! is policy, not code. The defaults describe a build tool's object model.
//!
//! ```yaml
//! unsupported:
//!   - category: live runtime state
//!     types: [Thread, Socket]
//! owner_services: [ObjectFactory]
//! isolated_values: true
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A set of types refused for the same reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedGroup {
    /// Reason reported in the error, e.g. "live runtime state".
    pub category: String,
    /// Type names; subtypes are refused too.
    pub types: Vec<String>,
}

impl UnsupportedGroup {
    pub fn new(category: impl Into<String>, types: &[&str]) -> Self {
        Self {
            category: category.into(),
            types: types.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

/// Codec registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Types that must never be snapshotted, grouped by category
    pub unsupported: Vec<UnsupportedGroup>,

    /// Service types resolved from the decoding host instead of the stream
    pub owner_services: Vec<String>,

    /// Bind the isolated snapshot codecs (default: true)
    pub isolated_values: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            unsupported: default_unsupported(),
            owner_services: default_owner_services(),
            isolated_values: true,
        }
    }
}

fn default_unsupported() -> Vec<UnsupportedGroup> {
    vec![
        UnsupportedGroup::new(
            "live runtime state",
            &[
                "ClassLoader",
                "Thread",
                "ThreadFactory",
                "Executor",
                "InputStream",
                "OutputStream",
                "FileDescriptor",
                "RandomAccessFile",
                "Socket",
                "ServerSocket",
            ],
        ),
        UnsupportedGroup::new("build script", &["Script", "KotlinScript"]),
        UnsupportedGroup::new(
            "build model",
            &[
                "Gradle",
                "Settings",
                "Project",
                "TaskContainer",
                "TaskDependency",
                "SourceSetContainer",
                "SourceSet",
            ],
        ),
        UnsupportedGroup::new(
            "dependency resolution service",
            &[
                "ConfigurationContainer",
                "ResolutionStrategy",
                "ResolvedConfiguration",
                "LenientConfiguration",
                "DependencyConstraintSet",
                "RepositoryHandler",
                "ArtifactRepository",
                "DependencyHandler",
                "DependencyConstraintHandler",
                "ComponentMetadataHandler",
                "ComponentModuleMetadataHandler",
                "ArtifactTypeContainer",
                "AttributesSchema",
                "AttributeMatchingStrategy",
                "CompatibilityRuleChain",
                "DisambiguationRuleChain",
                "ArtifactResolutionQuery",
                "DependencySet",
                "Dependency",
                "DependencyLockingHandler",
            ],
        ),
    ]
}

fn default_owner_services() -> Vec<String> {
    [
        "ProviderFactory",
        "ObjectFactory",
        "WorkerExecutor",
        "ProjectLayout",
        "PatternSpecFactory",
        "FileResolver",
        "Instantiator",
        "FileCollectionFactory",
        "FileSystemOperations",
        "FileOperations",
        "BuildOperationExecutor",
        "ToolingModelBuilderRegistry",
        "ExecOperations",
        "ExecActionFactory",
        "BuildOperationListenerManager",
        "BuildRequestMetaData",
        "ListenerManager",
        "TemporaryFileProvider",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl CodecConfig {
    /// Create a new config builder
    pub fn builder() -> CodecConfigBuilder {
        CodecConfigBuilder::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let config = match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text)?,
            "json" => Self::from_json_str(&text)?,
            _ => return Err(ConfigError::UnknownFormat(path.display().to_string())),
        };
        tracing::debug!(path = %path.display(), "loaded codec config");
        Ok(config)
    }

    /// Category of `type_name` if it is listed as unsupported.
    pub fn unsupported_category(&self, type_name: &str) -> Option<&str> {
        self.unsupported
            .iter()
            .find(|g| g.types.iter().any(|t| t == type_name))
            .map(|g| g.category.as_str())
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct CodecConfigBuilder {
    unsupported: Option<Vec<UnsupportedGroup>>,
    owner_services: Option<Vec<String>>,
    isolated_values: Option<bool>,
}

impl CodecConfigBuilder {
    /// Replace the unsupported groups
    pub fn unsupported(mut self, groups: Vec<UnsupportedGroup>) -> Self {
        self.unsupported = Some(groups);
        self
    }

    /// Append one unsupported group to the current (or default) list
    pub fn add_unsupported(mut self, category: impl Into<String>, types: &[&str]) -> Self {
        self.unsupported
            .get_or_insert_with(default_unsupported)
            .push(UnsupportedGroup::new(category, types));
        self
    }

    /// Replace the owner service list
    pub fn owner_services(mut self, services: &[&str]) -> Self {
        self.owner_services = Some(services.iter().map(|s| (*s).to_string()).collect());
        self
    }

    /// Append one owner service to the current (or default) list
    pub fn add_owner_service(mut self, service: impl Into<String>) -> Self {
        self.owner_services
            .get_or_insert_with(default_owner_services)
            .push(service.into());
        self
    }

    /// Bind isolated snapshot codecs (default: true)
    pub fn isolated_values(mut self, enabled: bool) -> Self {
        self.isolated_values = Some(enabled);
        self
    }

    /// Build the configuration
    pub fn build(self) -> CodecConfig {
        let defaults = CodecConfig::default();

        CodecConfig {
            unsupported: self.unsupported.unwrap_or(defaults.unsupported),
            owner_services: self.owner_services.unwrap_or(defaults.owner_services),
            isolated_values: self.isolated_values.unwrap_or(defaults.isolated_values),
        }
    }
}
