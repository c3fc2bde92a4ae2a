// Copyright (c) 2022 MASSA LABS <info@massa.net>

//! Process-lifetime in-memory model registry.
//!
//! An external loader discovers model implementations at startup, registers
//! them here, and hands the registry to the runner worker behind an `Arc`.
//! Registration is a startup-time side effect: once the worker is running
//! the registry is only ever read, which is why lookups take `&self` and
//! need no locking.

use crate::controller_traits::ModelRegistry;
use crate::error::ExecutionError;
use crate::types::{ModelDescriptor, ModelManifestEntry};
use lens_models::{ModelSlug, Version};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// In-memory `(slug, version) -> descriptor` map.
/// Multiple versions of one slug may coexist; an unspecified version
/// resolves to the highest registered one.
#[derive(Default)]
pub struct StaticModelRegistry {
    models: HashMap<ModelSlug, BTreeMap<Version, Arc<ModelDescriptor>>>,
}

impl StaticModelRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a loaded model descriptor.
    ///
    /// # Errors
    /// Fails if the same (slug, version) pair was already registered:
    /// a manifest listing the same model twice is a packaging defect.
    pub fn register(&mut self, descriptor: ModelDescriptor) -> Result<(), ExecutionError> {
        let slug = descriptor.slug.clone();
        let version = descriptor.version;
        let versions = self.models.entry(slug.clone()).or_default();
        if versions.contains_key(&version) {
            return Err(ExecutionError::ModelLoad(format!(
                "model {}@{} registered twice",
                slug, version
            )));
        }
        debug!("registered model {}@{}", slug, version);
        versions.insert(version, Arc::new(descriptor));
        Ok(())
    }
}

impl ModelRegistry for StaticModelRegistry {
    fn resolve(
        &self,
        slug: &ModelSlug,
        version: Option<&Version>,
    ) -> Result<Arc<ModelDescriptor>, ExecutionError> {
        let versions = self
            .models
            .get(slug)
            .ok_or_else(|| ExecutionError::ModelNotFound(slug.to_string()))?;
        let descriptor = match version {
            Some(version) => versions.get(version).ok_or_else(|| {
                ExecutionError::ModelNotFound(format!("{}@{}", slug, version))
            })?,
            // BTreeMap: last entry is the highest version
            None => {
                let (_, descriptor) = versions
                    .last_key_value()
                    .ok_or_else(|| ExecutionError::ModelNotFound(slug.to_string()))?;
                descriptor
            }
        };
        Ok(descriptor.clone())
    }

    fn manifest(&self) -> Vec<ModelManifestEntry> {
        let mut entries: Vec<ModelManifestEntry> = self
            .models
            .iter()
            .flat_map(|(slug, versions)| {
                versions.keys().map(|version| ModelManifestEntry {
                    slug: slug.clone(),
                    version: *version,
                })
            })
            .collect();
        entries.sort_by(|a, b| (&a.slug, a.version).cmp(&(&b.slug, b.version)));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelBody;
    use crate::ModelApi;
    use serde_json::{json, Value};
    use std::str::FromStr;

    fn noop_body() -> Arc<dyn ModelBody> {
        Arc::new(|_api: &dyn ModelApi, _input: &Value| Ok(json!(null)))
    }

    fn descriptor(slug: &str, version: &str) -> ModelDescriptor {
        ModelDescriptor::new(
            ModelSlug::from_str(slug).unwrap(),
            Version::from_str(version).unwrap(),
            noop_body(),
        )
    }

    #[test]
    fn test_unspecified_version_resolves_to_highest() {
        let mut registry = StaticModelRegistry::new();
        registry.register(descriptor("token.price", "1.0.0")).unwrap();
        registry.register(descriptor("token.price", "1.2.0")).unwrap();
        registry.register(descriptor("token.price", "1.10.0")).unwrap();

        let slug = ModelSlug::from_str("token.price").unwrap();
        let resolved = registry.resolve(&slug, None).unwrap();
        assert_eq!(resolved.version, Version::new(1, 10, 0));

        let pinned = registry
            .resolve(&slug, Some(&Version::new(1, 2, 0)))
            .unwrap();
        assert_eq!(pinned.version, Version::new(1, 2, 0));
    }

    #[test]
    fn test_unknown_slug_and_version_not_found() {
        let mut registry = StaticModelRegistry::new();
        registry.register(descriptor("token.price", "1.0.0")).unwrap();

        let slug = ModelSlug::from_str("token.price").unwrap();
        let missing = ModelSlug::from_str("missing.model").unwrap();
        assert!(matches!(
            registry.resolve(&missing, None),
            Err(ExecutionError::ModelNotFound(_))
        ));
        assert!(matches!(
            registry.resolve(&slug, Some(&Version::new(9, 9, 9))),
            Err(ExecutionError::ModelNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = StaticModelRegistry::new();
        registry.register(descriptor("token.price", "1.0.0")).unwrap();
        assert!(registry.register(descriptor("token.price", "1.0.0")).is_err());
    }

    #[test]
    fn test_manifest_is_sorted() {
        let mut registry = StaticModelRegistry::new();
        registry.register(descriptor("b.model", "1.0.0")).unwrap();
        registry.register(descriptor("a.model", "2.0.0")).unwrap();
        registry.register(descriptor("a.model", "1.0.0")).unwrap();
        let manifest = registry.manifest();
        let listed: Vec<String> = manifest
            .iter()
            .map(|e| format!("{}@{}", e.slug, e.version))
            .collect();
        assert_eq!(listed, vec!["a.model@1.0.0", "a.model@2.0.0", "b.model@1.0.0"]);
    }
}
