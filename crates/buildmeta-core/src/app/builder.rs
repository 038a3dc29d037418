//! RegistryBuilder - startup registration of metadata types
//!
//! Fail-fast wiring: a host lists the type tags it expects to be able to
//! decode, and `build()` refuses to start if any of them was never registered.

use std::sync::Arc;

use crate::typed::{MetadataValue, RegistryError, TypeRegistry};

/// RegistryBuilder assembles a `TypeRegistry`.
///
/// # Example
/// ```ignore
/// let registry = RegistryBuilder::new()
///     .register::<Coverage>()?
///     .register::<TestReport>()?
///     .expect_types(&["acme.coverage.v1", "acme.test_report.v1"])
///     .install()?;
/// ```
///
/// # Fail-fast
/// - `expect_types()` records the tags that must be decodable
/// - `build()` / `install()` check "expected ⊆ registered"
/// - anything missing is reported as `BuildError::MissingTypeTags`
pub struct RegistryBuilder {
    registry: TypeRegistry,
    expected_types: Option<Vec<String>>,
}

/// BuildError is returned when the registry cannot be assembled.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing metadata type tags: {0:?}. These types were expected but not registered.")]
    MissingTypeTags(Vec<String>),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            expected_types: None,
        }
    }

    pub fn register<T: MetadataValue>(self) -> Result<Self, RegistryError> {
        self.registry.register::<T>()?;
        Ok(self)
    }

    pub fn expect_types(mut self, type_tags: &[&str]) -> Self {
        self.expected_types = Some(type_tags.iter().map(|tag| tag.to_string()).collect());
        self
    }

    /// Check expectations and return a standalone registry.
    pub fn build(self) -> Result<TypeRegistry, BuildError> {
        if let Some(expected_types) = &self.expected_types {
            let missing: Vec<String> = expected_types
                .iter()
                .filter(|tag| !self.registry.is_registered(tag))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingTypeTags(missing));
            }
        }
        Ok(self.registry)
    }

    /// Check expectations and merge the registrations into [`TypeRegistry::global`].
    pub fn install(self) -> Result<Arc<TypeRegistry>, BuildError> {
        let registry = self.build()?;
        let global = TypeRegistry::global();
        global.merge(&registry)?;
        Ok(global)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CoverageMetadata, TestMetadata};

    #[test]
    fn test_build_success() {
        let registry = RegistryBuilder::new()
            .register::<TestMetadata>()
            .unwrap()
            .expect_types(&[TestMetadata::TYPE])
            .build();
        assert!(registry.is_ok_and(|r| r.is_registered(TestMetadata::TYPE)));
    }

    #[test]
    fn test_build_missing_type_tags() {
        let registry = RegistryBuilder::new()
            .register::<TestMetadata>()
            .unwrap()
            .expect_types(&[TestMetadata::TYPE, CoverageMetadata::TYPE])
            .build();
        assert!(matches!(
            registry,
            Err(BuildError::MissingTypeTags(missing)) if missing == vec![CoverageMetadata::TYPE.to_string()]
        ));
    }

    #[test]
    fn test_build_no_expect_types() {
        let registry = RegistryBuilder::new().build().unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_install_into_global() {
        let global = RegistryBuilder::new()
            .register::<TestMetadata>()
            .unwrap()
            .register::<CoverageMetadata>()
            .unwrap()
            .install()
            .unwrap();

        assert!(Arc::ptr_eq(&global, &TypeRegistry::global()));
        assert!(global.is_registered(TestMetadata::TYPE));
        assert!(global.is_registered(CoverageMetadata::TYPE));
    }

    #[test]
    fn test_install_checks_expectations_first() {
        let result = RegistryBuilder::new()
            .expect_types(&["never.registered.v1"])
            .install();

        assert!(matches!(result, Err(BuildError::MissingTypeTags(_))));
        assert!(!TypeRegistry::global().is_registered("never.registered.v1"));
    }
}
