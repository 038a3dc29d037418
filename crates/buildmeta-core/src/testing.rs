//! Metadata value types shared by the unit tests.

use std::sync::Arc;

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};

use crate::typed::{MetadataValue, TypeRegistry};

/// Keyed by its `name` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetadata {
    pub name: String,
    pub value: i64,
}

impl TestMetadata {
    pub fn new(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

impl MetadataValue for TestMetadata {
    const TYPE: &'static str = "test.metadata.v1";

    fn key(&self) -> &str {
        &self.name
    }
}

/// Constant key; the key never appears in the encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetadata {
    pub line_rate: f64,
    pub files: Vec<String>,
}

impl CoverageMetadata {
    pub const KEY: &'static str = "coverage";

    pub fn new(line_rate: f64, files: &[&str]) -> Self {
        Self {
            line_rate,
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl MetadataValue for CoverageMetadata {
    const TYPE: &'static str = "test.coverage.v1";

    fn key(&self) -> &str {
        Self::KEY
    }
}

/// Its `Serialize` impl always fails, like a field getter that throws.
#[derive(Debug, Deserialize)]
pub struct NotSerializable {}

impl Serialize for NotSerializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("bad field"))
    }
}

impl MetadataValue for NotSerializable {
    const TYPE: &'static str = "test.not_serializable.v1";

    fn key(&self) -> &str {
        "MY_KEY"
    }
}

/// A fresh registry knowing the test types.
pub fn test_registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    registry.register::<TestMetadata>().unwrap();
    registry.register::<CoverageMetadata>().unwrap();
    Arc::new(registry)
}

/// Register the test types in the process-wide registry (idempotent).
pub fn register_global() {
    let global = TypeRegistry::global();
    global.register::<TestMetadata>().unwrap();
    global.register::<CoverageMetadata>().unwrap();
}
