//! MetadataCodec - wrapper-object JSON encoding
//!
//! # Wire format
//! - one value: `{ "<TYPE>": { ...fields... } }`
//! - a sequence: a JSON array of wrappers, order preserved
//!
//! Even a single value travels as a one-element array, so every encoded
//! string has the same shape.
//!
//! # Decoding
//! 1. parse the text as a JSON array
//! 2. split every element into `(tag, fields)`
//! 3. decode `fields` as `T` (typed) or through the `TypeRegistry` (erased)

use std::sync::Arc;

use serde_json::{Map, Value};

use super::registry::TypeRegistry;
use super::value::{DynMetadataValue, MetadataEntry, MetadataValue};
use crate::domain::SerializationError;

/// MetadataCodec encodes and decodes metadata values.
///
/// Encoding only needs the values themselves; the registry is consulted when
/// decoding into erased `MetadataEntry` values.
#[derive(Clone, Debug)]
pub struct MetadataCodec {
    registry: Arc<TypeRegistry>,
}

impl MetadataCodec {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    /// Codec over [`TypeRegistry::global`].
    pub fn global() -> Self {
        Self::new(TypeRegistry::global())
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Wrap one value as `{ "<TYPE>": { ...fields... } }`.
    pub fn wrap(value: &dyn DynMetadataValue) -> Result<Value, SerializationError> {
        let type_tag = value.type_tag();
        let fields = value.encode_fields().map_err(|source| SerializationError::Encode {
            type_tag: type_tag.to_string(),
            source,
        })?;
        if !fields.is_object() {
            return Err(SerializationError::NotAnObject {
                type_tag: type_tag.to_string(),
            });
        }

        let mut wrapper = Map::with_capacity(1);
        wrapper.insert(type_tag.to_string(), fields);
        Ok(Value::Object(wrapper))
    }

    /// Encode a sequence of values into a JSON array of wrappers.
    pub fn encode_list<'a, I>(&self, values: I) -> Result<String, SerializationError>
    where
        I: IntoIterator<Item = &'a dyn DynMetadataValue>,
    {
        let wrappers = values
            .into_iter()
            .map(Self::wrap)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(wrappers).to_string())
    }

    /// Decode every element as `T`.
    pub fn decode_list<T: MetadataValue>(&self, text: &str) -> Result<Vec<T>, SerializationError> {
        parse_wrappers(text)?
            .into_iter()
            .map(|(tag, fields)| self.decode_typed::<T>(tag, fields))
            .collect()
    }

    /// Decode exactly one element as `T`.
    pub fn decode_one<T: MetadataValue>(&self, text: &str) -> Result<T, SerializationError> {
        let (tag, fields) = only_wrapper(parse_wrappers(text)?)?;
        self.decode_typed::<T>(tag, fields)
    }

    /// Decode every element through the registry, whatever its type.
    pub fn decode_entries(&self, text: &str) -> Result<Vec<MetadataEntry>, SerializationError> {
        self.decode_entries_value(parse_json(text)?)
    }

    /// Decode exactly one element through the registry.
    pub fn decode_one_entry(&self, text: &str) -> Result<MetadataEntry, SerializationError> {
        let (tag, fields) = only_wrapper(parse_wrappers(text)?)?;
        self.registry.decode(&tag, fields)
    }

    /// Same as [`decode_entries`](Self::decode_entries), for an already parsed array.
    pub fn decode_entries_value(&self, value: Value) -> Result<Vec<MetadataEntry>, SerializationError> {
        split_wrappers(value)?
            .into_iter()
            .map(|(tag, fields)| self.registry.decode(&tag, fields))
            .collect()
    }

    fn decode_typed<T: MetadataValue>(&self, tag: String, fields: Value) -> Result<T, SerializationError> {
        if tag != T::TYPE {
            if self.registry.is_registered(&tag) {
                return Err(SerializationError::TypeMismatch {
                    expected: T::TYPE.to_string(),
                    found: tag,
                });
            }
            return Err(SerializationError::UnknownTypeTag(tag));
        }
        serde_json::from_value::<T>(fields).map_err(|source| SerializationError::Decode {
            type_tag: tag,
            source,
        })
    }
}

fn parse_json(text: &str) -> Result<Value, SerializationError> {
    serde_json::from_str(text).map_err(SerializationError::Malformed)
}

fn parse_wrappers(text: &str) -> Result<Vec<(String, Value)>, SerializationError> {
    split_wrappers(parse_json(text)?)
}

fn split_wrappers(value: Value) -> Result<Vec<(String, Value)>, SerializationError> {
    let Value::Array(items) = value else {
        return Err(SerializationError::unexpected_shape(
            "expected a JSON array of metadata wrappers",
        ));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| split_wrapper(index, item))
        .collect()
}

fn split_wrapper(index: usize, item: Value) -> Result<(String, Value), SerializationError> {
    let Value::Object(wrapper) = item else {
        return Err(SerializationError::unexpected_shape(format!(
            "element {index} is not a wrapper object"
        )));
    };
    if wrapper.len() != 1 {
        return Err(SerializationError::unexpected_shape(format!(
            "element {index} has {} keys, expected exactly one type tag",
            wrapper.len()
        )));
    }
    let Some((tag, fields)) = wrapper.into_iter().next() else {
        return Err(SerializationError::unexpected_shape(format!(
            "element {index} is empty"
        )));
    };
    if !fields.is_object() {
        return Err(SerializationError::unexpected_shape(format!(
            "element {index} ('{tag}') does not wrap a JSON object"
        )));
    }
    Ok((tag, fields))
}

fn only_wrapper(mut wrappers: Vec<(String, Value)>) -> Result<(String, Value), SerializationError> {
    if wrappers.len() != 1 {
        return Err(SerializationError::Cardinality {
            expected: 1,
            found: wrappers.len(),
        });
    }
    wrappers.pop().ok_or(SerializationError::Cardinality {
        expected: 1,
        found: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CoverageMetadata, NotSerializable, TestMetadata, test_registry};
    use rstest::rstest;

    fn codec() -> MetadataCodec {
        MetadataCodec::new(test_registry())
    }

    #[test]
    fn single_value_uses_wrapper_object_format() {
        let value = TestMetadata::new("a", 1);

        let encoded = codec().encode_list([&value as &dyn DynMetadataValue]).unwrap();
        assert_eq!(encoded, r#"[{"test.metadata.v1":{"name":"a","value":1}}]"#);
    }

    #[test]
    fn heterogeneous_list_keeps_order_and_types() {
        let entries = vec![
            MetadataEntry::new(TestMetadata::new("a", 1)),
            MetadataEntry::new(CoverageMetadata::new(0.75, &["src/lib.rs"])),
            MetadataEntry::new(TestMetadata::new("b", 2)),
        ];

        let codec = codec();
        let encoded = codec.encode_list(entries.iter().map(MetadataEntry::as_dyn)).unwrap();
        let decoded = codec.decode_entries(&encoded).unwrap();

        assert_eq!(decoded, entries);
        assert!(decoded[1].is::<CoverageMetadata>());
    }

    #[test]
    fn typed_list_round_trip() {
        let values = vec![TestMetadata::new("a", 1), TestMetadata::new("a", 2)];

        let codec = codec();
        let encoded = codec
            .encode_list(values.iter().map(|v| v as &dyn DynMetadataValue))
            .unwrap();
        let decoded: Vec<TestMetadata> = codec.decode_list(&encoded).unwrap();

        assert_eq!(decoded, values);
    }

    #[test]
    fn empty_list_encodes_as_empty_array() {
        let codec = codec();
        let encoded = codec.encode_list(std::iter::empty()).unwrap();

        assert_eq!(encoded, "[]");
        assert!(codec.decode_entries(&encoded).unwrap().is_empty());
    }

    #[test]
    fn failing_serialize_impl_is_an_encode_error() {
        let err = MetadataCodec::wrap(&NotSerializable {}).unwrap_err();
        assert!(matches!(err, SerializationError::Encode { type_tag, .. } if type_tag == NotSerializable::TYPE));
    }

    #[rstest]
    #[case::nan(f64::NAN)]
    #[case::infinity(f64::INFINITY)]
    #[case::negative_infinity(f64::NEG_INFINITY)]
    fn non_finite_float_is_an_encode_error(#[case] line_rate: f64) {
        let value = CoverageMetadata::new(line_rate, &[]);

        let err = codec().encode_list([&value as &dyn DynMetadataValue]).unwrap_err();
        assert!(matches!(err, SerializationError::Encode { type_tag, .. } if type_tag == CoverageMetadata::TYPE));
    }

    #[rstest]
    #[case::bare_word("bad")]
    #[case::truncated(r#"[{"test.metadata.v1":{"name":"a""#)]
    #[case::empty("")]
    fn malformed_text_is_rejected(#[case] text: &str) {
        let err = codec().decode_entries(text).unwrap_err();
        assert!(matches!(err, SerializationError::Malformed(_)));
    }

    #[rstest]
    #[case::not_an_array(r#"{"test.metadata.v1":{"name":"a","value":1}}"#)]
    #[case::element_not_object(r#"[1]"#)]
    #[case::two_tags(r#"[{"a.v1":{},"b.v1":{}}]"#)]
    #[case::no_tag(r#"[{}]"#)]
    #[case::fields_not_object(r#"[{"test.metadata.v1":[1,2]}]"#)]
    fn wrong_shape_is_rejected(#[case] text: &str) {
        let err = codec().decode_entries(text).unwrap_err();
        assert!(matches!(err, SerializationError::UnexpectedShape(_)));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = codec().decode_entries(r#"[{"nobody.v1":{}}]"#).unwrap_err();
        assert!(matches!(err, SerializationError::UnknownTypeTag(tag) if tag == "nobody.v1"));
    }

    #[rstest]
    #[case::zero("[]", 0)]
    #[case::two(
        r#"[{"test.metadata.v1":{"name":"a","value":1}},{"test.metadata.v1":{"name":"b","value":2}}]"#,
        2
    )]
    fn decode_one_requires_exactly_one_element(#[case] text: &str, #[case] found: usize) {
        let err = codec().decode_one::<TestMetadata>(text).unwrap_err();
        assert!(matches!(err, SerializationError::Cardinality { expected: 1, found: n } if n == found));
    }

    #[test]
    fn decode_one_rejects_other_registered_type() {
        let text = r#"[{"test.coverage.v1":{"line_rate":0.5,"files":[]}}]"#;

        let err = codec().decode_one::<TestMetadata>(text).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::TypeMismatch { expected, found }
                if expected == TestMetadata::TYPE && found == CoverageMetadata::TYPE
        ));
    }

    #[test]
    fn typed_decode_does_not_need_registration() {
        let codec = MetadataCodec::new(Arc::new(TypeRegistry::new()));
        let text = r#"[{"test.metadata.v1":{"name":"a","value":1}}]"#;

        assert_eq!(codec.decode_one::<TestMetadata>(text).unwrap(), TestMetadata::new("a", 1));
        assert!(matches!(
            codec.decode_one_entry(text),
            Err(SerializationError::UnknownTypeTag(_))
        ));
    }
}
