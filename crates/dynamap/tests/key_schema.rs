use std::sync::Arc;

use dynamap::{
    AttributeValue, ErrorClass, FieldShape, IntWidth, KeyType, RecordShape, ShapeRegistry,
    TemplateStore, TypeShape, Value,
};

fn store() -> TemplateStore {
    TemplateStore::new(ShapeRegistry::new())
}

fn resolve(record: RecordShape) -> Result<Arc<dynamap::RecordTemplate>, dynamap::DynamapError> {
    store().resolve_template(&record.build())
}

#[test]
fn hash_and_range_keys_use_custom_names_and_types() {
    let record = RecordShape::new("Entry")
        .with_field(FieldShape::new("hash", TypeShape::String).renamed("A1").hash_key())
        .with_field(
            FieldShape::new("range", TypeShape::Int(IntWidth::I64))
                .renamed("B1")
                .range_key(),
        );
    let template = resolve(record).unwrap();

    let primary = template.primary_key();
    assert_eq!(primary.hash_key.attribute_name, "A1");
    assert_eq!(primary.hash_key.key_type, KeyType::S);
    let range = primary.range_key.as_ref().unwrap();
    assert_eq!(range.attribute_name, "B1");
    assert_eq!(range.key_type, KeyType::N);

    let value = Value::record([
        ("hash", Value::String("h".into())),
        ("range", Value::Int(42)),
    ]);
    let map = template.to_attribute_map(&value).unwrap();
    assert_eq!(map.get("A1"), Some(&AttributeValue::S("h".into())));
    assert_eq!(map.get("B1"), Some(&AttributeValue::N("42".into())));
}

#[test]
fn constant_hash_key_is_reported_and_injected() {
    let record = RecordShape::new("Fixed")
        .with_constant_hash_key("HashKey", AttributeValue::N("42".into()))
        .with_field(FieldShape::new("B1", TypeShape::String).range_key());
    let template = resolve(record).unwrap();

    let primary = template.primary_key();
    assert_eq!(primary.hash_key.attribute_name, "HashKey");
    assert_eq!(primary.hash_key.key_type, KeyType::N);
    assert_eq!(primary.range_key.as_ref().unwrap().key_type, KeyType::S);

    let value = Value::record([("B1", Value::String("r".into()))]);
    let map = template.to_attribute_map(&value).unwrap();
    assert_eq!(map.get("HashKey"), Some(&AttributeValue::N("42".into())));

    // The injected constant is ignored on the way back.
    assert_eq!(template.from_attribute_map(&map).unwrap(), value);
}

#[test]
fn missing_hash_key_fails() {
    let record =
        RecordShape::new("NoKeys").with_field(FieldShape::new("data", TypeShape::String));
    let err = resolve(record).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("no hash key declared"), "got: {msg}");
    assert_eq!(err.class(), ErrorClass::KeySchema);
}

#[test]
fn two_field_hash_keys_fail() {
    let record = RecordShape::new("TwoHash")
        .with_field(FieldShape::new("a", TypeShape::String).hash_key())
        .with_field(FieldShape::new("b", TypeShape::String).hash_key());
    let err = resolve(record).unwrap_err();
    assert!(err.to_string().contains("2 fields marked as hash key"));
}

#[test]
fn field_and_constant_hash_keys_conflict() {
    let record = RecordShape::new("Both")
        .with_constant_hash_key("HK", AttributeValue::S("fixed".into()))
        .with_field(FieldShape::new("a", TypeShape::String).hash_key());
    let err = resolve(record).unwrap_err();
    assert!(err.to_string().contains("both a field-level hash key and a constant hash key"));
}

#[test]
fn two_range_keys_fail() {
    let record = RecordShape::new("TwoRange")
        .with_field(FieldShape::new("h", TypeShape::String).hash_key())
        .with_field(FieldShape::new("r1", TypeShape::String).range_key())
        .with_field(FieldShape::new("r2", TypeShape::String).range_key());
    let err = resolve(record).unwrap_err();
    assert!(err.to_string().contains("2 range key declarations"));
}

#[test]
fn bool_hash_key_is_not_scalar() {
    let record =
        RecordShape::new("BoolKey").with_field(FieldShape::new("flag", TypeShape::Bool).hash_key());
    let err = resolve(record).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("scalar type S, N or B"), "got: {msg}");
    assert!(msg.contains("BOOL"), "got: {msg}");
}

#[test]
fn string_repr_does_not_admit_non_scalar_keys() {
    let record = RecordShape::new("BoolKey").with_field(
        FieldShape::new("flag", TypeShape::Bool)
            .hash_key()
            .string_repr(),
    );
    let err = resolve(record).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("scalar type S, N or B"), "got: {msg}");
    assert!(msg.contains("BOOL"), "got: {msg}");
}

#[test]
fn compound_range_key_is_not_scalar() {
    let record = RecordShape::new("ListKey")
        .with_field(FieldShape::new("h", TypeShape::String).hash_key())
        .with_field(FieldShape::new("r", TypeShape::seq(TypeShape::String)).range_key());
    let err = resolve(record).unwrap_err();
    assert!(err.to_string().contains("scalar type S, N or B"));
}

#[test]
fn string_repr_reports_s_for_numeric_key() {
    let numeric = RecordShape::new("Keyed").with_field(
        FieldShape::new("id", TypeShape::Int(IntWidth::I64))
            .hash_key()
            .string_repr(),
    );
    let textual =
        RecordShape::new("Keyed2").with_field(FieldShape::new("id", TypeShape::String).hash_key());

    let a = store().resolve_template(&numeric.build()).unwrap();
    let b = store().resolve_template(&textual.build()).unwrap();

    assert_eq!(a.primary_key().hash_key.key_type, KeyType::S);
    // Differing only by the override, the two schemas are identical.
    assert_eq!(a.primary_key(), b.primary_key());
}

#[test]
fn global_index_with_hash_and_range_is_extracted() {
    let record = RecordShape::new("Indexed")
        .with_field(FieldShape::new("id", TypeShape::String).hash_key())
        .with_field(
            FieldShape::new("owner", TypeShape::String).global_index_hash("owner-index"),
        )
        .with_field(
            FieldShape::new("created", TypeShape::Int(IntWidth::I64))
                .global_index_range("owner-index"),
        );
    let template = resolve(record).unwrap();

    let indices = template.global_secondary_indices();
    assert_eq!(indices.len(), 1);
    assert_eq!(indices[0].index_name, "owner-index");
    assert_eq!(indices[0].hash_key.attribute_name, "owner");
    assert_eq!(indices[0].hash_key.key_type, KeyType::S);
    let range = indices[0].range_key.as_ref().unwrap();
    assert_eq!(range.attribute_name, "created");
    assert_eq!(range.key_type, KeyType::N);
}

#[test]
fn range_only_global_index_is_rejected() {
    let record = RecordShape::new("Lopsided")
        .with_field(FieldShape::new("id", TypeShape::String).hash_key())
        .with_field(
            FieldShape::new("created", TypeShape::Int(IntWidth::I64))
                .global_index_range("orphan-index"),
        );
    let err = resolve(record).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("range key but no hash key"), "got: {msg}");
    assert!(msg.contains("'orphan-index'"), "got: {msg}");
}

#[test]
fn multiple_indices_are_validated_independently() {
    let record = RecordShape::new("Multi")
        .with_field(FieldShape::new("id", TypeShape::String).hash_key())
        .with_field(FieldShape::new("sort", TypeShape::Int(IntWidth::I64)).range_key())
        .with_field(
            FieldShape::new("owner", TypeShape::String)
                .global_index_hash("owner-index")
                .global_index_hash("shared-index"),
        )
        .with_field(
            FieldShape::new("kind", TypeShape::String).global_index_range("shared-index"),
        )
        .with_field(
            FieldShape::new("updated", TypeShape::Int(IntWidth::I64))
                .local_index_range("updated-index"),
        );
    let template = resolve(record).unwrap();

    let names: Vec<&str> = template
        .global_secondary_indices()
        .iter()
        .map(|i| i.index_name.as_str())
        .collect();
    assert_eq!(names, vec!["owner-index", "shared-index"]);
    assert_eq!(template.local_secondary_indices().len(), 1);
}

#[test]
fn non_scalar_global_index_key_is_rejected() {
    let record = RecordShape::new("BadIndex")
        .with_field(FieldShape::new("id", TypeShape::String).hash_key())
        .with_field(FieldShape::new("flag", TypeShape::Bool).global_index_hash("flag-index"));
    let err = resolve(record).unwrap_err();
    assert!(err.to_string().contains("scalar type S, N or B"));
}

#[test]
fn local_index_shares_primary_hash_key() {
    let record = RecordShape::new("Local")
        .with_field(FieldShape::new("id", TypeShape::String).renamed("PK").hash_key())
        .with_field(FieldShape::new("sort", TypeShape::Int(IntWidth::I64)).range_key())
        .with_field(
            FieldShape::new("score", TypeShape::Int(IntWidth::I64))
                .local_index_range("score-index"),
        );
    let template = resolve(record).unwrap();

    let local = &template.local_secondary_indices()[0];
    assert_eq!(local.index_name, "score-index");
    assert_eq!(local.hash_key, template.primary_key().hash_key);
    assert_eq!(local.range_key.attribute_name, "score");
}

#[test]
fn local_index_without_primary_range_key_is_rejected() {
    let record = RecordShape::new("LocalNoRange")
        .with_field(FieldShape::new("id", TypeShape::String).hash_key())
        .with_field(
            FieldShape::new("score", TypeShape::Int(IntWidth::I64))
                .local_index_range("score-index"),
        );
    let err = resolve(record).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("requires the record to declare a primary range key"), "got: {msg}");
}
