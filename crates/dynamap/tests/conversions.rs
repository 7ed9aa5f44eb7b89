use dynamap::{
    AttributeValue, ErrorClass, FieldShape, IntWidth, RecordShape, Resolver, ShapeRegistry,
    TypeShape, Value,
};

fn resolver() -> Resolver {
    Resolver::new(ShapeRegistry::new())
}

#[test]
fn narrow_integer_rejects_out_of_range_on_unpickle() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Int(IntWidth::I8)).unwrap();
    let err = pickler
        .unpickle(&AttributeValue::N("200".into()))
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("out of range for i8"), "got: {msg}");
    assert_eq!(err.class(), ErrorClass::Conversion);
}

#[test]
fn narrow_integer_rejects_out_of_range_on_pickle() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Int(IntWidth::U16)).unwrap();
    let err = pickler.pickle(&Value::Int(-1)).unwrap_err();
    assert!(err.to_string().contains("out of range for u16"));
}

#[test]
fn mistyped_attribute_reports_expected_and_actual() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Int(IntWidth::I64)).unwrap();
    let err = pickler
        .unpickle(&AttributeValue::S("not a number".into()))
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("expected N"), "got: {msg}");
    assert!(msg.contains("found S"), "got: {msg}");
}

#[test]
fn malformed_number_is_an_invalid_value() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Int(IntWidth::I64)).unwrap();
    let err = pickler
        .unpickle(&AttributeValue::N("12abc".into()))
        .unwrap_err();
    assert!(err.to_string().contains("not a valid integer"));
}

#[test]
fn multi_char_string_is_not_a_char() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Char).unwrap();
    let err = pickler
        .unpickle(&AttributeValue::S("ab".into()))
        .unwrap_err();
    assert!(err.to_string().contains("single character"));
}

#[test]
fn malformed_guid_is_an_invalid_value() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Guid).unwrap();
    let err = pickler
        .unpickle(&AttributeValue::S("not-a-guid".into()))
        .unwrap_err();
    assert!(err.to_string().contains("not a valid guid"));
}

#[test]
fn malformed_timestamp_is_an_invalid_value() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::DateTimeOffset).unwrap();
    let err = pickler
        .unpickle(&AttributeValue::S("2024-13-45".into()))
        .unwrap_err();
    assert!(err.to_string().contains("RFC 3339"));
}

#[test]
fn missing_required_attribute_names_field_and_type() {
    let record = RecordShape::new("Account")
        .with_field(FieldShape::new("id", TypeShape::String))
        .build();
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Record(record)).unwrap();

    let err = pickler
        .unpickle(&AttributeValue::M(Default::default()))
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'Account'"), "got: {msg}");
    assert!(msg.contains("'id'"), "got: {msg}");
    assert!(msg.contains("missing"), "got: {msg}");
    assert_eq!(err.class(), ErrorClass::Conversion);
}

#[test]
fn mistyped_field_attribute_names_field_and_type() {
    let record = RecordShape::new("Account")
        .with_field(FieldShape::new("balance", TypeShape::Int(IntWidth::I64)))
        .build();
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::Record(record)).unwrap();

    let mut map = dynamap::AttributeMap::new();
    map.insert("balance".into(), AttributeValue::Bool(true));
    let err = pickler.unpickle(&AttributeValue::M(map)).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("'balance'"), "got: {msg}");
    assert!(msg.contains("expected N"), "got: {msg}");
}

#[test]
fn pickling_wrong_value_shape_is_rejected() {
    let resolver = resolver();
    let pickler = resolver.resolve(&TypeShape::String).unwrap();
    let err = pickler.pickle(&Value::Int(1)).unwrap_err();
    assert!(err.to_string().contains("expected string value"));
}
