use std::sync::{Arc, Barrier};
use std::thread;

use dynamap::{
    ErrorClass, FieldShape, IntWidth, RecordShape, Resolver, ShapeRegistry, TypeShape,
};

fn resolver() -> Resolver {
    Resolver::new(ShapeRegistry::new())
}

#[test]
fn repeated_resolution_returns_the_same_instance() {
    let resolver = resolver();
    let shape = TypeShape::seq(TypeShape::map(
        TypeShape::String,
        TypeShape::Int(IntWidth::I64),
    ));
    let first = resolver.resolve(&shape).unwrap();
    let second = resolver.resolve(&shape).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn structurally_equal_shapes_share_one_pickler() {
    let resolver = resolver();
    let a = resolver
        .resolve(&TypeShape::option(TypeShape::String))
        .unwrap();
    let b = resolver
        .resolve(&TypeShape::Option(Box::new(TypeShape::String)))
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn reference_and_direct_resolution_share_one_pickler() {
    let mut registry = ShapeRegistry::new();
    let record = RecordShape::new("Node")
        .with_field(FieldShape::new("label", TypeShape::String))
        .build();
    let reference = registry.define_record(record.clone()).unwrap();
    let resolver = Resolver::new(registry);

    let via_ref = resolver.resolve(&reference).unwrap();
    let direct = resolver.resolve(&TypeShape::Record(record)).unwrap();
    assert!(Arc::ptr_eq(&via_ref, &direct));
}

#[test]
fn directly_recursive_record_is_rejected() {
    let mut registry = ShapeRegistry::new();
    let record = RecordShape::new("Tree")
        .with_field(FieldShape::new("label", TypeShape::String))
        .with_field(FieldShape::new(
            "children",
            TypeShape::seq(TypeShape::reference("Tree")),
        ))
        .build();
    let reference = registry.define_record(record).unwrap();
    let resolver = Resolver::new(registry);

    let err = resolver.resolve(&reference).unwrap_err();
    assert_eq!(err.class(), ErrorClass::RecursiveType);
    let msg = err.to_string();
    assert!(msg.contains("already being resolved"), "got: {msg}");
    assert!(msg.contains("'Tree'"), "got: {msg}");
}

#[test]
fn mutually_recursive_records_are_rejected() {
    let mut registry = ShapeRegistry::new();
    let forest = RecordShape::new("Forest")
        .with_field(FieldShape::new(
            "trees",
            TypeShape::seq(TypeShape::reference("Tree")),
        ))
        .build();
    let tree = RecordShape::new("Tree")
        .with_field(FieldShape::new(
            "subforest",
            TypeShape::option(TypeShape::reference("Forest")),
        ))
        .build();
    registry.define_record(forest).unwrap();
    registry.define_record(tree).unwrap();
    let resolver = Resolver::new(registry);

    let err = resolver.resolve(&TypeShape::reference("Forest")).unwrap_err();
    assert_eq!(err.class(), ErrorClass::RecursiveType);
}

#[test]
fn concurrent_cyclic_resolution_fails_from_both_ends() {
    let mut registry = ShapeRegistry::new();
    let forest = RecordShape::new("Forest")
        .with_field(FieldShape::new(
            "trees",
            TypeShape::seq(TypeShape::reference("Tree")),
        ))
        .build();
    let tree = RecordShape::new("Tree")
        .with_field(FieldShape::new(
            "subforest",
            TypeShape::option(TypeShape::reference("Forest")),
        ))
        .build();
    registry.define_record(forest).unwrap();
    registry.define_record(tree).unwrap();
    let resolver = Arc::new(Resolver::new(registry));

    // Entering the cycle from opposite ends at the same time must fail on
    // both threads rather than block either of them.
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["Forest", "Tree"]
        .into_iter()
        .map(|name| {
            let resolver = resolver.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                resolver.resolve(&TypeShape::reference(name)).unwrap_err()
            })
        })
        .collect();

    for handle in handles {
        let err = handle.join().unwrap();
        assert_eq!(err.class(), ErrorClass::RecursiveType);
    }
}

#[test]
fn unknown_reference_is_rejected() {
    let resolver = resolver();
    let err = resolver
        .resolve(&TypeShape::reference("nowhere"))
        .unwrap_err();
    assert!(err.to_string().contains("unknown shape definition 'nowhere'"));
}

#[test]
fn failures_are_not_cached_and_refail_deterministically() {
    let resolver = resolver();
    let shape = TypeShape::seq(TypeShape::Other("socket".into()));

    let first = resolver.resolve(&shape).unwrap_err();
    let second = resolver.resolve(&shape).unwrap_err();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.class(), ErrorClass::UnsupportedType);

    // A failed element does not poison later, valid resolutions.
    resolver.resolve(&TypeShape::seq(TypeShape::String)).unwrap();
}

#[test]
fn nested_resolution_reuses_cached_children() {
    let resolver = resolver();
    let elem = resolver.resolve(&TypeShape::Guid).unwrap();
    resolver.resolve(&TypeShape::seq(TypeShape::Guid)).unwrap();
    let again = resolver.resolve(&TypeShape::Guid).unwrap();
    assert!(Arc::ptr_eq(&elem, &again));
}

#[test]
fn concurrent_first_use_yields_a_single_instance() {
    let resolver = Arc::new(resolver());
    let shape = TypeShape::map(
        TypeShape::String,
        TypeShape::seq(TypeShape::option(TypeShape::Int(IntWidth::I32))),
    );

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let resolver = resolver.clone();
            let shape = shape.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                resolver.resolve(&shape).unwrap()
            })
        })
        .collect();

    let picklers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for pickler in &picklers[1..] {
        assert!(Arc::ptr_eq(&picklers[0], pickler));
    }
}
