use crate::shape::{IntWidth, TypeShape};

/// The closed set of structural categories a shape can belong to.
///
/// Every `TypeShape` maps to exactly one category; `Other` is the
/// catch-all the resolver turns into an unsupported-type failure, and
/// `DateTime` is a distinguished rejected category with its own
/// diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeCategory {
    Bool,
    Int(IntWidth),
    Float32,
    Float64,
    Char,
    String,
    Guid,
    Bytes,
    Timespan,
    DateTimeOffset,
    DateTime,
    Enum,
    Option,
    Nullable,
    Seq,
    Set,
    Map,
    Tuple,
    Record,
    Union,
    Ref,
    Blob,
    Other,
}

/// Total classification: every shape belongs to exactly one category.
pub fn classify(shape: &TypeShape) -> ShapeCategory {
    match shape {
        TypeShape::Bool => ShapeCategory::Bool,
        TypeShape::Int(width) => ShapeCategory::Int(*width),
        TypeShape::Float32 => ShapeCategory::Float32,
        TypeShape::Float64 => ShapeCategory::Float64,
        TypeShape::Char => ShapeCategory::Char,
        TypeShape::String => ShapeCategory::String,
        TypeShape::Guid => ShapeCategory::Guid,
        TypeShape::Bytes => ShapeCategory::Bytes,
        TypeShape::Timespan => ShapeCategory::Timespan,
        TypeShape::DateTimeOffset => ShapeCategory::DateTimeOffset,
        TypeShape::DateTime => ShapeCategory::DateTime,
        TypeShape::Enum(_) => ShapeCategory::Enum,
        TypeShape::Option(_) => ShapeCategory::Option,
        TypeShape::Nullable(_) => ShapeCategory::Nullable,
        TypeShape::Seq(_) => ShapeCategory::Seq,
        TypeShape::Set(_) => ShapeCategory::Set,
        TypeShape::Map { .. } => ShapeCategory::Map,
        TypeShape::Tuple(_) => ShapeCategory::Tuple,
        TypeShape::Record(_) => ShapeCategory::Record,
        TypeShape::Union(_) => ShapeCategory::Union,
        TypeShape::Ref(_) => ShapeCategory::Ref,
        TypeShape::Blob => ShapeCategory::Blob,
        TypeShape::Other(_) => ShapeCategory::Other,
    }
}
