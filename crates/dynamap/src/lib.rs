//! Type-shape-driven attribute-value codec and key-schema derivation.
//!
//! Given a [`TypeShape`] descriptor, the [`Resolver`] derives a reusable
//! [`Pickler`] between dynamic [`Value`]s of that shape and the generic
//! tagged [`AttributeValue`] representation, memoizing per shape and
//! rejecting self-referential shapes. For record shapes, a
//! [`TemplateStore`] additionally derives a validated key schema (primary
//! hash/range keys plus secondary indices) from the declarative per-field
//! markers and exposes both as a cached [`RecordTemplate`].

pub mod attr;
pub mod classify;
pub mod error;
pub mod keyschema;
pub mod pickle;
pub mod resolve;
pub mod shape;
pub mod template;
pub mod value;

pub use attr::{AttrKind, AttributeMap, AttributeValue};
pub use classify::{ShapeCategory, classify};
pub use error::{DynamapError, ErrorClass, ErrorKind};
pub use keyschema::{
    GlobalSecondaryIndexSchema, KeyAttributeSchema, KeyType, LocalSecondaryIndexSchema,
    PrimaryKeySchema,
};
pub use pickle::{Pickler, UNION_CASE_ATTR};
pub use resolve::Resolver;
pub use shape::{
    CaseShape, ConstantKey, EnumShape, FieldShape, IntWidth, RecordShape, ShapeRegistry, TypeShape,
    UnionShape,
};
pub use template::{RecordTemplate, TemplateStore};
pub use value::Value;
