use std::collections::HashMap;
use std::sync::Arc;

use crate::attr::AttributeValue;
use crate::error::{DynamapError, ErrorKind};

/// Structural type descriptor. This is the identity the resolver memoizes
/// on, so the whole tree is `Hash + Eq`.
///
/// `Ref` is a by-name reference into a [`ShapeRegistry`] and is the only
/// way to express a (directly or indirectly) self-referential type, which
/// the resolver rejects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
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
    /// Naive local date/time. Distinguished so resolution can point the
    /// caller at `DateTimeOffset` instead of a generic failure.
    DateTime,
    Enum(Arc<EnumShape>),
    Option(Box<TypeShape>),
    Nullable(Box<TypeShape>),
    Seq(Box<TypeShape>),
    Set(Box<TypeShape>),
    Map {
        key: Box<TypeShape>,
        value: Box<TypeShape>,
    },
    Tuple(Vec<TypeShape>),
    Record(Arc<RecordShape>),
    Union(Arc<UnionShape>),
    Ref(String),
    /// Opaque binary blob: bypasses classification and pickles as `B`.
    Blob,
    /// Catch-all for shapes outside the supported set; always rejected.
    Other(String),
}

impl TypeShape {
    pub fn option(inner: TypeShape) -> Self {
        TypeShape::Option(Box::new(inner))
    }

    pub fn nullable(inner: TypeShape) -> Self {
        TypeShape::Nullable(Box::new(inner))
    }

    pub fn seq(elem: TypeShape) -> Self {
        TypeShape::Seq(Box::new(elem))
    }

    pub fn set(elem: TypeShape) -> Self {
        TypeShape::Set(Box::new(elem))
    }

    pub fn map(key: TypeShape, value: TypeShape) -> Self {
        TypeShape::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn reference(name: impl Into<String>) -> Self {
        TypeShape::Ref(name.into())
    }

    /// A short human-readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TypeShape::Bool => "bool".into(),
            TypeShape::Int(width) => width.type_name().into(),
            TypeShape::Float32 => "f32".into(),
            TypeShape::Float64 => "f64".into(),
            TypeShape::Char => "char".into(),
            TypeShape::String => "string".into(),
            TypeShape::Guid => "guid".into(),
            TypeShape::Bytes => "bytes".into(),
            TypeShape::Timespan => "timespan".into(),
            TypeShape::DateTimeOffset => "datetime-offset".into(),
            TypeShape::DateTime => "datetime".into(),
            TypeShape::Enum(shape) => format!("enum '{}'", shape.name),
            TypeShape::Option(inner) => format!("option<{}>", inner.describe()),
            TypeShape::Nullable(inner) => format!("nullable<{}>", inner.describe()),
            TypeShape::Seq(elem) => format!("seq<{}>", elem.describe()),
            TypeShape::Set(elem) => format!("set<{}>", elem.describe()),
            TypeShape::Map { key, value } => {
                format!("map<{}, {}>", key.describe(), value.describe())
            }
            TypeShape::Tuple(slots) => format!("tuple of arity {}", slots.len()),
            TypeShape::Record(shape) => format!("record '{}'", shape.name),
            TypeShape::Union(shape) => format!("union '{}'", shape.name),
            TypeShape::Ref(name) => format!("ref '{name}'"),
            TypeShape::Blob => "blob".into(),
            TypeShape::Other(name) => format!("'{name}'"),
        }
    }
}

/// The supported integer widths. Enums declare one of these as their
/// underlying representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntWidth {
    pub fn type_name(&self) -> &'static str {
        match self {
            IntWidth::I8 => "i8",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
            IntWidth::I64 => "i64",
            IntWidth::U8 => "u8",
            IntWidth::U16 => "u16",
            IntWidth::U32 => "u32",
            IntWidth::U64 => "u64",
        }
    }

    pub fn contains(&self, value: i128) -> bool {
        match self {
            IntWidth::I8 => i8::try_from(value).is_ok(),
            IntWidth::I16 => i16::try_from(value).is_ok(),
            IntWidth::I32 => i32::try_from(value).is_ok(),
            IntWidth::I64 => i64::try_from(value).is_ok(),
            IntWidth::U8 => u8::try_from(value).is_ok(),
            IntWidth::U16 => u16::try_from(value).is_ok(),
            IntWidth::U32 => u32::try_from(value).is_ok(),
            IntWidth::U64 => u64::try_from(value).is_ok(),
        }
    }
}

/// An enum type: named variants over a declared underlying integer width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumShape {
    pub name: String,
    pub underlying: IntWidth,
    pub variants: Vec<(String, i128)>,
}

impl EnumShape {
    pub fn new(
        name: impl Into<String>,
        underlying: IntWidth,
        variants: Vec<(String, i128)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            underlying,
            variants,
        })
    }

    pub fn variant_for(&self, discriminant: i128) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, d)| *d == discriminant)
            .map(|(n, _)| n.as_str())
    }
}

/// A record (product) type: named fields in declaration order, plus the
/// optional type-level constant key markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordShape {
    pub name: String,
    pub fields: Vec<FieldShape>,
    pub constant_hash_key: Option<ConstantKey>,
    pub constant_range_key: Option<ConstantKey>,
}

impl RecordShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            constant_hash_key: None,
            constant_range_key: None,
        }
    }

    pub fn with_field(mut self, field: FieldShape) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a fixed hash key not backed by any field.
    pub fn with_constant_hash_key(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.constant_hash_key = Some(ConstantKey {
            name: name.into(),
            value,
        });
        self
    }

    /// Declare a fixed range key not backed by any field.
    pub fn with_constant_range_key(
        mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Self {
        self.constant_range_key = Some(ConstantKey {
            name: name.into(),
            value,
        });
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A key component whose value is fixed at the schema level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstantKey {
    pub name: String,
    pub value: AttributeValue,
}

/// One record field: its shape plus the declarative key/index markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldShape {
    pub name: String,
    pub shape: TypeShape,
    pub attr_name: Option<String>,
    pub hash_key: bool,
    pub range_key: bool,
    pub string_repr: bool,
    pub gsi_hash: Vec<String>,
    pub gsi_range: Vec<String>,
    pub lsi_range: Vec<String>,
}

impl FieldShape {
    pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            shape,
            attr_name: None,
            hash_key: false,
            range_key: false,
            string_repr: false,
            gsi_hash: Vec::new(),
            gsi_range: Vec::new(),
            lsi_range: Vec::new(),
        }
    }

    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self
    }

    pub fn range_key(mut self) -> Self {
        self.range_key = true;
        self
    }

    /// Use a custom serialized attribute name instead of the field name.
    pub fn renamed(mut self, attr_name: impl Into<String>) -> Self {
        self.attr_name = Some(attr_name.into());
        self
    }

    /// Report this field's key schema entry as `S` regardless of its
    /// natural N/B resolution. Affects schema reporting only.
    pub fn string_repr(mut self) -> Self {
        self.string_repr = true;
        self
    }

    pub fn global_index_hash(mut self, index_name: impl Into<String>) -> Self {
        self.gsi_hash.push(index_name.into());
        self
    }

    pub fn global_index_range(mut self, index_name: impl Into<String>) -> Self {
        self.gsi_range.push(index_name.into());
        self
    }

    pub fn local_index_range(mut self, index_name: impl Into<String>) -> Self {
        self.lsi_range.push(index_name.into());
        self
    }

    /// The serialized attribute name: the custom name when present,
    /// otherwise the declared field name.
    pub fn attribute_name(&self) -> &str {
        self.attr_name.as_deref().unwrap_or(&self.name)
    }
}

/// A union (sum) type: named cases, each with positional payload shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionShape {
    pub name: String,
    pub cases: Vec<CaseShape>,
}

impl UnionShape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn with_case(mut self, name: impl Into<String>, fields: Vec<TypeShape>) -> Self {
        self.cases.push(CaseShape {
            name: name.into(),
            fields,
        });
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn case(&self, name: &str) -> Option<&CaseShape> {
        self.cases.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CaseShape {
    pub name: String,
    pub fields: Vec<TypeShape>,
}

/// A registry of named shape definitions, the target of [`TypeShape::Ref`].
#[derive(Debug, Default, Clone)]
pub struct ShapeRegistry {
    definitions: HashMap<String, TypeShape>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Duplicate names are rejected so a reference
    /// always has a single unambiguous meaning.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        shape: TypeShape,
    ) -> Result<(), DynamapError> {
        let name = name.into();
        if self.definitions.contains_key(&name) {
            return Err(DynamapError::new(ErrorKind::DuplicateDefinition(name)));
        }
        self.definitions.insert(name, shape);
        Ok(())
    }

    /// Register a record and return a `Ref` shape pointing at it.
    pub fn define_record(&mut self, record: Arc<RecordShape>) -> Result<TypeShape, DynamapError> {
        let name = record.name.clone();
        self.define(name.clone(), TypeShape::Record(record))?;
        Ok(TypeShape::Ref(name))
    }

    pub fn get(&self, name: &str) -> Option<&TypeShape> {
        self.definitions.get(name)
    }
}
