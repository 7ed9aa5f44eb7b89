use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta};
use uuid::Uuid;

use crate::attr::{AttrKind, AttributeValue};
use crate::error::{DynamapError, ErrorKind};
use crate::shape::{EnumShape, IntWidth, RecordShape, UnionShape};
use crate::value::Value;

/// Attribute name carrying the active case of a pickled union.
pub const UNION_CASE_ATTR: &str = "__case";

/// A per-type bidirectional converter between [`Value`] and
/// [`AttributeValue`]. Immutable once constructed and shared read-only
/// across all callers.
///
/// `pickle` returns `None` when the value is semantically absent, which the
/// enclosing map encodes by omitting the attribute. `on_missing` is the
/// inverse: the value a missing attribute decodes to, if absence is
/// representable for this type.
pub trait Pickler: Send + Sync {
    /// The attribute type tag this pickler produces.
    fn kind(&self) -> AttrKind;

    /// The attribute variant name expected on unpickle, for diagnostics.
    fn expected(&self) -> &'static str;

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError>;

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError>;

    fn on_missing(&self) -> Option<Value> {
        None
    }
}

impl fmt::Debug for dyn Pickler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pickler")
            .field("kind", &self.kind())
            .finish()
    }
}

fn unexpected_value(expected: &'static str, value: &Value) -> DynamapError {
    DynamapError::new(ErrorKind::InvalidValue {
        value: value.type_name().to_string(),
        message: format!("expected {expected} value"),
    })
}

fn mismatch(expected: &'static str, attr: &AttributeValue) -> DynamapError {
    DynamapError::new(ErrorKind::AttributeTypeMismatch {
        expected,
        actual: attr.type_name().to_string(),
    })
}

/// Encode a single element inside a list/tuple, where absence is in-band
/// as the `Null` variant rather than by omission.
fn pickle_element(pickler: &dyn Pickler, value: &Value) -> Result<AttributeValue, DynamapError> {
    Ok(pickler.pickle(value)?.unwrap_or(AttributeValue::Null))
}

fn duplicate_set_element(value: String) -> DynamapError {
    DynamapError::new(ErrorKind::InvalidValue {
        value,
        message: "duplicate set element".to_string(),
    })
}

// ---------------------------------------------------------------------------
// leaf picklers
// ---------------------------------------------------------------------------

pub struct BoolPickler;

impl Pickler for BoolPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Bool
    }

    fn expected(&self) -> &'static str {
        "BOOL"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Bool(b) => Ok(Some(AttributeValue::Bool(*b))),
            other => Err(unexpected_value("bool", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(mismatch("BOOL", other)),
        }
    }
}

pub struct IntPickler {
    width: IntWidth,
}

impl IntPickler {
    pub fn new(width: IntWidth) -> Self {
        Self { width }
    }

    fn check_range(&self, value: i128) -> Result<(), DynamapError> {
        if self.width.contains(value) {
            Ok(())
        } else {
            Err(DynamapError::new(ErrorKind::OutOfRange {
                value: value.to_string(),
                target_type: self.width.type_name(),
            }))
        }
    }
}

impl Pickler for IntPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::N
    }

    fn expected(&self) -> &'static str {
        "N"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Int(n) => {
                self.check_range(*n)?;
                Ok(Some(AttributeValue::N(n.to_string())))
            }
            other => Err(unexpected_value("int", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::N(text) => {
                let parsed = text.parse::<i128>().map_err(|_| {
                    DynamapError::new(ErrorKind::InvalidValue {
                        value: text.clone(),
                        message: "not a valid integer".to_string(),
                    })
                })?;
                self.check_range(parsed)?;
                Ok(Value::Int(parsed))
            }
            other => Err(mismatch("N", other)),
        }
    }
}

pub struct FloatPickler {
    single: bool,
}

impl FloatPickler {
    pub fn f32() -> Self {
        Self { single: true }
    }

    pub fn f64() -> Self {
        Self { single: false }
    }
}

impl Pickler for FloatPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::N
    }

    fn expected(&self) -> &'static str {
        "N"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Float(v) => {
                // Display is the shortest representation that parses back
                // to the same float.
                let text = if self.single {
                    format!("{}", *v as f32)
                } else {
                    format!("{v}")
                };
                Ok(Some(AttributeValue::N(text)))
            }
            other => Err(unexpected_value("float", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::N(text) => {
                let invalid = || {
                    DynamapError::new(ErrorKind::InvalidValue {
                        value: text.clone(),
                        message: "not a valid number".to_string(),
                    })
                };
                let parsed = if self.single {
                    text.parse::<f32>().map_err(|_| invalid())? as f64
                } else {
                    text.parse::<f64>().map_err(|_| invalid())?
                };
                Ok(Value::Float(parsed))
            }
            other => Err(mismatch("N", other)),
        }
    }
}

pub struct CharPickler;

impl Pickler for CharPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::S
    }

    fn expected(&self) -> &'static str {
        "S"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Char(c) => Ok(Some(AttributeValue::S(c.to_string()))),
            other => Err(unexpected_value("char", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::S(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(DynamapError::new(ErrorKind::InvalidValue {
                        value: text.clone(),
                        message: "expected a single character".to_string(),
                    })),
                }
            }
            other => Err(mismatch("S", other)),
        }
    }
}

pub struct StringPickler;

impl Pickler for StringPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::S
    }

    fn expected(&self) -> &'static str {
        "S"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::String(s) => Ok(Some(AttributeValue::S(s.clone()))),
            other => Err(unexpected_value("string", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::S(s) => Ok(Value::String(s.clone())),
            other => Err(mismatch("S", other)),
        }
    }
}

pub struct GuidPickler;

impl Pickler for GuidPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::S
    }

    fn expected(&self) -> &'static str {
        "S"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Guid(g) => Ok(Some(AttributeValue::S(g.hyphenated().to_string()))),
            other => Err(unexpected_value("guid", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::S(text) => Uuid::parse_str(text).map(Value::Guid).map_err(|_| {
                DynamapError::new(ErrorKind::InvalidValue {
                    value: text.clone(),
                    message: "not a valid guid".to_string(),
                })
            }),
            other => Err(mismatch("S", other)),
        }
    }
}

pub struct BytesPickler;

impl Pickler for BytesPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::B
    }

    fn expected(&self) -> &'static str {
        "B"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Bytes(b) => Ok(Some(AttributeValue::B(b.clone()))),
            other => Err(unexpected_value("bytes", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::B(b) => Ok(Value::Bytes(b.clone())),
            other => Err(mismatch("B", other)),
        }
    }
}

/// Durations serialize as total nanoseconds in decimal, which round-trips
/// exactly and sorts numerically.
pub struct TimespanPickler;

impl Pickler for TimespanPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::S
    }

    fn expected(&self) -> &'static str {
        "S"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Duration(d) => {
                let nanos = d.num_nanoseconds().ok_or_else(|| {
                    DynamapError::new(ErrorKind::InvalidValue {
                        value: d.to_string(),
                        message: "duration overflows the nanosecond range".to_string(),
                    })
                })?;
                Ok(Some(AttributeValue::S(nanos.to_string())))
            }
            other => Err(unexpected_value("duration", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::S(text) => {
                let nanos = text.parse::<i64>().map_err(|_| {
                    DynamapError::new(ErrorKind::InvalidValue {
                        value: text.clone(),
                        message: "not a valid duration".to_string(),
                    })
                })?;
                Ok(Value::Duration(TimeDelta::nanoseconds(nanos)))
            }
            other => Err(mismatch("S", other)),
        }
    }
}

/// Offset-aware timestamps serialize as RFC 3339 strings, preserving the
/// original offset.
pub struct TimestampPickler;

impl Pickler for TimestampPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::S
    }

    fn expected(&self) -> &'static str {
        "S"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Timestamp(ts) => Ok(Some(AttributeValue::S(ts.to_rfc3339()))),
            other => Err(unexpected_value("timestamp", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::S(text) => DateTime::parse_from_rfc3339(text)
                .map(Value::Timestamp)
                .map_err(|_| {
                    DynamapError::new(ErrorKind::InvalidValue {
                        value: text.clone(),
                        message: "not a valid RFC 3339 timestamp".to_string(),
                    })
                }),
            other => Err(mismatch("S", other)),
        }
    }
}

/// Enums delegate to their declared underlying integer width; unknown
/// discriminants are rejected in both directions.
pub struct EnumPickler {
    shape: Arc<EnumShape>,
    underlying: IntPickler,
}

impl EnumPickler {
    pub fn new(shape: Arc<EnumShape>) -> Self {
        let underlying = IntPickler::new(shape.underlying);
        Self { shape, underlying }
    }

    fn check_variant(&self, discriminant: i128) -> Result<(), DynamapError> {
        if self.shape.variant_for(discriminant).is_some() {
            Ok(())
        } else {
            Err(
                DynamapError::new(ErrorKind::UnknownEnumVariant(discriminant))
                    .in_type(&self.shape.name),
            )
        }
    }
}

impl Pickler for EnumPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::N
    }

    fn expected(&self) -> &'static str {
        "N"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Int(n) => {
                self.check_variant(*n)?;
                self.underlying.pickle(value)
            }
            other => Err(unexpected_value("enum discriminant", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        let value = self.underlying.unpickle(attr)?;
        if let Value::Int(n) = value {
            self.check_variant(n)?;
        }
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// composite picklers
// ---------------------------------------------------------------------------

/// Option/nullable wrapper: absence maps to omission from the enclosing
/// map (never to `Null` there) and a missing attribute reads back as
/// absence, never as an error.
pub struct OptionPickler {
    inner: Arc<dyn Pickler>,
}

impl OptionPickler {
    pub fn new(inner: Arc<dyn Pickler>) -> Self {
        Self { inner }
    }
}

impl Pickler for OptionPickler {
    fn kind(&self) -> AttrKind {
        self.inner.kind()
    }

    fn expected(&self) -> &'static str {
        self.inner.expected()
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Nothing => Ok(None),
            present => self.inner.pickle(present),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::Null => Ok(Value::Nothing),
            present => self.inner.unpickle(present),
        }
    }

    fn on_missing(&self) -> Option<Value> {
        Some(Value::Nothing)
    }
}

pub struct SeqPickler {
    elem: Arc<dyn Pickler>,
}

impl SeqPickler {
    pub fn new(elem: Arc<dyn Pickler>) -> Self {
        Self { elem }
    }
}

impl Pickler for SeqPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Compound
    }

    fn expected(&self) -> &'static str {
        "L"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(pickle_element(self.elem.as_ref(), item)?);
                }
                Ok(Some(AttributeValue::L(out)))
            }
            other => Err(unexpected_value("seq", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::L(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.elem.unpickle(item)?);
                }
                Ok(Value::Seq(out))
            }
            other => Err(mismatch("L", other)),
        }
    }
}

/// Sets serialize to the native SS/NS/BS variant matching the element
/// tag. Resolution rejects non-scalar elements before this is built, and
/// duplicate elements are a conversion error.
///
/// Set variants are never empty: an empty set pickles to `None` (attribute
/// omitted, or in-band `Null` inside lists and map entries) and both a
/// missing attribute and `Null` read back as the empty set.
pub struct SetPickler {
    elem: Arc<dyn Pickler>,
    elem_kind: AttrKind,
}

impl SetPickler {
    pub fn new(elem: Arc<dyn Pickler>) -> Self {
        let elem_kind = elem.kind();
        Self { elem, elem_kind }
    }
}

impl Pickler for SetPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Compound
    }

    fn expected(&self) -> &'static str {
        match self.elem_kind {
            AttrKind::S => "SS",
            AttrKind::N => "NS",
            _ => "BS",
        }
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        let items = match value {
            Value::Set(items) => items,
            other => return Err(unexpected_value("set", other)),
        };
        if items.is_empty() {
            return Ok(None);
        }

        match self.elem_kind {
            AttrKind::S => {
                let mut seen = BTreeSet::new();
                let mut out: Vec<String> = Vec::with_capacity(items.len());
                for item in items {
                    match self.elem.pickle(item)? {
                        Some(AttributeValue::S(s)) => {
                            if !seen.insert(s.clone()) {
                                return Err(duplicate_set_element(s));
                            }
                            out.push(s);
                        }
                        _ => return Err(unexpected_value("scalar set element", item)),
                    }
                }
                Ok(Some(AttributeValue::Ss(out)))
            }
            AttrKind::N => {
                let mut seen = BTreeSet::new();
                let mut out: Vec<String> = Vec::with_capacity(items.len());
                for item in items {
                    match self.elem.pickle(item)? {
                        Some(AttributeValue::N(n)) => {
                            if !seen.insert(n.clone()) {
                                return Err(duplicate_set_element(n));
                            }
                            out.push(n);
                        }
                        _ => return Err(unexpected_value("scalar set element", item)),
                    }
                }
                Ok(Some(AttributeValue::Ns(out)))
            }
            _ => {
                let mut seen = BTreeSet::new();
                let mut out: Vec<Vec<u8>> = Vec::with_capacity(items.len());
                for item in items {
                    match self.elem.pickle(item)? {
                        Some(AttributeValue::B(b)) => {
                            if !seen.insert(b.clone()) {
                                return Err(duplicate_set_element(format!("{b:?}")));
                            }
                            out.push(b);
                        }
                        _ => return Err(unexpected_value("scalar set element", item)),
                    }
                }
                Ok(Some(AttributeValue::Bs(out)))
            }
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        let decode = |items: Vec<AttributeValue>| -> Result<Value, DynamapError> {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                out.push(self.elem.unpickle(item)?);
            }
            Ok(Value::Set(out))
        };

        match (self.elem_kind, attr) {
            (AttrKind::S, AttributeValue::Ss(items)) => {
                decode(items.iter().cloned().map(AttributeValue::S).collect())
            }
            (AttrKind::N, AttributeValue::Ns(items)) => {
                decode(items.iter().cloned().map(AttributeValue::N).collect())
            }
            (AttrKind::B, AttributeValue::Bs(items)) => {
                decode(items.iter().cloned().map(AttributeValue::B).collect())
            }
            (_, AttributeValue::Null) => Ok(Value::Set(Vec::new())),
            (_, other) => Err(mismatch(self.expected(), other)),
        }
    }

    fn on_missing(&self) -> Option<Value> {
        Some(Value::Set(Vec::new()))
    }
}

/// Maps with string keys serialize as `M`. Absent entry values are
/// encoded in-band as `Null` so no key is lost on round trip.
pub struct MapPickler {
    value: Arc<dyn Pickler>,
}

impl MapPickler {
    pub fn new(value: Arc<dyn Pickler>) -> Self {
        Self { value }
    }
}

impl Pickler for MapPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Compound
    }

    fn expected(&self) -> &'static str {
        "M"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Map(entries) => {
                let mut out = crate::attr::AttributeMap::new();
                for (key, entry) in entries {
                    out.insert(key.clone(), pickle_element(self.value.as_ref(), entry)?);
                }
                Ok(Some(AttributeValue::M(out)))
            }
            other => Err(unexpected_value("map", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::M(entries) => {
                let mut out = std::collections::BTreeMap::new();
                for (key, entry) in entries {
                    out.insert(key.clone(), self.value.unpickle(entry)?);
                }
                Ok(Value::Map(out))
            }
            other => Err(mismatch("M", other)),
        }
    }
}

/// Tuples serialize as a fixed-arity `L`; position order is semantically
/// significant and round-trips exactly.
pub struct TuplePickler {
    slots: Vec<Arc<dyn Pickler>>,
}

impl TuplePickler {
    pub fn new(slots: Vec<Arc<dyn Pickler>>) -> Self {
        Self { slots }
    }

    fn check_arity(&self, found: usize) -> Result<(), DynamapError> {
        if found == self.slots.len() {
            Ok(())
        } else {
            Err(DynamapError::new(ErrorKind::InvalidValue {
                value: found.to_string(),
                message: format!("expected a tuple of arity {}", self.slots.len()),
            }))
        }
    }
}

impl Pickler for TuplePickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Compound
    }

    fn expected(&self) -> &'static str {
        "L"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        match value {
            Value::Tuple(items) => {
                self.check_arity(items.len())?;
                let mut out = Vec::with_capacity(items.len());
                for (slot, item) in self.slots.iter().zip(items) {
                    out.push(pickle_element(slot.as_ref(), item)?);
                }
                Ok(Some(AttributeValue::L(out)))
            }
            other => Err(unexpected_value("tuple", other)),
        }
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        match attr {
            AttributeValue::L(items) => {
                self.check_arity(items.len())?;
                let mut out = Vec::with_capacity(items.len());
                for (slot, item) in self.slots.iter().zip(items) {
                    out.push(slot.unpickle(item)?);
                }
                Ok(Value::Tuple(out))
            }
            other => Err(mismatch("L", other)),
        }
    }
}

pub(crate) struct FieldPickler {
    pub(crate) field_name: String,
    pub(crate) attr_name: String,
    pub(crate) pickler: Arc<dyn Pickler>,
}

/// Records serialize as `M` keyed by attribute names (custom names when
/// declared). Fields whose value is absent are omitted; on unpickle a
/// missing attribute is an error unless the field's pickler represents
/// absence.
pub struct RecordPickler {
    shape: Arc<RecordShape>,
    fields: Vec<FieldPickler>,
}

impl RecordPickler {
    pub(crate) fn new(shape: Arc<RecordShape>, fields: Vec<FieldPickler>) -> Self {
        Self { shape, fields }
    }

    pub fn record_name(&self) -> &str {
        &self.shape.name
    }
}

impl Pickler for RecordPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Compound
    }

    fn expected(&self) -> &'static str {
        "M"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        let entries = match value {
            Value::Record(entries) => entries,
            other => return Err(unexpected_value("record", other).in_type(&self.shape.name)),
        };

        let mut out = crate::attr::AttributeMap::new();
        for field in &self.fields {
            let field_value = entries.get(&field.field_name).unwrap_or(&Value::Nothing);
            let encoded = field
                .pickler
                .pickle(field_value)
                .map_err(|e| e.in_field(&field.field_name).in_type(&self.shape.name))?;
            if let Some(attr) = encoded {
                out.insert(field.attr_name.clone(), attr);
            }
        }
        Ok(Some(AttributeValue::M(out)))
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        let map = match attr {
            AttributeValue::M(map) => map,
            other => return Err(mismatch("M", other).in_type(&self.shape.name)),
        };

        let mut out = std::collections::BTreeMap::new();
        for field in &self.fields {
            let value = match map.get(&field.attr_name) {
                Some(attr) => field
                    .pickler
                    .unpickle(attr)
                    .map_err(|e| e.in_field(&field.field_name).in_type(&self.shape.name))?,
                None => field.pickler.on_missing().ok_or_else(|| {
                    DynamapError::new(ErrorKind::MissingAttribute(field.attr_name.clone()))
                        .in_field(&field.field_name)
                        .in_type(&self.shape.name)
                })?,
            };
            out.insert(field.field_name.clone(), value);
        }
        Ok(Value::Record(out))
    }
}

/// Unions serialize as `M` with a discriminant attribute plus one
/// attribute per positional payload field (`"0"`, `"1"`, ...).
pub struct UnionPickler {
    shape: Arc<UnionShape>,
    cases: Vec<Vec<Arc<dyn Pickler>>>,
}

impl UnionPickler {
    pub(crate) fn new(shape: Arc<UnionShape>, cases: Vec<Vec<Arc<dyn Pickler>>>) -> Self {
        Self { shape, cases }
    }

    fn case_index(&self, name: &str) -> Result<usize, DynamapError> {
        self.shape
            .cases
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| {
                DynamapError::new(ErrorKind::UnknownUnionCase(name.to_string()))
                    .in_type(&self.shape.name)
            })
    }
}

impl Pickler for UnionPickler {
    fn kind(&self) -> AttrKind {
        AttrKind::Compound
    }

    fn expected(&self) -> &'static str {
        "M"
    }

    fn pickle(&self, value: &Value) -> Result<Option<AttributeValue>, DynamapError> {
        let (name, args) = match value {
            Value::Case { name, args } => (name, args),
            other => return Err(unexpected_value("union case", other).in_type(&self.shape.name)),
        };

        let index = self.case_index(name)?;
        let slots = &self.cases[index];
        if args.len() != slots.len() {
            return Err(DynamapError::for_type(
                ErrorKind::InvalidValue {
                    value: args.len().to_string(),
                    message: format!("case '{name}' expects {} arguments", slots.len()),
                },
                &self.shape.name,
            ));
        }

        let mut out = crate::attr::AttributeMap::new();
        out.insert(
            UNION_CASE_ATTR.to_string(),
            AttributeValue::S(name.clone()),
        );
        for (position, (slot, arg)) in slots.iter().zip(args).enumerate() {
            out.insert(
                position.to_string(),
                pickle_element(slot.as_ref(), arg)
                    .map_err(|e| e.in_type(&self.shape.name))?,
            );
        }
        Ok(Some(AttributeValue::M(out)))
    }

    fn unpickle(&self, attr: &AttributeValue) -> Result<Value, DynamapError> {
        let map = match attr {
            AttributeValue::M(map) => map,
            other => return Err(mismatch("M", other).in_type(&self.shape.name)),
        };

        let case_attr = map.get(UNION_CASE_ATTR).ok_or_else(|| {
            DynamapError::for_type(
                ErrorKind::MissingAttribute(UNION_CASE_ATTR.to_string()),
                &self.shape.name,
            )
        })?;
        let discriminant = case_attr
            .as_s()
            .ok_or_else(|| mismatch("S", case_attr).in_type(&self.shape.name))?;

        let index = self.case_index(discriminant)?;
        let slots = &self.cases[index];

        let mut args = Vec::with_capacity(slots.len());
        for (position, slot) in slots.iter().enumerate() {
            let value = match map.get(&position.to_string()) {
                Some(attr) => slot
                    .unpickle(attr)
                    .map_err(|e| e.in_type(&self.shape.name))?,
                None => slot.on_missing().ok_or_else(|| {
                    DynamapError::for_type(
                        ErrorKind::MissingAttribute(position.to_string()),
                        &self.shape.name,
                    )
                })?,
            };
            args.push(value);
        }

        Ok(Value::Case {
            name: discriminant.to_string(),
            args,
        })
    }
}
