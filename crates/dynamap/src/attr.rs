use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An attribute map as produced/consumed by a record template.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// The generic tagged attribute-value representation every pickler targets.
///
/// Numbers are stored as canonical numeric strings. Set variants are never
/// empty: an empty set is represented by omitting the attribute from the
/// enclosing map, never by an empty `Ss`/`Ns`/`Bs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    B(Vec<u8>),
    Bool(bool),
    Null,
    Ss(Vec<String>),
    Ns(Vec<String>),
    Bs(Vec<Vec<u8>>),
    L(Vec<AttributeValue>),
    M(AttributeMap),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::B(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::L(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_m(&self) -> Option<&AttributeMap> {
        match self {
            AttributeValue::M(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// The kind tag for this value.
    pub fn kind(&self) -> AttrKind {
        match self {
            AttributeValue::S(_) => AttrKind::S,
            AttributeValue::N(_) => AttrKind::N,
            AttributeValue::B(_) => AttrKind::B,
            AttributeValue::Bool(_) => AttrKind::Bool,
            AttributeValue::Null
            | AttributeValue::Ss(_)
            | AttributeValue::Ns(_)
            | AttributeValue::Bs(_)
            | AttributeValue::L(_)
            | AttributeValue::M(_) => AttrKind::Compound,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::B(_) => "B",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null => "NULL",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
            AttributeValue::Bs(_) => "BS",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
        }
    }
}

/// The attribute type tag a pickler produces: one of the three scalar key
/// types, boolean, or compound for everything else (null, sets, list, map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrKind {
    S,
    N,
    B,
    Bool,
    Compound,
}

impl AttrKind {
    /// Whether this tag is allowed as a hash/range key attribute type.
    pub fn is_key_scalar(&self) -> bool {
        matches!(self, AttrKind::S | AttrKind::N | AttrKind::B)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttrKind::S => "S",
            AttrKind::N => "N",
            AttrKind::B => "B",
            AttrKind::Bool => "BOOL",
            AttrKind::Compound => "compound",
        }
    }
}
