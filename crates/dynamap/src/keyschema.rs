use serde::{Deserialize, Serialize};

use crate::attr::AttrKind;
use crate::error::{DynamapError, ErrorKind};
use crate::resolve::Resolver;
use crate::shape::{ConstantKey, FieldShape, RecordShape};

/// The scalar attribute types allowed for hash and range keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    S,
    N,
    B,
}

impl KeyType {
    fn from_kind(kind: AttrKind) -> Option<KeyType> {
        match kind {
            AttrKind::S => Some(KeyType::S),
            AttrKind::N => Some(KeyType::N),
            AttrKind::B => Some(KeyType::B),
            AttrKind::Bool | AttrKind::Compound => None,
        }
    }
}

/// One hash or range key attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAttributeSchema {
    pub attribute_name: String,
    pub key_type: KeyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeySchema {
    pub hash_key: KeyAttributeSchema,
    pub range_key: Option<KeyAttributeSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSecondaryIndexSchema {
    pub index_name: String,
    pub hash_key: KeyAttributeSchema,
    pub range_key: Option<KeyAttributeSchema>,
}

/// A local index always shares the primary hash key and varies only the
/// range key, which is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSecondaryIndexSchema {
    pub index_name: String,
    pub hash_key: KeyAttributeSchema,
    pub range_key: KeyAttributeSchema,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeySchemas {
    pub(crate) primary: PrimaryKeySchema,
    pub(crate) global: Vec<GlobalSecondaryIndexSchema>,
    pub(crate) local: Vec<LocalSecondaryIndexSchema>,
}

/// The key schema entry for a marked field: the serialized attribute name
/// (custom name when declared) and the key type, honoring the
/// string-representation override.
fn field_entry(
    record: &RecordShape,
    field: &FieldShape,
    resolver: &Resolver,
) -> Result<KeyAttributeSchema, DynamapError> {
    let pickler = resolver
        .resolve(&field.shape)
        .map_err(|e| e.in_field(&field.name).in_type(&record.name))?;
    let natural = KeyType::from_kind(pickler.kind()).ok_or_else(|| {
        DynamapError::for_type(
            ErrorKind::NonScalarKey {
                attribute: field.attribute_name().to_string(),
                found: pickler.kind().type_name().to_string(),
            },
            &record.name,
        )
        .in_field(&field.name)
    })?;
    // The override only renames the reported type of an N or B key; it
    // never admits a non-scalar key.
    let key_type = if field.string_repr {
        KeyType::S
    } else {
        natural
    };
    Ok(KeyAttributeSchema {
        attribute_name: field.attribute_name().to_string(),
        key_type,
    })
}

fn constant_entry(
    record: &RecordShape,
    constant: &ConstantKey,
) -> Result<KeyAttributeSchema, DynamapError> {
    let key_type = KeyType::from_kind(constant.value.kind()).ok_or_else(|| {
        DynamapError::for_type(
            ErrorKind::NonScalarKey {
                attribute: constant.name.clone(),
                found: constant.value.kind().type_name().to_string(),
            },
            &record.name,
        )
    })?;
    Ok(KeyAttributeSchema {
        attribute_name: constant.name.clone(),
        key_type,
    })
}

/// Scan a record's field markers and produce its validated primary key and
/// secondary index schemas. Each rule is independently checked and yields
/// its own diagnostic.
pub(crate) fn extract_key_schema(
    record: &RecordShape,
    resolver: &Resolver,
) -> Result<KeySchemas, DynamapError> {
    let fail = |kind: ErrorKind| Err(DynamapError::for_type(kind, &record.name));

    // Exactly one hash key designation: one marked field or one constant.
    let hash_fields: Vec<&FieldShape> = record.fields.iter().filter(|f| f.hash_key).collect();
    let hash_key = match (&record.constant_hash_key, hash_fields.as_slice()) {
        (Some(_), [_, ..]) => return fail(ErrorKind::ConflictingHashKeys),
        (Some(constant), []) => constant_entry(record, constant)?,
        (None, []) => return fail(ErrorKind::MissingHashKey),
        (None, [field]) => field_entry(record, field, resolver)?,
        (None, many) => return fail(ErrorKind::MultipleHashKeys(many.len())),
    };

    // At most one range key designation.
    let range_fields: Vec<&FieldShape> = record.fields.iter().filter(|f| f.range_key).collect();
    let range_designations = range_fields.len() + record.constant_range_key.iter().count();
    if range_designations > 1 {
        return fail(ErrorKind::MultipleRangeKeys(range_designations));
    }
    let range_key = match (&record.constant_range_key, range_fields.as_slice()) {
        (Some(constant), _) => Some(constant_entry(record, constant)?),
        (None, [field]) => Some(field_entry(record, field, resolver)?),
        (None, _) => None,
    };

    let primary = PrimaryKeySchema {
        hash_key,
        range_key,
    };

    // Global secondary indices, in declaration order of their first marker.
    let mut index_names: Vec<&str> = Vec::new();
    for field in &record.fields {
        for name in field.gsi_hash.iter().chain(&field.gsi_range) {
            if !index_names.contains(&name.as_str()) {
                index_names.push(name);
            }
        }
    }

    let mut global = Vec::with_capacity(index_names.len());
    for index_name in index_names {
        let in_index = |e: DynamapError| e.in_index(index_name);

        let hash: Vec<&FieldShape> = record
            .fields
            .iter()
            .filter(|f| f.gsi_hash.iter().any(|n| n == index_name))
            .collect();
        let range: Vec<&FieldShape> = record
            .fields
            .iter()
            .filter(|f| f.gsi_range.iter().any(|n| n == index_name))
            .collect();

        let hash_key = match hash.as_slice() {
            [] => return fail(ErrorKind::RangeOnlyIndex).map_err(in_index),
            [field] => field_entry(record, field, resolver).map_err(in_index)?,
            many => {
                return fail(ErrorKind::DuplicateIndexHashKey(many.len())).map_err(in_index);
            }
        };
        let range_key = match range.as_slice() {
            [] => None,
            [field] => Some(field_entry(record, field, resolver).map_err(in_index)?),
            many => {
                return fail(ErrorKind::DuplicateIndexRangeKey(many.len())).map_err(in_index);
            }
        };

        global.push(GlobalSecondaryIndexSchema {
            index_name: index_name.to_string(),
            hash_key,
            range_key,
        });
    }

    // Local secondary indices share the primary hash key and require a
    // primary range key to exist.
    let mut local_names: Vec<&str> = Vec::new();
    for field in &record.fields {
        for name in &field.lsi_range {
            if !local_names.contains(&name.as_str()) {
                local_names.push(name);
            }
        }
    }

    let mut local = Vec::with_capacity(local_names.len());
    for index_name in local_names {
        let in_index = |e: DynamapError| e.in_index(index_name);

        if primary.range_key.is_none() {
            return fail(ErrorKind::LocalIndexWithoutPrimaryRange).map_err(in_index);
        }

        let range: Vec<&FieldShape> = record
            .fields
            .iter()
            .filter(|f| f.lsi_range.iter().any(|n| n == index_name))
            .collect();
        let range_key = match range.as_slice() {
            [field] => field_entry(record, field, resolver).map_err(in_index)?,
            many => {
                return fail(ErrorKind::DuplicateIndexRangeKey(many.len())).map_err(in_index);
            }
        };

        local.push(LocalSecondaryIndexSchema {
            index_name: index_name.to_string(),
            hash_key: primary.hash_key.clone(),
            range_key,
        });
    }

    Ok(KeySchemas {
        primary,
        global,
        local,
    })
}
