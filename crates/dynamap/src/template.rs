use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::attr::{AttributeMap, AttributeValue};
use crate::error::{DynamapError, ErrorKind};
use crate::keyschema::{
    GlobalSecondaryIndexSchema, LocalSecondaryIndexSchema, PrimaryKeySchema, extract_key_schema,
};
use crate::pickle::Pickler;
use crate::resolve::Resolver;
use crate::shape::{RecordShape, ShapeRegistry, TypeShape};
use crate::value::Value;

/// The externally visible composition of a record's pickler and its
/// validated key schema. Constructed once per record shape, validated
/// eagerly, then cached and shared; immutable thereafter.
#[derive(Debug)]
pub struct RecordTemplate {
    shape: Arc<RecordShape>,
    pickler: Arc<dyn Pickler>,
    primary_key: PrimaryKeySchema,
    global_secondary_indices: Vec<GlobalSecondaryIndexSchema>,
    local_secondary_indices: Vec<LocalSecondaryIndexSchema>,
}

impl RecordTemplate {
    fn build(shape: Arc<RecordShape>, resolver: &Resolver) -> Result<Self, DynamapError> {
        let pickler = resolver.resolve(&TypeShape::Record(shape.clone()))?;
        let keys = extract_key_schema(&shape, resolver)?;
        Ok(Self {
            shape,
            pickler,
            primary_key: keys.primary,
            global_secondary_indices: keys.global,
            local_secondary_indices: keys.local,
        })
    }

    pub fn record_name(&self) -> &str {
        &self.shape.name
    }

    pub fn shape(&self) -> &Arc<RecordShape> {
        &self.shape
    }

    /// The resolved pickler, shared with the resolver's cache.
    pub fn pickler(&self) -> &Arc<dyn Pickler> {
        &self.pickler
    }

    pub fn primary_key(&self) -> &PrimaryKeySchema {
        &self.primary_key
    }

    pub fn global_secondary_indices(&self) -> &[GlobalSecondaryIndexSchema] {
        &self.global_secondary_indices
    }

    pub fn local_secondary_indices(&self) -> &[LocalSecondaryIndexSchema] {
        &self.local_secondary_indices
    }

    /// Convert a record value into an attribute map, omitting absent
    /// fields and injecting any constant key attributes.
    pub fn to_attribute_map(&self, value: &Value) -> Result<AttributeMap, DynamapError> {
        match self.pickler.pickle(value)? {
            Some(AttributeValue::M(mut map)) => {
                if let Some(constant) = &self.shape.constant_hash_key {
                    map.insert(constant.name.clone(), constant.value.clone());
                }
                if let Some(constant) = &self.shape.constant_range_key {
                    map.insert(constant.name.clone(), constant.value.clone());
                }
                Ok(map)
            }
            _ => Err(DynamapError::for_type(
                ErrorKind::InvalidValue {
                    value: value.type_name().to_string(),
                    message: "record did not pickle to a map".to_string(),
                },
                &self.shape.name,
            )),
        }
    }

    /// Convert an attribute map back into a record value, failing if a
    /// required attribute is missing or mistyped. Attributes not declared
    /// by the record (including constant keys) are ignored.
    pub fn from_attribute_map(&self, map: &AttributeMap) -> Result<Value, DynamapError> {
        self.pickler.unpickle(&AttributeValue::M(map.clone()))
    }
}

#[derive(Default)]
struct TemplateSlot {
    built: OnceLock<Arc<RecordTemplate>>,
    building: Mutex<()>,
}

/// Singleton-per-type template cache over a shared [`Resolver`].
///
/// Mirrors the resolver's at-most-once guarantee: concurrent first
/// requests for the same record shape observe one shared template.
pub struct TemplateStore {
    resolver: Resolver,
    templates: RwLock<HashMap<Arc<RecordShape>, Arc<TemplateSlot>>>,
}

impl TemplateStore {
    pub fn new(registry: ShapeRegistry) -> Self {
        Self {
            resolver: Resolver::new(registry),
            templates: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve (or reuse) the template for a record shape. Fails with a
    /// schema or type error, never partially succeeds; failures are not
    /// cached.
    pub fn resolve_template(
        &self,
        shape: &Arc<RecordShape>,
    ) -> Result<Arc<RecordTemplate>, DynamapError> {
        if let Some(slot) = self.templates.read().get(shape).cloned() {
            if let Some(template) = slot.built.get() {
                return Ok(template.clone());
            }
        }

        let slot = self
            .templates
            .write()
            .entry(shape.clone())
            .or_default()
            .clone();

        let _guard = slot.building.lock();
        if let Some(template) = slot.built.get() {
            return Ok(template.clone());
        }

        let template = Arc::new(RecordTemplate::build(shape.clone(), &self.resolver)?);
        let _ = slot.built.set(template.clone());
        debug!(record = %shape.name, "constructed record template");
        Ok(template)
    }

    /// Resolve the template for a record registered by name.
    pub fn template(&self, name: &str) -> Result<Arc<RecordTemplate>, DynamapError> {
        let mut visited = vec![name.to_string()];
        let mut shape = self
            .resolver
            .registry()
            .get(name)
            .cloned()
            .ok_or_else(|| DynamapError::new(ErrorKind::UnknownDefinition(name.to_string())))?;
        while let TypeShape::Ref(next) = shape {
            if visited.iter().any(|seen| *seen == next) {
                return Err(DynamapError::new(ErrorKind::RecursiveType(format!(
                    "ref '{next}'"
                ))));
            }
            shape = self
                .resolver
                .registry()
                .get(&next)
                .cloned()
                .ok_or_else(|| DynamapError::new(ErrorKind::UnknownDefinition(next.clone())))?;
            visited.push(next);
        }
        match shape {
            TypeShape::Record(record) => self.resolve_template(&record),
            other => Err(DynamapError::for_type(
                ErrorKind::UnsupportedType(format!(
                    "definition '{name}' is {}, not a record",
                    other.describe()
                )),
                name,
            )),
        }
    }
}
