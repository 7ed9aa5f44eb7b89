use std::collections::HashMap;
use std::sync::Arc;
use std::sync::OnceLock;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::classify::{ShapeCategory, classify};
use crate::error::{DynamapError, ErrorKind};
use crate::pickle::{
    BoolPickler, BytesPickler, CharPickler, EnumPickler, FieldPickler, FloatPickler, GuidPickler,
    IntPickler, MapPickler, OptionPickler, Pickler, RecordPickler, SeqPickler, SetPickler,
    StringPickler, TimespanPickler, TimestampPickler, TuplePickler, UnionPickler,
};
use crate::shape::{ShapeRegistry, TypeShape};

/// A single-assignment cache entry. The first top-level caller to reach a
/// shape constructs under `building`; later top-level callers block on
/// that slot and share the published instance. Nested constructions skip
/// the lock and may duplicate work, but `built` keeps publication single.
/// A failed construction publishes nothing, so later callers retry (and
/// deterministically fail the same way for permanently unsupported
/// shapes).
#[derive(Default)]
struct Slot {
    built: OnceLock<Arc<dyn Pickler>>,
    building: Mutex<()>,
}

/// The in-flight stack of one resolution call, used only for cycle
/// detection and discarded when the call completes.
#[derive(Default)]
pub(crate) struct ResolveFrame {
    in_flight: Vec<TypeShape>,
}

impl ResolveFrame {
    fn contains(&self, shape: &TypeShape) -> bool {
        self.in_flight.iter().any(|s| s == shape)
    }
}

/// Classifies shapes, recursively builds picklers, memoizes them
/// process-wide and rejects self-referential shapes.
///
/// Publication is at-most-once per shape: concurrent first use from
/// independent threads observes a single shared pickler instance.
pub struct Resolver {
    registry: ShapeRegistry,
    cache: RwLock<HashMap<TypeShape, Arc<Slot>>>,
}

impl Resolver {
    pub fn new(registry: ShapeRegistry) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Resolve a shape to its pickler, constructing and caching it on
    /// first use.
    pub fn resolve(&self, shape: &TypeShape) -> Result<Arc<dyn Pickler>, DynamapError> {
        let mut frame = ResolveFrame::default();
        self.resolve_with(shape, &mut frame)
    }

    pub(crate) fn resolve_with(
        &self,
        shape: &TypeShape,
        frame: &mut ResolveFrame,
    ) -> Result<Arc<dyn Pickler>, DynamapError> {
        if let Some(slot) = self.cache.read().get(shape).cloned() {
            if let Some(pickler) = slot.built.get() {
                trace!(shape = %shape.describe(), "pickler cache hit");
                return Ok(pickler.clone());
            }
        }

        if frame.contains(shape) {
            return Err(DynamapError::new(ErrorKind::RecursiveType(
                shape.describe(),
            )));
        }

        let slot = self
            .cache
            .write()
            .entry(shape.clone())
            .or_default()
            .clone();

        // Take the construction lock only at the top of a resolution call.
        // Nested resolutions build unlocked: a thread must never wait on a
        // slot lock while already holding one, or two calls entering a
        // cyclic ref pair from opposite ends would block each other instead
        // of failing. A duplicate nested build is discarded on publish.
        let _guard = if frame.in_flight.is_empty() {
            Some(slot.building.lock())
        } else {
            None
        };
        if let Some(pickler) = slot.built.get() {
            return Ok(pickler.clone());
        }

        frame.in_flight.push(shape.clone());
        let built = self.build(shape, frame);
        frame.in_flight.pop();

        let built = built?;
        let pickler = slot.built.get_or_init(|| built).clone();
        debug!(shape = %shape.describe(), "constructed pickler");
        Ok(pickler)
    }

    fn build(
        &self,
        shape: &TypeShape,
        frame: &mut ResolveFrame,
    ) -> Result<Arc<dyn Pickler>, DynamapError> {
        match classify(shape) {
            ShapeCategory::Bool => Ok(Arc::new(BoolPickler)),
            ShapeCategory::Int(width) => Ok(Arc::new(IntPickler::new(width))),
            ShapeCategory::Float32 => Ok(Arc::new(FloatPickler::f32())),
            ShapeCategory::Float64 => Ok(Arc::new(FloatPickler::f64())),
            ShapeCategory::Char => Ok(Arc::new(CharPickler)),
            ShapeCategory::String => Ok(Arc::new(StringPickler)),
            ShapeCategory::Guid => Ok(Arc::new(GuidPickler)),
            ShapeCategory::Bytes => Ok(Arc::new(BytesPickler)),
            ShapeCategory::Blob => Ok(Arc::new(BytesPickler)),
            ShapeCategory::Timespan => Ok(Arc::new(TimespanPickler)),
            ShapeCategory::DateTimeOffset => Ok(Arc::new(TimestampPickler)),
            ShapeCategory::DateTime => Err(DynamapError::new(ErrorKind::NaiveDateTime)),
            ShapeCategory::Enum => {
                let TypeShape::Enum(enum_shape) = shape else {
                    unreachable!("classified as enum");
                };
                Ok(Arc::new(EnumPickler::new(enum_shape.clone())))
            }
            ShapeCategory::Option | ShapeCategory::Nullable => {
                let (TypeShape::Option(inner) | TypeShape::Nullable(inner)) = shape else {
                    unreachable!("classified as option/nullable");
                };
                let inner = self.resolve_with(inner, frame)?;
                Ok(Arc::new(OptionPickler::new(inner)))
            }
            ShapeCategory::Seq => {
                let TypeShape::Seq(elem) = shape else {
                    unreachable!("classified as seq");
                };
                let elem = self.resolve_with(elem, frame)?;
                Ok(Arc::new(SeqPickler::new(elem)))
            }
            ShapeCategory::Set => {
                let TypeShape::Set(elem_shape) = shape else {
                    unreachable!("classified as set");
                };
                let elem = self.resolve_with(elem_shape, frame)?;
                if !elem.kind().is_key_scalar() {
                    return Err(DynamapError::new(ErrorKind::NonScalarSetElement(
                        elem_shape.describe(),
                    )));
                }
                Ok(Arc::new(SetPickler::new(elem)))
            }
            ShapeCategory::Map => {
                let TypeShape::Map { key, value } = shape else {
                    unreachable!("classified as map");
                };
                if **key != TypeShape::String {
                    return Err(DynamapError::new(ErrorKind::NonStringMapKey(
                        key.describe(),
                    )));
                }
                let value = self.resolve_with(value, frame)?;
                Ok(Arc::new(MapPickler::new(value)))
            }
            ShapeCategory::Tuple => {
                let TypeShape::Tuple(slot_shapes) = shape else {
                    unreachable!("classified as tuple");
                };
                let mut slots = Vec::with_capacity(slot_shapes.len());
                for slot_shape in slot_shapes {
                    slots.push(self.resolve_with(slot_shape, frame)?);
                }
                Ok(Arc::new(TuplePickler::new(slots)))
            }
            ShapeCategory::Record => {
                let TypeShape::Record(record) = shape else {
                    unreachable!("classified as record");
                };
                let mut fields = Vec::with_capacity(record.fields.len());
                for field in &record.fields {
                    let pickler = self
                        .resolve_with(&field.shape, frame)
                        .map_err(|e| e.in_field(&field.name).in_type(&record.name))?;
                    fields.push(FieldPickler {
                        field_name: field.name.clone(),
                        attr_name: field.attribute_name().to_string(),
                        pickler,
                    });
                }
                Ok(Arc::new(RecordPickler::new(record.clone(), fields)))
            }
            ShapeCategory::Union => {
                let TypeShape::Union(union) = shape else {
                    unreachable!("classified as union");
                };
                let mut cases = Vec::with_capacity(union.cases.len());
                for case in &union.cases {
                    let mut slots = Vec::with_capacity(case.fields.len());
                    for field_shape in &case.fields {
                        slots.push(
                            self.resolve_with(field_shape, frame)
                                .map_err(|e| e.in_field(&case.name).in_type(&union.name))?,
                        );
                    }
                    cases.push(slots);
                }
                Ok(Arc::new(UnionPickler::new(union.clone(), cases)))
            }
            ShapeCategory::Ref => {
                let TypeShape::Ref(name) = shape else {
                    unreachable!("classified as ref");
                };
                let definition = self
                    .registry
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DynamapError::new(ErrorKind::UnknownDefinition(name.clone())))?;
                self.resolve_with(&definition, frame)
            }
            ShapeCategory::Other => {
                let TypeShape::Other(name) = shape else {
                    unreachable!("classified as other");
                };
                Err(DynamapError::new(ErrorKind::UnsupportedType(name.clone())))
            }
        }
    }
}
