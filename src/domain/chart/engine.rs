use crate::domain::annotations::{Point, RawShape};
use crate::domain::errors::AnnotationResult;

/// Engine-assigned shape identifier
pub type ShapeId = String;

/// Primitives a concrete charting engine build exposes.
///
/// Capture and restore pick a strategy from these flags instead of probing the
/// engine on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineCapabilities {
    pub can_bulk_read_shapes: bool,
    pub can_serialize_layout: bool,
    pub can_create_multipoint_shape: bool,
    pub can_create_and_set_point: bool,
}

impl EngineCapabilities {
    pub fn full() -> Self {
        Self {
            can_bulk_read_shapes: true,
            can_serialize_layout: true,
            can_create_multipoint_shape: true,
            can_create_and_set_point: true,
        }
    }

    /// Either creation strategy is available.
    pub fn can_create_shapes(&self) -> bool {
        self.can_create_multipoint_shape || self.can_create_and_set_point
    }
}

/// Drawing surface of the third-party charting engine.
///
/// Every method is synchronous; callers insert settle delays between bulk
/// operations themselves. Methods guarded by a capability flag may return
/// `EngineCapabilityMissing` when the flag is off.
pub trait ChartEngine {
    fn capabilities(&self) -> EngineCapabilities;

    /// Ids of every user drawing currently on the chart, oldest first.
    fn shape_ids(&self) -> AnnotationResult<Vec<ShapeId>>;

    /// Full snapshot of every drawing in one call.
    fn read_all_shapes(&self) -> AnnotationResult<Vec<RawShape>>;

    /// Points, properties and name of a single drawing.
    fn read_shape(&self, id: &str) -> AnnotationResult<RawShape>;

    /// Engine-native serialization of the whole drawing layer.
    fn save_layout(&self) -> AnnotationResult<serde_json::Value>;

    fn load_layout(&self, layout: &serde_json::Value) -> AnnotationResult<()>;

    fn remove_all_shapes(&self) -> AnnotationResult<()>;

    fn remove_shape(&self, id: &str) -> AnnotationResult<()>;

    fn create_multipoint_shape(&self, shape: &RawShape) -> AnnotationResult<ShapeId>;

    /// Creates a shape anchored at `point` only.
    fn create_shape(&self, name: &str, point: Point, properties: &serde_json::Value) -> AnnotationResult<ShapeId>;

    fn set_shape_points(&self, id: &str, points: &[Point]) -> AnnotationResult<()>;
}
