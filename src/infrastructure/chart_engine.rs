//! Binding to the host page's charting widget.

use gloo::utils::format::JsValueSerdeExt;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::domain::{
    annotations::{Point, RawShape},
    chart::{ChartEngine, EngineCapabilities, ShapeId},
    errors::{AnnotationError, AnnotationResult},
    logging::{LogComponent, get_logger},
};

#[wasm_bindgen]
extern "C" {
    /// Thin JS adapter over the widget's drawing API
    pub type JsChartEngine;

    #[wasm_bindgen(method, catch, js_name = getAllShapes)]
    fn get_all_shapes(this: &JsChartEngine) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = readAllShapes)]
    fn read_all_shapes_js(this: &JsChartEngine) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getShapeName)]
    fn get_shape_name(this: &JsChartEngine, id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getShapePoints)]
    fn get_shape_points(this: &JsChartEngine, id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = getShapeProperties)]
    fn get_shape_properties(this: &JsChartEngine, id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = saveLayout)]
    fn save_layout_js(this: &JsChartEngine) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = loadLayout)]
    fn load_layout_js(this: &JsChartEngine, layout: &JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeAllShapes)]
    fn remove_all_shapes_js(this: &JsChartEngine) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = removeShape)]
    fn remove_shape_js(this: &JsChartEngine, id: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = createMultipointShape)]
    fn create_multipoint_shape_js(this: &JsChartEngine, points: &JsValue, options: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = createShape)]
    fn create_shape_js(this: &JsChartEngine, point: &JsValue, options: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(method, catch, js_name = setShapePoints)]
    fn set_shape_points_js(this: &JsChartEngine, id: &str, points: &JsValue) -> Result<(), JsValue>;
}

#[derive(Debug, Deserialize)]
struct ShapeEntry {
    id: ShapeIdDto,
}

/// The widget hands out ids as strings or numbers depending on version
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ShapeIdDto {
    Text(String),
    Number(f64),
}

impl ShapeIdDto {
    fn into_id(self) -> ShapeId {
        match self {
            ShapeIdDto::Text(id) => id,
            ShapeIdDto::Number(id) => format!("{}", id),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateOptions<'a> {
    shape: &'a str,
    overrides: &'a serde_json::Value,
}

fn js_error(context: &str, error: JsValue) -> AnnotationError {
    let detail = error.as_string().unwrap_or_else(|| format!("{:?}", error));
    AnnotationError::Engine(format!("{}: {}", context, detail))
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> AnnotationResult<JsValue> {
    JsValue::from_serde(value).map_err(|e| AnnotationError::Engine(format!("serialize: {}", e)))
}

fn from_js<T: serde::de::DeserializeOwned>(context: &str, value: JsValue) -> AnnotationResult<T> {
    value.into_serde().map_err(|e| AnnotationError::Engine(format!("{}: {}", context, e)))
}

/// `ChartEngine` over a `JsChartEngine`, capabilities probed once
pub struct BrowserChartEngine {
    inner: JsChartEngine,
    capabilities: EngineCapabilities,
}

impl BrowserChartEngine {
    pub fn new(inner: JsChartEngine) -> Self {
        let has = |name: &str| {
            js_sys::Reflect::get(&inner, &JsValue::from_str(name))
                .map(|value| value.is_function())
                .unwrap_or(false)
        };
        let capabilities = EngineCapabilities {
            can_bulk_read_shapes: has("readAllShapes"),
            can_serialize_layout: has("saveLayout") && has("loadLayout"),
            can_create_multipoint_shape: has("createMultipointShape"),
            can_create_and_set_point: has("createShape") && has("setShapePoints"),
        };
        get_logger().info(
            LogComponent::Infrastructure("BrowserChartEngine"),
            &format!("chart engine capabilities: {:?}", capabilities),
        );
        Self { inner, capabilities }
    }

    fn require(&self, available: bool, what: &'static str) -> AnnotationResult<()> {
        if available { Ok(()) } else { Err(AnnotationError::EngineCapabilityMissing(what)) }
    }
}

impl ChartEngine for BrowserChartEngine {
    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn shape_ids(&self) -> AnnotationResult<Vec<ShapeId>> {
        let raw = self.inner.get_all_shapes().map_err(|e| js_error("getAllShapes", e))?;
        let entries: Vec<ShapeEntry> = from_js("getAllShapes", raw)?;
        Ok(entries.into_iter().map(|entry| entry.id.into_id()).collect())
    }

    fn read_all_shapes(&self) -> AnnotationResult<Vec<RawShape>> {
        self.require(self.capabilities.can_bulk_read_shapes, "bulk shape read")?;
        let raw = self.inner.read_all_shapes_js().map_err(|e| js_error("readAllShapes", e))?;
        from_js("readAllShapes", raw)
    }

    fn read_shape(&self, id: &str) -> AnnotationResult<RawShape> {
        let name = self.inner.get_shape_name(id).map_err(|e| js_error("getShapeName", e))?;
        let points = self.inner.get_shape_points(id).map_err(|e| js_error("getShapePoints", e))?;
        let properties = self.inner.get_shape_properties(id).map_err(|e| js_error("getShapeProperties", e))?;
        Ok(RawShape {
            id: Some(id.to_string()),
            name: name.as_string().unwrap_or_default(),
            points: from_js("getShapePoints", points)?,
            properties: from_js::<Option<serde_json::Value>>("getShapeProperties", properties)?.unwrap_or_default(),
        })
    }

    fn save_layout(&self) -> AnnotationResult<serde_json::Value> {
        self.require(self.capabilities.can_serialize_layout, "layout serialization")?;
        let raw = self.inner.save_layout_js().map_err(|e| js_error("saveLayout", e))?;
        from_js("saveLayout", raw)
    }

    fn load_layout(&self, layout: &serde_json::Value) -> AnnotationResult<()> {
        self.require(self.capabilities.can_serialize_layout, "layout serialization")?;
        self.inner.load_layout_js(&to_js(layout)?).map_err(|e| js_error("loadLayout", e))
    }

    fn remove_all_shapes(&self) -> AnnotationResult<()> {
        self.inner.remove_all_shapes_js().map_err(|e| js_error("removeAllShapes", e))
    }

    fn remove_shape(&self, id: &str) -> AnnotationResult<()> {
        self.inner.remove_shape_js(id).map_err(|e| js_error("removeShape", e))
    }

    fn create_multipoint_shape(&self, shape: &RawShape) -> AnnotationResult<ShapeId> {
        self.require(self.capabilities.can_create_multipoint_shape, "multipoint shape creation")?;
        let options = to_js(&CreateOptions { shape: &shape.name, overrides: &shape.properties })?;
        let id = self
            .inner
            .create_multipoint_shape_js(&to_js(&shape.points)?, &options)
            .map_err(|e| js_error("createMultipointShape", e))?;
        from_js::<ShapeIdDto>("createMultipointShape", id).map(ShapeIdDto::into_id)
    }

    fn create_shape(&self, name: &str, point: Point, properties: &serde_json::Value) -> AnnotationResult<ShapeId> {
        self.require(self.capabilities.can_create_and_set_point, "shape creation")?;
        let options = to_js(&CreateOptions { shape: name, overrides: properties })?;
        let id = self.inner.create_shape_js(&to_js(&point)?, &options).map_err(|e| js_error("createShape", e))?;
        from_js::<ShapeIdDto>("createShape", id).map(ShapeIdDto::into_id)
    }

    fn set_shape_points(&self, id: &str, points: &[Point]) -> AnnotationResult<()> {
        self.require(self.capabilities.can_create_and_set_point, "shape point update")?;
        self.inner.set_shape_points_js(id, &to_js(points)?).map_err(|e| js_error("setShapePoints", e))
    }
}
