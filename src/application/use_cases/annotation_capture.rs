use std::rc::Rc;

use crate::domain::{
    annotations::{
        CaptureMethod, LayoutData, OtherDrawings, RawShape,
        services::{EXPECTED_SHAPE_CAP, assign_line_roles, keep_most_recent},
    },
    chart::{ChartEngine, ChartHandle},
    errors::{AnnotationError, AnnotationResult},
    logging::LogComponent,
    scheduling::Clock,
};

/// Use case reading the live drawings into a portable layout record
pub struct AnnotationCaptureUseCase {
    clock: Rc<dyn Clock>,
}

impl AnnotationCaptureUseCase {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Snapshot the chart's drawings. Never mutates the chart.
    ///
    /// Tries a bulk read, then the engine's native layout, then per-shape
    /// reads. `previous` is the layout last persisted for this configuration
    /// and only steers which captured line keeps the entry/exit role.
    pub fn capture(&self, chart: &ChartHandle, previous: Option<&LayoutData>) -> AnnotationResult<LayoutData> {
        let engine = chart.get()?;

        let (method, shapes, native) = match read_all(engine.as_ref()) {
            Ok(shapes) => (CaptureMethod::AllShapes, shapes, None),
            Err(bulk_error) => {
                crate::log_debug!(LogComponent::Application("AnnotationCapture"), "bulk read unavailable: {}", bulk_error);
                match read_native(engine.as_ref()) {
                    Ok((layout, shapes)) => (CaptureMethod::NativeLayout, shapes, Some(layout)),
                    Err(native_error) => {
                        crate::log_debug!(
                            LogComponent::Application("AnnotationCapture"),
                            "native layout unavailable: {}",
                            native_error
                        );
                        let shapes = read_individually(engine.as_ref()).map_err(|e| {
                            crate::log_warn!(
                                LogComponent::Application("AnnotationCapture"),
                                "no capture method succeeded: {}",
                                e
                            );
                            AnnotationError::EngineCapabilityMissing("shape capture")
                        })?;
                        (CaptureMethod::IndividualShapes, shapes, None)
                    }
                }
            }
        };

        // TP/SL levels are regenerated from settings on restore.
        let drawings: Vec<RawShape> = shapes.into_iter().filter(|s| !s.is_horizontal_level()).collect();
        let found = drawings.len();
        let over_cap = found > EXPECTED_SHAPE_CAP;
        let drawings = if over_cap {
            crate::log_warn!(
                LogComponent::Application("AnnotationCapture"),
                "{} drawings on chart, keeping the latest {}",
                found,
                EXPECTED_SHAPE_CAP
            );
            keep_most_recent(drawings, EXPECTED_SHAPE_CAP)
        } else {
            drawings
        };

        let (entry_line, exit_line) = assign_line_roles(
            &drawings,
            previous.and_then(|l| l.entry_line.as_ref()),
            previous.and_then(|l| l.exit_line.as_ref()),
        );

        // The native blob cannot be trimmed, so an over-cap chart is stored shape by shape.
        let (method, native) = if over_cap && native.is_some() {
            crate::log_warn!(
                LogComponent::Application("AnnotationCapture"),
                "dropping native layout, it still holds all {} drawings",
                found
            );
            (CaptureMethod::IndividualShapes, None)
        } else {
            (method, native)
        };

        let other_drawings = match method {
            CaptureMethod::NativeLayout => OtherDrawings {
                capture_method: method,
                tradingview_drawings: None,
                tradingview_layout: native,
                active_shapes: Some(drawings),
            },
            _ => OtherDrawings {
                capture_method: method,
                tradingview_drawings: Some(drawings),
                tradingview_layout: None,
                active_shapes: None,
            },
        };

        Ok(LayoutData {
            entry_line,
            exit_line,
            tpsl_settings: previous.and_then(|l| l.tpsl_settings),
            other_drawings,
            timestamp: self.clock.now_ms(),
        })
    }
}

fn read_all(engine: &dyn ChartEngine) -> AnnotationResult<Vec<RawShape>> {
    if !engine.capabilities().can_bulk_read_shapes {
        return Err(AnnotationError::EngineCapabilityMissing("bulk shape read"));
    }
    engine.read_all_shapes()
}

fn read_native(engine: &dyn ChartEngine) -> AnnotationResult<(serde_json::Value, Vec<RawShape>)> {
    if !engine.capabilities().can_serialize_layout {
        return Err(AnnotationError::EngineCapabilityMissing("layout serialization"));
    }
    let layout = engine.save_layout()?;
    // Role extraction still needs coordinates; the native blob is opaque.
    let shapes = read_individually(engine).unwrap_or_default();
    Ok((layout, shapes))
}

fn read_individually(engine: &dyn ChartEngine) -> AnnotationResult<Vec<RawShape>> {
    let ids = engine.shape_ids()?;
    let mut shapes = Vec::with_capacity(ids.len());
    for id in ids {
        match engine.read_shape(&id) {
            Ok(mut shape) => {
                shape.id.get_or_insert(id);
                shapes.push(shape);
            }
            Err(e) => {
                crate::log_warn!(LogComponent::Application("AnnotationCapture"), "skipping shape {}: {}", id, e);
            }
        }
    }
    Ok(shapes)
}
