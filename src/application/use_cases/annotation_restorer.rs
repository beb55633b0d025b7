use std::rc::Rc;

use crate::domain::{
    annotations::{
        HORIZONTAL_LINE, LayoutData, LevelRole, Line, LineRole, Point, RawShape, TREND_LINE,
        services::{PointValidator, is_drawable_line, level_price, line_matches},
    },
    chart::{ChartEngine, ChartHandle, ShapeId},
    errors::{AnnotationError, AnnotationResult},
    logging::LogComponent,
    ownership::OwnershipGuard,
    scheduling::{Clock, Timer},
};

/// How one role line ended up on the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRestoration {
    /// The layout carries no line for this role
    NotRequested,
    /// A recreated drawing matched the role line within tolerance
    Matched,
    /// Drawn explicitly from the role coordinates
    Redrawn,
    Failed,
}

impl RoleRestoration {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::NotRequested | Self::Matched | Self::Redrawn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    pub layout_loaded: bool,
    /// Drawings recreated from the stored layout, role fallbacks excluded
    pub recreated: usize,
    pub entry: RoleRestoration,
    pub exit: RoleRestoration,
    pub levels: usize,
    /// Shape count read back once everything was drawn
    pub shapes_on_chart: usize,
}

/// Use case replaying a persisted layout onto the chart
pub struct AnnotationRestorerUseCase {
    clock: Rc<dyn Clock>,
    timer: Rc<dyn Timer>,
    settle_delay_ms: u64,
}

impl AnnotationRestorerUseCase {
    pub fn new(clock: Rc<dyn Clock>, timer: Rc<dyn Timer>, settle_delay_ms: u64) -> Self {
        Self { clock, timer, settle_delay_ms }
    }

    /// Clear the chart and redraw `layout`.
    ///
    /// Ownership and the chart handle are re-checked before every chart
    /// mutation; once either is lost the call stops with `StaleOperation` or
    /// `EngineDetached` and leaves the chart alone.
    pub async fn restore(
        &self,
        chart: &ChartHandle,
        layout: &LayoutData,
        guard: &OwnershipGuard,
    ) -> AnnotationResult<RestoreReport> {
        self.clear(chart, guard).await?;

        let mut recreated_lines: Vec<Line> = Vec::new();
        let mut submitted = 0usize;
        let mut layout_loaded = false;

        if let Some(native) = &layout.other_drawings.tradingview_layout {
            if let Some(lines) = self.load_native(chart, guard, native).await? {
                submitted = lines.len();
                recreated_lines = lines;
                layout_loaded = true;
            }
        }

        if !layout_loaded {
            if let Some(drawings) = &layout.other_drawings.tradingview_drawings {
                let validator = PointValidator::new(self.clock.now_secs());
                for shape in drawings.iter().filter(|s| !s.is_horizontal_level()) {
                    let clean = validator.sanitize(shape);
                    if clean.points.is_empty() || clean.points.len() < shape.points.len() {
                        crate::log_warn!(
                            LogComponent::Application("AnnotationRestorer"),
                            "dropping {} with out-of-range points",
                            shape.name
                        );
                        continue;
                    }
                    let engine = self.engine(chart, guard)?;
                    match draw_shape(engine.as_ref(), &clean) {
                        Ok(_) => {
                            submitted += 1;
                            recreated_lines.extend(clean.as_line());
                        }
                        Err(e) => {
                            crate::log_warn!(
                                LogComponent::Application("AnnotationRestorer"),
                                "could not recreate {}: {}",
                                clean.name,
                                e
                            );
                        }
                    }
                }
            }
        }

        let match_role = |line: Option<&Line>| match line {
            None => RoleRestoration::NotRequested,
            Some(target) if recreated_lines.iter().any(|l| line_matches(l, target)) => RoleRestoration::Matched,
            Some(_) => RoleRestoration::Failed,
        };
        let mut entry = match_role(layout.entry_line.as_ref());
        let mut exit = match_role(layout.exit_line.as_ref());

        let on_chart = self.engine(chart, guard)?.shape_ids()?.len();
        if on_chart < submitted {
            crate::log_warn!(
                LogComponent::Application("AnnotationRestorer"),
                "{} shapes on chart after submitting {}, redrawing role lines",
                on_chart,
                submitted
            );
            entry = demote(entry);
            exit = demote(exit);
        }

        if entry == RoleRestoration::Failed {
            entry = self.draw_role(chart, guard, LineRole::Entry, layout.entry_line.as_ref())?;
        }
        if exit == RoleRestoration::Failed {
            exit = self.draw_role(chart, guard, LineRole::Exit, layout.exit_line.as_ref())?;
        }

        let levels = self.draw_levels(chart, guard, layout)?;
        let shapes_on_chart = self.engine(chart, guard)?.shape_ids()?.len();

        crate::log_info!(
            LogComponent::Application("AnnotationRestorer"),
            "restored config {}: {} drawings, entry {:?}, exit {:?}, {} levels",
            guard.id(),
            submitted,
            entry,
            exit,
            levels
        );

        Ok(RestoreReport { layout_loaded, recreated: submitted, entry, exit, levels, shapes_on_chart })
    }

    /// Remove every shape, verify, and retry once shape by shape.
    async fn clear(&self, chart: &ChartHandle, guard: &OwnershipGuard) -> AnnotationResult<()> {
        let engine = self.engine(chart, guard)?;
        if let Err(e) = engine.remove_all_shapes() {
            crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "bulk clear failed: {}", e);
        }
        drop(engine);
        self.settle().await;

        let engine = self.engine(chart, guard)?;
        let leftovers = engine.shape_ids()?;
        if leftovers.is_empty() {
            return Ok(());
        }

        crate::log_warn!(
            LogComponent::Application("AnnotationRestorer"),
            "{} shapes survived clear, removing individually",
            leftovers.len()
        );
        for id in &leftovers {
            if let Err(e) = engine.remove_shape(id) {
                crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "remove {} failed: {}", id, e);
            }
        }
        drop(engine);
        self.settle().await;

        let remaining = self.engine(chart, guard)?.shape_ids()?.len();
        if remaining > 0 {
            crate::log_warn!(
                LogComponent::Application("AnnotationRestorer"),
                "{} shapes still on chart after retry",
                remaining
            );
        }
        Ok(())
    }

    /// Whole-layout load. `Ok(None)` means fall back to per-shape recreation.
    async fn load_native(
        &self,
        chart: &ChartHandle,
        guard: &OwnershipGuard,
        native: &serde_json::Value,
    ) -> AnnotationResult<Option<Vec<Line>>> {
        let engine = self.engine(chart, guard)?;
        if !engine.capabilities().can_serialize_layout {
            return Ok(None);
        }
        if let Err(e) = engine.load_layout(native) {
            crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "native layout load failed: {}", e);
            return Ok(None);
        }
        drop(engine);
        self.settle().await;

        // The native blob also holds the old TP/SL levels; they are redrawn from settings.
        let engine = self.engine(chart, guard)?;
        let mut lines = Vec::new();
        for id in engine.shape_ids()? {
            match engine.read_shape(&id) {
                Ok(shape) if shape.is_horizontal_level() => {
                    if let Err(e) = engine.remove_shape(&id) {
                        crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "remove {} failed: {}", id, e);
                    }
                }
                Ok(shape) => lines.extend(shape.as_line()),
                Err(e) => {
                    crate::log_debug!(LogComponent::Application("AnnotationRestorer"), "cannot read {}: {}", id, e);
                }
            }
        }
        Ok(Some(lines))
    }

    fn draw_role(
        &self,
        chart: &ChartHandle,
        guard: &OwnershipGuard,
        role: LineRole,
        line: Option<&Line>,
    ) -> AnnotationResult<RoleRestoration> {
        let Some(line) = line.filter(|l| is_drawable_line(l)) else {
            crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "{} line is not drawable", role);
            return Ok(RoleRestoration::Failed);
        };
        let engine = self.engine(chart, guard)?;
        let shape = RawShape::new(TREND_LINE, line.points().to_vec());
        match draw_shape(engine.as_ref(), &shape) {
            Ok(_) => Ok(RoleRestoration::Redrawn),
            Err(e) => {
                crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "drawing {} line failed: {}", role, e);
                Ok(RoleRestoration::Failed)
            }
        }
    }

    fn draw_levels(&self, chart: &ChartHandle, guard: &OwnershipGuard, layout: &LayoutData) -> AnnotationResult<usize> {
        let Some(settings) = layout.tpsl_settings else {
            return Ok(0);
        };
        let entry_anchor = layout.entry_line.map(|l| l.p1);
        let anchor_time = entry_anchor.map_or_else(|| self.clock.now_secs(), |p| p.time);

        let mut drawn = 0;
        for role in [LevelRole::TakeProfit, LevelRole::StopLoss] {
            let Some(price) = level_price(&settings, role, entry_anchor.map(|p| p.price)) else {
                continue;
            };
            let engine = self.engine(chart, guard)?;
            let shape = RawShape::new(HORIZONTAL_LINE, vec![Point::new(anchor_time, price)]);
            match draw_shape(engine.as_ref(), &shape) {
                Ok(_) => drawn += 1,
                Err(e) => {
                    crate::log_warn!(LogComponent::Application("AnnotationRestorer"), "drawing {} failed: {}", role, e);
                }
            }
        }
        Ok(drawn)
    }

    fn engine(&self, chart: &ChartHandle, guard: &OwnershipGuard) -> AnnotationResult<Rc<dyn ChartEngine>> {
        if let Err(stale) = guard.check() {
            crate::log_debug!(
                LogComponent::Application("AnnotationRestorer"),
                "config {} lost {} ownership, stopping",
                guard.id(),
                guard.kind()
            );
            return Err(stale);
        }
        chart.get()
    }

    async fn settle(&self) {
        self.timer.sleep(self.settle_delay_ms).await;
    }
}

fn demote(role: RoleRestoration) -> RoleRestoration {
    match role {
        RoleRestoration::Matched => RoleRestoration::Failed,
        other => other,
    }
}

/// Create `shape` with the richest primitive the engine offers.
///
/// With create-then-set, a shape whose remaining points cannot be set is
/// removed again so no half-drawn line stays behind.
pub fn draw_shape(engine: &dyn ChartEngine, shape: &RawShape) -> AnnotationResult<ShapeId> {
    let caps = engine.capabilities();
    let first = *shape
        .points
        .first()
        .ok_or_else(|| AnnotationError::Engine(format!("{} has no points", shape.name)))?;

    if !caps.can_create_shapes() {
        return Err(AnnotationError::EngineCapabilityMissing("shape creation"));
    }
    if caps.can_create_multipoint_shape {
        return engine.create_multipoint_shape(shape);
    }

    let id = engine.create_shape(&shape.name, first, &shape.properties)?;
    if shape.points.len() > 1 {
        if let Err(e) = engine.set_shape_points(&id, &shape.points) {
            if let Err(cleanup) = engine.remove_shape(&id) {
                crate::log_warn!(
                    LogComponent::Application("AnnotationRestorer"),
                    "incomplete shape {} left on chart: {}",
                    id,
                    cleanup
                );
            }
            return Err(e);
        }
    }
    Ok(id)
}
