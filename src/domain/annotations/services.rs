use super::entities::{LevelRole, LevelType, Line, Point, RawShape, TpSlSettings};
use crate::time_utils::{DAY_SECS, YEAR_SECS};

/// Max time distance for a restored anchor to count as the same anchor.
pub const TIME_TOLERANCE_SECS: i64 = 60;
/// Max price distance for a restored anchor to count as the same anchor.
pub const PRICE_TOLERANCE: f64 = 0.01;
/// More user drawings than this means an earlier clear failed.
pub const EXPECTED_SHAPE_CAP: usize = 3;

/// Tolerance identity between two anchors. Both bounds are strict.
pub fn matches(a: &Point, b: &Point, time_tol_secs: i64, price_tol: f64) -> bool {
    (a.time - b.time).abs() < time_tol_secs && (a.price - b.price).abs() < price_tol
}

/// Same direction, both anchors within the default tolerances.
pub fn line_matches(candidate: &Line, target: &Line) -> bool {
    matches(&candidate.p1, &target.p1, TIME_TOLERANCE_SECS, PRICE_TOLERANCE)
        && matches(&candidate.p2, &target.p2, TIME_TOLERANCE_SECS, PRICE_TOLERANCE)
}

/// Accepts points that are finite and inside `[now - 1 year, now + 1 day]`.
#[derive(Debug, Clone, Copy)]
pub struct PointValidator {
    now_secs: i64,
}

impl PointValidator {
    pub fn new(now_secs: i64) -> Self {
        Self { now_secs }
    }

    pub fn is_acceptable(&self, point: &Point) -> bool {
        point.price.is_finite()
            && point.time >= self.now_secs - YEAR_SECS
            && point.time <= self.now_secs + DAY_SECS
    }

    /// Copy of the shape with unacceptable anchors removed.
    pub fn sanitize(&self, shape: &RawShape) -> RawShape {
        RawShape {
            points: shape.points.iter().filter(|p| self.is_acceptable(p)).copied().collect(),
            ..shape.clone()
        }
    }
}

/// Explicit role lines skip the age window; only finiteness is required.
pub fn is_drawable_line(line: &Line) -> bool {
    line.p1.price.is_finite() && line.p2.price.is_finite()
}

/// Splits captured trade lines into entry and exit roles.
///
/// Lines matching the previously known entry/exit within tolerance keep their
/// role. Roles still open are filled from the remaining lines in drawing order,
/// entry first.
pub fn assign_line_roles(
    shapes: &[RawShape],
    previous_entry: Option<&Line>,
    previous_exit: Option<&Line>,
) -> (Option<Line>, Option<Line>) {
    let lines: Vec<Line> = shapes.iter().filter_map(RawShape::as_line).collect();
    let mut taken = vec![false; lines.len()];

    let mut take_matching = |target: Option<&Line>| -> Option<Line> {
        let target = target?;
        let index = (0..lines.len()).find(|&i| !taken[i] && line_matches(&lines[i], target))?;
        taken[index] = true;
        Some(lines[index])
    };
    let mut entry = take_matching(previous_entry);
    let mut exit = take_matching(previous_exit);

    let mut remaining = lines.iter().zip(&taken).filter(|(_, used)| !**used).map(|(line, _)| *line);
    if entry.is_none() {
        entry = remaining.next();
    }
    if exit.is_none() {
        exit = remaining.next();
    }
    (entry, exit)
}

/// Keep only the `cap` most recently drawn shapes.
pub fn keep_most_recent(shapes: Vec<RawShape>, cap: usize) -> Vec<RawShape> {
    let excess = shapes.len().saturating_sub(cap);
    shapes.into_iter().skip(excess).collect()
}

/// Absolute price for a take-profit or stop-loss level.
///
/// Percent levels are measured from `entry_price`; take-profit sits above it and
/// stop-loss below it. Without an entry price a percent level cannot be placed.
pub fn level_price(settings: &TpSlSettings, role: LevelRole, entry_price: Option<f64>) -> Option<f64> {
    let (kind, value) = match role {
        LevelRole::TakeProfit => (settings.tp_type, settings.tp_value?),
        LevelRole::StopLoss => (settings.sl_type, settings.sl_value?),
    };
    if !value.is_finite() {
        return None;
    }
    match kind {
        LevelType::Absolute => Some(value),
        LevelType::Percent => {
            let entry = entry_price.filter(|p| p.is_finite())?;
            let sign = if role == LevelRole::TakeProfit { 1.0 } else { -1.0 };
            Some(entry * (1.0 + sign * value / 100.0))
        }
    }
}
