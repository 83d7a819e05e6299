//! Zoom-adaptive reference grid.

use std::ops::Range;

use glam::Vec2;

use crate::camera::Camera2D;
use crate::config::Theme;
use crate::mesh::Bounds;

/// Every this many minor steps a line is drawn as major.
pub const MAJOR_EVERY: i64 = 10;

/// Length of the U and V axis stubs drawn from the origin.
pub const AXIS_STUB: f32 = 0.5;

/// Grid line categories, in draw order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LineKind {
    Minor,
    Major,
    Origin,
    UAxis,
    VAxis,
}

impl LineKind {
    pub const ALL: [LineKind; 5] =
        [LineKind::Minor, LineKind::Major, LineKind::Origin, LineKind::UAxis, LineKind::VAxis];

    pub fn color(self, theme: &Theme) -> [f32; 3] {
        match self {
            LineKind::Minor => theme.grid_minor,
            LineKind::Major => theme.grid_major,
            LineKind::Origin => theme.grid_origin,
            LineKind::UAxis => theme.u_axis,
            LineKind::VAxis => theme.v_axis,
        }
    }
}

/// Minor and major grid steps in UV units.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GridSpacing {
    pub minor: f64,
    pub major: f64,
}

impl GridSpacing {
    /// Smallest power of ten whose on-screen step is at least `min_px`.
    pub fn for_scale(scale: f32, min_px: f32) -> Self {
        let minor = power_of_ten_at_least(min_px as f64 / scale.max(f32::MIN_POSITIVE) as f64);
        Self { minor, major: minor * MAJOR_EVERY as f64 }
    }
}

/// Smallest `10^n >= x` for positive finite `x`; 1 otherwise.
pub fn power_of_ten_at_least(x: f64) -> f64 {
    if !(x.is_finite() && x > 0.0) {
        return 1.0;
    }
    let mut p = 10f64.powf(x.log10().ceil());
    // log10 can be off by an ulp around exact powers.
    if p < x {
        p *= 10.0;
    } else if p / 10.0 >= x {
        p /= 10.0;
    }
    p
}

/// Grid lines for the visible region, grouped by kind in draw order.
///
/// `vertices` is a line list in UV space; `ranges` holds one vertex range
/// per non-empty kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridLines {
    pub vertices: Vec<Vec2>,
    pub ranges: Vec<(LineKind, Range<u32>)>,
}

impl GridLines {
    pub fn build(camera: &Camera2D, spacing: GridSpacing) -> Self {
        let visible = camera.visible_bounds();
        let mut by_kind: [Vec<Vec2>; 5] = Default::default();

        let mut push = |kind: LineKind, a: Vec2, b: Vec2| {
            let bucket = &mut by_kind[kind as usize];
            bucket.push(a);
            bucket.push(b);
        };

        for k in steps(visible.min.x, visible.max.x, spacing.minor) {
            let x = (k as f64 * spacing.minor) as f32;
            let a = Vec2::new(x, visible.min.y);
            let b = Vec2::new(x, visible.max.y);
            push(classify(k), a, b);
        }
        for k in steps(visible.min.y, visible.max.y, spacing.minor) {
            let y = (k as f64 * spacing.minor) as f32;
            let a = Vec2::new(visible.min.x, y);
            let b = Vec2::new(visible.max.x, y);
            push(classify(k), a, b);
        }

        if intersects_stubs(visible) {
            push(LineKind::UAxis, Vec2::ZERO, Vec2::new(AXIS_STUB, 0.0));
            push(LineKind::VAxis, Vec2::ZERO, Vec2::new(0.0, AXIS_STUB));
        }

        let mut lines = GridLines::default();
        for kind in LineKind::ALL {
            let bucket = &by_kind[kind as usize];
            if bucket.is_empty() {
                continue;
            }
            let start = lines.vertices.len() as u32;
            lines.vertices.extend_from_slice(bucket);
            lines.ranges.push((kind, start..lines.vertices.len() as u32));
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn count(&self, kind: LineKind) -> usize {
        self.ranges
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, r)| (r.end - r.start) as usize / 2)
    }
}

fn classify(k: i64) -> LineKind {
    if k == 0 {
        LineKind::Origin
    } else if k % MAJOR_EVERY == 0 {
        LineKind::Major
    } else {
        LineKind::Minor
    }
}

/// Integer multiples of `step` inside `[lo, hi]`.
pub(crate) fn steps(lo: f32, hi: f32, step: f64) -> std::ops::RangeInclusive<i64> {
    let first = (lo as f64 / step).ceil() as i64;
    let last = (hi as f64 / step).floor() as i64;
    first..=last
}

fn intersects_stubs(visible: Bounds) -> bool {
    visible.max.x >= 0.0
        && visible.max.y >= 0.0
        && visible.min.x <= AXIS_STUB
        && visible.min.y <= AXIS_STUB
}
