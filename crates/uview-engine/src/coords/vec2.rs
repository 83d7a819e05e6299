/// 2D vector in logical pixels.
///
/// Kept separate from UV-space vectors so screen and texture coordinates are
/// never mixed by accident.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Pixel-snapped copy; glyph quads look soft when placed on fractional pixels.
    #[inline]
    pub fn round(self) -> Self {
        Self::new(self.x.round(), self.y.round())
    }
}
