/// Shelf allocator for a square glyph atlas.
///
/// Glyphs are placed left to right on the current shelf; a glyph that does
/// not fit horizontally opens a new shelf below the tallest glyph of the
/// current one. Once a glyph fails to fit vertically the packer latches
/// `full` and rejects every later allocation until [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    size: u32,
    padding: u32,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    full: bool,
}

impl ShelfPacker {
    pub fn new(size: u32, padding: u32) -> Self {
        Self {
            size,
            padding,
            cursor_x: padding,
            cursor_y: padding,
            row_height: 0,
            full: false,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Reserves a `w × h` cell and returns its top-left texel.
    pub fn allocate(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if self.full {
            return None;
        }

        if self.cursor_x + w + self.padding > self.size {
            self.cursor_y += self.row_height + self.padding;
            self.cursor_x = self.padding;
            self.row_height = 0;
        }

        if self.cursor_y + h + self.padding > self.size || self.cursor_x + w + self.padding > self.size {
            self.full = true;
            return None;
        }

        let at = (self.cursor_x, self.cursor_y);
        self.cursor_x += w + self.padding;
        self.row_height = self.row_height.max(h);
        Some(at)
    }

    /// Normalized UV rect of a cell returned by [`allocate`](Self::allocate).
    pub fn uv_rect(&self, x: u32, y: u32, w: u32, h: u32) -> ([f32; 2], [f32; 2]) {
        let s = self.size as f32;
        (
            [x as f32 / s, y as f32 / s],
            [(x + w) as f32 / s, (y + h) as f32 / s],
        )
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.size, self.padding);
    }
}
