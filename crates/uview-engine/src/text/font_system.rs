use std::fmt;
use std::path::Path;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone)]
pub struct FontLoadError(pub String);

impl fmt::Display for FontLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "font load error: {}", self.0)
    }
}

impl std::error::Error for FontLoadError {}

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Owns a collection of loaded fonts.
///
/// Fonts are immutable after loading. The system is owned by the application
/// and passed to [`TextRenderer::render`](crate::render::TextRenderer::render)
/// each frame so new glyphs can be rasterized on demand.
#[derive(Default)]
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        Ok(id)
    }

    /// Loads the first readable font among `candidates`.
    ///
    /// Unreadable or unparsable files are skipped with a debug log.
    pub fn load_first<P: AsRef<Path>>(&mut self, candidates: &[P]) -> Option<FontId> {
        for path in candidates {
            let path = path.as_ref();
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            match self.load_font(&bytes) {
                Ok(id) => {
                    log::info!("loaded font {}", path.display());
                    return Some(id);
                }
                Err(e) => log::debug!("skipping font {}: {e}", path.display()),
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Height of one line at `size`, in logical pixels.
    ///
    /// Falls back to `size * 1.2` for unknown fonts or fonts without
    /// horizontal metrics.
    pub fn line_height(&self, id: FontId, size: f32) -> f32 {
        self.get(id)
            .and_then(|f| f.horizontal_line_metrics(size))
            .map_or(size * 1.2, |m| m.new_line_size)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_font_line_height_falls_back() {
        let fonts = FontSystem::new();
        assert!((fonts.line_height(FontId(0), 20.0) - 24.0).abs() < 1e-4);
    }

    #[test]
    fn invalid_bytes_are_rejected() {
        let mut fonts = FontSystem::new();
        assert!(fonts.load_font(b"not a font").is_err());
        assert!(fonts.is_empty());
    }

    #[test]
    fn load_first_skips_missing_paths() {
        let mut fonts = FontSystem::new();
        assert_eq!(fonts.load_first(&["/nonexistent/uview/font.ttf"]), None);
    }
}
