use std::path::Path;

use super::udim;

/// File extensions the filesystem loader accepts.
pub const VALID_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tiff", "tif", "bmp"];

/// A decoded image in tightly packed RGBA8 rows, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Texture I/O used by [`TextureCache`](super::TextureCache).
///
/// Implementations run on the loader worker thread in background mode.
pub trait ImageLoader: Send + Sync + 'static {
    /// Decodes `path` to RGBA8. The error is a human-readable reason.
    fn load(&self, path: &Path) -> Result<DecodedImage, String>;

    /// Tile numbers that exist on disk for a `<UDIM>` pattern, ascending.
    fn list_udim_tiles(&self, pattern: &Path) -> Vec<u32>;
}

pub fn has_valid_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| VALID_EXTENSIONS.iter().any(|v| v.eq_ignore_ascii_case(e)))
}

/// Loads images from the local filesystem with the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageLoader;

impl ImageLoader for FsImageLoader {
    fn load(&self, path: &Path) -> Result<DecodedImage, String> {
        if !has_valid_extension(path) {
            return Err(format!(
                "unsupported extension (expected one of {})",
                VALID_EXTENSIONS.join(", ")
            ));
        }
        let img = image::open(path).map_err(|e| e.to_string())?.to_rgba8();
        let (width, height) = img.dimensions();
        Ok(DecodedImage { width, height, rgba: img.into_raw() })
    }

    fn list_udim_tiles(&self, pattern: &Path) -> Vec<u32> {
        let dir = match pattern.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let Ok(entries) = std::fs::read_dir(dir) else {
            log::debug!("cannot list UDIM tiles in {}", dir.display());
            return Vec::new();
        };

        let mut tiles: Vec<u32> = entries
            .filter_map(Result::ok)
            .filter_map(|e| udim::match_tile(pattern, &e.file_name().to_string_lossy()))
            .collect();
        tiles.sort_unstable();
        tiles.dedup();
        tiles
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("uview-loader-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_valid_extension(Path::new("a/b.PNG")));
        assert!(has_valid_extension(Path::new("b.tif")));
        assert!(!has_valid_extension(Path::new("b.exr")));
        assert!(!has_valid_extension(Path::new("noext")));
    }

    #[test]
    fn unsupported_extension_fails_without_io() {
        let err = FsImageLoader.load(Path::new("/does/not/exist.exr")).unwrap_err();
        assert!(err.contains("unsupported extension"));
    }

    #[test]
    fn loads_png_as_rgba() {
        let dir = scratch_dir("png");
        let path = dir.join("px.png");
        image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let img = FsImageLoader.load(&path).unwrap();
        assert_eq!((img.width, img.height), (2, 3));
        assert_eq!(&img.rgba[..4], &[10, 20, 30, 255]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn lists_existing_udim_tiles() {
        let dir = scratch_dir("udim");
        for name in ["t.1002.png", "t.1001.png", "t.1011.png", "other.1003.png"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        let tiles = FsImageLoader.list_udim_tiles(&dir.join("t.<UDIM>.png"));
        assert_eq!(tiles, vec![1001, 1002, 1011]);
        std::fs::remove_dir_all(dir).ok();
    }
}
