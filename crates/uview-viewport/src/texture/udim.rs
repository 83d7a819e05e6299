//! UDIM tile naming.
//!
//! A texture path containing `<UDIM>` names a grid of tiles; tile `1001`
//! covers UV `[0,1]²`, and the number grows by 1 per unit in U and by 10 per
//! unit in V.

use std::path::{Path, PathBuf};

pub const UDIM_TOKEN: &str = "<UDIM>";
pub const FIRST_TILE: u32 = 1001;

pub fn is_udim_pattern(path: &Path) -> bool {
    path.to_string_lossy().contains(UDIM_TOKEN)
}

/// Tile number covering the unit cell with lower-left corner `(u, v)`.
pub fn tile_number(u: u32, v: u32) -> u32 {
    FIRST_TILE + u + 10 * v
}

/// Lower-left UV corner of `tile`; `None` below 1001.
pub fn tile_origin(tile: u32) -> Option<(u32, u32)> {
    let offset = tile.checked_sub(FIRST_TILE)?;
    Some((offset % 10, offset / 10))
}

/// Substitutes `tile` into a `<UDIM>` pattern.
pub fn tile_path(pattern: &Path, tile: u32) -> PathBuf {
    PathBuf::from(pattern.to_string_lossy().replace(UDIM_TOKEN, &tile.to_string()))
}

/// Parses the tile number out of `file_name` if it matches the file-name
/// part of `pattern` with exactly four digits in place of the token.
pub fn match_tile(pattern: &Path, file_name: &str) -> Option<u32> {
    let pattern_name = pattern.file_name()?.to_string_lossy();
    let (prefix, suffix) = pattern_name.split_once(UDIM_TOKEN)?;
    let digits = file_name.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|&t| t >= FIRST_TILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_numbers_follow_u_then_v() {
        assert_eq!(tile_number(0, 0), 1001);
        assert_eq!(tile_number(1, 0), 1002);
        assert_eq!(tile_number(0, 1), 1011);
        assert_eq!(tile_origin(1012), Some((1, 1)));
        assert_eq!(tile_origin(1000), None);
    }

    #[test]
    fn tile_path_substitutes_token() {
        let p = tile_path(Path::new("/tex/albedo.<UDIM>.png"), 1002);
        assert_eq!(p, PathBuf::from("/tex/albedo.1002.png"));
    }

    #[test]
    fn match_tile_accepts_four_digits_only() {
        let pattern = Path::new("/tex/albedo.<UDIM>.png");
        assert_eq!(match_tile(pattern, "albedo.1001.png"), Some(1001));
        assert_eq!(match_tile(pattern, "albedo.101.png"), None);
        assert_eq!(match_tile(pattern, "albedo.10a1.png"), None);
        assert_eq!(match_tile(pattern, "normal.1001.png"), None);
        assert_eq!(match_tile(pattern, "albedo.0999.png"), None);
    }

    #[test]
    fn detects_pattern() {
        assert!(is_udim_pattern(Path::new("a.<UDIM>.png")));
        assert!(!is_udim_pattern(Path::new("a.1001.png")));
    }
}
