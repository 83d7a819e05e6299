//! Texture loading and GPU residency.
//!
//! Decoding goes through an [`ImageLoader`]; the [`TextureCache`] owns the
//! resulting GPU textures and hands out [`TextureHandle`]s that stay valid
//! across loads, reloads and UDIM tile discovery.

mod cache;
mod loader;
pub mod udim;

pub use cache::{Dispatch, GpuTexture, LoadState, TextureCache, TextureEvent, TextureHandle, TextureId};
pub use loader::{has_valid_extension, DecodedImage, FsImageLoader, ImageLoader, VALID_EXTENSIONS};
