use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use uview_engine::logging::LoggingConfig;
use uview_viewport::{ViewConfig, ViewportSettings};

/// Inspect the UV layout of a JSON scene.
#[derive(Debug, Parser)]
#[command(name = "uview-studio", version)]
pub struct Cli {
    /// Scene description (JSON). Without one the viewport starts empty.
    pub scene: Option<PathBuf>,

    /// UV set to display instead of the default (`uv`, then `st`).
    #[arg(long)]
    pub uv_set: Option<String>,

    /// Texture shown as a background plane. `<UDIM>` patterns are accepted.
    #[arg(long)]
    pub texture: Option<PathBuf>,

    /// Tile textures outside the 0-1 square.
    #[arg(long)]
    pub repeat: bool,

    #[arg(long)]
    pub no_grid: bool,

    #[arg(long)]
    pub no_borders: bool,

    /// Hide the cursor UV readout.
    #[arg(long)]
    pub no_readout: bool,

    /// Viewport settings file (JSON); missing fields keep their defaults.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `uview_viewport=debug`. Overrides RUST_LOG.
    #[arg(long)]
    pub log: Option<String>,
}

impl Cli {
    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            show_borders: !self.no_borders,
            show_grid: !self.no_grid,
            show_uv_position: !self.no_readout,
            repeat_texture: self.repeat,
            active_uv_set: self.uv_set.clone(),
            ..ViewConfig::default()
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig { env_filter: self.log.clone(), ..LoggingConfig::default() }
    }

    pub fn settings(&self) -> Result<ViewportSettings> {
        let Some(path) = self.settings.as_ref() else {
            return Ok(ViewportSettings::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let settings: ViewportSettings = serde_json::from_str(&text)
            .with_context(|| format!("invalid settings file {}", path.display()))?;
        Ok(settings.sanitized())
    }
}
