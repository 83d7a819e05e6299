//! Standalone UV viewer.
//!
//! Alt+middle drag pans, Alt+right drag or the wheel zooms, F frames the
//! selection. G, B, T, P and W toggle grid, borders, texture, readout and
//! texture repeat; U cycles UV sets; R reloads and C clears the texture;
//! S re-reads the selection.

mod app;
mod cli;
mod scene;

use anyhow::Result;
use clap::Parser;
use uview_engine::device::GpuInit;
use uview_engine::logging::init_logging;
use uview_engine::window::{Runtime, RuntimeConfig};

use crate::app::StudioApp;
use crate::cli::Cli;
use crate::scene::JsonScene;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logging());

    let settings = cli.settings()?;
    let scene = match cli.scene.as_deref() {
        Some(path) => JsonScene::load(path)?,
        None => JsonScene::default(),
    };

    let title = match cli.scene.as_deref() {
        Some(path) => format!("uview - {}", path.display()),
        None => "uview".to_string(),
    };
    let config = RuntimeConfig { title, ..RuntimeConfig::default() };

    let app = StudioApp::new(settings, cli.view_config(), scene, cli.texture.clone());
    Runtime::run(config, GpuInit::default(), app)
}
