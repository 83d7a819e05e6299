//! JSON scene description.
//!
//! ```json
//! { "meshes": [ {
//!     "id": "/World/Plane",
//!     "face_vertex_counts": [4],
//!     "face_vertex_indices": [0, 1, 2, 3],
//!     "uv_sets": { "st": { "positions": [[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0]], "interpolation": "vertex" } },
//!     "textures": ["checker.png"]
//! } ] }
//! ```
//!
//! Meshes are selected unless `"selected": false`. Relative texture paths
//! resolve against the scene file's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use uview_viewport::{SceneSource, UvMesh};

#[derive(Debug, Deserialize)]
struct SceneFile {
    meshes: Vec<SceneMesh>,
}

#[derive(Debug, Clone, Deserialize)]
struct SceneMesh {
    #[serde(flatten)]
    mesh: UvMesh,
    #[serde(default = "selected_by_default")]
    selected: bool,
    #[serde(default)]
    textures: Vec<PathBuf>,
}

fn selected_by_default() -> bool {
    true
}

#[derive(Debug, Default)]
pub struct JsonScene {
    meshes: Vec<SceneMesh>,
}

impl JsonScene {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        let base = path.parent().unwrap_or(Path::new(""));
        let scene = Self::parse(&text, base)
            .with_context(|| format!("invalid scene {}", path.display()))?;
        log::info!(
            "loaded scene {}: {} mesh(es), {} selected",
            path.display(),
            scene.meshes.len(),
            scene.selected_count()
        );
        Ok(scene)
    }

    pub fn parse(json: &str, base: &Path) -> Result<Self> {
        let mut file: SceneFile = serde_json::from_str(json)?;
        for mesh in &mut file.meshes {
            for texture in &mut mesh.textures {
                if texture.is_relative() {
                    *texture = base.join(&*texture);
                }
            }
        }
        Ok(Self { meshes: file.meshes })
    }

    pub fn selected_count(&self) -> usize {
        self.meshes.iter().filter(|m| m.selected).count()
    }
}

impl SceneSource for JsonScene {
    fn selected_meshes(&self) -> Vec<UvMesh> {
        self.meshes.iter().filter(|m| m.selected).map(|m| m.mesh.clone()).collect()
    }

    fn bound_material_texture_paths(&self, mesh_id: &str) -> Vec<PathBuf> {
        self.meshes
            .iter()
            .find(|m| m.mesh.id == mesh_id)
            .map(|m| m.textures.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uview_viewport::Interpolation;

    const SCENE: &str = r#"{
        "meshes": [
            {
                "id": "/World/A",
                "face_vertex_counts": [4],
                "face_vertex_indices": [0, 1, 2, 3],
                "uv_sets": {
                    "st": { "positions": [[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,1.0]], "interpolation": "vertex" }
                },
                "textures": ["tex/a.png", "/abs/b.png"]
            },
            {
                "id": "/World/B",
                "face_vertex_counts": [3],
                "face_vertex_indices": [0, 1, 2],
                "selected": false
            }
        ]
    }"#;

    #[test]
    fn parses_meshes_and_selection() {
        let scene = JsonScene::parse(SCENE, Path::new("/scenes")).unwrap();
        assert_eq!(scene.selected_count(), 1);

        let selected = scene.selected_meshes();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "/World/A");
        assert_eq!(selected[0].uv_sets["st"].interpolation, Interpolation::Vertex);
        assert_eq!(selected[0].uv_sets["st"].positions.len(), 4);
    }

    #[test]
    fn relative_textures_resolve_against_scene_dir() {
        let scene = JsonScene::parse(SCENE, Path::new("/scenes")).unwrap();
        assert_eq!(
            scene.bound_material_texture_paths("/World/A"),
            vec![PathBuf::from("/scenes/tex/a.png"), PathBuf::from("/abs/b.png")]
        );
        assert!(scene.bound_material_texture_paths("/World/B").is_empty());
        assert!(scene.bound_material_texture_paths("/World/Missing").is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(JsonScene::parse("{ \"meshes\": 3 }", Path::new("")).is_err());
    }

    #[test]
    fn missing_scene_file_names_the_path() {
        let err = JsonScene::load(Path::new("/nonexistent/scene.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/scene.json"));
    }
}
