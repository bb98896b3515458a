//! Narrow host-capability interface.
//!
//! The conversion core never talks to a 3D application directly; a host
//! adapter implements [`SceneSink`] (model loading + object creation) and
//! [`SceneSource`] (object enumeration). [`MemoryScene`] is the in-process
//! implementation used by the CLI and by tests.

use glam::Vec3;
use std::path::PathBuf;

use crate::library_index::{PropLibraryEntry, TextureRef};
use crate::map_document::PropId;

/// One object in the destination scene, in scene space. `prop_id` is the
/// metadata tag stamped on during placement so export can recover the
/// source identity without relying on the object name.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub prop_id: Option<PropId>,
    pub texture_name: Option<String>,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

/// Host capability consumed by the importer.
///
/// `ModelHandle` is whatever the host uses to refer to loaded model data;
/// the importer clones and reuses handles for repeated props so the host
/// only loads each distinct model once per run.
pub trait SceneSink {
    type ModelHandle: Clone;

    /// Load the model (and optionally one of its texture variants) for a
    /// library entry.
    fn load_model(
        &mut self,
        entry: &PropLibraryEntry,
        texture: Option<&TextureRef>,
    ) -> anyhow::Result<Self::ModelHandle>;

    /// Create one object backed by a previously loaded model.
    fn place(&mut self, model: &Self::ModelHandle, object: SceneObject) -> anyhow::Result<()>;
}

/// Host capability consumed by the exporter.
pub trait SceneSource {
    fn objects(&self) -> Vec<SceneObject>;
}

/// In-memory scene. Records which mesh files were "loaded" so tests can
/// observe model reuse.
#[derive(Debug, Default)]
pub struct MemoryScene {
    objects: Vec<SceneObject>,
    loaded_models: Vec<PathBuf>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn models_loaded(&self) -> usize {
        self.loaded_models.len()
    }

    pub fn into_objects(self) -> Vec<SceneObject> {
        self.objects
    }
}

impl SceneSink for MemoryScene {
    type ModelHandle = usize;

    fn load_model(
        &mut self,
        entry: &PropLibraryEntry,
        texture: Option<&TextureRef>,
    ) -> anyhow::Result<usize> {
        log::debug!(
            "loading model {} (texture: {})",
            entry.mesh_path.display(),
            texture.map(|t| t.name.as_str()).unwrap_or("none")
        );
        self.loaded_models.push(entry.mesh_path.clone());
        Ok(self.loaded_models.len() - 1)
    }

    fn place(&mut self, _model: &usize, object: SceneObject) -> anyhow::Result<()> {
        self.objects.push(object);
        Ok(())
    }
}

impl SceneSource for MemoryScene {
    fn objects(&self) -> Vec<SceneObject> {
        self.objects.clone()
    }
}
