//! Converter between the legacy Tanki Online XML map format and an
//! abstract 3D scene.
//!
//! The pipeline: a map file parses into a [`MapDocument`], each placed
//! prop is resolved against a [`PropLibraryIndex`] built from a libraries
//! directory, transformed by a [`CoordinateTransform`], and handed to a
//! host-provided [`SceneSink`]. Export walks a [`SceneSource`] the other
//! way. No 3D host ships in this crate; [`MemoryScene`] stands in for one
//! in the CLI and in tests.

pub mod config;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod library_index;
pub mod map_document;
pub mod scene;
pub mod transform;

pub use config::{load_config, Config};
pub use error::{Error, Warning};
pub use exporter::{export_map, export_map_to_file, ExportOptions, ExportReport};
pub use importer::{import_map, import_map_with_index, ImportOptions, ImportReport};
pub use library_index::{DuplicatePolicy, PropLibraryEntry, PropLibraryIndex, TextureRef};
pub use map_document::{MapDocument, PlacedProp, PropId};
pub use scene::{MemoryScene, SceneObject, SceneSink, SceneSource};
pub use transform::{AngleUnit, CoordinateTransform, UpAxis};
