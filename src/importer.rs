//! Map import: XML file in, scene objects out.
//!
//! `ReadFile -> ParseDocument -> BuildLibraryIndex -> for each prop
//! {Resolve -> LoadModel -> ApplyTransform -> Place} -> Done`. Per-prop
//! problems become report warnings; only a bad starting state (unreadable
//! file, missing libraries directory) aborts, before any sink call.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, Warning};
use crate::library_index::{DuplicatePolicy, PropLibraryIndex};
use crate::map_document::{MapDocument, PropId};
use crate::scene::{SceneObject, SceneSink};
use crate::transform::CoordinateTransform;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub prop_libraries_dir: PathBuf,
    pub apply_coordinate_conversion: bool,
    pub transform: CoordinateTransform,
    pub duplicate_policy: DuplicatePolicy,
    /// Reuse one model handle per (prop id, texture) within the run.
    pub cache_models: bool,
}

impl ImportOptions {
    pub fn new(prop_libraries_dir: impl Into<PathBuf>) -> Self {
        Self {
            prop_libraries_dir: prop_libraries_dir.into(),
            apply_coordinate_conversion: true,
            transform: CoordinateTransform::default(),
            duplicate_policy: DuplicatePolicy::default(),
            cache_models: true,
        }
    }
}

/// Outcome summary, surfaced to the user at the end instead of interrupting
/// per item.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub total_props: usize,
    pub placed: usize,
    pub models_loaded: usize,
    pub warnings: Vec<Warning>,
    pub elapsed: Duration,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "placed {}/{} props ({} models loaded, {} warnings) in {:.2}s",
            self.placed,
            self.total_props,
            self.models_loaded,
            self.warnings.len(),
            self.elapsed.as_secs_f32()
        )
    }
}

/// Import a map file, building a fresh library index from
/// `options.prop_libraries_dir`.
pub fn import_map<S: SceneSink>(
    path: &Path,
    options: &ImportOptions,
    sink: &mut S,
) -> Result<ImportReport, Error> {
    let start = Instant::now();

    let bytes = fs::read(path).map_err(|source| Error::MapFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let (mut document, parse_warnings) = MapDocument::parse(&bytes)?;
    document.source_path = Some(path.to_path_buf());

    let (index, library_warnings) =
        PropLibraryIndex::build(&options.prop_libraries_dir, options.duplicate_policy)?;
    log::info!(
        "importing {} ({} props) against {} library entries",
        path.display(),
        document.placed_props.len(),
        index.len()
    );

    let mut warnings = parse_warnings;
    warnings.extend(library_warnings);
    let mut report = place_document(&document, &index, options, sink, warnings);
    report.elapsed = start.elapsed();
    log::info!("import finished: {}", report.summary());
    Ok(report)
}

/// Same as [`import_map`], but against a prebuilt index. Lets one index
/// serve several maps within a session.
pub fn import_map_with_index<S: SceneSink>(
    path: &Path,
    index: &PropLibraryIndex,
    options: &ImportOptions,
    sink: &mut S,
) -> Result<ImportReport, Error> {
    let start = Instant::now();

    let bytes = fs::read(path).map_err(|source| Error::MapFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let (mut document, parse_warnings) = MapDocument::parse(&bytes)?;
    document.source_path = Some(path.to_path_buf());

    let mut report = place_document(&document, index, options, sink, parse_warnings);
    report.elapsed = start.elapsed();
    Ok(report)
}

fn place_document<S: SceneSink>(
    document: &MapDocument,
    index: &PropLibraryIndex,
    options: &ImportOptions,
    sink: &mut S,
    mut warnings: Vec<Warning>,
) -> ImportReport {
    let total_props = document.placed_props.len();
    let mut placed = 0usize;
    let mut models_loaded = 0usize;
    let mut cache: HashMap<(PropId, Option<String>), S::ModelHandle> = HashMap::new();

    for prop in &document.placed_props {
        let Some(entry) = index.lookup(&prop.id) else {
            log::warn!("prop {} not found in any library", prop.id);
            warnings.push(Warning::UnresolvedProp(prop.id.clone()));
            continue;
        };

        let texture = prop.texture_name.as_deref().and_then(|name| {
            let texture = entry.texture(name);
            if texture.is_none() {
                log::debug!("prop {} references unknown texture '{name}'", prop.id);
            }
            texture
        });

        let cache_key = (prop.id.clone(), prop.texture_name.clone());
        let handle = match cache.get(&cache_key) {
            Some(handle) => handle.clone(),
            None => match sink.load_model(entry, texture) {
                Ok(handle) => {
                    models_loaded += 1;
                    if options.cache_models {
                        cache.insert(cache_key, handle.clone());
                    }
                    handle
                }
                Err(e) => {
                    warnings.push(Warning::ModelLoadFailed {
                        id: prop.id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            },
        };

        let (position, rotation, scale) = if options.apply_coordinate_conversion {
            let t = &options.transform;
            (
                t.to_scene_position(prop.position),
                t.to_scene_rotation(prop.rotation),
                t.to_scene_scale(prop.scale),
            )
        } else {
            (prop.position, prop.rotation, prop.scale)
        };

        let object = SceneObject {
            name: prop.id.scene_name(),
            prop_id: Some(prop.id.clone()),
            texture_name: prop.texture_name.clone(),
            position,
            rotation,
            scale,
        };

        match sink.place(&handle, object) {
            Ok(()) => {
                placed += 1;
                if placed % 50 == 0 {
                    log::info!("placed {placed}/{total_props} props...");
                }
            }
            Err(e) => warnings.push(Warning::PlacementFailed {
                id: prop.id.clone(),
                reason: e.to_string(),
            }),
        }
    }

    ImportReport {
        total_props,
        placed,
        models_loaded,
        warnings,
        elapsed: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;
    use crate::scene::SceneSource;
    use crate::transform::{AngleUnit, UpAxis};
    use glam::Vec3;
    use std::fs;
    use tempfile::tempdir;

    const CRATE_LIBRARY: &str = r#"
        <library name="crate">
          <prop-group name="crates">
            <prop name="crate01">
              <mesh file="crate.3ds">
                <texture name="green" diffuse-map="green.jpg"/>
              </mesh>
            </prop>
          </prop-group>
        </library>"#;

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <map version="1.0.Light">
          <static-geometry>
            <prop library-name="crate" group-name="crates" name="crate01">
              <rotation><z>1.5</z></rotation>
              <texture-name>green</texture-name>
              <position><x>1</x><y>2</y><z>3</z></position>
            </prop>
            <prop library-name="crate" group-name="crates" name="crate01">
              <rotation><z>0</z></rotation>
              <texture-name>green</texture-name>
              <position><x>1</x><y>2</y><z>3</z></position>
            </prop>
            <prop library-name="crate" group-name="crates" name="unknown">
              <rotation><z>0</z></rotation>
              <texture-name/>
              <position><x>9</x><y>9</y><z>9</z></position>
            </prop>
          </static-geometry>
        </map>"#;

    fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let root = tempdir().unwrap();
        let libs = root.path().join("libs");
        let lib_dir = libs.join("crate");
        fs::create_dir_all(&lib_dir).unwrap();
        fs::write(lib_dir.join("library.xml"), CRATE_LIBRARY).unwrap();
        let map_path = root.path().join("map.xml");
        fs::write(&map_path, MAP).unwrap();
        (root, libs, map_path)
    }

    #[test]
    fn test_end_to_end_import() {
        let (_root, libs, map_path) = setup();
        let options = ImportOptions {
            transform: CoordinateTransform {
                scale_factor: 0.01,
                up_axis: UpAxis::Z,
                angle_unit: AngleUnit::Radians,
            },
            ..ImportOptions::new(&libs)
        };

        let mut scene = MemoryScene::new();
        let report = import_map(&map_path, &options, &mut scene).unwrap();

        assert_eq!(report.total_props, 3);
        assert_eq!(report.placed, 2);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            Warning::UnresolvedProp(id) if id.name == "unknown"
        ));

        let objects = scene.objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].name, "crate::crates::crate01");
        assert!(objects[0]
            .position
            .abs_diff_eq(Vec3::new(0.01, 0.02, 0.03), 1e-5));
        assert!((objects[0].rotation.z - 1.5).abs() < 1e-5);
        assert_eq!(objects[0].texture_name.as_deref(), Some("green"));
        assert_eq!(objects[1].texture_name.as_deref(), Some("green"));
    }

    #[test]
    fn test_model_cache_loads_each_variant_once() {
        let (_root, libs, map_path) = setup();
        let options = ImportOptions::new(&libs);

        let mut cached = MemoryScene::new();
        import_map(&map_path, &options, &mut cached).unwrap();
        // crate01 is placed twice with the same texture: one load.
        assert_eq!(cached.models_loaded(), 1);

        let mut uncached = MemoryScene::new();
        let options = ImportOptions {
            cache_models: false,
            ..ImportOptions::new(&libs)
        };
        import_map(&map_path, &options, &mut uncached).unwrap();
        assert_eq!(uncached.models_loaded(), 2);
    }

    #[test]
    fn test_bad_libraries_dir_aborts_before_touching_scene() {
        let (_root, libs, map_path) = setup();
        let options = ImportOptions::new(libs.join("missing"));

        let mut scene = MemoryScene::new();
        let err = import_map(&map_path, &options, &mut scene).unwrap_err();
        assert!(matches!(err, Error::LibrariesDirNotFound(_)));
        assert!(scene.objects().is_empty());
        assert_eq!(scene.models_loaded(), 0);
    }

    #[test]
    fn test_unreadable_map_file_is_fatal() {
        let (_root, libs, _) = setup();
        let options = ImportOptions::new(&libs);
        let mut scene = MemoryScene::new();
        let err = import_map(Path::new("/nonexistent/map.xml"), &options, &mut scene).unwrap_err();
        assert!(matches!(err, Error::MapFileRead { .. }));
    }

    #[test]
    fn test_conversion_can_be_disabled() {
        let (_root, libs, map_path) = setup();
        let options = ImportOptions {
            apply_coordinate_conversion: false,
            transform: CoordinateTransform {
                scale_factor: 0.01,
                up_axis: UpAxis::Z,
                angle_unit: AngleUnit::Radians,
            },
            ..ImportOptions::new(&libs)
        };

        let mut scene = MemoryScene::new();
        import_map(&map_path, &options, &mut scene).unwrap();
        assert!(scene.objects()[0]
            .position
            .abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn test_prebuilt_index_reuse() {
        let (_root, libs, map_path) = setup();
        let (index, _) = PropLibraryIndex::build(&libs, DuplicatePolicy::LastWins).unwrap();
        let options = ImportOptions::new(&libs);

        let mut scene = MemoryScene::new();
        let report = import_map_with_index(&map_path, &index, &options, &mut scene).unwrap();
        assert_eq!(report.placed, 2);
    }
}
