//! Map export: scene objects in, XML bytes out.
//!
//! Objects are recognised as prop placements by their metadata tag first,
//! falling back to the `library::group::name` naming convention (with the
//! host's duplicate suffix like `.001` stripped). An empty scene still
//! produces a valid empty map document, with a warning in the report.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::error::{Error, Warning};
use crate::map_document::{MapDocument, PlacedProp, PropId};
use crate::scene::SceneSource;
use crate::transform::CoordinateTransform;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub apply_coordinate_conversion: bool,
    pub transform: CoordinateTransform,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            apply_coordinate_conversion: true,
            transform: CoordinateTransform::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ExportReport {
    pub exported: usize,
    pub skipped: usize,
    pub warnings: Vec<Warning>,
    pub elapsed: Duration,
}

impl ExportReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "exported {} props ({} objects skipped, {} warnings) in {:.2}s",
            self.exported,
            self.skipped,
            self.warnings.len(),
            self.elapsed.as_secs_f32()
        )
    }
}

/// Serialize the scene's prop placements back to map XML.
pub fn export_map(
    source: &impl SceneSource,
    options: &ExportOptions,
) -> Result<(Vec<u8>, ExportReport), Error> {
    let start = Instant::now();
    let mut placed_props = Vec::new();
    let mut warnings = Vec::new();
    let mut skipped = 0usize;

    for object in source.objects() {
        let Some(id) = object
            .prop_id
            .clone()
            .or_else(|| prop_id_from_name(&object.name))
        else {
            log::debug!("skipping '{}': not a prop placement", object.name);
            warnings.push(Warning::NotAProp(object.name.clone()));
            skipped += 1;
            continue;
        };

        let (position, rotation, scale) = if options.apply_coordinate_conversion {
            let t = &options.transform;
            (
                t.to_source_position(object.position),
                t.to_source_rotation(object.rotation),
                t.to_source_scale(object.scale),
            )
        } else {
            (object.position, object.rotation, object.scale)
        };

        placed_props.push(PlacedProp {
            id,
            position,
            rotation,
            scale,
            texture_name: object.texture_name.clone(),
        });
    }

    if placed_props.is_empty() {
        log::warn!("no exportable prop objects found in scene");
        warnings.push(Warning::NoExportableObjects);
    }

    let document = MapDocument {
        placed_props,
        source_path: None,
    };
    let bytes = document.serialize()?;

    let report = ExportReport {
        exported: document.placed_props.len(),
        skipped,
        warnings,
        elapsed: start.elapsed(),
    };
    log::info!("export finished: {}", report.summary());
    Ok((bytes, report))
}

/// [`export_map`] plus a write to disk.
pub fn export_map_to_file(
    source: &impl SceneSource,
    options: &ExportOptions,
    path: &Path,
) -> Result<ExportReport, Error> {
    let (bytes, report) = export_map(source, options)?;
    fs::write(path, &bytes)?;
    log::info!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(report)
}

/// Strip the host's duplicate-object suffix (`name.001` -> `name`).
fn clean_host_suffix(name: &str) -> String {
    static SUFFIX_RE: OnceLock<Regex> = OnceLock::new();
    let re = SUFFIX_RE.get_or_init(|| Regex::new(r"\.\d+$").unwrap());
    re.replace(name, "").into_owned()
}

/// Recover a prop identity from an object name. Recognised shapes, most
/// specific first: `lib::group::name`, `lib::name` (default group), and
/// `lib_name` (default group).
fn prop_id_from_name(name: &str) -> Option<PropId> {
    let parts: Vec<&str> = name.split("::").collect();
    match parts.as_slice() {
        [library, group, prop, ..] => {
            Some(PropId::new(*library, *group, clean_host_suffix(prop)))
        }
        [library, prop] => Some(PropId::new(*library, "default", clean_host_suffix(prop))),
        [single] => {
            let (library, prop) = single.split_once('_')?;
            Some(PropId::new(library, "default", clean_host_suffix(prop)))
        }
        [] => None,
    }
}
